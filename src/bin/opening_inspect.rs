use anyhow::{bail, Context, Result};
use dotenv::dotenv;
use line_engine::{LineIdentity, MarketKind};
use openline::{pipeline, StoreConfig};
use opening_store::Lookup;
use tracing_subscriber::{EnvFilter, fmt};

/// Prints the stored opening for one line. A legacy-keyed record is migrated
/// to the canonical key as a side effect, like any other read.
///
///   cargo run --bin opening-inspect -- baseball_mlb draftkings <event_id> moneyline "New York Yankees"
#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [sport, bookmaker, event_id, market, side] = args.as_slice() else {
        bail!("usage: opening-inspect <sport> <bookmaker> <event_id> <moneyline|spread|total> <side>");
    };
    let market = MarketKind::parse(market)
        .with_context(|| format!("unknown market `{market}`"))?;

    let store = pipeline::build_store(&StoreConfig::from_env()?)?;
    let identity = LineIdentity::new(sport.as_str(), bookmaker.as_str(), event_id.as_str(), market, side.as_str());

    println!("key={}", identity.key());
    match store.read(&identity.store_key()).await {
        Lookup::Found(record) => println!("opening: {}", serde_json::to_string(&record)?),
        Lookup::Missing       => println!("opening: <none>"),
        Lookup::Unknown(kind) => println!("opening: <unknown, store {kind}>"),
    }

    Ok(())
}
