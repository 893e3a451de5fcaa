/// OpenLine — Odds Board
///
/// Co dělá:
///   1. Stáhne odds pro jeden sport + bookmaker (h2h, spreads, totals)
///   2. Nechá jen zápasy zvoleného dne (America/New_York kalendář)
///   3. Ke každé lajně doplní opening (první viděnou hodnotu) + diff live − opening
///   4. Vypíše board jako JSON (jednou, nebo každých BOARD_POLL_SECS)
///
/// Spuštění:
///   SPORT=baseball_mlb BOOKMAKER=draftkings DAY_OFFSET=0 cargo run --bin odds-board

use anyhow::Result;
use dotenv::dotenv;
use openline::{pipeline, AppConfig};
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = AppConfig::from_env()?;
    let board = pipeline::build_board_service(&cfg)?;

    info!("=== OpenLine board: {} / {} / day +{} ===", cfg.sport, cfg.bookmaker, cfg.day_offset);
    info!("Audit log: {}", cfg.log_dir.display());

    let Some(interval) = cfg.poll_interval else {
        // one shot
        return match board.board(&cfg.sport, &cfg.bookmaker, cfg.day_offset as i64).await {
            Ok(b) => {
                println!("{}", serde_json::to_string_pretty(&*b)?);
                Ok(())
            }
            Err(e) => {
                println!("{}", serde_json::json!({ "error": format!("Error loading odds: {e}") }));
                std::process::exit(1);
            }
        };
    };

    info!("Board poll interval: {}s", interval.as_secs());
    loop {
        match board.board(&cfg.sport, &cfg.bookmaker, cfg.day_offset as i64).await {
            Ok(b) => println!("{}", serde_json::to_string(&*b)?),
            Err(e) => warn!("Board refresh failed: {e}"),
        }
        sleep(interval).await;
    }
}
