//! HTTP key-value transport (Upstash-style REST).
//!
//! Every command is a path: `{base}/get/{key}`, `{base}/set/{key}/{value}/nx/ex/{secs}`,
//! `{base}/del/{key}...`. Keys and values are percent-encoded path segments,
//! auth is `Authorization: Bearer <token>`, replies are `{"result": ...}` or
//! `{"error": "..."}`.

use crate::error::{Result, StoreError};
use crate::KvTransport;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error:  Option<String>,
}

pub struct RestKv {
    client:   reqwest::Client,
    base_url: String,
    token:    String,
    timeout:  Duration,
}

impl RestKv {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token:    token.into(),
            timeout,
        })
    }

    async fn call(&self, segments: &[String]) -> Result<Value> {
        let url = command_url(&self.base_url, segments);
        let resp = self.client
            .post(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(StoreError::Unauthorized);
        }
        let raw = resp.text().await.map_err(|e| self.classify(e))?;
        if !status.is_success() {
            return Err(StoreError::Status {
                status:  status.as_u16(),
                message: raw.chars().take(200).collect(),
            });
        }

        let reply: RestReply = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Malformed(format!("{e}: {}", raw.chars().take(100).collect::<String>())))?;
        if let Some(err) = reply.error {
            return Err(StoreError::Status { status: status.as_u16(), message: err });
        }
        debug!("kv {} ok", segments.first().map(String::as_str).unwrap_or("?"));
        Ok(reply.result.unwrap_or(Value::Null))
    }

    fn classify(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(self.timeout)
        } else {
            StoreError::Http(e)
        }
    }
}

#[async_trait]
impl KvTransport for RestKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self.call(&["get".to_string(), key.to_string()]).await?;
        decode_get(result)
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let result = self.call(&[
            "set".to_string(),
            key.to_string(),
            value.to_string(),
            "nx".to_string(),
            "ex".to_string(),
            ttl_secs(ttl).to_string(),
        ]).await?;
        decode_set(result)
    }

    async fn del(&self, keys: &[&str]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut segments = vec!["del".to_string()];
        segments.extend(keys.iter().map(|k| k.to_string()));
        let result = self.call(&segments).await?;
        decode_del(result)
    }
}

pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

fn command_url(base_url: &str, segments: &[String]) -> String {
    let path = segments
        .iter()
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{base_url}/{path}")
}

fn decode_get(result: Value) -> Result<Option<String>> {
    match result {
        Value::Null      => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other            => Err(StoreError::Malformed(format!("GET returned {other}"))),
    }
}

fn decode_set(result: Value) -> Result<bool> {
    match result {
        Value::Null                       => Ok(false),
        Value::String(s) if s == "OK"     => Ok(true),
        other                             => Err(StoreError::Malformed(format!("SET returned {other}"))),
    }
}

fn decode_del(result: Value) -> Result<u64> {
    result
        .as_u64()
        .ok_or_else(|| StoreError::Malformed(format!("DEL returned {result}")))
}
