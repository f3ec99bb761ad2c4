//! MatchdayLive — Sport API client
//!
//! Thin wrapper over the RapidAPI football feed. Three endpoints:
//!   - live events list:   /api/v1/sport/football/events/live
//!   - match incidents:    /api/v1/event/{id}/incidents
//!   - match lineups:      /api/v1/event/{id}/lineups
//!
//! Every fetch degrades to `None` on transport error, non-200 status or a
//! broken body. Callers see "no data this cycle", never an error.

use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

const DEFAULT_HOST: &str = "sportapi7.p.rapidapi.com";

/// API credentials + endpoint host, passed in explicitly (no ambient lookup).
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub key:  String,
    pub host: String,
}

impl ApiConfig {
    /// Reads SPORT_API_KEY / SPORT_API_HOST. Host falls back to production.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var("SPORT_API_KEY").context("SPORT_API_KEY not set")?;
        let host = std::env::var("SPORT_API_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        Ok(Self { key, host })
    }
}

pub struct SportApiClient {
    client: reqwest::Client,
    config: ApiConfig,
}

impl SportApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("MatchdayLive/0.1")
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { client, config })
    }

    pub async fn fetch_live_events(&self) -> Option<Value> {
        let url = format!("https://{}/api/v1/sport/football/events/live", self.config.host);
        self.get_json("live_events", &url).await
    }

    pub async fn fetch_incidents(&self, api_match_id: i64) -> Option<Value> {
        let url = format!("https://{}/api/v1/event/{}/incidents", self.config.host, api_match_id);
        self.get_json("incidents", &url).await
    }

    pub async fn fetch_lineups(&self, api_match_id: i64) -> Option<Value> {
        let url = format!("https://{}/api/v1/event/{}/lineups", self.config.host, api_match_id);
        self.get_json("lineups", &url).await
    }

    async fn get_json(&self, endpoint: &str, url: &str) -> Option<Value> {
        let resp = match self
            .client
            .get(url)
            .header("x-rapidapi-key", &self.config.key)
            .header("x-rapidapi-host", &self.config.host)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("api {endpoint} request failed: {e}");
                return None;
            }
        };

        let status = resp.status();
        if !status.is_success() {
            warn!("api {endpoint} HTTP {status}");
            return None;
        }

        match resp.json::<Value>().await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("api {endpoint} body parse failed: {e}");
                None
            }
        }
    }
}
