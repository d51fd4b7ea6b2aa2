//! ALGO/USD price history from CoinGecko

use eyre::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

const COINGECKO_API: &str = "https://api.coingecko.com/api/v3";

/// Days of history the dashboard chart shows
pub const PRICE_HISTORY_DAYS: u32 = 30;

/// One chart point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    /// Unix time in milliseconds
    pub timestamp_ms: u64,
    pub price: f64,
}

/// Raw `market_chart` response; each price is `[timestamp_ms, price]`
#[derive(Debug, Deserialize)]
struct MarketChart {
    #[serde(default)]
    prices: Vec<(f64, f64)>,
}

/// Price series plus the summary a chart header shows
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    pub points: Vec<PricePoint>,
    /// Latest price
    pub current: f64,
    /// Latest minus earliest price
    pub change: f64,
    pub change_percent: f64,
    pub is_positive: bool,
}

impl PriceHistory {
    /// Summarize a series ordered by time
    pub fn from_points(points: Vec<PricePoint>) -> Self {
        let first = points.first().map(|p| p.price).unwrap_or(0.0);
        let current = points.last().map(|p| p.price).unwrap_or(0.0);
        let change = current - first;
        let change_percent = if first > 0.0 {
            change / first * 100.0
        } else {
            0.0
        };

        Self {
            points,
            current,
            change,
            change_percent,
            is_positive: change >= 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl std::fmt::Display for PriceHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.is_positive { "+" } else { "" };
        write!(
            f,
            "ALGO ${:.4} ({}{:.2}%, {} points)",
            self.current,
            sign,
            self.change_percent,
            self.points.len()
        )
    }
}

/// CoinGecko market chart client
#[derive(Debug, Clone)]
pub struct PriceFeed {
    url: String,
    days: u32,
    client: reqwest::Client,
}

impl PriceFeed {
    pub fn new() -> Result<Self> {
        Self::with_url(COINGECKO_API)
    }

    /// Point the feed at another CoinGecko-compatible API
    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("IjarahRustSDK/0.1.0")
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .use_rustls_tls()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            url: url.into().trim_end_matches('/').to_string(),
            days: PRICE_HISTORY_DAYS,
            client,
        })
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    /// Fetch the ALGO/USD history for the configured window
    pub async fn fetch_history(&self) -> Result<PriceHistory> {
        let days = self.days.to_string();
        let response = self
            .client
            .get(format!("{}/coins/algorand/market_chart", self.url))
            .query(&[("vs_currency", "usd"), ("days", days.as_str())])
            .send()
            .await
            .context("Failed to fetch price history")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            eyre::bail!("Failed to fetch price history: {} - {}", status, body);
        }

        let text = response.text().await.context("Failed to read response body")?;
        parse_market_chart(&text)
    }
}

fn parse_market_chart(text: &str) -> Result<PriceHistory> {
    let chart: MarketChart = serde_json::from_str(text).with_context(|| {
        format!(
            "Failed to parse price response: {}",
            &text[..text.len().min(200)]
        )
    })?;

    let mut points: Vec<PricePoint> = chart
        .prices
        .into_iter()
        .filter(|(ts, price)| *ts >= 0.0 && price.is_finite())
        .map(|(ts, price)| PricePoint {
            timestamp_ms: ts as u64,
            price,
        })
        .collect();
    points.sort_by_key(|p| p.timestamp_ms);

    Ok(PriceHistory::from_points(points))
}
