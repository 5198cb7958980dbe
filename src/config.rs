use std::time::Duration;

use anyhow::{Context, Result};
use chrono_tz::Tz;

use crate::query::Granularity;

pub const DEFAULT_BASE_URL: &str = "https://www.nordpoolgroup.com/api";
pub const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    pub timezone: Tz,
    pub currency: String,
    pub http_timeout: Duration,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: DEFAULT_BASE_URL.to_string(),
            timezone: chrono_tz::Europe::Oslo,
            currency: DEFAULT_CURRENCY.to_string(),
            http_timeout: Duration::from_secs(10),
            port: 3000,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            base_url: std::env::var("NORDPOOL_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timezone: std::env::var("NORDPOOL_TIMEZONE")
                .unwrap_or_else(|_| "Europe/Oslo".to_string())
                .parse::<Tz>()
                .map_err(anyhow::Error::msg)
                .context("NORDPOOL_TIMEZONE must be an IANA timezone name")?,
            currency: std::env::var("NORDPOOL_CURRENCY")
                .unwrap_or_else(|_| DEFAULT_CURRENCY.to_string()),
            http_timeout: Duration::from_secs(
                std::env::var("HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .context("HTTP_TIMEOUT_SECS must be a number of seconds")?,
            ),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid port number")?,
        })
    }

    /// Market data page serving the given granularity.
    pub fn endpoint(&self, granularity: Granularity) -> String {
        let page = match granularity {
            Granularity::Instant | Granularity::Hourly => 10,
            Granularity::Daily => 11,
            Granularity::Weekly => 12,
            Granularity::Monthly => 13,
            Granularity::Yearly => 14,
        };
        format!(
            "{}/marketdata/page/{page}",
            self.base_url.trim_end_matches('/')
        )
    }
}
