use chrono::{Datelike, Timelike};

use crate::config::Config;
use crate::error::{PriceError, Result};
use crate::payload::{decode_rows, normalize, PriceResult};
use crate::query::{FetchRequest, Granularity, PriceQuery};
use crate::transport::{HttpTransport, Transport};
use crate::window::Window;

/// Day-ahead price client for the Nord Pool market data pages.
pub struct Prices<T = HttpTransport> {
    config: Config,
    transport: T,
}

impl Prices<HttpTransport> {
    pub fn new(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(config.http_timeout)?;
        Ok(Prices { config, transport })
    }
}

impl<T: Transport> Prices<T> {
    pub fn with_transport(config: Config, transport: T) -> Self {
        Prices { config, transport }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Price for the hour containing `query.date` (or now).
    pub async fn at(&self, query: &PriceQuery) -> Result<PriceResult> {
        let request = FetchRequest::resolve(Granularity::Instant, query, &self.config)?;
        let target = request.date;
        self.get_values(request)
            .await?
            .into_iter()
            .find(|result| {
                result.date.year() == target.year()
                    && result.date.day() == target.day()
                    && result.date.hour() == target.hour()
            })
            .ok_or_else(|| PriceError::NotFound(target.to_rfc3339()))
    }

    pub async fn hourly(&self, query: &PriceQuery) -> Result<Vec<PriceResult>> {
        self.fetch(Granularity::Hourly, query).await
    }

    pub async fn daily(&self, query: &PriceQuery) -> Result<Vec<PriceResult>> {
        self.fetch(Granularity::Daily, query).await
    }

    pub async fn weekly(&self, query: &PriceQuery) -> Result<Vec<PriceResult>> {
        self.fetch(Granularity::Weekly, query).await
    }

    pub async fn monthly(&self, query: &PriceQuery) -> Result<Vec<PriceResult>> {
        self.fetch(Granularity::Monthly, query).await
    }

    pub async fn yearly(&self, query: &PriceQuery) -> Result<Vec<PriceResult>> {
        self.fetch(Granularity::Yearly, query).await
    }

    pub async fn fetch(
        &self,
        granularity: Granularity,
        query: &PriceQuery,
    ) -> Result<Vec<PriceResult>> {
        let request = FetchRequest::resolve(granularity, query, &self.config)?;
        self.get_values(request).await
    }

    pub async fn get_values(&self, request: FetchRequest) -> Result<Vec<PriceResult>> {
        let window = Window::new(request.from, request.to).clamp(request.range);
        let url = request_url(&request, &self.config.currency);

        tracing::debug!("Nord Pool request: {url}");
        let body = self.transport.get(&url).await?;
        let rows = decode_rows(&body)?;
        let results = normalize(
            rows,
            self.config.timezone,
            &window,
            request.area.as_deref(),
        );
        tracing::debug!(
            "Parsed {} {} prices for {}",
            results.len(),
            request.granularity,
            request.date.format("%Y-%m-%d")
        );
        Ok(results)
    }
}

/// The API wants the currency three times, after a leading comma.
fn request_url(request: &FetchRequest, default_currency: &str) -> String {
    let currency = request.currency.as_deref().unwrap_or(default_currency);
    format!(
        "{}?currency=,{currency},{currency},{currency}&endDate={}",
        request.endpoint,
        request.date.format("%d-%m-%Y")
    )
}
