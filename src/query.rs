use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Days, Duration, FixedOffset, LocalResult, Months, NaiveDateTime, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::config::Config;
use crate::error::{PriceError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Granularity {
    Instant,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Instant => "instant",
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
            Granularity::Yearly => "yearly",
        }
    }

    /// Longest `[from, to)` span the granularity accepts. Yearly is unbounded.
    pub fn max_range(self) -> Option<RangeSpec> {
        match self {
            Granularity::Instant => Some(RangeSpec::Hours(1)),
            Granularity::Hourly => Some(RangeSpec::Days(1)),
            Granularity::Daily => Some(RangeSpec::Days(31)),
            Granularity::Weekly => Some(RangeSpec::Weeks(24)),
            Granularity::Monthly => Some(RangeSpec::Months(53)),
            Granularity::Yearly => None,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "instant" => Ok(Granularity::Instant),
            "hourly" => Ok(Granularity::Hourly),
            "daily" => Ok(Granularity::Daily),
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            "yearly" => Ok(Granularity::Yearly),
            _ => Err(PriceError::MalformedInput {
                field: "granularity",
                value: s.to_string(),
                reason: "expected one of instant, hourly, daily, weekly, monthly, yearly"
                    .to_string(),
            }),
        }
    }
}

/// Maximum lookback as a single calendar unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeSpec {
    Hours(u32),
    Days(u32),
    Weeks(u32),
    Months(u32),
}

impl RangeSpec {
    /// Earliest `from` allowed for a window ending at `to`.
    ///
    /// Days, weeks and months move along the local calendar, so a day
    /// across a DST change is 23 or 25 hours long.
    pub fn earliest_from(self, to: DateTime<Tz>) -> Option<DateTime<Tz>> {
        match self {
            RangeSpec::Hours(n) => to.checked_sub_signed(Duration::hours(n.into())),
            RangeSpec::Days(n) => shift_local(to, |t| t.checked_sub_days(Days::new(n.into()))),
            RangeSpec::Weeks(n) => {
                shift_local(to, |t| t.checked_sub_days(Days::new(u64::from(n) * 7)))
            }
            RangeSpec::Months(n) => shift_local(to, |t| t.checked_sub_months(Months::new(n))),
        }
    }
}

fn shift_local(
    at: DateTime<Tz>,
    shift: impl FnOnce(NaiveDateTime) -> Option<NaiveDateTime>,
) -> Option<DateTime<Tz>> {
    let local = shift(at.naive_local())?;
    let tz = at.timezone();
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        // Landed in a spring-forward gap; use the first valid instant after it.
        LocalResult::None => tz
            .from_local_datetime(&(local + Duration::hours(1)))
            .earliest(),
    }
}

/// Caller-supplied filters for a price query. Empty strings count as unset.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PriceQuery {
    pub area: Option<String>,
    pub currency: Option<String>,
    /// RFC 3339 date-time, e.g. `2024-06-15T13:00:00+02:00`.
    pub date: Option<String>,
    pub from: Option<DateTime<FixedOffset>>,
    pub to: Option<DateTime<FixedOffset>>,
}

impl PriceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn between(mut self, from: DateTime<FixedOffset>, to: DateTime<FixedOffset>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn since(mut self, from: DateTime<FixedOffset>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn until(mut self, to: DateTime<FixedOffset>) -> Self {
        self.to = Some(to);
        self
    }
}

/// Fully resolved request for one fetch.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchRequest {
    pub granularity: Granularity,
    pub endpoint: String,
    pub range: Option<RangeSpec>,
    pub date: DateTime<Tz>,
    pub currency: Option<String>,
    pub area: Option<String>,
    pub from: Option<DateTime<Tz>>,
    pub to: Option<DateTime<Tz>>,
}

impl FetchRequest {
    pub fn resolve(granularity: Granularity, query: &PriceQuery, config: &Config) -> Result<Self> {
        Self::resolve_at(granularity, query, config, Utc::now())
    }

    /// Like [`FetchRequest::resolve`], with `now` standing in for the clock.
    pub fn resolve_at(
        granularity: Granularity,
        query: &PriceQuery,
        config: &Config,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let tz = config.timezone;
        let date = match non_empty(&query.date) {
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| PriceError::MalformedInput {
                    field: "date",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?
                .with_timezone(&tz),
            None => now.with_timezone(&tz),
        };

        Ok(FetchRequest {
            granularity,
            endpoint: config.endpoint(granularity),
            range: granularity.max_range(),
            date,
            currency: non_empty(&query.currency),
            area: non_empty(&query.area),
            from: query.from.map(|t| t.with_timezone(&tz)),
            to: query.to.map(|t| t.with_timezone(&tz)),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}
