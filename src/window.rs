use chrono::DateTime;
use chrono_tz::Tz;

use crate::query::RangeSpec;

/// Half-open `[from, to)` filter. A missing bound is open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Window {
    pub from: Option<DateTime<Tz>>,
    pub to: Option<DateTime<Tz>>,
}

impl Window {
    pub fn new(from: Option<DateTime<Tz>>, to: Option<DateTime<Tz>>) -> Self {
        Window { from, to }
    }

    /// Pulls `from` forward so the window spans at most `range`.
    ///
    /// Only applies when both bounds are set.
    pub fn clamp(self, range: Option<RangeSpec>) -> Self {
        let (Some(from), Some(to), Some(range)) = (self.from, self.to, range) else {
            return self;
        };
        let Some(min_from) = range.earliest_from(to) else {
            return self;
        };
        if from < min_from {
            tracing::warn!(
                "Time span too long for {range:?}, setting start time to {}",
                min_from.to_rfc3339()
            );
            return Window {
                from: Some(min_from),
                to: Some(to),
            };
        }
        self
    }

    pub fn contains(&self, at: &DateTime<Tz>) -> bool {
        if self.from.is_some_and(|from| *at < from) {
            return false;
        }
        if self.to.is_some_and(|to| *at >= to) {
            return false;
        }
        true
    }
}
