//! Day-ahead electricity spot prices from the Nord Pool market data API.
//!
//! ```no_run
//! # async fn run() -> nordpool_prices::Result<()> {
//! use nordpool_prices::{Config, PriceQuery, Prices};
//!
//! let prices = Prices::new(Config::default())?;
//! let today = prices.hourly(&PriceQuery::new().area("NO1")).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod electricity;
pub mod error;
pub mod payload;
pub mod query;
pub mod transport;
pub mod window;

pub use config::Config;
pub use electricity::Prices;
pub use error::{PriceError, Result};
pub use payload::PriceResult;
pub use query::{FetchRequest, Granularity, PriceQuery, RangeSpec};
pub use transport::{HttpTransport, Transport};
pub use window::Window;
