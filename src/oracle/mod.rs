/// Price oracle: per-asset feeds contributed by designated feeder accounts.
pub mod service;

pub use service::{OracleService, PriceInfo, PriceSource};
