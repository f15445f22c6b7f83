//! Epidemiological time-series statistics: growth factor, lagged
//! case-fatality rate and linear trend, with summary and export reports.

pub mod analysis;
pub mod config;
pub mod manager;
pub mod model;
pub mod stats;
pub mod summary;

pub use model::{DataKind, Point, Series, StoreError, TimeSeriesStore};
pub use stats::{
    DEFAULT_CFR_LAG, case_fatality_rate, cfr_for_region, growth_factor, growth_factor_for_region,
    linear_trend,
};
