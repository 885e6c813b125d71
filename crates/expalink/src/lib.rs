//! ExpaLink marketplace core: matching expatriates with vetted local professionals.

pub mod concierge;
pub mod config;
pub mod error;
pub mod import;
pub mod marketplace;
pub mod telemetry;
