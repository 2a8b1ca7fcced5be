//! Health and load statistics

pub mod health;

pub use health::HealthReport;
