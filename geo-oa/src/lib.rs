//! Femoral and tibial OA geometric indices from landmarks placed on uCT slices.

pub mod actions;
pub mod chart;
pub mod classifier;
pub mod config;
pub mod error;
pub mod export_csv;
pub mod host;
pub mod measurement;
pub mod overlay;
pub mod report;
pub mod toolkit;
pub mod units;

pub use classifier::{classify_femoral, classify_tibial, combine, OverallAssessment, SiteResult};
pub use config::GeoOaConfig;
pub use error::{GeoOaError, Result};
pub use host::{HostClient, HostPlatform, LocalHost};
pub use measurement::{analyze, measure_landmarks, KneeAnalysis, KneeMeasurements};
pub use toolkit::GeoOa;
