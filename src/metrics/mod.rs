//! # Métricas
//!
//! - `latency`: agregado lock-free de latencias del lado cliente
//! - `collector`: contadores del lado servidor

pub mod collector;
pub mod latency;

pub use collector::{ServerStats, StatsSnapshot};
pub use latency::{LatencyBucket, LatencySnapshot};
