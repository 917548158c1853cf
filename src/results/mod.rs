//! # Resultados
//! src/results/mod.rs
//!
//! Registro de cada test, su persistencia en CSV y el reporte comparativo.

pub mod compare;
pub mod record;
pub mod store;

pub use compare::{Comparison, ComparisonGroup};
pub use record::{LoadParams, ResultKey, TestResult, CSV_HEADER};
pub use store::ResultStore;
