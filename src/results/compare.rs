//! # Comparador
//! src/results/compare.rs
//!
//! Agrupa los resultados vigentes por configuración de carga (N, R, D) y,
//! para cada grupo con al menos dos tipos de servidor, los ordena por
//! throughput descendente y calcula el speedup del más rápido sobre el más
//! lento.

use crate::error::Result;
use crate::results::record::{LoadParams, TestResult, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const REPORT_TITLE: &str = "=== SERVER PERFORMANCE COMPARISON REPORT ===";

pub const NO_COMPARISONS: &str = "No comparisons available yet. Run tests on multiple server types with the same configuration to see comparisons.";

const COLUMNS: [&str; 5] = [
    "Server Type",
    "Req/sec",
    "Avg Resp Time",
    "Min Resp Time",
    "Max Resp Time",
];

/// Resultados de una misma configuración, del más rápido al más lento
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonGroup {
    pub params: LoadParams,
    pub ranked: Vec<TestResult>,
}

impl ComparisonGroup {
    pub fn fastest(&self) -> Option<&TestResult> {
        self.ranked.first()
    }

    pub fn slowest(&self) -> Option<&TestResult> {
        self.ranked.last()
    }

    /// rps del más rápido / rps del más lento. Infinito si el más lento es 0.
    pub fn speedup(&self) -> f64 {
        match (self.fastest(), self.slowest()) {
            (Some(fast), Some(slow)) if slow.requests_per_second > 0.0 => {
                fast.requests_per_second / slow.requests_per_second
            }
            (Some(_), Some(_)) => f64::INFINITY,
            _ => 1.0,
        }
    }
}

/// Reporte de comparación
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub generated_at: NaiveDateTime,
    pub groups: Vec<ComparisonGroup>,
}

impl Comparison {
    /// Construye la comparación a partir de los resultados vigentes
    pub fn build<'a>(
        results: impl IntoIterator<Item = &'a TestResult>,
        generated_at: NaiveDateTime,
    ) -> Self {
        let mut by_params: BTreeMap<LoadParams, Vec<TestResult>> = BTreeMap::new();
        for result in results {
            by_params.entry(result.params).or_default().push(result.clone());
        }

        let groups = by_params
            .into_iter()
            .filter(|(_, ranked)| ranked.len() >= 2)
            .map(|(params, mut ranked)| {
                ranked.sort_by(|a, b| b.requests_per_second.total_cmp(&a.requests_per_second));
                ComparisonGroup { params, ranked }
            })
            .collect();

        Self {
            generated_at,
            groups,
        }
    }

    pub fn has_comparisons(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Texto del reporte
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", REPORT_TITLE);
        let _ = writeln!(out, "Generated: {}", self.generated_at.format(TIMESTAMP_FORMAT));
        let _ = writeln!(out);

        if !self.has_comparisons() {
            let _ = writeln!(out, "{}", NO_COMPARISONS);
            return out;
        }

        for group in &self.groups {
            let _ = writeln!(out, "Configuration: {}", group.params);
            let _ = writeln!(
                out,
                "{:<15} {:<15} {:<15} {:<15} {:<15}",
                COLUMNS[0], COLUMNS[1], COLUMNS[2], COLUMNS[3], COLUMNS[4]
            );
            let _ = writeln!(out, "{}", "-".repeat(79));

            for result in &group.ranked {
                let _ = writeln!(
                    out,
                    "{:<15} {:<15.2} {:<15.2} {:<15} {:<15}",
                    result.server_type,
                    result.requests_per_second,
                    result.avg_response_ms,
                    result.min_response_ms,
                    result.max_response_ms
                );
            }

            if let (Some(fast), Some(slow)) = (group.fastest(), group.slowest()) {
                let speedup = group.speedup();
                let speedup = if speedup.is_finite() {
                    format!("{:.2}x", speedup)
                } else {
                    "inf".to_string()
                };
                let _ = writeln!(
                    out,
                    "\nPerformance difference: {} speedup ({} vs {})",
                    speedup, fast.server_type, slow.server_type
                );
            }
            let _ = writeln!(out);
        }

        out
    }

    /// Sobrescribe el archivo del reporte
    pub fn write_report(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.render())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(clients: u32) -> LoadParams {
        LoadParams {
            clients,
            requests: 5,
            delay_ms: 0,
        }
    }

    fn result(server_type: &str, clients: u32, rps: f64) -> TestResult {
        TestResult {
            timestamp: now(),
            server_type: server_type.to_string(),
            params: params(clients),
            total_seconds: 1.0,
            success_count: rps as u64,
            failure_count: 0,
            requests_per_second: rps,
            min_response_ms: 100,
            max_response_ms: 300,
            avg_response_ms: 150.0,
            aborted: false,
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2026-10-16 12:00:00", TIMESTAMP_FORMAT).unwrap()
    }

    #[test]
    fn test_groups_need_two_entries() {
        let results = vec![result("SingleThreaded", 10, 9.0), result("ThreadPool", 20, 80.0)];
        let comparison = Comparison::build(&results, now());
        assert!(!comparison.has_comparisons());

        let report = comparison.render();
        assert!(report.starts_with(REPORT_TITLE));
        assert!(report.contains("Generated: 2026-10-16 12:00:00"));
        assert!(report.contains(NO_COMPARISONS));
    }

    #[test]
    fn test_ranking_is_non_increasing() {
        let results = vec![
            result("SingleThreaded", 10, 9.5),
            result("ThreadPool", 10, 66.0),
            result("MultiThreaded", 10, 95.0),
        ];
        let comparison = Comparison::build(&results, now());
        assert_eq!(comparison.groups.len(), 1);

        let group = &comparison.groups[0];
        let ranked: Vec<&str> = group.ranked.iter().map(|r| r.server_type.as_str()).collect();
        assert_eq!(ranked, vec!["MultiThreaded", "ThreadPool", "SingleThreaded"]);
        assert!(group
            .ranked
            .windows(2)
            .all(|w| w[0].requests_per_second >= w[1].requests_per_second));
        assert!((group.speedup() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_render_group_table() {
        let results = vec![result("SingleThreaded", 10, 9.5), result("MultiThreaded", 10, 95.0)];
        let report = Comparison::build(&results, now()).render();

        assert!(report.contains("Configuration: Clients: 10, Requests/client: 5, Delay: 0ms"));
        assert!(report.contains(
            "Server Type     Req/sec         Avg Resp Time   Min Resp Time   Max Resp Time"
        ));
        assert!(report.contains("MultiThreaded   95.00           150.00          100             300"));
        assert!(report.contains(
            "Performance difference: 10.00x speedup (MultiThreaded vs SingleThreaded)"
        ));
        assert!(!report.contains(NO_COMPARISONS));
    }

    #[test]
    fn test_zero_throughput_slowest() {
        let results = vec![result("A", 1, 5.0), result("B", 1, 0.0)];
        let comparison = Comparison::build(&results, now());
        assert!(comparison.groups[0].speedup().is_infinite());
        assert!(comparison.render().contains("inf speedup (A vs B)"));
    }

    #[test]
    fn test_write_report_overwrites() {
        let path = std::env::temp_dir().join(format!("server_bench_report_{}.txt", std::process::id()));
        fs::write(&path, "stale contents that should disappear").unwrap();

        let results = vec![result("A", 1, 5.0)];
        Comparison::build(&results, now()).write_report(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with(REPORT_TITLE));
        assert!(!written.contains("stale"));
        let _ = fs::remove_file(&path);
    }
}
