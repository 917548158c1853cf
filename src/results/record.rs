//! # Resultado de un Test
//! src/results/record.rs
//!
//! `TestResult` es inmutable una vez sellado por el load driver. Este módulo
//! también define su fila CSV:
//!
//! ```text
//! Timestamp,ServerType,ConcurrentClients,RequestsPerClient,DelayMs,TotalTime,SuccessCount,FailureCount,RequestsPerSecond,MinResponseTime,MaxResponseTime,AvgResponseTime
//! 2026-10-16 12:00:00,ThreadPool,20,1,0,0.23,20,0,86.96,101,205,153.40
//! ```

use crate::error::{Error, Result};
use crate::metrics::LatencySnapshot;
use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Header fijo del CSV
pub const CSV_HEADER: &str = "Timestamp,ServerType,ConcurrentClients,RequestsPerClient,DelayMs,TotalTime,SuccessCount,FailureCount,RequestsPerSecond,MinResponseTime,MaxResponseTime,AvgResponseTime";

/// Formato del timestamp (hora local)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CSV_FIELDS: usize = 12;

/// Parámetros de carga que definen un grupo de comparación (N, R, D)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoadParams {
    pub clients: u32,
    pub requests: u32,
    pub delay_ms: u64,
}

impl fmt::Display for LoadParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Clients: {}, Requests/client: {}, Delay: {}ms",
            self.clients, self.requests, self.delay_ms
        )
    }
}

/// Clave del store: (serverType, N, R, D)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResultKey {
    pub server_type: String,
    pub params: LoadParams,
}

/// Métricas de un test completo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub timestamp: NaiveDateTime,
    pub server_type: String,
    pub params: LoadParams,
    pub total_seconds: f64,
    pub success_count: u64,
    pub failure_count: u64,
    pub requests_per_second: f64,
    pub min_response_ms: u64,
    pub max_response_ms: u64,
    pub avg_response_ms: f64,
    /// El test excedió su espera máxima (no se persiste en el CSV)
    #[serde(default)]
    pub aborted: bool,
}

impl TestResult {
    /// Sella un resultado a partir de lo medido
    pub fn seal(
        server_type: &str,
        params: LoadParams,
        elapsed: Duration,
        latency: &LatencySnapshot,
        aborted: bool,
    ) -> Self {
        let total_seconds = elapsed.as_secs_f64();
        let total = latency.total();
        let requests_per_second = if total_seconds > 0.0 {
            total as f64 / total_seconds
        } else {
            0.0
        };

        let now = Local::now().naive_local();
        Self {
            timestamp: now.with_nanosecond(0).unwrap_or(now),
            server_type: server_type.to_string(),
            params,
            total_seconds,
            success_count: latency.success,
            failure_count: latency.failure,
            requests_per_second,
            min_response_ms: latency.min_display_ms(),
            max_response_ms: latency.max_ms,
            avg_response_ms: latency.avg_ms(),
            aborted,
        }
    }

    pub fn key(&self) -> ResultKey {
        ResultKey {
            server_type: self.server_type.clone(),
            params: self.params,
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.success_count + self.failure_count
    }

    /// Resultado como JSON legible (salida `--json` del load driver)
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Fila CSV (sin salto de línea). Los floats van con dos decimales.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{:.2},{},{},{:.2},{},{},{:.2}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.server_type.replace(',', ";"),
            self.params.clients,
            self.params.requests,
            self.params.delay_ms,
            self.total_seconds,
            self.success_count,
            self.failure_count,
            self.requests_per_second,
            self.min_response_ms,
            self.max_response_ms,
            self.avg_response_ms,
        )
    }

    /// Parsea una fila CSV. `line` es el número de línea para el error.
    pub fn from_csv_row(row: &str, line: usize) -> Result<Self> {
        let parts: Vec<&str> = row.trim_end_matches(['\r', '\n']).split(',').collect();
        if parts.len() < CSV_FIELDS {
            return Err(Error::Parse {
                line,
                reason: format!("expected {} fields, found {}", CSV_FIELDS, parts.len()),
            });
        }

        fn field<T: std::str::FromStr>(parts: &[&str], idx: usize, line: usize) -> Result<T> {
            parts[idx].trim().parse::<T>().map_err(|_| Error::Parse {
                line,
                reason: format!("invalid value '{}' in column {}", parts[idx], idx + 1),
            })
        }

        let timestamp = NaiveDateTime::parse_from_str(parts[0].trim(), TIMESTAMP_FORMAT)
            .map_err(|e| Error::Parse {
                line,
                reason: format!("invalid timestamp '{}': {}", parts[0], e),
            })?;

        let server_type = parts[1].trim();
        if server_type.is_empty() {
            return Err(Error::Parse {
                line,
                reason: "empty server type".to_string(),
            });
        }

        Ok(Self {
            timestamp,
            server_type: server_type.to_string(),
            params: LoadParams {
                clients: field(&parts, 2, line)?,
                requests: field(&parts, 3, line)?,
                delay_ms: field(&parts, 4, line)?,
            },
            total_seconds: field(&parts, 5, line)?,
            success_count: field(&parts, 6, line)?,
            failure_count: field(&parts, 7, line)?,
            requests_per_second: field(&parts, 8, line)?,
            min_response_ms: field(&parts, 9, line)?,
            max_response_ms: field(&parts, 10, line)?,
            avg_response_ms: field(&parts, 11, line)?,
            aborted: false,
        })
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Server: {}, Clients: {}, Requests/client: {}, Delay: {}ms",
            self.server_type, self.params.clients, self.params.requests, self.params.delay_ms
        )?;
        writeln!(
            f,
            "Total time: {:.2}s, Success: {}, Failed: {}",
            self.total_seconds, self.success_count, self.failure_count
        )?;
        write!(
            f,
            "Requests/sec: {:.2}, Min RT: {}ms, Max RT: {}ms, Avg RT: {:.2}ms",
            self.requests_per_second, self.min_response_ms, self.max_response_ms, self.avg_response_ms
        )
    }
}
