//! # LatencyBucket
//! src/metrics/latency.rs
//!
//! Acumulador de latencias sin locks. `count` y `sum` usan fetch-add; `min` y
//! `max` usan un loop de compare-and-swap que termina en cuanto la muestra ya
//! no mejora el valor actual. El resultado final es exactamente el agregado de
//! las observaciones, sin importar cómo se intercalen los threads.

use std::sync::atomic::{AtomicU64, Ordering};

/// Centinela de `min_ms` mientras no hay muestras
pub const MIN_SENTINEL: u64 = u64::MAX;

/// Agregado de latencias de todos los clientes virtuales
#[derive(Debug)]
pub struct LatencyBucket {
    count: AtomicU64,
    sum_ms: AtomicU64,
    min_ms: AtomicU64,
    max_ms: AtomicU64,
    success: AtomicU64,
    failure: AtomicU64,
}

impl LatencyBucket {
    pub fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum_ms: AtomicU64::new(0),
            min_ms: AtomicU64::new(MIN_SENTINEL),
            max_ms: AtomicU64::new(0),
            success: AtomicU64::new(0),
            failure: AtomicU64::new(0),
        }
    }

    /// Registra una request exitosa con su latencia
    pub fn record_success(&self, sample_ms: u64) {
        self.sum_ms.fetch_add(sample_ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.update_min(sample_ms);
        self.update_max(sample_ms);
        self.success.fetch_add(1, Ordering::Relaxed);
    }

    /// Registra una request fallida (no aporta muestra de latencia)
    pub fn record_failure(&self) {
        self.failure.fetch_add(1, Ordering::Relaxed);
    }

    fn update_min(&self, sample_ms: u64) {
        let mut current = self.min_ms.load(Ordering::Relaxed);
        while sample_ms < current {
            match self.min_ms.compare_exchange_weak(
                current,
                sample_ms,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    fn update_max(&self, sample_ms: u64) {
        let mut current = self.max_ms.load(Ordering::Relaxed);
        while sample_ms > current {
            match self.max_ms.compare_exchange_weak(
                current,
                sample_ms,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    /// Lectura de todos los campos. Solo es consistente cuando ya no hay
    /// escritores (el load driver la toma después de unir a sus clientes).
    pub fn snapshot(&self) -> LatencySnapshot {
        LatencySnapshot {
            count: self.count.load(Ordering::Acquire),
            sum_ms: self.sum_ms.load(Ordering::Acquire),
            min_ms: self.min_ms.load(Ordering::Acquire),
            max_ms: self.max_ms.load(Ordering::Acquire),
            success: self.success.load(Ordering::Acquire),
            failure: self.failure.load(Ordering::Acquire),
        }
    }
}

impl Default for LatencyBucket {
    fn default() -> Self {
        Self::new()
    }
}

/// Copia inmutable de un [`LatencyBucket`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySnapshot {
    pub count: u64,
    pub sum_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub success: u64,
    pub failure: u64,
}

impl LatencySnapshot {
    /// Promedio en ms (0 sin muestras)
    ///
    /// Un snapshot tomado con clientes todavía escribiendo puede ver `sum`
    /// y `count` de muestras distintas; el promedio se acota a `[min, max]`.
    pub fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let avg = self.sum_ms as f64 / self.count as f64;
        let max = self.max_ms as f64;
        let min = (self.min_display_ms() as f64).min(max);
        avg.clamp(min, max)
    }

    /// Mínimo para mostrar: el centinela se reporta como 0
    pub fn min_display_ms(&self) -> u64 {
        if self.min_ms == MIN_SENTINEL {
            0
        } else {
            self.min_ms
        }
    }

    pub fn total(&self) -> u64 {
        self.success + self.failure
    }
}
