//! # Contadores del Servidor
//! src/metrics/collector.rs
//!
//! Contadores del lado servidor, compartidos entre el acceptor y todos los
//! handlers. Todo es atómico: ningún handler toma un lock para contabilizarse.

use std::sync::atomic::{AtomicU64, Ordering};

/// Contadores thread-safe de un servidor
#[derive(Debug, Default)]
pub struct ServerStats {
    /// Conexiones aceptadas
    accepted: AtomicU64,

    /// Conexiones cerradas (debe alcanzar a `accepted` al quedar en reposo)
    closed: AtomicU64,

    /// Handlers ejecutándose ahora mismo
    active: AtomicU64,

    /// Respuestas enviadas completas
    responded: AtomicU64,

    /// Handlers que terminaron con error de I/O o interrupción
    errors: AtomicU64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_closed(&self) {
        self.closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_responded(&self) {
        self.responded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_active(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrementa sin bajar de cero
    pub fn decrement_active(&self) {
        let _ = self
            .active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            responded: self.responded.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot de los contadores (para uso externo)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub accepted: u64,
    pub closed: u64,
    pub active: u64,
    pub responded: u64,
    pub errors: u64,
}

impl StatsSnapshot {
    /// Conexiones aceptadas que todavía no se cerraron
    pub fn open_connections(&self) -> u64 {
        self.accepted.saturating_sub(self.closed)
    }
}
