//! # Load Driver
//! src/loadgen/driver.rs
//!
//! Lanza N clientes virtuales, cada uno en su thread. Cada cliente hace R
//! requests secuenciales (conexión nueva por request) con una pausa D entre
//! ellas. Todas las latencias van a un único [`LatencyBucket`] compartido.

use crate::config::LoadConfig;
use crate::error::Result;
use crate::http::{self, TargetUrl};
use crate::metrics::LatencyBucket;
use crate::results::{LoadParams, TestResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Avisa al driver cuando un cliente termina, aunque sea por panic
struct DoneSignal(Sender<()>);

impl Drop for DoneSignal {
    fn drop(&mut self) {
        let _ = self.0.send(());
    }
}

/// Un test de carga listo para ejecutarse
#[derive(Debug, Clone)]
pub struct LoadDriver {
    target: TargetUrl,
    server_type: String,
    params: LoadParams,
    delay: Duration,
    request_timeout: Duration,
    max_wait: Duration,
}

impl LoadDriver {
    /// Valida la configuración y prepara el test
    pub fn new(config: &LoadConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            target: config.target()?,
            server_type: config.server_type(),
            params: LoadParams {
                clients: config.clients,
                requests: config.requests,
                delay_ms: config.delay_ms,
            },
            delay: config.delay(),
            request_timeout: config.request_timeout(),
            max_wait: config.max_wait(),
        })
    }

    /// Cambia la espera máxima del test completo
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn server_type(&self) -> &str {
        &self.server_type
    }

    pub fn params(&self) -> LoadParams {
        self.params
    }

    /// Ejecuta el test y sella el resultado
    pub fn run(&self) -> TestResult {
        info!(
            url = %self.target,
            server_type = %self.server_type,
            clients = self.params.clients,
            requests = self.params.requests,
            delay_ms = self.params.delay_ms,
            "starting load test"
        );

        let bucket = Arc::new(LatencyBucket::new());
        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel();
        let start = Instant::now();

        let mut clients: Vec<JoinHandle<()>> = Vec::with_capacity(self.params.clients as usize);
        for id in 0..self.params.clients {
            let signal = DoneSignal(done_tx.clone());
            let bucket_for_client = Arc::clone(&bucket);
            let stop_for_client = Arc::clone(&stop);
            let target = self.target.clone();
            let requests = self.params.requests;
            let delay = self.delay;
            let timeout = self.request_timeout;

            let spawned = thread::Builder::new()
                .name(format!("client-{}", id))
                .spawn(move || {
                    let _signal = signal;
                    Self::client_loop(
                        id,
                        &target,
                        requests,
                        delay,
                        timeout,
                        &bucket_for_client,
                        &stop_for_client,
                    );
                });

            match spawned {
                Ok(handle) => clients.push(handle),
                Err(e) => {
                    // El cliente no existe: sus R requests cuentan como fallidas
                    error!(client = id, error = %e, "failed to spawn virtual client");
                    for _ in 0..requests {
                        bucket.record_failure();
                    }
                }
            }
        }
        drop(done_tx);

        // Cada DoneSignal avisa una vez, también si el spawn falló
        let expected = self.params.clients as usize;
        let aborted = !Self::wait_for_clients(&done_rx, expected, self.max_wait);
        let elapsed = start.elapsed();

        if aborted {
            // Los clientes rezagados no inician más requests
            stop.store(true, Ordering::Release);
            warn!(
                max_wait_secs = self.max_wait.as_secs(),
                "load test exceeded its maximum wait, sealing partial result"
            );
        } else {
            for client in clients {
                let _ = client.join();
            }
        }

        let result = TestResult::seal(
            &self.server_type,
            self.params,
            elapsed,
            &bucket.snapshot(),
            aborted,
        );

        info!(
            success = result.success_count,
            failure = result.failure_count,
            rps = result.requests_per_second,
            "load test finished"
        );
        result
    }

    /// R requests secuenciales de un cliente virtual
    fn client_loop(
        id: u32,
        target: &TargetUrl,
        requests: u32,
        delay: Duration,
        timeout: Duration,
        bucket: &LatencyBucket,
        stop: &AtomicBool,
    ) {
        for n in 0..requests {
            if stop.load(Ordering::Acquire) {
                debug!(client = id, sent = n, "load test aborted, client stops");
                return;
            }
            let sent_at = Instant::now();
            match http::client::get(target, timeout) {
                Ok(_) => {
                    let elapsed_ms = sent_at.elapsed().as_millis() as u64;
                    bucket.record_success(elapsed_ms);
                }
                Err(e) => {
                    debug!(
                        client = id,
                        request = n,
                        timeout = e.is_timeout(),
                        error = %e,
                        "request failed"
                    );
                    bucket.record_failure();
                }
            }

            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
    }

    /// Espera `expected` avisos. Retorna `false` si se agotó `max_wait`.
    fn wait_for_clients(
        done: &mpsc::Receiver<()>,
        expected: usize,
        max_wait: Duration,
    ) -> bool {
        let deadline = Instant::now() + max_wait;
        let mut finished = 0;

        while finished < expected {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match done.recv_timeout(remaining) {
                Ok(()) => finished += 1,
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        true
    }
}
