//! # Pool de Workers
//! src/server/pool.rs
//!
//! `size` threads fijos que sacan conexiones de una [`WorkQueue`] sin límite.
//! El apagado es en dos fases:
//!
//! 1. Cerrar la cola y esperar hasta `grace` a que los workers terminen lo
//!    que tienen y lo que quedó encolado.
//! 2. Si no alcanzó: descartar lo que siga en la cola (cerrando esas
//!    conexiones), cancelar el token para interrumpir los sleeps de servicio
//!    y soltar a los workers que no hayan salido.

use crate::error::{Error, Result};
use crate::server::{CancelToken, Connection, RequestHandler, WorkQueue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Margen para que los workers salgan después del force-cancel
const CANCEL_GRACE: Duration = Duration::from_secs(1);

/// Cómo terminó un [`WorkerPool::shutdown`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Todos los workers salieron dentro del período de gracia
    pub drained: bool,
    /// Conexiones encoladas que se cerraron sin atender
    pub discarded: usize,
    /// Workers que siguieron vivos y se soltaron sin join
    pub detached: usize,
}

/// Avisa por el canal cuando el worker sale, aunque sea por panic
struct ExitSignal(Sender<()>);

impl Drop for ExitSignal {
    fn drop(&mut self) {
        let _ = self.0.send(());
    }
}

/// Pool fijo de workers para la disciplina BoundedPool
pub struct WorkerPool {
    queue: WorkQueue<Connection>,
    workers: Vec<JoinHandle<()>>,
    exits: Receiver<()>,
    cancel: CancelToken,
    busy: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Crea el pool e inicia sus `size` workers. `size` debe ser >= 1.
    pub fn new(size: usize, handler: RequestHandler) -> Result<Self> {
        if size == 0 {
            return Err(Error::Config("Pool size must be at least 1".to_string()));
        }

        let queue = WorkQueue::new();
        let cancel = CancelToken::new();
        let handler = handler.with_cancel_token(cancel.clone());
        let busy = Arc::new(AtomicUsize::new(0));
        let (exit_tx, exits) = mpsc::channel();

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let queue = queue.clone();
            let handler = handler.clone();
            let busy = Arc::clone(&busy);
            let signal = ExitSignal(exit_tx.clone());

            let worker = thread::Builder::new()
                .name(format!("pool-worker-{}", id))
                .spawn(move || {
                    let _signal = signal;
                    Self::worker_loop(id, queue, handler, busy);
                })?;
            workers.push(worker);
        }

        Ok(Self {
            queue,
            workers,
            exits,
            cancel,
            busy,
        })
    }

    /// Loop principal del worker
    fn worker_loop(
        id: usize,
        queue: WorkQueue<Connection>,
        handler: RequestHandler,
        busy: Arc<AtomicUsize>,
    ) {
        debug!(worker = id, "pool worker started");

        while let Some(connection) = queue.dequeue() {
            busy.fetch_add(1, Ordering::Relaxed);
            handler.handle(connection);
            busy.fetch_sub(1, Ordering::Relaxed);
        }

        debug!(worker = id, "pool worker exiting");
    }

    /// Encola una conexión. Si el pool ya se está apagando, la conexión se
    /// cierra y se retorna `false`.
    pub fn execute(&self, connection: Connection) -> bool {
        match self.queue.enqueue(connection) {
            Ok(()) => true,
            Err(rejected) => {
                warn!(peer = %rejected.peer(), "pool is shutting down, dropping connection");
                false
            }
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Conexiones esperando un worker libre
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Workers atendiendo una conexión ahora mismo
    pub fn busy(&self) -> usize {
        self.busy.load(Ordering::Relaxed)
    }

    /// Apagado ordenado con espera acotada, luego forzado
    pub fn shutdown(self, grace: Duration) -> ShutdownReport {
        let total = self.workers.len();
        self.queue.close();

        let exited = self.wait_for_exits(total, grace);
        if exited == total {
            for worker in self.workers {
                let _ = worker.join();
            }
            info!(workers = total, "thread pool shut down");
            return ShutdownReport {
                drained: true,
                discarded: 0,
                detached: 0,
            };
        }

        warn!(
            pending = total - exited,
            grace_ms = grace.as_millis() as u64,
            "pool did not drain in time, forcing shutdown"
        );
        // Vaciar antes de cancelar: un worker recién interrumpido no alcanza
        // a tomar otra conexión
        let discarded = self.queue.drain().len();
        self.cancel.cancel();

        let exited = exited + self.wait_for_exits(total - exited, CANCEL_GRACE);

        let mut detached = 0;
        for worker in self.workers {
            if worker.is_finished() {
                let _ = worker.join();
            } else {
                detached += 1;
            }
        }

        info!(
            workers = total,
            exited,
            discarded,
            detached,
            "thread pool force-stopped"
        );

        ShutdownReport {
            drained: false,
            discarded,
            detached,
        }
    }

    /// Espera hasta `expected` avisos de salida o hasta agotar `timeout`
    fn wait_for_exits(&self, expected: usize, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut exited = 0;

        while exited < expected {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.exits.recv_timeout(remaining) {
                Ok(()) => exited += 1,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        exited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ServerStats;
    use crate::server::Discipline;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};

    fn pool_handler(service_ms: u64) -> RequestHandler {
        RequestHandler::new(
            Discipline::BoundedPool { size: 1 },
            Duration::from_millis(service_ms),
            Some(Duration::from_secs(5)),
        )
    }

    /// Abre `n` clientes que ya enviaron su request y entrega las conexiones aceptadas
    fn accepted_connections(
        n: usize,
        stats: &Arc<ServerStats>,
    ) -> (Vec<TcpStream>, Vec<Connection>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut clients = Vec::new();
        let mut connections = Vec::new();
        for _ in 0..n {
            let mut client = TcpStream::connect(addr).unwrap();
            client.write_all(b"GET / HTTP/1.0\r\n\r\n").unwrap();
            clients.push(client);
            let (stream, _) = listener.accept().unwrap();
            connections.push(Connection::new(stream, Arc::clone(stats)));
        }
        (clients, connections)
    }

    #[test]
    fn test_pool_serves_all_and_drains() {
        let stats = Arc::new(ServerStats::new());
        let pool = WorkerPool::new(2, pool_handler(20)).unwrap();
        assert_eq!(pool.size(), 2);

        let (clients, connections) = accepted_connections(4, &stats);
        for connection in connections {
            assert!(pool.execute(connection));
        }

        for mut client in clients {
            let mut buf = Vec::new();
            client.read_to_end(&mut buf).unwrap();
            assert!(String::from_utf8_lossy(&buf).contains("200 OK"));
        }

        let report = pool.shutdown(Duration::from_secs(5));
        assert!(report.drained);
        assert_eq!(report.discarded, 0);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.responded, 4);
        assert_eq!(snapshot.closed, 4);
    }

    #[test]
    fn test_size_one_serializes_service() {
        let stats = Arc::new(ServerStats::new());
        let pool = WorkerPool::new(1, pool_handler(50)).unwrap();

        let start = Instant::now();
        let (clients, connections) = accepted_connections(3, &stats);
        for connection in connections {
            pool.execute(connection);
        }
        for mut client in clients {
            let mut buf = Vec::new();
            client.read_to_end(&mut buf).unwrap();
        }

        // Tres servicios de 50 ms uno detrás de otro
        assert!(start.elapsed() >= Duration::from_millis(150));
        pool.shutdown(Duration::from_secs(5));
    }

    #[test]
    fn test_forced_shutdown_interrupts_and_discards() {
        let stats = Arc::new(ServerStats::new());
        let pool = WorkerPool::new(1, pool_handler(30_000)).unwrap();

        let (_clients, connections) = accepted_connections(3, &stats);
        for connection in connections {
            pool.execute(connection);
        }

        // Dar tiempo a que el worker tome la primera
        thread::sleep(Duration::from_millis(100));
        assert_eq!(pool.busy(), 1);
        assert_eq!(pool.queued(), 2);

        let start = Instant::now();
        let report = pool.shutdown(Duration::from_millis(200));
        assert!(start.elapsed() < Duration::from_secs(5));

        assert!(!report.drained);
        assert_eq!(report.discarded, 2);
        assert_eq!(report.detached, 0);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.accepted, 3);
        assert_eq!(snapshot.closed, 3);
        assert_eq!(snapshot.responded, 0);
    }

    #[test]
    fn test_execute_after_shutdown_rejected() {
        let stats = Arc::new(ServerStats::new());
        let pool = WorkerPool::new(1, pool_handler(0)).unwrap();
        pool.queue.close();

        let (_clients, mut connections) = accepted_connections(1, &stats);
        assert!(!pool.execute(connections.remove(0)));
        assert_eq!(stats.snapshot().closed, 1);

        pool.shutdown(Duration::from_secs(1));
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(
            WorkerPool::new(0, pool_handler(0)),
            Err(Error::Config(_))
        ));
    }
}
