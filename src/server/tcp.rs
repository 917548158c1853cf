//! # Servidor TCP
//! src/server/tcp.rs
//!
//! Un único tipo `Server` parametrizado por su [`Discipline`]. El accept loop
//! es el mismo para las tres; solo cambia qué se hace con cada conexión
//! aceptada:
//!
//! - `Serial`: se atiende en el mismo thread antes del siguiente accept
//! - `SpawnPerConnection`: un thread nuevo por conexión (no se unen al parar)
//! - `BoundedPool`: se encola en un [`WorkerPool`] de tamaño fijo
//!
//! ## Ciclo de vida
//!
//! ```text
//! Idle --start()--> Running --stop()--> Stopping --(listener cerrado,
//!                                                   despacho quieto)--> Stopped
//! ```
//!
//! `start()` bloquea el thread que lo llama hasta llegar a `Stopped`.
//! `stop()` se puede llamar desde cualquier thread y cualquier número de veces.

use crate::config::ServerTiming;
use crate::error::{Error, Result};
use crate::metrics::{ServerStats, StatsSnapshot};
use crate::server::{Connection, Discipline, RequestHandler, WorkerPool};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

/// Cola de conexiones pendientes del listener
const LISTEN_BACKLOG: i32 = 128;

/// Timeout de la conexión que despierta al accept en `stop()`
const WAKE_TIMEOUT: Duration = Duration::from_millis(200);

/// Estado del ciclo de vida de un servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Servidor HTTP mínimo con una disciplina de concurrencia
pub struct Server {
    discipline: Discipline,
    address: String,
    timing: ServerTiming,
    running: AtomicBool,
    state: Mutex<ServerState>,
    state_changed: Condvar,
    local_addr: Mutex<Option<SocketAddr>>,
    stats: Arc<ServerStats>,
    spawned: AtomicU64,
}

impl Server {
    pub fn new(discipline: Discipline, address: impl Into<String>, timing: ServerTiming) -> Self {
        Self {
            discipline,
            address: address.into(),
            timing,
            running: AtomicBool::new(false),
            state: Mutex::new(ServerState::Idle),
            state_changed: Condvar::new(),
            local_addr: Mutex::new(None),
            stats: Arc::new(ServerStats::new()),
            spawned: AtomicU64::new(0),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: ServerState) {
        let mut state = self.lock_state();
        *state = next;
        self.state_changed.notify_all();
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    pub fn state(&self) -> ServerState {
        *self.lock_state()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Dirección real del listener (útil con puerto 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Espera hasta que el servidor alcance `target`. Retorna `false` si se
    /// agotó el timeout.
    pub fn wait_for_state(&self, target: ServerState, timeout: Duration) -> bool {
        let state = self.lock_state();
        let (state, _) = self
            .state_changed
            .wait_timeout_while(state, timeout, |current| *current != target)
            .unwrap_or_else(PoisonError::into_inner);
        *state == target
    }

    /// Hace bind y corre el accept loop hasta que se llame a `stop()`
    ///
    /// Un error de bind deja al servidor en `Idle`.
    pub fn start(&self) -> Result<()> {
        let (listener, handler, pool) = {
            let mut state = self.lock_state();
            if *state != ServerState::Idle {
                return Err(Error::AlreadyStarted);
            }

            let listener = self.bind().map_err(|e| {
                error!(address = %self.address, error = %e, "bind failed");
                e
            })?;

            let handler = RequestHandler::new(
                self.discipline,
                self.timing.service_time,
                self.timing.read_timeout,
            );
            let pool = match self.discipline {
                Discipline::BoundedPool { size } => Some(WorkerPool::new(size, handler.clone())?),
                _ => None,
            };

            self.running.store(true, Ordering::SeqCst);
            *state = ServerState::Running;
            self.state_changed.notify_all();
            (listener, handler, pool)
        };

        info!(
            discipline = %self.discipline,
            address = ?self.local_addr(),
            "server started"
        );

        let result = self.accept_loop(&listener, &handler, pool.as_ref());

        // Cerrar el listener antes de drenar
        drop(listener);
        self.running.store(false, Ordering::SeqCst);
        self.set_state(ServerState::Stopping);

        if let Some(pool) = pool {
            let report = pool.shutdown(self.timing.drain_timeout);
            debug!(?report, "pool shutdown report");
        }

        self.set_state(ServerState::Stopped);
        info!(discipline = %self.discipline, "server stopped");
        result
    }

    /// Pide la detención y espera a `Stopped`
    ///
    /// Idempotente. Sobre un servidor `Idle` no hace nada. Con
    /// `SpawnPerConnection` los handlers en vuelo pueden seguir corriendo
    /// después de que `stop()` retorne.
    pub fn stop(&self) {
        {
            let mut state = self.lock_state();
            match *state {
                ServerState::Idle | ServerState::Stopped => return,
                ServerState::Running => {
                    *state = ServerState::Stopping;
                    self.state_changed.notify_all();
                    info!(discipline = %self.discipline, "stopping server");
                }
                ServerState::Stopping => {}
            }
            self.running.store(false, Ordering::SeqCst);
        }

        self.wake_acceptor();

        let mut state = self.lock_state();
        while *state != ServerState::Stopped {
            state = self
                .state_changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Saca al accept de su espera con una conexión propia, para no depender
    /// del timeout
    fn wake_acceptor(&self) {
        let Some(mut addr) = self.local_addr() else {
            return;
        };
        if addr.ip().is_unspecified() {
            let loopback = match addr {
                SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            };
            addr.set_ip(loopback);
        }
        if let Err(e) = TcpStream::connect_timeout(&addr, WAKE_TIMEOUT) {
            debug!(error = %e, "wake-up connection failed, accept timeout will apply");
        }
    }

    /// Listener bloqueante cuyo `accept` vence tras `accept_timeout`
    fn bind(&self) -> Result<TcpListener> {
        let bind_error = |source: io::Error| Error::Bind {
            addr: self.address.clone(),
            source,
        };

        let addr = self
            .address
            .to_socket_addrs()
            .map_err(bind_error)?
            .next()
            .ok_or_else(|| {
                bind_error(io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    "address did not resolve",
                ))
            })?;

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(bind_error)?;
        socket.set_reuse_address(true).map_err(bind_error)?;
        socket.bind(&addr.into()).map_err(bind_error)?;
        socket.listen(LISTEN_BACKLOG).map_err(bind_error)?;
        // SO_RCVTIMEO en el listener acota el accept
        socket
            .set_read_timeout(Some(self.timing.accept_timeout))
            .map_err(bind_error)?;

        let listener: TcpListener = socket.into();
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = listener.local_addr().ok();
        Ok(listener)
    }

    fn accept_loop(
        &self,
        listener: &TcpListener,
        handler: &RequestHandler,
        pool: Option<&WorkerPool>,
    ) -> Result<()> {
        while self.is_running() {
            match self.accept_with_timeout(listener) {
                Ok(Some(stream)) if !self.is_running() => {
                    // Conexión de wake-up (o tardía): no se atiende
                    drop(stream);
                    break;
                }
                Ok(Some(stream)) => self.dispatch(stream, handler, pool),
                Ok(None) => continue,
                Err(e) => {
                    if self.is_running() {
                        error!(discipline = %self.discipline, error = %e, "accept failed");
                        return Err(Error::Accept(e));
                    }
                    break;
                }
            }
        }
        Ok(())
    }

    /// Un accept bloqueante. `Ok(None)` si venció el timeout.
    fn accept_with_timeout(&self, listener: &TcpListener) -> io::Result<Option<TcpStream>> {
        match listener.accept() {
            Ok((stream, _)) => Ok(Some(stream)),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock
                        | io::ErrorKind::TimedOut
                        | io::ErrorKind::Interrupted
                        | io::ErrorKind::ConnectionAborted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn dispatch(&self, stream: TcpStream, handler: &RequestHandler, pool: Option<&WorkerPool>) {
        let connection = Connection::new(stream, Arc::clone(&self.stats));
        debug!(discipline = %self.discipline, peer = %connection.peer(), "new connection accepted");

        match (self.discipline, pool) {
            (Discipline::BoundedPool { .. }, Some(pool)) => {
                pool.execute(connection);
            }
            (Discipline::SpawnPerConnection, _) => {
                let n = self.spawned.fetch_add(1, Ordering::Relaxed);
                let handler = handler.clone();
                let spawned = thread::Builder::new()
                    .name(format!("conn-{}", n))
                    .spawn(move || handler.handle(connection));
                if let Err(e) = spawned {
                    // El closure (y la conexión) ya se soltó: quedó cerrada
                    error!(error = %e, "cannot spawn connection thread");
                }
            }
            _ => handler.handle(connection),
        }
    }
}
