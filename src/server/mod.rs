//! # Módulo del Servidor
//! src/server/mod.rs
//!
//! Núcleo acceptor/dispatch:
//! 1. Escucha en un puerto con accept acotado por timeout
//! 2. Despacha cada conexión según la disciplina (serial, thread, pool)
//! 3. Atiende la request con un tiempo de servicio simulado
//! 4. Se detiene de forma ordenada

pub mod cancel;
pub mod connection;
pub mod discipline;
pub mod handler;
pub mod pool;
pub mod queue;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use cancel::CancelToken;
pub use connection::Connection;
pub use discipline::{Discipline, ServerKind};
pub use handler::{Exchange, RequestHandler};
pub use pool::{ShutdownReport, WorkerPool};
pub use queue::WorkQueue;
pub use tcp::{Server, ServerState};
