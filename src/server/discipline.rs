//! # Disciplinas de Concurrencia
//! src/server/discipline.rs
//!
//! Una sola tabla puerto → tipo de servidor, compartida por el handler (que
//! etiqueta el HTML) y por el load driver (que etiqueta el CSV).

use crate::config::{POOL_PORT, SERIAL_PORT, SPAWN_PORT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Política con la que el acceptor despacha conexiones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Discipline {
    /// Atiende cada conexión en el mismo thread del accept
    Serial,
    /// Un thread nuevo por conexión, sin límite
    SpawnPerConnection,
    /// `size` workers alimentados por una cola sin límite
    BoundedPool { size: usize },
}

impl Discipline {
    /// Tipo de servidor que corresponde a esta disciplina
    pub fn kind(&self) -> ServerKind {
        match self {
            Discipline::Serial => ServerKind::SingleThreaded,
            Discipline::SpawnPerConnection => ServerKind::MultiThreaded,
            Discipline::BoundedPool { .. } => ServerKind::ThreadPool,
        }
    }

    pub fn conventional_port(&self) -> u16 {
        match self {
            Discipline::Serial => SERIAL_PORT,
            Discipline::SpawnPerConnection => SPAWN_PORT,
            Discipline::BoundedPool { .. } => POOL_PORT,
        }
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discipline::BoundedPool { size } => write!(f, "{} (pool size {})", self.kind().display_name(), size),
            _ => f.write_str(self.kind().display_name()),
        }
    }
}

/// Etiqueta de un servidor según su puerto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerKind {
    SingleThreaded,
    MultiThreaded,
    ThreadPool,
    Unknown,
}

impl ServerKind {
    /// Mapeo fijo de puertos convencionales
    pub fn from_port(port: u16) -> Self {
        match port {
            SERIAL_PORT => ServerKind::SingleThreaded,
            SPAWN_PORT => ServerKind::MultiThreaded,
            POOL_PORT => ServerKind::ThreadPool,
            _ => ServerKind::Unknown,
        }
    }

    /// Etiqueta corta, la que va en la columna `ServerType` del CSV
    pub fn label(&self) -> &'static str {
        match self {
            ServerKind::SingleThreaded => "SingleThreaded",
            ServerKind::MultiThreaded => "MultiThreaded",
            ServerKind::ThreadPool => "ThreadPool",
            ServerKind::Unknown => "Unknown",
        }
    }

    /// Nombre legible, el que va en el HTML
    pub fn display_name(&self) -> &'static str {
        match self {
            ServerKind::SingleThreaded => "Single-Threaded Server",
            ServerKind::MultiThreaded => "Multi-Threaded Server",
            ServerKind::ThreadPool => "Thread Pool Server",
            ServerKind::Unknown => "Unknown Server Type",
        }
    }
}
