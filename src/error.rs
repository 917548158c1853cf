//! # Errores del Banco de Pruebas
//! src/error.rs
//!
//! Un único enum de errores para todo el crate. Ningún componente propaga
//! errores más allá del nivel que puede seguir atendiendo trabajo: el acceptor
//! los registra, el load driver los cuenta como fallos y el store los reporta.

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Puerto en uso o sin permisos. Fatal para `start()`.
    #[error("Bind error on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    /// Fallo de accept distinto de timeout mientras el servidor corre.
    #[error("Accept error: {0}")]
    Accept(#[source] io::Error),
    #[error("Server already started or stopped")]
    AlreadyStarted,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid HTTP response: {0}")]
    InvalidResponse(String),
    #[error("Unexpected HTTP status {0}")]
    HttpStatus(u16),
    /// El sleep de servicio fue interrumpido por un force-cancel del pool.
    #[error("Interrupted")]
    Interrupted,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// `true` para errores de I/O que solo indican que expiró un timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Io(e) | Error::Accept(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_message() {
        let err = Error::Bind {
            addr: "127.0.0.1:8080".to_string(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        assert!(err.to_string().contains("127.0.0.1:8080"));
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::Io(io::Error::from(io::ErrorKind::TimedOut)).is_timeout());
        assert!(Error::Accept(io::Error::from(io::ErrorKind::WouldBlock)).is_timeout());
        assert!(!Error::Io(io::Error::from(io::ErrorKind::ConnectionReset)).is_timeout());
        assert!(!Error::Interrupted.is_timeout());
    }
}
