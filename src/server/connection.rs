//! # Conexión Aceptada
//! src/server/connection.rs
//!
//! Envuelve el `TcpStream` aceptado. El dueño de la conexión es quien la está
//! atendiendo; al soltarla (por cualquier camino: respuesta enviada, error,
//! descarte de la cola del pool) se cierra y se contabiliza una sola vez.

use crate::metrics::ServerStats;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;

/// Stream aceptado + puerto local por el que llegó
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    local_port: u16,
    peer: Option<SocketAddr>,
    stats: Arc<ServerStats>,
}

impl Connection {
    /// Registra la conexión como aceptada en `stats`
    pub fn new(stream: TcpStream, stats: Arc<ServerStats>) -> Self {
        let local_port = stream.local_addr().map(|addr| addr.port()).unwrap_or(0);
        let peer = stream.peer_addr().ok();
        stats.record_accepted();
        Self {
            stream,
            local_port,
            peer,
            stats,
        }
    }

    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Dirección remota para logs
    pub fn peer(&self) -> String {
        self.peer
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // El peer pudo haber cerrado antes: el error no importa
        let _ = self.stream.shutdown(Shutdown::Both);
        self.stats.record_closed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn test_drop_closes_once_and_counts() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).unwrap();
        let (stream, _) = listener.accept().unwrap();

        let stats = Arc::new(ServerStats::new());
        let connection = Connection::new(stream, Arc::clone(&stats));
        assert_eq!(connection.local_port(), addr.port());
        assert_eq!(stats.snapshot().accepted, 1);
        assert_eq!(stats.snapshot().closed, 0);

        drop(connection);
        assert_eq!(stats.snapshot().closed, 1);

        // El cliente ve EOF
        let mut buf = Vec::new();
        assert_eq!(client.read_to_end(&mut buf).unwrap(), 0);
    }
}
