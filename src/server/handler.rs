//! # Request Handler
//! src/server/handler.rs
//!
//! Atiende una conexión: lee la request line, descarta los headers, duerme el
//! tiempo de servicio simulado y responde un HTML fijo. La conexión se cierra
//! al soltarla, pase lo que pase.

use crate::error::Result;
use crate::http::Response;
use crate::server::{CancelToken, Connection, Discipline, ServerKind};
use chrono::{Local, Utc};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Largo máximo de una línea de request o de header
pub const MAX_LINE_BYTES: usize = 8 * 1024;

/// Resultado de un intercambio sin errores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    /// Se envió la respuesta completa
    Responded,
    /// El peer cerró o mandó una request line vacía: no se responde nada
    EmptyRequest,
}

/// Handler compartido por todos los workers de un servidor
#[derive(Debug, Clone)]
pub struct RequestHandler {
    discipline: Discipline,
    service_time: Duration,
    read_timeout: Option<Duration>,
    cancel: CancelToken,
}

impl RequestHandler {
    pub fn new(discipline: Discipline, service_time: Duration, read_timeout: Option<Duration>) -> Self {
        Self {
            discipline,
            service_time,
            read_timeout,
            cancel: CancelToken::new(),
        }
    }

    /// Usa `cancel` para el sleep de servicio (el pool lo cancela en force-shutdown)
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Atiende y cierra la conexión. Los errores se reportan, nunca se propagan.
    pub fn handle(&self, connection: Connection) {
        let peer = connection.peer();
        let stats = connection.stats();
        stats.increment_active();

        match self.exchange(&connection) {
            Ok(Exchange::Responded) => {
                stats.record_responded();
                debug!(peer = %peer, "response sent");
            }
            Ok(Exchange::EmptyRequest) => {
                debug!(peer = %peer, "empty request, closing");
            }
            Err(e) => {
                stats.record_error();
                warn!(peer = %peer, error = %e, "error handling client request");
            }
        }

        stats.decrement_active();
        // `connection` se suelta aquí: shutdown + contador de cerradas
    }

    /// Un intercambio request/response sobre `connection`
    pub fn exchange(&self, connection: &Connection) -> Result<Exchange> {
        let stream = connection.stream();
        // También con None: el socket aceptado hereda el SO_RCVTIMEO del listener
        stream.set_read_timeout(self.read_timeout)?;

        let mut reader = BufReader::new(stream);

        let mut line = Vec::new();
        if read_line_capped(&mut reader, &mut line)? == 0 || is_blank(&line) {
            return Ok(Exchange::EmptyRequest);
        }
        let request_line = String::from_utf8_lossy(&line);
        debug!(request = request_line.trim_end(), "received request");

        // Leer y descartar headers hasta la línea vacía o EOF. Los bytes no
        // tienen que ser UTF-8 válido.
        loop {
            line.clear();
            let n = read_line_capped(&mut reader, &mut line)?;
            if n == 0 || is_blank(&line) {
                break;
            }
        }

        self.cancel.sleep(self.service_time)?;

        let response = self.build_response(connection.local_port());
        let mut writer = stream;
        writer.write_all(&response.to_bytes())?;
        writer.flush()?;

        Ok(Exchange::Responded)
    }

    /// Etiqueta del servidor: por puerto local, o la propia disciplina si el
    /// puerto no es uno de los convencionales
    pub fn server_kind(&self, local_port: u16) -> ServerKind {
        match ServerKind::from_port(local_port) {
            ServerKind::Unknown => self.discipline.kind(),
            kind => kind,
        }
    }

    fn build_response(&self, local_port: u16) -> Response {
        let server_name = self.server_kind(local_port).display_name();
        let body = format!(
            "<!DOCTYPE html>\r\n\
             <html>\r\n\
             <head><title>Concurrency Benchmark Server</title></head>\r\n\
             <body>\r\n\
             <h1>Hello from {}</h1>\r\n\
             <p>Request processed by thread: {}</p>\r\n\
             <p>Current time: {}</p>\r\n\
             </body>\r\n\
             </html>",
            server_name,
            worker_identity(),
            Local::now().format("%Y-%m-%d %H:%M:%S"),
        );

        Response::html(&body)
            .with_header("Date", &http_date())
            .with_header("Connection", "close")
    }
}

/// Lee hasta `\n` inclusive, sin pasar de [`MAX_LINE_BYTES`]
fn read_line_capped<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<usize> {
    let n = reader
        .by_ref()
        .take(MAX_LINE_BYTES as u64)
        .read_until(b'\n', buf)?;
    if n == MAX_LINE_BYTES && buf.last() != Some(&b'\n') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line exceeds {} bytes", MAX_LINE_BYTES),
        ));
    }
    Ok(n)
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Nombre del thread actual, o su id si no tiene nombre
fn worker_identity() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}

/// Fecha RFC 1123 en GMT para el header `Date`
pub fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ServerStats;
    use std::io::Read;
    use std::net::{Shutdown, TcpListener, TcpStream};
    use std::sync::Arc;
    use std::time::Instant;

    fn handler(service_ms: u64) -> RequestHandler {
        RequestHandler::new(
            Discipline::Serial,
            Duration::from_millis(service_ms),
            Some(Duration::from_secs(5)),
        )
    }

    /// Conecta un cliente, acepta del lado servidor y ejecuta `f` en un thread
    fn serve_one<F>(f: F) -> (TcpStream, thread::JoinHandle<()>, Arc<ServerStats>)
    where
        F: FnOnce(Connection) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let stats = Arc::new(ServerStats::new());

        let t = thread::spawn({
            let stats = Arc::clone(&stats);
            move || {
                let (stream, _) = listener.accept().unwrap();
                f(Connection::new(stream, stats));
            }
        });

        let client = TcpStream::connect(addr).unwrap();
        (client, t, stats)
    }

    #[test]
    fn test_handle_full_exchange() {
        let h = handler(20);
        let (mut client, t, stats) = serve_one(move |conn| h.handle(conn));

        let start = Instant::now();
        client
            .write_all(b"GET / HTTP/1.0\r\nHost: localhost\r\nAccept: */*\r\n\r\n")
            .unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        let text = String::from_utf8_lossy(&buf);

        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(text.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/html\r\n"));
        assert!(text.contains("Date: "));
        assert!(text.contains("GMT\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        // Puerto efímero: la etiqueta sale de la disciplina
        assert!(text.contains("Hello from Single-Threaded Server"));
        assert!(text.contains("Request processed by thread:"));

        t.join().unwrap();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.responded, 1);
        assert_eq!(snapshot.closed, 1);
        assert_eq!(snapshot.active, 0);
    }

    #[test]
    fn test_peer_closed_immediately_sends_nothing() {
        let h = handler(0);
        let (client, t, stats) = serve_one(move |conn| {
            let outcome = h.exchange(&conn).unwrap();
            assert_eq!(outcome, Exchange::EmptyRequest);
        });
        drop(client);

        t.join().unwrap();
        assert_eq!(stats.snapshot().closed, 1);
    }

    #[test]
    fn test_blank_request_line_closes_quietly() {
        let h = handler(0);
        let (mut client, t, stats) = serve_one(move |conn| h.handle(conn));

        client.write_all(b"\r\n").unwrap();
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        assert!(buf.is_empty());

        t.join().unwrap();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.responded, 0);
        assert_eq!(snapshot.errors, 0);
        assert_eq!(snapshot.closed, 1);
    }

    #[test]
    fn test_headers_until_eof_still_responds() {
        let h = handler(0);
        let (mut client, t, _stats) = serve_one(move |conn| h.handle(conn));

        // Sin línea vacía final: el EOF termina la lectura de headers
        client.write_all(b"GET / HTTP/1.0\r\nHost: x\r\n").unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        assert!(String::from_utf8_lossy(&buf).contains("200 OK"));
        t.join().unwrap();
    }

    #[test]
    fn test_non_utf8_header_still_responds() {
        let h = handler(0);
        let (mut client, t, stats) = serve_one(move |conn| h.handle(conn));

        client
            .write_all(b"GET / HTTP/1.0\r\nUser-Agent: caf\xe9\r\n\r\n")
            .unwrap();
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        assert!(String::from_utf8_lossy(&buf).starts_with("HTTP/1.0 200 OK"));

        t.join().unwrap();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.responded, 1);
        assert_eq!(snapshot.errors, 0);
    }

    #[test]
    fn test_overlong_line_is_rejected() {
        let h = handler(0);
        let (mut client, t, stats) = serve_one(move |conn| h.handle(conn));

        let flood = vec![b'a'; MAX_LINE_BYTES + 16];
        let _ = client.write_all(&flood);
        let mut buf = Vec::new();
        let _ = client.read_to_end(&mut buf);
        assert!(buf.is_empty());

        t.join().unwrap();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.responded, 0);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.closed, 1);
    }

    #[test]
    fn test_read_line_capped_keeps_raw_bytes() {
        let mut reader = io::Cursor::new(b"Host: \xff\xfe\r\nrest".to_vec());
        let mut line = Vec::new();
        assert_eq!(read_line_capped(&mut reader, &mut line).unwrap(), 10);
        assert_eq!(line, b"Host: \xff\xfe\r\n");
        assert!(!is_blank(&line));
        assert!(is_blank(b"\r\n"));
    }

    #[test]
    fn test_cancelled_token_interrupts_and_closes() {
        let token = CancelToken::new();
        token.cancel();
        let h = handler(10_000).with_cancel_token(token);
        let (mut client, t, stats) = serve_one(move |conn| h.handle(conn));

        client.write_all(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        let mut buf = Vec::new();
        let _ = client.read_to_end(&mut buf);
        assert!(buf.is_empty());

        t.join().unwrap();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.closed, 1);
    }

    #[test]
    fn test_server_kind_by_port() {
        let h = RequestHandler::new(Discipline::SpawnPerConnection, Duration::ZERO, None);
        assert_eq!(h.server_kind(8080), ServerKind::SingleThreaded);
        assert_eq!(h.server_kind(8082), ServerKind::ThreadPool);
        assert_eq!(h.server_kind(40000), ServerKind::MultiThreaded);
    }

    #[test]
    fn test_http_date_format() {
        let date = http_date();
        assert!(date.ends_with(" GMT"));
        assert_eq!(date.split_whitespace().count(), 6);
    }
}
