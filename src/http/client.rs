//! # Cliente HTTP Bloqueante
//! src/http/client.rs
//!
//! Cliente mínimo que usa el load driver: abre una conexión TCP nueva por
//! request, envía un `GET`, lee hasta que el servidor cierra y valida la
//! status line. No hay keep-alive ni redirecciones.

use crate::error::{Error, Result};
use crate::http::StatusCode;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

/// URL destino ya parseada (`http://host[:port][/path]`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl TargetUrl {
    /// Parsea una URL `http://`. Sin puerto explícito se asume 80.
    ///
    /// # Ejemplo
    /// ```
    /// use server_bench::http::TargetUrl;
    ///
    /// let url = TargetUrl::parse("http://localhost:8081/").unwrap();
    /// assert_eq!(url.port, 8081);
    /// assert_eq!(url.path, "/");
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let rest = raw
            .strip_prefix("http://")
            .ok_or_else(|| Error::InvalidUrl(format!("only http:// is supported: {}", raw)))?;

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };

        if authority.is_empty() {
            return Err(Error::InvalidUrl(format!("missing host: {}", raw)));
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| Error::InvalidUrl(format!("invalid port '{}' in {}", port, raw)))?;
                (host, port)
            }
            None => (authority, 80),
        };

        if host.is_empty() {
            return Err(Error::InvalidUrl(format!("missing host: {}", raw)));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }

    /// `host:port`
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "http://{}{}", self.authority(), self.path)
    }
}

/// Respuesta recibida por el cliente
#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Ejecuta un `GET` completo contra `url`
///
/// `timeout` aplica al connect y a cada lectura/escritura. Cualquier status
/// fuera de 2xx se reporta como [`Error::HttpStatus`].
pub fn get(url: &TargetUrl, timeout: Duration) -> Result<ClientResponse> {
    let mut stream = connect(url, timeout)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let request = format!(
        "GET {} HTTP/1.0\r\nHost: {}\r\nConnection: close\r\n\r\n",
        url.path,
        url.authority()
    );
    stream.write_all(request.as_bytes())?;
    stream.flush()?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw)?;

    let response = parse_response(&raw)?;
    if !response.status.is_success() {
        return Err(Error::HttpStatus(response.status.as_u16()));
    }
    Ok(response)
}

/// Conecta contra `host:port` probando todas las direcciones resueltas
/// (`localhost` puede resolver a `::1` antes que a `127.0.0.1`).
fn connect(url: &TargetUrl, timeout: Duration) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = url.authority().to_socket_addrs()?.collect();
    if addrs.is_empty() {
        return Err(Error::InvalidUrl(format!("cannot resolve {}", url.authority())));
    }
    connect_any(&addrs, timeout)
}

/// Primera dirección que acepta la conexión, en orden. Si ninguna lo hace,
/// retorna el error de la última.
fn connect_any(addrs: &[SocketAddr], timeout: Duration) -> Result<TcpStream> {
    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(%addr, error = %e, "connect failed, trying next address");
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(e) => Error::Io(e),
        None => Error::InvalidUrl("no address to connect to".to_string()),
    })
}

/// Separa status line, headers y body de una respuesta cruda
pub fn parse_response(raw: &[u8]) -> Result<ClientResponse> {
    let text = String::from_utf8_lossy(raw);

    let status_line = text
        .lines()
        .next()
        .ok_or_else(|| Error::InvalidResponse("empty response".to_string()))?;

    let mut parts = status_line.split_whitespace();
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") {
        return Err(Error::InvalidResponse(format!("bad status line: {}", status_line)));
    }

    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(StatusCode::from_u16)
        .ok_or_else(|| Error::InvalidResponse(format!("bad status code: {}", status_line)))?;

    let body = text
        .find("\r\n\r\n")
        .map(|pos| text[pos + 4..].to_string())
        .unwrap_or_default();

    Ok(ClientResponse { status, body })
}
