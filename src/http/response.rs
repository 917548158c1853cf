//! # Construcción de Respuestas HTTP
//!
//! API mínima para construir la respuesta fija del benchmark y convertirla
//! a bytes para enviarla por el socket.
//!
//! ## Formato
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: text/html\r\n
//! Date: Tue, 15 Nov 1994 08:12:31 GMT\r\n
//! Connection: close\r\n
//! Content-Length: 120\r\n
//! \r\n
//! <!DOCTYPE html>...
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use server_bench::http::{Response, StatusCode};
//!
//! let response = Response::html("<h1>Hola</h1>")
//!     .with_header("Connection", "close");
//!
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.0 200 OK\r\n"));
//! ```

use super::StatusCode;

/// Representa una respuesta HTTP/1.0 completa
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,

    /// Headers en orden de inserción (un nombre aparece una sola vez)
    headers: Vec<(String, String)>,

    body: Vec<u8>,
}

impl Response {
    /// Crea una respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Respuesta `200 OK` con `Content-Type: text/html`
    pub fn html(body: &str) -> Self {
        Self::new(StatusCode::OK)
            .with_header("Content-Type", "text/html")
            .with_body(body)
    }

    /// Agrega un header. Si ya existe (sin distinguir mayúsculas), se sobrescribe.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Versión mutable de [`Response::with_header`]
    pub fn add_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some((_, existing_value)) => *existing_value = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Establece el body y calcula `Content-Length`
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        let len = self.body.len().to_string();
        self.add_header("Content-Length", &len);
        self
    }

    /// Convierte la respuesta a bytes listos para el socket
    ///
    /// - Status line: `HTTP/1.0 200 OK\r\n`
    /// - Headers: `Header-Name: Value\r\n`
    /// - Línea vacía: `\r\n`
    /// - Body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(128 + self.body.len());

        result.extend_from_slice(format!("HTTP/1.0 {}\r\n", self.status).as_bytes());

        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);

        result
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Busca un header por nombre (sin distinguir mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_response() {
        let response = Response::new(StatusCode::OK);
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.header("Content-Type").is_none());
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_html_response() {
        let response = Response::html("<p>hi</p>");
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.header("Content-Length"), Some("9"));
    }

    #[test]
    fn test_header_overwrite_keeps_single_entry() {
        let response = Response::new(StatusCode::OK)
            .with_header("Connection", "keep-alive")
            .with_header("connection", "close");

        let text = String::from_utf8(response.to_bytes()).unwrap();
        assert_eq!(text.matches("onnection:").count(), 1);
        assert_eq!(response.header("Connection"), Some("close"));
    }

    #[test]
    fn test_to_bytes_preserves_header_order() {
        let response = Response::html("Test")
            .with_header("Date", "now")
            .with_header("Connection", "close");

        let text = String::from_utf8(response.to_bytes()).unwrap();

        assert!(text.starts_with("HTTP/1.0 200 OK\r\n"));
        let content_type = text.find("Content-Type").unwrap();
        let date = text.find("Date").unwrap();
        let connection = text.find("Connection").unwrap();
        assert!(content_type < date && date < connection);
        assert!(text.ends_with("\r\n\r\nTest"));
    }

    #[test]
    fn test_empty_body_response() {
        let text = String::from_utf8(Response::new(StatusCode::OK).to_bytes()).unwrap();
        assert!(text.ends_with("\r\n\r\n"));
    }
}
