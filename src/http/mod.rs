//! # Módulo HTTP
//!
//! Lo justo del protocolo HTTP/1.x para el benchmark, escrito a mano:
//!
//! - Construcción de la respuesta fija del servidor
//! - Status codes
//! - Un cliente `GET` bloqueante para el load driver
//!
//! No es un parser compatible: el servidor lee y descarta los headers, y el
//! cliente solo valida la status line.
//!
//! ### Formato de Request
//!
//! ```text
//! GET / HTTP/1.0\r\n
//! Host: localhost:8080\r\n
//! \r\n
//! ```

pub mod client;    // Cliente GET del load driver
pub mod response;  // Construcción de HTTP responses
pub mod status;    // Códigos de estado HTTP

pub use client::{ClientResponse, TargetUrl};
pub use response::Response;
pub use status::StatusCode;
