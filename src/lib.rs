//! # Server Bench
//! src/lib.rs
//!
//! Banco de pruebas para comparar tres disciplinas de concurrencia en un
//! servidor HTTP mínimo: un solo thread, un thread por conexión y un pool
//! fijo de workers. Un load driver genera carga, mide latencias sin locks y
//! registra cada test en un CSV del que sale un reporte comparativo.
//!
//! ## Arquitectura
//!
//! - `server`: accept loop, disciplinas de despacho, handler y pool
//! - `http`: respuesta del servidor y cliente `GET` del load driver
//! - `loadgen`: clientes virtuales y flujo completo de un test
//! - `metrics`: contadores del servidor y `LatencyBucket` lock-free
//! - `results`: `TestResult`, store CSV y comparador
//! - `config`: argumentos CLI de los dos binarios
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use server_bench::config::ServerTiming;
//! use server_bench::server::{Discipline, Server};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let server = Arc::new(Server::new(
//!     Discipline::BoundedPool { size: 10 },
//!     "127.0.0.1:8082",
//!     ServerTiming::default(),
//! ));
//!
//! let runner = Arc::clone(&server);
//! let handle = thread::spawn(move || runner.start());
//!
//! // ... generar carga ...
//!
//! server.stop();
//! handle.join().unwrap().unwrap();
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod loadgen;
pub mod metrics;
pub mod results;
pub mod server;

pub use error::{Error, Result};
