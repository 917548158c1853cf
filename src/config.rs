//! # Configuración
//! src/config.rs
//!
//! Configuración de los dos binarios con soporte para argumentos CLI y
//! variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### Servidor
//! ```bash
//! ./server_bench --discipline pool --pool-size 10 --service-ms 100
//! BENCH_DISCIPLINE=all ./server_bench
//! ```
//!
//! ### Load driver
//! ```bash
//! ./load_driver http://localhost:8082/ 20 1 0
//! ```

use crate::error::{Error, Result};
use crate::http::TargetUrl;
use crate::server::{Discipline, ServerKind};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Puerto convencional del servidor serial
pub const SERIAL_PORT: u16 = 8080;
/// Puerto convencional del servidor thread-por-conexión
pub const SPAWN_PORT: u16 = 8081;
/// Puerto convencional del servidor con pool
pub const POOL_PORT: u16 = 8082;
/// Tamaño del pool en el puerto convencional
pub const DEFAULT_POOL_SIZE: usize = 10;
/// Tiempo de servicio simulado por request
pub const DEFAULT_SERVICE_MS: u64 = 100;
/// Directorio de los archivos persistentes
pub const DEFAULT_LOG_DIR: &str = "server_logs";

/// Disciplina elegida desde la línea de comandos
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DisciplineArg {
    /// Un único thread acepta y atiende
    Serial,
    /// Un thread nuevo por conexión
    Spawn,
    /// Pool fijo de workers
    Pool,
    /// Las tres disciplinas en sus puertos convencionales
    All,
}

/// Tiempos que gobiernan el accept loop y los handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerTiming {
    /// Sleep simulado dentro del handler
    pub service_time: Duration,
    /// Cada cuánto el accept loop vuelve a mirar el flag `running`
    pub accept_timeout: Duration,
    /// Espera máxima para vaciar el pool al detenerse
    pub drain_timeout: Duration,
    /// Timeout de lectura por conexión (`None` = sin límite)
    pub read_timeout: Option<Duration>,
}

impl Default for ServerTiming {
    fn default() -> Self {
        Self {
            service_time: Duration::from_millis(DEFAULT_SERVICE_MS),
            accept_timeout: Duration::from_secs(1),
            drain_timeout: Duration::from_secs(5),
            read_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Configuración del binario `server_bench`
#[derive(Debug, Clone, Parser)]
#[command(name = "server_bench")]
#[command(about = "Servidores HTTP mínimos con tres disciplinas de concurrencia")]
#[command(version)]
pub struct ServerConfig {
    /// Disciplina a levantar
    #[arg(short, long, value_enum, default_value = "all", env = "BENCH_DISCIPLINE")]
    pub discipline: DisciplineArg,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "BENCH_HOST")]
    pub host: String,

    /// Puerto (por defecto el convencional de la disciplina; se ignora con `all`)
    #[arg(short, long, env = "BENCH_PORT")]
    pub port: Option<u16>,

    /// Número de workers del pool
    #[arg(long = "pool-size", default_value = "10", env = "BENCH_POOL_SIZE")]
    pub pool_size: usize,

    /// Tiempo de servicio simulado en milisegundos
    #[arg(long = "service-ms", default_value = "100", env = "BENCH_SERVICE_MS")]
    pub service_ms: u64,

    /// Timeout del accept en milisegundos
    #[arg(long = "accept-timeout-ms", default_value = "1000")]
    pub accept_timeout_ms: u64,

    /// Tiempo máximo de drenado del pool en milisegundos
    #[arg(long = "drain-timeout-ms", default_value = "5000")]
    pub drain_timeout_ms: u64,

    /// Timeout de lectura por conexión en milisegundos (0 = sin límite)
    #[arg(long = "read-timeout-ms", default_value = "10000")]
    pub read_timeout_ms: u64,
}

impl ServerConfig {
    /// Valida la configuración
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::Config("Pool size must be >= 1".to_string()));
        }
        if self.accept_timeout_ms == 0 {
            return Err(Error::Config("Accept timeout must be > 0".to_string()));
        }
        if self.discipline == DisciplineArg::All && self.port.is_some() {
            return Err(Error::Config(
                "--port cannot be combined with --discipline all".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timing(&self) -> ServerTiming {
        ServerTiming {
            service_time: Duration::from_millis(self.service_ms),
            accept_timeout: Duration::from_millis(self.accept_timeout_ms),
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
            read_timeout: (self.read_timeout_ms > 0)
                .then(|| Duration::from_millis(self.read_timeout_ms)),
        }
    }

    /// Disciplinas a levantar, cada una con su puerto y dirección de bind
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let serial = Discipline::Serial;
        let spawn = Discipline::SpawnPerConnection;
        let pool = Discipline::BoundedPool { size: self.pool_size };

        let selected = match self.discipline {
            DisciplineArg::Serial => vec![serial],
            DisciplineArg::Spawn => vec![spawn],
            DisciplineArg::Pool => vec![pool],
            DisciplineArg::All => vec![serial, spawn, pool],
        };

        selected
            .into_iter()
            .map(|discipline| {
                let port = self.port.unwrap_or_else(|| discipline.conventional_port());
                Endpoint {
                    discipline,
                    port,
                    address: format!("{}:{}", self.host, port),
                }
            })
            .collect()
    }
}

/// Un servidor a levantar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub discipline: Discipline,
    pub port: u16,
    pub address: String,
}

impl Endpoint {
    /// Nombre del thread acceptor, por el puerto donde escucha
    pub fn thread_name(&self) -> String {
        format!("acceptor-{}", self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            discipline: DisciplineArg::All,
            host: "127.0.0.1".to_string(),
            port: None,
            pool_size: DEFAULT_POOL_SIZE,
            service_ms: DEFAULT_SERVICE_MS,
            accept_timeout_ms: 1000,
            drain_timeout_ms: 5000,
            read_timeout_ms: 10_000,
        }
    }
}

/// Configuración del binario `load_driver`
#[derive(Debug, Clone, Parser)]
#[command(name = "load_driver")]
#[command(about = "Genera carga concurrente contra un servidor y registra la latencia")]
#[command(version)]
pub struct LoadConfig {
    /// URL destino, p.ej. http://localhost:8080/
    pub url: String,

    /// Clientes virtuales concurrentes (N)
    pub clients: u32,

    /// Requests secuenciales por cliente (R)
    pub requests: u32,

    /// Pausa entre requests en milisegundos (D)
    pub delay_ms: u64,

    /// Directorio de los archivos de resultados
    #[arg(long = "log-dir", default_value = DEFAULT_LOG_DIR, env = "BENCH_LOG_DIR")]
    pub log_dir: PathBuf,

    /// Etiqueta del servidor (por defecto se deduce del puerto)
    #[arg(long)]
    pub label: Option<String>,

    /// Timeout de connect/lectura por request en milisegundos
    #[arg(long = "timeout-ms", default_value = "30000")]
    pub timeout_ms: u64,

    /// Espera máxima del test completo en segundos
    #[arg(long = "max-wait-secs", default_value = "3600")]
    pub max_wait_secs: u64,

    /// Imprime además el resultado como JSON
    #[arg(long)]
    pub json: bool,
}

impl LoadConfig {
    /// Configuración con los valores por defecto de las opciones
    pub fn new(url: &str, clients: u32, requests: u32, delay_ms: u64) -> Self {
        Self {
            url: url.to_string(),
            clients,
            requests,
            delay_ms,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            label: None,
            timeout_ms: 30_000,
            max_wait_secs: 3600,
            json: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.clients == 0 {
            return Err(Error::Config("Concurrent clients must be >= 1".to_string()));
        }
        if self.requests == 0 {
            return Err(Error::Config("Requests per client must be >= 1".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(Error::Config("Request timeout must be > 0".to_string()));
        }
        self.target()?;
        Ok(())
    }

    pub fn target(&self) -> Result<TargetUrl> {
        TargetUrl::parse(&self.url)
    }

    /// Etiqueta con la que se persiste el resultado
    pub fn server_type(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        let kind = self
            .target()
            .map(|url| ServerKind::from_port(url.port))
            .unwrap_or(ServerKind::Unknown);
        kind.label().to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}
