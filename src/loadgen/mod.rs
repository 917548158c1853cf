//! # Generador de Carga
//! src/loadgen/mod.rs
//!
//! `run_and_record` es el flujo completo de una invocación del load driver:
//!
//! 1. Ejecutar el test
//! 2. Agregar el resultado al store (un fallo de I/O se registra y se sigue)
//! 3. Recargar el store desde disco
//! 4. Construir la comparación, imprimirla y sobrescribir el reporte

pub mod driver;

pub use driver::LoadDriver;

use crate::config::LoadConfig;
use crate::error::Result;
use crate::results::{Comparison, ResultStore, TestResult};
use chrono::Local;
use std::path::Path;
use tracing::{error, info};

/// Resultado de una invocación completa
#[derive(Debug, Clone)]
pub struct BenchmarkRun {
    pub result: TestResult,
    pub comparison: Comparison,
    /// El CSV quedó con la fila nueva
    pub persisted: bool,
}

/// Ejecuta el test, lo registra y reescribe el reporte en `report_path`
///
/// Solo falla si la configuración es inválida: los errores del store y del
/// reporte se registran y el resultado en memoria sigue siendo válido.
pub fn run_and_record(
    config: &LoadConfig,
    store: &ResultStore,
    report_path: impl AsRef<Path>,
) -> Result<BenchmarkRun> {
    let driver = LoadDriver::new(config)?;
    let result = driver.run();

    println!("\nTest completed:");
    println!("{}", result);

    let persisted = match store.append(&result) {
        Ok(()) => true,
        Err(e) => {
            error!(path = %store.csv_path().display(), error = %e, "failed to append result");
            false
        }
    };

    match store.reload() {
        Ok(rows) => {
            info!(rows, "results reloaded from disk");
            if !persisted {
                store.remember(result.clone());
            }
        }
        Err(e) => error!(error = %e, "failed to reload results, using in-memory state"),
    }

    let comparison = Comparison::build(&store.results(), Local::now().naive_local());
    println!("\n{}", comparison.render());

    let report_path = report_path.as_ref();
    match comparison.write_report(report_path) {
        Ok(()) => info!(path = %report_path.display(), "comparison report written"),
        Err(e) => error!(path = %report_path.display(), error = %e, "failed to write comparison report"),
    }

    Ok(BenchmarkRun {
        result,
        comparison,
        persisted,
    })
}
