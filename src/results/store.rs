//! # Store de Resultados
//! src/results/store.rs
//!
//! Historial persistente de tests en un CSV append-only. El archivo nunca se
//! trunca ni se reescribe: cada test agrega una fila. En memoria se mantiene
//! un mapa `(serverType, N, R, D) -> TestResult` donde gana la última fila
//! leída o agregada.

use crate::error::Result;
use crate::results::record::{ResultKey, TestResult, CSV_HEADER};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Nombre del CSV dentro del directorio de logs
pub const LOG_FILE: &str = "performance_log.csv";

/// Nombre del reporte de comparación
pub const REPORT_FILE: &str = "comparison_results.txt";

/// Store de resultados respaldado por un CSV
pub struct ResultStore {
    /// Directorio de logs
    dir: PathBuf,

    /// Cache en memoria, última escritura gana
    results: Arc<Mutex<BTreeMap<ResultKey, TestResult>>>,
}

impl ResultStore {
    /// Abre (o crea) el directorio y el CSV con su header y carga lo existente
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let store = Self {
            dir,
            results: Arc::new(Mutex::new(BTreeMap::new())),
        };
        store.ensure_header()?;
        store.reload()?;
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ResultKey, TestResult>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Escribe el header solo si el archivo no existe o está vacío
    fn ensure_header(&self) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.csv_path())?;

        if file.metadata()?.len() == 0 {
            writeln!(file, "{}", CSV_HEADER)?;
            debug!(path = %self.csv_path().display(), "created results log");
        }
        Ok(())
    }

    pub fn csv_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(REPORT_FILE)
    }

    /// Inserta solo en memoria
    pub fn remember(&self, result: TestResult) {
        self.lock().insert(result.key(), result);
    }

    /// Inserta en memoria y agrega la fila al CSV
    ///
    /// Si la escritura falla, el resultado ya quedó en memoria y el error se
    /// retorna para que el llamador lo registre.
    pub fn append(&self, result: &TestResult) -> Result<()> {
        self.remember(result.clone());

        self.ensure_header()?;
        let mut file = OpenOptions::new().append(true).open(self.csv_path())?;
        writeln!(file, "{}", result.to_csv_row())?;
        file.flush()?;
        Ok(())
    }

    /// Lee todas las filas válidas del CSV en orden de archivo.
    /// Las filas malformadas se saltan con un warning.
    pub fn history(&self) -> Result<Vec<TestResult>> {
        let file = File::open(self.csv_path())?;
        let reader = BufReader::new(file);
        let mut rows = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            if line.trim().is_empty() || line.starts_with("Timestamp,") {
                continue;
            }
            match TestResult::from_csv_row(&line, line_no) {
                Ok(result) => rows.push(result),
                Err(e) => warn!(line = line_no, error = %e, "skipping malformed results row"),
            }
        }

        Ok(rows)
    }

    /// Reconstruye el mapa desde el archivo. Retorna las filas válidas leídas.
    pub fn reload(&self) -> Result<usize> {
        let rows = self.history()?;
        let loaded = rows.len();

        let mut map = BTreeMap::new();
        for result in rows {
            map.insert(result.key(), result);
        }
        *self.lock() = map;

        debug!(rows = loaded, "results log reloaded");
        Ok(loaded)
    }

    pub fn get(&self, key: &ResultKey) -> Option<TestResult> {
        self.lock().get(key).cloned()
    }

    /// Resultados vigentes, ordenados por clave
    pub fn results(&self) -> Vec<TestResult> {
        self.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for ResultStore {
    fn clone(&self) -> Self {
        Self {
            dir: self.dir.clone(),
            results: Arc::clone(&self.results),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::LatencyBucket;
    use crate::results::LoadParams;
    use std::time::Duration;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "server_bench_store_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn result(server_type: &str, clients: u32, samples: &[u64]) -> TestResult {
        let bucket = LatencyBucket::new();
        for sample in samples {
            bucket.record_success(*sample);
        }
        TestResult::seal(
            server_type,
            LoadParams {
                clients,
                requests: 1,
                delay_ms: 0,
            },
            Duration::from_millis(500),
            &bucket.snapshot(),
            false,
        )
    }

    fn file_lines(store: &ResultStore) -> Vec<String> {
        fs::read_to_string(store.csv_path())
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_open_creates_header() {
        let dir = temp_dir("header");
        let store = ResultStore::open(&dir).unwrap();

        assert_eq!(file_lines(&store), vec![CSV_HEADER.to_string()]);
        assert!(store.is_empty());

        // Reabrir no duplica el header
        let store = ResultStore::open(&dir).unwrap();
        assert_eq!(file_lines(&store).len(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_append_then_reload() {
        let dir = temp_dir("reload");
        let store = ResultStore::open(&dir).unwrap();

        let appended = result("ThreadPool", 20, &[101, 205]);
        store.append(&appended).unwrap();

        let reopened = ResultStore::open(&dir).unwrap();
        let loaded = reopened.get(&appended.key()).unwrap();
        assert_eq!(loaded.to_csv_row(), appended.to_csv_row());
        assert_eq!(loaded.max_response_ms, 205);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_duplicate_key_last_write_wins() {
        let dir = temp_dir("dup");
        let store = ResultStore::open(&dir).unwrap();

        let first = result("SingleThreaded", 5, &[100]);
        let second = result("SingleThreaded", 5, &[300]);
        store.append(&first).unwrap();
        store.append(&second).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&first.key()).unwrap().max_response_ms, 300);
        assert_eq!(file_lines(&store).len(), 3);

        store.reload().unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&first.key()).unwrap().max_response_ms, 300);
        assert_eq!(store.history().unwrap().len(), 2);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_distinct_keys_are_kept() {
        let dir = temp_dir("distinct");
        let store = ResultStore::open(&dir).unwrap();

        store.append(&result("SingleThreaded", 5, &[100])).unwrap();
        store.append(&result("MultiThreaded", 5, &[100])).unwrap();
        store.append(&result("MultiThreaded", 6, &[100])).unwrap();

        assert_eq!(store.len(), 3);
        store.reload().unwrap();
        assert_eq!(store.len(), 3);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let dir = temp_dir("malformed");
        let store = ResultStore::open(&dir).unwrap();
        store.append(&result("ThreadPool", 3, &[50])).unwrap();

        let mut file = OpenOptions::new().append(true).open(store.csv_path()).unwrap();
        writeln!(file, "garbage,row").unwrap();
        writeln!(file).unwrap();
        drop(file);
        store.append(&result("MultiThreaded", 3, &[60])).unwrap();

        assert_eq!(store.reload().unwrap(), 2);
        assert_eq!(store.len(), 2);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_is_never_truncated() {
        let dir = temp_dir("append_only");
        let store = ResultStore::open(&dir).unwrap();
        store.append(&result("ThreadPool", 1, &[10])).unwrap();
        let before = fs::read_to_string(store.csv_path()).unwrap();

        let store = ResultStore::open(&dir).unwrap();
        store.append(&result("ThreadPool", 2, &[10])).unwrap();
        let after = fs::read_to_string(store.csv_path()).unwrap();

        assert!(after.starts_with(&before));
        assert_eq!(after.lines().count(), 3);

        let _ = fs::remove_dir_all(&dir);
    }
}
