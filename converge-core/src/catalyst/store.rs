//! Catalyst persistence behind a single repository seam.
//!
//! The repository only knows how to load and save the whole collection.
//! [`CatalystStore`] layers the operations callers use on top and serializes
//! writers: every mutation is load → mutate → save while holding one lock.
//!
//! File layout for [`JsonFileRepository`]: a single pretty-printed JSON array.
//! Writes are atomic (write `{file}.tmp`, rename into place).

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::domain::Catalyst;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("catalyst store I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("catalyst store format at {path}: {source}")]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("catalyst store lock poisoned")]
    Poisoned,
}

/// Whole-collection storage for catalysts.
pub trait CatalystRepository: Send + Sync {
    /// Load every stored catalyst, in stored order.
    fn load(&self) -> Result<Vec<Catalyst>, StoreError>;

    /// Replace the stored collection.
    fn save(&self, catalysts: &[Catalyst]) -> Result<(), StoreError>;
}

/// JSON document on disk. A missing file is an empty collection.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CatalystRepository for JsonFileRepository {
    fn load(&self) -> Result<Vec<Catalyst>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, catalysts: &[Catalyst]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let json = serde_json::to_string_pretty(catalysts).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            self.io_err(e)
        })?;
        Ok(())
    }
}

/// Process-local repository for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    catalysts: Mutex<Vec<Catalyst>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, Vec<Catalyst>>, StoreError> {
        self.catalysts.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl CatalystRepository for InMemoryRepository {
    fn load(&self) -> Result<Vec<Catalyst>, StoreError> {
        Ok(self.guard()?.clone())
    }

    fn save(&self, catalysts: &[Catalyst]) -> Result<(), StoreError> {
        *self.guard()? = catalysts.to_vec();
        Ok(())
    }
}

/// Catalyst collection with single-writer discipline.
pub struct CatalystStore<R: CatalystRepository> {
    repo: R,
    write_lock: Mutex<()>,
}

impl<R: CatalystRepository> CatalystStore<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            write_lock: Mutex::new(()),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Run `mutate` over the full collection and persist the result.
    fn modify<T>(&self, mutate: impl FnOnce(&mut Vec<Catalyst>) -> T) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut catalysts = self.repo.load()?;
        let out = mutate(&mut catalysts);
        self.repo.save(&catalysts)?;
        tracing::info!(count = catalysts.len(), "catalyst store saved");
        Ok(out)
    }

    /// Append one record. Duplicates are kept; use [`upsert`](Self::upsert) to replace.
    pub fn append(&self, catalyst: Catalyst) -> Result<(), StoreError> {
        self.modify(|all| all.push(catalyst))
    }

    /// Append a batch in one write.
    pub fn append_all(&self, batch: Vec<Catalyst>) -> Result<usize, StoreError> {
        let n = batch.len();
        self.modify(|all| all.extend(batch))?;
        Ok(n)
    }

    /// Insert or replace the record for the same ticker, type, and date.
    ///
    /// Returns `true` if an existing record was replaced.
    pub fn upsert(&self, catalyst: Catalyst) -> Result<bool, StoreError> {
        self.modify(|all| match all.iter_mut().find(|c| c.same_event(&catalyst)) {
            Some(existing) => {
                *existing = catalyst;
                true
            }
            None => {
                all.push(catalyst);
                false
            }
        })
    }

    pub fn load_all(&self) -> Result<Vec<Catalyst>, StoreError> {
        self.repo.load()
    }

    pub fn for_ticker(&self, ticker: &str) -> Result<Vec<Catalyst>, StoreError> {
        Ok(self
            .repo
            .load()?
            .into_iter()
            .filter(|c| c.ticker.eq_ignore_ascii_case(ticker))
            .collect())
    }

    /// Records whose event is today or later. Expired records stay stored as history.
    pub fn active(&self, as_of: NaiveDate) -> Result<Vec<Catalyst>, StoreError> {
        Ok(self
            .repo
            .load()?
            .into_iter()
            .filter(|c| !c.is_expired(as_of))
            .collect())
    }
}
