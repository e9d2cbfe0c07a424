//! Bot catalog: descriptor records for builtin and uploaded bots.
//!
//! The catalog is the single owner of [`BotDescriptor`] records. Builtin
//! bots are discovered by scanning a directory at startup; uploads go
//! through [`vet_source`](crate::vet_source) and either land in the
//! uploads directory with a descriptor, or in quarantine with a
//! [`SecurityLogEntry`](crate::SecurityLogEntry). Readers (the match
//! coordinators) share the catalog behind an `Arc`; the descriptor map is
//! read-mostly and guarded by an `RwLock`.

use crate::security_log::SecurityLog;
use crate::vetter::{vet_source, SecurityViolation, ViolationKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

/// Where a bot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Shipped with the server; trusted source tree.
    Builtin,
    /// Uploaded by a user and accepted by the vetter.
    Uploaded,
}

/// Catalog record for one playable bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotDescriptor {
    /// Unique bot name (the file stem).
    pub name: String,
    /// Builtin or uploaded.
    pub provenance: Provenance,
    /// Path to the vetted source file.
    pub path: PathBuf,
    /// Upload time; `None` for builtin bots.
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Upload filename does not end in `.py`.
    #[error("bot file must be a Python file (.py), got '{0}'")]
    NotPython(String),
    /// A bot with this name already exists.
    #[error("bot '{0}' already exists")]
    Duplicate(String),
    /// No bot with this name.
    #[error("bot '{0}' not found")]
    NotFound(String),
    /// Builtin bots cannot be removed.
    #[error("builtin bot '{0}' cannot be removed")]
    BuiltinImmutable(String),
    /// The vetter rejected the upload; the full report is attached and
    /// the file is already quarantined.
    #[error("bot source rejected with {} violation(s)", .0.len())]
    Rejected(Vec<SecurityViolation>),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Thread-safe directory of playable bots.
pub struct BotCatalog {
    uploads_dir: PathBuf,
    bots: RwLock<HashMap<String, BotDescriptor>>,
    security_log: SecurityLog,
}

impl BotCatalog {
    /// Opens the catalog, creating the storage directories and scanning
    /// `builtin_dir` and `uploads_dir` for existing bots.
    pub fn open(
        builtin_dir: &Path,
        uploads_dir: &Path,
        quarantine_dir: &Path,
    ) -> std::io::Result<Self> {
        std::fs::create_dir_all(uploads_dir)?;
        let security_log = SecurityLog::open(quarantine_dir)?;

        let mut bots = HashMap::new();
        scan_dir(builtin_dir, Provenance::Builtin, &mut bots)?;
        scan_dir(uploads_dir, Provenance::Uploaded, &mut bots)?;
        tracing::info!(count = bots.len(), "bot catalog loaded");

        Ok(BotCatalog {
            uploads_dir: uploads_dir.to_path_buf(),
            bots: RwLock::new(bots),
            security_log,
        })
    }

    /// All descriptors, sorted by name.
    pub fn list(&self) -> Vec<BotDescriptor> {
        let bots = self.bots.read().unwrap_or_else(|e| e.into_inner());
        let mut list: Vec<BotDescriptor> = bots.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Looks up one descriptor by name.
    pub fn get(&self, name: &str) -> Option<BotDescriptor> {
        let bots = self.bots.read().unwrap_or_else(|e| e.into_inner());
        bots.get(name).cloned()
    }

    /// Vets and registers an uploaded bot.
    ///
    /// On rejection the source is quarantined, an audit entry is written
    /// with the caller-supplied `submitter` identity, and the complete
    /// violation list is returned in [`CatalogError::Rejected`].
    pub fn upload(
        &self,
        filename: &str,
        content: &[u8],
        submitter: &str,
    ) -> Result<BotDescriptor, CatalogError> {
        let Some(name) = filename.strip_suffix(".py") else {
            return Err(CatalogError::NotPython(filename.to_string()));
        };
        if name.is_empty() {
            return Err(CatalogError::NotPython(filename.to_string()));
        }

        {
            let bots = self.bots.read().unwrap_or_else(|e| e.into_inner());
            if bots.contains_key(name) {
                return Err(CatalogError::Duplicate(name.to_string()));
            }
        }

        let source = match std::str::from_utf8(content) {
            Ok(source) => source,
            Err(_) => {
                let violations = vec![SecurityViolation {
                    kind: ViolationKind::SyntaxError,
                    line: 1,
                    snippet: String::new(),
                    detail: "file is not valid UTF-8".to_string(),
                }];
                self.security_log
                    .record(filename, submitter, &violations, content)?;
                return Err(CatalogError::Rejected(violations));
            }
        };

        if let Err(violations) = vet_source(source, filename) {
            self.security_log
                .record(filename, submitter, &violations, content)?;
            return Err(CatalogError::Rejected(violations));
        }

        let path = self.uploads_dir.join(filename);
        std::fs::write(&path, content)?;

        let descriptor = BotDescriptor {
            name: name.to_string(),
            provenance: Provenance::Uploaded,
            path,
            uploaded_at: Some(Utc::now()),
        };

        let mut bots = self.bots.write().unwrap_or_else(|e| e.into_inner());
        // a racing upload may have won; keep creation atomic per name
        if bots.contains_key(name) {
            return Err(CatalogError::Duplicate(name.to_string()));
        }
        bots.insert(name.to_string(), descriptor.clone());
        tracing::info!(name, "bot uploaded and vetted");
        Ok(descriptor)
    }

    /// Removes an uploaded bot and deletes its source file.
    pub fn remove(&self, name: &str) -> Result<(), CatalogError> {
        let mut bots = self.bots.write().unwrap_or_else(|e| e.into_inner());
        let descriptor = bots
            .get(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        if descriptor.provenance == Provenance::Builtin {
            return Err(CatalogError::BuiltinImmutable(name.to_string()));
        }

        std::fs::remove_file(&descriptor.path)?;
        bots.remove(name);
        tracing::info!(name, "bot removed");
        Ok(())
    }

    /// Read access to the audit trail of rejected uploads.
    pub fn security_entries(&self) -> std::io::Result<Vec<crate::SecurityLogEntry>> {
        self.security_log.entries()
    }
}

/// Registers every `*.py` file in `dir` (ignoring `_`-prefixed names).
fn scan_dir(
    dir: &Path,
    provenance: Provenance,
    bots: &mut HashMap<String, BotDescriptor>,
) -> std::io::Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if path.extension().and_then(|e| e.to_str()) != Some("py") || stem.starts_with('_') {
            continue;
        }
        bots.insert(
            stem.to_string(),
            BotDescriptor {
                name: stem.to_string(),
                provenance,
                path,
                uploaded_at: None,
            },
        );
    }
    Ok(())
}
