// ABOUTME: JSON side-file mapping remote keys to local document ids (WordPress post id, image URL).
// ABOUTME: Read once at run start and rewritten wholesale after every change.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ImportError;
use crate::store::DocId;

/// Remote key to local id map, optionally persisted as pretty JSON.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    path: Option<PathBuf>,
    entries: BTreeMap<String, DocId>,
}

impl IdMap {
    /// A map that lives only for this run.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the map at `path`; a missing file is an empty map.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ImportError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                ImportError::decode(
                    path.display().to_string(),
                    "LoadIdMap",
                    Some(anyhow::anyhow!("invalid id map: {}", e)),
                )
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(ImportError::io(
                    path.display().to_string(),
                    "LoadIdMap",
                    Some(e.into()),
                ))
            }
        };
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns true when the entry is new or changed.
    pub fn insert(&mut self, key: impl Into<String>, id: impl Into<DocId>) -> bool {
        let id = id.into();
        let previous = self.entries.insert(key.into(), id.clone());
        previous.as_deref() != Some(id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrites the side-file; a no-op for in-memory maps.
    pub fn save(&self) -> Result<(), ImportError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let target = path.display().to_string();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| ImportError::io(&target, "SaveIdMap", Some(e.into())))?;
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| ImportError::decode(&target, "SaveIdMap", Some(e.into())))?;
        fs::write(path, json).map_err(|e| ImportError::io(&target, "SaveIdMap", Some(e.into())))
    }
}
