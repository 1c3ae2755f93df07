//! Where protected areas come from.
//!
//! The engine only reads areas; storing and editing them belongs to the
//! caller. [`AreaSource`] is the seam:
//!
//! - [`MemoryAreaStore`]: a map from image identifier to areas.
//! - [`SidecarAreaStore`]: `<image>.areas.json` next to each image.
//!
//! Every area handed out has passed [`Area::validate`].
//!
//! ## Sidecar format
//!
//! ```json
//! [
//!   { "x1": 21, "y1": 46, "x2": 70, "y2": 95, "name": "face", "priority": 1 },
//!   { "x1": 0, "y1": 0, "x2": 10, "y2": 10 }
//! ]
//! ```

use crate::geometry::{Area, AreaError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix appended to an image path to find its areas.
pub const SIDECAR_SUFFIX: &str = ".areas.json";

#[derive(Error, Debug)]
pub enum AreaSourceError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed area file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Area {index} of {ident}: {source}")]
    Invalid {
        ident: String,
        index: usize,
        source: AreaError,
    },
}

/// Supplies the areas of an image, by identifier.
pub trait AreaSource: Sync {
    fn areas_for(&self, ident: &str) -> Result<Vec<Area>, AreaSourceError>;
}

fn validate_all(ident: &str, areas: &[Area]) -> Result<(), AreaSourceError> {
    for (index, area) in areas.iter().enumerate() {
        area.validate().map_err(|source| AreaSourceError::Invalid {
            ident: ident.to_string(),
            index,
            source,
        })?;
    }
    Ok(())
}

/// Parse and validate an area list from JSON.
pub fn parse_areas(ident: &str, path: &Path, json: &str) -> Result<Vec<Area>, AreaSourceError> {
    let areas: Vec<Area> = serde_json::from_str(json).map_err(|source| AreaSourceError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    validate_all(ident, &areas)?;
    Ok(areas)
}

/// Read an area file that must exist.
pub fn read_areas_file(ident: &str, path: &Path) -> Result<Vec<Area>, AreaSourceError> {
    let json = std::fs::read_to_string(path).map_err(|source| AreaSourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_areas(ident, path, &json)
}

/// Read an optional area file. A missing file means no areas.
pub fn load_areas_file(ident: &str, path: &Path) -> Result<Vec<Area>, AreaSourceError> {
    match read_areas_file(ident, path) {
        Err(AreaSourceError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            Ok(Vec::new())
        }
        result => result,
    }
}

/// Areas held in memory.
#[derive(Debug, Default)]
pub struct MemoryAreaStore {
    areas: HashMap<String, Vec<Area>>,
}

impl MemoryAreaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the areas of `ident`.
    pub fn set(&mut self, ident: &str, areas: Vec<Area>) -> Result<(), AreaSourceError> {
        validate_all(ident, &areas)?;
        self.areas.insert(ident.to_string(), areas);
        Ok(())
    }

    pub fn insert(&mut self, ident: &str, area: Area) -> Result<(), AreaSourceError> {
        let index = self.areas.get(ident).map_or(0, Vec::len);
        area.validate().map_err(|source| AreaSourceError::Invalid {
            ident: ident.to_string(),
            index,
            source,
        })?;
        self.areas.entry(ident.to_string()).or_default().push(area);
        Ok(())
    }
}

impl AreaSource for MemoryAreaStore {
    fn areas_for(&self, ident: &str) -> Result<Vec<Area>, AreaSourceError> {
        Ok(self.areas.get(ident).cloned().unwrap_or_default())
    }
}

/// Areas read from `<ident>.areas.json`, with `ident` resolved against `root`.
#[derive(Debug, Clone)]
pub struct SidecarAreaStore {
    root: PathBuf,
}

impl SidecarAreaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn sidecar_path(&self, ident: &str) -> PathBuf {
        self.root.join(format!("{ident}{SIDECAR_SUFFIX}"))
    }
}

impl AreaSource for SidecarAreaStore {
    fn areas_for(&self, ident: &str) -> Result<Vec<Area>, AreaSourceError> {
        load_areas_file(ident, &self.sidecar_path(ident))
    }
}
