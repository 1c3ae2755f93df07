//! Result cache for adjusted images.
//!
//! Running a pipeline means decoding, resampling and re-encoding, so the
//! encoded result is stored and reused until the inputs change.
//!
//! # Design
//!
//! ## Cache keys
//!
//! A result is identified by a [`CacheKey`]: the source image identifier
//! plus the serialized pipeline (`requested`, e.g. `fill|50|50||`). The
//! on-disk store addresses results by the SHA-256 [`CacheKey::digest`] of
//! the pair, so arbitrary identifiers never end up in file names.
//!
//! ## Invalidation
//!
//! Results only go stale when their inputs change. Image content changes
//! call for [`ResultCache::invalidate`] with `only_area_dependent = false`.
//! When just the areas of an image change, only the results whose pipeline
//! reads areas are dropped (`only_area_dependent = true`); a plain `fit`
//! survives.
//!
//! ## Concurrency
//!
//! `put` is last-writer-wins. Two workers computing the same key at the
//! same time both succeed; the pipeline executor re-checks before storing
//! and keeps whichever result got there first.
//!
//! ## Storage
//!
//! [`DiskCache`] lays results out as
//! `<root>/<digest[0..2]>/<digest[2..4]>/<digest>.bin` with a JSON manifest
//! at `<root>/manifest.json` recording the key of every digest. A missing,
//! corrupt or outdated manifest loads as empty.
//!
//! Results can drift from the manifest when blobs are deleted by hand, a
//! write is interrupted, or source images go away. [`DiskCache::clean`]
//! brings the two back in line.

use crate::adjustment::serialize::stage_kinds;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use walkdir::WalkDir;

/// Name of the manifest file within the cache directory.
const MANIFEST_FILENAME: &str = "manifest.json";

/// Version of the manifest format. Bump this to invalidate all existing
/// caches when the layout or key computation changes.
const MANIFEST_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Cache manifest error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Identity of one adjusted result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub ident: String,
    pub requested: String,
}

impl CacheKey {
    pub fn new(ident: impl Into<String>, requested: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            requested: requested.into(),
        }
    }

    /// SHA-256 of the key, as a hex string.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.ident.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.requested.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Whether the pipeline of this key reads areas. Unknown stages count as
    /// reading them.
    pub fn depends_on_areas(&self) -> bool {
        stage_kinds(&self.requested).any(|kind| kind.is_none_or(|kind| kind.apply_uses_areas()))
    }

    fn invalidated_by(&self, ident: &str, only_area_dependent: bool) -> bool {
        self.ident == ident && (!only_area_dependent || self.depends_on_areas())
    }
}

/// Storage for encoded results.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError>;

    /// Drop the results of `ident`. Returns how many were removed.
    fn invalidate(&self, ident: &str, only_area_dependent: bool) -> Result<usize, CacheError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A cache that never stores anything (`--no-cache`).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl ResultCache for NoCache {
    fn get(&self, _key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    fn put(&self, _key: &CacheKey, _bytes: &[u8]) -> Result<(), CacheError> {
        Ok(())
    }

    fn invalidate(&self, _ident: &str, _only_area_dependent: bool) -> Result<usize, CacheError> {
        Ok(0)
    }
}

/// Results kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        lock(&self.entries).insert(key.clone(), bytes.to_vec());
        Ok(())
    }

    fn invalidate(&self, ident: &str, only_area_dependent: bool) -> Result<usize, CacheError> {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|key, _| !key.invalidated_by(ident, only_area_dependent));
        Ok(before - entries.len())
    }
}

/// On-disk manifest mapping digests to their keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheKey>,
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
        }
    }

    /// Load from the cache directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(root: &Path) -> Self {
        let content = match std::fs::read_to_string(manifest_path(root)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(m) if m.version == MANIFEST_VERSION => m,
            _ => Self::empty(),
        }
    }

    pub fn save(&self, root: &Path) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(&manifest_path(root), json.as_bytes())?;
        Ok(())
    }
}

/// Resolve the manifest path for a cache directory.
pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILENAME)
}

/// Write through a uniquely named temporary file and rename into place,
/// so readers never see a partial file.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("tmp-{}-{n}", std::process::id()));
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

/// Content-addressed results under a directory.
#[derive(Debug)]
pub struct DiskCache {
    root: PathBuf,
    manifest: Mutex<CacheManifest>,
}

impl DiskCache {
    /// Open (creating if needed) the cache at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let manifest = CacheManifest::load(&root);
        Ok(Self {
            root,
            manifest: Mutex::new(manifest),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        lock(&self.manifest).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Where the result with `digest` is stored.
    pub fn blob_path(&self, digest: &str) -> PathBuf {
        self.root
            .join(&digest[..2])
            .join(&digest[2..4])
            .join(format!("{digest}.bin"))
    }

    /// Drop manifest entries whose stored result is missing or whose source
    /// no longer exists, then delete `.bin` files the manifest doesn't list
    /// and leftover temporary files. Other files are left alone.
    ///
    /// Run it while nothing else writes to the cache: an in-flight write's
    /// temporary file counts as leftover.
    pub fn clean(&self, source_exists: impl Fn(&str) -> bool) -> Result<CleanStats, CacheError> {
        let mut manifest = lock(&self.manifest);
        let mut stats = CleanStats::default();
        let mut stale = Vec::new();
        manifest.entries.retain(|digest, key| {
            if !is_digest(digest) || !self.blob_path(digest).is_file() {
                stats.missing_results += 1;
                false
            } else if !source_exists(&key.ident) {
                stale.push(digest.clone());
                false
            } else {
                true
            }
        });
        for digest in &stale {
            remove_if_present(&self.blob_path(digest))?;
        }
        stats.stale_sources = stale.len();

        let manifest_file = manifest_path(&self.root);
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(io::Error::from)?;
            let path = entry.path();
            if !entry.file_type().is_file() || path == manifest_file {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let orphaned = match name.strip_suffix(".bin") {
                Some(digest) => !manifest.entries.contains_key(digest),
                None => name.contains(".tmp-"),
            };
            if orphaned {
                remove_if_present(path)?;
                stats.orphaned_files += 1;
            }
        }

        if stats.missing_results > 0 || stats.stale_sources > 0 {
            manifest.save(&self.root)?;
        }
        Ok(stats)
    }
}

/// Manifest keys are lowercase hex SHA-256 digests.
fn is_digest(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

impl ResultCache for DiskCache {
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let digest = key.digest();
        if !lock(&self.manifest).entries.contains_key(&digest) {
            return Ok(None);
        }
        match std::fs::read(self.blob_path(&digest)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        let digest = key.digest();
        let path = self.blob_path(&digest);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_atomic(&path, bytes)?;

        let mut manifest = lock(&self.manifest);
        manifest.entries.insert(digest, key.clone());
        manifest.save(&self.root)
    }

    fn invalidate(&self, ident: &str, only_area_dependent: bool) -> Result<usize, CacheError> {
        let mut manifest = lock(&self.manifest);
        let stale: Vec<String> = manifest
            .entries
            .iter()
            .filter(|(_, key)| key.invalidated_by(ident, only_area_dependent))
            .map(|(digest, _)| digest.clone())
            .collect();
        for digest in &stale {
            remove_if_present(&self.blob_path(digest))?;
            manifest.entries.remove(digest);
        }
        if !stale.is_empty() {
            manifest.save(&self.root)?;
        }
        Ok(stale.len())
    }
}

/// Summary of cache behaviour over a batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub computed: u32,
    pub duplicates: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.computed + self.duplicates
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits == 0 && self.duplicates == 0 {
            return write!(f, "{} computed", self.computed);
        }
        write!(f, "{} cached, {} computed", self.hits, self.computed)?;
        if self.duplicates > 0 {
            write!(f, ", {} duplicate", self.duplicates)?;
        }
        write!(f, " ({} total)", self.total())
    }
}

/// What [`DiskCache::clean`] removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanStats {
    /// Entries whose stored result had disappeared.
    pub missing_results: usize,
    /// Entries (and their results) for sources that no longer exist.
    pub stale_sources: usize,
    /// Unlisted result files and leftover temporary files.
    pub orphaned_files: usize,
}

impl fmt::Display for CleanStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::default() {
            return f.write_str("nothing to clean");
        }
        write!(
            f,
            "{} missing, {} stale, {} orphaned",
            self.missing_results, self.stale_sources, self.orphaned_files
        )
    }
}
