//! Disk-backed memoization for expensive computations.
//!
//! A cache hit is decided by one thing only: whether the cache file exists.
//! The stored value is never checked against the computation or its
//! arguments, so the path must encode everything the result depends on.
//! Deleting the file is the only way to force recomputation.
//!
//! There is no locking and no atomic write. Two processes racing on one path
//! may both compute, and one may read the other's half-written file.
//!
//! # Example
//!
//! ```rust,no_run
//! use qntx_analysis::cache::cached;
//!
//! # fn main() -> qntx_analysis::Result<()> {
//! let squares = cached("/tmp/squares-100.json", |n: usize| {
//!     (0..n).map(|i| (i * i) as f64).collect::<Vec<f64>>()
//! });
//!
//! let first = squares.call(100)?; // computes and stores
//! let again = squares.call(100)?; // loads from disk
//! assert_eq!(first, again);
//! # Ok(())
//! # }
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::tracing::prefix;

/// A single JSON cache artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskCache {
    path: PathBuf,
}

impl DiskCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the next lookup will load instead of compute.
    pub fn is_hit(&self) -> bool {
        self.path.exists()
    }

    /// Deserialize the stored value.
    pub fn load<T: DeserializeOwned>(&self) -> Result<T> {
        let reader = BufReader::new(File::open(&self.path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Serialize `value` to the cache path, replacing any existing file.
    ///
    /// The encoded value is read back before the file is touched, so a value
    /// that JSON cannot hold (NaN or infinite floats) fails here instead of
    /// on the next load.
    pub fn store<T: Serialize + DeserializeOwned>(&self, value: &T) -> Result<()> {
        let encoded = serde_json::to_vec(value)?;
        serde_json::from_slice::<T>(&encoded)?;

        let mut writer = BufWriter::new(File::create(&self.path)?);
        writer.write_all(&encoded)?;
        writer.flush()?;
        Ok(())
    }

    /// Load the stored value if the file exists, otherwise run `compute` and
    /// store its result.
    pub fn get_or_compute<T, F>(&self, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        self.get_or_try_compute(|| Ok(compute()))
    }

    /// Like [`get_or_compute`](Self::get_or_compute) for fallible
    /// computations. Nothing is written when `compute` fails.
    pub fn get_or_try_compute<T, F>(&self, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        if self.is_hit() {
            info!("{} load from {}", prefix::CACHE, self.path.display());
            return self.load();
        }

        let value = compute()?;
        self.store(&value)?;
        debug!("{} stored {}", prefix::CACHE, self.path.display());
        Ok(value)
    }
}

/// A computation wrapped with a [`DiskCache`]. Built by [`cached`].
///
/// On a hit the arguments are ignored and the computation is not run.
pub struct Cached<F> {
    cache: DiskCache,
    compute: F,
}

impl<F> Cached<F> {
    pub fn new(cache: DiskCache, compute: F) -> Self {
        Self { cache, compute }
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    /// Load or compute-and-store. Use a tuple for several arguments and `()`
    /// for none.
    pub fn call<A, T>(&self, args: A) -> Result<T>
    where
        F: Fn(A) -> T,
        T: Serialize + DeserializeOwned,
    {
        self.cache.get_or_compute(|| (self.compute)(args))
    }

    /// Like [`call`](Self::call) for computations that return a `Result`.
    pub fn try_call<A, T>(&self, args: A) -> Result<T>
    where
        F: Fn(A) -> Result<T>,
        T: Serialize + DeserializeOwned,
    {
        self.cache.get_or_try_compute(|| (self.compute)(args))
    }
}

/// Wrap `compute` so its result is persisted at `path`.
pub fn cached<F>(path: impl Into<PathBuf>, compute: F) -> Cached<F> {
    Cached::new(DiskCache::new(path), compute)
}
