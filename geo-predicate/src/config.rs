//! Spatial evaluation configuration.
//!
//! Names the schema fields the evaluator reads and the services it relies on.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::crs::{Reprojector, StandardReprojector};

/// Default name of the stored geometry field.
pub const DEFAULT_GEOMETRY_FIELD: &str = "geometry";

/// Default name of the stored record identifier field.
pub const DEFAULT_ID_FIELD: &str = "id";

/// Default number of decompressed doc store blocks cached per segment scan.
pub const DEFAULT_STORE_CACHE_BLOCKS: usize = 10;

/// Spatial configuration wrapper.
///
/// A cloneable, thread-safe configuration holder. Clones share the same
/// settings; queries keep a [`snapshot`](Self::snapshot) taken when the
/// configuration is handed to them.
///
/// # Example
///
/// ```rust
/// use geo_predicate::SpatialConfig;
///
/// let config = SpatialConfig::new()
///     .with_geometry_field("shape")
///     .with_id_field("uid")
///     .with_store_cache_blocks(4);
/// assert_eq!(config.geometry_field(), "shape");
/// ```
#[derive(Clone)]
pub struct SpatialConfig {
    inner: Arc<SpatialConfigInner>,
}

struct SpatialConfigInner {
    geometry_field: RwLock<String>,
    id_field: RwLock<String>,
    store_cache_blocks: AtomicUsize,
    reprojector: RwLock<Arc<dyn Reprojector>>,
}

impl SpatialConfig {
    /// Creates a configuration with default values.
    ///
    /// Defaults:
    /// - Geometry field: `geometry`
    /// - Record id field: `id`
    /// - Store cache blocks: 10
    /// - Reprojector: [`StandardReprojector`]
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SpatialConfigInner::new()),
        }
    }

    #[inline]
    pub fn geometry_field(&self) -> String {
        self.inner.geometry_field.read().clone()
    }

    #[inline]
    pub fn set_geometry_field(&self, name: impl Into<String>) {
        *self.inner.geometry_field.write() = name.into();
    }

    /// Builder-style method for chaining.
    #[inline]
    pub fn with_geometry_field(self, name: impl Into<String>) -> Self {
        self.set_geometry_field(name);
        self
    }

    #[inline]
    pub fn id_field(&self) -> String {
        self.inner.id_field.read().clone()
    }

    #[inline]
    pub fn set_id_field(&self, name: impl Into<String>) {
        *self.inner.id_field.write() = name.into();
    }

    /// Builder-style method for chaining.
    #[inline]
    pub fn with_id_field(self, name: impl Into<String>) -> Self {
        self.set_id_field(name);
        self
    }

    #[inline]
    pub fn store_cache_blocks(&self) -> usize {
        self.inner.store_cache_blocks.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_store_cache_blocks(&self, blocks: usize) {
        self.inner.store_cache_blocks.store(blocks, Ordering::Relaxed);
    }

    /// Builder-style method for chaining.
    #[inline]
    pub fn with_store_cache_blocks(self, blocks: usize) -> Self {
        self.set_store_cache_blocks(blocks);
        self
    }

    #[inline]
    pub fn reprojector(&self) -> Arc<dyn Reprojector> {
        self.inner.reprojector.read().clone()
    }

    #[inline]
    pub fn set_reprojector(&self, reprojector: Arc<dyn Reprojector>) {
        *self.inner.reprojector.write() = reprojector;
    }

    /// Builder-style method for chaining.
    #[inline]
    pub fn with_reprojector(self, reprojector: Arc<dyn Reprojector>) -> Self {
        self.set_reprojector(reprojector);
        self
    }

    /// Copies the current values into a configuration that shares nothing
    /// with this one.
    pub fn snapshot(&self) -> Self {
        Self {
            inner: Arc::new(SpatialConfigInner {
                geometry_field: RwLock::new(self.geometry_field()),
                id_field: RwLock::new(self.id_field()),
                store_cache_blocks: AtomicUsize::new(self.store_cache_blocks()),
                reprojector: RwLock::new(self.reprojector()),
            }),
        }
    }
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SpatialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialConfig")
            .field("geometry_field", &self.geometry_field())
            .field("id_field", &self.id_field())
            .field("store_cache_blocks", &self.store_cache_blocks())
            .finish_non_exhaustive()
    }
}

impl SpatialConfigInner {
    fn new() -> Self {
        Self {
            geometry_field: RwLock::new(DEFAULT_GEOMETRY_FIELD.to_string()),
            id_field: RwLock::new(DEFAULT_ID_FIELD.to_string()),
            store_cache_blocks: AtomicUsize::new(DEFAULT_STORE_CACHE_BLOCKS),
            reprojector: RwLock::new(Arc::new(StandardReprojector)),
        }
    }
}
