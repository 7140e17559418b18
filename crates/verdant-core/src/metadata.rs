#![forbid(unsafe_code)]

//! Declarative per-type metadata.
//!
//! View-model types declare which of their properties are exempt from dirty
//! tracking, and command types declare which parent properties their
//! executability depends on. A type implements [`DeclareMetadata`] once; the
//! declaration runs the first time [`metadata_for`] is asked about that type
//! and the frozen result is shared by every later lookup.

use std::any::{TypeId, type_name};
use std::sync::{Arc, OnceLock, RwLock};

use ahash::{AHashMap, AHashSet};

/// Static declaration hook for a concrete view-model or command type.
pub trait DeclareMetadata: 'static {
    /// Record this type's metadata. The default declares nothing.
    fn declare(_meta: &mut MetadataBuilder)
    where
        Self: Sized,
    {
    }
}

/// Collects declarations for one type.
#[derive(Debug, Default)]
pub struct MetadataBuilder {
    dirty_ignored: Vec<&'static str>,
    can_execute_sources: Vec<&'static str>,
}

impl MetadataBuilder {
    /// Exclude property (or tracked collection) `name` from dirty tracking.
    pub fn dirty_ignored(&mut self, name: &'static str) -> &mut Self {
        self.dirty_ignored.push(name);
        self
    }

    /// Declare that a command's executability depends on parent property
    /// `name`.
    pub fn can_execute_source(&mut self, name: &'static str) -> &mut Self {
        if !self.can_execute_sources.contains(&name) {
            self.can_execute_sources.push(name);
        }
        self
    }

    fn build(self, type_name: &'static str) -> TypeMetadata {
        TypeMetadata {
            type_name,
            dirty_ignored: self.dirty_ignored.into_iter().collect(),
            can_execute_sources: self.can_execute_sources,
        }
    }
}

/// Frozen metadata for one concrete type.
#[derive(Debug, Clone, Default)]
pub struct TypeMetadata {
    type_name: &'static str,
    dirty_ignored: AHashSet<&'static str>,
    can_execute_sources: Vec<&'static str>,
}

impl TypeMetadata {
    /// Metadata with no declarations.
    #[must_use]
    pub fn empty() -> Arc<Self> {
        static EMPTY: OnceLock<Arc<TypeMetadata>> = OnceLock::new();
        Arc::clone(EMPTY.get_or_init(|| Arc::new(TypeMetadata::default())))
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn is_dirty_ignored(&self, name: &str) -> bool {
        self.dirty_ignored.contains(name)
    }

    /// Parent property names in declaration order.
    #[must_use]
    pub fn can_execute_sources(&self) -> &[&'static str] {
        &self.can_execute_sources
    }
}

type Table = RwLock<AHashMap<TypeId, Arc<TypeMetadata>>>;

fn table() -> &'static Table {
    static TABLE: OnceLock<Table> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(AHashMap::new()))
}

/// Metadata for `T`, built from `T::declare` on first use.
#[must_use]
pub fn metadata_for<T: DeclareMetadata>() -> Arc<TypeMetadata> {
    let id = TypeId::of::<T>();
    if let Some(found) = table()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(&id)
    {
        return Arc::clone(found);
    }

    // Declarations run outside the lock; a racing builder loses to the
    // first insert.
    let mut builder = MetadataBuilder::default();
    T::declare(&mut builder);
    let built = Arc::new(builder.build(type_name::<T>()));
    tracing::debug!(
        message = "metadata.built",
        type_name = built.type_name,
        dirty_ignored = built.dirty_ignored.len(),
        can_execute_sources = built.can_execute_sources.len(),
    );

    let mut guard = table()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(guard.entry(id).or_insert(built))
}
