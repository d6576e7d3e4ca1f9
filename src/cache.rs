use std::{collections::HashMap, hash::Hash, path::PathBuf, rc::Rc};

use anyhow::Result;
use tracing::trace;

use crate::{
    resources::{Sampler, SamplerSettings, Texture},
    shader::Shader,
};

/// Holds at most one live instance per key. Entries live as long as the cache.
pub struct ResourceCache<K, V> {
    entries: HashMap<K, Rc<V>>,
}

impl<K: Eq + Hash, V> ResourceCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<Rc<V>> {
        self.entries.get(key).cloned()
    }

    /// Returns the cached instance for `key`, running `load` only on a miss. A failed load
    /// leaves the cache untouched.
    pub fn get_or_try_insert_with(
        &mut self,
        key: K,
        load: impl FnOnce() -> Result<V>,
    ) -> Result<Rc<V>> {
        if let Some(entry) = self.entries.get(&key) {
            trace!("Resource cache hit");
            return Ok(Rc::clone(entry));
        }
        let entry = Rc::new(load()?);
        self.entries.insert(key, Rc::clone(&entry));
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Eq + Hash, V> Default for ResourceCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shaders keyed by (vertex path, fragment path)
pub type ShaderCache = ResourceCache<(PathBuf, PathBuf), Shader>;
pub type TextureCache = ResourceCache<PathBuf, Texture>;
pub type SamplerCache = ResourceCache<SamplerSettings, Sampler>;
