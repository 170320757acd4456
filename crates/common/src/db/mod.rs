//! A thin, typed wrapper over a [`sled::Tree`], one per entity.
//!
//! Values are encoded with plain `bincode` over
//! `serde::Serialize`/`DeserializeOwned`, which is enough for a
//! single-binary daemon that doesn't need to read across on-disk format
//! versions.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, strum_macros::AsRefStr)]
pub enum DatabaseError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("failed to encode value: {0}")]
    Encode(#[from] bincode::Error),
    #[error("failed to open database at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: sled::Error,
    },
}

/// A sled-backed, typed key/value tree.
///
/// `K` must encode to a byte order that matches its `Ord` implementation if
/// callers want to range-scan by key (true for every id type in
/// `iotronic_common::ids`, whose `Ord` is derived over fields written in
/// the same order `bincode` serializes them).
#[derive(Clone)]
pub struct DbTree<K, V> {
    tree: sled::Tree,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> DbTree<K, V>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    pub fn new(tree: sled::Tree) -> Self {
        Self {
            tree,
            _phantom: PhantomData,
        }
    }

    pub fn get(&self, key: &K) -> Result<Option<V>, DatabaseError> {
        let key_bytes = bincode::serialize(key)?;
        match self.tree.get(key_bytes)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &K) -> Result<bool, DatabaseError> {
        let key_bytes = bincode::serialize(key)?;
        Ok(self.tree.contains_key(key_bytes)?)
    }

    pub fn insert(&self, key: &K, value: &V) -> Result<(), DatabaseError> {
        let key_bytes = bincode::serialize(key)?;
        let value_bytes = bincode::serialize(value)?;
        self.tree.insert(key_bytes, value_bytes)?;
        Ok(())
    }

    pub fn remove(&self, key: &K) -> Result<Option<V>, DatabaseError> {
        let key_bytes = bincode::serialize(key)?;
        match self.tree.remove(key_bytes)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn read_all(&self) -> impl Iterator<Item = (K, V)> + '_ {
        self.tree.iter().filter_map(|row| {
            let (key_bytes, value_bytes) = match row {
                Ok(kv) => kv,
                Err(e) => {
                    tracing::error!("error reading row from store: {e}");
                    return None;
                }
            };
            let key = match bincode::deserialize(&key_bytes) {
                Ok(k) => k,
                Err(e) => {
                    tracing::error!("error decoding key from store: {e}");
                    return None;
                }
            };
            let value = match bincode::deserialize(&value_bytes) {
                Ok(v) => v,
                Err(e) => {
                    tracing::error!("error decoding value from store: {e}");
                    return None;
                }
            };
            Some((key, value))
        })
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
