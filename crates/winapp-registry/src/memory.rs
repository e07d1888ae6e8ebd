//! In-memory store with the same observable behavior as the registry.
//!
//! Key and value names are matched case-insensitively and keep the case they
//! were created with. The 32-bit and 64-bit views of each hive are fully
//! isolated from each other.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::store::{
    encode_utf16_value, Access, Hive, Store, StoreError, StoreKey, ValueKind, WordWidth,
};

type Partition = (Hive, WordWidth);

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    partitions: BTreeMap<Partition, Node>,
    restrictions: BTreeMap<Partition, Access>,
}

#[derive(Debug, Default)]
struct Node {
    name: String,
    values: Vec<StoredValue>,
    subkeys: BTreeMap<String, Node>,
}

#[derive(Debug, Clone)]
struct StoredValue {
    name: String,
    kind: ValueKind,
    data: Vec<u8>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates every missing key along `path` in the given partition.
    pub fn create_path(&self, hive: Hive, width: WordWidth, path: &str) {
        let mut state = self.lock();
        let mut node = state.partitions.entry((hive, width)).or_default();
        for segment in split_path(path) {
            node = node
                .subkeys
                .entry(fold(segment))
                .or_insert_with(|| Node {
                    name: segment.to_string(),
                    ..Node::default()
                });
        }
    }

    /// Limits the rights that may be requested when opening keys in the
    /// given partition. Opens asking for anything beyond `allowed` fail with
    /// [`StoreError::AccessDenied`].
    pub fn restrict(&self, hive: Hive, width: WordWidth, allowed: Access) {
        self.lock().restrictions.insert((hive, width), allowed);
    }

    pub fn clear_restrictions(&self) {
        self.lock().restrictions.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    type Key = MemoryKey;

    fn open_root(
        &self,
        hive: Hive,
        path: &str,
        access: Access,
        width: WordWidth,
    ) -> Result<MemoryKey, StoreError> {
        let partition = (hive, width);
        let segments = split_path(path).map(fold).collect::<Vec<_>>();
        {
            let state = self.lock();
            state.check_access(partition, access)?;
            state.node(partition, &segments).ok_or(StoreError::NotFound)?;
        }
        Ok(MemoryKey {
            state: Arc::clone(&self.state),
            partition,
            path: segments,
            access,
        })
    }
}

/// Open key of a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryKey {
    state: Arc<Mutex<MemoryState>>,
    partition: Partition,
    path: Vec<String>,
    access: Access,
}

impl MemoryKey {
    /// Writes a value with an arbitrary type and payload, bypassing the
    /// typed setters.
    pub fn set_raw_value(
        &self,
        name: &str,
        kind: ValueKind,
        data: Vec<u8>,
    ) -> Result<(), StoreError> {
        self.require(Access::SET_VALUE)?;
        self.with_node_mut(|node| {
            node.put_value(StoredValue {
                name: name.to_string(),
                kind,
                data,
            })
        })
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn require(&self, access: Access) -> Result<(), StoreError> {
        if self.access.contains(access) {
            Ok(())
        } else {
            Err(StoreError::AccessDenied)
        }
    }

    fn with_node<R>(&self, f: impl FnOnce(&Node) -> R) -> Result<R, StoreError> {
        let state = self.lock();
        let node = state
            .node(self.partition, &self.path)
            .ok_or(StoreError::NotFound)?;
        Ok(f(node))
    }

    fn with_node_mut<R>(&self, f: impl FnOnce(&mut Node) -> R) -> Result<R, StoreError> {
        let mut state = self.lock();
        let node = state
            .node_mut(self.partition, &self.path)
            .ok_or(StoreError::NotFound)?;
        Ok(f(node))
    }

    fn child(&self, folded: String, access: Access) -> Self {
        let mut path = self.path.clone();
        path.push(folded);
        Self {
            state: Arc::clone(&self.state),
            partition: self.partition,
            path,
            access,
        }
    }
}

impl StoreKey for MemoryKey {
    fn open_subkey(&self, name: &str, access: Access) -> Result<Self, StoreError> {
        validate_key_name(name)?;
        let folded = fold(name);
        {
            let state = self.lock();
            state.check_access(self.partition, access)?;
            let node = state
                .node(self.partition, &self.path)
                .ok_or(StoreError::NotFound)?;
            if !node.subkeys.contains_key(&folded) {
                return Err(StoreError::NotFound);
            }
        }
        Ok(self.child(folded, access))
    }

    fn create_subkey(&self, name: &str, access: Access) -> Result<(Self, bool), StoreError> {
        validate_key_name(name)?;
        self.require(Access::CREATE_SUB_KEY)?;
        let folded = fold(name);
        let existed = {
            let mut state = self.lock();
            state.check_access(self.partition, access)?;
            let node = state
                .node_mut(self.partition, &self.path)
                .ok_or(StoreError::NotFound)?;
            if node.subkeys.contains_key(&folded) {
                true
            } else {
                node.subkeys.insert(
                    folded.clone(),
                    Node {
                        name: name.to_string(),
                        ..Node::default()
                    },
                );
                false
            }
        };
        Ok((self.child(folded, access), existed))
    }

    fn delete_subkey(&self, name: &str) -> Result<(), StoreError> {
        validate_key_name(name)?;
        let folded = fold(name);
        self.with_node_mut(|node| {
            match node.subkeys.get(&folded) {
                None => return Err(StoreError::NotFound),
                // Only leaf keys can be deleted in one call.
                Some(child) if !child.subkeys.is_empty() => return Err(StoreError::AccessDenied),
                Some(_) => {}
            }
            node.subkeys.remove(&folded);
            Ok(())
        })?
    }

    fn subkey_names(&self) -> Result<Vec<String>, StoreError> {
        self.require(Access::ENUMERATE_SUB_KEYS)?;
        self.with_node(|node| {
            node.subkeys
                .values()
                .map(|child| child.name.clone())
                .collect()
        })
    }

    fn value_names(&self) -> Result<Vec<String>, StoreError> {
        self.require(Access::QUERY_VALUE)?;
        self.with_node(|node| node.values.iter().map(|value| value.name.clone()).collect())
    }

    fn set_string(&self, name: &str, data: &str) -> Result<(), StoreError> {
        self.set_raw_value(name, ValueKind::String, encode_utf16_value(data))
    }

    fn set_expand_string(&self, name: &str, data: &str) -> Result<(), StoreError> {
        self.set_raw_value(name, ValueKind::ExpandString, encode_utf16_value(data))
    }

    fn set_dword(&self, name: &str, data: u32) -> Result<(), StoreError> {
        self.set_raw_value(name, ValueKind::Dword, data.to_le_bytes().to_vec())
    }

    fn get_value(&self, name: &str, buf: &mut [u8]) -> Result<(usize, ValueKind), StoreError> {
        self.require(Access::QUERY_VALUE)?;
        self.with_node(|node| {
            let value = node.value(name).ok_or(StoreError::NotFound)?;
            let len = value.data.len();
            if len > buf.len() {
                return Err(StoreError::MoreData { required: len });
            }
            buf[..len].copy_from_slice(&value.data);
            Ok((len, value.kind))
        })?
    }
}

impl MemoryState {
    fn check_access(&self, partition: Partition, access: Access) -> Result<(), StoreError> {
        match self.restrictions.get(&partition) {
            Some(allowed) if !allowed.contains(access) => Err(StoreError::AccessDenied),
            _ => Ok(()),
        }
    }

    fn node(&self, partition: Partition, path: &[String]) -> Option<&Node> {
        let mut node = self.partitions.get(&partition)?;
        for segment in path {
            node = node.subkeys.get(segment)?;
        }
        Some(node)
    }

    fn node_mut(&mut self, partition: Partition, path: &[String]) -> Option<&mut Node> {
        let mut node = self.partitions.get_mut(&partition)?;
        for segment in path {
            node = node.subkeys.get_mut(segment)?;
        }
        Some(node)
    }
}

impl Node {
    fn value(&self, name: &str) -> Option<&StoredValue> {
        self.values
            .iter()
            .find(|value| value.name.eq_ignore_ascii_case(name))
    }

    fn put_value(&mut self, value: StoredValue) {
        match self
            .values
            .iter_mut()
            .find(|existing| existing.name.eq_ignore_ascii_case(&value.name))
        {
            Some(existing) => {
                existing.kind = value.kind;
                existing.data = value.data;
            }
            None => self.values.push(value),
        }
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('\\').filter(|segment| !segment.is_empty())
}

fn validate_key_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name.contains('\\') {
        return Err(StoreError::InvalidName);
    }
    Ok(())
}

fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}
