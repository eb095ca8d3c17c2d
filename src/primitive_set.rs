//! Key-identified primitive collections.
//!
//! A [`PrimitiveSet`] groups the primitives of a keyset by output prefix and
//! remembers which one is primary. It is assembled once through
//! [`PrimitiveSetBuilder`] and is read-only afterwards, so it can be shared
//! behind an `Arc` by any number of concurrent callers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cryptofmt::{self, RAW_PREFIX};
use crate::keyset::{Key, KeyStatus, KeysetError, OutputPrefixType};

/// One key's primitive together with its identifying metadata.
#[derive(Debug)]
pub struct Entry<P> {
    pub primitive: P,
    pub key_id: u32,
    pub prefix: Vec<u8>,
    pub prefix_type: OutputPrefixType,
    pub status: KeyStatus,
}

/// Primitives grouped by output prefix, with a distinguished primary.
#[derive(Debug)]
pub struct PrimitiveSet<P> {
    /// Every entry in insertion order.
    entries: Vec<Arc<Entry<P>>>,
    /// Prefix → entries sharing it, in insertion order.
    groups: HashMap<Vec<u8>, Vec<Arc<Entry<P>>>>,
    /// Index into `entries`.
    primary: usize,
}

impl<P> PrimitiveSet<P> {
    /// The entry used for new encryptions.
    pub fn primary(&self) -> &Entry<P> {
        &self.entries[self.primary]
    }

    /// Every entry, in the order keys were added.
    pub fn entries(&self) -> &[Arc<Entry<P>>] {
        &self.entries
    }

    /// Entries whose output prefix equals `prefix`, in insertion order.
    /// `None` when no key of the set produces that prefix.
    pub fn entries_for_prefix(&self, prefix: &[u8]) -> Option<&[Arc<Entry<P>>]> {
        self.groups.get(prefix).map(Vec::as_slice)
    }

    /// Entries of RAW keys, in insertion order. Empty when the set has none.
    pub fn raw_entries(&self) -> &[Arc<Entry<P>>] {
        self.entries_for_prefix(RAW_PREFIX).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Project every primitive through `f`, keeping ids, prefixes, grouping,
    /// order and the primary. The primary is projected first, then every
    /// entry in insertion order; the first error aborts the projection.
    pub fn try_map<Q, E, F>(&self, mut f: F) -> Result<PrimitiveSet<Q>, E>
    where
        F: FnMut(&Entry<P>) -> Result<Q, E>,
    {
        f(self.primary())?;

        let mut entries = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            entries.push(Arc::new(Entry {
                primitive: f(entry)?,
                key_id: entry.key_id,
                prefix: entry.prefix.clone(),
                prefix_type: entry.prefix_type,
                status: entry.status,
            }));
        }

        Ok(PrimitiveSet {
            groups: group_by_prefix(&entries),
            entries,
            primary: self.primary,
        })
    }
}

fn group_by_prefix<P>(entries: &[Arc<Entry<P>>]) -> HashMap<Vec<u8>, Vec<Arc<Entry<P>>>> {
    let mut groups: HashMap<Vec<u8>, Vec<Arc<Entry<P>>>> = HashMap::new();
    for entry in entries {
        groups
            .entry(entry.prefix.clone())
            .or_default()
            .push(Arc::clone(entry));
    }
    groups
}

/// Mutable staging area for a [`PrimitiveSet`].
#[derive(Debug)]
pub struct PrimitiveSetBuilder<P> {
    entries: Vec<Arc<Entry<P>>>,
    primary: Option<usize>,
}

impl<P> Default for PrimitiveSetBuilder<P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            primary: None,
        }
    }
}

impl<P> PrimitiveSetBuilder<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the primitive of `key`. Only enabled keys may be added.
    /// Returns the index of the new entry, usable with [`set_primary`].
    ///
    /// [`set_primary`]: PrimitiveSetBuilder::set_primary
    pub fn add(&mut self, primitive: P, key: &Key) -> Result<usize, KeysetError> {
        if key.status != KeyStatus::Enabled {
            return Err(KeysetError::KeyNotEnabled(key.key_id));
        }
        self.entries.push(Arc::new(Entry {
            primitive,
            key_id: key.key_id,
            prefix: cryptofmt::output_prefix(key),
            prefix_type: key.output_prefix_type,
            status: key.status,
        }));
        Ok(self.entries.len() - 1)
    }

    pub fn set_primary(&mut self, index: usize) -> Result<(), KeysetError> {
        if index >= self.entries.len() {
            return Err(KeysetError::NoPrimary);
        }
        self.primary = Some(index);
        Ok(())
    }

    /// Freeze the set. Fails when no primary was designated.
    pub fn build(self) -> Result<PrimitiveSet<P>, KeysetError> {
        let primary = self.primary.ok_or(KeysetError::NoPrimary)?;
        Ok(PrimitiveSet {
            groups: group_by_prefix(&self.entries),
            entries: self.entries,
            primary,
        })
    }
}
