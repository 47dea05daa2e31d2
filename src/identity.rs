//! Two-way collection keyed both by identity and by logical equality.
//!
//! Every collection in the crate is an [`IdentitySet`]: a member is addressed by
//! its stable identity string (the handle users type on the command line) and
//! deduplicated by its equality key (what makes two members "the same thing").
//! Both indices live behind the same `insert`/`remove` pair so they cannot drift.

use indexmap::IndexMap;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{McloneError, Result};

/// An object that can live in an [`IdentitySet`].
pub trait Identified {
    /// Logical deduplication key, independent of identity
    type Key: Clone + Debug + Eq + Hash;

    /// Noun used in lookup error messages
    const KIND: &'static str;

    fn id(&self) -> &str;

    fn key(&self) -> Self::Key;

    /// Whether `self` may replace `current`, an equal member already in the set.
    fn supersedes(&self, _current: &Self) -> bool {
        true
    }
}

/// Insertion-ordered set with identity and equality indices.
#[derive(Debug, Clone)]
pub struct IdentitySet<T: Identified> {
    objects: IndexMap<String, T>,
    keys: HashMap<T::Key, String>,
    modified: bool,
}

impl<T: Identified> Default for IdentitySet<T> {
    fn default() -> Self {
        Self {
            objects: IndexMap::new(),
            keys: HashMap::new(),
            modified: false,
        }
    }
}

impl<T: Identified> IdentitySet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.objects.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    /// Member with the given identity
    pub fn get(&self, id: &str) -> Option<&T> {
        self.objects.get(id)
    }

    /// Member considered equal to `obj`, whatever its identity
    pub fn get_equal(&self, obj: &T) -> Option<&T> {
        self.keys
            .get(&obj.key())
            .and_then(|id| self.objects.get(id))
    }

    pub fn contains_equal(&self, obj: &T) -> bool {
        self.keys.contains_key(&obj.key())
    }

    /// Insert `obj`, replacing the equal member if any.
    ///
    /// A new revision of a member (same identity, same key) keeps its position.
    /// Returns `false` (leaving the set untouched) when an equal member exists and
    /// `obj` does not supersede it.
    pub fn insert(&mut self, obj: T) -> bool {
        if let Some(current) = self.get_equal(&obj) {
            if !obj.supersedes(current) {
                return false;
            }
            if current.id() == obj.id() {
                self.objects.insert(obj.id().to_string(), obj);
                self.modified = true;
                return true;
            }
        }
        self.forget_key(&obj.key());
        // An identity clash with a logically different member must not leave a
        // dangling key behind.
        if let Some(clash) = self.objects.shift_remove(obj.id()) {
            self.keys.remove(&clash.key());
        }
        self.keys.insert(obj.key(), obj.id().to_string());
        self.objects.insert(obj.id().to_string(), obj);
        self.modified = true;
        true
    }

    /// Remove the member equal to `obj`; returns whether anything was removed.
    pub fn remove(&mut self, obj: &T) -> bool {
        let removed = self.forget_key(&obj.key()).is_some();
        if removed {
            self.modified = true;
        }
        removed
    }

    /// Insert every element of `objs`
    pub fn merge(&mut self, objs: impl IntoIterator<Item = T>) {
        for obj in objs {
            self.insert(obj);
        }
    }

    /// Identities (fully or partially) matching the regular expression `pattern`,
    /// in set order.
    pub fn resolve_pattern(&self, pattern: &str) -> Result<Vec<&str>> {
        let rx = Regex::new(pattern).map_err(|source| McloneError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(self.ids().filter(|id| rx.is_match(id)).collect())
    }

    /// Resolve `pattern` to exactly one member.
    pub fn resolve(&self, pattern: &str) -> Result<&T> {
        match self.resolve_pattern(pattern)?.as_slice() {
            [] => Err(McloneError::NoMatch {
                kind: T::KIND,
                pattern: pattern.to_string(),
            }),
            [id] => self.get(id).ok_or_else(|| McloneError::NoMatch {
                kind: T::KIND,
                pattern: pattern.to_string(),
            }),
            _ => Err(McloneError::Ambiguous {
                kind: T::KIND,
                pattern: pattern.to_string(),
            }),
        }
    }

    /// Whether the set changed structurally since the last [`commit`](Self::commit)
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Acknowledge the current contents as persisted
    pub fn commit(&mut self) {
        self.modified = false;
    }

    /// Clean copy of the members satisfying `predicate`
    pub fn filtered(&self, predicate: impl Fn(&T) -> bool) -> Self
    where
        T: Clone,
    {
        let mut set = Self::new();
        set.merge(self.iter().filter(|obj| predicate(obj)).cloned());
        set.commit();
        set
    }

    fn forget_key(&mut self, key: &T::Key) -> Option<T> {
        let id = self.keys.remove(key)?;
        self.objects.shift_remove(&id)
    }
}

/// Two sets are equal when they hold the same logical members, whatever the
/// identities and bookkeeping behind them.
impl<T: Identified> PartialEq for IdentitySet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.keys.keys().collect::<HashSet<_>>() == other.keys.keys().collect::<HashSet<_>>()
    }
}

impl<T: Identified> Eq for IdentitySet<T> {}

impl<T: Identified> FromIterator<T> for IdentitySet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.merge(iter);
        set
    }
}

impl<'a, T: Identified> IntoIterator for &'a IdentitySet<T> {
    type Item = &'a T;
    type IntoIter = indexmap::map::Values<'a, String, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.values()
    }
}
