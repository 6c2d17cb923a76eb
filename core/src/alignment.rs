use crate::error::{AlignError, ErrorCode};
use crate::model::ROOT_ACTION_ID;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// `(recipe, action_id)`: the join key shared by gold tables and predictions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionKey {
    pub recipe: String,
    pub action_id: String,
}

impl ActionKey {
    pub fn new(recipe: impl Into<String>, action_id: impl Into<String>) -> Self {
        Self {
            recipe: recipe.into(),
            action_id: action_id.into(),
        }
    }
}

impl std::fmt::Display for ActionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.recipe, self.action_id)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("duplicate alignment key {key}")]
pub struct DuplicateKeyError {
    pub key: ActionKey,
}

impl AlignError for DuplicateKeyError {
    fn error_code(&self) -> ErrorCode {
        ErrorCode::DataQuality
    }
}

/// Insertion-ordered map that refuses to overwrite an existing key.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueKeyMap<V> {
    inner: IndexMap<ActionKey, V>,
}

impl<V> UniqueKeyMap<V> {
    pub fn new() -> Self {
        Self {
            inner: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, key: ActionKey, value: V) -> Result<(), DuplicateKeyError> {
        if self.inner.contains_key(&key) {
            return Err(DuplicateKeyError { key });
        }
        self.inner.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &ActionKey) -> Option<&V> {
        self.inner.get(key)
    }

    pub fn contains_key(&self, key: &ActionKey) -> bool {
        self.inner.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ActionKey, &V)> {
        self.inner.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ActionKey> {
        self.inner.keys()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<V> Default for UniqueKeyMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldRecord {
    pub recipe1: String,
    pub action_id: String,
    pub recipe2: String,
    pub label: String,
}

impl GoldRecord {
    pub fn new(
        recipe1: impl Into<String>,
        action_id: impl Into<String>,
        recipe2: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            recipe1: recipe1.into(),
            action_id: action_id.into(),
            recipe2: recipe2.into(),
            label: label.into(),
        }
    }

    /// Target id; an empty label means "no counterpart" and resolves to the root.
    pub fn target_id(&self) -> &str {
        if self.label.is_empty() {
            ROOT_ACTION_ID
        } else {
            &self.label
        }
    }

    pub fn key(&self) -> ActionKey {
        ActionKey::new(&self.recipe1, &self.action_id)
    }
}

/// Gold records of one ordered recipe pair, keyed by source action id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipePairAlignment {
    records: IndexMap<String, GoldRecord>,
}

impl RecipePairAlignment {
    pub fn get(&self, source_action_id: &str) -> Option<&GoldRecord> {
        self.records.get(source_action_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &GoldRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A dish's gold alignments grouped by `(recipe1, recipe2)`, pairs in sorted order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoldAlignmentTable {
    pairs: BTreeMap<(String, String), RecipePairAlignment>,
    len: usize,
}

impl GoldAlignmentTable {
    /// Groups records by recipe pair. `(recipe1, action_id)` must be unique
    /// across the whole table.
    pub fn from_records(
        records: impl IntoIterator<Item = GoldRecord>,
    ) -> Result<Self, DuplicateKeyError> {
        let mut seen = UniqueKeyMap::new();
        let mut pairs: BTreeMap<(String, String), RecipePairAlignment> = BTreeMap::new();
        let mut len = 0;

        for record in records {
            seen.insert(record.key(), ())?;
            pairs
                .entry((record.recipe1.clone(), record.recipe2.clone()))
                .or_default()
                .records
                .insert(record.action_id.clone(), record);
            len += 1;
        }

        Ok(Self { pairs, len })
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&(String, String), &RecipePairAlignment)> {
        self.pairs.iter()
    }

    pub fn pair(&self, recipe1: &str, recipe2: &str) -> Option<&RecipePairAlignment> {
        self.pairs.get(&(recipe1.to_string(), recipe2.to_string()))
    }

    pub fn recipe_names(&self) -> BTreeSet<&str> {
        self.pairs
            .keys()
            .flat_map(|(r1, r2)| [r1.as_str(), r2.as_str()])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
