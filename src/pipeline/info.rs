//! Typed information records.
//!
//! Every port carries an [`InfoRecord`]: a map from key name to a tagged
//! [`InfoValue`]. Keys are declared as [`InfoKey<T>`] constants, so a read
//! states the type it expects and gets a [`InfoError::KeyTypeMismatch`]
//! instead of a silently wrong value.
//!
//! Each entry remembers the [`Propagation`] class of the key that wrote it.
//! The executive moves whole classes at a time, so user-defined keys flow
//! through the pipeline exactly like the built-in ones in [`keys`].

use crate::pipeline::error::InfoError;
use crate::pipeline::time;
use crate::types::{Bounds, Extent, ScalarType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Direction in which the executive copies an entry between ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Propagation {
    /// Requests, copied from consumer to producer during the request pass.
    Upstream,
    /// Meta-information, copied from producer to consumer during the
    /// information pass.
    Downstream,
    /// Never copied; written by the producing executive only.
    None,
}

/// Tagged value stored in a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InfoValue {
    Flag(bool),
    Int(i64),
    Double(f64),
    Doubles(Vec<f64>),
    Extent(Extent),
    Bounds(Bounds),
    ScalarType(ScalarType),
    Text(String),
}

impl InfoValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            InfoValue::Flag(_) => "bool",
            InfoValue::Int(_) => "int",
            InfoValue::Double(_) => "double",
            InfoValue::Doubles(_) => "double vector",
            InfoValue::Extent(_) => "extent",
            InfoValue::Bounds(_) => "bounds",
            InfoValue::ScalarType(_) => "scalar type",
            InfoValue::Text(_) => "string",
        }
    }
}

/// Rust types that can be stored under an [`InfoKey`].
pub trait InfoType: Sized {
    const TYPE_NAME: &'static str;

    fn into_value(self) -> InfoValue;

    fn from_value(value: &InfoValue) -> Option<Self>;
}

macro_rules! info_type {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl InfoType for $ty {
            const TYPE_NAME: &'static str = $name;

            fn into_value(self) -> InfoValue {
                InfoValue::$variant(self)
            }

            fn from_value(value: &InfoValue) -> Option<Self> {
                match value {
                    InfoValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

info_type!(bool, Flag, "bool");
info_type!(i64, Int, "int");
info_type!(f64, Double, "double");
info_type!(Vec<f64>, Doubles, "double vector");
info_type!(Extent, Extent, "extent");
info_type!(Bounds, Bounds, "bounds");
info_type!(ScalarType, ScalarType, "scalar type");
info_type!(String, Text, "string");

impl InfoType for [f64; 2] {
    const TYPE_NAME: &'static str = "double pair";

    fn into_value(self) -> InfoValue {
        InfoValue::Doubles(self.to_vec())
    }

    fn from_value(value: &InfoValue) -> Option<Self> {
        match value {
            InfoValue::Doubles(v) if v.len() == 2 => Some([v[0], v[1]]),
            _ => None,
        }
    }
}

/// Typed handle naming one record entry.
pub struct InfoKey<T> {
    name: &'static str,
    propagation: Propagation,
    _marker: PhantomData<fn() -> T>,
}

impl<T> InfoKey<T> {
    pub const fn new(name: &'static str, propagation: Propagation) -> Self {
        Self {
            name,
            propagation,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn propagation(&self) -> Propagation {
        self.propagation
    }
}

impl<T> Clone for InfoKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for InfoKey<T> {}

impl<T> fmt::Debug for InfoKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoKey({}, {:?})", self.name, self.propagation)
    }
}

/// A stored value plus the propagation class of the key that wrote it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoEntry {
    pub value: InfoValue,
    pub propagation: Propagation,
}

pub type InfoResult<T> = std::result::Result<T, InfoError>;

/// Unordered mapping from key name to typed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct InfoRecord {
    entries: HashMap<&'static str, InfoEntry>,
}

impl InfoRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, replacing any previous entry under the same name.
    pub fn set<T: InfoType>(&mut self, key: &InfoKey<T>, value: T) {
        self.entries.insert(
            key.name,
            InfoEntry {
                value: value.into_value(),
                propagation: key.propagation,
            },
        );
    }

    /// Read a value that must be present.
    pub fn get<T: InfoType>(&self, key: &InfoKey<T>) -> InfoResult<T> {
        self.lookup(key)?
            .ok_or(InfoError::Missing { key: key.name })
    }

    /// Read a value that may be absent. A present value of the wrong type is
    /// still an error.
    pub fn lookup<T: InfoType>(&self, key: &InfoKey<T>) -> InfoResult<Option<T>> {
        match self.entries.get(key.name) {
            None => Ok(None),
            Some(entry) => T::from_value(&entry.value).map(Some).ok_or(InfoError::KeyTypeMismatch {
                key: key.name,
                expected: T::TYPE_NAME,
                found: entry.value.type_name(),
            }),
        }
    }

    pub fn has<T>(&self, key: &InfoKey<T>) -> bool {
        self.entries.contains_key(key.name)
    }

    /// Remove an entry, returning whether it existed.
    pub fn remove<T>(&mut self, key: &InfoKey<T>) -> bool {
        self.entries.remove(key.name).is_some()
    }

    /// Make this record's entry for `key` match `other`'s, removing it when
    /// `other` has none.
    pub fn copy_entry<T>(&mut self, other: &InfoRecord, key: &InfoKey<T>) {
        match other.entries.get(key.name) {
            Some(entry) => {
                self.entries.insert(key.name, entry.clone());
            }
            None => {
                self.entries.remove(key.name);
            }
        }
    }

    /// Copy every entry of `other`, overwriting duplicates.
    pub fn append(&mut self, other: &InfoRecord) {
        for (name, entry) in &other.entries {
            self.entries.insert(*name, entry.clone());
        }
    }

    /// Copy the entries of `other` whose propagation class is `class`.
    pub fn copy_class(&mut self, other: &InfoRecord, class: Propagation) {
        for (name, entry) in &other.entries {
            if entry.propagation == class {
                self.entries.insert(*name, entry.clone());
            }
        }
    }

    pub fn remove_class(&mut self, class: Propagation) {
        self.entries.retain(|_, entry| entry.propagation != class);
    }

    /// New record holding only the entries of one class.
    pub fn class_snapshot(&self, class: Propagation) -> InfoRecord {
        InfoRecord {
            entries: self
                .entries
                .iter()
                .filter(|(_, e)| e.propagation == class)
                .map(|(name, e)| (*name, e.clone()))
                .collect(),
        }
    }

    /// Key-by-key equality of the upstream (request) entries.
    ///
    /// With `time_tolerance`, `UPDATE_TIME_STEP` values compare equal when
    /// they agree within that relative tolerance; every other entry must
    /// match exactly.
    pub fn request_eq(&self, other: &InfoRecord, time_tolerance: Option<f64>) -> bool {
        let mine = self.entries.iter().filter(|(_, e)| e.propagation == Propagation::Upstream);
        let theirs = other
            .entries
            .values()
            .filter(|e| e.propagation == Propagation::Upstream)
            .count();
        let mut seen = 0;
        for (name, entry) in mine {
            seen += 1;
            let Some(other_entry) = other.entries.get(name) else {
                return false;
            };
            if other_entry.propagation != Propagation::Upstream {
                return false;
            }
            let same = match (&entry.value, &other_entry.value, time_tolerance) {
                (InfoValue::Double(a), InfoValue::Double(b), Some(tol))
                    if *name == keys::UPDATE_TIME_STEP.name() =>
                {
                    time::times_match(*a, *b, tol)
                }
                (a, b, _) => a == b,
            };
            if !same {
                return false;
            }
        }
        seen == theirs
    }

    /// Store a raw value under an arbitrary name.
    pub fn set_value(&mut self, name: &'static str, value: InfoValue, propagation: Propagation) {
        self.entries.insert(name, InfoEntry { value, propagation });
    }

    pub fn entry(&self, name: &str) -> Option<&InfoEntry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &InfoEntry)> {
        self.entries.iter().map(|(name, e)| (*name, e))
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

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Built-in keys.
pub mod keys {
    use super::{InfoKey, Propagation};
    use crate::types::{Bounds, Extent, ScalarType};

    // Meta-information, published by producers in the information pass.
    pub const WHOLE_EXTENT: InfoKey<Extent> = InfoKey::new("WHOLE_EXTENT", Propagation::Downstream);
    pub const TIME_STEPS: InfoKey<Vec<f64>> = InfoKey::new("TIME_STEPS", Propagation::Downstream);
    pub const TIME_RANGE: InfoKey<[f64; 2]> = InfoKey::new("TIME_RANGE", Propagation::Downstream);
    pub const BOUNDS: InfoKey<Bounds> = InfoKey::new("BOUNDS", Propagation::Downstream);
    pub const SCALAR_TYPE: InfoKey<ScalarType> = InfoKey::new("SCALAR_TYPE", Propagation::Downstream);
    pub const SCALAR_RANGE: InfoKey<[f64; 2]> = InfoKey::new("SCALAR_RANGE", Propagation::Downstream);

    // Requests, written by consumers in the request pass.
    pub const UPDATE_EXTENT: InfoKey<Extent> = InfoKey::new("UPDATE_EXTENT", Propagation::Upstream);
    pub const UPDATE_TIME_STEP: InfoKey<f64> = InfoKey::new("UPDATE_TIME_STEP", Propagation::Upstream);
    pub const UPDATE_PIECE: InfoKey<i64> = InfoKey::new("UPDATE_PIECE", Propagation::Upstream);
    pub const UPDATE_NUMBER_OF_PIECES: InfoKey<i64> =
        InfoKey::new("UPDATE_NUMBER_OF_PIECES", Propagation::Upstream);
    pub const UPDATE_GHOST_LEVEL: InfoKey<i64> = InfoKey::new("UPDATE_GHOST_LEVEL", Propagation::Upstream);
    pub const EXACT_EXTENT: InfoKey<bool> = InfoKey::new("EXACT_EXTENT", Propagation::Upstream);

    // Responses, written on produced data by the executive.
    pub const DATA_EXTENT: InfoKey<Extent> = InfoKey::new("DATA_EXTENT", Propagation::None);
    pub const DATA_TIME_STEP: InfoKey<f64> = InfoKey::new("DATA_TIME_STEP", Propagation::None);
    pub const DATA_PIECE: InfoKey<i64> = InfoKey::new("DATA_PIECE", Propagation::None);
    pub const DATA_NUMBER_OF_PIECES: InfoKey<i64> = InfoKey::new("DATA_NUMBER_OF_PIECES", Propagation::None);
    pub const DATA_GHOST_LEVEL: InfoKey<i64> = InfoKey::new("DATA_GHOST_LEVEL", Propagation::None);
}
