//! String interner for Sass identifiers.
//!
//! Sass treats `-` and `_` as the same character in identifiers, so
//! `$font-size` and `$font_size` name one variable. The interner normalizes
//! underscores to hyphens before storing, which makes that rule free for every
//! map keyed by [`Name`].
//!
//! One interner is shared by every stylesheet of a compilation. It is guarded
//! by a `RwLock` so independent compilations on different threads can share a
//! [`SharedInterner`] if they want to.

use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::Name;

/// Error when interning a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternError {
    /// The table exceeded `u32::MAX` entries.
    Overflow { count: usize },
}

impl fmt::Display for InternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternError::Overflow { count } => {
                write!(f, "interner exceeded capacity: {count} strings")
            }
        }
    }
}

impl std::error::Error for InternError {}

struct InternTable {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

/// Interner mapping normalized identifiers to [`Name`]s.
pub struct StringInterner {
    table: RwLock<InternTable>,
}

impl StringInterner {
    /// Create an interner holding only the empty string.
    pub fn new() -> Self {
        let empty: &'static str = "";
        let mut map = FxHashMap::default();
        map.insert(empty, 0);
        StringInterner {
            table: RwLock::new(InternTable {
                map,
                strings: vec![empty],
            }),
        }
    }

    /// Normalize an identifier: underscores become hyphens.
    pub fn normalize(s: &str) -> Cow<'_, str> {
        if s.contains('_') {
            Cow::Owned(s.replace('_', "-"))
        } else {
            Cow::Borrowed(s)
        }
    }

    /// Try to intern an identifier, returning an error on overflow.
    pub fn try_intern(&self, s: &str) -> Result<Name, InternError> {
        let normalized = Self::normalize(s);
        let key: &str = &normalized;

        if let Some(&index) = self.table.read().map.get(key) {
            return Ok(Name::from_raw(index));
        }

        let mut table = self.table.write();
        if let Some(&index) = table.map.get(key) {
            return Ok(Name::from_raw(index));
        }

        let index = u32::try_from(table.strings.len()).map_err(|_| InternError::Overflow {
            count: table.strings.len(),
        })?;
        // Interned strings live for the whole process, like the names they back.
        let leaked: &'static str = Box::leak(normalized.into_owned().into_boxed_str());
        table.strings.push(leaked);
        table.map.insert(leaked, index);
        Ok(Name::from_raw(index))
    }

    /// Intern an identifier.
    ///
    /// # Panics
    /// Panics if the interner exceeds `u32::MAX` entries.
    pub fn intern(&self, s: &str) -> Name {
        self.try_intern(s).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Look up the normalized spelling of a name.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.table
            .read()
            .strings
            .get(name.index())
            .copied()
            .unwrap_or("")
    }

    /// Whether `name` is private to its module (`-` or `_` prefix).
    pub fn is_private(&self, name: Name) -> bool {
        self.lookup(name).starts_with('-')
    }

    /// Number of interned strings, including the empty string.
    pub fn len(&self) -> usize {
        self.table.read().strings.len()
    }

    /// Always false: the empty string is pre-interned.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StringInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringInterner")
            .field("len", &self.len())
            .finish()
    }
}

/// Reference-counted handle to an interner shared by one or more compilations.
#[derive(Clone, Default, Debug)]
pub struct SharedInterner(Arc<StringInterner>);

impl SharedInterner {
    /// Wrap a fresh interner.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Deref for SharedInterner {
    type Target = StringInterner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests;
