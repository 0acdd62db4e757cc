//! `with(...)` configuration chains.
//!
//! A `@use ... with (...)` creates a root [`WithConfig`]. A `@forward` inside
//! a configured module creates a child whose parent is that module's
//! configuration: names the forwarded module asks for are looked up in the
//! child's own entries first, then in the parent under the forward's prefix
//! and show/hide filter.

use std::cell::Cell;
use std::rc::Rc;

use sass_ir::ast::ForwardFilter;
use sass_ir::{Name, StringInterner, Value};

/// One `$name: value [!default]` entry.
#[derive(Debug)]
pub struct ConfigEntry {
    pub value: Value,
    pub guarded: bool,
    used: Cell<bool>,
}

impl ConfigEntry {
    pub fn is_used(&self) -> bool {
        self.used.get()
    }
}

#[derive(Debug, Default)]
pub struct WithConfig {
    entries: Vec<(Name, ConfigEntry)>,
    parent: Option<Rc<WithConfig>>,
    /// Applied to names when consulting `parent`.
    filter: Option<ForwardFilter>,
    prefix: Option<String>,
}

impl WithConfig {
    /// A configuration with no parent, as written on a `@use`.
    pub fn new(entries: impl IntoIterator<Item = (Name, Value, bool)>) -> Self {
        WithConfig {
            entries: entries
                .into_iter()
                .map(|(name, value, guarded)| {
                    (
                        name,
                        ConfigEntry {
                            value,
                            guarded,
                            used: Cell::new(false),
                        },
                    )
                })
                .collect(),
            ..WithConfig::default()
        }
    }

    /// A configuration for a `@forward`, passing `parent` through.
    pub fn forwarded(
        entries: impl IntoIterator<Item = (Name, Value, bool)>,
        parent: Rc<WithConfig>,
        filter: Option<ForwardFilter>,
        prefix: Option<String>,
    ) -> Self {
        WithConfig {
            parent: Some(parent),
            filter,
            prefix,
            ..WithConfig::new(entries)
        }
    }

    /// Whether this level declares any entries of its own.
    pub fn has_own_entries(&self) -> bool {
        !self.entries.is_empty()
    }

    fn own(&self, name: Name) -> Option<&ConfigEntry> {
        self.entries
            .iter()
            .find_map(|(entry_name, entry)| (*entry_name == name).then_some(entry))
    }

    /// Entry configuring `name`.
    ///
    /// Prefers the nearest unguarded entry along the chain; falls back to the
    /// nearest guarded one.
    pub fn get(&self, name: Name, interner: &StringInterner) -> Option<&ConfigEntry> {
        let mut guarded = None;
        let mut level = self;
        let mut name = name;
        loop {
            if let Some(entry) = level.own(name) {
                if !entry.guarded {
                    return Some(entry);
                }
                guarded.get_or_insert(entry);
            }
            let Some(parent) = level.parent.as_deref() else {
                break;
            };
            if let Some(prefix) = &level.prefix {
                name = interner.intern(&format!("{prefix}{}", interner.lookup(name)));
            }
            if level.filter.as_ref().is_some_and(|f| !f.admits(true, name)) {
                break;
            }
            level = parent;
        }
        guarded
    }

    /// Value configured for `name`, marking the entry consumed.
    pub fn take(&self, name: Name, interner: &StringInterner) -> Option<Value> {
        let entry = self.get(name, interner)?;
        entry.used.set(true);
        Some(entry.value.clone())
    }

    /// First own entry that is neither guarded nor consumed.
    pub fn first_unused(&self) -> Option<Name> {
        self.entries
            .iter()
            .find_map(|(name, entry)| (!entry.guarded && !entry.is_used()).then_some(*name))
    }
}
