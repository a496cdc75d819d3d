//! Canonical alias registry and per-namespace lookup index.

use super::layers::AliasLayers;
use super::record::{AliasDefinition, AliasRecord};
use crate::config::AliasPrecedence;
use crate::error::Result;
use crate::framework::Framework;
use crate::normalize::normalize_key;
use std::collections::HashMap;
use tracing::debug;

/// Outcome of a namespace-qualified alias lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// The namespace or the alternate name is unknown.
    NotFound,
    /// The name maps to a record, but the record blocks this namespace: the
    /// identity is known, claiming it from this namespace is not allowed.
    Blocked(&'a AliasRecord),
    /// The name maps to a record and the namespace is allowed.
    Resolved(&'a AliasRecord),
}

impl<'a> Resolution<'a> {
    /// The record behind the lookup, whether blocked or not.
    pub fn record(&self) -> Option<&'a AliasRecord> {
        match *self {
            Resolution::NotFound => None,
            Resolution::Blocked(record) | Resolution::Resolved(record) => Some(record),
        }
    }

    /// The record, only if it may be claimed from the queried namespace.
    pub fn resolved(&self) -> Option<&'a AliasRecord> {
        match *self {
            Resolution::Resolved(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Resolution::Blocked(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Resolution::NotFound)
    }
}

/// Registry of canonical alias records.
///
/// Holds the canonical-name -> record mapping and a two-level index
/// `namespace -> normalized alternate name -> canonical name`. Every
/// canonical name in the index has a record in the primary mapping.
///
/// Registration is last-write-wins on canonical name. A failed
/// [`compile`](Self::compile) leaves the registry untouched.
#[derive(Debug, Clone, Default)]
pub struct AliasRegistry {
    records: HashMap<String, AliasRecord>,
    index: HashMap<String, HashMap<String, String>>,
    namespace_priority: Vec<String>,
}

impl AliasRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from built-in and caller-supplied definitions.
    ///
    /// Caller definitions are compiled first and built-ins last, so a
    /// built-in definition wins a canonical-name collision. To override a
    /// built-in from the caller side, use [`from_layers`](Self::from_layers)
    /// with [`AliasPrecedence::ExtraWins`].
    pub fn build(builtin: Vec<AliasDefinition>, extra: Vec<AliasDefinition>) -> Result<Self> {
        Self::from_layers(
            &AliasLayers::new(builtin).with_extra(extra),
            AliasPrecedence::BuiltinWins,
        )
    }

    /// Build a registry from explicit layers and a merge precedence.
    pub fn from_layers(layers: &AliasLayers, precedence: AliasPrecedence) -> Result<Self> {
        let merged = layers.merged(precedence);
        let mut registry = Self {
            records: HashMap::with_capacity(merged.len()),
            ..Self::default()
        };
        registry.compile(&merged)?;
        Ok(registry)
    }

    /// Set the namespaces [`find_any`](Self::find_any) probes first.
    pub fn set_namespace_priority(&mut self, namespaces: Vec<String>) {
        self.namespace_priority = namespaces;
    }

    pub fn with_namespace_priority(mut self, namespaces: Vec<String>) -> Self {
        self.namespace_priority = namespaces;
        self
    }

    /// Compile definitions into the registry.
    ///
    /// Every definition is validated before anything is inserted; a malformed
    /// entry fails the whole call and nothing is applied. Within a batch,
    /// later definitions overwrite earlier ones sharing a canonical name, and
    /// later alternate names overwrite earlier index entries.
    pub fn compile(&mut self, definitions: &[AliasDefinition]) -> Result<()> {
        let staged = definitions
            .iter()
            .map(AliasRecord::compile)
            .collect::<Result<Vec<_>>>()?;

        for (record, entries) in staged {
            for (namespace, key) in entries {
                self.index
                    .entry(namespace)
                    .or_default()
                    .insert(key, record.name.clone());
            }
            if self.records.contains_key(&record.name) {
                debug!(alias = %record.name, "alias record overwritten");
            }
            self.records.insert(record.name.clone(), record);
        }

        debug!(
            records = self.records.len(),
            namespaces = self.index.len(),
            "alias registry compiled"
        );
        Ok(())
    }

    /// Add definitions to an already populated registry.
    pub fn append_aliases(&mut self, extra: &[AliasDefinition]) -> Result<()> {
        self.compile(extra)
    }

    /// Look up a caller-normalized name within one namespace.
    pub fn find(&self, namespace: &str, normalized_name: &str) -> Resolution<'_> {
        let record = self
            .index
            .get(namespace)
            .and_then(|names| names.get(normalized_name))
            .and_then(|canonical| self.records.get(canonical));

        match record {
            Some(record) if record.is_blocked(namespace) => Resolution::Blocked(record),
            Some(record) => Resolution::Resolved(record),
            None => Resolution::NotFound,
        }
    }

    /// Look up a raw name in every namespace, returning the first allowed hit
    /// and the namespace it came from.
    ///
    /// Namespaces in the configured priority list are probed first, in order.
    /// The remaining namespaces are probed in unspecified order, so when two
    /// of them map the same spelling to different records the result is not
    /// deterministic. Pass an explicit namespace to [`find`](Self::find) when
    /// that matters.
    pub fn find_any(&self, raw_name: &str) -> Option<(&str, &AliasRecord)> {
        let key = normalize_key(raw_name);

        let prioritized = self
            .namespace_priority
            .iter()
            .filter_map(|ns| self.index.get_key_value(ns.as_str()));
        let rest = self
            .index
            .iter()
            .filter(|(ns, _)| !self.namespace_priority.contains(*ns));

        prioritized
            .chain(rest)
            .find_map(|(namespace, _)| {
                self.find(namespace, &key)
                    .resolved()
                    .map(|record| (namespace.as_str(), record))
            })
    }

    /// Normalize `raw_name` and look it up within `namespace`.
    pub fn find_by_identity(&self, namespace: &str, raw_name: &str) -> Resolution<'_> {
        self.find(namespace, &normalize_key(raw_name))
    }

    /// Look up a matched framework by its namespace and name.
    pub fn find_by_framework(&self, framework: &Framework) -> Resolution<'_> {
        self.find_by_identity(&framework.from, &framework.name)
    }

    /// Get a record by canonical name.
    pub fn get(&self, canonical_name: &str) -> Option<&AliasRecord> {
        self.records.get(&canonical_name.to_lowercase())
    }

    pub fn records(&self) -> impl Iterator<Item = &AliasRecord> {
        self.records.values()
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
