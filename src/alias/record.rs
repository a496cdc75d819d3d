//! Alias definitions and their compiled records.

use crate::error::{FingerprintError, Result};
use crate::framework::Attributes;
use crate::normalize::normalize_key;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Alias definition as loaded from YAML or JSON.
///
/// ```yaml
/// - name: nginx
///   vendor: f5
///   product: nginx
///   alias:
///     wappalyzer: [Nginx]
///     fofa: [NGINX]
///   block: [goby]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasDefinition {
    pub name: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub product: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub update: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub edition: String,
    /// Namespace -> alternate names used by that namespace.
    #[serde(default, rename = "alias")]
    pub aliases: BTreeMap<String, Vec<String>>,
    /// Namespaces that must never surface this record as a resolved alias.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block: Vec<String>,
}

impl AliasDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_vendor_product(
        mut self,
        vendor: impl Into<String>,
        product: impl Into<String>,
    ) -> Self {
        self.vendor = vendor.into();
        self.product = product.into();
        self
    }

    pub fn with_aliases<I, S>(mut self, namespace: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases
            .entry(namespace.into())
            .or_default()
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_block(mut self, namespace: impl Into<String>) -> Self {
        self.block.push(namespace.into());
        self
    }
}

/// Parse a list of alias definitions from YAML (JSON is accepted as well).
pub fn load_aliases(data: &str) -> Result<Vec<AliasDefinition>> {
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_yaml::from_str(data)?)
}

/// Compiled alias record owned by an [`AliasRegistry`](super::AliasRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRecord {
    /// Canonical name, lower-cased. Unique within a registry.
    pub name: String,
    pub vendor: String,
    pub product: String,
    pub version: String,
    pub update: String,
    pub edition: String,
    pub aliases: BTreeMap<String, Vec<String>>,
    normalized_name: String,
    blocked: HashSet<String>,
}

impl AliasRecord {
    /// Validate a definition and compile it into a record.
    ///
    /// Returns the record together with the `(namespace, normalized alternate
    /// name)` pairs it contributes to the lookup index.
    pub(crate) fn compile(definition: &AliasDefinition) -> Result<(Self, Vec<(String, String)>)> {
        let name = definition.name.trim().to_lowercase();
        if name.is_empty() {
            return Err(FingerprintError::alias(
                &definition.name,
                "canonical name is empty",
            ));
        }

        let mut blocked = HashSet::with_capacity(definition.block.len());
        for namespace in &definition.block {
            if namespace.trim().is_empty() {
                return Err(FingerprintError::alias(&name, "blocked namespace is empty"));
            }
            blocked.insert(namespace.clone());
        }

        let mut index_entries = Vec::new();
        for (namespace, names) in &definition.aliases {
            if namespace.trim().is_empty() {
                return Err(FingerprintError::alias(&name, "alias namespace is empty"));
            }
            for alternate in names {
                let key = normalize_key(alternate);
                if key.is_empty() {
                    return Err(FingerprintError::alias(
                        &name,
                        format!(
                            "alternate name '{alternate}' in '{namespace}' \
                             has no comparable characters"
                        ),
                    ));
                }
                index_entries.push((namespace.clone(), key));
            }
        }

        let record = Self {
            normalized_name: normalize_key(&name),
            name,
            vendor: definition.vendor.clone(),
            product: definition.product.clone(),
            version: definition.version.clone(),
            update: definition.update.clone(),
            edition: definition.edition.clone(),
            aliases: definition.aliases.clone(),
            blocked,
        };
        Ok((record, index_entries))
    }

    /// Normalized search key of the canonical name.
    pub fn normalized_name(&self) -> &str {
        &self.normalized_name
    }

    pub fn is_blocked(&self, namespace: &str) -> bool {
        self.blocked.contains(namespace)
    }

    /// True when `raw` normalizes to this record's canonical key.
    pub fn fuzzy_match(&self, raw: &str) -> bool {
        self.normalized_name == normalize_key(raw)
    }

    /// Project into the attribute tuple used for CPE-style lookups.
    pub fn to_attributes(&self) -> Attributes {
        Attributes {
            part: "a".to_string(),
            vendor: self.vendor.clone(),
            product: self.product.clone(),
            version: self.version.clone(),
            update: self.update.clone(),
            edition: self.edition.clone(),
        }
    }
}
