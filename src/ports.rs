//! Port specifications and the named port table.
//!
//! Socket signatures declare port affinity with specs such as `"22"`,
//! `"8000-8010"` or a table name like `"web"`. [`PortTable`] expands those
//! specs into concrete port strings, which key the socket port groups.

use crate::error::{FingerprintError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Port group key for signatures without port affinity.
pub const WILDCARD_PORT: &str = "0";

/// Named list of port specs.
///
/// ```yaml
/// - name: web
///   ports: ["80", "443", "8000-8010"]
///   tags: [http]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortEntry {
    pub name: String,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Lookup table of named port groups.
#[derive(Debug, Clone, Default)]
pub struct PortTable {
    entries: HashMap<String, PortEntry>,
}

impl PortTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<PortEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.name.to_lowercase(), entry))
                .collect(),
        }
    }

    /// Parse a table from YAML (JSON is accepted too).
    pub fn from_yaml(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Self::new());
        }
        let entries: Vec<PortEntry> = serde_yaml::from_str(data)?;
        Ok(Self::from_entries(entries))
    }

    pub fn get(&self, name: &str) -> Option<&PortEntry> {
        self.entries.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Expand port specs into sorted, deduplicated port strings.
///
/// Names are resolved through `table`, recursively; a name cycle or an
/// unknown name is an error.
pub fn expand_specs(specs: &[String], table: Option<&PortTable>) -> Result<Vec<String>> {
    let mut ports = BTreeSet::new();
    let mut visiting = HashSet::new();
    for spec in specs {
        expand_into(spec, table, &mut ports, &mut visiting)?;
    }
    Ok(ports.into_iter().map(|port| port.to_string()).collect())
}

fn expand_into(
    spec: &str,
    table: Option<&PortTable>,
    ports: &mut BTreeSet<u16>,
    visiting: &mut HashSet<String>,
) -> Result<()> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(FingerprintError::InvalidPort("empty port spec".to_string()));
    }

    if let Ok(port) = spec.parse::<u16>() {
        ports.insert(port);
        return Ok(());
    }

    if let Some((start, end)) = spec.split_once('-') {
        if let (Ok(start), Ok(end)) = (start.trim().parse::<u16>(), end.trim().parse::<u16>()) {
            if start > end {
                return Err(FingerprintError::InvalidPort(format!("descending range '{spec}'")));
            }
            ports.extend(start..=end);
            return Ok(());
        }
    }

    let entry = table
        .and_then(|table| table.get(spec))
        .ok_or_else(|| FingerprintError::InvalidPort(format!("unknown port spec '{spec}'")))?;

    let key = entry.name.to_lowercase();
    if !visiting.insert(key.clone()) {
        return Err(FingerprintError::InvalidPort(format!(
            "port name '{spec}' refers to itself"
        )));
    }
    for nested in &entry.ports {
        expand_into(nested, table, ports, visiting)?;
    }
    visiting.remove(&key);
    Ok(())
}
