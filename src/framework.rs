//! Identity values produced by matching.
//!
//! A [`Framework`] names one product observed on a target, qualified by the
//! namespace that named it. A [`Vuln`] is attached 1:1 to the match that
//! produced it. [`Frameworks`] and [`Vulns`] keep declaration order so the
//! result of a scan reads in the same order as the signatures that fired.

use serde::{Deserialize, Serialize};

/// One identified product.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Framework {
    pub name: String,
    /// Namespace (naming vocabulary) that produced `name`.
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub focus: bool,
}

impl Framework {
    pub fn new(name: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from: from.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Vulnerability or finding attached to a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vuln {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    /// Name of the framework whose rule produced this finding.
    pub framework: String,
}

/// Declaration-ordered set of frameworks keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frameworks(Vec<Framework>);

impl Frameworks {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a framework. A name already present is merged: the existing entry
    /// keeps its position and picks up a version if it had none.
    pub fn add(&mut self, framework: Framework) {
        match self.0.iter_mut().find(|f| f.name == framework.name) {
            Some(existing) => {
                if existing.version.is_none() {
                    existing.version = framework.version;
                }
                existing.focus |= framework.focus;
            }
            None => self.0.push(framework),
        }
    }

    pub fn extend(&mut self, other: Frameworks) {
        for framework in other.0 {
            self.add(framework);
        }
    }

    /// First framework in declaration order.
    pub fn one(&self) -> Option<&Framework> {
        self.0.first()
    }

    pub fn get(&self, name: &str) -> Option<&Framework> {
        self.0.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Framework> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Framework> {
        self.0
    }
}

impl FromIterator<Framework> for Frameworks {
    fn from_iter<I: IntoIterator<Item = Framework>>(iter: I) -> Self {
        let mut frameworks = Frameworks::new();
        for framework in iter {
            frameworks.add(framework);
        }
        frameworks
    }
}

impl IntoIterator for Frameworks {
    type Item = Framework;
    type IntoIter = std::vec::IntoIter<Framework>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Findings collected alongside [`Frameworks`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vulns(Vec<Vuln>);

impl Vulns {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn add(&mut self, vuln: Vuln) {
        if !self.0.contains(&vuln) {
            self.0.push(vuln);
        }
    }

    pub fn extend(&mut self, other: Vulns) {
        for vuln in other.0 {
            self.add(vuln);
        }
    }

    pub fn one(&self) -> Option<&Vuln> {
        self.0.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vuln> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Vuln> for Vulns {
    fn from_iter<I: IntoIterator<Item = Vuln>>(iter: I) -> Self {
        let mut vulns = Vulns::new();
        for vuln in iter {
            vulns.add(vuln);
        }
        vulns
    }
}

impl IntoIterator for Vulns {
    type Item = Vuln;
    type IntoIter = std::vec::IntoIter<Vuln>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Five-field product attribute tuple (plus part designator) used for
/// CPE-style vulnerability lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    /// Always `"a"` (application).
    pub part: String,
    pub vendor: String,
    pub product: String,
    pub version: String,
    pub update: String,
    pub edition: String,
}
