//! Serde schema for signature data files.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol a signature applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Tcp,
    Udp,
}

impl Protocol {
    /// True for raw-socket protocols (banner matching, port affinity).
    pub fn is_socket(self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Udp)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// One product signature as written in a data file.
///
/// ```yaml
/// - name: redis
///   protocol: tcp
///   default_port: ["6379"]
///   rule:
///     - regexps:
///         body: ["-ERR unknown command"]
///         version: ["redis_version:([\\d.]+)"]
///       send_data: "INFO\r\n"
///       level: 1
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureDefinition {
    pub name: String,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub focus: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Port specs (numbers, `a-b` ranges, port-table names). Socket only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_port: Vec<String>,
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleDefinition>,
}

impl SignatureDefinition {
    pub fn new(name: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            name: name.into(),
            protocol,
            ..Default::default()
        }
    }

    pub fn with_ports<I, S>(mut self, ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_port.extend(ports.into_iter().map(Into::into));
        self
    }

    pub fn with_rule(mut self, rule: RuleDefinition) -> Self {
        self.rules.push(rule);
        self
    }
}

/// One rule inside a signature. A signature matches when any rule matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    #[serde(default)]
    pub regexps: Regexps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<FaviconHashes>,
    /// Probe payload as text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_data: Option<String>,
    /// Probe payload as base64, for binary protocols.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_data_base64: Option<String>,
    /// Probe level a caller must grant before this rule's probe is sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vuln: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

impl RuleDefinition {
    pub fn body<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            regexps: Regexps {
                body: patterns.into_iter().map(Into::into).collect(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_probe(mut self, payload: impl Into<String>, level: u8) -> Self {
        self.send_data = Some(payload.into());
        self.level = Some(level);
        self
    }

    pub fn with_favicon(mut self, md5: &[&str], mmh3: &[&str]) -> Self {
        self.favicon = Some(FaviconHashes {
            md5: md5.iter().map(|s| s.to_string()).collect(),
            mmh3: mmh3.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn with_vuln(mut self, name: impl Into<String>) -> Self {
        self.vuln = Some(name.into());
        self
    }
}

/// Content patterns of a rule.
///
/// `body`, `header` and `cert` are case-insensitive literals; `regexp` and
/// `version` are regular expressions over the whole content. A `version`
/// expression's first capture group is the extracted version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regexps {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cert: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regexp: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub version: Vec<String>,
}

/// Precomputed favicon hashes in two hash spaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaviconHashes {
    #[serde(default)]
    pub md5: Vec<String>,
    #[serde(default)]
    pub mmh3: Vec<String>,
}

/// Parse a list of signature definitions from YAML (JSON is accepted too).
pub fn load_signatures(data: &str) -> Result<Vec<SignatureDefinition>> {
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_yaml::from_str(data)?)
}

/// Parse a list of signature definitions from strict JSON bytes.
pub fn load_signatures_json(data: &[u8]) -> Result<Vec<SignatureDefinition>> {
    Ok(serde_json::from_slice(data)?)
}
