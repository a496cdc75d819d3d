//! Embedded default data sets and custom data loading.
//!
//! The crate ships default HTTP signatures, socket signatures, alias
//! definitions and a port table, compiled into the binary. [`Resources`]
//! carries one value of each and lets callers replace any of them, either
//! with in-memory text or with a file read from disk.

use crate::alias::{load_aliases, AliasDefinition};
use crate::error::Result;
use crate::ports::PortTable;
use crate::signature::{load_signatures, SignatureDefinition};
use std::borrow::Cow;
use std::path::Path;

pub const DEFAULT_HTTP_SIGNATURES: &str = include_str!("../resources/http.yaml");
pub const DEFAULT_SOCKET_SIGNATURES: &str = include_str!("../resources/socket.yaml");
pub const DEFAULT_ALIASES: &str = include_str!("../resources/aliases.yaml");
pub const DEFAULT_PORTS: &str = include_str!("../resources/ports.yaml");

/// Source text for every data set an engine is built from.
///
/// YAML is expected throughout; JSON documents parse as well.
///
/// ```rust
/// use fingerprint_engine::{EngineConfig, MatchOrchestrator, Resources};
///
/// let resources = Resources::embedded().with_http(
///     r#"
/// - name: internal-portal
///   rule:
///     - regexps:
///         body: ["<title>Portal</title>"]
/// "#,
/// );
/// let engine = MatchOrchestrator::with_resources(&resources, EngineConfig::default())?;
/// assert!(engine.match_content(b"<title>Portal</title>").contains("internal-portal"));
/// # Ok::<(), fingerprint_engine::FingerprintError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resources {
    http: Cow<'static, str>,
    socket: Option<Cow<'static, str>>,
    aliases: Cow<'static, str>,
    ports: Option<Cow<'static, str>>,
}

impl Default for Resources {
    fn default() -> Self {
        Self::embedded()
    }
}

impl Resources {
    /// The data sets compiled into the crate.
    pub fn embedded() -> Self {
        Self {
            http: Cow::Borrowed(DEFAULT_HTTP_SIGNATURES),
            socket: Some(Cow::Borrowed(DEFAULT_SOCKET_SIGNATURES)),
            aliases: Cow::Borrowed(DEFAULT_ALIASES),
            ports: Some(Cow::Borrowed(DEFAULT_PORTS)),
        }
    }

    pub fn with_http(mut self, data: impl Into<Cow<'static, str>>) -> Self {
        self.http = data.into();
        self
    }

    pub fn with_socket(mut self, data: impl Into<Cow<'static, str>>) -> Self {
        self.socket = Some(data.into());
        self
    }

    /// Build engines without socket signatures.
    pub fn without_socket(mut self) -> Self {
        self.socket = None;
        self
    }

    pub fn with_aliases(mut self, data: impl Into<Cow<'static, str>>) -> Self {
        self.aliases = data.into();
        self
    }

    pub fn with_ports(mut self, data: impl Into<Cow<'static, str>>) -> Self {
        self.ports = Some(data.into());
        self
    }

    /// Resolve socket port specs without a name table (numbers and ranges only).
    pub fn without_ports(mut self) -> Self {
        self.ports = None;
        self
    }

    pub fn with_http_file(self, path: impl AsRef<Path>) -> Result<Self> {
        Ok(self.with_http(read(path)?))
    }

    pub fn with_socket_file(self, path: impl AsRef<Path>) -> Result<Self> {
        Ok(self.with_socket(read(path)?))
    }

    pub fn with_aliases_file(self, path: impl AsRef<Path>) -> Result<Self> {
        Ok(self.with_aliases(read(path)?))
    }

    pub fn with_ports_file(self, path: impl AsRef<Path>) -> Result<Self> {
        Ok(self.with_ports(read(path)?))
    }

    pub fn load_http(&self) -> Result<Vec<SignatureDefinition>> {
        load_signatures(&self.http)
    }

    pub fn load_socket(&self) -> Result<Option<Vec<SignatureDefinition>>> {
        self.socket.as_deref().map(load_signatures).transpose()
    }

    pub fn load_aliases(&self) -> Result<Vec<AliasDefinition>> {
        load_aliases(&self.aliases)
    }

    pub fn load_ports(&self) -> Result<Option<PortTable>> {
        self.ports.as_deref().map(PortTable::from_yaml).transpose()
    }
}

fn read(path: impl AsRef<Path>) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}
