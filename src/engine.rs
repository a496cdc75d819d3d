//! Match orchestrator.
//!
//! [`MatchOrchestrator`] owns the compiled HTTP and socket signature
//! collections together with the indices derived from them (active-eligible
//! HTTP subset, socket port groups, favicon tables) and routes content to
//! the right collection.
//!
//! The engine follows a compile-then-freeze model: [`compile`] and
//! [`append`] take `&mut self`, every matching operation takes `&self`, so
//! once mutation is over the engine can be shared across threads freely.
//!
//! [`compile`]: MatchOrchestrator::compile
//! [`append`]: MatchOrchestrator::append

use crate::config::{EngineConfig, IndexRefresh};
use crate::error::{FingerprintError, Result};
use crate::favicon::FaviconIndex;
use crate::framework::{Framework, Frameworks, Vuln, Vulns};
use crate::ports::{expand_specs, PortTable};
use crate::resources::Resources;
use crate::signature::{
    Callback, Content, PortGroups, Sender, Signature, SignatureDefinition, SignatureSet,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Compiled HTTP and socket signatures plus their derived indices.
///
/// # Examples
///
/// ```rust
/// use fingerprint_engine::MatchOrchestrator;
///
/// let engine = MatchOrchestrator::with_defaults()?;
///
/// let response = b"HTTP/1.1 200 OK\r\nServer: nginx/1.25.3\r\n\r\n<html></html>";
/// let (frameworks, _vulns) = engine.http_match(response, "");
/// assert_eq!(frameworks.one().unwrap().version.as_deref(), Some("1.25.3"));
///
/// let ssh = engine.socket_match(b"SSH-2.0-OpenSSH_9.6\r\n", "22", 0, None, None);
/// assert_eq!(ssh.unwrap().0.name, "openssh");
/// # Ok::<(), fingerprint_engine::FingerprintError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MatchOrchestrator {
    config: EngineConfig,
    http_definitions: Vec<SignatureDefinition>,
    socket_definitions: Option<Vec<SignatureDefinition>>,
    ports: Option<PortTable>,
    http: SignatureSet,
    http_active: SignatureSet,
    socket: SignatureSet,
    socket_groups: PortGroups,
    favicons: FaviconIndex,
    stale: bool,
}

impl MatchOrchestrator {
    /// Build and compile an engine.
    ///
    /// The HTTP signature set is mandatory; an empty one is an error. Socket
    /// signatures and the port table are optional.
    pub fn new(
        http: Vec<SignatureDefinition>,
        socket: Option<Vec<SignatureDefinition>>,
        ports: Option<PortTable>,
        config: EngineConfig,
    ) -> Result<Self> {
        if http.is_empty() {
            return Err(FingerprintError::MissingHttpSignatures);
        }

        let mut engine = Self {
            config,
            http_definitions: http,
            socket_definitions: socket,
            ports,
            http: SignatureSet::new(),
            http_active: SignatureSet::new(),
            socket: SignatureSet::new(),
            socket_groups: PortGroups::new(),
            favicons: FaviconIndex::new(),
            stale: false,
        };
        engine.compile()?;
        Ok(engine)
    }

    /// Build an engine from a set of (embedded or custom) resources.
    pub fn with_resources(resources: &Resources, config: EngineConfig) -> Result<Self> {
        Self::new(
            resources.load_http()?,
            resources.load_socket()?,
            resources.load_ports()?,
            config,
        )
    }

    /// Build an engine from the embedded resources and default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::with_resources(&Resources::embedded(), EngineConfig::default())
    }

    /// Engine name, which is also the namespace of the identities it emits.
    pub fn name(&self) -> &str {
        &self.config.namespace
    }

    /// Total number of compiled signatures, HTTP and socket.
    pub fn len(&self) -> usize {
        self.http.len() + self.socket.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rebuild every compiled collection and derived index from the stored
    /// definitions.
    ///
    /// Everything is built aside and swapped in at the end, so a failure
    /// leaves the previous state in place. Calling it twice yields the same
    /// engine.
    pub fn compile(&mut self) -> Result<()> {
        if self.http_definitions.is_empty() {
            return Err(FingerprintError::MissingHttpSignatures);
        }

        let namespace = self.config.namespace.as_str();
        let http: SignatureSet = self
            .http_definitions
            .iter()
            .map(|definition| Signature::compile(definition, false, namespace).map(Arc::new))
            .collect::<Result<_>>()?;
        let http_active = http.active_subset();
        let favicons = FaviconIndex::build(&http);

        let (socket, socket_groups) = match &self.socket_definitions {
            Some(definitions) => {
                let socket: SignatureSet = definitions
                    .iter()
                    .map(|definition| Signature::compile(definition, true, namespace).map(Arc::new))
                    .collect::<Result<_>>()?;
                let groups = socket.group_by_port(self.ports.as_ref())?;
                (socket, groups)
            }
            None => (SignatureSet::new(), PortGroups::new()),
        };

        info!(
            http = http.len(),
            http_active = http_active.len(),
            socket = socket.len(),
            port_groups = socket_groups.len(),
            favicon_md5 = favicons.md5_len(),
            favicon_mmh3 = favicons.mmh3_len(),
            "signatures compiled"
        );

        self.http = http;
        self.http_active = http_active;
        self.socket = socket;
        self.socket_groups = socket_groups;
        self.favicons = favicons;
        self.stale = false;
        Ok(())
    }

    /// Compile and add signatures, routed by protocol.
    ///
    /// HTTP additions join the full HTTP collection and, when they carry a
    /// probe, the active-eligible subset. Socket (`tcp`/`udp`) additions join
    /// the socket collection. The whole batch is compiled before anything is
    /// added, so one bad definition (or an unresolvable port spec) rejects
    /// the batch.
    ///
    /// Derived indices follow [`EngineConfig::index_refresh`]: with
    /// [`IndexRefresh::Deferred`] appended socket signatures are invisible to
    /// [`socket_match`](Self::socket_match) and appended favicon hashes are
    /// invisible to [`favicon_match`](Self::favicon_match) until the next
    /// [`compile`](Self::compile); [`needs_compile`](Self::needs_compile)
    /// reports that state.
    pub fn append(&mut self, definitions: Vec<SignatureDefinition>) -> Result<()> {
        let namespace = self.config.namespace.as_str();
        let staged = definitions
            .iter()
            .map(|definition| {
                Signature::compile(definition, definition.protocol.is_socket(), namespace)
                    .map(Arc::new)
            })
            .collect::<Result<Vec<_>>>()?;

        // Port specs are checked now so a later compile cannot fail on them.
        for signature in staged.iter().filter(|s| s.is_socket()) {
            expand_specs(signature.ports(), self.ports.as_ref())?;
        }

        let incremental = self.config.index_refresh == IndexRefresh::Incremental;

        let mut touches_indices = false;
        for (definition, signature) in definitions.into_iter().zip(staged) {
            if signature.is_socket() {
                touches_indices = true;
                if incremental {
                    self.socket_groups
                        .insert(signature.clone(), self.ports.as_ref())?;
                }
                self.socket.push(signature);
                self.socket_definitions
                    .get_or_insert_with(Vec::new)
                    .push(definition);
            } else {
                if signature.has_favicons() {
                    touches_indices = true;
                    if incremental {
                        self.favicons.insert_signature(&signature);
                    }
                }
                if signature.is_active() {
                    self.http_active.push(signature.clone());
                }
                self.http.push(signature);
                self.http_definitions.push(definition);
            }
        }

        if touches_indices && !incremental {
            self.stale = true;
            debug!(
                socket = self.socket.len(),
                http = self.http.len(),
                "port and favicon indices stale until compile"
            );
        }
        Ok(())
    }

    /// True when appended signatures are not yet reflected in the port groups
    /// or favicon index.
    pub fn needs_compile(&self) -> bool {
        self.stale
    }

    /// Identify the single service behind a socket banner.
    ///
    /// Signatures are tried in three stages, stopping at the first match:
    /// the group for `port` (skipped when `port` is empty), then the
    /// wildcard group, then every remaining group in ascending port-key
    /// order. A signature name tried in an earlier stage is not tried again.
    /// `callback` sees the match when one is found.
    pub fn socket_match(
        &self,
        content: &[u8],
        port: &str,
        level: u8,
        sender: Option<&Sender<'_>>,
        callback: Option<&Callback<'_>>,
    ) -> Option<(Framework, Option<Vuln>)> {
        let level = self.config.effective_level(level);
        let banner = Content::socket(content);
        let mut attempted: HashSet<&str> = HashSet::new();

        let routed = [
            Some(port).filter(|port| !port.is_empty()),
            Some(crate::ports::WILDCARD_PORT),
        ];
        let routed = routed
            .into_iter()
            .flatten()
            .filter_map(|key| Some(("routed", key, self.socket_groups.get(key)?)));
        let exhaustive = self
            .socket_groups
            .iter()
            .map(|(key, group)| ("exhaustive", key, group));

        for (stage, key, group) in routed.chain(exhaustive) {
            if let Some((framework, vuln)) =
                group.first_match(&banner, level, sender, callback, &mut attempted)
            {
                debug!(port = key, stage, framework = %framework.name, "socket match");
                return Some((framework, vuln));
            }
        }
        None
    }

    /// Passive match of an HTTP response. Returns every identity that fires.
    pub fn http_match(&self, content: &[u8], cert: &str) -> (Frameworks, Vulns) {
        let content = Content::http(content, cert);
        if self.config.parallel_passive && self.http.len() >= self.config.min_parallel_signatures {
            self.http.par_passive_match(&content)
        } else {
            self.http.passive_match(&content, false)
        }
    }

    /// Probe with every active-eligible HTTP signature, streaming hits
    /// through `callback`.
    pub fn http_active_match(
        &self,
        level: u8,
        sender: &Sender<'_>,
        callback: Option<&Callback<'_>>,
    ) -> (Frameworks, Vulns) {
        let level = self.config.effective_level(level);
        self.http_active.active_match(level, sender, callback, false)
    }

    /// Identities from [`http_match`](Self::http_match) without certificate
    /// text, vulnerabilities discarded.
    pub fn match_content(&self, content: &[u8]) -> Frameworks {
        self.http_match(content, "").0
    }

    /// Resolve precomputed favicon hashes (md5 first, then mmh3). Pass an
    /// empty string for a hash that was not computed.
    pub fn favicon_match(&self, md5: &str, mmh3: &str) -> Option<Framework> {
        let name = self.favicons.lookup(md5, mmh3)?;
        self.http.get(name).map(|signature| signature.framework())
    }

    pub fn http_signatures(&self) -> &SignatureSet {
        &self.http
    }

    pub fn http_active_signatures(&self) -> &SignatureSet {
        &self.http_active
    }

    pub fn socket_signatures(&self) -> &SignatureSet {
        &self.socket
    }

    pub fn port_groups(&self) -> &PortGroups {
        &self.socket_groups
    }

    pub fn favicons(&self) -> &FaviconIndex {
        &self.favicons
    }

    pub fn port_table(&self) -> Option<&PortTable> {
        self.ports.as_ref()
    }
}
