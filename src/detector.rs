//! Alias-aware matching facade.
//!
//! [`Detector`] pairs a [`MatchOrchestrator`] with an [`AliasRegistry`] and
//! reports every identity under its canonical product name, with vendor and
//! product attributes filled from the alias record. Identities the registry
//! does not know, or whose namespace is blocked for the record, are reported
//! as the signatures produced them.

use crate::alias::{AliasDefinition, AliasLayers, AliasRecord, AliasRegistry, Resolution};
use crate::config::EngineConfig;
use crate::engine::MatchOrchestrator;
use crate::error::Result;
use crate::framework::{Framework, Frameworks, Vuln, Vulns};
use crate::resources::Resources;
use crate::signature::{Callback, Sender, SignatureDefinition};

/// Signature engine plus alias registry.
///
/// # Examples
///
/// ```rust
/// use fingerprint_engine::Detector;
///
/// let detector = Detector::with_defaults()?;
/// let (frameworks, _) = detector.http_match(b"HTTP/1.1 200 OK\r\nServer: nginx\r\n\r\n", "");
///
/// let nginx = frameworks.one().unwrap();
/// assert_eq!(nginx.vendor.as_deref(), Some("f5"));
/// # Ok::<(), fingerprint_engine::FingerprintError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Detector {
    engine: MatchOrchestrator,
    aliases: AliasRegistry,
}

impl Detector {
    pub fn new(engine: MatchOrchestrator, aliases: AliasRegistry) -> Self {
        Self { engine, aliases }
    }

    /// Build both halves from `resources`. Alias merge order and namespace
    /// priority come from `config`.
    pub fn with_resources(resources: &Resources, config: EngineConfig) -> Result<Self> {
        Self::with_alias_layers(
            resources,
            AliasLayers::new(resources.load_aliases()?),
            config,
        )
    }

    /// Like [`with_resources`](Self::with_resources), with caller alias
    /// definitions layered over the resource ones.
    pub fn with_extra_aliases(
        resources: &Resources,
        extra: Vec<AliasDefinition>,
        config: EngineConfig,
    ) -> Result<Self> {
        Self::with_alias_layers(
            resources,
            AliasLayers::new(resources.load_aliases()?).with_extra(extra),
            config,
        )
    }

    pub fn with_defaults() -> Result<Self> {
        Self::with_resources(&Resources::embedded(), EngineConfig::default())
    }

    fn with_alias_layers(
        resources: &Resources,
        layers: AliasLayers,
        config: EngineConfig,
    ) -> Result<Self> {
        let aliases = AliasRegistry::from_layers(&layers, config.alias_precedence)?
            .with_namespace_priority(config.namespace_priority.clone());
        let engine = MatchOrchestrator::with_resources(resources, config)?;
        Ok(Self { engine, aliases })
    }

    pub fn engine(&self) -> &MatchOrchestrator {
        &self.engine
    }

    pub fn aliases(&self) -> &AliasRegistry {
        &self.aliases
    }

    /// Register more alias definitions. Nothing is applied if any of them is
    /// malformed.
    pub fn append_aliases(&mut self, definitions: &[AliasDefinition]) -> Result<()> {
        self.aliases.append_aliases(definitions)
    }

    /// See [`MatchOrchestrator::append`].
    pub fn append_signatures(&mut self, definitions: Vec<SignatureDefinition>) -> Result<()> {
        self.engine.append(definitions)
    }

    /// See [`MatchOrchestrator::compile`].
    pub fn compile(&mut self) -> Result<()> {
        self.engine.compile()
    }

    /// Resolve a raw name within `namespace`.
    pub fn resolve(&self, namespace: &str, raw_name: &str) -> Resolution<'_> {
        self.aliases.find_by_identity(namespace, raw_name)
    }

    /// Resolve a raw name in whichever namespace knows it.
    pub fn resolve_any(&self, raw_name: &str) -> Option<&AliasRecord> {
        self.aliases.find_any(raw_name).map(|(_, record)| record)
    }

    /// Rewrite `framework` under its canonical name when the registry
    /// resolves it. Attributes already set on the framework are kept.
    pub fn canonicalize(&self, mut framework: Framework) -> Framework {
        if let Resolution::Resolved(record) = self.aliases.find_by_framework(&framework) {
            framework.name = record.name.clone();
            fill(&mut framework.version, &record.version);
            fill(&mut framework.vendor, &record.vendor);
            fill(&mut framework.product, &record.product);
            fill(&mut framework.update, &record.update);
            fill(&mut framework.edition, &record.edition);
        }
        framework
    }

    fn canonicalize_vuln(&self, mut vuln: Vuln) -> Vuln {
        if let Some(record) = self
            .aliases
            .find_by_identity(self.engine.name(), &vuln.framework)
            .resolved()
        {
            vuln.framework = record.name.clone();
        }
        vuln
    }

    fn canonicalize_all(&self, (frameworks, vulns): (Frameworks, Vulns)) -> (Frameworks, Vulns) {
        (
            frameworks.into_iter().map(|f| self.canonicalize(f)).collect(),
            vulns.into_iter().map(|v| self.canonicalize_vuln(v)).collect(),
        )
    }

    /// See [`MatchOrchestrator::http_match`].
    pub fn http_match(&self, content: &[u8], cert: &str) -> (Frameworks, Vulns) {
        self.canonicalize_all(self.engine.http_match(content, cert))
    }

    /// See [`MatchOrchestrator::http_active_match`]. `callback` receives
    /// canonicalized identities.
    pub fn http_active_match(
        &self,
        level: u8,
        sender: &Sender<'_>,
        callback: Option<&Callback<'_>>,
    ) -> (Frameworks, Vulns) {
        let result = match callback {
            Some(callback) => {
                let wrapped = |framework: &Framework, vuln: Option<&Vuln>| {
                    self.forward(callback, framework, vuln)
                };
                self.engine.http_active_match(level, sender, Some(&wrapped))
            }
            None => self.engine.http_active_match(level, sender, None),
        };
        self.canonicalize_all(result)
    }

    /// See [`MatchOrchestrator::socket_match`]. `callback` receives
    /// canonicalized identities.
    pub fn socket_match(
        &self,
        content: &[u8],
        port: &str,
        level: u8,
        sender: Option<&Sender<'_>>,
        callback: Option<&Callback<'_>>,
    ) -> Option<(Framework, Option<Vuln>)> {
        let result = match callback {
            Some(callback) => {
                let wrapped = |framework: &Framework, vuln: Option<&Vuln>| {
                    self.forward(callback, framework, vuln)
                };
                self.engine
                    .socket_match(content, port, level, sender, Some(&wrapped))
            }
            None => self.engine.socket_match(content, port, level, sender, None),
        };
        result.map(|(framework, vuln)| {
            (
                self.canonicalize(framework),
                vuln.map(|v| self.canonicalize_vuln(v)),
            )
        })
    }

    /// See [`MatchOrchestrator::match_content`].
    pub fn match_content(&self, content: &[u8]) -> Frameworks {
        self.http_match(content, "").0
    }

    /// See [`MatchOrchestrator::favicon_match`].
    pub fn favicon_match(&self, md5: &str, mmh3: &str) -> Option<Framework> {
        self.engine
            .favicon_match(md5, mmh3)
            .map(|framework| self.canonicalize(framework))
    }

    fn forward(&self, callback: &Callback<'_>, framework: &Framework, vuln: Option<&Vuln>) {
        let framework = self.canonicalize(framework.clone());
        let vuln = vuln.cloned().map(|v| self.canonicalize_vuln(v));
        callback(&framework, vuln.as_ref());
    }
}

fn fill(slot: &mut Option<String>, value: &str) {
    if slot.is_none() && !value.is_empty() {
        *slot = Some(value.to_string());
    }
}
