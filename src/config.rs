//! Engine configuration.
//!
//! This module controls the policy choices the matching engine and the alias
//! registry leave to the caller: how derived indices react to appended
//! signatures, which alias layer wins on a canonical-name collision, the
//! namespace order used by unqualified alias lookups, and passive-match
//! parallelism.

/// How the port index and favicon index react to [`append`].
///
/// | Policy | Append cost | Socket routing after append | Favicon lookup after append |
/// |--------|-------------|-----------------------------|-----------------------------|
/// | `Deferred` | O(added) | stale until `compile()` | stale until `compile()` |
/// | `Incremental` | O(added × ports) | immediate | immediate |
///
/// [`append`]: crate::MatchOrchestrator::append
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexRefresh {
    /// Appended signatures join the HTTP/socket collections but the derived
    /// port and favicon indices are left untouched. The engine reports
    /// `needs_compile() == true` until the next full `compile()`.
    #[default]
    Deferred,

    /// Appended signatures are inserted into the port groups and favicon
    /// tables as they are added.
    Incremental,
}

/// Which alias layer wins when built-in and caller-supplied definitions share
/// a canonical name.
///
/// Layers are compiled in order, later entries overwriting earlier ones, so
/// the winning layer is compiled last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AliasPrecedence {
    /// Caller definitions are compiled first, built-ins last.
    #[default]
    BuiltinWins,

    /// Built-ins are compiled first, caller definitions last.
    ExtraWins,
}

/// Configuration for [`MatchOrchestrator`](crate::MatchOrchestrator) and
/// [`Detector`](crate::Detector).
///
/// # Examples
///
/// ```rust
/// use fingerprint_engine::{EngineConfig, IndexRefresh};
///
/// let config = EngineConfig::new()
///     .with_namespace("recon")
///     .with_index_refresh(IndexRefresh::Incremental)
///     .with_max_probe_level(3);
///
/// assert_eq!(config.namespace, "recon");
/// assert_eq!(config.max_probe_level, 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Namespace stamped on identities produced by this engine's signatures.
    ///
    /// **Default**: `"fingerprint"`
    pub namespace: String,

    /// Derived-index maintenance policy for appended signatures.
    ///
    /// **Default**: [`IndexRefresh::Deferred`]
    pub index_refresh: IndexRefresh,

    /// Merge order for built-in and caller-supplied alias definitions.
    ///
    /// **Default**: [`AliasPrecedence::BuiltinWins`]
    pub alias_precedence: AliasPrecedence,

    /// Namespaces probed first, in this order, by unqualified alias lookups.
    /// Namespaces not listed are probed afterwards in unspecified order.
    ///
    /// **Default**: empty (fully unspecified order)
    pub namespace_priority: Vec<String>,

    /// Evaluate passive HTTP matching across threads.
    ///
    /// **Default**: false
    pub parallel_passive: bool,

    /// Smallest HTTP collection for which parallel passive matching kicks in.
    ///
    /// **Default**: 256
    pub min_parallel_signatures: usize,

    /// Upper bound applied to every caller-supplied probe level.
    ///
    /// **Default**: `u8::MAX` (no clamp)
    pub max_probe_level: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace: "fingerprint".to_string(),
            index_refresh: IndexRefresh::Deferred,
            alias_precedence: AliasPrecedence::BuiltinWins,
            namespace_priority: Vec::new(),
            parallel_passive: false,
            min_parallel_signatures: 256,
            max_probe_level: u8::MAX,
        }
    }
}

impl EngineConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration that never issues probes, whatever level callers pass.
    pub fn passive_only() -> Self {
        Self {
            max_probe_level: 0,
            ..Self::default()
        }
    }

    /// Configuration for large signature sets: parallel passive matching and
    /// incremental index maintenance.
    pub fn high_throughput() -> Self {
        Self {
            index_refresh: IndexRefresh::Incremental,
            parallel_passive: true,
            min_parallel_signatures: 64,
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_index_refresh(mut self, policy: IndexRefresh) -> Self {
        self.index_refresh = policy;
        self
    }

    pub fn with_alias_precedence(mut self, precedence: AliasPrecedence) -> Self {
        self.alias_precedence = precedence;
        self
    }

    pub fn with_namespace_priority<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespace_priority = namespaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parallel_passive(mut self, enable: bool) -> Self {
        self.parallel_passive = enable;
        self
    }

    pub fn with_min_parallel_signatures(mut self, min: usize) -> Self {
        self.min_parallel_signatures = min;
        self
    }

    pub fn with_max_probe_level(mut self, level: u8) -> Self {
        self.max_probe_level = level;
        self
    }

    /// Clamp a caller-supplied probe level to `max_probe_level`.
    pub fn effective_level(&self, level: u8) -> u8 {
        level.min(self.max_probe_level)
    }
}
