//! # Fingerprint Engine
//!
//! Product fingerprinting for network scanners: identify the software behind
//! an HTTP response, a TLS certificate, a favicon hash or a raw socket
//! banner, and translate product names between the naming vocabularies of
//! different tools.
//!
//! ## Quick Start
//!
//! ### HTTP and socket matching
//!
//! ```rust
//! use fingerprint_engine::MatchOrchestrator;
//!
//! let engine = MatchOrchestrator::with_defaults()?;
//!
//! // Every signature that fires is reported.
//! let response = b"HTTP/1.1 200 OK\r\nServer: nginx\r\nX-Powered-By: PHP/8.2.1\r\n\r\n";
//! let (frameworks, _vulns) = engine.http_match(response, "");
//! assert_eq!(frameworks.names(), vec!["nginx", "php"]);
//!
//! // A socket banner resolves to at most one service.
//! let (service, _) = engine
//!     .socket_match(b"220 (vsFTPd 3.0.5)\r\n", "21", 0, None, None)
//!     .expect("vsftpd banner");
//! assert_eq!(service.version.as_deref(), Some("3.0.5"));
//! # Ok::<(), fingerprint_engine::FingerprintError>(())
//! ```
//!
//! ### Alias resolution
//!
//! ```rust
//! use fingerprint_engine::{normalize_key, AliasDefinition, AliasRegistry};
//!
//! let registry = AliasRegistry::build(
//!     vec![AliasDefinition::new("nginx").with_aliases("wappalyzer", ["Nginx", "NGINX"])],
//!     vec![],
//! )?;
//!
//! let record = registry.find("wappalyzer", &normalize_key("NGINX")).resolved();
//! assert_eq!(record.unwrap().name, "nginx");
//! # Ok::<(), fingerprint_engine::FingerprintError>(())
//! ```
//!
//! ### Active probing
//!
//! Signatures may carry probe payloads. The engine never opens connections
//! itself: the caller passes a [`Sender`] that delivers a [`Probe`] and
//! returns the response bytes, and the probe level caps how aggressive the
//! probes may be.
//!
//! ```rust
//! use fingerprint_engine::{Framework, MatchOrchestrator, Probe, Vuln};
//!
//! let engine = MatchOrchestrator::with_defaults()?;
//! let sender = |probe: &Probe| -> anyhow::Result<Vec<u8>> {
//!     match probe.signature.as_str() {
//!         "redis" => Ok(b"$3000\r\n# Server\r\nredis_version:7.2.4\r\n".to_vec()),
//!         _ => anyhow::bail!("connection refused"),
//!     }
//! };
//! let report = |framework: &Framework, _vuln: Option<&Vuln>| {
//!     println!("found {}", framework.name);
//! };
//!
//! let (redis, vuln) = engine
//!     .socket_match(b"", "6379", 1, Some(&sender), Some(&report))
//!     .expect("redis probe");
//! assert_eq!(redis.version.as_deref(), Some("7.2.4"));
//! assert_eq!(vuln.unwrap().name, "redis-unauthorized");
//! # Ok::<(), fingerprint_engine::FingerprintError>(())
//! ```
//!
//! ## Concurrency
//!
//! Mutation (`compile`, `append`, `append_aliases`) takes `&mut self`;
//! matching and lookups take `&self`. Once mutation is done, engines and
//! registries can be shared across threads without locking.

pub mod alias;
pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod favicon;
pub mod framework;
pub mod normalize;
pub mod ports;
pub mod resources;
pub mod signature;

// Primary interfaces
pub use detector::Detector;
pub use engine::MatchOrchestrator;

// Configuration
pub use config::{AliasPrecedence, EngineConfig, IndexRefresh};

// Core types and errors
pub use error::{FingerprintError, Result};
pub use framework::{Attributes, Framework, Frameworks, Vuln, Vulns};
pub use normalize::normalize_key;

// Alias registry
pub use alias::{AliasDefinition, AliasLayers, AliasRecord, AliasRegistry, Resolution};

// Signatures and indices
pub use favicon::FaviconIndex;
pub use ports::{PortEntry, PortTable, WILDCARD_PORT};
pub use resources::Resources;
pub use signature::{
    Callback, Content, PortGroups, Probe, Protocol, RuleDefinition, Sender, Signature,
    SignatureDefinition, SignatureSet,
};
