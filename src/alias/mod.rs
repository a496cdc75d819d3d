//! Alias resolution across product naming vocabularies.
//!
//! Third-party fingerprinting tools name the same product differently. The
//! alias registry reconciles those names into one canonical identity:
//!
//! - [`AliasDefinition`] - serde record as found in alias data files
//! - [`AliasRecord`] - compiled definition owned by the registry
//! - [`AliasRegistry`] - canonical records plus a per-namespace lookup index
//! - [`AliasLayers`] - built-in and caller-supplied definitions with an
//!   explicit merge order
//!
//! # Examples
//!
//! ```rust
//! use fingerprint_engine::alias::{AliasDefinition, AliasRegistry};
//! use fingerprint_engine::normalize_key;
//!
//! let nginx = AliasDefinition::new("nginx").with_aliases("wappalyzer", ["Nginx", "NGINX"]);
//!
//! let mut registry = AliasRegistry::new();
//! registry.compile(&[nginx])?;
//!
//! let resolution = registry.find("wappalyzer", &normalize_key("NGINX"));
//! assert!(resolution.is_resolved());
//! assert_eq!(resolution.record().map(|r| r.name.as_str()), Some("nginx"));
//! # Ok::<(), fingerprint_engine::FingerprintError>(())
//! ```

pub mod layers;
pub mod record;
pub mod registry;

pub use layers::AliasLayers;
pub use record::{load_aliases, AliasDefinition, AliasRecord};
pub use registry::{AliasRegistry, Resolution};
