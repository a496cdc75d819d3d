//! Signature evaluation.
//!
//! This module is the per-signature rule evaluator the engine drives:
//!
//! - [`SignatureDefinition`] - serde schema for signature data files
//! - [`Signature`] - compiled signature with single-signature matching
//! - [`SignatureSet`] - ordered collection with passive, active and
//!   port-grouping operations
//! - [`Content`] - observed bytes with header/body/certificate views
//! - [`Sender`] / [`Callback`] - transport and streaming collaborators
//!
//! ## Example Usage
//!
//! ```rust
//! use fingerprint_engine::signature::{load_signatures, Content, Signature};
//!
//! let definitions = load_signatures(r#"
//! - name: nginx
//!   rule:
//!     - regexps:
//!         header: ["server: nginx"]
//! "#)?;
//! let signature = Signature::compile(&definitions[0], false, "fingerprint")?;
//!
//! let content = Content::http(b"HTTP/1.1 200 OK\r\nServer: nginx\r\n\r\n", "");
//! assert!(signature.match_one(&content, 0, None).is_some());
//! # Ok::<(), fingerprint_engine::FingerprintError>(())
//! ```

pub mod compiled;
pub mod content;
pub mod definition;
pub mod set;
pub mod types;

pub use compiled::{Signature, DEFAULT_RULE_LEVEL};
pub use content::Content;
pub use definition::{
    load_signatures, load_signatures_json, FaviconHashes, Protocol, Regexps, RuleDefinition,
    SignatureDefinition,
};
pub use set::{PortGroups, SignatureSet};
pub use types::{Callback, Probe, Sender};
