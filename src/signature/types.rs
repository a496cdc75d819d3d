//! Collaborator function types used during matching.

use super::definition::Protocol;
use crate::framework::{Framework, Vuln};

/// Probe handed to a [`Sender`] during active matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    /// Signature that asked for the probe.
    pub signature: String,
    pub protocol: Protocol,
    pub payload: Vec<u8>,
    /// Level the rule required before the probe was allowed.
    pub level: u8,
}

/// Transport collaborator: sends a probe and returns the response bytes.
///
/// Timeouts and cancellation belong to the sender. Errors are treated as
/// "no match" for the rule that asked for the probe.
///
/// # Example
/// ```rust
/// use fingerprint_engine::signature::{Probe, Sender};
///
/// let sender: &Sender<'_> = &|probe: &Probe| {
///     assert!(!probe.payload.is_empty());
///     Ok(b"+PONG\r\n".to_vec())
/// };
/// ```
pub type Sender<'a> = dyn Fn(&Probe) -> anyhow::Result<Vec<u8>> + Send + Sync + 'a;

/// Streaming callback invoked once per identity found during active or
/// socket matching, before the whole operation completes. Both function
/// types may borrow caller state for `'a`.
pub type Callback<'a> = dyn Fn(&Framework, Option<&Vuln>) + Send + Sync + 'a;
