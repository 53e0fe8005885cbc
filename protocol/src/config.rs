//! # Protocol Configuration & Constants
//!
//! Every magic number in Quorum lives here. Deployment-specific settings
//! (the signer set, the quorum, listening ports) belong to the node's TOML
//! config; what lives here is the shape of the protocol itself.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Major version. Bump when the wire shape of a transaction changes.
pub const PROTOCOL_VERSION_MAJOR: u16 = 0;

/// Minor version. Bump on backward-compatible additions.
pub const PROTOCOL_VERSION_MINOR: u16 = 1;

/// Patch version. Bump on bug fixes that don't touch the wire format.
pub const PROTOCOL_VERSION_PATCH: u16 = 0;

/// The full version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Identity Parameters
// ---------------------------------------------------------------------------

/// Length of an account or asset identity in bytes. 20 bytes, the same width
/// as an EVM address, so identities copied out of block explorers and token
/// contracts drop straight in.
pub const ADDRESS_LENGTH: usize = 20;

/// Prefix used when rendering identities as hex.
pub const ADDRESS_HEX_PREFIX: &str = "0x";

// ---------------------------------------------------------------------------
// Signer Set Limits
// ---------------------------------------------------------------------------

/// Upper bound on the number of signers a single vault may have.
///
/// Approval sets are scanned on every quorum check, so the set stays small.
/// 64 covers every real custody arrangement we know of; anything bigger is
/// a DAO and wants a governance module, not a multisig.
pub const MAX_SIGNERS: usize = 64;

/// Smallest meaningful quorum. A quorum of zero would let a transfer execute
/// with no approvals at all.
pub const MIN_QUORUM: usize = 1;

// ---------------------------------------------------------------------------
// Network Ports
// ---------------------------------------------------------------------------

/// Default REST/WebSocket API port for the node.
pub const DEFAULT_RPC_PORT: u16 = 9841;

/// Default Prometheus metrics port for the node.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

/// Capacity of the broadcast channel that fans wallet events out to
/// WebSocket subscribers. Large enough to absorb a burst of approvals
/// without lagging a slow client.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Formats the protocol version as `major.minor.patch`.
pub fn version_string() -> String {
    format!(
        "{}.{}.{}",
        PROTOCOL_VERSION_MAJOR, PROTOCOL_VERSION_MINOR, PROTOCOL_VERSION_PATCH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_matches_constant() {
        assert_eq!(version_string(), PROTOCOL_VERSION);
    }

    #[test]
    fn test_signer_limits_sanity() {
        assert!(MIN_QUORUM >= 1);
        assert!(MAX_SIGNERS >= MIN_QUORUM);
    }

    #[test]
    fn test_ports_are_distinct() {
        assert_ne!(DEFAULT_RPC_PORT, DEFAULT_METRICS_PORT);
    }

    #[test]
    fn test_hex_prefix_is_ascii() {
        assert!(ADDRESS_HEX_PREFIX.is_ascii());
        assert_eq!(ADDRESS_LENGTH * 2 + ADDRESS_HEX_PREFIX.len(), 42);
    }
}
