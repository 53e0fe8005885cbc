//! # Signer Registry
//!
//! The fixed set of identities allowed to initiate and approve transfers out
//! of a vault, together with the quorum threshold.
//!
//! A registry is validated once at construction and is immutable afterwards.
//! There is no add/remove: a different signer set is a different registry,
//! and in-flight transactions keep being judged against the one the vault
//! was built with.

use std::collections::HashSet;

use quorum_protocol::config::{MAX_SIGNERS, MIN_QUORUM};
use quorum_protocol::identity::Address;
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a signer registry cannot be constructed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No signers were supplied.
    #[error("signer set is empty")]
    EmptySignerSet,

    /// The null identity was listed as a signer.
    #[error("the zero address cannot be a signer")]
    ZeroAddressSigner,

    /// The same identity was listed twice.
    #[error("duplicate signer: {0}")]
    DuplicateSigner(Address),

    /// More signers than the protocol allows.
    #[error("too many signers: {count} exceeds the maximum of {max}")]
    TooManySigners {
        /// Number of signers supplied.
        count: usize,
        /// Protocol maximum.
        max: usize,
    },

    /// The quorum was zero.
    #[error("quorum must be at least {min}")]
    ZeroQuorum {
        /// Smallest allowed quorum.
        min: usize,
    },

    /// The quorum can never be reached with this many signers.
    #[error("quorum {quorum} exceeds the number of signers ({signers})")]
    QuorumExceedsSigners {
        /// Requested quorum.
        quorum: usize,
        /// Number of signers.
        signers: usize,
    },
}

// ---------------------------------------------------------------------------
// SignerRegistry
// ---------------------------------------------------------------------------

/// An immutable signer set plus quorum threshold.
#[derive(Debug, Clone, Serialize)]
pub struct SignerRegistry {
    /// Signers in the order they were supplied.
    signers: Vec<Address>,
    /// Membership index over `signers`.
    #[serde(skip)]
    members: HashSet<Address>,
    /// Number of distinct approvals required to execute a transfer.
    quorum: usize,
}

impl SignerRegistry {
    /// Validates and builds a registry.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    /// [`RegistryError::EmptySignerSet`], [`RegistryError::TooManySigners`],
    /// [`RegistryError::ZeroAddressSigner`], [`RegistryError::DuplicateSigner`],
    /// [`RegistryError::ZeroQuorum`], [`RegistryError::QuorumExceedsSigners`].
    pub fn new(quorum: usize, signers: Vec<Address>) -> Result<Self, RegistryError> {
        let count = signers.len();
        let result = Self::build(quorum, signers);
        match &result {
            Ok(_) => tracing::debug!(signers = count, quorum, "signer registry built"),
            Err(err) => {
                tracing::warn!(signers = count, quorum, "signer registry rejected: {}", err)
            }
        }
        result
    }

    fn build(quorum: usize, signers: Vec<Address>) -> Result<Self, RegistryError> {
        if signers.is_empty() {
            return Err(RegistryError::EmptySignerSet);
        }
        if signers.len() > MAX_SIGNERS {
            return Err(RegistryError::TooManySigners {
                count: signers.len(),
                max: MAX_SIGNERS,
            });
        }

        let mut members = HashSet::with_capacity(signers.len());
        for signer in &signers {
            if signer.is_zero() {
                return Err(RegistryError::ZeroAddressSigner);
            }
            if !members.insert(*signer) {
                return Err(RegistryError::DuplicateSigner(*signer));
            }
        }

        if quorum < MIN_QUORUM {
            return Err(RegistryError::ZeroQuorum { min: MIN_QUORUM });
        }
        if quorum > signers.len() {
            return Err(RegistryError::QuorumExceedsSigners {
                quorum,
                signers: signers.len(),
            });
        }

        Ok(Self {
            signers,
            members,
            quorum,
        })
    }

    /// Returns `true` if `identity` is one of the signers.
    pub fn is_valid_signer(&self, identity: &Address) -> bool {
        self.members.contains(identity)
    }

    /// Number of signers in the set.
    pub fn signer_count(&self) -> usize {
        self.signers.len()
    }

    /// Number of distinct approvals required to execute a transfer.
    pub fn quorum(&self) -> usize {
        self.quorum
    }

    /// Signers in construction order.
    pub fn signers(&self) -> &[Address] {
        &self.signers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signers(n: usize) -> Vec<Address> {
        (1..=n).map(|i| Address::derive(&format!("signer-{i}"))).collect()
    }

    #[test]
    fn valid_registry_answers_queries() {
        let set = signers(4);
        let registry = SignerRegistry::new(3, set.clone()).unwrap();

        assert_eq!(registry.quorum(), 3);
        assert_eq!(registry.signer_count(), 4);
        assert_eq!(registry.signers(), set.as_slice());
        for signer in &set {
            assert!(registry.is_valid_signer(signer));
        }
        assert!(!registry.is_valid_signer(&Address::derive("outsider")));
        assert!(!registry.is_valid_signer(&Address::ZERO));
    }

    #[test]
    fn quorum_equal_to_signer_count_is_allowed() {
        assert!(SignerRegistry::new(4, signers(4)).is_ok());
        assert!(SignerRegistry::new(1, signers(1)).is_ok());
    }

    #[test]
    fn empty_signer_set_rejected() {
        assert_eq!(
            SignerRegistry::new(1, vec![]).unwrap_err(),
            RegistryError::EmptySignerSet
        );
    }

    #[test]
    fn zero_quorum_rejected() {
        assert_eq!(
            SignerRegistry::new(0, signers(3)).unwrap_err(),
            RegistryError::ZeroQuorum { min: 1 }
        );
    }

    #[test]
    fn quorum_above_signer_count_rejected() {
        assert_eq!(
            SignerRegistry::new(5, signers(4)).unwrap_err(),
            RegistryError::QuorumExceedsSigners {
                quorum: 5,
                signers: 4
            }
        );
    }

    #[test]
    fn duplicate_signer_rejected() {
        let mut set = signers(3);
        set.push(set[1]);
        assert_eq!(
            SignerRegistry::new(2, set.clone()).unwrap_err(),
            RegistryError::DuplicateSigner(set[1])
        );
    }

    #[test]
    fn zero_address_signer_rejected() {
        let mut set = signers(2);
        set.push(Address::ZERO);
        assert_eq!(
            SignerRegistry::new(2, set).unwrap_err(),
            RegistryError::ZeroAddressSigner
        );
    }

    #[test]
    fn oversized_signer_set_rejected() {
        let err = SignerRegistry::new(1, signers(MAX_SIGNERS + 1)).unwrap_err();
        assert!(matches!(err, RegistryError::TooManySigners { .. }));
    }

    #[test]
    fn serializes_signers_and_quorum() {
        let registry = SignerRegistry::new(2, signers(2)).unwrap();
        let json = serde_json::to_value(&registry).unwrap();
        assert_eq!(json["quorum"], 2);
        assert_eq!(json["signers"].as_array().unwrap().len(), 2);
        assert!(json.get("members").is_none());
    }
}
