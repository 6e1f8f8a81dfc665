//! Error types for the ledger node.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainError {
    InsufficientFunds,
    ReservedSender,
    InvalidSignature,
    WalletMissing,
    InvalidProofOfWork,
    InvalidBlockLinkage,
    StaleTip,
    Interrupted,
    InvalidChain,
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::InsufficientFunds => write!(f, "sender balance does not cover the amount"),
            ChainError::ReservedSender => write!(f, "sender name is reserved for mining rewards"),
            ChainError::InvalidSignature => write!(f, "transaction signature verification failed"),
            ChainError::WalletMissing => write!(f, "no wallet is configured"),
            ChainError::InvalidProofOfWork => write!(f, "proof of work is invalid"),
            ChainError::InvalidBlockLinkage => {
                write!(f, "previous hash does not match the local tip")
            }
            ChainError::StaleTip => write!(f, "chain tip changed since the mining snapshot"),
            ChainError::Interrupted => write!(f, "mining was interrupted"),
            ChainError::InvalidChain => write!(f, "chain failed validation"),
        }
    }
}

impl std::error::Error for ChainError {}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
