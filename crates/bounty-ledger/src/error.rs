use crate::types::{AccountAddress, TokenAmount};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Prize amount must be greater than zero")]
    InvalidPrizeAmount,

    #[error("Description hash is too long: {len} bytes (max {max})")]
    DescriptionHashTooLong { len: usize, max: usize },

    #[error("Submission hash is too long: {len} bytes (max {max})")]
    SubmissionHashTooLong { len: usize, max: usize },

    #[error("Only the escrow's funder may select a winner")]
    UnauthorizedCaller,

    #[error("Escrow has already been settled")]
    AlreadySettled,

    #[error("Treasury has already been initialized")]
    AlreadyInitialized,

    #[error("Record already exists at {0}")]
    AlreadyExists(AccountAddress),

    #[error("No record found at {0}")]
    NotFound(AccountAddress),

    #[error("Escrow has expired without a winner")]
    Expired,

    #[error("Escrow has not reached its expiry timestamp yet")]
    NotExpired,

    #[error("Expired escrow has already been reclaimed")]
    AlreadyReclaimed,

    #[error("Insufficient funds for {address}: has {available}, needs {needed}")]
    InsufficientFunds {
        address: AccountAddress,
        needed: TokenAmount,
        available: TokenAmount,
    },

    #[error("Arithmetic overflow")]
    MathOverflow,

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
