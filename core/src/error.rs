use thiserror::Error;

/// Escrow-related errors.
///
/// Every variant is a rejected attempt: the record and vault
/// are left exactly as they were before the call.
#[derive(Debug, Error, PartialEq)]
pub enum EscrowError {
    /// Caller does not hold the role required for the transition.
    #[error("caller is not authorized for this transition")]
    Unauthorized,

    /// Revoke on a role with no active confirmation.
    #[error("no confirmation exists to revoke")]
    NotConfirmed,

    /// Revoke attempted at or after the deadline.
    #[error("revocation period has expired")]
    RevocationPeriodExpired,

    /// Transition not permitted from the current status.
    #[error("escrow is not in a state that permits this transition")]
    InvalidEscrowState,

    /// Non-positive deposit at creation.
    #[error("amount must be non-zero")]
    InvalidAmount,

    /// Deadline not strictly in the future at creation.
    #[error("deadline {deadline} is not after current time {now}")]
    InvalidDeadline { deadline: i64, now: i64 },

    /// Stored fields do not re-derive to the instance under operation.
    #[error("record does not derive to instance {0}")]
    AddressMismatch(String),

    /// No nonce in the search range produced a valid instance id.
    #[error("no valid instance id for the given parties")]
    AddressExhausted,

    /// A record already exists at the derived id.
    #[error("escrow {0} already exists")]
    AlreadyExists(String),

    /// Params were written for a book deriving under another tag.
    #[error("params tag {0:?} does not match the book's addressing tag")]
    TagMismatch(String),

    /// No record stored under the given id.
    #[error("escrow {0} not found")]
    NotFound(String),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("custody error: {0}")]
    Custody(#[from] CustodyError),

    #[error("record encoding error: {0}")]
    Encoding(String),
}

/// Errors that might occur while parsing into an `Identity`.
#[derive(Debug, Error, PartialEq)]
pub enum IdentityError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("invalid base58: {0}")]
    Base58(#[from] bs58::decode::Error),

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("cannot parse identity from empty string")]
    EmptyIdentity,

    #[error("expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Errors from the authentication collaborator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("identity is not a valid public key")]
    InvalidPublicKey,

    #[error("malformed signature")]
    MalformedSignature,

    #[error("signature verification failed")]
    VerificationFailed,
}

/// Errors from the asset-custody collaborator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CustodyError {
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    #[error("vault {0} is already open")]
    VaultExists(String),

    #[error("vault {0} is not open")]
    VaultClosed(String),

    #[error("payout of {requested} must drain the full balance {balance}")]
    PartialPayout { requested: u64, balance: u64 },

    #[error("balance overflow")]
    Overflow,
}

impl From<bincode::error::EncodeError> for EscrowError {
    fn from(value: bincode::error::EncodeError) -> Self {
        Self::Encoding(value.to_string())
    }
}

impl From<bincode::error::DecodeError> for EscrowError {
    fn from(value: bincode::error::DecodeError) -> Self {
        Self::Encoding(value.to_string())
    }
}
