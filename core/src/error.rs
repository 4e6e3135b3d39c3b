use thiserror::Error;

/// Escrow-related errors.
///
/// Every variant is local to a single invocation: the record store is left
/// untouched whenever one of these is returned.
#[derive(Debug, Error, PartialEq)]
pub enum EscrowError {
    /// Operation called with the wrong number of arguments.
    #[error("wrong number of arguments: expected {expected}, got {got}")]
    ArgError { expected: usize, got: usize },

    /// Operation name is not part of the escrow interface.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Argument at `index` could not be decoded into the expected type.
    #[error("malformed argument at position {index}")]
    InvalidArgument { index: usize },

    /// Invocation carries no proof for the identity it claims to act as.
    #[error("sender is not authorized")]
    NotSender,

    /// No record stored under the given escrow id.
    #[error("unknown escrow id")]
    UnknownEscrow,

    /// Attempted an invalid state transition.
    #[error("invalid state transition")]
    InvalidState,

    /// Caller or recipient failed an identity-matching check.
    #[error("wrong user")]
    WrongUser,

    /// Time-lock has not elapsed yet.
    #[error("escrow not expired: height {height} < expiry {expiry}")]
    NotExpired { height: u64, expiry: u64 },

    /// A record already exists under the derived escrow id.
    #[error("escrow already registered")]
    DuplicateEscrow,

    /// Registration was invoked without a triggering transfer.
    #[error("registration requires a triggering transfer")]
    MissingTransfer,

    /// Triggering transfer deposits nothing into custody.
    #[error("deposit must be non-zero")]
    ZeroDeposit,

    /// Amount or height arithmetic overflowed.
    #[error("arithmetic overflow")]
    Overflow,

    /// Stored record bytes could not be encoded or decoded.
    #[error("record codec error: {0}")]
    Codec(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("identity error: {0}")]
    Identity(IdentityError),
}

impl EscrowError {
    /// Stable tag identifying the failure kind in notifications and logs.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ArgError { .. } => "ArgError",
            Self::InvalidOperation(_) => "InvalidOperation",
            Self::InvalidArgument { .. } => "InvalidArgument",
            Self::NotSender => "NotSender",
            Self::UnknownEscrow => "UnknownEscrow",
            Self::InvalidState => "InvalidState",
            Self::WrongUser => "WrongUser",
            Self::NotExpired { .. } => "NotExpired",
            Self::DuplicateEscrow => "DuplicateEscrow",
            Self::MissingTransfer => "MissingTransfer",
            Self::ZeroDeposit => "ZeroDeposit",
            Self::Overflow => "Overflow",
            Self::Codec(_) => "Codec",
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::Identity(_) => "Identity",
        }
    }
}

/// Errors that might occur while parsing an `Address` or a `PublicKey`.
#[derive(Debug, Error, PartialEq)]
pub enum IdentityError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("invalid base58: {0}")]
    Base58(#[from] bs58::decode::Error),

    #[error("cannot parse identity from empty string")]
    EmptyIdentity,

    #[error("expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("unsupported key scheme: {0}")]
    UnsupportedScheme(String),
}

/// Errors from witness signature verification.
#[derive(Debug, Error)]
pub enum WitnessError {
    /// Error decoding public key
    #[error("public key decoding error: {0}")]
    InvalidPublicKey(String),

    /// Error decoding signature
    #[error("signature decoding error: {0}")]
    InvalidSignature(String),

    /// Error verifying signature
    #[error("signature verification failed")]
    VerificationFailed,
}

impl From<IdentityError> for EscrowError {
    fn from(value: IdentityError) -> Self {
        Self::Identity(value)
    }
}

impl From<bincode::error::EncodeError> for EscrowError {
    fn from(value: bincode::error::EncodeError) -> Self {
        Self::Codec(value.to_string())
    }
}

impl From<bincode::error::DecodeError> for EscrowError {
    fn from(value: bincode::error::DecodeError) -> Self {
        Self::Codec(value.to_string())
    }
}
