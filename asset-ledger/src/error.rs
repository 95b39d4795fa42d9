//! Error types for the asset ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of record an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Asset (including wallets)
    Asset,
    /// Purchase order
    Order,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Asset => write!(f, "Asset"),
            RecordKind::Order => write!(f, "Order"),
        }
    }
}

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced asset, wallet or order is absent
    #[error("{kind} {id} does not exist")]
    NotFound {
        /// Record kind
        kind: RecordKind,
        /// Record ID
        id: String,
    },

    /// Create collided with an existing key
    #[error("{kind} {id} already exists")]
    AlreadyExists {
        /// Record kind
        kind: RecordKind,
        /// Record ID
        id: String,
    },

    /// Order has already been settled
    #[error("Order {0} is already confirmed")]
    AlreadyConfirmed(String),

    /// Wallet balance below the required price
    #[error("Insufficient funds in {wallet}: balance {balance}, required {required}")]
    InsufficientFunds {
        /// Wallet asset ID
        wallet: String,
        /// Balance at read time
        balance: rust_decimal::Decimal,
        /// Price that had to be covered
        required: rust_decimal::Decimal,
    },

    /// Caller principal does not match the required owner
    #[error("Caller {caller} is not authorized to act for {required}")]
    Unauthorized {
        /// Resolved caller principal
        caller: String,
        /// Principal the operation requires
        required: String,
    },

    /// Caller token does not parse into a principal
    #[error("Malformed caller identity: {0}")]
    MalformedIdentity(String),

    /// Value present under a key but not decodable as the expected record
    #[error("Corrupt {kind} record under {key}: {reason}")]
    Corrupt {
        /// Record kind
        kind: RecordKind,
        /// Storage key
        key: String,
        /// Decoder message
        reason: String,
    },

    /// Operation argument could not be decoded
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No handler registered under this name
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Operation table rejected at construction
    #[error("Registry error: {0}")]
    Registry(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn asset_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: RecordKind::Asset,
            id: id.into(),
        }
    }

    pub(crate) fn order_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: RecordKind::Order,
            id: id.into(),
        }
    }

    /// Stable machine-readable code returned alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { kind: RecordKind::Asset, .. } => "ASSET_NOT_FOUND",
            Error::NotFound { kind: RecordKind::Order, .. } => "ORDER_NOT_FOUND",
            Error::AlreadyExists { kind: RecordKind::Asset, .. } => "ASSET_ALREADY_EXISTS",
            Error::AlreadyExists { kind: RecordKind::Order, .. } => "ORDER_ALREADY_EXISTS",
            Error::AlreadyConfirmed(_) => "ORDER_ALREADY_CONFIRMED",
            Error::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Error::Unauthorized { .. } => "UNAUTHORIZED",
            Error::MalformedIdentity(_) => "MALFORMED_IDENTITY",
            Error::Corrupt { .. } => "CORRUPT_RECORD",
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::UnknownOperation(_) => "UNKNOWN_OPERATION",
            Error::Registry(_) => "REGISTRY",
            Error::Storage(_) => "STORAGE",
            Error::Serialization(_) => "SERIALIZATION",
            Error::Concurrency(_) => "CONCURRENCY",
            Error::Config(_) => "CONFIG",
            Error::Io(_) => "IO",
        }
    }

    /// Whether the error is an authorization failure
    ///
    /// A malformed identity never authorizes anything, so it counts too.
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, Error::Unauthorized { .. } | Error::MalformedIdentity(_))
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
