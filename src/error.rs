//! Error types for the marketplace ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Marketplace ledger errors
///
/// Validation errors report a violated precondition; resource errors report
/// funds or arithmetic limits; not-found errors report an absent record.
/// Every error is returned synchronously with no partial state mutation.
#[derive(Error, Debug)]
pub enum Error {
    /// Fee exceeds the maximum basis points
    #[error("Fee too high: {0} bps exceeds maximum of 1000")]
    FeeTooHigh(u16),

    /// Marketplace record already exists at the singleton key
    #[error("Marketplace already initialized")]
    AlreadyInitialized,

    /// Coordinate axis outside the grid bounds
    #[error("Invalid coordinates {0}: each axis must be within [-10000, 10000]")]
    InvalidCoordinates(crate::types::Coordinates),

    /// Parcel name exceeds the length limit
    #[error("Name too long: {0} units exceeds maximum of 32")]
    NameTooLong(usize),

    /// Metadata URI exceeds the length limit
    #[error("URI too long: {0} units exceeds maximum of 200")]
    UriTooLong(usize),

    /// Caller is not the parcel owner
    #[error("Account {0} is not the parcel owner")]
    NotParcelOwner(crate::types::AccountId),

    /// Asking price below the configured minimum
    #[error("Price too low: {price} is below minimum of {min_price}")]
    PriceTooLow {
        /// Submitted price
        price: u64,
        /// Configured minimum
        min_price: u64,
    },

    /// Parcel already has an Active listing
    #[error("Parcel is already listed")]
    AlreadyListed,

    /// Expiry timestamp not strictly in the future
    #[error("Invalid expiry: timestamp must be strictly in the future")]
    InvalidExpiry,

    /// Listing is not in Active status
    #[error("Listing is not active")]
    ListingNotActive,

    /// Listing expiry has passed
    #[error("Listing has expired")]
    ListingExpired,

    /// Caller is not the listing seller
    #[error("Account {0} is not the listing seller")]
    NotSeller(crate::types::AccountId),

    /// Caller is not the marketplace authority
    #[error("Account {0} is not the marketplace authority")]
    NotMarketplaceAuthority(crate::types::AccountId),

    /// Buyer balance below the listing price
    #[error("Insufficient funds: balance {balance} is below required {required}")]
    InsufficientFunds {
        /// Available balance
        balance: u64,
        /// Required amount
        required: u64,
    },

    /// Checked arithmetic overflowed the integer width
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    /// Marketplace record absent at the singleton key
    #[error("Marketplace not initialized")]
    MarketplaceNotFound,

    /// Parcel record absent at the expected key
    #[error("Parcel not found: {0}")]
    ParcelNotFound(uuid::Uuid),

    /// Listing record absent at the expected key
    #[error("Listing not found for parcel: {0}")]
    ListingNotFound(uuid::Uuid),

    /// Event record absent at the expected sequence
    #[error("Event not found at sequence: {0}")]
    EventNotFound(u64),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

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

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// Whether this error reports a violated caller precondition
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::FeeTooHigh(_)
                | Error::AlreadyInitialized
                | Error::InvalidCoordinates(_)
                | Error::NameTooLong(_)
                | Error::UriTooLong(_)
                | Error::NotParcelOwner(_)
                | Error::PriceTooLow { .. }
                | Error::AlreadyListed
                | Error::InvalidExpiry
                | Error::ListingNotActive
                | Error::ListingExpired
                | Error::NotSeller(_)
                | Error::NotMarketplaceAuthority(_)
        )
    }
}
