//! Core record model for the marketplace ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact integer arithmetic (u64 for value amounts)
//! - Memory safety (no unsafe code)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum marketplace fee, in basis points (10%).
pub const MAX_FEE_BPS: u16 = 1_000;

/// Basis-point denominator (10_000 bps = 100%).
pub const FEE_DENOMINATOR: u64 = 10_000;

/// Minimum coordinate value on either axis.
pub const COORDINATE_MIN: i32 = -10_000;

/// Maximum coordinate value on either axis.
pub const COORDINATE_MAX: i32 = 10_000;

/// Maximum parcel name length.
pub const MAX_NAME_LEN: usize = 32;

/// Maximum metadata URI length.
pub const MAX_URI_LEN: usize = 200;

/// Participant identity (wallet address, account number, etc.)
///
/// Identities arrive pre-authenticated; the engine only compares them
/// for authorization (owner-only, seller-only, authority-only).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Grid coordinates of a parcel's anchor cell
///
/// Immutable after mint. Valid iff both axes lie in
/// [`COORDINATE_MIN`, `COORDINATE_MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    /// X axis
    pub x: i32,
    /// Y axis
    pub y: i32,
}

impl Coordinates {
    /// Create coordinates (unvalidated; see `validation::validate_mint_inputs`)
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Whether both axes are within the grid bounds
    pub fn in_bounds(&self) -> bool {
        (COORDINATE_MIN..=COORDINATE_MAX).contains(&self.x)
            && (COORDINATE_MIN..=COORDINATE_MAX).contains(&self.y)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Parcel footprint size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ParcelSize {
    /// 1x1 cell
    Small = 1,
    /// 2x2 cells
    Medium = 2,
    /// 4x4 cells
    Large = 3,
    /// 8x8 cells
    XLarge = 4,
}

impl ParcelSize {
    /// Side length of the square footprint, in cells
    ///
    /// Footprint overlap between parcels is not enforced by the engine;
    /// this is informational for callers that want to check it.
    pub fn cell_span(&self) -> u32 {
        match self {
            ParcelSize::Small => 1,
            ParcelSize::Medium => 2,
            ParcelSize::Large => 4,
            ParcelSize::XLarge => 8,
        }
    }
}

/// Parcel rarity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Rarity {
    /// Common tier
    Common = 1,
    /// Uncommon tier
    Uncommon = 2,
    /// Rare tier
    Rare = 3,
    /// Epic tier
    Epic = 4,
    /// Legendary tier
    Legendary = 5,
}

/// Marketplace singleton record
///
/// Created once by `initialize_marketplace`; counters mutated by
/// mint/list/purchase/cancel, fee by `update_fee`; never destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marketplace {
    /// Identity with exclusive right to administer the marketplace
    pub authority: AccountId,

    /// Destination identity for collected fees
    pub treasury: AccountId,

    /// Sale fee in basis points, always <= MAX_FEE_BPS
    pub fee_basis_points: u16,

    /// Accumulated sale value (monotonically non-decreasing)
    pub total_volume: u64,

    /// Count of currently Active listings
    pub active_listings: u64,

    /// Count of parcels ever minted (monotonically non-decreasing)
    pub total_parcels_minted: u64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Land parcel record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandParcel {
    /// Unique asset ID (UUIDv7 for time-ordering)
    pub asset_id: Uuid,

    /// Current owner
    pub owner: AccountId,

    /// Anchor cell coordinates (immutable after mint)
    pub coordinates: Coordinates,

    /// Footprint size
    pub size: ParcelSize,

    /// Rarity tier
    pub rarity: Rarity,

    /// Display name, <= MAX_NAME_LEN units
    pub name: String,

    /// Off-ledger metadata URI, <= MAX_URI_LEN units
    pub metadata_uri: String,

    /// Mint timestamp
    pub created_at: DateTime<Utc>,

    /// Whether an Active listing currently references this parcel
    pub is_listed: bool,

    /// Number of completed sales
    pub total_trades: u64,

    /// Price of the most recent sale (0 until first sale)
    pub last_sale_price: u64,
}

/// Listing record
///
/// At most one listing record exists per parcel at a time: the record key is
/// derived from the parcel id, and re-listing overwrites the prior terminal
/// listing at the same key. Listing history survives in the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Parcel being sold
    pub parcel_id: Uuid,

    /// Seller (parcel owner at listing time)
    pub seller: AccountId,

    /// Asking price, >= the configured minimum
    pub price: u64,

    /// Listing creation timestamp
    pub created_at: DateTime<Utc>,

    /// Optional expiry; absent = never expires
    pub expires_at: Option<DateTime<Utc>>,

    /// Current status
    pub status: ListingStatus,
}

impl Listing {
    /// Whether the expiry timestamp has passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expiry) if now > expiry)
    }

    /// Whether the listing is Active and unexpired at `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == ListingStatus::Active && !self.is_expired(now)
    }
}

/// Listing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ListingStatus {
    /// For sale (initial state)
    Active = 1,
    /// Purchased (terminal)
    Sold = 2,
    /// Cancelled by seller (terminal)
    Cancelled = 3,
    /// Expired before sale (terminal)
    Expired = 4,
}

impl ListingStatus {
    /// Whether no further transition is possible from this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ListingStatus::Sold | ListingStatus::Cancelled | ListingStatus::Expired
        )
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ListingStatus::Active => "Active",
            ListingStatus::Sold => "Sold",
            ListingStatus::Cancelled => "Cancelled",
            ListingStatus::Expired => "Expired",
        };
        write!(f, "{}", s)
    }
}
