//! Append-only event log entries
//!
//! One event is emitted per successful state transition, ordered by
//! application order. Events are a side effect for external observers,
//! never a source of truth for subsequent validation, and never retracted.

use crate::types::{AccountId, Coordinates, ParcelSize, Rarity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marketplace state-transition event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
    /// Marketplace singleton created
    MarketplaceInitialized {
        /// Administering identity
        authority: AccountId,
        /// Fee destination identity
        treasury: AccountId,
        /// Initial fee in basis points
        fee_basis_points: u16,
        /// Transition timestamp
        timestamp: DateTime<Utc>,
    },

    /// Land parcel minted
    LandParcelMinted {
        /// New parcel asset id
        asset_id: Uuid,
        /// Initial owner
        owner: AccountId,
        /// Anchor coordinates
        coordinates: Coordinates,
        /// Footprint size
        size: ParcelSize,
        /// Rarity tier
        rarity: Rarity,
        /// Transition timestamp
        timestamp: DateTime<Utc>,
    },

    /// Parcel listed for sale
    ParcelListed {
        /// Listed parcel
        asset_id: Uuid,
        /// Seller identity
        seller: AccountId,
        /// Asking price
        price: u64,
        /// Optional expiry
        expires_at: Option<DateTime<Utc>>,
        /// Transition timestamp
        timestamp: DateTime<Utc>,
    },

    /// Parcel purchased
    ParcelSold {
        /// Sold parcel
        asset_id: Uuid,
        /// Previous owner
        seller: AccountId,
        /// New owner
        buyer: AccountId,
        /// Sale price
        price: u64,
        /// Fee transferred to the treasury
        fee: u64,
        /// Amount transferred to the seller
        seller_amount: u64,
        /// Transition timestamp
        timestamp: DateTime<Utc>,
    },

    /// Listing cancelled by the seller
    ListingCancelled {
        /// Unlisted parcel
        asset_id: Uuid,
        /// Seller identity
        seller: AccountId,
        /// Transition timestamp
        timestamp: DateTime<Utc>,
    },

    /// Marketplace fee changed by the authority
    MarketplaceFeeUpdated {
        /// Administering identity
        authority: AccountId,
        /// Previous fee in basis points
        old_fee_basis_points: u16,
        /// New fee in basis points
        new_fee_basis_points: u16,
        /// Transition timestamp
        timestamp: DateTime<Utc>,
    },
}

impl MarketEvent {
    /// Event kind name, for logging and filtering
    pub fn kind(&self) -> &'static str {
        match self {
            MarketEvent::MarketplaceInitialized { .. } => "MarketplaceInitialized",
            MarketEvent::LandParcelMinted { .. } => "LandParcelMinted",
            MarketEvent::ParcelListed { .. } => "ParcelListed",
            MarketEvent::ParcelSold { .. } => "ParcelSold",
            MarketEvent::ListingCancelled { .. } => "ListingCancelled",
            MarketEvent::MarketplaceFeeUpdated { .. } => "MarketplaceFeeUpdated",
        }
    }

    /// JSON export for external observers
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Event as stored, with its log position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedEvent {
    /// Position in the append-only log (assigned at commit, starts at 0)
    pub sequence: u64,

    /// The event payload
    pub event: MarketEvent,
}
