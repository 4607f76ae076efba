//! Main marketplace orchestration layer
//!
//! Ties together storage, the transition engine, and the single-writer
//! actor into a high-level API for the six marketplace operations.
//!
//! # Example
//!
//! ```no_run
//! use parcel_ledger::{AccountId, Config, InMemoryFunds, MarketLedger, SystemClock};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> parcel_ledger::Result<()> {
//!     let config = Config::default();
//!     let funds = Arc::new(InMemoryFunds::new());
//!     let ledger = MarketLedger::open(config, funds, Arc::new(SystemClock)).await?;
//!
//!     ledger
//!         .initialize_marketplace(
//!             AccountId::new("authority"),
//!             AccountId::new("treasury"),
//!             250,
//!         )
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_market_actor, MarketHandle},
    clock::Clock,
    engine::{MintRequest, SaleReceipt, TransitionEngine},
    events::SequencedEvent,
    funds::FundsCustody,
    metrics::Metrics,
    storage::Storage,
    types::{AccountId, LandParcel, Listing, ListingStatus, Marketplace},
    Config, Error, Result,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Main marketplace ledger interface
///
/// Mutations are serialized through the actor; reads go straight to storage.
pub struct MarketLedger {
    /// Actor handle for state transitions
    handle: MarketHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Metrics collector
    metrics: Metrics,
}

impl MarketLedger {
    /// Open the ledger with configuration and injected collaborators
    pub async fn open(
        config: Config,
        funds: Arc<dyn FundsCustody>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let storage = Arc::new(Storage::open(&config)?);
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to create metrics: {}", e)))?;

        let engine = TransitionEngine::new(
            storage.clone(),
            funds,
            clock,
            metrics.clone(),
            config.market.min_price,
        );
        let handle = spawn_market_actor(engine);

        Ok(Self {
            handle,
            storage,
            metrics,
        })
    }

    // State transitions

    /// Create the marketplace singleton
    pub async fn initialize_marketplace(
        &self,
        authority: AccountId,
        treasury: AccountId,
        fee_basis_points: u16,
    ) -> Result<Marketplace> {
        self.handle
            .initialize(authority, treasury, fee_basis_points)
            .await
    }

    /// Mint a new land parcel
    pub async fn mint_parcel(&self, request: MintRequest) -> Result<LandParcel> {
        self.handle.mint(request).await
    }

    /// List a parcel for sale
    pub async fn list_parcel(
        &self,
        seller: AccountId,
        parcel_id: Uuid,
        price: u64,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Listing> {
        self.handle.list(seller, parcel_id, price, expires_at).await
    }

    /// Purchase a listed parcel
    pub async fn purchase_parcel(&self, buyer: AccountId, parcel_id: Uuid) -> Result<SaleReceipt> {
        self.handle.purchase(buyer, parcel_id).await
    }

    /// Cancel an Active listing
    pub async fn cancel_listing(&self, caller: AccountId, parcel_id: Uuid) -> Result<()> {
        self.handle.cancel(caller, parcel_id).await
    }

    /// Update the marketplace fee
    pub async fn update_marketplace_fee(
        &self,
        caller: AccountId,
        new_fee_basis_points: u16,
    ) -> Result<Marketplace> {
        self.handle.update_fee(caller, new_fee_basis_points).await
    }

    // Reads

    /// Get the marketplace singleton
    pub fn marketplace(&self) -> Result<Marketplace> {
        self.storage.get_marketplace()
    }

    /// Get a parcel by asset ID
    pub fn parcel(&self, asset_id: Uuid) -> Result<LandParcel> {
        self.storage.get_parcel(asset_id)
    }

    /// Get the listing record for a parcel
    pub fn listing(&self, parcel_id: Uuid) -> Result<Listing> {
        self.storage.get_listing(parcel_id)
    }

    /// Get event by log sequence
    pub fn event(&self, sequence: u64) -> Result<SequencedEvent> {
        self.storage.get_event(sequence)
    }

    /// Get all events with sequence >= `from`, in application order
    pub fn events_since(&self, from: u64) -> Result<Vec<SequencedEvent>> {
        self.storage.events_since(from)
    }

    /// Number of events in the log
    pub fn event_count(&self) -> u64 {
        self.storage.event_count()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Verify the cross-record invariants against stored state
    ///
    /// Recomputes `active_listings` from the listing records and
    /// `total_volume` from the ParcelSold events, and compares both with the
    /// marketplace counters. Intended for tests and offline verification.
    pub fn check_invariants(&self) -> Result<bool> {
        let marketplace = self.storage.get_marketplace()?;

        if marketplace.fee_basis_points > crate::types::MAX_FEE_BPS {
            return Ok(false);
        }

        let active_count = self
            .storage
            .listings()?
            .iter()
            .filter(|listing| listing.status == ListingStatus::Active)
            .count() as u64;
        if active_count != marketplace.active_listings {
            return Ok(false);
        }

        let mut sold_volume: u64 = 0;
        for sequenced in self.storage.events_since(0)? {
            if let crate::events::MarketEvent::ParcelSold { price, .. } = sequenced.event {
                sold_volume = sold_volume
                    .checked_add(price)
                    .ok_or(Error::ArithmeticOverflow)?;
            }
        }
        Ok(sold_volume == marketplace.total_volume)
    }

    /// Shutdown ledger
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}
