//! Transition engine
//!
//! Applies the six marketplace operations. Each `apply_*` method runs
//! inside the single-writer actor, so the snapshot it validates against
//! cannot change before its commit: re-reading the listing status here is
//! what makes exactly one of two racing purchasers succeed.
//!
//! Every method either commits one atomic [`WriteSet`] (records + event in a
//! single batch) or returns an error having mutated nothing. The one
//! exception is a purchase against an expired listing, which commits the
//! Expired transition and then reports `ListingExpired`.

use crate::{
    clock::Clock,
    error::{Error, Result},
    events::MarketEvent,
    fees::{checked_accumulate, compute_sale_split},
    funds::{FundsCustody, TransferLeg},
    metrics::Metrics,
    storage::{Storage, WriteSet},
    types::{
        AccountId, Coordinates, LandParcel, Listing, ListingStatus, Marketplace, ParcelSize,
        Rarity,
    },
    validation,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Inputs for minting a parcel
#[derive(Debug, Clone)]
pub struct MintRequest {
    /// Initial owner
    pub owner: AccountId,
    /// Anchor coordinates
    pub coordinates: Coordinates,
    /// Footprint size
    pub size: ParcelSize,
    /// Rarity tier
    pub rarity: Rarity,
    /// Display name, <= 32 units
    pub name: String,
    /// Off-ledger metadata URI, <= 200 units
    pub metadata_uri: String,
}

/// Outcome of a successful purchase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleReceipt {
    /// Purchased parcel
    pub parcel_id: Uuid,
    /// Previous owner
    pub seller: AccountId,
    /// New owner
    pub buyer: AccountId,
    /// Sale price
    pub price: u64,
    /// Fee transferred to the treasury
    pub fee: u64,
    /// Amount transferred to the seller
    pub seller_amount: u64,
    /// Event log position of the ParcelSold event
    pub event_sequence: u64,
}

/// Serialized applier for marketplace transitions
pub struct TransitionEngine {
    storage: Arc<Storage>,
    funds: Arc<dyn FundsCustody>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
    min_price: u64,
}

impl TransitionEngine {
    /// Create an engine over the given collaborators
    pub fn new(
        storage: Arc<Storage>,
        funds: Arc<dyn FundsCustody>,
        clock: Arc<dyn Clock>,
        metrics: Metrics,
        min_price: u64,
    ) -> Self {
        Self {
            storage,
            funds,
            clock,
            metrics,
            min_price,
        }
    }

    /// Create the marketplace singleton with zeroed counters
    pub fn apply_initialize(
        &self,
        authority: AccountId,
        treasury: AccountId,
        fee_basis_points: u16,
    ) -> Result<Marketplace> {
        validation::validate_fee(fee_basis_points)?;
        if self.storage.marketplace_exists()? {
            return Err(Error::AlreadyInitialized);
        }

        let now = self.clock.now();
        let marketplace = Marketplace {
            authority: authority.clone(),
            treasury: treasury.clone(),
            fee_basis_points,
            total_volume: 0,
            active_listings: 0,
            total_parcels_minted: 0,
            created_at: now,
        };
        let event = MarketEvent::MarketplaceInitialized {
            authority,
            treasury,
            fee_basis_points,
            timestamp: now,
        };

        self.storage.commit(
            &WriteSet {
                marketplace: Some(marketplace.clone()),
                ..Default::default()
            },
            Some(&event),
        )?;

        tracing::info!(
            authority = %marketplace.authority,
            fee_basis_points,
            "Marketplace initialized"
        );
        Ok(marketplace)
    }

    /// Mint a new parcel and bump the marketplace mint counter
    pub fn apply_mint(&self, request: MintRequest) -> Result<LandParcel> {
        validation::validate_mint_inputs(request.coordinates, &request.name, &request.metadata_uri)?;

        let mut marketplace = self.storage.get_marketplace()?;
        marketplace.total_parcels_minted =
            checked_accumulate(marketplace.total_parcels_minted, 1)?;

        let now = self.clock.now();
        let parcel = LandParcel {
            asset_id: Uuid::now_v7(),
            owner: request.owner,
            coordinates: request.coordinates,
            size: request.size,
            rarity: request.rarity,
            name: request.name,
            metadata_uri: request.metadata_uri,
            created_at: now,
            is_listed: false,
            total_trades: 0,
            last_sale_price: 0,
        };
        let event = MarketEvent::LandParcelMinted {
            asset_id: parcel.asset_id,
            owner: parcel.owner.clone(),
            coordinates: parcel.coordinates,
            size: parcel.size,
            rarity: parcel.rarity,
            timestamp: now,
        };

        self.storage.commit(
            &WriteSet {
                marketplace: Some(marketplace),
                parcel: Some(parcel.clone()),
                ..Default::default()
            },
            Some(&event),
        )?;

        self.metrics.record_mint();
        tracing::info!(
            asset_id = %parcel.asset_id,
            owner = %parcel.owner,
            coordinates = %parcel.coordinates,
            "Parcel minted"
        );
        Ok(parcel)
    }

    /// List a parcel for sale
    pub fn apply_list(
        &self,
        seller: AccountId,
        parcel_id: Uuid,
        price: u64,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Listing> {
        let mut parcel = self.storage.get_parcel(parcel_id)?;
        let now = self.clock.now();
        validation::validate_listing(&parcel, &seller, price, self.min_price, expires_at, now)?;

        let mut marketplace = self.storage.get_marketplace()?;
        marketplace.active_listings = checked_accumulate(marketplace.active_listings, 1)?;
        parcel.is_listed = true;

        let listing = Listing {
            parcel_id,
            seller: seller.clone(),
            price,
            created_at: now,
            expires_at,
            status: ListingStatus::Active,
        };
        let event = MarketEvent::ParcelListed {
            asset_id: parcel_id,
            seller,
            price,
            expires_at,
            timestamp: now,
        };

        self.storage.commit(
            &WriteSet {
                marketplace: Some(marketplace),
                parcel: Some(parcel),
                listing: Some(listing.clone()),
            },
            Some(&event),
        )?;

        self.metrics.record_listing_opened();
        tracing::info!(asset_id = %parcel_id, price, "Parcel listed");
        Ok(listing)
    }

    /// Purchase a listed parcel: fund split, ownership transfer, stats
    pub fn apply_purchase(&self, buyer: AccountId, parcel_id: Uuid) -> Result<SaleReceipt> {
        let listing = self.storage.get_listing(parcel_id)?;
        let now = self.clock.now();

        if let Err(err) = validation::validate_purchase(&listing, now) {
            if matches!(err, Error::ListingExpired) {
                self.expire_listing(listing)?;
            }
            return Err(err);
        }

        let mut marketplace = self.storage.get_marketplace()?;
        let mut parcel = self.storage.get_parcel(parcel_id)?;
        let split = compute_sale_split(listing.price, marketplace.fee_basis_points)?;

        let balance = self.funds.balance_of(&buyer);
        if balance < listing.price {
            return Err(Error::InsufficientFunds {
                balance,
                required: listing.price,
            });
        }

        // Compute the complete post-state before moving anything.
        marketplace.total_volume = checked_accumulate(marketplace.total_volume, listing.price)?;
        marketplace.active_listings = marketplace
            .active_listings
            .checked_sub(1)
            .ok_or(Error::ArithmeticOverflow)?;
        let seller = listing.seller.clone();
        parcel.owner = buyer.clone();
        parcel.is_listed = false;
        parcel.total_trades = checked_accumulate(parcel.total_trades, 1)?;
        parcel.last_sale_price = listing.price;
        let mut sold = listing.clone();
        sold.status = ListingStatus::Sold;

        let legs = [
            TransferLeg {
                from: buyer.clone(),
                to: seller.clone(),
                amount: split.seller_amount,
            },
            TransferLeg {
                from: buyer.clone(),
                to: marketplace.treasury.clone(),
                amount: split.fee,
            },
        ];
        self.funds.transfer_multi(&legs)?;

        let event = MarketEvent::ParcelSold {
            asset_id: parcel_id,
            seller: seller.clone(),
            buyer: buyer.clone(),
            price: listing.price,
            fee: split.fee,
            seller_amount: split.seller_amount,
            timestamp: now,
        };
        let writes = WriteSet {
            marketplace: Some(marketplace),
            parcel: Some(parcel),
            listing: Some(sold),
        };
        let sequence = match self.storage.commit(&writes, Some(&event)) {
            Ok(sequence) => sequence,
            Err(commit_err) => {
                // The record batch failed after funds moved; reverse the legs
                // so the operation remains all-or-nothing.
                let reversal: Vec<TransferLeg> = legs
                    .iter()
                    .map(|leg| TransferLeg {
                        from: leg.to.clone(),
                        to: leg.from.clone(),
                        amount: leg.amount,
                    })
                    .collect();
                if let Err(reversal_err) = self.funds.transfer_multi(&reversal) {
                    tracing::error!(
                        error = %reversal_err,
                        "Failed to reverse fund transfer after commit failure"
                    );
                }
                return Err(commit_err);
            }
        };

        self.metrics.record_sale(listing.price);
        self.metrics.record_listing_closed();
        tracing::info!(
            asset_id = %parcel_id,
            buyer = %buyer,
            price = listing.price,
            fee = split.fee,
            "Parcel sold"
        );

        Ok(SaleReceipt {
            parcel_id,
            seller,
            buyer,
            price: listing.price,
            fee: split.fee,
            seller_amount: split.seller_amount,
            // Commit with an event always assigns a sequence.
            event_sequence: sequence.unwrap_or_default(),
        })
    }

    /// Cancel an Active listing
    pub fn apply_cancel(&self, caller: AccountId, parcel_id: Uuid) -> Result<()> {
        let listing = self.storage.get_listing(parcel_id)?;
        validation::validate_cancel(&listing, &caller)?;

        let mut marketplace = self.storage.get_marketplace()?;
        marketplace.active_listings = marketplace
            .active_listings
            .checked_sub(1)
            .ok_or(Error::ArithmeticOverflow)?;
        let mut parcel = self.storage.get_parcel(parcel_id)?;
        parcel.is_listed = false;
        let mut cancelled = listing.clone();
        cancelled.status = ListingStatus::Cancelled;

        let now = self.clock.now();
        let event = MarketEvent::ListingCancelled {
            asset_id: parcel_id,
            seller: listing.seller,
            timestamp: now,
        };

        self.storage.commit(
            &WriteSet {
                marketplace: Some(marketplace),
                parcel: Some(parcel),
                listing: Some(cancelled),
            },
            Some(&event),
        )?;

        self.metrics.record_listing_closed();
        tracing::info!(asset_id = %parcel_id, "Listing cancelled");
        Ok(())
    }

    /// Overwrite the marketplace fee
    pub fn apply_update_fee(
        &self,
        caller: AccountId,
        new_fee_basis_points: u16,
    ) -> Result<Marketplace> {
        let mut marketplace = self.storage.get_marketplace()?;
        validation::validate_fee_update(&marketplace, &caller, new_fee_basis_points)?;

        let old_fee_basis_points = marketplace.fee_basis_points;
        marketplace.fee_basis_points = new_fee_basis_points;

        let event = MarketEvent::MarketplaceFeeUpdated {
            authority: caller,
            old_fee_basis_points,
            new_fee_basis_points,
            timestamp: self.clock.now(),
        };

        self.storage.commit(
            &WriteSet {
                marketplace: Some(marketplace.clone()),
                ..Default::default()
            },
            Some(&event),
        )?;

        tracing::info!(old_fee_basis_points, new_fee_basis_points, "Fee updated");
        Ok(marketplace)
    }

    /// Metrics collector shared with the actor
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Transition an expired Active listing to Expired
    ///
    /// Committed without an event: the six event kinds accompany successful
    /// operations only, and this runs on the failure path of a purchase.
    fn expire_listing(&self, listing: Listing) -> Result<()> {
        let mut marketplace = self.storage.get_marketplace()?;
        marketplace.active_listings = marketplace
            .active_listings
            .checked_sub(1)
            .ok_or(Error::ArithmeticOverflow)?;
        let mut parcel = self.storage.get_parcel(listing.parcel_id)?;
        parcel.is_listed = false;
        let parcel_id = listing.parcel_id;
        let mut expired = listing;
        expired.status = ListingStatus::Expired;

        self.storage.commit(
            &WriteSet {
                marketplace: Some(marketplace),
                parcel: Some(parcel),
                listing: Some(expired),
            },
            None,
        )?;

        self.metrics.record_listing_closed();
        tracing::debug!(asset_id = %parcel_id, "Listing expired");
        Ok(())
    }
}
