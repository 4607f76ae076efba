//! Parcel marketplace ledger
//!
//! Deterministic state machine over three record kinds (Marketplace,
//! LandParcel, Listing) with six atomic operations, an overflow-checked
//! basis-point fee split, and an append-only event log.
//!
//! # Architecture
//!
//! - **Single Writer**: all transitions flow through one actor task, so no
//!   operation observes a partially-applied sibling
//! - **Atomic Commit**: each operation's record mutations and event land in
//!   one storage batch, all-or-nothing
//! - **Injected Collaborators**: funds custody and the clock are traits,
//!   passed in rather than read globally
//!
//! # Invariants
//!
//! - `fee_basis_points` never exceeds 1000
//! - `active_listings` equals the count of Active listing records
//! - `total_volume` equals the sum of prices over Sold listings
//! - Ownership transfer and fund split happen together or not at all

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod actor;
pub mod address;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod fees;
pub mod funds;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod types;
pub mod validation;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use engine::{MintRequest, SaleReceipt};
pub use error::{Error, Result};
pub use events::{MarketEvent, SequencedEvent};
pub use fees::{compute_sale_split, SaleSplit};
pub use funds::{FundsCustody, InMemoryFunds, TransferLeg};
pub use ledger::MarketLedger;
pub use types::{
    AccountId, Coordinates, LandParcel, Listing, ListingStatus, Marketplace, ParcelSize, Rarity,
};
