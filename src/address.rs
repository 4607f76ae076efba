//! Deterministic record addressing
//!
//! Record locations are pure functions of a fixed seed string plus the
//! record's identifiers, hashed with BLAKE3. The same (seed, ids) pair
//! always maps to the same 32-byte key, independent of any chain-specific
//! derivation scheme.

use std::fmt;
use uuid::Uuid;

/// Seed for the marketplace singleton key
const SEED_MARKETPLACE: &str = "marketplace";

/// Seed for parcel record keys
const SEED_PARCEL: &str = "parcel";

/// Seed for listing record keys
const SEED_LISTING: &str = "listing";

/// 32-byte deterministic record key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey([u8; 32]);

impl RecordKey {
    /// Key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Derive a record key from a seed and identifier parts
///
/// Each part is hashed length-prefixed so distinct identifier splits cannot
/// collide.
pub fn derive_key(seed: &str, parts: &[&[u8]]) -> RecordKey {
    let mut hasher = blake3::Hasher::new();
    hasher.update(seed.as_bytes());
    for part in parts {
        hasher.update(&(part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    RecordKey(*hasher.finalize().as_bytes())
}

/// Key of the marketplace singleton record
pub fn marketplace_key() -> RecordKey {
    derive_key(SEED_MARKETPLACE, &[])
}

/// Key of a parcel record
pub fn parcel_key(asset_id: Uuid) -> RecordKey {
    derive_key(SEED_PARCEL, &[asset_id.as_bytes()])
}

/// Key of the listing record for a parcel
///
/// Derived solely from the parcel id, so at most one listing record exists
/// per parcel; a re-listing overwrites the prior terminal listing.
pub fn listing_key(parcel_id: Uuid) -> RecordKey {
    derive_key(SEED_LISTING, &[parcel_id.as_bytes()])
}
