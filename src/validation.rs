//! Pure precondition checks
//!
//! Every function here inspects inputs and record snapshots without mutating
//! anything; the transition engine calls them inside its serialized apply
//! section so the snapshot cannot change between check and mutation.

use crate::error::{Error, Result};
use crate::types::{
    AccountId, Coordinates, LandParcel, Listing, ListingStatus, Marketplace, MAX_FEE_BPS,
    MAX_NAME_LEN, MAX_URI_LEN,
};
use chrono::{DateTime, Utc};

/// Check a fee value against the basis-point cap
pub fn validate_fee(fee_basis_points: u16) -> Result<()> {
    if fee_basis_points > MAX_FEE_BPS {
        return Err(Error::FeeTooHigh(fee_basis_points));
    }
    Ok(())
}

/// Check mint inputs: coordinate bounds and string length limits
pub fn validate_mint_inputs(coordinates: Coordinates, name: &str, metadata_uri: &str) -> Result<()> {
    if !coordinates.in_bounds() {
        return Err(Error::InvalidCoordinates(coordinates));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::NameTooLong(name.chars().count()));
    }
    if metadata_uri.chars().count() > MAX_URI_LEN {
        return Err(Error::UriTooLong(metadata_uri.chars().count()));
    }
    Ok(())
}

/// Check list-for-sale preconditions against the parcel snapshot
pub fn validate_listing(
    parcel: &LandParcel,
    seller: &AccountId,
    price: u64,
    min_price: u64,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<()> {
    if &parcel.owner != seller {
        return Err(Error::NotParcelOwner(seller.clone()));
    }
    if price < min_price {
        return Err(Error::PriceTooLow { price, min_price });
    }
    if parcel.is_listed {
        return Err(Error::AlreadyListed);
    }
    if let Some(expiry) = expires_at {
        if expiry <= now {
            return Err(Error::InvalidExpiry);
        }
    }
    Ok(())
}

/// Check purchase preconditions against the listing snapshot
///
/// Distinguishes an expired Active listing (`ListingExpired`, which the
/// engine turns into the Expired transition) from any terminal status
/// (`ListingNotActive`).
pub fn validate_purchase(listing: &Listing, now: DateTime<Utc>) -> Result<()> {
    if listing.status != ListingStatus::Active {
        return Err(Error::ListingNotActive);
    }
    if listing.is_expired(now) {
        return Err(Error::ListingExpired);
    }
    Ok(())
}

/// Check cancel preconditions against the listing snapshot
pub fn validate_cancel(listing: &Listing, caller: &AccountId) -> Result<()> {
    if &listing.seller != caller {
        return Err(Error::NotSeller(caller.clone()));
    }
    if listing.status != ListingStatus::Active {
        return Err(Error::ListingNotActive);
    }
    Ok(())
}

/// Check fee-update preconditions against the marketplace snapshot
pub fn validate_fee_update(
    marketplace: &Marketplace,
    caller: &AccountId,
    new_fee_basis_points: u16,
) -> Result<()> {
    if &marketplace.authority != caller {
        return Err(Error::NotMarketplaceAuthority(caller.clone()));
    }
    validate_fee(new_fee_basis_points)
}
