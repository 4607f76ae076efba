//! End-to-end tests for the six marketplace operations
//!
//! Each test opens a fresh ledger over a temp directory with a manual clock
//! and an in-process funds ledger, then drives the public API.

use chrono::{Duration, Utc};
use parcel_ledger::{
    AccountId, Clock, Config, Coordinates, Error, FundsCustody, InMemoryFunds, ListingStatus,
    ManualClock, MarketEvent, MarketLedger, MintRequest, ParcelSize, Rarity,
};
use std::sync::Arc;
use tempfile::TempDir;

const MIN_PRICE: u64 = 1_000;

struct TestBed {
    ledger: MarketLedger,
    funds: Arc<InMemoryFunds>,
    clock: Arc<ManualClock>,
    _temp: TempDir,
}

async fn test_bed() -> TestBed {
    let temp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.data_dir = temp.path().to_path_buf();
    config.market.min_price = MIN_PRICE;

    let funds = Arc::new(InMemoryFunds::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let ledger = MarketLedger::open(config, funds.clone(), clock.clone())
        .await
        .unwrap();

    TestBed {
        ledger,
        funds,
        clock,
        _temp: temp,
    }
}

fn account(name: &str) -> AccountId {
    AccountId::new(name)
}

fn mint_request(owner: &str) -> MintRequest {
    MintRequest {
        owner: account(owner),
        coordinates: Coordinates::new(100, 200),
        size: ParcelSize::Small,
        rarity: Rarity::Common,
        name: "Genesis Plot".to_string(),
        metadata_uri: "ipfs://QmParcelMetadata".to_string(),
    }
}

#[tokio::test]
async fn test_reference_sale_scenario() {
    let bed = test_bed().await;
    let (authority, treasury) = (account("authority"), account("treasury"));
    let (seller, buyer) = (account("seller"), account("buyer"));

    bed.ledger
        .initialize_marketplace(authority, treasury.clone(), 250)
        .await
        .unwrap();

    let parcel = bed.ledger.mint_parcel(mint_request("seller")).await.unwrap();
    assert_eq!(parcel.coordinates, Coordinates::new(100, 200));

    let price = 1_000_000_000u64;
    let expiry = bed.clock.now() + Duration::days(30);
    bed.ledger
        .list_parcel(seller.clone(), parcel.asset_id, price, Some(expiry))
        .await
        .unwrap();

    bed.funds.deposit(&buyer, price).unwrap();
    let receipt = bed
        .ledger
        .purchase_parcel(buyer.clone(), parcel.asset_id)
        .await
        .unwrap();

    assert_eq!(receipt.fee, 25_000_000);
    assert_eq!(receipt.seller_amount, 975_000_000);
    assert_eq!(bed.funds.balance_of(&treasury), 25_000_000);
    assert_eq!(bed.funds.balance_of(&seller), 975_000_000);
    assert_eq!(bed.funds.balance_of(&buyer), 0);

    let marketplace = bed.ledger.marketplace().unwrap();
    assert_eq!(marketplace.total_volume, 1_000_000_000);
    assert_eq!(marketplace.active_listings, 0);
    assert_eq!(marketplace.total_parcels_minted, 1);

    let parcel = bed.ledger.parcel(parcel.asset_id).unwrap();
    assert_eq!(parcel.owner, buyer);
    assert!(!parcel.is_listed);
    assert_eq!(parcel.total_trades, 1);
    assert_eq!(parcel.last_sale_price, price);

    let listing = bed.ledger.listing(parcel.asset_id).unwrap();
    assert_eq!(listing.status, ListingStatus::Sold);

    // Event log carries the whole history in order.
    let events = bed.ledger.events_since(0).unwrap();
    let kinds: Vec<&str> = events.iter().map(|e| e.event.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            "MarketplaceInitialized",
            "LandParcelMinted",
            "ParcelListed",
            "ParcelSold"
        ]
    );

    assert!(bed.ledger.check_invariants().unwrap());
    bed.ledger.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_initialize_rejects_high_fee_and_reinit() {
    let bed = test_bed().await;

    let err = bed
        .ledger
        .initialize_marketplace(account("authority"), account("treasury"), 1_001)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FeeTooHigh(1_001)));
    assert!(matches!(
        bed.ledger.marketplace(),
        Err(Error::MarketplaceNotFound)
    ));

    bed.ledger
        .initialize_marketplace(account("authority"), account("treasury"), 1_000)
        .await
        .unwrap();

    let err = bed
        .ledger
        .initialize_marketplace(account("other"), account("other"), 100)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyInitialized));

    // First initialization untouched.
    let marketplace = bed.ledger.marketplace().unwrap();
    assert_eq!(marketplace.authority, account("authority"));
    assert_eq!(marketplace.fee_basis_points, 1_000);
}

#[tokio::test]
async fn test_mint_requires_marketplace_and_valid_inputs() {
    let bed = test_bed().await;

    let err = bed.ledger.mint_parcel(mint_request("owner")).await.unwrap_err();
    assert!(matches!(err, Error::MarketplaceNotFound));

    bed.ledger
        .initialize_marketplace(account("authority"), account("treasury"), 250)
        .await
        .unwrap();

    // Exact boundary coordinates succeed.
    let mut request = mint_request("owner");
    request.coordinates = Coordinates::new(-10_000, 10_000);
    bed.ledger.mint_parcel(request).await.unwrap();

    // Out-of-bounds fails and leaves the mint counter unchanged.
    let mut request = mint_request("owner");
    request.coordinates = Coordinates::new(10_001, 0);
    let err = bed.ledger.mint_parcel(request).await.unwrap_err();
    assert!(matches!(err, Error::InvalidCoordinates(_)));

    let mut request = mint_request("owner");
    request.name = "x".repeat(33);
    let err = bed.ledger.mint_parcel(request).await.unwrap_err();
    assert!(matches!(err, Error::NameTooLong(33)));

    let mut request = mint_request("owner");
    request.metadata_uri = "u".repeat(201);
    let err = bed.ledger.mint_parcel(request).await.unwrap_err();
    assert!(matches!(err, Error::UriTooLong(201)));

    assert_eq!(bed.ledger.marketplace().unwrap().total_parcels_minted, 1);
}

#[tokio::test]
async fn test_listing_preconditions_and_counter() {
    let bed = test_bed().await;
    bed.ledger
        .initialize_marketplace(account("authority"), account("treasury"), 250)
        .await
        .unwrap();
    let parcel = bed.ledger.mint_parcel(mint_request("seller")).await.unwrap();

    let err = bed
        .ledger
        .list_parcel(account("stranger"), parcel.asset_id, MIN_PRICE, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotParcelOwner(_)));

    let err = bed
        .ledger
        .list_parcel(account("seller"), parcel.asset_id, MIN_PRICE - 1, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PriceTooLow { .. }));

    let err = bed
        .ledger
        .list_parcel(
            account("seller"),
            parcel.asset_id,
            MIN_PRICE,
            Some(bed.clock.now() - Duration::seconds(1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidExpiry));

    assert_eq!(bed.ledger.marketplace().unwrap().active_listings, 0);

    bed.ledger
        .list_parcel(account("seller"), parcel.asset_id, MIN_PRICE, None)
        .await
        .unwrap();
    assert!(bed.ledger.parcel(parcel.asset_id).unwrap().is_listed);
    assert_eq!(bed.ledger.marketplace().unwrap().active_listings, 1);

    let err = bed
        .ledger
        .list_parcel(account("seller"), parcel.asset_id, MIN_PRICE, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyListed));
    assert_eq!(bed.ledger.marketplace().unwrap().active_listings, 1);
}

#[tokio::test]
async fn test_purchase_expired_listing_flips_status_and_moves_no_funds() {
    let bed = test_bed().await;
    bed.ledger
        .initialize_marketplace(account("authority"), account("treasury"), 250)
        .await
        .unwrap();
    let parcel = bed.ledger.mint_parcel(mint_request("seller")).await.unwrap();
    bed.ledger
        .list_parcel(
            account("seller"),
            parcel.asset_id,
            MIN_PRICE,
            Some(bed.clock.now() + Duration::hours(1)),
        )
        .await
        .unwrap();

    let buyer = account("buyer");
    bed.funds.deposit(&buyer, MIN_PRICE).unwrap();
    bed.clock.advance(Duration::hours(2));

    let err = bed
        .ledger
        .purchase_parcel(buyer.clone(), parcel.asset_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ListingExpired));

    // Expiry side effect: listing terminal, parcel unlisted, gauge down.
    assert_eq!(
        bed.ledger.listing(parcel.asset_id).unwrap().status,
        ListingStatus::Expired
    );
    assert!(!bed.ledger.parcel(parcel.asset_id).unwrap().is_listed);
    assert_eq!(bed.ledger.marketplace().unwrap().active_listings, 0);

    // No funds or ownership moved.
    assert_eq!(bed.funds.balance_of(&buyer), MIN_PRICE);
    assert_eq!(bed.ledger.parcel(parcel.asset_id).unwrap().owner, account("seller"));

    // A retry now sees a terminal listing.
    let err = bed
        .ledger
        .purchase_parcel(buyer, parcel.asset_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ListingNotActive));

    assert!(bed.ledger.check_invariants().unwrap());
}

#[tokio::test]
async fn test_purchase_insufficient_funds_leaves_listing_active() {
    let bed = test_bed().await;
    bed.ledger
        .initialize_marketplace(account("authority"), account("treasury"), 250)
        .await
        .unwrap();
    let parcel = bed.ledger.mint_parcel(mint_request("seller")).await.unwrap();
    bed.ledger
        .list_parcel(account("seller"), parcel.asset_id, 10_000, None)
        .await
        .unwrap();

    let buyer = account("buyer");
    bed.funds.deposit(&buyer, 9_999).unwrap();

    let err = bed
        .ledger
        .purchase_parcel(buyer.clone(), parcel.asset_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientFunds {
            balance: 9_999,
            required: 10_000
        }
    ));

    assert_eq!(
        bed.ledger.listing(parcel.asset_id).unwrap().status,
        ListingStatus::Active
    );
    assert_eq!(bed.funds.balance_of(&buyer), 9_999);
    assert_eq!(bed.ledger.marketplace().unwrap().total_volume, 0);

    // Funding the wallet and resubmitting succeeds.
    bed.funds.deposit(&buyer, 1).unwrap();
    bed.ledger
        .purchase_parcel(buyer, parcel.asset_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancel_and_relist_reuses_listing_record() {
    let bed = test_bed().await;
    bed.ledger
        .initialize_marketplace(account("authority"), account("treasury"), 250)
        .await
        .unwrap();
    let parcel = bed.ledger.mint_parcel(mint_request("seller")).await.unwrap();
    bed.ledger
        .list_parcel(account("seller"), parcel.asset_id, MIN_PRICE, None)
        .await
        .unwrap();

    let err = bed
        .ledger
        .cancel_listing(account("stranger"), parcel.asset_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotSeller(_)));

    bed.ledger
        .cancel_listing(account("seller"), parcel.asset_id)
        .await
        .unwrap();
    assert_eq!(
        bed.ledger.listing(parcel.asset_id).unwrap().status,
        ListingStatus::Cancelled
    );
    assert!(!bed.ledger.parcel(parcel.asset_id).unwrap().is_listed);
    assert_eq!(bed.ledger.marketplace().unwrap().active_listings, 0);

    let err = bed
        .ledger
        .cancel_listing(account("seller"), parcel.asset_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ListingNotActive));

    // Re-listing overwrites the terminal record at the same key.
    bed.ledger
        .list_parcel(account("seller"), parcel.asset_id, MIN_PRICE * 2, None)
        .await
        .unwrap();
    let listing = bed.ledger.listing(parcel.asset_id).unwrap();
    assert_eq!(listing.status, ListingStatus::Active);
    assert_eq!(listing.price, MIN_PRICE * 2);

    assert!(bed.ledger.check_invariants().unwrap());
}

#[tokio::test]
async fn test_fee_update_is_authority_only_and_applies_to_later_sales() {
    let bed = test_bed().await;
    bed.ledger
        .initialize_marketplace(account("authority"), account("treasury"), 250)
        .await
        .unwrap();

    let err = bed
        .ledger
        .update_marketplace_fee(account("stranger"), 500)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotMarketplaceAuthority(_)));
    assert_eq!(bed.ledger.marketplace().unwrap().fee_basis_points, 250);

    let err = bed
        .ledger
        .update_marketplace_fee(account("authority"), 1_001)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FeeTooHigh(1_001)));

    bed.ledger
        .update_marketplace_fee(account("authority"), 500)
        .await
        .unwrap();
    assert_eq!(bed.ledger.marketplace().unwrap().fee_basis_points, 500);

    // A sale after the update uses the new rate.
    let parcel = bed.ledger.mint_parcel(mint_request("seller")).await.unwrap();
    bed.ledger
        .list_parcel(account("seller"), parcel.asset_id, 10_000, None)
        .await
        .unwrap();
    let buyer = account("buyer");
    bed.funds.deposit(&buyer, 10_000).unwrap();
    let receipt = bed
        .ledger
        .purchase_parcel(buyer, parcel.asset_id)
        .await
        .unwrap();
    assert_eq!(receipt.fee, 500);
    assert_eq!(receipt.seller_amount, 9_500);
}

#[tokio::test]
async fn test_exactly_one_racing_buyer_wins() {
    let bed = test_bed().await;
    bed.ledger
        .initialize_marketplace(account("authority"), account("treasury"), 250)
        .await
        .unwrap();
    let parcel = bed.ledger.mint_parcel(mint_request("seller")).await.unwrap();
    bed.ledger
        .list_parcel(account("seller"), parcel.asset_id, 10_000, None)
        .await
        .unwrap();

    let alice = account("alice");
    let bob = account("bob");
    bed.funds.deposit(&alice, 10_000).unwrap();
    bed.funds.deposit(&bob, 10_000).unwrap();

    let (first, second) = tokio::join!(
        bed.ledger.purchase_parcel(alice.clone(), parcel.asset_id),
        bed.ledger.purchase_parcel(bob.clone(), parcel.asset_id),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let loser_err = outcomes.iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(
        loser_err.as_ref().unwrap_err(),
        Error::ListingNotActive
    ));

    // Exactly one buyer paid; the winner owns the parcel.
    let winner = &outcomes.iter().find(|r| r.is_ok()).unwrap().as_ref().unwrap().buyer;
    assert_eq!(bed.ledger.parcel(parcel.asset_id).unwrap().owner, *winner);
    let paid = [&alice, &bob]
        .iter()
        .filter(|a| bed.funds.balance_of(a) == 0)
        .count();
    assert_eq!(paid, 1);
    assert_eq!(bed.ledger.marketplace().unwrap().total_volume, 10_000);

    assert!(bed.ledger.check_invariants().unwrap());
}

#[tokio::test]
async fn test_seller_may_buy_own_listing() {
    let bed = test_bed().await;
    bed.ledger
        .initialize_marketplace(account("authority"), account("treasury"), 250)
        .await
        .unwrap();
    let parcel = bed.ledger.mint_parcel(mint_request("seller")).await.unwrap();
    bed.ledger
        .list_parcel(account("seller"), parcel.asset_id, 10_000, None)
        .await
        .unwrap();

    let seller = account("seller");
    bed.funds.deposit(&seller, 10_000).unwrap();
    let receipt = bed
        .ledger
        .purchase_parcel(seller.clone(), parcel.asset_id)
        .await
        .unwrap();

    // The fee still accrues to the treasury.
    assert_eq!(receipt.fee, 250);
    assert_eq!(bed.funds.balance_of(&seller), 9_750);
    assert_eq!(bed.funds.balance_of(&account("treasury")), 250);
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.data_dir = temp.path().to_path_buf();
    config.market.min_price = MIN_PRICE;
    let funds = Arc::new(InMemoryFunds::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));

    let asset_id = {
        let ledger = MarketLedger::open(config.clone(), funds.clone(), clock.clone())
            .await
            .unwrap();
        ledger
            .initialize_marketplace(account("authority"), account("treasury"), 250)
            .await
            .unwrap();
        let parcel = ledger.mint_parcel(mint_request("seller")).await.unwrap();
        ledger.shutdown().await.unwrap();
        parcel.asset_id
    };

    let ledger = MarketLedger::open(config, funds, clock).await.unwrap();
    assert_eq!(ledger.marketplace().unwrap().total_parcels_minted, 1);
    assert_eq!(ledger.parcel(asset_id).unwrap().owner, account("seller"));
    assert_eq!(ledger.event_count(), 2);

    // The log keeps appending after the prior tail.
    let events = ledger.events_since(0).unwrap();
    assert!(matches!(
        events[1].event,
        MarketEvent::LandParcelMinted { .. }
    ));
    ledger.shutdown().await.unwrap();
}
