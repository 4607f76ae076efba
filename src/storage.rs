//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `marketplace` - Marketplace singleton (key: derived singleton key)
//! - `parcels` - Land parcel records (key: derived parcel key)
//! - `listings` - Listing records (key: derived listing key)
//! - `events` - Append-only event log (key: big-endian sequence)
//!
//! All mutations for one operation go through [`Storage::commit`], which
//! writes the touched records and the event in a single `WriteBatch` so the
//! transition is durable all-or-nothing.

use crate::{
    address::{listing_key, marketplace_key, parcel_key},
    error::{Error, Result},
    events::{MarketEvent, SequencedEvent},
    types::{LandParcel, Listing, Marketplace},
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_MARKETPLACE: &str = "marketplace";
const CF_PARCELS: &str = "parcels";
const CF_LISTINGS: &str = "listings";
const CF_EVENTS: &str = "events";

/// Records touched by one operation
///
/// `None` fields are left untouched; populated fields are written in the
/// same atomic batch as the event.
#[derive(Debug, Default, Clone)]
pub struct WriteSet {
    /// Updated marketplace singleton
    pub marketplace: Option<Marketplace>,
    /// Created or updated parcel
    pub parcel: Option<LandParcel>,
    /// Created or updated listing
    pub listing: Option<Listing>,
}

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,

    /// Next event sequence, seeded from the log tail at open
    next_sequence: AtomicU64,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_MARKETPLACE, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_PARCELS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_LISTINGS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_EVENTS, Self::cf_options_events()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        let storage = Self {
            db: Arc::new(db),
            next_sequence: AtomicU64::new(0),
        };
        let next = storage.last_event_sequence()?.map_or(0, |seq| seq + 1);
        storage.next_sequence.store(next, Ordering::SeqCst);

        tracing::info!(path = ?path, next_event_sequence = next, "Opened RocksDB");

        Ok(storage)
    }

    fn cf_options_records() -> Options {
        let mut opts = Options::default();
        // Records are frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_events() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Marketplace operations

    /// Whether the marketplace singleton exists
    pub fn marketplace_exists(&self) -> Result<bool> {
        let cf = self.cf_handle(CF_MARKETPLACE)?;
        Ok(self
            .db
            .get_cf(cf, marketplace_key().as_bytes())?
            .is_some())
    }

    /// Get the marketplace singleton
    pub fn get_marketplace(&self) -> Result<Marketplace> {
        let cf = self.cf_handle(CF_MARKETPLACE)?;
        let value = self
            .db
            .get_cf(cf, marketplace_key().as_bytes())?
            .ok_or(Error::MarketplaceNotFound)?;
        Ok(bincode::deserialize(&value)?)
    }

    // Parcel operations

    /// Get parcel by asset ID
    pub fn get_parcel(&self, asset_id: Uuid) -> Result<LandParcel> {
        let cf = self.cf_handle(CF_PARCELS)?;
        let value = self
            .db
            .get_cf(cf, parcel_key(asset_id).as_bytes())?
            .ok_or(Error::ParcelNotFound(asset_id))?;
        Ok(bincode::deserialize(&value)?)
    }

    // Listing operations

    /// Get the listing record for a parcel
    pub fn get_listing(&self, parcel_id: Uuid) -> Result<Listing> {
        let cf = self.cf_handle(CF_LISTINGS)?;
        let value = self
            .db
            .get_cf(cf, listing_key(parcel_id).as_bytes())?
            .ok_or(Error::ListingNotFound(parcel_id))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// All listing records (used by invariant verification)
    pub fn listings(&self) -> Result<Vec<Listing>> {
        let cf = self.cf_handle(CF_LISTINGS)?;
        let iter = self.db.iterator_cf(cf, IteratorMode::Start);

        let mut listings = Vec::new();
        for item in iter {
            let (_, value) = item?;
            listings.push(bincode::deserialize::<Listing>(&value)?);
        }
        Ok(listings)
    }

    // Atomic commit

    /// Commit one operation's record mutations and event atomically
    ///
    /// Returns the assigned event sequence when an event was written. A
    /// `None` event commits a state mutation without a log entry (the
    /// expiry side effect of a failed purchase).
    pub fn commit(&self, writes: &WriteSet, event: Option<&MarketEvent>) -> Result<Option<u64>> {
        let mut batch = WriteBatch::default();

        if let Some(marketplace) = &writes.marketplace {
            let cf = self.cf_handle(CF_MARKETPLACE)?;
            batch.put_cf(cf, marketplace_key().as_bytes(), bincode::serialize(marketplace)?);
        }

        if let Some(parcel) = &writes.parcel {
            let cf = self.cf_handle(CF_PARCELS)?;
            batch.put_cf(
                cf,
                parcel_key(parcel.asset_id).as_bytes(),
                bincode::serialize(parcel)?,
            );
        }

        if let Some(listing) = &writes.listing {
            let cf = self.cf_handle(CF_LISTINGS)?;
            batch.put_cf(
                cf,
                listing_key(listing.parcel_id).as_bytes(),
                bincode::serialize(listing)?,
            );
        }

        let sequence = if let Some(event) = event {
            let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
            let sequenced = SequencedEvent {
                sequence,
                event: event.clone(),
            };
            let cf = self.cf_handle(CF_EVENTS)?;
            batch.put_cf(cf, sequence.to_be_bytes(), bincode::serialize(&sequenced)?);
            Some(sequence)
        } else {
            None
        };

        self.db.write(batch)?;

        if let Some(event) = event {
            tracing::debug!(
                kind = event.kind(),
                sequence = sequence,
                "Transition committed"
            );
        }

        Ok(sequence)
    }

    // Event log operations

    /// Get event by sequence
    pub fn get_event(&self, sequence: u64) -> Result<SequencedEvent> {
        let cf = self.cf_handle(CF_EVENTS)?;
        let value = self
            .db
            .get_cf(cf, sequence.to_be_bytes())?
            .ok_or(Error::EventNotFound(sequence))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Get all events with sequence >= `from`, in log order
    pub fn events_since(&self, from: u64) -> Result<Vec<SequencedEvent>> {
        let cf = self.cf_handle(CF_EVENTS)?;
        let iter = self.db.iterator_cf(
            cf,
            IteratorMode::From(&from.to_be_bytes(), rocksdb::Direction::Forward),
        );

        let mut events = Vec::new();
        for item in iter {
            let (_, value) = item?;
            events.push(bincode::deserialize::<SequencedEvent>(&value)?);
        }
        Ok(events)
    }

    /// Number of events in the log
    pub fn event_count(&self) -> u64 {
        self.next_sequence.load(Ordering::SeqCst)
    }

    fn last_event_sequence(&self) -> Result<Option<u64>> {
        let cf = self.cf_handle(CF_EVENTS)?;
        let mut iter = self.db.iterator_cf(cf, IteratorMode::End);

        if let Some(item) = iter.next() {
            let (key, _) = item?;
            let bytes: [u8; 8] = key
                .as_ref()
                .try_into()
                .map_err(|_| Error::Storage("Malformed event key".to_string()))?;
            return Ok(Some(u64::from_be_bytes(bytes)));
        }
        Ok(None)
    }
}
