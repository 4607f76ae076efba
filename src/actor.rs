//! Single-writer concurrency for the marketplace
//!
//! All state-mutating operations flow through one Tokio actor:
//! - One logical writer task eliminates race conditions between operations
//!   contending for the same record
//! - Each operation validates against the current snapshot and commits
//!   inside the same dispatch, so no operation observes a partially-applied
//!   sibling
//! - Async message passing with backpressure (bounded mailbox)
//!
//! Reads bypass the actor and go straight to storage.

use crate::engine::{MintRequest, SaleReceipt, TransitionEngine};
use crate::error::{Error, Result};
use crate::types::{AccountId, LandParcel, Listing, Marketplace};
use chrono::{DateTime, Utc};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Message sent to the market actor
pub enum MarketMessage {
    /// Create the marketplace singleton
    Initialize {
        /// Administering identity
        authority: AccountId,
        /// Fee destination identity
        treasury: AccountId,
        /// Initial fee in basis points
        fee_basis_points: u16,
        /// Reply channel
        response: oneshot::Sender<Result<Marketplace>>,
    },

    /// Mint a new parcel
    Mint {
        /// Mint inputs
        request: MintRequest,
        /// Reply channel
        response: oneshot::Sender<Result<LandParcel>>,
    },

    /// List a parcel for sale
    List {
        /// Seller identity
        seller: AccountId,
        /// Parcel to list
        parcel_id: Uuid,
        /// Asking price
        price: u64,
        /// Optional expiry
        expires_at: Option<DateTime<Utc>>,
        /// Reply channel
        response: oneshot::Sender<Result<Listing>>,
    },

    /// Purchase a listed parcel
    Purchase {
        /// Buyer identity
        buyer: AccountId,
        /// Parcel to purchase
        parcel_id: Uuid,
        /// Reply channel
        response: oneshot::Sender<Result<SaleReceipt>>,
    },

    /// Cancel an Active listing
    Cancel {
        /// Calling identity (must be the seller)
        caller: AccountId,
        /// Parcel whose listing to cancel
        parcel_id: Uuid,
        /// Reply channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Update the marketplace fee
    UpdateFee {
        /// Calling identity (must be the authority)
        caller: AccountId,
        /// New fee in basis points
        new_fee_basis_points: u16,
        /// Reply channel
        response: oneshot::Sender<Result<Marketplace>>,
    },

    /// Shutdown actor
    Shutdown {
        /// Acknowledged once the actor has released its resources
        response: oneshot::Sender<()>,
    },
}

/// Actor that applies marketplace transitions sequentially
pub struct MarketActor {
    engine: TransitionEngine,
    mailbox: mpsc::Receiver<MarketMessage>,
}

impl MarketActor {
    /// Create new actor
    pub fn new(engine: TransitionEngine, mailbox: mpsc::Receiver<MarketMessage>) -> Self {
        Self { engine, mailbox }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        let mut ack = None;
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                MarketMessage::Shutdown { response } => {
                    ack = Some(response);
                    break;
                }
                other => self.handle_message(other),
            }
        }
        tracing::debug!("Market actor stopped");

        // Release storage before acknowledging so a caller can reopen the
        // database as soon as shutdown returns.
        let Self { engine, mailbox } = self;
        drop(engine);
        drop(mailbox);
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }

    /// Apply one operation and reply
    fn handle_message(&mut self, msg: MarketMessage) {
        let started = Instant::now();
        let succeeded = match msg {
            MarketMessage::Initialize {
                authority,
                treasury,
                fee_basis_points,
                response,
            } => {
                let result = self
                    .engine
                    .apply_initialize(authority, treasury, fee_basis_points);
                let ok = result.is_ok();
                let _ = response.send(result);
                ok
            }

            MarketMessage::Mint { request, response } => {
                let result = self.engine.apply_mint(request);
                let ok = result.is_ok();
                let _ = response.send(result);
                ok
            }

            MarketMessage::List {
                seller,
                parcel_id,
                price,
                expires_at,
                response,
            } => {
                let result = self.engine.apply_list(seller, parcel_id, price, expires_at);
                let ok = result.is_ok();
                let _ = response.send(result);
                ok
            }

            MarketMessage::Purchase {
                buyer,
                parcel_id,
                response,
            } => {
                let result = self.engine.apply_purchase(buyer, parcel_id);
                let ok = result.is_ok();
                let _ = response.send(result);
                ok
            }

            MarketMessage::Cancel {
                caller,
                parcel_id,
                response,
            } => {
                let result = self.engine.apply_cancel(caller, parcel_id);
                let ok = result.is_ok();
                let _ = response.send(result);
                ok
            }

            MarketMessage::UpdateFee {
                caller,
                new_fee_basis_points,
                response,
            } => {
                let result = self.engine.apply_update_fee(caller, new_fee_basis_points);
                let ok = result.is_ok();
                let _ = response.send(result);
                ok
            }

            MarketMessage::Shutdown { .. } => false, // handled in run()
        };

        if succeeded {
            self.engine
                .metrics()
                .record_transition(started.elapsed().as_secs_f64());
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct MarketHandle {
    sender: mpsc::Sender<MarketMessage>,
}

impl MarketHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<MarketMessage>) -> Self {
        Self { sender }
    }

    async fn call<T>(
        &self,
        msg: MarketMessage,
        rx: oneshot::Receiver<Result<T>>,
    ) -> Result<T> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Create the marketplace singleton
    pub async fn initialize(
        &self,
        authority: AccountId,
        treasury: AccountId,
        fee_basis_points: u16,
    ) -> Result<Marketplace> {
        let (tx, rx) = oneshot::channel();
        self.call(
            MarketMessage::Initialize {
                authority,
                treasury,
                fee_basis_points,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Mint a new parcel
    pub async fn mint(&self, request: MintRequest) -> Result<LandParcel> {
        let (tx, rx) = oneshot::channel();
        self.call(MarketMessage::Mint { request, response: tx }, rx).await
    }

    /// List a parcel for sale
    pub async fn list(
        &self,
        seller: AccountId,
        parcel_id: Uuid,
        price: u64,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Listing> {
        let (tx, rx) = oneshot::channel();
        self.call(
            MarketMessage::List {
                seller,
                parcel_id,
                price,
                expires_at,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Purchase a listed parcel
    pub async fn purchase(&self, buyer: AccountId, parcel_id: Uuid) -> Result<SaleReceipt> {
        let (tx, rx) = oneshot::channel();
        self.call(
            MarketMessage::Purchase {
                buyer,
                parcel_id,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Cancel an Active listing
    pub async fn cancel(&self, caller: AccountId, parcel_id: Uuid) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.call(
            MarketMessage::Cancel {
                caller,
                parcel_id,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Update the marketplace fee
    pub async fn update_fee(
        &self,
        caller: AccountId,
        new_fee_basis_points: u16,
    ) -> Result<Marketplace> {
        let (tx, rx) = oneshot::channel();
        self.call(
            MarketMessage::UpdateFee {
                caller,
                new_fee_basis_points,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Shutdown the actor and wait for it to release its resources
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MarketMessage::Shutdown { response: tx })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }
}

/// Spawn the market actor
pub fn spawn_market_actor(engine: TransitionEngine) -> MarketHandle {
    let (tx, rx) = mpsc::channel(1000); // Bounded channel for backpressure
    let actor = MarketActor::new(engine, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    MarketHandle::new(tx)
}
