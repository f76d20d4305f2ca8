//! A core Rust library for connecting applications to Tezos wallets.
//!
//! This crate abstracts away how a wallet is reached (Beacon peer-to-peer messaging,
//! mobile deep links or an in-process JavaScript bridge) and offers a single
//! asynchronous API for pairing, signing and sending operations.
//!
//! # Key Components
//!
//! *   [`workers::WalletManager`]: The main entry point. It owns the session and every
//!     outstanding request, and is driven by commands and inbound wallet events.
//! *   [`workers::WalletHandle`]: The clonable API handed to application code.
//! *   [`transport`]: The wallet transports and the host traits they are built on.
//! *   [`codec`]: Encoding and decoding of wallet deep links.
//! *   [`workers::tracker`]: Polls an indexer until injected operations are applied.
/// Deep-link URL building and parsing.
pub mod codec;
/// Defines configuration structures for the connector.
pub mod config;
/// Matching of asynchronous wallet responses to outstanding requests.
pub mod correlator;
pub mod error;
/// The normalized wallet event vocabulary.
pub mod events;
pub mod inbound;
pub mod notifications;
pub mod pending;
/// The connection state machine.
pub mod session;
pub mod status;
/// A trait and default implementation for session persistence.
pub mod storage;
pub mod transport;
pub mod types;
/// The manager task and its background workers.
pub mod workers;

pub use config::WalletConfig;
pub use error::{RequestError, TransportError};
pub use pending::PendingRequest;
pub use workers::{WalletHandle, WalletManager};
