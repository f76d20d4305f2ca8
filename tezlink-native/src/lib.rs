//! # tezlink Native Bindings (C-ABI)
//!
//! This crate exposes the parts of `tezlink-connector` that mobile and desktop hosts need
//! on their side of a wallet connection: building deep links for the wallet app, parsing
//! the callback links the wallet opens, and turning raw wallet messages into the
//! canonical `{"EventType": ..., "Data": ...}` envelope JSON.
//!
//! A Swift, Kotlin or C host calls these functions from its URL handler or message
//! callback and forwards the resulting envelope to the Rust runtime (or consumes it
//! directly).
//!
//! All FFI-exposed functions are defined in the [`ffi`] module.

pub mod ffi;
