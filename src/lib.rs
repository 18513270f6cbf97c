//! Colloquy is the send/stream/session coordination core of a chat client
//! that converses with one or more remote AI providers.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns session state and reconciliation, message dispatch with
//!   retries and supersession, stream decoding, and render batching.
//! - [`api`] defines the wire payloads, the stream event union, and the
//!   HTTP backend client.
//! - [`utils`] carries small support pieces such as transcript logging.
//!
//! The runtime entrypoint lives in the binary crate (`src/main.rs`), which
//! wires a [`core::reconcile::SessionReconciler`] and a
//! [`core::dispatch::ChatClient`] around a shared
//! [`core::store::SessionStore`] and drives the event loop.

pub mod api;
pub mod core;
pub mod utils;
