//! Data synchronization and caching core for the TeamBoard collaboration
//! app.
//!
//! The crate turns a push-based remote data source into independently
//! cancellable live subscriptions for many concurrent consumers
//! ([`registry`]), overlays a durable local cache for offline reads
//! ([`cache`]), and applies deterministic reconciliation rules for
//! denormalized task fields ([`reconcile`]). The public surface is the set
//! of repository contracts in [`repository`]; backends plug in through the
//! adapter traits in [`source`].

pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod mapper;
pub mod reconcile;
pub mod registry;
pub mod repository;
pub mod source;

pub use errors::RepositoryError;
pub use registry::{ChannelRegistry, Subscription};
