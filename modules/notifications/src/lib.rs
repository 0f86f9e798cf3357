//! In-app notifications.
//!
//! Other modules stage notifications with [`outbox::stage`] inside their own
//! transaction; the dispatcher materializes committed outbox rows into the
//! user-visible `notifications` table and retries failures with backoff.

pub mod contract;
pub use contract::{client, error, model};

pub mod module;
pub use module::{register, Notifications};

pub mod outbox;

#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod gateways;
#[doc(hidden)]
pub mod infra;
