//! Patient appointments: booking, rescheduling, cancellation, staff
//! completion and day-ahead reminders.
//!
//! Every state change stages its notification through
//! [`notifications::outbox::stage`] in the same transaction.

pub mod contract;
pub use contract::{client, error, model};

pub mod module;
pub use module::{register, Appointments};

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
