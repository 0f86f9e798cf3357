//! Walk-in patient queues per hospital and specialty.
//!
//! Waiting positions in a partition stay contiguous from 1: joins append
//! under a transaction, while leaving and being called close the gap.

pub mod contract;
pub use contract::{client, error, model};

pub mod module;
pub use module::{register, Queues};

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
