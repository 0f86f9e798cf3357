//! Users, registration and login, password reset and bearer tokens.
//!
//! Other modules consume [`contract::client::IdentityApi`] and the
//! [`modkit::TokenVerifier`] published by this module through the client hub.

pub mod contract;
pub use contract::{client, error, model};

pub mod module;
pub use module::{register, Identity};

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
