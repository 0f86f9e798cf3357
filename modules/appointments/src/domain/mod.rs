pub mod error;
pub mod model;
pub mod reminders;
pub mod repo;
pub mod service;
