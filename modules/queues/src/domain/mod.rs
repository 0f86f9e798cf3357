pub mod error;
pub mod model;
pub mod notices;
pub mod repo;
pub mod service;
