#[macro_use]
pub mod macros;

pub mod db;
pub mod error;
pub mod measurement;
pub mod models;
pub mod naming;
pub mod service;
pub mod store;
pub mod validation;
