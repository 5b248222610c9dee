pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod security;
pub mod state;
