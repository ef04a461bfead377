pub mod auth;
pub mod config;
pub mod engine;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod store;
pub mod utils;
