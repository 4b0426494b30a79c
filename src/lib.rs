pub mod config;
pub mod engine;
pub mod errors;
pub mod geo;
pub mod handlers;
pub mod models;
pub mod store;
pub mod utils;
