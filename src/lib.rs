pub mod api;
pub mod breaker;
pub mod channels;
pub mod clients;
pub mod config;
pub mod engine;
pub mod errors;
pub mod ingest;
pub mod limiter;
pub mod models;
pub mod retry;
pub mod tracker;
