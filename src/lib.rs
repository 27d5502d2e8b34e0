pub mod api;
pub mod cli;
pub mod config;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod http;
pub mod operation;
pub mod server;
pub mod tools;
