pub mod checks;
pub mod config;
pub mod data;
pub mod server;
