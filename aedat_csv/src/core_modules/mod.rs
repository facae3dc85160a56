pub mod activity;
pub mod chunk;
pub mod config;
pub mod decomposition;
pub mod error;
pub mod header;
pub mod record;
pub mod spatial;
