pub mod artifact_store;
#[path = "config/mod.rs"]
pub mod config_mod;
pub use config_mod as config;
pub mod csv;
pub mod storage;
pub mod xlsx;
pub mod xml;
