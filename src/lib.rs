//! Resolves, downloads and caches the latest paket.exe.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod logging;
pub mod strategy;
pub mod transport;
pub mod version;
