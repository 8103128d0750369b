//! HTTP and file plumbing shared by the concrete strategies
//!
//! - [`proxy`]: Environment, host and direct proxy selection
//! - [`client`]: Request shaping and status mapping for every outbound request
//! - [`files`]: Temporary files and destination replacement

pub mod client;
pub mod files;
pub mod proxy;

pub use client::HttpTransport;
pub use proxy::ProxyResolver;
