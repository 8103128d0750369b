//! Version ordering for resolved artifacts
//!
//! Every version the bootstrapper handles, whether it comes from a release
//! tag, a package feed or a cache directory name, is compared through the
//! [`semver::Version`] type defined here.
//!
//! # Modules
//!
//! - [`semver`]: Orderable version value, the zero sentinel and latest-version selection
//! - [`error`]: Error type for rejected version strings

pub mod error;
pub mod semver;
