//! Concrete download strategies

pub mod github;
pub mod nuget;

pub use github::GitHubStrategy;
pub use nuget::{NugetSource, NugetStrategy};
