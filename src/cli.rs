use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::bootstrap::{Options, SourceOrder, VersionRequest};
use crate::config::{ARTIFACT_NAME, BootstrapConfig, cache_dir};
use crate::logging::Verbosity;
use crate::strategy::sources::NugetSource;

/// Positional argument that asks for the latest prerelease
const PRERELEASE_ARG: &str = "prerelease";

#[derive(Debug, Parser)]
#[command(name = "paket-bootstrapper")]
#[command(version, about = "Downloads the latest version of paket")]
pub struct Cli {
    /// `prerelease` to accept prerelease versions, or an exact version to install
    #[arg(id = "requested_version", value_name = "prerelease|VERSION")]
    pub requested: Option<String>,

    /// Prefer NuGet as download source instead of GitHub
    #[arg(long)]
    pub prefer_nuget: bool,

    /// Only use NuGet as download source
    #[arg(long)]
    pub force_nuget: bool,

    /// NuGet feed URL or directory of packages used to download paket
    #[arg(long, value_name = "NUGET_SOURCE")]
    pub nuget_source: Option<String>,

    /// Skip all checks if paket.exe exists and is younger than this many minutes
    #[arg(long, value_name = "MINUTES")]
    pub max_file_age: Option<u64>,

    /// Download and update the bootstrapper itself
    #[arg(long = "self")]
    pub self_update: bool,

    /// Don't use the local cache; always download
    #[arg(short = 'f')]
    pub force: bool,

    /// Silent mode, errors only. Use twice for no output
    #[arg(short = 's', action = ArgAction::Count)]
    pub silent: u8,

    /// Show more information on the console
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Where to place paket.exe (default: next to the bootstrapper)
    #[arg(long, value_name = "PATH")]
    pub target: Option<PathBuf>,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.silent, self.verbose)
    }

    /// Merge the command line over `config`. `self_path` is the running bootstrapper.
    pub fn into_options(self, config: &BootstrapConfig, self_path: PathBuf) -> Options {
        let target = self.target.unwrap_or_else(|| {
            self_path
                .parent()
                .map(|dir| dir.join(ARTIFACT_NAME))
                .unwrap_or_else(|| PathBuf::from(ARTIFACT_NAME))
        });

        let version = match self.requested {
            Some(arg) if arg.eq_ignore_ascii_case(PRERELEASE_ARG) => {
                VersionRequest::Latest { prerelease: true }
            }
            Some(version) => VersionRequest::Exact(version),
            None => VersionRequest::Latest {
                prerelease: config.prerelease,
            },
        };

        let sources = if self.force_nuget || config.force_nuget {
            SourceOrder::NugetOnly
        } else if self.prefer_nuget || config.prefer_nuget {
            SourceOrder::NugetFirst
        } else {
            SourceOrder::GitHubFirst
        };

        let nuget_source = self
            .nuget_source
            .as_deref()
            .or(config.nuget_source.as_deref())
            .map(NugetSource::parse)
            .unwrap_or_default();

        Options {
            target,
            self_path,
            version,
            sources,
            nuget_source,
            github: config.github.clone(),
            max_file_age: self.max_file_age.or(config.max_file_age),
            self_update: self.self_update,
            use_cache: !self.force,
            cache_dir: config.cache_dir.clone().unwrap_or_else(cache_dir),
        }
    }
}
