use std::cmp::Ordering;
use std::fmt;

use tracing::trace;

use crate::version::error::VersionError;

/// Orderable version parsed from a release tag, feed entry or cache directory name.
///
/// Versions compare by their numeric components first (major, minor, patch
/// and any further components such as the `2` in `5.0.0.2`) and by
/// prerelease label second; a version without a label is greater than the same numbers with
/// any label. Build metadata is ignored. The zero version sorts below every
/// parsed version and stands in for candidates that failed to parse or were
/// filtered out.
#[derive(Debug, Clone, Default)]
pub struct Version {
    parsed: Option<::semver::Version>,
    /// Numeric components after patch, without trailing zeros
    extra: Vec<u64>,
}

impl Version {
    /// The order-minimum sentinel.
    pub fn zero() -> Self {
        Self {
            parsed: None,
            extra: Vec::new(),
        }
    }

    /// Parse a version string, normalizing partial versions.
    ///
    /// A leading `v` is stripped and missing minor/patch components are
    /// padded with zeros:
    /// - "v1" -> 1.0.0
    /// - "1.2" -> 1.2.0
    /// - "1.2-beta" -> 1.2.0-beta
    ///
    /// Components beyond patch are kept and compared after patch:
    /// - "5.0.0.2" > "5.0.0.1" > "5.0.0" == "5.0.0.0"
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        let stripped = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let split_at = stripped.find(['-', '+']).unwrap_or(stripped.len());
        let (core, suffix) = stripped.split_at(split_at);
        let invalid = |reason: String| VersionError::Invalid {
            input: input.to_string(),
            reason,
        };

        let parts: Vec<&str> = core.split('.').collect();
        let (normalized, mut extra) = match parts.as_slice() {
            [_] => (format!("{core}.0.0{suffix}"), Vec::new()),
            [_, _] => (format!("{core}.0{suffix}"), Vec::new()),
            [major, minor, patch, rest @ ..] => {
                let extra = rest
                    .iter()
                    .map(|part| part.parse::<u64>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| invalid(e.to_string()))?;
                (format!("{major}.{minor}.{patch}{suffix}"), extra)
            }
            [] => return Err(VersionError::Empty),
        };

        while extra.last() == Some(&0) {
            extra.pop();
        }

        let parsed = ::semver::Version::parse(&normalized).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            parsed: Some(parsed),
            extra,
        })
    }

    /// Parse a version string, demoting anything unparseable to zero.
    pub fn parse_or_zero(input: &str) -> Self {
        Self::parse(input).unwrap_or_else(|e| {
            trace!("Treating candidate as version zero: {}", e);
            Self::zero()
        })
    }

    pub fn is_zero(&self) -> bool {
        self.parsed.is_none()
    }

    pub fn has_prerelease(&self) -> bool {
        self.parsed.as_ref().is_some_and(|v| !v.pre.is_empty())
    }

    /// Demote a prerelease version to zero when prereleases are ignored.
    ///
    /// The candidate stays in play: if every other candidate is zero too it
    /// can still be selected.
    pub fn filter_prerelease(self, ignore_prerelease: bool) -> Self {
        if ignore_prerelease && self.has_prerelease() {
            Self::zero()
        } else {
            self
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.parsed, &other.parsed) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a
                .major
                .cmp(&b.major)
                .then(a.minor.cmp(&b.minor))
                .then(a.patch.cmp(&b.patch))
                .then_with(|| self.extra.cmp(&other.extra))
                .then_with(|| a.pre.cmp(&b.pre)),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parsed {
            Some(version) => {
                write!(f, "{}.{}.{}", version.major, version.minor, version.patch)?;
                for part in &self.extra {
                    write!(f, ".{part}")?;
                }
                if !version.pre.is_empty() {
                    write!(f, "-{}", version.pre)?;
                }
                if !version.build.is_empty() {
                    write!(f, "+{}", version.build)?;
                }
                Ok(())
            }
            None => f.write_str("0"),
        }
    }
}

/// Pick the best candidate under the version order.
///
/// Candidates that fail to parse, and prereleases when `ignore_prerelease`
/// is set, rank as zero but remain selectable. Among equal candidates the
/// first one wins. Returns None only for an empty candidate list.
pub fn select_latest<I, S>(candidates: I, ignore_prerelease: bool) -> Option<S>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut best: Option<(Version, S)> = None;

    for candidate in candidates {
        let version = Version::parse_or_zero(candidate.as_ref()).filter_prerelease(ignore_prerelease);
        if best.as_ref().is_none_or(|(current, _)| version > *current) {
            best = Some((version, candidate));
        }
    }

    best.map(|(_, candidate)| candidate)
}

/// Like [`select_latest`], but candidates ranking as zero are excluded.
///
/// Used for remote listings, where a malformed or filtered tag must never be
/// reported as the latest release.
pub fn select_latest_release<I, S>(candidates: I, ignore_prerelease: bool) -> Option<S>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    select_latest(
        candidates.into_iter().filter(|candidate| {
            !Version::parse_or_zero(candidate.as_ref())
                .filter_prerelease(ignore_prerelease)
                .is_zero()
        }),
        ignore_prerelease,
    )
}
