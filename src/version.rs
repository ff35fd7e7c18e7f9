//! Semantic version newtype for module releases.
//!
//! Versions follow the Go module flavour of Semantic Versioning 2.0.0: a
//! mandatory leading `v`, a full `major.minor.patch` core, an optional
//! pre-release and optional build metadata. The Go shorthands `v1` and
//! `v1.2` are rejected because they never name a concrete release.

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Errors raised while validating a version string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version {value:?}: {reason}")]
pub struct VersionError {
    /// The rejected input.
    pub value: String,
    /// Why the input was rejected.
    pub reason: String,
}

impl VersionError {
    fn new(value: &str, reason: impl Into<String>) -> Self {
        Self {
            value: value.to_owned(),
            reason: reason.into(),
        }
    }
}

/// A validated semantic version such as `v1.2.3-rc.1+meta`.
///
/// Equality is exact string equality. Ordering follows semver precedence,
/// with build metadata ignored and ties broken by the raw string so that
/// sorting is deterministic.
///
/// # Examples
///
/// ```
/// use gopack::version::Version;
///
/// let older = Version::try_from("v1.0.0-beta").expect("valid version");
/// let newer = Version::try_from("v1.0.0").expect("valid version");
/// assert!(older < newer);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    raw: String,
    core: [Numeric; 3],
    prerelease: Vec<Identifier>,
}

/// A decimal number of any length, without leading zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
struct Numeric(String);

impl Ord for Numeric {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Identifier {
    Numeric(Numeric),
    Alphanumeric(String),
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.cmp(b),
            (Self::Numeric(_), Self::Alphanumeric(_)) => Ordering::Less,
            (Self::Alphanumeric(_), Self::Numeric(_)) => Ordering::Greater,
            (Self::Alphanumeric(a), Self::Alphanumeric(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Version {
    /// Return the version exactly as it was supplied.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Return `true` when the version carries a pre-release suffix.
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }

    /// Compare two versions by semver precedence alone.
    ///
    /// Unlike [`Ord::cmp`], versions that differ only in build metadata
    /// compare equal here.
    #[must_use]
    pub fn precedence(&self, other: &Self) -> Ordering {
        self.core
            .cmp(&other.core)
            .then_with(|| compare_prerelease(&self.prerelease, &other.prerelease))
    }

    /// Return `true` when `value` is a valid version string.
    #[must_use]
    pub fn is_valid(value: &str) -> bool {
        parse(value).is_ok()
    }
}

/// A release sorts after all of its pre-releases; otherwise identifiers
/// are compared left to right and a shorter list loses a tie.
fn compare_prerelease(a: &[Identifier], b: &[Identifier]) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp(b),
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence(other)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<&str> for Version {
    type Error = VersionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        parse(value)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse(&value)
    }
}

impl std::str::FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse(value: &str) -> Result<Version, VersionError> {
    let Some(rest) = value.strip_prefix('v') else {
        return Err(VersionError::new(value, "version must start with 'v'"));
    };

    let (rest, build) = match rest.split_once('+') {
        Some((head, build)) => (head, Some(build)),
        None => (rest, None),
    };
    let (core, prerelease) = match rest.split_once('-') {
        Some((head, pre)) => (head, Some(pre)),
        None => (rest, None),
    };

    let core = parse_core(value, core)?;
    let prerelease = match prerelease {
        Some(pre) => parse_prerelease(value, pre)?,
        None => Vec::new(),
    };
    if let Some(build) = build {
        validate_build(value, build)?;
    }

    Ok(Version {
        raw: value.to_owned(),
        core,
        prerelease,
    })
}

fn parse_core(value: &str, core: &str) -> Result<[Numeric; 3], VersionError> {
    let mut parts = core.split('.');
    let mut numbers: [Numeric; 3] = Default::default();
    for (slot, label) in numbers.iter_mut().zip(["major", "minor", "patch"]) {
        let Some(part) = parts.next() else {
            return Err(VersionError::new(
                value,
                format!("missing {label} component (want vMAJOR.MINOR.PATCH)"),
            ));
        };
        *slot = parse_number(value, part, label)?;
    }
    if parts.next().is_some() {
        return Err(VersionError::new(
            value,
            "too many components (want vMAJOR.MINOR.PATCH)",
        ));
    }
    Ok(numbers)
}

fn parse_number(value: &str, part: &str, label: &str) -> Result<Numeric, VersionError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::new(
            value,
            format!("{label} component {part:?} is not a decimal number"),
        ));
    }
    if part.len() > 1 && part.starts_with('0') {
        return Err(VersionError::new(
            value,
            format!("{label} component {part:?} has a leading zero"),
        ));
    }
    Ok(Numeric(part.to_owned()))
}

fn parse_prerelease(value: &str, pre: &str) -> Result<Vec<Identifier>, VersionError> {
    pre.split('.')
        .map(|ident| {
            check_identifier(value, ident, "pre-release")?;
            if !ident.bytes().all(|b| b.is_ascii_digit()) {
                return Ok(Identifier::Alphanumeric(ident.to_owned()));
            }
            if ident.len() > 1 && ident.starts_with('0') {
                return Err(VersionError::new(
                    value,
                    format!("numeric pre-release identifier {ident:?} has a leading zero"),
                ));
            }
            Ok(Identifier::Numeric(Numeric(ident.to_owned())))
        })
        .collect()
}

fn validate_build(value: &str, build: &str) -> Result<(), VersionError> {
    build
        .split('.')
        .try_for_each(|ident| check_identifier(value, ident, "build"))
}

fn check_identifier(value: &str, ident: &str, kind: &str) -> Result<(), VersionError> {
    if ident.is_empty() {
        return Err(VersionError::new(
            value,
            format!("empty {kind} identifier"),
        ));
    }
    if let Some(bad) = ident
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
    {
        return Err(VersionError::new(
            value,
            format!("invalid character {bad:?} in {kind} identifier"),
        ));
    }
    Ok(())
}
