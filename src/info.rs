//! The `.info` descriptor recording a version and its publish time.

use crate::version::Version;
use chrono::{DateTime, Timelike, Utc};
use serde::{Serialize, Serializer};

/// Version descriptor served at `@v/<version>.info`.
///
/// Serializes as `{"Version":"v1.2.3","Time":"2024-05-01T12:00:00Z"}`. The
/// timestamp is RFC 3339 in UTC with trailing zeros of the fractional
/// seconds trimmed, matching what the Go toolchain emits.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use gopack::info::Info;
/// use gopack::version::Version;
///
/// let version = Version::try_from("v1.2.3").expect("valid version");
/// let time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
/// let info = Info::new(&version, time);
/// assert_eq!(
///     info.to_json_line().expect("serialize info"),
///     "{\"Version\":\"v1.2.3\",\"Time\":\"2024-05-01T12:00:00Z\"}\n"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Info {
    #[serde(rename = "Version")]
    version: String,
    #[serde(rename = "Time", serialize_with = "serialize_time")]
    time: DateTime<Utc>,
}

impl Info {
    /// Create a descriptor for `version` published at `time`.
    #[must_use]
    pub fn new(version: &Version, time: DateTime<Utc>) -> Self {
        Self {
            version: version.as_str().to_owned(),
            time,
        }
    }

    /// Return the described version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Return the publish time.
    #[must_use]
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Serialize as compact JSON followed by a single newline.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; with this fixed schema that only
    /// happens if the JSON writer itself fails.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

fn serialize_time<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_time(*time))
}

/// Format `time` as RFC 3339 with nanosecond precision, trailing zeros trimmed.
#[must_use]
pub fn format_time(time: DateTime<Utc>) -> String {
    let seconds = time.format("%Y-%m-%dT%H:%M:%S");
    let nanos = time.nanosecond() % 1_000_000_000;
    if nanos == 0 {
        return format!("{seconds}Z");
    }
    let fraction = format!("{nanos:09}");
    format!("{seconds}.{}Z", fraction.trim_end_matches('0'))
}
