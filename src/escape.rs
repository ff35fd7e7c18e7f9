//! Case-safe escaping of module paths and versions.
//!
//! Module proxies store modules on filesystems that may be case-insensitive,
//! so `github.com/Azure/sdk` and `github.com/azure/sdk` must not collide.
//! Every ASCII uppercase letter is therefore replaced by `!` followed by the
//! lowercase letter (`Azure` becomes `!azure`). Because `!` is the escape
//! marker it is never accepted in unescaped input.

use crate::manifest::ModulePath;
use crate::version::Version;
use std::fmt;
use thiserror::Error;

/// Escape failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscapeError {
    /// The module path falls outside the accepted module path grammar.
    #[error("malformed module path {path:?}: {reason}")]
    InvalidIdentifier {
        /// The rejected module path.
        path: String,
        /// Why the path was rejected.
        reason: String,
    },

    /// The version cannot be used as a file name element.
    #[error("malformed version {version:?}: {reason}")]
    InvalidVersion {
        /// The rejected version.
        version: String,
        /// Why the version was rejected.
        reason: String,
    },
}

/// Windows device names that cannot be used as path elements.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Characters permitted in version file names beyond ASCII alphanumerics.
const FILE_NAME_PUNCTUATION: &str = "!#$%&()+,-.=@[]^_{}~ ";

/// A filesystem-safe module path, used only to name directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EscapedPath(String);

impl EscapedPath {
    /// Return the escaped path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EscapedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A filesystem-safe version, used only to name files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EscapedVersion(String);

impl EscapedVersion {
    /// Return the escaped version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the file name `<escaped-version>.<extension>`.
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{extension}", self.0)
    }
}

impl fmt::Display for EscapedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate `module` against the module path grammar and escape it.
///
/// # Errors
///
/// Returns [`EscapeError::InvalidIdentifier`] when the path is not a
/// well-formed module path.
///
/// # Examples
///
/// ```
/// use gopack::escape::escape_path;
/// use gopack::manifest::ModulePath;
///
/// let module = ModulePath::try_from("github.com/Azure/go-sdk").expect("non-empty");
/// let escaped = escape_path(&module).expect("valid module path");
/// assert_eq!(escaped.as_str(), "github.com/!azure/go-sdk");
/// ```
pub fn escape_path(module: &ModulePath) -> Result<EscapedPath, EscapeError> {
    let path = module.as_str();
    check_module_path(path).map_err(|reason| EscapeError::InvalidIdentifier {
        path: path.to_owned(),
        reason,
    })?;
    Ok(EscapedPath(escape_uppercase(path)))
}

/// Validate `version` as a file name element and escape it.
///
/// # Errors
///
/// Returns [`EscapeError::InvalidVersion`] when the version contains
/// characters that cannot appear in a file name.
pub fn escape_version(version: &Version) -> Result<EscapedVersion, EscapeError> {
    let raw = version.as_str();
    check_file_name(raw).map_err(|reason| EscapeError::InvalidVersion {
        version: raw.to_owned(),
        reason,
    })?;
    Ok(EscapedVersion(escape_uppercase(raw)))
}

fn escape_uppercase(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn check_module_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("empty string".to_owned());
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err("leading or trailing slash".to_owned());
    }
    if let Some(bad) = path.chars().find(|c| !c.is_ascii()) {
        return Err(format!("invalid char {bad:?}"));
    }

    let elements: Vec<&str> = path.split('/').collect();
    for element in &elements {
        check_element(element)?;
    }
    if let Some(first) = elements.first() {
        check_first_element(first)?;
    }
    check_major_suffix(path)
}

fn check_element(element: &str) -> Result<(), String> {
    if element.is_empty() {
        return Err("double slash".to_owned());
    }
    if element == "." || element == ".." {
        return Err(format!("invalid path element {element:?}"));
    }
    if element.starts_with('.') {
        return Err("leading dot in path element".to_owned());
    }
    if element.ends_with('.') {
        return Err("trailing dot in path element".to_owned());
    }
    if let Some(bad) = element.chars().find(|c| !is_module_path_char(*c)) {
        return Err(format!("invalid char {bad:?}"));
    }
    check_portable_name(element)
}

fn is_module_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

/// Reject Windows device names and 8.3 short-name lookalikes.
fn check_portable_name(element: &str) -> Result<(), String> {
    let stem = element.split('.').next().unwrap_or(element);
    if RESERVED_NAMES
        .iter()
        .any(|reserved| stem.eq_ignore_ascii_case(reserved))
    {
        return Err(format!("{stem:?} disallowed as path element component on Windows"));
    }
    if let Some((_, suffix)) = stem.rsplit_once('~') {
        if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Err("trailing tilde and digits in path element".to_owned());
        }
    }
    Ok(())
}

fn check_first_element(first: &str) -> Result<(), String> {
    if !first.contains('.') {
        return Err("missing dot in first path element".to_owned());
    }
    if first.starts_with('-') {
        return Err("leading dash in first path element".to_owned());
    }
    if let Some(bad) = first
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-')))
    {
        return Err(format!("invalid char {bad:?} in first path element"));
    }
    Ok(())
}

/// A trailing `/vN` element names a major version and must be `v2` or above.
fn check_major_suffix(path: &str) -> Result<(), String> {
    let Some((_, last)) = path.rsplit_once('/') else {
        return Ok(());
    };
    let Some(digits) = last.strip_prefix('v') else {
        return Ok(());
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(());
    }
    if digits.starts_with('0') || digits == "1" {
        return Err(format!("invalid version suffix /{last}"));
    }
    Ok(())
}

fn check_file_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("empty string".to_owned());
    }
    if name.contains('!') {
        return Err("contains the escape character '!'".to_owned());
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || FILE_NAME_PUNCTUATION.contains(*c)))
    {
        return Err(format!("invalid char {bad:?}"));
    }
    if name.starts_with('.') || name.ends_with('.') {
        return Err("leading or trailing dot".to_owned());
    }
    check_portable_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn module(path: &str) -> ModulePath {
        ModulePath::try_from(path).expect("non-empty module path")
    }

    #[rstest]
    #[case("example.com/m", "example.com/m")]
    #[case("github.com/Azure/azure-sdk", "github.com/!azure/azure-sdk")]
    #[case("github.com/BurntSushi/TOML", "github.com/!burnt!sushi/!t!o!m!l")]
    #[case("example.com/m/v2", "example.com/m/v2")]
    #[case("example.com/a_b~c/d.e", "example.com/a_b~c/d.e")]
    #[case("example.com/foo.bar~1", "example.com/foo.bar~1")]
    fn escapes_valid_module_paths(#[case] input: &str, #[case] expected: &str) {
        let escaped = escape_path(&module(input)).expect("valid module path");
        assert_eq!(escaped.as_str(), expected);
    }

    #[rstest]
    #[case::no_dot("localhost/m")]
    #[case::upper_first("Example.com/m")]
    #[case::leading_dash("-example.com/m")]
    #[case::leading_slash("/example.com/m")]
    #[case::trailing_slash("example.com/m/")]
    #[case::double_slash("example.com//m")]
    #[case::dot_element("example.com/./m")]
    #[case::dotdot_element("example.com/../m")]
    #[case::leading_dot("example.com/.hidden")]
    #[case::trailing_dot("example.com/m.")]
    #[case::escape_char("example.com/m!x")]
    #[case::space("example.com/my mod")]
    #[case::non_ascii("example.com/módulo")]
    #[case::reserved("example.com/con")]
    #[case::reserved_with_ext("example.com/AUX.txt")]
    #[case::short_name("example.com/PROGRA~1")]
    #[case::short_name_with_ext("example.com/foo~1.bar")]
    #[case::v1_suffix("example.com/m/v1")]
    #[case::v0_suffix("example.com/m/v0")]
    #[case::leading_zero_suffix("example.com/m/v02")]
    fn rejects_invalid_module_paths(#[case] input: &str) {
        let err = escape_path(&module(input)).expect_err("should be rejected");
        assert!(
            matches!(err, EscapeError::InvalidIdentifier { ref path, .. } if path == input),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn uppercase_escape_is_distinct_from_lowercase_form() {
        let upper = escape_path(&module("github.com/User/Repo")).expect("valid");
        let lower = escape_path(&module("github.com/user/repo")).expect("valid");
        assert!(!upper.as_str().chars().any(|c| c.is_ascii_uppercase()));
        assert_ne!(upper, lower);
    }

    #[rstest]
    #[case("v1.2.3", "v1.2.3")]
    #[case("v1.0.0-RC1", "v1.0.0-!r!c1")]
    #[case("v2.0.0+incompatible", "v2.0.0+incompatible")]
    fn escapes_versions(#[case] input: &str, #[case] expected: &str) {
        let version = Version::try_from(input).expect("valid version");
        let escaped = escape_version(&version).expect("escapable version");
        assert_eq!(escaped.as_str(), expected);
    }

    #[test]
    fn file_name_appends_extension() {
        let version = Version::try_from("v1.0.0-Beta").expect("valid version");
        let escaped = escape_version(&version).expect("escapable version");
        assert_eq!(escaped.file_name("zip"), "v1.0.0-!beta.zip");
    }
}
