//! Reading the module manifest (`go.mod`).
//!
//! Only the `module` directive matters for publishing, but the whole file is
//! tokenised with the `go.mod` lexical rules so that malformed manifests are
//! rejected rather than silently published. Quoted strings accept the full
//! set of Go string escapes.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fmt;
use thiserror::Error;

/// File name of the module manifest inside a source tree.
pub const MANIFEST_FILE: &str = "go.mod";

/// Directive verbs accepted in a manifest.
const KNOWN_VERBS: &[&str] = &[
    "module",
    "go",
    "toolchain",
    "godebug",
    "require",
    "exclude",
    "replace",
    "retract",
    "tool",
    "ignore",
];

/// Errors raised while loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest is absent or unreadable.
    #[error("read {path}: {source}")]
    NotFound {
        /// Expected manifest location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest content is malformed.
    #[error("parse {path}:{line}: {reason}")]
    Parse {
        /// Manifest location.
        path: Utf8PathBuf,
        /// 1-based line of the offending token.
        line: usize,
        /// Description of the problem.
        reason: String,
    },

    /// The manifest has no usable `module` directive.
    #[error("cannot determine module path from {path}")]
    Incomplete {
        /// Manifest location.
        path: Utf8PathBuf,
    },
}

/// A non-empty module path as declared in a manifest.
///
/// Grammar checks happen when the path is escaped, see
/// [`crate::escape::escape_path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModulePath(String);

/// Error returned when constructing an empty [`ModulePath`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("module path must not be empty")]
pub struct EmptyModulePath;

impl ModulePath {
    /// Return the module path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ModulePath {
    type Error = EmptyModulePath;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_owned())
    }
}

impl TryFrom<String> for ModulePath {
    type Error = EmptyModulePath;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(EmptyModulePath);
        }
        Ok(Self(value))
    }
}

impl AsRef<str> for ModulePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A loaded manifest: where it came from, its raw bytes and its module path.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: Utf8PathBuf,
    bytes: Vec<u8>,
    module: ModulePath,
}

impl Manifest {
    /// Return the manifest file location.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Return the manifest exactly as read from disk.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Return the declared module path.
    #[must_use]
    pub fn module(&self) -> &ModulePath {
        &self.module
    }
}

/// Read and parse `<src_root>/go.mod`.
///
/// # Errors
///
/// Returns [`ManifestError::NotFound`] when the file cannot be read,
/// [`ManifestError::Parse`] when it is malformed, and
/// [`ManifestError::Incomplete`] when it declares no module path.
pub fn read_manifest(src_root: &Utf8Path) -> Result<Manifest, ManifestError> {
    let path = src_root.join(MANIFEST_FILE);
    let bytes = std::fs::read(&path).map_err(|source| ManifestError::NotFound {
        path: path.clone(),
        source,
    })?;
    let module = parse_module_path(&path, &bytes)?;
    debug!("read manifest {path}: module {module}");
    Ok(Manifest {
        path,
        bytes,
        module,
    })
}

/// Extract the module path from manifest content.
///
/// `path` is used only for error messages.
///
/// # Errors
///
/// See [`read_manifest`].
pub fn parse_module_path(path: &Utf8Path, content: &[u8]) -> Result<ModulePath, ManifestError> {
    let parse_error = |line: usize, reason: String| ManifestError::Parse {
        path: path.to_owned(),
        line,
        reason,
    };

    let text = std::str::from_utf8(content).map_err(|e| {
        let line = content
            .get(..e.valid_up_to())
            .map_or(1, |valid| 1 + valid.iter().filter(|b| **b == b'\n').count());
        parse_error(line, "invalid UTF-8".to_owned())
    })?;

    let directives = parse_directives(text).map_err(|e| parse_error(e.line, e.reason))?;

    let mut module: Option<(usize, String)> = None;
    for directive in directives {
        if directive.verb != "module" {
            continue;
        }
        if let Some((first_line, _)) = &module {
            return Err(parse_error(
                directive.line,
                format!("repeated module statement (first on line {first_line})"),
            ));
        }
        let [arg] = directive.args.as_slice() else {
            return Err(parse_error(
                directive.line,
                "usage: module module/path".to_owned(),
            ));
        };
        module = Some((directive.line, arg.clone()));
    }

    module
        .and_then(|(_, value)| ModulePath::try_from(value).ok())
        .ok_or_else(|| ManifestError::Incomplete {
            path: path.to_owned(),
        })
}

/// One logical directive, with block entries expanded.
#[derive(Debug, PartialEq, Eq)]
struct Directive {
    line: usize,
    verb: String,
    args: Vec<String>,
}

#[derive(Debug)]
struct SyntaxError {
    line: usize,
    reason: String,
}

impl SyntaxError {
    fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Open,
    Close,
}

fn parse_directives(text: &str) -> Result<Vec<Directive>, SyntaxError> {
    let mut directives = Vec::new();
    let mut block: Option<(usize, String)> = None;

    for (index, raw_line) in text.lines().enumerate() {
        let line = index + 1;
        let tokens = tokenize_line(raw_line, line)?;
        let Some((head, rest)) = tokens.split_first() else {
            continue;
        };

        if let Some(verb) = block.as_ref().map(|(_, verb)| verb.clone()) {
            match (head, rest) {
                (Token::Close, []) => block = None,
                (Token::Close, _) => {
                    return Err(SyntaxError::new(line, "unexpected tokens after ')'"));
                }
                (Token::Open, _) => return Err(SyntaxError::new(line, "unexpected '('")),
                (Token::Word(_), _) => directives.push(Directive {
                    line,
                    verb,
                    args: words(&tokens, line)?,
                }),
            }
            continue;
        }

        let Token::Word(verb) = head else {
            return Err(SyntaxError::new(line, "unexpected parenthesis"));
        };
        if !KNOWN_VERBS.contains(&verb.as_str()) {
            return Err(SyntaxError::new(line, format!("unknown directive: {verb}")));
        }
        if rest == [Token::Open] {
            block = Some((line, verb.clone()));
            continue;
        }
        directives.push(Directive {
            line,
            verb: verb.clone(),
            args: words(rest, line)?,
        });
    }

    if let Some((line, verb)) = block {
        return Err(SyntaxError::new(line, format!("unterminated {verb} block")));
    }
    Ok(directives)
}

fn words(tokens: &[Token], line: usize) -> Result<Vec<String>, SyntaxError> {
    tokens
        .iter()
        .map(|token| match token {
            Token::Word(word) => Ok(word.clone()),
            Token::Open | Token::Close => Err(SyntaxError::new(line, "unexpected parenthesis")),
        })
        .collect()
}

fn tokenize_line(line: &str, line_no: usize) -> Result<Vec<Token>, SyntaxError> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(&c) = chars.get(pos) {
        if c.is_whitespace() {
            pos += 1;
            continue;
        }
        if starts_comment(&chars, pos) {
            break;
        }
        match c {
            '(' => {
                pos += 1;
                tokens.push(Token::Open);
            }
            ')' => {
                pos += 1;
                tokens.push(Token::Close);
            }
            '"' => {
                let (word, next) = take_interpreted(&chars, pos + 1, line_no)?;
                tokens.push(Token::Word(word));
                pos = next;
            }
            '`' => {
                let (word, next) = take_raw(&chars, pos + 1, line_no)?;
                tokens.push(Token::Word(word));
                pos = next;
            }
            _ => {
                let (word, next) = take_bare(&chars, pos);
                tokens.push(Token::Word(word));
                pos = next;
            }
        }
    }
    Ok(tokens)
}

fn starts_comment(chars: &[char], pos: usize) -> bool {
    chars.get(pos) == Some(&'/') && chars.get(pos + 1) == Some(&'/')
}

fn take_bare(chars: &[char], start: usize) -> (String, usize) {
    let mut word = String::new();
    let mut pos = start;
    while let Some(&c) = chars.get(pos) {
        if c.is_whitespace() || matches!(c, '(' | ')' | '"' | '`') || starts_comment(chars, pos) {
            break;
        }
        word.push(c);
        pos += 1;
    }
    (word, pos)
}

fn take_interpreted(
    chars: &[char],
    start: usize,
    line_no: usize,
) -> Result<(String, usize), SyntaxError> {
    let mut value = Vec::new();
    let mut pos = start;
    loop {
        let Some(&c) = chars.get(pos) else {
            return Err(SyntaxError::new(line_no, "unterminated quoted string"));
        };
        pos += 1;
        match c {
            '"' => {
                let text = String::from_utf8(value).map_err(|_| {
                    SyntaxError::new(line_no, "quoted string is not valid UTF-8")
                })?;
                return Ok((text, pos));
            }
            '\\' => pos = unescape(chars, pos, line_no, &mut value)?,
            other => push_char(&mut value, other),
        }
    }
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

/// Decode the escape sequence whose first character follows the backslash
/// at `pos`. Returns the position after the sequence.
///
/// `\x` and octal escapes produce raw bytes, `\u` and `\U` produce a
/// Unicode scalar value.
fn unescape(
    chars: &[char],
    pos: usize,
    line_no: usize,
    out: &mut Vec<u8>,
) -> Result<usize, SyntaxError> {
    let Some(&c) = chars.get(pos) else {
        return Err(SyntaxError::new(line_no, "unterminated quoted string"));
    };
    let simple = match c {
        'a' => Some('\u{7}'),
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'v' => Some('\u{b}'),
        '\\' => Some('\\'),
        '"' => Some('"'),
        _ => None,
    };
    if let Some(decoded) = simple {
        push_char(out, decoded);
        return Ok(pos + 1);
    }

    let byte_err = || SyntaxError::new(line_no, format!("escape value out of range: \\{c}"));
    match c {
        'x' => {
            let code = escape_digits(chars, pos + 1, 2, 16, line_no)?;
            out.push(u8::try_from(code).map_err(|_| byte_err())?);
            Ok(pos + 3)
        }
        '0'..='7' => {
            let code = escape_digits(chars, pos, 3, 8, line_no)?;
            out.push(u8::try_from(code).map_err(|_| byte_err())?);
            Ok(pos + 3)
        }
        'u' | 'U' => {
            let width = if c == 'u' { 4 } else { 8 };
            let code = escape_digits(chars, pos + 1, width, 16, line_no)?;
            let decoded = char::from_u32(code).ok_or_else(byte_err)?;
            push_char(out, decoded);
            Ok(pos + 1 + width)
        }
        other => Err(SyntaxError::new(
            line_no,
            format!("unsupported escape sequence \\{other}"),
        )),
    }
}

fn escape_digits(
    chars: &[char],
    start: usize,
    width: usize,
    radix: u32,
    line_no: usize,
) -> Result<u32, SyntaxError> {
    (start..start + width).try_fold(0u32, |acc, index| {
        let digit = chars
            .get(index)
            .and_then(|c| c.to_digit(radix))
            .ok_or_else(|| SyntaxError::new(line_no, "malformed escape sequence"))?;
        acc.checked_mul(radix)
            .and_then(|shifted| shifted.checked_add(digit))
            .ok_or_else(|| SyntaxError::new(line_no, "escape value out of range"))
    })
}

fn take_raw(chars: &[char], start: usize, line_no: usize) -> Result<(String, usize), SyntaxError> {
    let rest = chars.get(start..).unwrap_or_default();
    let Some(offset) = rest.iter().position(|c| *c == '`') else {
        return Err(SyntaxError::new(line_no, "unterminated raw string"));
    };
    let value = rest.iter().take(offset).collect();
    Ok((value, start + offset + 1))
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
