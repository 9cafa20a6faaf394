//! Splits a Markdown source file into its YAML front matter and body, and
//! exposes the front matter as a string-keyed [`FrontMatter`] mapping with
//! case-insensitive lookups.

use serde_yaml::{Mapping, Value};
use std::fmt;

const FENCE: &str = "---";

/// The metadata block at the top of a post file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrontMatter(Mapping);

impl FrontMatter {
    /// Parses the front matter of `input`. The file must begin with a `---`
    /// line and the block ends at the next line that is exactly `---`.
    pub fn parse(input: &str) -> Result<FrontMatter> {
        let (yaml_start, yaml_stop) = frontmatter_indices(input)?;
        match serde_yaml::from_str::<Value>(&input[yaml_start..yaml_stop])? {
            Value::Mapping(mapping) => Ok(FrontMatter(mapping)),
            Value::Null => Ok(FrontMatter::default()),
            _ => Err(Error::NotAMapping),
        }
    }

    /// Looks up `key` ignoring ASCII case. Returns the key as it was spelled
    /// in the file along with its value.
    pub fn get(&self, key: &str) -> Option<(&str, &Value)> {
        self.0.iter().find_map(|(k, v)| match k {
            Value::String(k) if k.eq_ignore_ascii_case(key) => Some((k.as_str(), v)),
            _ => None,
        })
    }

    /// Looks up `key` ignoring ASCII case.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.get(key).map(|(_, v)| v)
    }

    /// Looks up `key` and renders it as text. Returns `None` for missing
    /// keys and `null` values.
    pub fn text(&self, key: &str) -> Option<String> {
        self.value(key).and_then(to_text)
    }
}

impl From<Mapping> for FrontMatter {
    fn from(mapping: Mapping) -> FrontMatter {
        FrontMatter(mapping)
    }
}

/// Renders a front-matter value as a string: scalars verbatim, collections
/// as inline YAML, `null` as nothing.
pub fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Tagged(tagged) => to_text(&tagged.value),
        other => serde_yaml::to_string(other)
            .ok()
            .map(|s| s.trim_end().to_owned()),
    }
}

// Returns the byte range of the YAML between the fences.
fn frontmatter_indices(input: &str) -> Result<(usize, usize)> {
    let input_start = input.strip_prefix('\u{feff}').map_or(0, |_| 3);
    let rest = &input[input_start..];
    let first_line_end = rest.find('\n').unwrap_or(rest.len());
    if rest[..first_line_end].trim_end() != FENCE {
        return Err(Error::MissingStartFence);
    }

    let yaml_start = input_start + first_line_end + 1;
    let mut offset = yaml_start;
    for line in input.get(yaml_start..).unwrap_or("").split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return Ok((yaml_start, offset));
        }
        offset += line.len();
    }
    Err(Error::MissingEndFence)
}

/// Represents the result of a front-matter parse.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing front matter.
#[derive(Debug)]
pub enum Error {
    /// Returned when the file doesn't begin with a `---` line.
    MissingStartFence,

    /// Returned when the starting fence was found but the closing one was
    /// missing.
    MissingEndFence,

    /// Returned when the YAML between the fences is not a mapping.
    NotAMapping,

    /// Returned when the YAML between the fences doesn't parse.
    DeserializeYaml(serde_yaml::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingStartFence => write!(f, "post must begin with `---`"),
            Error::MissingEndFence => write!(f, "missing closing `---`"),
            Error::NotAMapping => write!(f, "front matter must be a mapping"),
            Error::DeserializeYaml(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::DeserializeYaml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}
