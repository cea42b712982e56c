use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldPathSegment {
    Key(String),
    Index(usize),
}

/// Location inside a JSON-shaped document, rendered as `$.blocks.b1.sockets.X`.
///
/// Keys that are not plain identifiers render in bracket form: `$["odd key"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<FieldPathSegment>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<FieldPathSegment>) -> Self {
        Self { segments }
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut out = self.clone();
        out.push_key(key);
        out
    }

    pub fn index(&self, index: usize) -> Self {
        let mut out = self.clone();
        out.push_index(index);
        out
    }

    pub fn push_key(&mut self, key: impl Into<String>) {
        self.segments.push(FieldPathSegment::Key(key.into()));
    }

    pub fn push_index(&mut self, index: usize) {
        self.segments.push(FieldPathSegment::Index(index));
    }

    pub fn segments(&self) -> &[FieldPathSegment] {
        &self.segments
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FieldPathParseError {
    #[error("field path must not be empty")]
    Empty,
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("invalid index segment at {0}")]
    InvalidIndex(usize),
    #[error("invalid key segment at {0}")]
    InvalidKey(usize),
    #[error("unexpected character '{found}' at {pos}")]
    UnexpectedChar { found: char, pos: usize },
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn take_ident(chars: &mut Peekable<CharIndices<'_>>) -> String {
    let mut out = String::new();
    while let Some((_, c)) = chars.peek().copied() {
        if !is_ident_char(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

fn take_bracket(
    chars: &mut Peekable<CharIndices<'_>>,
    open_pos: usize,
) -> Result<FieldPathSegment, FieldPathParseError> {
    match chars.peek().copied() {
        Some((_, '"')) => {
            chars.next();
            let mut key = String::new();
            loop {
                match chars.next() {
                    Some((_, '\\')) => match chars.next() {
                        Some((_, c)) => key.push(c),
                        None => return Err(FieldPathParseError::UnexpectedEnd),
                    },
                    Some((_, '"')) => break,
                    Some((_, c)) => key.push(c),
                    None => return Err(FieldPathParseError::UnexpectedEnd),
                }
            }
            match chars.next() {
                Some((_, ']')) => Ok(FieldPathSegment::Key(key)),
                Some((pos, found)) => Err(FieldPathParseError::UnexpectedChar { found, pos }),
                None => Err(FieldPathParseError::UnexpectedEnd),
            }
        }
        Some(_) => {
            let mut digits = String::new();
            while let Some((_, c)) = chars.peek().copied() {
                if !c.is_ascii_digit() {
                    break;
                }
                digits.push(c);
                chars.next();
            }
            if !matches!(chars.next(), Some((_, ']'))) {
                return Err(FieldPathParseError::InvalidIndex(open_pos));
            }
            digits
                .parse::<usize>()
                .map(FieldPathSegment::Index)
                .map_err(|_| FieldPathParseError::InvalidIndex(open_pos))
        }
        None => Err(FieldPathParseError::UnexpectedEnd),
    }
}

impl std::str::FromStr for FieldPath {
    type Err = FieldPathParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() {
            return Err(FieldPathParseError::Empty);
        }
        let mut chars = input.char_indices().peekable();
        let mut segments = Vec::new();

        if matches!(chars.peek(), Some((_, '$'))) {
            chars.next();
        } else {
            let key = take_ident(&mut chars);
            if key.is_empty() {
                return Err(FieldPathParseError::InvalidKey(0));
            }
            segments.push(FieldPathSegment::Key(key));
        }

        while let Some((pos, c)) = chars.next() {
            match c {
                '.' => {
                    let key = take_ident(&mut chars);
                    if key.is_empty() {
                        return match chars.peek() {
                            None => Err(FieldPathParseError::UnexpectedEnd),
                            Some(_) => Err(FieldPathParseError::InvalidKey(pos + 1)),
                        };
                    }
                    segments.push(FieldPathSegment::Key(key));
                }
                '[' => segments.push(take_bracket(&mut chars, pos)?),
                found => return Err(FieldPathParseError::UnexpectedChar { found, pos }),
            }
        }

        Ok(FieldPath::from_segments(segments))
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "$")?;
        for segment in &self.segments {
            match segment {
                FieldPathSegment::Key(key) if !key.is_empty() && key.chars().all(is_ident_char) => {
                    write!(f, ".{key}")?
                }
                FieldPathSegment::Key(key) => {
                    let escaped = key.replace('\\', "\\\\").replace('"', "\\\"");
                    write!(f, "[\"{escaped}\"]")?
                }
                FieldPathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "field_path_test.rs"]
mod tests;
