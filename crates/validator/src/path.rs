//! Property paths.
//!
//! A property path addresses a value inside an object graph using dot and
//! bracket notation: `authors[0].firstName`, `children[lastName].data`.
//! Dots separate property names, brackets hold collection indices or map keys.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidatorError;

/// One step of a [`PropertyPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElement {
    /// `.name`
    Property(String),
    /// `[key]`
    Index(String),
}

impl PathElement {
    /// The raw name or key of this element.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Property(name) | Self::Index(name) => name,
        }
    }

    /// Whether this element is a bracketed index.
    #[must_use]
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }
}

/// A parsed dot/bracket property path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    elements: Vec<PathElement>,
}

impl PropertyPath {
    /// The empty path, addressing the validated root itself.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `a.b[0].c`-style notation.
    pub fn parse(path: &str) -> Result<Self, ValidatorError> {
        let invalid = |reason: &str| ValidatorError::InvalidPath {
            path: path.to_owned(),
            reason: reason.to_owned(),
        };

        let mut elements = Vec::new();
        let mut current = String::new();
        let mut after_dot = false;
        let mut chars = path.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if current.is_empty() {
                        if elements.is_empty() || after_dot {
                            return Err(invalid("empty property name"));
                        }
                    } else {
                        elements.push(PathElement::Property(std::mem::take(&mut current)));
                    }
                    after_dot = true;
                }
                '[' => {
                    if !current.is_empty() {
                        elements.push(PathElement::Property(std::mem::take(&mut current)));
                    } else if after_dot {
                        return Err(invalid("empty property name"));
                    }
                    let mut index = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some('[') => return Err(invalid("nested `[`")),
                            Some(c) => index.push(c),
                            None => return Err(invalid("unclosed `[`")),
                        }
                    }
                    if index.is_empty() {
                        return Err(invalid("empty index"));
                    }
                    elements.push(PathElement::Index(index));
                    after_dot = false;
                    if !matches!(chars.peek(), None | Some('.' | '[')) {
                        return Err(invalid("expected `.` or `[` after `]`"));
                    }
                }
                ']' => return Err(invalid("unexpected `]`")),
                c => {
                    current.push(c);
                    after_dot = false;
                }
            }
        }

        if !current.is_empty() {
            elements.push(PathElement::Property(current));
        } else if after_dot {
            return Err(invalid("trailing `.`"));
        }

        Ok(Self { elements })
    }

    /// Appends a `.name` element.
    #[must_use = "builder methods must be chained or built"]
    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.elements.push(PathElement::Property(name.into()));
        self
    }

    /// Appends a `[key]` element.
    #[must_use = "builder methods must be chained or built"]
    pub fn index(mut self, key: impl fmt::Display) -> Self {
        self.elements.push(PathElement::Index(key.to_string()));
        self
    }

    /// Concatenates two paths.
    #[must_use]
    pub fn join(&self, tail: &PropertyPath) -> Self {
        let mut elements = self.elements.clone();
        elements.extend(tail.elements.iter().cloned());
        Self { elements }
    }

    /// The elements of the path, root first.
    #[must_use]
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the path addresses the root itself.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The remaining elements after `prefix`, if this path starts with it.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &PropertyPath) -> Option<&[PathElement]> {
        self.elements.strip_prefix(prefix.elements.as_slice())
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            match element {
                PathElement::Property(name) => {
                    if i > 0 {
                        f.write_char('.')?;
                    }
                    f.write_str(name)?;
                }
                PathElement::Index(key) => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for PropertyPath {
    type Err = ValidatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FromIterator<PathElement> for PropertyPath {
    fn from_iter<I: IntoIterator<Item = PathElement>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl Serialize for PropertyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PropertyPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
