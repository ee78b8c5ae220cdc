//! errors raised while assembling a template
//!
//! All of them are authoring mistakes: they are returned at the offending builder call (or by
//! [crate::template::Template::to_wire] when the check needs the whole document) and are never retried.
use crate::element::Section;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{0}")]
    Construction(String),
    #[error("Fn::{function} takes {expected} argument(s), got {actual}")]
    InvalidArity {
        function: String,
        expected: Arity,
        actual: usize,
    },
    #[error("{section} already contains an element named `{name}`")]
    DuplicateName { section: Section, name: String },
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("file `{path}` needs exactly one of inline content or a source url")]
    AmbiguousFileSource { path: String },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("mapping `{mapping}` has no category `{category}`")]
    UnknownCategory { mapping: String, category: String },
    #[error("mapping `{mapping}` has no key `{key}` in category `{category}`")]
    UnknownKey {
        mapping: String,
        category: String,
        key: String,
    },
    #[error("template has no mapping `{0}`")]
    UnknownMapping(String),
    #[error("config set `{config_set}` lists undeclared config `{config}`")]
    UnknownConfig { config_set: String, config: String },
    #[error("file `{path}` uses undeclared authentication `{authentication}`")]
    UnknownAuthentication {
        path: String,
        authentication: String,
    },
    #[error("`{from}` refers to unknown {expected} `{target}`")]
    UnknownReference {
        from: String,
        expected: &'static str,
        target: String,
    },
}

/// Accepted argument count of a known intrinsic function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exactly(n) => count == n,
            Arity::Between(min, max) => (min..=max).contains(&count),
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{n}"),
            Arity::Between(min, max) => write!(f, "{min} to {max}"),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
