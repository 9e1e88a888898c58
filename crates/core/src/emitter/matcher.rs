//! Listener matchers.
//!
//! | matcher         | compared against      | default `match_nested` |
//! |-----------------|-----------------------|------------------------|
//! | exact name      | `EventMeta::name`     | `false`                |
//! | dotted path     | `EventMeta::path`     | `true`                 |
//! | `"*"`           | any name              | `false`                |
//! | `"*.*"`         | any path              | `true`                 |
//! | regex           | `path`, start-anchored| `true`                 |
//! | predicate       | whole `EventMeta`     | `false`                |
//!
//! A listener that is not nested only receives events emitted directly by the
//! emitter it was registered on.

use super::meta::EventMeta;
use super::path::{assert_valid_name, is_dotted_path, PathError};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

pub type Predicate = Arc<dyn Fn(&EventMeta) -> bool + Send + Sync>;

/// Rule deciding whether a listener receives an event.
#[derive(Clone)]
pub enum Matcher {
    Name(String),
    Path(String),
    /// `"*"`: every event emitted on the listener's own emitter.
    Any,
    /// `"*.*"`: every event, at any depth.
    AnyNested,
    Regex(Regex),
    Predicate(Predicate),
}

impl Matcher {
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&EventMeta) -> bool + Send + Sync + 'static,
    {
        Matcher::Predicate(Arc::new(predicate))
    }

    /// Whether the matcher sees descendant emissions unless told otherwise.
    pub fn default_match_nested(&self) -> bool {
        match self {
            Matcher::Name(_) | Matcher::Any | Matcher::Predicate(_) => false,
            Matcher::Path(_) | Matcher::AnyNested | Matcher::Regex(_) => true,
        }
    }

    pub fn matches(&self, meta: &EventMeta) -> bool {
        match self {
            Matcher::Name(name) => meta.name == *name,
            Matcher::Path(path) => meta.path == *path,
            Matcher::Any | Matcher::AnyNested => true,
            Matcher::Regex(regex) => regex.find(&meta.path).is_some_and(|m| m.start() == 0),
            Matcher::Predicate(predicate) => predicate(meta),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), PathError> {
        match self {
            Matcher::Name(name) => assert_valid_name(name),
            Matcher::Path(path) => path.split('.').try_for_each(assert_valid_name),
            _ => Ok(()),
        }
    }
}

impl From<&str> for Matcher {
    fn from(value: &str) -> Self {
        match value {
            "*" => Matcher::Any,
            "*.*" => Matcher::AnyNested,
            _ if is_dotted_path(value) => Matcher::Path(value.to_string()),
            _ => Matcher::Name(value.to_string()),
        }
    }
}

impl From<String> for Matcher {
    fn from(value: String) -> Self {
        Matcher::from(value.as_str())
    }
}

impl From<Regex> for Matcher {
    fn from(value: Regex) -> Self {
        Matcher::Regex(value)
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Name(name) => write!(f, "Name({name})"),
            Matcher::Path(path) => write!(f, "Path({path})"),
            Matcher::Any => write!(f, "*"),
            Matcher::AnyNested => write!(f, "*.*"),
            Matcher::Regex(regex) => write!(f, "Regex({})", regex.as_str()),
            Matcher::Predicate(_) => write!(f, "Predicate"),
        }
    }
}
