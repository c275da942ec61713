//! Group queries: what a slot asks the resolver for.

use std::fmt;

use serde::{Deserialize, Serialize};
use tabletop_core::SlotName;

/// A request for "some category matching this".
///
/// Each name is interpreted against the catalog as, in order: a model
/// file path, the reserved `all` tag, a category name, or a group tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupQuery {
    /// One name.
    Named(String),
    /// The union of several names.
    AnyOf(Vec<String>),
    /// Whatever category another slot resolved to.
    #[serde(skip)]
    SameAs(SlotName),
}

impl GroupQuery {
    /// Union query from any iterable of names.
    pub fn any_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf(names.into_iter().map(Into::into).collect())
    }

    /// The literal names in the query; empty for [`GroupQuery::SameAs`].
    pub fn names(&self) -> &[String] {
        match self {
            Self::Named(n) => std::slice::from_ref(n),
            Self::AnyOf(ns) => ns,
            Self::SameAs(_) => &[],
        }
    }

    /// The single name if the query names exactly one thing.
    pub fn single(&self) -> Option<&str> {
        match self.names() {
            [one] => Some(one),
            _ => None,
        }
    }
}

impl From<&str> for GroupQuery {
    fn from(v: &str) -> Self {
        Self::Named(v.to_owned())
    }
}

impl From<String> for GroupQuery {
    fn from(v: String) -> Self {
        Self::Named(v)
    }
}

impl fmt::Display for GroupQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(n) => f.write_str(n),
            Self::AnyOf(ns) => write!(f, "[{}]", ns.join(", ")),
            Self::SameAs(slot) => write!(f, "same as '{slot}'"),
        }
    }
}
