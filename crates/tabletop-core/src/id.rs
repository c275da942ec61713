//! Strongly-typed names used throughout the task-authoring layer.
//!
//! Categories, group tags, registries, slots and asset paths are all
//! strings at heart, but mixing them up is a real bug class (a category
//! name passed where a group tag was expected silently expands to the
//! wrong candidate set). Each gets its own newtype.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new name from anything string-like.
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            /// Borrow the underlying string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(v: &str) -> Self {
                Self(v.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(v: String) -> Self {
                Self(v)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// An object category, e.g. `apple` or `cutting_board`.
    ///
    /// Categories are the unit the resolver draws from; every model
    /// instance belongs to exactly one category.
    Category
);

string_id!(
    /// A semantic group tag, e.g. `fruit`, `vegetable`, `in_container`.
    ///
    /// A category may carry any number of group tags.
    GroupTag
);

string_id!(
    /// The name of an asset registry (`objaverse`, `lightwheel`, ...).
    RegistryName
);

string_id!(
    /// A scene-unique slot name, e.g. `obj`, `container`, `obj_container`.
    SlotName
);

string_id!(
    /// A model file path inside an asset registry.
    AssetPath
);

impl SlotName {
    /// The conventional name of the container synthesized for this slot.
    pub fn container_slot(&self) -> SlotName {
        SlotName(format!("{}_container", self.0))
    }
}

impl AssetPath {
    /// Whether a raw query string names a model file rather than a
    /// category or group.
    pub fn looks_like_path(raw: &str) -> bool {
        raw.ends_with(".xml") || raw.contains('/')
    }
}

/// Index of a discrete spawn site ("level", "shelf", "rack") on a
/// multi-level container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteId(pub u32);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SiteId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Handle to a model produced by the asset factory.
///
/// The handle is opaque to this layer; it is only passed back to the
/// simulation when building the scene graph.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelHandle(pub u64);

impl fmt::Display for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn container_slot_appends_suffix() {
        assert_eq!(SlotName::from("obj").container_slot().as_str(), "obj_container");
    }

    #[test]
    fn names_look_up_by_str() {
        let mut map: IndexMap<Category, u32> = IndexMap::new();
        map.insert(Category::from("apple"), 1);
        assert_eq!(map.get("apple"), Some(&1));
    }

    #[test]
    fn path_detection() {
        assert!(AssetPath::looks_like_path("objects/sketchfab/dish_rack/dish_rack_0/model.xml"));
        assert!(!AssetPath::looks_like_path("dish_rack"));
    }
}
