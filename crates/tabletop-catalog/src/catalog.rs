//! The object catalog: every category the asset library can build,
//! with its registry, group tags, and model instances.
//!
//! Iteration order is declaration order, and every random draw over
//! catalog entries happens in that order, so a catalog loaded from the
//! same document always yields the same episode for the same seed.

use indexmap::IndexMap;
use serde::Deserialize;
use smallvec::SmallVec;

use tabletop_core::{AssetPath, Category, ConfigError, GroupTag, RegistryName};

/// The reserved group tag matching every category.
pub const ALL_GROUP: &str = "all";

/// The group tag marking objects that may be placed inside containers.
pub const IN_CONTAINER_GROUP: &str = "in_container";

/// One object category.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CategoryRecord {
    /// Category name.
    pub name: Category,
    /// Registry the category's models come from.
    pub registry: RegistryName,
    /// Group tags.
    #[serde(default)]
    pub groups: SmallVec<[GroupTag; 4]>,
    /// Whether a robot gripper can pick the object up.
    #[serde(default)]
    pub graspable: bool,
    /// Model files, in a fixed order that defines the instance splits.
    #[serde(default)]
    pub instances: Vec<AssetPath>,
}

impl CategoryRecord {
    /// Start a record with no groups and no instances.
    pub fn new(name: impl Into<Category>, registry: impl Into<RegistryName>) -> Self {
        Self {
            name: name.into(),
            registry: registry.into(),
            groups: SmallVec::new(),
            graspable: false,
            instances: Vec::new(),
        }
    }

    /// Add group tags.
    pub fn with_groups<I, G>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<GroupTag>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    /// Mark the category graspable.
    pub fn graspable(mut self) -> Self {
        self.graspable = true;
        self
    }

    /// Add `n` instances with conventional paths
    /// (`objects/<registry>/<name>/<name>_<i>/model.xml`).
    pub fn with_instance_count(mut self, n: usize) -> Self {
        let start = self.instances.len();
        for i in start..start + n {
            self.instances.push(AssetPath::new(format!(
                "objects/{}/{}/{}_{}/model.xml",
                self.registry, self.name, self.name, i
            )));
        }
        self
    }

    /// Whether the category carries `group` (or `group` is [`ALL_GROUP`]).
    pub fn has_group(&self, group: &str) -> bool {
        group == ALL_GROUP || self.groups.iter().any(|g| g.as_str() == group)
    }
}

#[derive(Deserialize)]
struct CatalogDocument {
    categories: Vec<CategoryRecord>,
}

/// An ordered collection of [`CategoryRecord`]s keyed by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    categories: IndexMap<Category, CategoryRecord>,
}

impl Catalog {
    /// Build from records, rejecting duplicate names.
    pub fn from_records(
        records: impl IntoIterator<Item = CategoryRecord>,
    ) -> Result<Self, ConfigError> {
        let mut categories = IndexMap::new();
        for record in records {
            if record.name.as_str().is_empty() {
                return Err(ConfigError::InvalidCatalog {
                    reason: "category with empty name".into(),
                });
            }
            if categories.contains_key(&record.name) {
                return Err(ConfigError::InvalidCatalog {
                    reason: format!("duplicate category '{}'", record.name),
                });
            }
            categories.insert(record.name.clone(), record);
        }
        Ok(Self { categories })
    }

    /// Parse a JSON document of the form `{"categories": [...]}`.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let doc: CatalogDocument =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidCatalog {
                reason: e.to_string(),
            })?;
        Self::from_records(doc.categories)
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Look up a category.
    pub fn get(&self, name: &str) -> Option<&CategoryRecord> {
        self.categories.get(name)
    }

    /// Whether `name` is a category.
    pub fn contains(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    /// All records in declaration order.
    pub fn records(&self) -> impl Iterator<Item = &CategoryRecord> {
        self.categories.values()
    }

    /// Whether any category carries `group`.
    pub fn is_group(&self, group: &str) -> bool {
        group == ALL_GROUP || self.records().any(|r| r.has_group(group))
    }

    /// The category owning a model file, if any.
    pub fn find_instance(&self, path: &str) -> Option<&CategoryRecord> {
        self.records()
            .find(|r| r.instances.iter().any(|p| p.as_str() == path))
    }

    /// Group tags of a category; empty for unknown categories.
    pub fn groups_of(&self, name: &str) -> &[GroupTag] {
        self.get(name).map(|r| r.groups.as_slice()).unwrap_or(&[])
    }

    /// Graspable categories belonging to any of `groups`, restricted to
    /// `registries` when non-empty. Declaration order, no duplicates.
    pub fn graspable_in_groups(
        &self,
        groups: &[&str],
        registries: &[RegistryName],
    ) -> Vec<Category> {
        self.records()
            .filter(|r| r.graspable)
            .filter(|r| registries.is_empty() || registries.contains(&r.registry))
            .filter(|r| groups.iter().any(|g| r.has_group(g)))
            .map(|r| r.name.clone())
            .collect()
    }
}
