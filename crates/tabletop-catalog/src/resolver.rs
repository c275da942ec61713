//! Category/group resolution.
//!
//! [`CategoryResolver::resolve`] expands a [`GroupQuery`] into candidate
//! categories, applies a [`ResolveFilter`], and draws one candidate with
//! the caller's generator. Candidates are kept in catalog order before
//! the draw, so the same generator state always picks the same category.

use indexmap::{IndexMap, IndexSet};
use rand::Rng;
use smallvec::SmallVec;
use tracing::trace;

use tabletop_core::{
    AssetPath, Category, EpisodeRng, GroupTag, InstanceSplit, RegistryName, ResolveError,
};

use crate::catalog::{Catalog, CategoryRecord, ALL_GROUP};
use crate::query::GroupQuery;

/// Constraints applied after query expansion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolveFilter {
    /// Categories that may not be chosen.
    pub exclude_categories: IndexSet<Category>,
    /// Categories carrying any of these groups may not be chosen.
    pub exclude_groups: Vec<GroupTag>,
    /// Chosen categories must carry all of these groups.
    pub require_groups: Vec<GroupTag>,
    /// Allowed registries; empty allows all.
    pub registries: Vec<RegistryName>,
    /// Only graspable categories.
    pub graspable: bool,
    /// Restrict instance sampling to one split.
    pub split: Option<InstanceSplit>,
}

impl ResolveFilter {
    fn admits(&self, record: &CategoryRecord, pinned: bool) -> bool {
        if self.exclude_categories.contains(&record.name) {
            return false;
        }
        if self
            .exclude_groups
            .iter()
            .any(|g| record.has_group(g.as_str()))
        {
            return false;
        }
        if !self
            .require_groups
            .iter()
            .all(|g| record.has_group(g.as_str()))
        {
            return false;
        }
        if self.graspable && !record.graspable {
            return false;
        }
        if pinned {
            return true;
        }
        if !self.registries.is_empty() && !self.registries.contains(&record.registry) {
            return false;
        }
        match self.split {
            Some(split) => !split.range(record.instances.len()).is_empty(),
            None => true,
        }
    }
}

/// The outcome of a successful resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    /// The chosen category.
    pub category: Category,
    /// The chosen model file, when the category lists instances.
    pub instance: Option<AssetPath>,
    /// The category's group tags.
    pub groups: SmallVec<[GroupTag; 4]>,
}

/// Resolves group queries against a [`Catalog`].
#[derive(Clone, Copy, Debug)]
pub struct CategoryResolver<'c> {
    catalog: &'c Catalog,
}

impl<'c> CategoryResolver<'c> {
    /// Resolver over `catalog`.
    pub fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    /// The catalog being resolved against.
    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    /// Expand a query to candidates, in catalog order, without filtering.
    ///
    /// A path-pinned candidate carries its instance.
    fn expand(&self, query: &GroupQuery) -> IndexMap<Category, Option<AssetPath>> {
        let mut out: IndexMap<Category, Option<AssetPath>> = IndexMap::new();
        let names = query.names();
        let mut wanted_groups: Vec<&str> = Vec::new();
        let mut wanted_cats: Vec<&str> = Vec::new();
        for name in names {
            if AssetPath::looks_like_path(name) {
                if let Some(record) = self.catalog.find_instance(name) {
                    out.entry(record.name.clone())
                        .or_insert_with(|| Some(AssetPath::new(name.as_str())));
                }
            } else if name == ALL_GROUP || !self.catalog.contains(name) {
                wanted_groups.push(name);
            } else {
                wanted_cats.push(name);
            }
        }
        for record in self.catalog.records() {
            let named = wanted_cats.contains(&record.name.as_str());
            let grouped = wanted_groups.iter().any(|g| record.has_group(g));
            if named || grouped {
                out.entry(record.name.clone()).or_insert(None);
            }
        }
        out
    }

    /// Candidate categories after filtering, in draw order.
    pub fn candidates(
        &self,
        query: &GroupQuery,
        filter: &ResolveFilter,
    ) -> Result<Vec<(Category, Option<AssetPath>)>, ResolveError> {
        if let GroupQuery::SameAs(slot) = query {
            return Err(ResolveError::UnresolvedReference { slot: slot.clone() });
        }
        let mut kept = Vec::new();
        for (category, pinned) in self.expand(query) {
            let Some(record) = self.catalog.get(category.as_str()) else {
                continue;
            };
            if filter.admits(record, pinned.is_some()) {
                kept.push((category, pinned));
            }
        }
        Ok(kept)
    }

    /// Resolve `query` to one category and instance.
    ///
    /// Returns [`ResolveError::NoValidCategory`] when filtering leaves no
    /// candidate. Consumes one draw for the category and one for the
    /// instance (when the category lists instances).
    pub fn resolve(
        &self,
        query: &GroupQuery,
        filter: &ResolveFilter,
        rng: &mut EpisodeRng,
    ) -> Result<Resolution, ResolveError> {
        let candidates = self.candidates(query, filter)?;
        if candidates.is_empty() {
            return Err(ResolveError::NoValidCategory {
                query: query.to_string(),
            });
        }
        let idx = rng.random_range(0..candidates.len());
        let (category, pinned) = candidates[idx].clone();
        let record = self
            .catalog
            .get(category.as_str())
            .ok_or_else(|| ResolveError::NoValidCategory {
                query: query.to_string(),
            })?;

        let instance = match pinned {
            Some(path) => Some(path),
            None => {
                let range = match filter.split {
                    Some(split) => split.range(record.instances.len()),
                    None => 0..record.instances.len(),
                };
                if range.is_empty() {
                    None
                } else {
                    let pick = range.start + rng.random_range(0..range.len());
                    Some(record.instances[pick].clone())
                }
            }
        };
        trace!(%query, %category, candidates = candidates.len(), "resolved category");

        Ok(Resolution {
            category,
            instance,
            groups: record.groups.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabletop_core::rng_from_seed;

    fn catalog() -> Catalog {
        Catalog::from_records(vec![
            CategoryRecord::new("apple", "objaverse")
                .with_groups(["fruit", "in_container"])
                .graspable()
                .with_instance_count(4),
            CategoryRecord::new("pear", "objaverse")
                .with_groups(["fruit", "in_container"])
                .graspable()
                .with_instance_count(1),
            CategoryRecord::new("carrot", "lightwheel")
                .with_groups(["vegetable", "in_container"])
                .graspable()
                .with_instance_count(2),
            CategoryRecord::new("milk", "objaverse")
                .with_groups(["drink"])
                .graspable()
                .with_instance_count(2),
            CategoryRecord::new("bowl", "objaverse").with_instance_count(2),
        ])
        .unwrap()
    }

    fn names(c: &[(Category, Option<AssetPath>)]) -> Vec<&str> {
        c.iter().map(|(c, _)| c.as_str()).collect()
    }

    #[test]
    fn group_expands_in_catalog_order() {
        let cat = catalog();
        let r = CategoryResolver::new(&cat);
        let got = r
            .candidates(&GroupQuery::from("fruit"), &ResolveFilter::default())
            .unwrap();
        assert_eq!(names(&got), vec!["apple", "pear"]);
    }

    #[test]
    fn union_mixes_categories_and_groups() {
        let cat = catalog();
        let r = CategoryResolver::new(&cat);
        let got = r
            .candidates(
                &GroupQuery::any_of(["milk", "vegetable", "pear"]),
                &ResolveFilter::default(),
            )
            .unwrap();
        assert_eq!(names(&got), vec!["pear", "carrot", "milk"]);
    }

    #[test]
    fn all_matches_everything() {
        let cat = catalog();
        let r = CategoryResolver::new(&cat);
        let got = r
            .candidates(&GroupQuery::from("all"), &ResolveFilter::default())
            .unwrap();
        assert_eq!(got.len(), 5);
    }

    #[test]
    fn filters_apply() {
        let cat = catalog();
        let r = CategoryResolver::new(&cat);
        let filter = ResolveFilter {
            exclude_categories: [Category::from("apple")].into_iter().collect(),
            exclude_groups: vec!["drink".into()],
            graspable: true,
            ..Default::default()
        };
        let got = r.candidates(&GroupQuery::from("all"), &filter).unwrap();
        assert_eq!(names(&got), vec!["pear", "carrot"]);

        let filter = ResolveFilter {
            registries: vec!["lightwheel".into()],
            ..Default::default()
        };
        let got = r.candidates(&GroupQuery::from("all"), &filter).unwrap();
        assert_eq!(names(&got), vec!["carrot"]);

        let filter = ResolveFilter {
            require_groups: vec!["in_container".into(), "fruit".into()],
            ..Default::default()
        };
        let got = r.candidates(&GroupQuery::from("all"), &filter).unwrap();
        assert_eq!(names(&got), vec!["apple", "pear"]);
    }

    #[test]
    fn empty_after_filtering_is_no_valid_category() {
        let cat = catalog();
        let r = CategoryResolver::new(&cat);
        let filter = ResolveFilter {
            exclude_categories: [Category::from("milk")].into_iter().collect(),
            ..Default::default()
        };
        let mut rng = rng_from_seed(0);
        match r.resolve(&GroupQuery::from("drink"), &filter, &mut rng) {
            Err(ResolveError::NoValidCategory { query }) => assert_eq!(query, "drink"),
            other => panic!("expected NoValidCategory, got {other:?}"),
        }
    }

    #[test]
    fn unknown_name_resolves_to_nothing() {
        let cat = catalog();
        let r = CategoryResolver::new(&cat);
        let mut rng = rng_from_seed(0);
        assert!(r
            .resolve(&GroupQuery::from("spaceship"), &ResolveFilter::default(), &mut rng)
            .is_err());
    }

    #[test]
    fn split_b_excludes_single_instance_categories() {
        let cat = catalog();
        let r = CategoryResolver::new(&cat);
        let filter = ResolveFilter {
            split: Some(InstanceSplit::B),
            ..Default::default()
        };
        let got = r.candidates(&GroupQuery::from("fruit"), &filter).unwrap();
        assert_eq!(names(&got), vec!["apple"]);
        let mut rng = rng_from_seed(3);
        for _ in 0..20 {
            let res = r.resolve(&GroupQuery::from("fruit"), &filter, &mut rng).unwrap();
            assert_eq!(
                res.instance.as_ref().map(|p| p.as_str()),
                Some("objects/objaverse/apple/apple_3/model.xml")
            );
        }
    }

    #[test]
    fn pinned_path_keeps_instance() {
        let cat = catalog();
        let r = CategoryResolver::new(&cat);
        let mut rng = rng_from_seed(9);
        let path = "objects/objaverse/bowl/bowl_1/model.xml";
        let res = r
            .resolve(&GroupQuery::from(path), &ResolveFilter::default(), &mut rng)
            .unwrap();
        assert_eq!(res.category.as_str(), "bowl");
        assert_eq!(res.instance.as_ref().map(|p| p.as_str()), Some(path));
    }

    #[test]
    fn same_as_must_be_rewritten_first() {
        let cat = catalog();
        let r = CategoryResolver::new(&cat);
        let mut rng = rng_from_seed(0);
        assert!(matches!(
            r.resolve(
                &GroupQuery::SameAs("obj".into()),
                &ResolveFilter::default(),
                &mut rng
            ),
            Err(ResolveError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn same_seed_same_choice() {
        let cat = catalog();
        let r = CategoryResolver::new(&cat);
        let q = GroupQuery::from("all");
        let f = ResolveFilter::default();
        let a: Vec<_> = {
            let mut rng = rng_from_seed(11);
            (0..10).map(|_| r.resolve(&q, &f, &mut rng).unwrap()).collect()
        };
        let b: Vec<_> = {
            let mut rng = rng_from_seed(11);
            (0..10).map(|_| r.resolve(&q, &f, &mut rng).unwrap()).collect()
        };
        assert_eq!(a, b);
    }
}
