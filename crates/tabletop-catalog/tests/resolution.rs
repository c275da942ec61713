//! Property tests for category resolution over a mixed catalog.

use proptest::prelude::*;
use tabletop_catalog::{Catalog, CategoryRecord, CategoryResolver, GroupQuery, ResolveFilter};
use tabletop_core::{rng_from_seed, Category, InstanceSplit};

const NAMES: &[(&str, &str)] = &[
    ("apple", "fruit"),
    ("pear", "fruit"),
    ("lemon", "fruit"),
    ("carrot", "vegetable"),
    ("onion", "vegetable"),
    ("croissant", "bread_food"),
    ("milk", "drink"),
    ("can", "drink"),
];

fn catalog() -> Catalog {
    Catalog::from_records(NAMES.iter().enumerate().map(|(i, (name, group))| {
        CategoryRecord::new(*name, "objaverse")
            .with_groups([*group, "in_container"])
            .graspable()
            .with_instance_count(1 + i % 4)
    }))
    .unwrap()
}

proptest! {
    #[test]
    fn never_returns_an_excluded_category(
        seed in any::<u64>(),
        excluded in proptest::collection::vec(0usize..8, 0..8),
    ) {
        let catalog = catalog();
        let resolver = CategoryResolver::new(&catalog);
        let filter = ResolveFilter {
            exclude_categories: excluded.iter().map(|&i| Category::from(NAMES[i].0)).collect(),
            ..Default::default()
        };
        let mut rng = rng_from_seed(seed);
        match resolver.resolve(&GroupQuery::from("all"), &filter, &mut rng) {
            Ok(res) => prop_assert!(!filter.exclude_categories.contains(&res.category)),
            Err(_) => prop_assert_eq!(filter.exclude_categories.len(), NAMES.len()),
        }
    }

    #[test]
    fn excluded_groups_never_appear(seed in any::<u64>()) {
        let catalog = catalog();
        let resolver = CategoryResolver::new(&catalog);
        let filter = ResolveFilter {
            exclude_groups: vec!["drink".into()],
            ..Default::default()
        };
        let mut rng = rng_from_seed(seed);
        let res = resolver.resolve(&GroupQuery::from("all"), &filter, &mut rng).unwrap();
        prop_assert!(!res.groups.iter().any(|g| g.as_str() == "drink"));
    }

    #[test]
    fn split_instances_stay_in_split(seed in any::<u64>()) {
        let catalog = catalog();
        let resolver = CategoryResolver::new(&catalog);
        for split in [InstanceSplit::A, InstanceSplit::B] {
            let filter = ResolveFilter { split: Some(split), ..Default::default() };
            let mut rng = rng_from_seed(seed);
            let res = resolver.resolve(&GroupQuery::from("all"), &filter, &mut rng).unwrap();
            let record = catalog.get(res.category.as_str()).unwrap();
            let instance = res.instance.unwrap();
            let idx = record.instances.iter().position(|p| *p == instance).unwrap();
            prop_assert!(split.range(record.instances.len()).contains(&idx));
        }
    }
}
