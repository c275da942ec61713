//! A reference kitchen catalog.
//!
//! Mirrors the category families the tabletop tasks draw from: graspable
//! food, drinks and toys, the source/target containers of the
//! pick-and-place matrices, and the back-edge clutter items. Every
//! category has at least four instances unless noted, so both instance
//! splits are populated.

use indexmap::IndexMap;
use tabletop_catalog::{Catalog, CategoryRecord};
use tabletop_core::{Category, SiteId, SpawnShape, SpawnSite};

const FOOD: &[(&str, &str, &str, usize)] = &[
    ("apple", "objaverse", "fruit", 8),
    ("pear", "objaverse", "fruit", 4),
    ("lemon", "sketchfab", "fruit", 1),
    ("orange", "objaverse", "fruit", 4),
    ("banana", "lightwheel", "fruit", 4),
    ("peach", "objaverse", "fruit", 4),
    ("onion", "objaverse", "vegetable", 4),
    ("carrot", "lightwheel", "vegetable", 4),
    ("potato", "objaverse", "vegetable", 4),
    ("eggplant", "objaverse", "vegetable", 4),
    ("corn", "objaverse", "vegetable", 4),
    ("tomato", "sketchfab", "vegetable", 4),
    ("bell_pepper", "objaverse", "vegetable", 4),
    ("croissant", "objaverse", "bread_food", 4),
    ("baguette", "objaverse", "bread_food", 4),
    ("bagel", "lightwheel", "bread_food", 4),
    ("cupcake", "objaverse", "pastry", 4),
    ("donut", "objaverse", "pastry", 4),
    ("chocolate", "objaverse", "sweets", 4),
    ("candy", "sketchfab", "sweets", 4),
    ("steak", "objaverse", "meat", 4),
    ("sausage", "objaverse", "meat", 4),
    ("burrito", "objaverse", "cooked_food", 4),
    ("pizza", "lightwheel", "cooked_food", 4),
    ("rubix_cube", "objaverse", "toy", 4),
    ("toy_car", "sketchfab", "toy", 4),
];

const DRINKS: &[&str] = &["milk", "can", "bottled_water", "wine", "bottle"];

const CONTAINERS: &[(&str, &[&str])] = &[
    ("cutting_board", &["receptacle", "board"]),
    ("tray", &["receptacle"]),
    ("plate", &["receptacle", "dish"]),
    ("placemat", &["receptacle", "mat"]),
    ("basket", &["receptacle"]),
    ("pan", &["receptacle", "cookware"]),
    ("pot", &["receptacle", "cookware"]),
    ("bowl", &["receptacle", "dish"]),
    ("tiered_shelf", &["receptacle", "shelf"]),
    ("tiered_basket", &["receptacle"]),
    ("cardboard_box", &["receptacle"]),
    ("dish_rack", &["receptacle"]),
    ("bread_basket", &["receptacle"]),
];

const CLUTTER: &[(&str, &str)] = &[
    ("chips", "packaged_food"),
    ("cereal", "packaged_food"),
    ("book", "decoration"),
    ("candle", "decoration"),
];

/// The reference kitchen catalog.
pub fn kitchen_catalog() -> Catalog {
    let mut records = Vec::new();
    for &(name, registry, group, n) in FOOD {
        let mut groups = vec![group, "in_container"];
        if group != "toy" {
            groups.push("food");
        }
        records.push(
            CategoryRecord::new(name, registry)
                .with_groups(groups)
                .graspable()
                .with_instance_count(n),
        );
    }
    for &name in DRINKS {
        let mut groups = vec!["drink", "in_container"];
        if name != "wine" {
            groups.push("cylindrical");
        }
        records.push(
            CategoryRecord::new(name, "objaverse")
                .with_groups(groups)
                .graspable()
                .with_instance_count(4),
        );
    }
    for (name, groups) in [
        ("cup", &["cup", "in_container", "cylindrical"][..]),
        ("mug", &["cup", "in_container", "cylindrical"][..]),
        ("kettle", &["cookware", "in_container"][..]),
    ] {
        records.push(
            CategoryRecord::new(name, "lightwheel")
                .with_groups(groups.iter().copied())
                .graspable()
                .with_instance_count(4),
        );
    }
    for &(name, groups) in CONTAINERS {
        records.push(
            CategoryRecord::new(name, "objaverse")
                .with_groups(groups.iter().copied())
                .with_instance_count(4),
        );
    }
    for &(name, group) in CLUTTER {
        records.push(
            CategoryRecord::new(name, "objaverse")
                .with_groups([group, "in_container"])
                .graspable()
                .with_instance_count(4),
        );
    }
    match Catalog::from_records(records) {
        Ok(catalog) => catalog,
        Err(e) => panic!("reference kitchen catalog is invalid: {e}"),
    }
}

/// `n` stacked box sites, `spacing` metres apart, starting at `base`.
pub fn tiered_sites(n: u32, base: f64, spacing: f64) -> Vec<SpawnSite> {
    (0..n)
        .map(|i| SpawnSite {
            id: SiteId(i),
            name: format!("level{i}"),
            shape: SpawnShape::Box,
            half_size: (0.12, 0.1),
            height: base + spacing * i as f64,
            disabled: false,
        })
        .collect()
}

/// Spawn sites of the multi-level containers in [`kitchen_catalog`].
pub fn kitchen_sites() -> IndexMap<Category, Vec<SpawnSite>> {
    let mut sites = IndexMap::new();
    sites.insert(Category::from("tiered_shelf"), tiered_sites(3, 0.05, 0.2));
    sites.insert(Category::from("tiered_basket"), tiered_sites(2, 0.05, 0.25));
    sites.insert(Category::from("dish_rack"), tiered_sites(2, 0.1, 0.2));
    sites
}
