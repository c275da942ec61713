//! Distractor region templates shared by the task table.

use std::f64::consts::FRAC_PI_2;

use tabletop_core::ConfigError;
use tabletop_scene::{
    CategoryClass, ContainTemplate, ContainerOverrides, CountRange, Mode, RegionPlacement,
    RegionTemplate, SlotTemplate, TypeRef,
};

/// Optional matrix region: a look-alike object inside the source container.
pub const DISTRACTOR_OBJ: &str = "distractor_obj";
/// Optional matrix region: another source container holding an object.
pub const DISTRACTOR_SOURCE: &str = "distractor_source_container";
/// Optional matrix region: a second, different target container.
pub const DISTRACTOR_TARGET: &str = "distractor_target_container";

/// Back-edge clutter with toaster, paper towel and plant fixtures.
pub fn back_edge() -> Result<RegionTemplate, ConfigError> {
    back_edge_fixtures(RegionPlacement {
        center: (0.0, 1.0),
        size: (1.2, 0.4),
        ..Default::default()
    })
}

fn back_edge_fixtures(placement: RegionPlacement) -> Result<RegionTemplate, ConfigError> {
    Ok(RegionTemplate::new("back_edge", placement)
        .fixture(SlotTemplate::literal("toaster", CountRange::new(0, 1)?))
        .fixture(SlotTemplate::literal("paper_towel", CountRange::new(0, 1)?))
        .fixture(SlotTemplate::literal("plant", CountRange::new(1, 2)?)))
}

/// [`back_edge`] with object slots added.
pub fn back_edge_with(objects: &[(&str, u32, u32)]) -> Result<RegionTemplate, ConfigError> {
    add_objects(back_edge()?, objects)
}

/// A region holding only objects. Each entry is `(query, min, max)`.
pub fn object_region(
    key: &str,
    center: (f64, f64),
    size: (f64, f64),
    objects: &[(&str, u32, u32)],
) -> Result<RegionTemplate, ConfigError> {
    let placement = RegionPlacement {
        center,
        size,
        ..Default::default()
    };
    add_objects(RegionTemplate::new(key, placement), objects)
}

fn add_objects(
    mut region: RegionTemplate,
    objects: &[(&str, u32, u32)],
) -> Result<RegionTemplate, ConfigError> {
    for &(query, min, max) in objects {
        region = region.object(SlotTemplate::literal(query, CountRange::new(min, max)?));
    }
    Ok(region)
}

/// Back edge of the drawer tasks: toaster and plant, plus vegetables.
pub fn drawer_back_edge() -> Result<RegionTemplate, ConfigError> {
    let placement = RegionPlacement {
        center: (0.0, 1.0),
        size: (1.2, 0.4),
        ..Default::default()
    };
    Ok(RegionTemplate::new("back_edge", placement)
        .fixture(SlotTemplate::literal("toaster", CountRange::new(0, 1)?))
        .fixture(SlotTemplate::literal("plant", CountRange::new(0, 1)?))
        .object(SlotTemplate::one_of(["vegetable"], CountRange::new(1, 4)?)))
}

/// Left and right table edges of the laptop tasks.
pub fn laptop_edges() -> Result<Vec<RegionTemplate>, ConfigError> {
    let edge = |key: &str, x: f64| -> Result<RegionTemplate, ConfigError> {
        let placement = RegionPlacement {
            center: (x, 0.0),
            size: (0.4, 1.2),
            ..Default::default()
        };
        Ok(RegionTemplate::new(key, placement)
            .fixture(SlotTemplate::literal("toaster", CountRange::new(0, 1)?))
            .fixture(SlotTemplate::literal("paper_towel", CountRange::new(0, 1)?))
            .fixture(SlotTemplate::literal("plant", CountRange::new(0, 1)?)))
    };
    Ok(vec![edge("left_edge", -1.0)?, edge("right_edge", 1.0)?])
}

// ── Combination matrices ───────────────────────────────────────────

/// The fixed back edge of the combination matrices. Fixture and clutter
/// types are picked once per task.
pub fn matrix_back_edge() -> Result<RegionTemplate, ConfigError> {
    let placement = RegionPlacement {
        center: (0.0, 0.9),
        size: (1.0, 0.1),
        rotation: Some((FRAC_PI_2, FRAC_PI_2)),
        avoid: vec!["container".into(), "obj_container".into()],
        boundary_containment: false,
        ensure_out_of_ref_region: true,
        ..Default::default()
    };
    Ok(RegionTemplate::new("back_edge", placement)
        .fixture(SlotTemplate::one_of(["toaster"], CountRange::new(0, 1)?))
        .fixture(SlotTemplate::one_of(["plant"], CountRange::new(0, 1)?))
        .object(SlotTemplate::one_of(
            ["chips", "cereal", "book", "candle"],
            CountRange::new(0, 1)?,
        )))
}

/// The three optional regions of the combination matrices, in the order
/// they are considered for inclusion.
pub fn matrix_optional() -> Vec<RegionTemplate> {
    let obj = RegionTemplate::new(
        DISTRACTOR_OBJ,
        RegionPlacement {
            contain: Some(ContainTemplate::Existing("obj_container".into())),
            ensure_in_ref_region: true,
            boundary_containment: false,
            ..Default::default()
        },
    )
    .object(
        SlotTemplate::symbolic(CategoryClass::Obj, Mode::Distractor, CountRange::exactly(1))
            .excluding_groups(["drink"]),
    );

    let source = RegionTemplate::new(
        DISTRACTOR_SOURCE,
        RegionPlacement {
            center: (0.0, -0.6),
            size: (1.1, 0.45),
            contain: Some(ContainTemplate::New(TypeRef::Symbolic(
                CategoryClass::SourceContainer,
                Mode::Distractor,
            ))),
            ensure_in_ref_region: true,
            boundary_containment: false,
            container_overrides: ContainerOverrides {
                exclude_obj_cat: Some(true),
                scale: None,
            },
            ..Default::default()
        },
    )
    .object(
        SlotTemplate::symbolic(CategoryClass::Obj, Mode::Any, CountRange::exactly(1))
            .excluding_groups(["drink"])
            .exclude_obj_cat(false),
    );

    let target = RegionTemplate::new(
        DISTRACTOR_TARGET,
        RegionPlacement {
            center: (0.0, -0.6),
            size: (1.1, 0.45),
            boundary_containment: false,
            ..Default::default()
        },
    )
    .object(SlotTemplate::symbolic(
        CategoryClass::TargetContainer,
        Mode::Distractor,
        CountRange::exactly(1),
    ));

    vec![obj, source, target]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn back_edge_fixture_counts() {
        let region = back_edge().unwrap();
        assert_eq!(region.key, "back_edge");
        assert_eq!(region.fixtures.len(), 3);
        assert_eq!(region.fixtures[2].count, CountRange::new(1, 2).unwrap());
        assert!(region.objects.is_empty());
    }

    #[test]
    fn inverted_counts_are_rejected() {
        match object_region("center", (0.0, 0.0), (1.0, 1.0), &[("fruit", 3, 1)]) {
            Err(ConfigError::InvalidCountRange { min: 3, max: 1 }) => {}
            other => panic!("expected InvalidCountRange, got {other:?}"),
        }
    }

    #[test]
    fn matrix_regions_are_keyed() {
        let keys: Vec<String> = matrix_optional().into_iter().map(|r| r.key).collect();
        assert_eq!(keys, [DISTRACTOR_OBJ, DISTRACTOR_SOURCE, DISTRACTOR_TARGET]);
        let back = matrix_back_edge().unwrap();
        assert_eq!(back.placement.avoid.len(), 2);
        assert!(back.placement.ensure_out_of_ref_region);
    }
}
