//! Natural-language episode instructions.

use tabletop_core::{DoorBehavior, PowerBehavior, SiteId};

/// Readable form of a category name.
pub fn humanize(category: &str) -> String {
    category.replace('_', " ")
}

fn place_name(container: Option<&str>) -> String {
    container.map_or_else(|| "counter".to_owned(), humanize)
}

/// `pick the {obj} from the {source} and place it in the {target}`; a
/// missing container reads as the counter.
pub fn pick_and_place(obj: &str, source: Option<&str>, target: Option<&str>) -> String {
    format!(
        "pick the {} from the {} and place it in the {}",
        humanize(obj),
        place_name(source),
        place_name(target)
    )
}

/// Placement on a numbered level. Levels count from 1.
pub fn pick_and_place_on_level(
    obj: &str,
    source: Option<&str>,
    container: &str,
    site: SiteId,
) -> String {
    format!(
        "pick the {} from the {} and place it on the level #{} of the {}",
        humanize(obj),
        place_name(source),
        site.0 + 1,
        humanize(container)
    )
}

/// Fill the `{obj}` placeholder of a fixed template.
pub fn fill_template(template: &str, obj: &str) -> String {
    template.replace("{obj}", &humanize(obj))
}

/// Objects in order into one container.
pub fn in_sequence(objs: &[String], container: &str) -> String {
    let container = humanize(container);
    let names: Vec<String> = objs.iter().map(|o| humanize(o)).collect();
    match names.as_slice() {
        [] => format!("put everything into the {container}"),
        [only] => format!("put the {only} into the {container}"),
        [first, middle @ .., last] => {
            let mut out = format!("put the {first}");
            for m in middle {
                out.push_str(&format!(", then the {m}"));
            }
            out.push_str(&format!(", and finally the {last} into the {container}"));
            out
        }
    }
}

/// Place into a fixture and operate its door.
pub fn into_fixture(obj: &str, label: &str, behavior: DoorBehavior) -> String {
    let verb = match behavior {
        DoorBehavior::Open => "open",
        DoorBehavior::Close => "close",
    };
    format!(
        "pick up the {}, place it into the {label} and {verb} the {label}",
        humanize(obj)
    )
}

/// Open or close a door.
pub fn door(label: &str, behavior: DoorBehavior) -> String {
    format!("{behavior} the {label} door")
}

/// Press a microwave button.
pub fn microwave(behavior: PowerBehavior) -> String {
    let button = match behavior {
        PowerBehavior::TurnOn => "start",
        PowerBehavior::TurnOff => "stop",
    };
    format!("press the {button} button on the microwave")
}

/// Open or close a laptop lid.
pub fn laptop(behavior: DoorBehavior) -> String {
    format!("{behavior} lid of the laptop")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_containers_read_as_counter() {
        assert_eq!(
            pick_and_place("sweet_potato", None, Some("cutting_board")),
            "pick the sweet potato from the counter and place it in the cutting board"
        );
        assert_eq!(
            pick_and_place("onion", Some("plate"), None),
            "pick the onion from the plate and place it in the counter"
        );
    }

    #[test]
    fn levels_count_from_one() {
        assert_eq!(
            pick_and_place_on_level("apple", None, "tiered_shelf", SiteId(0)),
            "pick the apple from the counter and place it on the level #1 of the tiered shelf"
        );
    }

    #[test]
    fn sequences_join_with_then_and_finally() {
        let objs = vec!["carrot".to_owned(), "apple".to_owned(), "can".to_owned()];
        assert_eq!(
            in_sequence(&objs, "basket"),
            "put the carrot, then the apple, and finally the can into the basket"
        );
        assert_eq!(
            in_sequence(&objs[..2], "plate"),
            "put the carrot, and finally the apple into the plate"
        );
        assert_eq!(in_sequence(&objs[..1], "plate"), "put the carrot into the plate");
    }

    #[test]
    fn articulated_phrases() {
        assert_eq!(door("cabinet", DoorBehavior::Close), "close the cabinet door");
        assert_eq!(
            microwave(PowerBehavior::TurnOff),
            "press the stop button on the microwave"
        );
        assert_eq!(laptop(DoorBehavior::Open), "open lid of the laptop");
        assert_eq!(
            into_fixture("bottled_water", "drawer", DoorBehavior::Close),
            "pick up the bottled water, place it into the drawer and close the drawer"
        );
    }

    #[test]
    fn template_fills_object() {
        assert_eq!(
            fill_template("pick the {obj} from the bowl and place it on the empty plate", "bell_pepper"),
            "pick the bell pepper from the bowl and place it on the empty plate"
        );
    }
}
