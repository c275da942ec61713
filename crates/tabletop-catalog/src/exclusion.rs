//! Exclusion rules over (object group, source, target) triples and the
//! container similarity table.

use std::fmt;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use tabletop_core::{Category, ConfigError};

/// One position of an exclusion rule.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// `*`: matches anything.
    Any,
    /// Matches one exact name.
    Exact(String),
}

impl Pattern {
    /// Whether `value` matches.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(v) => v == value,
        }
    }
}

impl From<&str> for Pattern {
    fn from(v: &str) -> Self {
        if v == "*" {
            Self::Any
        } else {
            Self::Exact(v.to_owned())
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(v) => f.write_str(v),
        }
    }
}

/// A forbidden `(object group, source container, target container)`
/// combination.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExclusionRule {
    /// Object group position.
    pub obj: Pattern,
    /// Source container position.
    pub source: Pattern,
    /// Target container position.
    pub target: Pattern,
}

impl ExclusionRule {
    /// Build from three strings, `*` meaning wildcard.
    pub fn new(obj: &str, source: &str, target: &str) -> Self {
        Self {
            obj: obj.into(),
            source: source.into(),
            target: target.into(),
        }
    }

    /// Whether the rule matches the triple.
    pub fn matches(&self, obj: &str, source: &str, target: &str) -> bool {
        self.obj.matches(obj) && self.source.matches(source) && self.target.matches(target)
    }
}

impl FromStr for ExclusionRule {
    type Err = ConfigError;

    /// Parses `obj,source,target`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [o, src, tgt] => Ok(Self::new(o, src, tgt)),
            _ => Err(ConfigError::InvalidCatalog {
                reason: format!("exclusion rule '{s}' must have three fields"),
            }),
        }
    }
}

/// Whether any rule excludes the triple.
pub fn is_excluded(obj: &str, source: &str, target: &str, rules: &[ExclusionRule]) -> bool {
    rules.iter().any(|r| r.matches(obj, source, target))
}

/// Container pairs excluded for `obj` under `rules`, in source-major
/// order.
pub fn excluded_container_combos(
    obj: &str,
    sources: &[Category],
    targets: &[Category],
    rules: &[ExclusionRule],
) -> Vec<(Category, Category)> {
    let mut out = Vec::new();
    for s in sources {
        for t in targets {
            if is_excluded(obj, s.as_str(), t.as_str(), rules) {
                out.push((s.clone(), t.clone()));
            }
        }
    }
    out
}

/// Every allowed `(source, target)` pair not in `held_out`, in
/// source-major order. A pair is allowed unless a rule excludes it for
/// every object group (`*`).
pub fn complement_combos(
    sources: &[Category],
    targets: &[Category],
    rules: &[ExclusionRule],
    held_out: &[(Category, Category)],
) -> Vec<(Category, Category)> {
    let mut out = Vec::new();
    for s in sources {
        for t in targets {
            if is_excluded("*", s.as_str(), t.as_str(), rules) {
                continue;
            }
            let pair = (s.clone(), t.clone());
            if !held_out.contains(&pair) {
                out.push(pair);
            }
        }
    }
    out
}

/// Symmetric "looks alike" relation between containers.
///
/// Built from one-directional declarations; if A lists B, then B lists A.
/// Not transitive: A~B and B~C does not imply A~C.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimilarityTable {
    similar: IndexMap<Category, IndexSet<Category>>,
}

impl SimilarityTable {
    /// Build from `(container, look-alikes)` declarations.
    pub fn from_declarations<I, K, V>(decls: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: Into<Category>,
        V: Into<Category>,
    {
        let mut similar: IndexMap<Category, IndexSet<Category>> = IndexMap::new();
        for (key, values) in decls {
            let key = key.into();
            for v in values {
                let v = v.into();
                if v == key {
                    continue;
                }
                similar.entry(key.clone()).or_default().insert(v.clone());
                similar.entry(v).or_default().insert(key.clone());
            }
        }
        Self { similar }
    }

    /// Look-alikes of `container`, not including itself.
    pub fn similar_to(&self, container: &str) -> impl Iterator<Item = &Category> {
        self.similar.get(container).into_iter().flatten()
    }

    /// Whether `a` and `b` are declared look-alikes.
    pub fn are_similar(&self, a: &str, b: &str) -> bool {
        self.similar
            .get(a)
            .is_some_and(|set| set.contains(b))
    }

    /// `container` followed by its look-alikes.
    pub fn expand_similar(&self, container: &str) -> IndexSet<Category> {
        let mut out = IndexSet::new();
        out.insert(Category::from(container));
        out.extend(self.similar_to(container).cloned());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cats(names: &[&str]) -> Vec<Category> {
        names.iter().map(|&n| Category::from(n)).collect()
    }

    #[test]
    fn wildcard_matches_any_position() {
        let rules = vec![ExclusionRule::new("*", "plate", "*")];
        assert!(is_excluded("fruit", "plate", "bowl", &rules));
        assert!(is_excluded("drink", "plate", "pan", &rules));
        assert!(!is_excluded("fruit", "tray", "plate", &rules));
    }

    #[test]
    fn no_rules_excludes_nothing() {
        assert!(!is_excluded("*", "a", "b", &[]));
    }

    #[test]
    fn parses_rule() {
        let r: ExclusionRule = "drink, *, pan".parse().unwrap();
        assert_eq!(r, ExclusionRule::new("drink", "*", "pan"));
        assert!("a,b".parse::<ExclusionRule>().is_err());
    }

    #[test]
    fn complement_removes_held_out_and_excluded() {
        let sources = cats(&["tray", "plate"]);
        let targets = cats(&["bowl", "pan"]);
        let rules = vec![ExclusionRule::new("*", "plate", "pan")];
        let held = vec![(Category::from("tray"), Category::from("bowl"))];
        let base = complement_combos(&sources, &targets, &rules, &held);
        assert_eq!(
            base,
            vec![
                (Category::from("tray"), Category::from("pan")),
                (Category::from("plate"), Category::from("bowl")),
            ]
        );
    }

    #[test]
    fn excluded_combos_lists_matches() {
        let rules = vec![ExclusionRule::new("drink", "*", "pan")];
        let got = excluded_container_combos(
            "drink",
            &cats(&["tray", "plate"]),
            &cats(&["bowl", "pan"]),
            &rules,
        );
        assert_eq!(got.len(), 2);
        assert!(got.iter().all(|(_, t)| t.as_str() == "pan"));
    }

    #[test]
    fn similarity_is_symmetric_not_transitive() {
        let table = SimilarityTable::from_declarations(vec![
            ("basket", vec!["tiered_basket"]),
            ("tiered_basket", vec!["tiered_shelf"]),
        ]);
        assert!(table.are_similar("tiered_basket", "basket"));
        assert!(table.are_similar("tiered_shelf", "tiered_basket"));
        assert!(!table.are_similar("basket", "tiered_shelf"));
        let expanded_set = table.expand_similar("tiered_basket");
        let expanded: Vec<&str> = expanded_set
            .iter()
            .map(|c| c.as_str())
            .collect();
        assert_eq!(expanded, vec!["tiered_basket", "basket", "tiered_shelf"]);
    }

    #[test]
    fn unknown_container_expands_to_itself() {
        let table = SimilarityTable::default();
        assert_eq!(table.expand_similar("bowl").len(), 1);
    }

    proptest! {
        #[test]
        fn all_wildcard_rule_excludes_everything(
            o in "[a-z]{1,8}", s in "[a-z]{1,8}", t in "[a-z]{1,8}"
        ) {
            let rules = vec![ExclusionRule::new("*", "*", "*")];
            prop_assert!(is_excluded(&o, &s, &t, &rules));
        }

        #[test]
        fn exact_rule_only_matches_itself(
            o in "[a-z]{1,8}", s in "[a-z]{1,8}", t in "[a-z]{1,8}", other in "[a-z]{1,8}"
        ) {
            let rules = vec![ExclusionRule::new(&o, &s, &t)];
            prop_assert!(is_excluded(&o, &s, &t, &rules));
            prop_assert_eq!(is_excluded(&o, &s, &other, &rules), other == t);
        }

        #[test]
        fn declared_similarity_is_symmetric(
            pairs in proptest::collection::vec(("[a-e]", "[a-e]"), 0..12)
        ) {
            let table = SimilarityTable::from_declarations(
                pairs.iter().map(|(a, b)| (a.as_str(), vec![b.as_str()])),
            );
            for (a, b) in &pairs {
                if a != b {
                    prop_assert!(table.are_similar(a, b));
                    prop_assert!(table.are_similar(b, a));
                }
            }
        }
    }
}
