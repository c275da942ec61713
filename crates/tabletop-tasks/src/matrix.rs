//! Generated pick-and-place task matrices.
//!
//! A matrix crosses a pool of object categories with a list of
//! `(source container, target container)` combinations. Each combination
//! becomes one [`TaskDefinition`] named
//! `{prefix}From{Source}To{Target}{postfix}`, laid out with the sampled
//! matrix positions and cluttered with the matrix back edge plus a
//! per-combination choice of the three optional distractor regions.
//!
//! [`generate_task_definitions`] builds the standard suite: the pretrain
//! base and novel sets, posttrain, eval on the held-out instance split, a
//! fruit-only posttrain set that always carries a look-alike object, and
//! the five-combination set without distractors.

use indexmap::{IndexMap, IndexSet};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tabletop_catalog::{
    complement_combos, Catalog, ExclusionRule, GroupQuery, SimilarityTable,
};
use tabletop_core::{Category, ConfigError, EpisodeRng, InstanceSplit, RegistryName};
use tabletop_scene::{RegionSelection, ScaleSpec};
use tabletop_success::ReceptacleRegion;
use tracing::debug;

use crate::definition::{
    DistractorSetup, MatrixFocus, PlaceGoal, PnpLayout, PnpTask, TaskDefinition, TaskKind,
};
use crate::layout::{obj_scale, OBJ_SCALES};
use crate::regions::{
    matrix_back_edge, matrix_optional, DISTRACTOR_OBJ as OBJ, DISTRACTOR_SOURCE as SOURCE,
    DISTRACTOR_TARGET as TARGET,
};

// ── Configuration ──────────────────────────────────────────────────

/// Category pools and container rules shared by every matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskMatrixConfig {
    /// Registries task objects are drawn from.
    pub registries: Vec<String>,
    /// Groups whose graspable categories make up the object pool.
    pub obj_groups: Vec<String>,
    /// Containers objects start in.
    pub source_containers: Vec<String>,
    /// Containers objects go to.
    pub target_containers: Vec<String>,
    /// Forbidden combinations as `obj,source,target`; `*` matches anything.
    pub exclude_combos: Vec<String>,
    /// Container look-alikes, one direction per entry.
    pub similar_containers: IndexMap<String, Vec<String>>,
}

impl Default for TaskMatrixConfig {
    fn default() -> Self {
        let strings = |v: &[&str]| v.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>();
        let similar = [
            ("tray", &["cutting_board"][..]),
            ("cutting_board", &["tray"][..]),
            ("basket", &["tiered_basket"][..]),
            ("tiered_basket", &["basket", "tiered_shelf"][..]),
            ("tiered_shelf", &["tiered_basket"][..]),
            ("pot", &["pan"][..]),
            ("pan", &["pot"][..]),
        ];
        Self {
            registries: strings(&["objaverse", "sketchfab", "lightwheel"]),
            obj_groups: strings(&[
                "vegetable",
                "bread_food",
                "pastry",
                "sweets",
                "fruit",
                "meat",
                "drink",
                "cooked_food",
                "toy",
            ]),
            source_containers: strings(&["cutting_board", "tray", "plate", "placemat"]),
            target_containers: strings(&[
                "basket",
                "pan",
                "pot",
                "bowl",
                "plate",
                "tiered_shelf",
                "tiered_basket",
                "cardboard_box",
            ]),
            exclude_combos: Vec::new(),
            similar_containers: similar
                .into_iter()
                .map(|(k, v)| (k.to_owned(), strings(v)))
                .collect(),
        }
    }
}

impl TaskMatrixConfig {
    /// Parse a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMatrix`] if the document does not
    /// parse or fails [`TaskMatrixConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::InvalidMatrix {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every pool is populated and every rule parses.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMatrix`] naming the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, pool) in [
            ("obj_groups", &self.obj_groups),
            ("source_containers", &self.source_containers),
            ("target_containers", &self.target_containers),
        ] {
            if pool.is_empty() {
                return Err(ConfigError::InvalidMatrix {
                    reason: format!("{name} must not be empty"),
                });
            }
        }
        self.exclusion_rules().map(|_| ())
    }

    /// The parsed exclusion rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMatrix`] for a rule without three
    /// fields.
    pub fn exclusion_rules(&self) -> Result<Vec<ExclusionRule>, ConfigError> {
        self.exclude_combos
            .iter()
            .map(|rule| {
                rule.parse::<ExclusionRule>()
                    .map_err(|e| ConfigError::InvalidMatrix {
                        reason: e.to_string(),
                    })
            })
            .collect()
    }

    /// The symmetric similarity table.
    pub fn similarity(&self) -> SimilarityTable {
        SimilarityTable::from_declarations(
            self.similar_containers
                .iter()
                .map(|(k, v)| (k.as_str(), v.iter().map(String::as_str).collect::<Vec<_>>())),
        )
    }

    fn registries(&self) -> Vec<RegistryName> {
        self.registries.iter().map(|r| RegistryName::from(r.as_str())).collect()
    }

    /// Graspable categories of the configured groups, minus `held_out`.
    pub fn base_obj_cats(&self, catalog: &Catalog, held_out: &[&str]) -> Vec<Category> {
        let groups: Vec<&str> = self.obj_groups.iter().map(String::as_str).collect();
        catalog
            .graspable_in_groups(&groups, &self.registries())
            .into_iter()
            .filter(|c| !held_out.contains(&c.as_str()))
            .collect()
    }

    /// Every allowed container combination not in `held_out`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMatrix`] if an exclusion rule does not
    /// parse.
    pub fn base_combos(
        &self,
        held_out: &[(Category, Category)],
    ) -> Result<Vec<(Category, Category)>, ConfigError> {
        let cats = |v: &[String]| v.iter().map(|s| Category::from(s.as_str())).collect::<Vec<_>>();
        Ok(complement_combos(
            &cats(&self.source_containers),
            &cats(&self.target_containers),
            &self.exclusion_rules()?,
            held_out,
        ))
    }
}

// ── One matrix ─────────────────────────────────────────────────────

/// Optional distractor regions per combination.
pub type DistractorTable = IndexMap<(String, String), Vec<String>>;

/// How a matrix picks its optional distractor regions.
#[derive(Clone, Debug, PartialEq)]
pub enum MatrixDistractors {
    /// No distractors, not even the back edge.
    None,
    /// A coin per optional region, seeded by the task.
    Randomized,
    /// Back edge plus the listed regions of each combination.
    Table(DistractorTable),
}

/// One generated set of tasks.
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixSet {
    /// Name prefix.
    pub prefix: String,
    /// Name suffix.
    pub postfix: Option<String>,
    /// Task object pool; every task draws from all of it.
    pub obj_cats: Vec<Category>,
    /// `(source, target)` combinations, one task each.
    pub combos: Vec<(Category, Category)>,
    /// Distractor region choice.
    pub distractors: MatrixDistractors,
    /// Instance split of every resolved category.
    pub split: Option<InstanceSplit>,
    /// Pool for look-alike objects; the task pool when `None`.
    pub distractor_obj_cats: Option<Vec<Category>>,
}

/// Matrix name component: underscores removed, first letter upper-case.
fn title(name: &str) -> String {
    let joined: String = name.chars().filter(|&c| c != '_').collect();
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Task id of one combination.
pub fn matrix_task_id(prefix: &str, source: &str, target: &str, postfix: Option<&str>) -> String {
    format!(
        "{prefix}From{}To{}{}",
        title(source),
        title(target),
        postfix.unwrap_or("")
    )
}

fn receptacle_for(target: &str) -> ReceptacleRegion {
    match target {
        "tiered_basket" | "tiered_shelf" => ReceptacleRegion::HighestSite,
        _ => ReceptacleRegion::Whole,
    }
}

fn names(cats: &[Category]) -> Vec<String> {
    cats.iter().map(|c| c.as_str().to_owned()).collect()
}

/// Definitions of every combination in `set`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidMatrix`] if a distractor table has no
/// entry for a combination or the config fails validation, and
/// [`ConfigError::InvalidCountRange`] from the region templates.
pub fn generate_matrix(
    config: &TaskMatrixConfig,
    set: &MatrixSet,
) -> Result<Vec<TaskDefinition>, ConfigError> {
    config.validate()?;
    let sources: IndexSet<&Category> = set.combos.iter().map(|(s, _)| s).collect();
    let targets: IndexSet<&Category> = set.combos.iter().map(|(_, t)| t).collect();
    let focus = MatrixFocus {
        obj_pool: names(set.distractor_obj_cats.as_deref().unwrap_or(&set.obj_cats)),
        source_pool: sources.iter().map(|c| c.as_str().to_owned()).collect(),
        target_pool: targets.iter().map(|c| c.as_str().to_owned()).collect(),
        similarity: config.similarity(),
    };
    let registries = config.registries();

    let mut tasks = Vec::with_capacity(set.combos.len());
    for (source, target) in &set.combos {
        let id = matrix_task_id(
            &set.prefix,
            source.as_str(),
            target.as_str(),
            set.postfix.as_deref(),
        );
        let selection = match &set.distractors {
            MatrixDistractors::None => RegionSelection::Disabled,
            MatrixDistractors::Randomized => RegionSelection::Randomized,
            MatrixDistractors::Table(table) => {
                let key = (source.as_str().to_owned(), target.as_str().to_owned());
                let keys = table.get(&key).ok_or_else(|| ConfigError::InvalidMatrix {
                    reason: format!("no distractor entry for ({source}, {target})"),
                })?;
                RegionSelection::Explicit(keys.clone())
            }
        };

        let task = PnpTask {
            obj: GroupQuery::any_of(set.obj_cats.iter().map(|c| c.as_str())),
            exclude_obj_groups: Vec::new(),
            obj_registries: registries.clone(),
            obj_scale: ScaleSpec::per_category(OBJ_SCALES.iter().copied()),
            source: Some(source.as_str().into()),
            target: Some(target.as_str().into()),
            target_scale: obj_scale(target.as_str()).map_or(ScaleSpec::Default, ScaleSpec::Uniform),
            layout: PnpLayout::Sampled,
            receptacle: receptacle_for(target.as_str()),
            goal: PlaceGoal::Receptacle,
            extra_slots: Vec::new(),
            language: None,
            focus: Some(focus.clone()),
        };
        let distractors =
            DistractorSetup::with_optional(vec![matrix_back_edge()?], matrix_optional(), selection);
        tasks.push(
            TaskDefinition::new(id, TaskKind::Pnp(task))
                .with_split(set.split)
                .with_distractors(distractors),
        );
    }
    debug!(prefix = %set.prefix, tasks = tasks.len(), "generated matrix");
    Ok(tasks)
}

// ── The standard suite ─────────────────────────────────────────────

/// Object categories held out of pretraining.
pub const NOVEL_OBJ_CATS: &[&str] = &[
    "sweet_potato",
    "bell_pepper",
    "lemon",
    "croissant",
    "pear",
    "squash",
    "cupcake",
    "can",
    "tomato",
    "eggplant",
];

/// Container combinations held out of pretraining.
pub const NOVEL_COMBOS: &[(&str, &str)] = &[
    ("cutting_board", "pot"),
    ("cutting_board", "basket"),
    ("cutting_board", "tiered_basket"),
    ("cutting_board", "pan"),
    ("cutting_board", "cardboard_box"),
    ("placemat", "bowl"),
    ("placemat", "plate"),
    ("placemat", "basket"),
    ("placemat", "tiered_shelf"),
    ("plate", "pan"),
    ("plate", "cardboard_box"),
    ("plate", "bowl"),
    ("plate", "plate"),
    ("tray", "tiered_shelf"),
    ("tray", "plate"),
    ("tray", "tiered_basket"),
    ("tray", "cardboard_box"),
    ("tray", "pot"),
];

type TableRows = &'static [(&'static str, &'static str, &'static [&'static str])];

const PRETRAIN_BASE: TableRows = &[
    ("cutting_board", "bowl", &[]),
    ("cutting_board", "plate", &[OBJ, TARGET]),
    ("cutting_board", "tiered_shelf", &[SOURCE]),
    ("tray", "basket", &[OBJ]),
    ("tray", "pan", &[TARGET]),
    ("tray", "bowl", &[TARGET]),
    ("plate", "basket", &[OBJ]),
    ("plate", "pot", &[]),
    ("plate", "tiered_shelf", &[OBJ, TARGET]),
    ("plate", "tiered_basket", &[OBJ, SOURCE]),
    ("placemat", "pan", &[OBJ, SOURCE]),
    ("placemat", "pot", &[OBJ, TARGET]),
    ("placemat", "tiered_basket", &[OBJ]),
    ("placemat", "cardboard_box", &[]),
    ("cutting_board", "pot", &[SOURCE]),
    ("cutting_board", "basket", &[SOURCE]),
    ("cutting_board", "tiered_basket", &[OBJ, TARGET]),
    ("cutting_board", "pan", &[]),
    ("cutting_board", "cardboard_box", &[]),
    ("placemat", "bowl", &[OBJ, TARGET]),
    ("placemat", "plate", &[OBJ]),
    ("placemat", "basket", &[OBJ, SOURCE]),
    ("placemat", "tiered_shelf", &[TARGET]),
    ("plate", "pan", &[SOURCE, TARGET]),
    ("plate", "cardboard_box", &[SOURCE]),
    ("plate", "bowl", &[OBJ, SOURCE, TARGET]),
    ("plate", "plate", &[]),
    ("tray", "tiered_shelf", &[TARGET]),
    ("tray", "plate", &[SOURCE, TARGET]),
    ("tray", "tiered_basket", &[SOURCE]),
    ("tray", "cardboard_box", &[OBJ, SOURCE, TARGET]),
    ("tray", "pot", &[SOURCE]),
];

const PRETRAIN_NOVEL: TableRows = &[
    ("cutting_board", "bowl", &[]),
    ("cutting_board", "plate", &[OBJ]),
    ("cutting_board", "tiered_shelf", &[OBJ, TARGET]),
    ("tray", "basket", &[SOURCE]),
    ("tray", "pan", &[]),
    ("tray", "bowl", &[OBJ]),
    ("plate", "basket", &[OBJ, TARGET]),
    ("plate", "pot", &[SOURCE, TARGET]),
    ("plate", "tiered_shelf", &[SOURCE, TARGET]),
    ("plate", "tiered_basket", &[OBJ, SOURCE]),
    ("placemat", "pan", &[TARGET]),
    ("placemat", "pot", &[OBJ]),
    ("placemat", "tiered_basket", &[SOURCE]),
    ("placemat", "cardboard_box", &[TARGET]),
];

const POSTTRAIN: TableRows = &[
    ("tray", "cardboard_box", &[]),
    ("tray", "pot", &[]),
    ("plate", "plate", &[]),
    ("placemat", "plate", &[OBJ]),
    ("plate", "cardboard_box", &[OBJ]),
    ("plate", "pan", &[OBJ]),
    ("placemat", "basket", &[SOURCE]),
    ("cutting_board", "pan", &[SOURCE]),
    ("cutting_board", "pot", &[TARGET]),
    ("tray", "plate", &[TARGET]),
    ("placemat", "bowl", &[OBJ, SOURCE]),
    ("plate", "bowl", &[OBJ, SOURCE]),
    ("cutting_board", "tiered_basket", &[OBJ, TARGET]),
    ("cutting_board", "cardboard_box", &[OBJ, TARGET]),
    ("tray", "tiered_basket", &[SOURCE, TARGET]),
    ("cutting_board", "basket", &[SOURCE, TARGET]),
    ("tray", "tiered_shelf", &[OBJ, SOURCE, TARGET]),
    ("placemat", "tiered_shelf", &[OBJ, SOURCE, TARGET]),
];

/// Object categories of the five-combination set.
pub const FIVE_COMBO_OBJ_CATS: &[&str] = &["can", "apple", "cucumber", "lemon", "bottled_water"];

/// Container combinations of the five-combination set.
pub const FIVE_COMBOS: &[(&str, &str)] = &[
    ("plate", "bowl"),
    ("placemat", "basket"),
    ("cutting_board", "basket"),
    ("tray", "plate"),
    ("cutting_board", "pan"),
];

fn table(rows: TableRows) -> DistractorTable {
    rows.iter()
        .map(|&(s, t, keys)| {
            (
                (s.to_owned(), t.to_owned()),
                keys.iter().map(|k| (*k).to_owned()).collect(),
            )
        })
        .collect()
}

fn cats(names: &[&str]) -> Vec<Category> {
    names.iter().map(|&n| Category::from(n)).collect()
}

fn combos(pairs: &[(&str, &str)]) -> Vec<(Category, Category)> {
    pairs
        .iter()
        .map(|&(s, t)| (Category::from(s), Category::from(t)))
        .collect()
}

/// `base` with the look-alike object region forced into every entry.
/// An entry lacking it first loses one random region, on a coin flip,
/// when it has more than one.
pub fn always_distractor_obj(base: &DistractorTable, rng: &mut EpisodeRng) -> DistractorTable {
    let mut out = base.clone();
    for keys in out.values_mut() {
        if keys.iter().any(|k| k == OBJ) {
            continue;
        }
        if rng.random::<f64>() < 0.5 && keys.len() > 1 {
            let drop = rng.random_range(0..keys.len());
            keys.remove(drop);
        }
        keys.push(OBJ.to_owned());
    }
    out
}

/// The named sets of the standard suite, in generation order.
///
/// `rng` drives the fruit set's forced look-alike table.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidMatrix`] if `config` is invalid.
pub fn standard_sets(
    config: &TaskMatrixConfig,
    catalog: &Catalog,
    rng: &mut EpisodeRng,
) -> Result<Vec<MatrixSet>, ConfigError> {
    config.validate()?;
    let novel_cats = cats(NOVEL_OBJ_CATS);
    let novel_combos = combos(NOVEL_COMBOS);
    let base_cats = config.base_obj_cats(catalog, NOVEL_OBJ_CATS);
    let base_combos = config.base_combos(&novel_combos)?;
    let posttrain = table(POSTTRAIN);

    let set = |prefix: &str,
               postfix: Option<&str>,
               obj_cats: &[Category],
               combos: &[(Category, Category)],
               distractors: MatrixDistractors,
               split: Option<InstanceSplit>| MatrixSet {
        prefix: prefix.to_owned(),
        postfix: postfix.map(str::to_owned),
        obj_cats: obj_cats.to_vec(),
        combos: combos.to_vec(),
        distractors,
        split,
        distractor_obj_cats: None,
    };
    let a = Some(InstanceSplit::A);

    Ok(vec![
        set(
            "PretrainPnPBase",
            Some("SplitA"),
            &base_cats,
            &base_combos,
            MatrixDistractors::Table(table(PRETRAIN_BASE)),
            a,
        ),
        set(
            "PretrainPnPBase",
            Some("SplitA"),
            &base_cats,
            &novel_combos,
            MatrixDistractors::Table(table(PRETRAIN_BASE)),
            a,
        ),
        set(
            "PretrainPnPNovel",
            Some("SplitA"),
            &novel_cats,
            &base_combos,
            MatrixDistractors::Table(table(PRETRAIN_NOVEL)),
            a,
        ),
        set(
            "PosttrainPnPNovel",
            Some("SplitA"),
            &novel_cats,
            &novel_combos,
            MatrixDistractors::Table(posttrain.clone()),
            a,
        ),
        set(
            "EvalPnPNovel",
            Some("SplitB"),
            &novel_cats,
            &novel_combos,
            MatrixDistractors::Table(posttrain.clone()),
            Some(InstanceSplit::B),
        ),
        set(
            &format!("PosttrainPnP{}", title("fruit")),
            None,
            &cats(&["fruit"]),
            &novel_combos,
            MatrixDistractors::Table(always_distractor_obj(&posttrain, rng)),
            None,
        ),
        set(
            "PnP5",
            Some("NoDistractorSplitA"),
            &cats(FIVE_COMBO_OBJ_CATS),
            &combos(FIVE_COMBOS),
            MatrixDistractors::None,
            None,
        ),
    ])
}

/// Every task of the standard suite.
///
/// # Errors
///
/// See [`standard_sets`] and [`generate_matrix`].
pub fn generate_task_definitions(
    config: &TaskMatrixConfig,
    catalog: &Catalog,
    rng: &mut EpisodeRng,
) -> Result<Vec<TaskDefinition>, ConfigError> {
    let mut tasks = Vec::new();
    for set in standard_sets(config, catalog, rng)? {
        tasks.extend(generate_matrix(config, &set)?);
    }
    Ok(tasks)
}
