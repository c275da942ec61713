//! Per-arm subtask specifications for downstream data generation.
//!
//! A [`TaskConfig`] maps an arm key (`task_spec_0` for the right arm,
//! `task_spec_1` for the left, or `task_spec` for single-arm tasks) to an
//! ordered list of subtasks keyed `subtask_1`, `subtask_2`, ... Each
//! [`SubtaskSpec`] says which object the arm interacts with and which
//! subtask signal ends the segment.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Arm key of the right arm.
pub const RIGHT_ARM_SPEC: &str = "task_spec_0";
/// Arm key of the left arm.
pub const LEFT_ARM_SPEC: &str = "task_spec_1";
/// Arm key used by single-arm fixture tasks.
pub const SINGLE_ARM_SPEC: &str = "task_spec";

const DEFAULT_ACTION_NOISE: f64 = 0.05;

/// One segment of an arm's demonstration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubtaskSpec {
    /// Object used to select source demonstrations, when it differs from
    /// `object_ref`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_object_ref: Option<String>,
    /// Object the arm moves relative to; `None` for idle segments.
    pub object_ref: Option<String>,
    /// Signal whose rising edge ends the segment; `None` ends it with the
    /// episode.
    pub subtask_term_signal: Option<String>,
    /// Extra steps after the signal fires, drawn from this range.
    pub subtask_term_offset_range: Option<(u32, u32)>,
    /// Source-demonstration selection strategy.
    pub selection_strategy: String,
    /// Arguments of the selection strategy.
    pub selection_strategy_kwargs: Option<serde_json::Value>,
    /// Action noise magnitude.
    pub action_noise: f64,
    /// Interpolation steps between segments.
    pub num_interpolation_steps: u32,
    /// Steps held fixed after interpolation.
    pub num_fixed_steps: u32,
    /// Whether noise applies while interpolating.
    pub apply_noise_during_interpolation: bool,
}

impl SubtaskSpec {
    /// A segment relative to `object_ref` that runs to the end.
    pub fn new(object_ref: Option<&str>) -> Self {
        Self {
            selection_object_ref: None,
            object_ref: object_ref.map(str::to_owned),
            subtask_term_signal: None,
            subtask_term_offset_range: None,
            selection_strategy: "random".to_owned(),
            selection_strategy_kwargs: None,
            action_noise: DEFAULT_ACTION_NOISE,
            num_interpolation_steps: 5,
            num_fixed_steps: 0,
            apply_noise_during_interpolation: true,
        }
    }

    /// An idle segment.
    pub fn idle() -> Self {
        Self::new(None)
    }

    /// End the segment on `signal`, with an optional step offset.
    pub fn until(mut self, signal: &str, offset: Option<(u32, u32)>) -> Self {
        self.subtask_term_signal = Some(signal.to_owned());
        self.subtask_term_offset_range = offset;
        self
    }

    /// Select source demonstrations by `object`.
    pub fn selecting(mut self, object: &str) -> Self {
        self.selection_object_ref = Some(object.to_owned());
        self
    }

    /// Override the action noise.
    pub fn noise(mut self, noise: f64) -> Self {
        self.action_noise = noise;
        self
    }
}

/// Subtask specifications of every arm.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskConfig {
    arms: IndexMap<String, IndexMap<String, SubtaskSpec>>,
}

impl TaskConfig {
    /// An empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arm whose subtasks are numbered from 1 in order.
    pub fn arm(mut self, key: &str, subtasks: Vec<SubtaskSpec>) -> Self {
        let numbered = subtasks
            .into_iter()
            .enumerate()
            .map(|(i, s)| (format!("subtask_{}", i + 1), s))
            .collect();
        self.arms.insert(key.to_owned(), numbered);
        self
    }

    /// Subtasks of one arm.
    pub fn get(&self, key: &str) -> Option<&IndexMap<String, SubtaskSpec>> {
        self.arms.get(key)
    }

    /// Arm keys in declaration order.
    pub fn arm_keys(&self) -> impl Iterator<Item = &str> {
        self.arms.keys().map(String::as_str)
    }

    /// Whether no arm is configured.
    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }

    /// Every termination signal named by any subtask.
    pub fn signals(&self) -> Vec<&str> {
        self.arms
            .values()
            .flat_map(|subtasks| subtasks.values())
            .filter_map(|s| s.subtask_term_signal.as_deref())
            .collect()
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pnp() -> TaskConfig {
        TaskConfig::new()
            .arm(
                RIGHT_ARM_SPEC,
                vec![
                    SubtaskSpec::new(Some("obj"))
                        .selecting("container")
                        .until("grasp_object", Some((5, 10))),
                    SubtaskSpec::new(Some("container")),
                ],
            )
            .arm(LEFT_ARM_SPEC, vec![SubtaskSpec::idle()])
    }

    #[test]
    fn subtasks_are_numbered_from_one() {
        let config = pnp();
        let right = config.get(RIGHT_ARM_SPEC).unwrap();
        let keys: Vec<&str> = right.keys().map(String::as_str).collect();
        assert_eq!(keys, ["subtask_1", "subtask_2"]);
        assert_eq!(config.arm_keys().collect::<Vec<_>>(), [RIGHT_ARM_SPEC, LEFT_ARM_SPEC]);
        assert_eq!(config.signals(), ["grasp_object"]);
    }

    #[test]
    fn json_omits_absent_selection_ref() {
        let json = pnp().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let first = &value["task_spec_0"]["subtask_1"];
        assert_eq!(first["selection_object_ref"], "container");
        assert_eq!(first["subtask_term_offset_range"], serde_json::json!([5, 10]));
        let second = &value["task_spec_0"]["subtask_2"];
        assert!(second.get("selection_object_ref").is_none());
        assert!(second["subtask_term_signal"].is_null());
        assert!(value["task_spec_1"]["subtask_1"]["object_ref"].is_null());
    }

    #[test]
    fn json_reads_back() {
        let config = pnp();
        let back: TaskConfig = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }
}
