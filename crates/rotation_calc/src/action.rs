use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::buff::ActiveBuffs;
use crate::damage::DamageBreakdown;
use crate::energy::EnergyState;
use crate::model::SkillData;

/// Per-action manual adjustments to triggered buffs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuffOverrides {
    pub disabled: BTreeSet<String>,
    pub stacks: BTreeMap<String, u32>,
}

impl BuffOverrides {
    pub fn is_empty(&self) -> bool {
        self.disabled.is_empty() && self.stacks.is_empty()
    }
}

/// One skill use in a rotation, plus the annotations the simulator writes back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Action {
    pub character: Option<String>,
    pub skill: String,
    pub skill_data: Option<SkillData>,
    /// Stack count for abnormal effect actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacks: Option<u32>,
    /// Chosen recipient per single-target buff key.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub target_selections: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BuffOverrides::is_empty")]
    pub overrides: BuffOverrides,
    /// Replaces the computed concerto gain in the damage engine's meters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_concerto_gain: Option<f64>,
    /// Replaces the computed resonance gain, buff grants included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_resonance_gain: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_buffs: Option<ActiveBuffs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concerto_energy_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resonance_energy_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resonance_energy_gain: Option<f64>,
}

impl Action {
    pub fn new(character: impl Into<String>, skill: SkillData) -> Self {
        Self {
            character: Some(character.into()),
            skill: skill.name.clone(),
            skill_data: Some(skill),
            ..Default::default()
        }
    }

    pub fn is_annotated(&self) -> bool {
        self.active_buffs.is_some()
    }

    pub fn clear_annotations(&mut self) {
        self.active_buffs = None;
        self.concerto_energy_total = None;
        self.resonance_energy_total = None;
        self.resonance_energy_gain = None;
    }
}

/// Both rotation phases; the split point is the length of `initial`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationState {
    pub initial: Vec<Action>,
    #[serde(rename = "loop")]
    pub loop_actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub character: String,
    pub skill: String,
    pub damage: f64,
    /// Running phase total after this action.
    pub total_damage: f64,
    /// The actor's meters after this action.
    #[serde(default)]
    pub concerto_energy: f64,
    #[serde(default)]
    pub resonance_energy: f64,
    /// Formula terms of a skill hit; absent for abnormal effects and misses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_details: Option<DamageBreakdown>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub total_damage: f64,
    pub log: Vec<LogEntry>,
    pub total_time: f64,
    #[serde(default)]
    pub final_energy: EnergyState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub initial_phase: PhaseResult,
    pub loop_phase: PhaseResult,
}

impl CalculationResult {
    /// Damage over the initial phase followed by `loops` loop cycles.
    pub fn projected_damage(&self, loops: u32) -> f64 {
        self.initial_phase.total_damage + self.loop_phase.total_damage * loops as f64
    }
}
