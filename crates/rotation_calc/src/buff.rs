use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::data::{MAX_WEAPON_RANK, MIN_WEAPON_RANK};
use crate::model::ActivationType;

/// Buff definitions keyed by their team-unique id.
pub type BuffTable = BTreeMap<String, BuffData>;

/// Buffs in effect at a point in the rotation, keyed like [`BuffTable`].
pub type ActiveBuffs = BTreeMap<String, BuffStatus>;

/// A number that is either fixed or varies with weapon rank (5 entries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RankedValue {
    Scalar(f64),
    PerRank(Vec<f64>),
}

impl Default for RankedValue {
    fn default() -> Self {
        RankedValue::Scalar(0.0)
    }
}

impl RankedValue {
    pub fn at(&self, rank: u8) -> f64 {
        match self {
            RankedValue::Scalar(value) => *value,
            RankedValue::PerRank(values) => {
                let index = (rank.clamp(MIN_WEAPON_RANK, MAX_WEAPON_RANK) - 1) as usize;
                values.get(index).copied().unwrap_or(0.0)
            }
        }
    }
}

fn default_max_stacks() -> u32 {
    1
}

fn default_conversion_per_unit() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuffEffect {
    Flat {
        stat_to_buff: String,
        #[serde(default)]
        value: RankedValue,
    },
    Stacking {
        stat_to_buff: String,
        #[serde(default)]
        effect_per_stack: RankedValue,
        #[serde(default = "default_max_stacks")]
        max_stacks: u32,
    },
    StatConversion {
        source_stat: String,
        dest_stat: String,
        #[serde(default)]
        threshold: f64,
        #[serde(default = "default_conversion_per_unit")]
        conversion_per_unit: f64,
        #[serde(default)]
        conversion_gain_unit: RankedValue,
        // Unbounded when absent.
        #[serde(default)]
        max_gain: Option<RankedValue>,
    },
    MultiplierUp {
        stat_to_buff: String,
        #[serde(default)]
        value: RankedValue,
    },
    /// Resonance energy granted to each receiver when the buff triggers.
    ResonanceEnergyFixed {
        #[serde(default)]
        value: f64,
    },
    /// Like `ResonanceEnergyFixed`, scaled by the receiver's resonance efficiency.
    ResonanceEnergyScaling {
        #[serde(default)]
        value: f64,
    },
}

impl BuffEffect {
    /// The stat this effect adds to directly, with its value at `rank`.
    ///
    /// Conversions and energy effects return `None`.
    pub fn direct_bonus(&self, rank: u8, stacks: u32) -> Option<(&str, f64)> {
        match self {
            BuffEffect::Flat {
                stat_to_buff,
                value,
            }
            | BuffEffect::MultiplierUp {
                stat_to_buff,
                value,
            } => Some((stat_to_buff.as_str(), value.at(rank))),
            BuffEffect::Stacking {
                stat_to_buff,
                effect_per_stack,
                ..
            } => Some((
                stat_to_buff.as_str(),
                effect_per_stack.at(rank) * stacks as f64,
            )),
            _ => None,
        }
    }
}

/// What has to happen for a trigger to fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TriggerEvent {
    Always,
    Activation(ActivationType),
    Skill(String),
    Healing,
}

const SKILL_EVENT_PREFIX: &str = "skill:";

impl TryFrom<String> for TriggerEvent {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if let Some(skill) = value.strip_prefix(SKILL_EVENT_PREFIX) {
            return Ok(TriggerEvent::Skill(skill.trim().to_string()));
        }
        match value.as_str() {
            "always" => Ok(TriggerEvent::Always),
            "healing" => Ok(TriggerEvent::Healing),
            other => ActivationType::parse(other)
                .map(TriggerEvent::Activation)
                .ok_or_else(|| format!("unknown trigger event: {other}")),
        }
    }
}

impl From<TriggerEvent> for String {
    fn from(event: TriggerEvent) -> Self {
        match event {
            TriggerEvent::Always => "always".to_string(),
            TriggerEvent::Healing => "healing".to_string(),
            TriggerEvent::Activation(kind) => kind.as_str().to_string(),
            TriggerEvent::Skill(name) => format!("{SKILL_EVENT_PREFIX}{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    #[default]
    SelfCast,
    TeamCast,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerTiming {
    #[default]
    OnCast,
    OnHit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerCondition {
    pub event: TriggerEvent,
    #[serde(default)]
    pub source: TriggerSource,
    #[serde(default)]
    pub timing: TriggerTiming,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffTarget {
    #[default]
    #[serde(rename = "self")]
    SelfOnly,
    Team,
    SingleTeammate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuffData {
    pub description: String,
    pub trigger: Vec<TriggerCondition>,
    pub target: BuffTarget,
    pub effects: Vec<BuffEffect>,
    /// Minimum constellation the owner needs for this buff to apply.
    pub constellation: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Transient buffs only affect the action that triggered them.
    pub is_transient: bool,
}

/// The action being evaluated, as seen by trigger conditions.
pub struct TriggerContext<'a> {
    pub actor: &'a str,
    pub skill_name: &'a str,
    pub activation_types: &'a [ActivationType],
    pub is_healing: bool,
    pub team: &'a BTreeSet<String>,
}

impl BuffData {
    pub fn owned_by(&self, owner: &str) -> BuffData {
        BuffData {
            owner: Some(owner.to_string()),
            ..self.clone()
        }
    }

    pub fn owner(&self) -> &str {
        self.owner.as_deref().unwrap_or_default()
    }

    /// `max_stacks` of the leading effect when the buff is a stacking one.
    pub fn stacking_max(&self) -> Option<u32> {
        match self.effects.first() {
            Some(BuffEffect::Stacking { max_stacks, .. }) => Some(*max_stacks),
            _ => None,
        }
    }

    pub fn is_triggered_by(&self, ctx: &TriggerContext<'_>) -> bool {
        let owner = self.owner();
        self.trigger.iter().any(|trigger| {
            let source_match = match trigger.source {
                TriggerSource::SelfCast => owner == ctx.actor,
                TriggerSource::TeamCast => ctx.team.contains(owner),
            };
            let event_match = match &trigger.event {
                TriggerEvent::Always => true,
                TriggerEvent::Activation(kind) => ctx.activation_types.contains(kind),
                TriggerEvent::Skill(name) => name == ctx.skill_name,
                TriggerEvent::Healing => ctx.is_healing,
            };
            let timing_match =
                trigger.timing == TriggerTiming::OnCast || trigger.event == TriggerEvent::Always;
            source_match && event_match && timing_match
        })
    }

    /// Whether this buff affects `character` given its recorded status.
    pub fn applies_to(&self, character: &str, status: &BuffStatus) -> bool {
        match self.target {
            BuffTarget::SelfOnly => self.owner() == character,
            BuffTarget::Team => true,
            BuffTarget::SingleTeammate => status.target() == Some(character),
        }
    }
}

/// State of an active buff: plain on, a stack count, or a chosen teammate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuffStatus {
    Active(bool),
    Stacks(u32),
    Targeted { target_char: String },
}

impl BuffStatus {
    pub fn stacks(&self) -> u32 {
        match self {
            BuffStatus::Stacks(count) => *count,
            _ => 1,
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            BuffStatus::Targeted { target_char } => Some(target_char.as_str()),
            _ => None,
        }
    }
}
