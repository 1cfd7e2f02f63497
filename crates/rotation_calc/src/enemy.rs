use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::{
    CHARACTER_LEVEL, DEF_SHRED, DEFAULT_ENEMY_LEVEL, DEFAULT_ENEMY_RESISTANCE, DMG_TAKEN_UP,
    RES_SHRED,
};
use crate::model::Attribute;
use crate::stats::RawStats;

const DEFENSE_BASE: f64 = 800.0;
const DEFENSE_PER_LEVEL: f64 = 8.0;
const ENEMY_DEFENSE_OFFSET: f64 = 792.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnemyError {
    #[error("enemy level must be a finite positive number, got {value}")]
    InvalidLevel { value: f64 },
    #[error("{attribute:?} resistance must be finite, got {value}")]
    InvalidResistance { attribute: Attribute, value: f64 },
}

fn default_level() -> f64 {
    DEFAULT_ENEMY_LEVEL
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyInfo {
    #[serde(default = "default_level")]
    pub level: f64,
    /// Resistance percentages; attributes not listed use the default.
    #[serde(default)]
    pub resistances: BTreeMap<Attribute, f64>,
}

impl Default for EnemyInfo {
    fn default() -> Self {
        Self {
            level: DEFAULT_ENEMY_LEVEL,
            resistances: BTreeMap::new(),
        }
    }
}

/// Enemy-side damage factors for one hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyFactors {
    pub defense: f64,
    pub resistance: f64,
    pub damage_taken: f64,
}

impl EnemyFactors {
    pub fn product(&self) -> f64 {
        self.defense * self.resistance * self.damage_taken
    }
}

impl EnemyInfo {
    /// Create enemy parameters with validation.
    pub fn new(level: f64, resistances: BTreeMap<Attribute, f64>) -> Result<Self, EnemyError> {
        let enemy = Self { level, resistances };
        enemy.validate()?;
        Ok(enemy)
    }

    /// Constraints enforced:
    /// - level is finite and > 0
    /// - every resistance is finite
    pub fn validate(&self) -> Result<(), EnemyError> {
        if !self.level.is_finite() || self.level <= 0.0 {
            return Err(EnemyError::InvalidLevel { value: self.level });
        }
        for (&attribute, &value) in &self.resistances {
            if !value.is_finite() {
                return Err(EnemyError::InvalidResistance { attribute, value });
            }
        }
        Ok(())
    }

    pub fn resistance(&self, attribute: Option<Attribute>) -> f64 {
        attribute
            .and_then(|attribute| self.resistances.get(&attribute).copied())
            .unwrap_or(DEFAULT_ENEMY_RESISTANCE)
    }

    pub fn defense_factor(&self, def_shred: f64) -> f64 {
        let attacker = DEFENSE_BASE + DEFENSE_PER_LEVEL * CHARACTER_LEVEL;
        let enemy = (DEFENSE_PER_LEVEL * self.level + ENEMY_DEFENSE_OFFSET) * (1.0 - def_shred / 100.0);
        attacker / (attacker + enemy)
    }

    /// Factors shared by skill and abnormal damage against this enemy.
    pub fn factors(&self, raw: &RawStats, attribute: Option<Attribute>) -> EnemyFactors {
        let mut resistance = self.resistance(attribute);
        let mut shred = raw.get(RES_SHRED);
        if let Some(attribute) = attribute {
            resistance *= 1.0 - raw.get(attribute.res_ignore_key()) / 100.0;
            shred += raw.get(attribute.res_shred_key());
        }
        resistance -= shred;
        EnemyFactors {
            defense: self.defense_factor(raw.get(DEF_SHRED)),
            resistance: resistance_factor(resistance),
            damage_taken: 1.0 + raw.get(DMG_TAKEN_UP) / 100.0,
        }
    }
}

pub fn resistance_factor(resistance: f64) -> f64 {
    if resistance >= 0.0 {
        1.0 - resistance / 100.0
    } else {
        1.0 - resistance / 200.0
    }
}
