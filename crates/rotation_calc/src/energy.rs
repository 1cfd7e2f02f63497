//! Per-character energy meters tracked by the damage engine.
//!
//! A phase starts from the meters the previous phase ended with, so the loop
//! phase sees the energy built up during the initial phase.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::MAX_CONCERTO_ENERGY;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyState {
    pub concerto: BTreeMap<String, f64>,
    pub resonance: BTreeMap<String, f64>,
}

/// Energy one action hands out.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct EnergyGain {
    pub concerto: f64,
    pub resonance: f64,
    /// Resonance energy granted to teammates other than the actor.
    pub teammates: BTreeMap<String, f64>,
    /// Outro skills empty the actor's concerto meter before the gain.
    pub resets_concerto: bool,
    /// Liberations empty the actor's resonance meter after every gain.
    pub resets_resonance: bool,
}

impl EnergyState {
    pub fn concerto(&self, character: &str) -> f64 {
        self.concerto.get(character).copied().unwrap_or_default()
    }

    pub fn resonance(&self, character: &str) -> f64 {
        self.resonance.get(character).copied().unwrap_or_default()
    }

    /// Apply one action's gains. `resonance_cap` bounds every character's
    /// resonance meter; characters it does not know stay unbounded.
    pub(crate) fn record(
        &mut self,
        actor: &str,
        gain: EnergyGain,
        resonance_cap: impl Fn(&str) -> Option<f64>,
    ) {
        let concerto = self.concerto.entry(actor.to_string()).or_default();
        if gain.resets_concerto {
            *concerto = 0.0;
        }
        *concerto = (*concerto + gain.concerto).min(MAX_CONCERTO_ENERGY);

        *self.resonance.entry(actor.to_string()).or_default() += gain.resonance;
        for (teammate, amount) in gain.teammates {
            *self.resonance.entry(teammate).or_default() += amount;
        }
        if gain.resets_resonance {
            self.resonance.insert(actor.to_string(), 0.0);
        }
        for (character, energy) in &mut self.resonance {
            if let Some(cap) = resonance_cap(character) {
                *energy = energy.min(cap);
            }
        }
    }
}
