//! Brute-force search over echoes the player owns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::RotationState;
use crate::buff::BuffTable;
use crate::damage::{DamageOptions, process_rotation};
use crate::data::MAX_ECHOES;
use crate::enemy::EnemyInfo;
use crate::model::{Build, Echo, EchoCost, StageEffectData};
use crate::search::{Combinations, Product, best_candidates};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptimizerError {
    #[error("invalid cost combination {combo:?}, expected five costs like 4-3-3-1-1")]
    InvalidCostCombo { combo: String },
}

/// Echo costs of a full loadout, written like `4-3-3-1-1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CostCombo(Vec<EchoCost>);

impl CostCombo {
    pub fn costs(&self) -> &[EchoCost] {
        &self.0
    }

    pub(crate) fn count(&self, cost: EchoCost) -> usize {
        self.0.iter().filter(|&&c| c == cost).count()
    }
}

impl FromStr for CostCombo {
    type Err = OptimizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OptimizerError::InvalidCostCombo {
            combo: s.to_string(),
        };
        let costs = s
            .split('-')
            .map(|part| {
                part.trim()
                    .parse::<u8>()
                    .ok()
                    .and_then(|value| EchoCost::try_from(value).ok())
                    .ok_or_else(invalid)
            })
            .collect::<Result<Vec<_>, _>>()?;
        if costs.len() != MAX_ECHOES {
            return Err(invalid());
        }
        Ok(Self(costs))
    }
}

impl TryFrom<String> for CostCombo {
    type Error = OptimizerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CostCombo> for String {
    fn from(combo: CostCombo) -> Self {
        combo.to_string()
    }
}

impl fmt::Display for CostCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("-"))
    }
}

/// Every way to fill `combo` from `owned`, as indices into `owned`.
///
/// Loadouts list cost 4 echoes first, then cost 3, then cost 1; within a
/// cost, indices ascend. Owned echoes without a cost are never picked.
/// Only the per-cost picks are materialized; full loadouts are produced
/// lazily.
pub fn owned_loadouts(owned: &[Echo], combo: &CostCombo) -> impl Iterator<Item = Vec<usize>> {
    let groups: Vec<Vec<Vec<usize>>> = EchoCost::ALL
        .into_iter()
        .filter_map(|cost| {
            let needed = combo.count(cost);
            if needed == 0 {
                return None;
            }
            let pool: Vec<usize> = owned
                .iter()
                .enumerate()
                .filter(|(_, echo)| echo.cost == Some(cost))
                .map(|(index, _)| index)
                .collect();
            let picks: Vec<Vec<usize>> = Combinations::new(pool.len(), needed)
                .map(|pick| pick.into_iter().map(|i| pool[i]).collect())
                .collect();
            Some(picks)
        })
        .collect();
    let radices = groups.iter().map(Vec::len).collect();

    Product::new(radices).map(move |choice| {
        choice
            .iter()
            .zip(&groups)
            .flat_map(|(&pick, group)| group[pick].iter().copied())
            .collect()
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadoutScore {
    pub cost_combo: CostCombo,
    pub echo_indices: Vec<usize>,
    /// Initial phase plus one loop cycle.
    pub total_damage: f64,
}

/// What a candidate loadout is scored against: the build receiving it, its
/// team, the rotation and every damage setting of the scenario.
#[derive(Debug, Clone, Copy)]
pub struct LoadoutContext<'a> {
    pub build: &'a Build,
    pub team: &'a [Build],
    pub rotation: &'a RotationState,
    pub enemy: &'a EnemyInfo,
    pub buff_overrides: Option<&'a BuffTable>,
    pub stage: Option<&'a StageEffectData>,
    pub options: &'a DamageOptions,
}

impl LoadoutContext<'_> {
    fn team_with(&self, echoes: Vec<Echo>) -> Vec<Build> {
        let candidate = Build {
            echo_list: echoes,
            ..self.build.clone()
        };
        let mut result: Vec<Build> = self.team.to_vec();
        match result
            .iter_mut()
            .find(|member| member.character_name == self.build.character_name)
        {
            Some(slot) => *slot = candidate,
            None => result.insert(0, candidate),
        }
        result
    }

    /// Initial phase plus one loop cycle with `echoes` equipped.
    pub fn score(&self, echoes: Vec<Echo>) -> f64 {
        let team = self.team_with(echoes);
        process_rotation(
            &team,
            &self.rotation.initial,
            &self.rotation.loop_actions,
            self.enemy,
            self.buff_overrides,
            self.stage,
            self.options,
        )
        .projected_damage(1)
    }
}

/// Score every owned loadout for `context.build` and keep the best `top_k`.
///
/// Ties keep enumeration order (combos in the given order, then loadouts).
pub fn rank_owned_loadouts(
    context: &LoadoutContext<'_>,
    owned: &[Echo],
    combos: &[CostCombo],
    top_k: usize,
) -> Vec<LoadoutScore> {
    let candidates = combos.iter().flat_map(|combo| {
        owned_loadouts(owned, combo).map(move |indices| (combo, indices))
    });
    let (evaluated, best) = best_candidates(candidates, top_k, |(_, indices)| {
        context.score(indices.iter().map(|&i| owned[i].clone()).collect())
    });

    debug!(evaluated, top_k, "owned loadouts scored");
    best.into_iter()
        .map(|((combo, echo_indices), total_damage)| LoadoutScore {
            cost_combo: combo.clone(),
            echo_indices,
            total_damage,
        })
        .collect()
}
