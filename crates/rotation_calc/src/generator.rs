//! Theoretical loadouts assembled from the echo stat tables.
//!
//! Instead of owned echoes, every echo gets one of the allowed main stats and
//! a set of sub stats at a fixed roll tier. Main and sub stats may repeat.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::{main_stat_options, sub_stat_data};
use crate::model::{Echo, EchoCost, Stat};
use crate::optimizer::{CostCombo, LoadoutContext};
use crate::search::{Combinations, Product, best_candidates};

pub const DEFAULT_SUB_ROLL_TIER: usize = 7;

/// How a sub stat is treated when sub stats are picked by priority.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SubStatPriority {
    #[default]
    Normal,
    Preferred,
    /// On every echo.
    Required,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSearch {
    pub cost_combos: Vec<CostCombo>,
    pub subs_per_echo: usize,
    /// Index into each sub stat's roll values, lowest tier first.
    pub sub_roll_tier: usize,
    /// Sub stat key to priority.
    pub sub_stats: BTreeMap<String, SubStatPriority>,
    /// Main stat keys allowed per echo cost, keyed `"1"`, `"3"` and `"4"`.
    pub main_stats: BTreeMap<String, Vec<String>>,
    /// Draw sub stat sets from every listed key, ignoring priorities.
    pub full_search: bool,
}

impl Default for BuildSearch {
    fn default() -> Self {
        Self {
            cost_combos: Vec::new(),
            subs_per_echo: 1,
            sub_roll_tier: DEFAULT_SUB_ROLL_TIER,
            sub_stats: BTreeMap::new(),
            main_stats: BTreeMap::new(),
            full_search: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedLoadout {
    pub cost_combo: CostCombo,
    pub echo_list: Vec<Echo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedScore {
    pub cost_combo: CostCombo,
    pub echo_list: Vec<Echo>,
    /// Initial phase plus one loop cycle.
    pub total_damage: f64,
}

/// Sub stat pools per priority, each entry valued at `tier`.
fn sub_stat_pools(search: &BuildSearch) -> BTreeMap<SubStatPriority, Vec<Stat>> {
    let mut pools: BTreeMap<SubStatPriority, Vec<Stat>> = BTreeMap::new();
    for (key, &priority) in &search.sub_stats {
        let Some(data) = sub_stat_data(key) else {
            warn!(key = key.as_str(), "unknown sub stat skipped");
            continue;
        };
        let Some(&value) = data.values.get(search.sub_roll_tier) else {
            warn!(
                key = key.as_str(),
                tier = search.sub_roll_tier,
                "roll tier out of range, sub stat skipped"
            );
            continue;
        };
        pools.entry(priority).or_default().push(Stat {
            key: data.key.to_string(),
            value,
            name: Some(data.name.to_string()),
        });
    }
    pools
}

/// The sub stat sets any one echo may carry.
///
/// Priority mode puts every required stat on each echo and fills the rest
/// from preferred, then normal stats. More required stats than slots leave no
/// sets at all.
fn sub_stat_sets(search: &BuildSearch) -> Vec<Vec<Stat>> {
    let mut pools = sub_stat_pools(search);
    let required = pools.remove(&SubStatPriority::Required).unwrap_or_default();
    let mut fill = pools.remove(&SubStatPriority::Preferred).unwrap_or_default();
    fill.extend(pools.remove(&SubStatPriority::Normal).unwrap_or_default());
    let per_echo = search.subs_per_echo;

    if search.full_search {
        let mut all = required;
        all.extend(fill);
        if all.is_empty() {
            return Vec::new();
        }
        return Combinations::new(all.len(), per_echo)
            .map(|pick| pick.into_iter().map(|i| all[i].clone()).collect())
            .collect();
    }

    if (required.is_empty() && fill.is_empty()) || required.len() > per_echo {
        return Vec::new();
    }
    Combinations::new(fill.len(), per_echo - required.len())
        .map(|pick| {
            let mut set = required.clone();
            set.extend(pick.into_iter().map(|i| fill[i].clone()));
            set
        })
        .collect()
}

fn main_stat_choices(search: &BuildSearch, cost: EchoCost) -> Vec<Stat> {
    let Some(allowed) = search.main_stats.get(&cost.to_string()) else {
        return Vec::new();
    };
    main_stat_options(cost)
        .iter()
        .filter(|option| allowed.iter().any(|key| key == option.key))
        .map(|option| Stat {
            key: option.key.to_string(),
            value: option.value,
            name: Some(option.name.to_string()),
        })
        .collect()
}

/// Every theoretical loadout `search` describes, generated lazily.
///
/// Per combo, main stat choices vary slowest and the last echo's sub stat
/// set fastest. Combos with a cost that allows no main stat are skipped.
pub fn generate_loadouts(search: &BuildSearch) -> impl Iterator<Item = GeneratedLoadout> + '_ {
    let sub_sets = Arc::new(sub_stat_sets(search));

    search.cost_combos.iter().flat_map(move |combo| {
        let costs = combo.costs().to_vec();
        let mains: Vec<Vec<Stat>> = costs
            .iter()
            .map(|&cost| main_stat_choices(search, cost))
            .collect();
        let radices = mains
            .iter()
            .map(Vec::len)
            .chain(costs.iter().map(|_| sub_sets.len()))
            .collect();
        let sub_sets = Arc::clone(&sub_sets);
        let combo = combo.clone();

        Product::new(radices).map(move |choice| {
            let (main_choice, sub_choice) = choice.split_at(costs.len());
            let echo_list = costs
                .iter()
                .enumerate()
                .map(|(slot, &cost)| Echo {
                    name: format!("Optimized Echo {}", slot + 1),
                    cost: Some(cost),
                    main_stat: Some(mains[slot][main_choice[slot]].clone()),
                    sub_stats: sub_sets[sub_choice[slot]].clone(),
                })
                .collect();
            GeneratedLoadout {
                cost_combo: combo.clone(),
                echo_list,
            }
        })
    })
}

/// Score every generated loadout for `context.build` and keep the best
/// `top_k`. Ties keep generation order.
pub fn rank_generated_loadouts(
    context: &LoadoutContext<'_>,
    search: &BuildSearch,
    top_k: usize,
) -> Vec<GeneratedScore> {
    let (evaluated, best) = best_candidates(generate_loadouts(search), top_k, |loadout| {
        context.score(loadout.echo_list.clone())
    });

    debug!(evaluated, top_k, "generated loadouts scored");
    best.into_iter()
        .map(|(loadout, total_damage)| GeneratedScore {
            cost_combo: loadout.cost_combo,
            echo_list: loadout.echo_list,
            total_damage,
        })
        .collect()
}
