//! Monte Carlo damage distribution with rolled crits.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::Action;
use crate::buff::BuffTable;
use crate::crit::RolledCrit;
use crate::damage::{DamageContext, DamageOptions};
use crate::enemy::EnemyInfo;
use crate::energy::EnergyState;
use crate::model::{Build, StageEffectData};

pub const DEFAULT_SIMULATION_RUNS: usize = 1000;
pub const DEFAULT_LOOP_COUNT: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    pub runs: usize,
    pub loops: u32,
    /// Run `i` is seeded with `seed + i`.
    pub seed: u64,
    pub damage: DamageOptions,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            runs: DEFAULT_SIMULATION_RUNS,
            loops: DEFAULT_LOOP_COUNT,
            seed: 0,
            damage: DamageOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub simulations_count: usize,
    pub total_damage_avg: f64,
    pub total_damage_max: f64,
    pub total_damage_min: f64,
    pub total_damage_median: f64,
    pub total_damage_std_dev: f64,
    pub dps_avg: f64,
    pub dps_max: f64,
    pub dps_min: f64,
    pub total_time: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("at least one simulation run is required")]
    NoRuns,
}

fn total_time(initial: &[Action], loop_actions: &[Action], options: &SimulationOptions) -> f64 {
    let loops = options.loops as f64;
    let marks = |marks: &[bool]| marks.iter().filter(|&&mark| mark).count() as f64;
    let mut time = marks(&options.damage.time_marks_initial)
        + marks(&options.damage.time_marks_loop) * loops;
    if time == 0.0 {
        time = (initial.len() as f64 + loop_actions.len() as f64 * loops)
            * options.damage.seconds_per_action;
    }
    if time > 0.0 { time } else { 1.0 }
}

fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Damage distribution over `options.runs` independent rotations.
///
/// Every hit rolls its crit, so totals vary between runs while staying
/// reproducible for a given seed.
pub fn simulate_with_rng(
    team: &[Build],
    initial: &[Action],
    loop_actions: &[Action],
    enemy: &EnemyInfo,
    buff_overrides: Option<&BuffTable>,
    stage: Option<&StageEffectData>,
    options: &SimulationOptions,
) -> Result<SimulationStats, SimulationError> {
    if options.runs == 0 {
        return Err(SimulationError::NoRuns);
    }

    let context = DamageContext::new(
        team,
        enemy,
        buff_overrides,
        stage,
        options.damage.ignored_buff.as_deref(),
    );
    let seconds_per_action = options.damage.seconds_per_action;
    let mut totals: Vec<f64> = (0..options.runs)
        .into_par_iter()
        .map(|run| {
            let mut crit = RolledCrit::new(StdRng::seed_from_u64(
                options.seed.wrapping_add(run as u64),
            ));
            let initial_phase = context.run_phase(
                initial,
                &options.damage.time_marks_initial,
                seconds_per_action,
                &mut crit,
                false,
                EnergyState::default(),
            );
            let loop_phase = context.run_phase(
                loop_actions,
                &options.damage.time_marks_loop,
                seconds_per_action,
                &mut crit,
                false,
                initial_phase.final_energy,
            );
            initial_phase.total_damage + loop_phase.total_damage * options.loops as f64
        })
        .collect();
    totals.sort_by(f64::total_cmp);

    let count = totals.len() as f64;
    let mean = totals.iter().sum::<f64>() / count;
    let variance = totals.iter().map(|total| (total - mean).powi(2)).sum::<f64>() / count;
    let max = totals[totals.len() - 1];
    let min = totals[0];
    let time = total_time(initial, loop_actions, options);

    debug!(runs = options.runs, mean, min, max, "rng simulation finished");
    Ok(SimulationStats {
        simulations_count: totals.len(),
        total_damage_avg: mean,
        total_damage_max: max,
        total_damage_min: min,
        total_damage_median: median(&totals),
        total_damage_std_dev: variance.sqrt(),
        dps_avg: mean / time,
        dps_max: max / time,
        dps_min: min / time,
        total_time: time,
    })
}
