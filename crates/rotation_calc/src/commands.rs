//! JSON command surface shared by the CLI and any embedding shell.
//!
//! Requests and responses are camelCase envelopes around the snake_case
//! domain types.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::action::{Action, CalculationResult, RotationState};
use crate::buff::{ActiveBuffs, BuffTable};
use crate::damage::process_rotation;
use crate::data::{AbnormalEffect, SUB_STAT_TYPES, main_stat_options};
use crate::enemy::{EnemyError, EnemyInfo};
use crate::model::{Build, Echo, EchoCost, SkillData, StageEffectData};
use crate::generator::{BuildSearch, rank_generated_loadouts};
use crate::optimizer::{CostCombo, LoadoutContext, OptimizerError, rank_owned_loadouts};
use crate::rotation::recalculate_rotation_state;
use crate::simulation::{SimulationError, SimulationOptions, SimulationStats, simulate_with_rng};
use crate::stats::{BaseValues, FinalStats, RawStats, calculate_base_stats};
use crate::store::{GameData, Scenario, UserConfig};
use crate::team::{gather_team_data, team_names, validate_team};

pub const COMMANDS: [&str; 8] = [
    "bootstrap",
    "resolve_stats",
    "aggregate_team",
    "simulate_rotation",
    "compute_damage",
    "simulate_rng",
    "optimize_echoes",
    "optimize_theoretical",
];

const DEFAULT_COST_COMBO: &str = "4-3-3-1-1";
const DEFAULT_OPTIMIZER_TOP_K: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Enemy(#[from] EnemyError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error(transparent)]
    Optimizer(#[from] OptimizerError),
}

/// Team and rotation inputs. Inline values win over the named scenario,
/// which wins over `config.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RotationRequest {
    scenario: Option<String>,
    team: Option<Vec<Build>>,
    build_names: Option<Vec<String>>,
    initial: Option<Vec<Action>>,
    #[serde(rename = "loop")]
    loop_actions: Option<Vec<Action>>,
    enemy: Option<EnemyInfo>,
    stage_effects_name: Option<String>,
    buffs: Option<BuffTable>,
    time_marks_initial: Option<Vec<bool>>,
    time_marks_loop: Option<Vec<bool>>,
    ignored_buff: Option<String>,
    seconds_per_action: Option<f64>,
    loops: Option<u32>,
    runs: Option<usize>,
    seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ResolveStatsRequest {
    build: Option<Build>,
    build_name: Option<String>,
    active_buffs: ActiveBuffs,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeEchoesRequest {
    #[serde(flatten)]
    rotation: RotationRequest,
    #[serde(default)]
    character: Option<String>,
    #[serde(default)]
    owned_echoes: Vec<Echo>,
    #[serde(default = "default_cost_combos")]
    cost_combos: Vec<String>,
    #[serde(default = "default_optimizer_top_k")]
    top_k: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeTheoreticalRequest {
    #[serde(flatten)]
    rotation: RotationRequest,
    #[serde(default)]
    character: Option<String>,
    #[serde(default)]
    search: BuildSearch,
    #[serde(default = "default_optimizer_top_k")]
    top_k: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatOptionResponse {
    key: String,
    name: String,
    value: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BootstrapResponse {
    commands: Vec<String>,
    characters: Vec<String>,
    weapons: Vec<String>,
    harmony_effects: Vec<String>,
    echo_skills: Vec<String>,
    builds: Vec<String>,
    scenarios: Vec<String>,
    stage_effects: Vec<String>,
    abnormal_effects: Vec<String>,
    main_stat_options: BTreeMap<String, Vec<StatOptionResponse>>,
    sub_stat_labels: BTreeMap<String, String>,
    sub_stat_value_options: BTreeMap<String, Vec<f64>>,
    default_cost_combo: String,
    config: UserConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveStatsResponse {
    character: String,
    final_stats: FinalStats,
    raw_stats: RawStats,
    bases: BaseValues,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregateTeamResponse {
    team: Vec<String>,
    buffs: BuffTable,
    skills: BTreeMap<String, Vec<SkillData>>,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateRotationResponse {
    initial: Vec<Action>,
    #[serde(rename = "loop")]
    loop_actions: Vec<Action>,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
enum ComputeDamageResponse {
    NothingConfigured,
    #[serde(rename_all = "camelCase")]
    Computed {
        result: CalculationResult,
        loops: u32,
        projected_damage: f64,
        warnings: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateRngResponse {
    stats: SimulationStats,
    loops: u32,
    seed: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadoutResponse {
    cost_combo: String,
    echo_indices: Vec<usize>,
    echoes: Vec<Echo>,
    total_damage: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeEchoesResponse {
    character: String,
    loadouts: Vec<LoadoutResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedLoadoutResponse {
    cost_combo: String,
    echoes: Vec<Echo>,
    total_damage: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeTheoreticalResponse {
    character: String,
    loadouts: Vec<GeneratedLoadoutResponse>,
}

/// Request inputs after scenario and config fallbacks are applied.
struct ResolvedRequest<'a> {
    team: Vec<Build>,
    initial: Vec<Action>,
    loop_actions: Vec<Action>,
    enemy: EnemyInfo,
    stage: Option<&'a StageEffectData>,
    buffs: Option<BuffTable>,
    options: SimulationOptions,
}

fn default_cost_combos() -> Vec<String> {
    vec![DEFAULT_COST_COMBO.to_string()]
}

fn default_optimizer_top_k() -> usize {
    DEFAULT_OPTIMIZER_TOP_K
}

fn parse<T: DeserializeOwned>(payload: Value) -> Result<T, CommandError> {
    serde_json::from_value(payload).map_err(|err| CommandError::InvalidPayload(err.to_string()))
}

fn respond<T: Serialize>(response: &T) -> Result<Value, CommandError> {
    serde_json::to_value(response).map_err(CommandError::Encode)
}

fn team_warnings(team: &[Build]) -> Vec<String> {
    let warnings: Vec<String> = validate_team(team).iter().map(ToString::to_string).collect();
    for warning in &warnings {
        warn!(%warning, "configuration warning");
    }
    warnings
}

impl RotationRequest {
    fn resolve(self, data: &GameData) -> Result<ResolvedRequest<'_>, CommandError> {
        let scenario = match &self.scenario {
            Some(name) => data.scenarios.get(name).cloned().ok_or_else(|| {
                CommandError::InvalidPayload(format!("unknown scenario: {name}"))
            })?,
            None => Scenario::default(),
        };

        let team = match self.team {
            Some(team) => team,
            None => data.team(
                self.build_names
                    .as_deref()
                    .unwrap_or(scenario.team.as_slice()),
            ),
        };
        let enemy = self
            .enemy
            .or_else(|| scenario.enemy.clone())
            .unwrap_or_else(|| data.config.default_enemy());
        enemy.validate()?;
        let stage = data.stage_effect(
            self.stage_effects_name
                .as_deref()
                .unwrap_or(&scenario.stage_effects_name),
        );

        let mut options = data.config.simulation_options(&scenario);
        if let Some(marks) = self.time_marks_initial {
            options.damage.time_marks_initial = marks;
        }
        if let Some(marks) = self.time_marks_loop {
            options.damage.time_marks_loop = marks;
        }
        if let Some(seconds) = self.seconds_per_action {
            options.damage.seconds_per_action = seconds;
        }
        options.damage.ignored_buff = self.ignored_buff;
        options.loops = self.loops.unwrap_or(options.loops);
        options.runs = self.runs.unwrap_or(options.runs);
        options.seed = self.seed.unwrap_or(options.seed);

        Ok(ResolvedRequest {
            team,
            initial: self.initial.unwrap_or(scenario.initial),
            loop_actions: self.loop_actions.unwrap_or(scenario.loop_actions),
            enemy,
            stage,
            buffs: self.buffs,
            options,
        })
    }
}

impl ResolvedRequest<'_> {
    /// The team member whose echoes are optimized: `character` or the first one.
    fn optimized_build(&self, character: Option<&str>, command: &str) -> Result<&Build, CommandError> {
        match character {
            Some(name) => self.team.iter().find(|build| build.character_name == name),
            None => self.team.first(),
        }
        .ok_or_else(|| CommandError::InvalidPayload(format!("{command} needs the character on the team")))
    }

    fn loadout_context<'r>(&'r self, build: &'r Build, rotation: &'r RotationState) -> LoadoutContext<'r> {
        LoadoutContext {
            build,
            team: &self.team,
            rotation,
            enemy: &self.enemy,
            buff_overrides: self.buffs.as_ref(),
            stage: self.stage,
            options: &self.options.damage,
        }
    }
}

fn names<V>(collection: &BTreeMap<String, V>) -> Vec<String> {
    collection.keys().cloned().collect()
}

fn bootstrap(data: &GameData) -> BootstrapResponse {
    let mut main_stats = BTreeMap::new();
    for cost in EchoCost::ALL {
        let options = main_stat_options(cost)
            .iter()
            .map(|option| StatOptionResponse {
                key: option.key.to_string(),
                name: option.name.to_string(),
                value: option.value,
            })
            .collect();
        main_stats.insert(cost.to_string(), options);
    }
    let mut sub_stat_labels = BTreeMap::new();
    let mut sub_stat_values = BTreeMap::new();
    for sub in &SUB_STAT_TYPES {
        sub_stat_labels.insert(sub.key.to_string(), sub.name.to_string());
        sub_stat_values.insert(sub.key.to_string(), sub.values.to_vec());
    }

    BootstrapResponse {
        commands: COMMANDS.iter().map(|name| (*name).to_string()).collect(),
        characters: names(&data.characters),
        weapons: names(&data.weapons),
        harmony_effects: names(&data.harmony_effects),
        echo_skills: names(&data.echo_skills),
        builds: names(&data.builds),
        scenarios: names(&data.scenarios),
        stage_effects: names(&data.stage_effects),
        abnormal_effects: AbnormalEffect::ALL
            .iter()
            .map(|effect| effect.name().to_string())
            .collect(),
        main_stat_options: main_stats,
        sub_stat_labels,
        sub_stat_value_options: sub_stat_values,
        default_cost_combo: DEFAULT_COST_COMBO.to_string(),
        config: data.config.clone(),
    }
}

fn resolve_stats(
    payload: ResolveStatsRequest,
    data: &GameData,
) -> Result<ResolveStatsResponse, CommandError> {
    let build = match (payload.build, payload.build_name) {
        (Some(build), _) => build,
        (None, Some(name)) => data
            .team(std::slice::from_ref(&name))
            .into_iter()
            .next()
            .unwrap_or_default(),
        (None, None) => {
            return Err(CommandError::InvalidPayload(
                "either build or buildName is required".to_string(),
            ));
        }
    };
    let team = std::slice::from_ref(&build);
    let resolved = calculate_base_stats(&build);
    let resolved = if payload.active_buffs.is_empty() {
        resolved
    } else {
        resolved.with_buffs(&build, &payload.active_buffs, &gather_team_data(team).buffs)
    };

    Ok(ResolveStatsResponse {
        character: build.character_name.clone(),
        final_stats: resolved.final_stats,
        raw_stats: resolved.raw,
        bases: resolved.bases,
        warnings: team_warnings(team),
    })
}

fn aggregate_team(payload: RotationRequest, data: &GameData) -> Result<AggregateTeamResponse, CommandError> {
    let request = payload.resolve(data)?;
    let team_data = gather_team_data(&request.team);
    Ok(AggregateTeamResponse {
        team: team_names(&request.team).into_iter().collect(),
        buffs: team_data.buffs,
        skills: team_data.skills,
        warnings: team_warnings(&request.team),
    })
}

fn simulate_rotation(
    payload: RotationRequest,
    data: &GameData,
) -> Result<SimulateRotationResponse, CommandError> {
    let request = payload.resolve(data)?;
    let state = recalculate_rotation_state(&request.team, &request.initial, &request.loop_actions);
    Ok(SimulateRotationResponse {
        initial: state.initial,
        loop_actions: state.loop_actions,
        warnings: team_warnings(&request.team),
    })
}

fn compute_damage(payload: RotationRequest, data: &GameData) -> Result<ComputeDamageResponse, CommandError> {
    let request = payload.resolve(data)?;
    if request.team.iter().all(|build| !build.has_character()) {
        return Ok(ComputeDamageResponse::NothingConfigured);
    }
    let result = process_rotation(
        &request.team,
        &request.initial,
        &request.loop_actions,
        &request.enemy,
        request.buffs.as_ref(),
        request.stage,
        &request.options.damage,
    );
    let loops = request.options.loops;
    Ok(ComputeDamageResponse::Computed {
        projected_damage: result.projected_damage(loops),
        result,
        loops,
        warnings: team_warnings(&request.team),
    })
}

fn simulate_rng(payload: RotationRequest, data: &GameData) -> Result<SimulateRngResponse, CommandError> {
    let request = payload.resolve(data)?;
    let stats = simulate_with_rng(
        &request.team,
        &request.initial,
        &request.loop_actions,
        &request.enemy,
        request.buffs.as_ref(),
        request.stage,
        &request.options,
    )?;
    Ok(SimulateRngResponse {
        stats,
        loops: request.options.loops,
        seed: request.options.seed,
    })
}

fn optimize_echoes(
    payload: OptimizeEchoesRequest,
    data: &GameData,
) -> Result<OptimizeEchoesResponse, CommandError> {
    let combos = payload
        .cost_combos
        .iter()
        .map(|combo| combo.parse::<CostCombo>())
        .collect::<Result<Vec<_>, _>>()?;
    let request = payload.rotation.resolve(data)?;
    let build = request.optimized_build(payload.character.as_deref(), "optimize_echoes")?;

    let rotation = recalculate_rotation_state(&request.team, &request.initial, &request.loop_actions);
    let context = request.loadout_context(build, &rotation);
    let ranked = rank_owned_loadouts(&context, &payload.owned_echoes, &combos, payload.top_k);
    let loadouts = ranked
        .into_iter()
        .map(|score| LoadoutResponse {
            cost_combo: score.cost_combo.to_string(),
            echoes: score
                .echo_indices
                .iter()
                .map(|&index| payload.owned_echoes[index].clone())
                .collect(),
            echo_indices: score.echo_indices,
            total_damage: score.total_damage,
        })
        .collect();

    Ok(OptimizeEchoesResponse {
        character: build.character_name.clone(),
        loadouts,
    })
}

fn optimize_theoretical(
    payload: OptimizeTheoreticalRequest,
    data: &GameData,
) -> Result<OptimizeTheoreticalResponse, CommandError> {
    let mut search = payload.search;
    if search.cost_combos.is_empty() {
        search.cost_combos.push(DEFAULT_COST_COMBO.parse()?);
    }
    let request = payload.rotation.resolve(data)?;
    let build = request.optimized_build(payload.character.as_deref(), "optimize_theoretical")?;

    let rotation = recalculate_rotation_state(&request.team, &request.initial, &request.loop_actions);
    let context = request.loadout_context(build, &rotation);
    let loadouts = rank_generated_loadouts(&context, &search, payload.top_k)
        .into_iter()
        .map(|score| GeneratedLoadoutResponse {
            cost_combo: score.cost_combo.to_string(),
            echoes: score.echo_list,
            total_damage: score.total_damage,
        })
        .collect();

    Ok(OptimizeTheoreticalResponse {
        character: build.character_name.clone(),
        loadouts,
    })
}

/// Run one named command against `data`. A `null` payload counts as `{}`.
pub fn invoke(command: &str, payload: Value, data: &GameData) -> Result<Value, CommandError> {
    let payload = if payload.is_null() {
        Value::Object(Default::default())
    } else {
        payload
    };
    debug!(command, "invoking command");
    match command {
        "bootstrap" => respond(&bootstrap(data)),
        "resolve_stats" => respond(&resolve_stats(parse(payload)?, data)?),
        "aggregate_team" => respond(&aggregate_team(parse(payload)?, data)?),
        "simulate_rotation" => respond(&simulate_rotation(parse(payload)?, data)?),
        "compute_damage" => respond(&compute_damage(parse(payload)?, data)?),
        "simulate_rng" => respond(&simulate_rng(parse(payload)?, data)?),
        "optimize_echoes" => respond(&optimize_echoes(parse(payload)?, data)?),
        "optimize_theoretical" => respond(&optimize_theoretical(parse(payload)?, data)?),
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}
