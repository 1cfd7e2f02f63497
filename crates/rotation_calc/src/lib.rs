mod action;
mod buff;
mod commands;
mod crit;
mod damage;
mod data;
mod echo;
mod enemy;
mod energy;
mod generator;
mod model;
mod optimizer;
mod rotation;
mod search;
mod simulation;
mod stats;
mod store;
mod team;

pub use action::{Action, BuffOverrides, CalculationResult, LogEntry, PhaseResult, RotationState};
pub use buff::{
    ActiveBuffs, BuffData, BuffEffect, BuffStatus, BuffTable, BuffTarget, RankedValue,
    TriggerCondition, TriggerEvent, TriggerSource, TriggerTiming,
};
pub use commands::{COMMANDS, CommandError, invoke};
pub use crit::{CritModel, ExpectedCrit, RolledCrit};
pub use damage::{
    DamageBreakdown, DamageOptions, STAGE_OWNER, calculate_abnormal_damage,
    calculate_skill_damage, phase_time, process_rotation, skill_damage_breakdown,
};
pub use data::{AbnormalEffect, MAX_ECHOES, fixed_main_stat, main_stat_options, sub_stat_data};
pub use echo::{EchoError, validate_echo, validate_main_stat, validate_sub_stat};
pub use enemy::{EnemyError, EnemyFactors, EnemyInfo, resistance_factor};
pub use energy::EnergyState;
pub use model::{
    ActivationType, Attribute, Build, CharacterData, ConstellationData, DamageType, Echo,
    EchoCost, EchoSkillData, HarmonyData, HarmonySet, HarmonySetEffect, ScalingStat, SkillData,
    StageEffectData, Stat, WeaponData,
};
pub use generator::{
    BuildSearch, DEFAULT_SUB_ROLL_TIER, GeneratedLoadout, GeneratedScore, SubStatPriority,
    generate_loadouts, rank_generated_loadouts,
};
pub use optimizer::{
    CostCombo, LoadoutContext, LoadoutScore, OptimizerError, owned_loadouts, rank_owned_loadouts,
};
pub use rotation::recalculate_rotation_state;
pub use simulation::{
    DEFAULT_LOOP_COUNT, DEFAULT_SIMULATION_RUNS, SimulationError, SimulationOptions,
    SimulationStats, simulate_with_rng,
};
pub use stats::{
    BaseValues, FinalStats, RawStats, ResolvedStats, apply_buffs, calculate_base_stats,
    character_efficiency,
};
pub use store::{BuildRecord, GameData, Scenario, StoreError, UserConfig};
pub use team::{ConfigWarning, TeamData, default_target, gather_team_data, team_names, validate_team};
