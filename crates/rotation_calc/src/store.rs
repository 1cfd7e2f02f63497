//! Read-only access to the JSON data directory.
//!
//! ```text
//! <dir>/
//!   characters.json  weapons.json  harmony_effects.json  echo_skills.json
//!   builds.json  scenarios.json  stage_effects.json  config.json
//! ```
//!
//! Every file is a mapping from item name to definition. Missing or blank
//! files load as empty collections.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::action::{Action, RotationState};
use crate::damage::DamageOptions;
use crate::data::{DEFAULT_ENEMY_LEVEL, DEFAULT_SECONDS_PER_ACTION};
use crate::enemy::EnemyInfo;
use crate::model::{
    Build, CharacterData, Echo, EchoSkillData, HarmonyData, StageEffectData, WeaponData,
};
use crate::simulation::{DEFAULT_LOOP_COUNT, DEFAULT_SIMULATION_RUNS, SimulationOptions};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A saved build: names plus the player's own choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildRecord {
    pub character_name: String,
    pub weapon_name: String,
    pub constellation: u8,
    pub weapon_rank: u8,
    pub harmony1_name: String,
    pub harmony2_name: String,
    pub echo_list: Vec<Echo>,
    pub echo_skill_name: String,
}

impl Default for BuildRecord {
    fn default() -> Self {
        Self {
            character_name: String::new(),
            weapon_name: String::new(),
            constellation: 0,
            weapon_rank: 1,
            harmony1_name: String::new(),
            harmony2_name: String::new(),
            echo_list: Vec::new(),
            echo_skill_name: String::new(),
        }
    }
}

/// A saved calculation: team, rotation and enemy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Keys into `builds.json`, in roster order.
    pub team: Vec<String>,
    pub initial: Vec<Action>,
    #[serde(rename = "loop")]
    pub loop_actions: Vec<Action>,
    pub enemy: Option<EnemyInfo>,
    pub stage_effects_name: String,
    pub time_marks_initial: Vec<bool>,
    pub time_marks_loop: Vec<bool>,
}

impl Scenario {
    pub fn rotation(&self) -> RotationState {
        RotationState {
            initial: self.initial.clone(),
            loop_actions: self.loop_actions.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub enemy_level: f64,
    pub loop_count: u32,
    pub simulation_runs: usize,
    pub seconds_per_action: f64,
    pub rng_seed: u64,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            enemy_level: DEFAULT_ENEMY_LEVEL,
            loop_count: DEFAULT_LOOP_COUNT,
            simulation_runs: DEFAULT_SIMULATION_RUNS,
            seconds_per_action: DEFAULT_SECONDS_PER_ACTION,
            rng_seed: 0,
        }
    }
}

impl UserConfig {
    pub fn default_enemy(&self) -> EnemyInfo {
        EnemyInfo {
            level: self.enemy_level,
            ..Default::default()
        }
    }

    pub fn damage_options(&self, scenario: &Scenario) -> DamageOptions {
        DamageOptions {
            seconds_per_action: self.seconds_per_action,
            time_marks_initial: scenario.time_marks_initial.clone(),
            time_marks_loop: scenario.time_marks_loop.clone(),
            ignored_buff: None,
        }
    }

    pub fn simulation_options(&self, scenario: &Scenario) -> SimulationOptions {
        SimulationOptions {
            runs: self.simulation_runs,
            loops: self.loop_count,
            seed: self.rng_seed,
            damage: self.damage_options(scenario),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameData {
    pub characters: BTreeMap<String, CharacterData>,
    pub weapons: BTreeMap<String, WeaponData>,
    pub harmony_effects: BTreeMap<String, HarmonyData>,
    pub echo_skills: BTreeMap<String, EchoSkillData>,
    pub builds: BTreeMap<String, BuildRecord>,
    pub scenarios: BTreeMap<String, Scenario>,
    pub stage_effects: BTreeMap<String, StageEffectData>,
    pub config: UserConfig,
}

fn load_file<T: DeserializeOwned + Default>(dir: &Path, name: &str) -> Result<T, StoreError> {
    let path = dir.join(format!("{name}.json"));
    if !path.is_file() {
        return Ok(T::default());
    }
    let json = fs::read_to_string(&path).map_err(|source| StoreError::Io {
        path: path.clone(),
        source,
    })?;
    if json.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&json).map_err(|source| StoreError::Json { path, source })
}

fn lookup<T: Clone + Default>(collection: &BTreeMap<String, T>, kind: &str, name: &str) -> T {
    if name.is_empty() {
        return T::default();
    }
    match collection.get(name) {
        Some(item) => item.clone(),
        None => {
            warn!(kind, name, "unknown reference, using an empty definition");
            T::default()
        }
    }
}

impl GameData {
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        let data = Self {
            characters: load_file(dir, "characters")?,
            weapons: load_file(dir, "weapons")?,
            harmony_effects: load_file(dir, "harmony_effects")?,
            echo_skills: load_file(dir, "echo_skills")?,
            builds: load_file(dir, "builds")?,
            scenarios: load_file(dir, "scenarios")?,
            stage_effects: load_file(dir, "stage_effects")?,
            config: load_file(dir, "config")?,
        };
        debug!(
            dir = %dir.display(),
            characters = data.characters.len(),
            weapons = data.weapons.len(),
            builds = data.builds.len(),
            scenarios = data.scenarios.len(),
            "data directory loaded"
        );
        Ok(data)
    }

    /// Inline every definition a saved build refers to.
    pub fn hydrate(&self, record: &BuildRecord) -> Build {
        let optional = |name: &str, data: Option<&HarmonyData>| {
            (!name.is_empty()).then(|| data.cloned().unwrap_or_default())
        };
        Build {
            character_name: record.character_name.clone(),
            character_data: lookup(&self.characters, "character", &record.character_name),
            weapon_name: record.weapon_name.clone(),
            weapon_data: lookup(&self.weapons, "weapon", &record.weapon_name),
            constellation: record.constellation,
            weapon_rank: record.weapon_rank,
            harmony1_name: record.harmony1_name.clone(),
            harmony1_data: optional(
                &record.harmony1_name,
                self.harmony_effects.get(&record.harmony1_name),
            ),
            harmony2_name: record.harmony2_name.clone(),
            harmony2_data: optional(
                &record.harmony2_name,
                self.harmony_effects.get(&record.harmony2_name),
            ),
            echo_list: record.echo_list.clone(),
            echo_skill_name: record.echo_skill_name.clone(),
            echo_skill_data: (!record.echo_skill_name.is_empty()).then(|| {
                lookup(&self.echo_skills, "echo skill", &record.echo_skill_name)
            }),
        }
    }

    /// Hydrated builds for the named saved builds; unknown names are skipped.
    pub fn team(&self, names: &[String]) -> Vec<Build> {
        names
            .iter()
            .filter_map(|name| match self.builds.get(name) {
                Some(record) => Some(self.hydrate(record)),
                None => {
                    warn!(build = name.as_str(), "unknown build skipped");
                    None
                }
            })
            .collect()
    }

    pub fn stage_effect(&self, name: &str) -> Option<&StageEffectData> {
        if name.is_empty() {
            return None;
        }
        self.stage_effects.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, json: &str) {
        fs::write(dir.path().join(name), json).unwrap();
    }

    #[test]
    fn missing_directory_loads_empty_collections() {
        let dir = TempDir::new().unwrap();
        let data = GameData::load_dir(dir.path().join("absent")).unwrap();
        assert_eq!(data, GameData::default());
        assert_eq!(data.config.loop_count, 5);
    }

    #[test]
    fn blank_files_load_as_empty() {
        let dir = TempDir::new().unwrap();
        write(&dir, "characters.json", "  \n");
        write(&dir, "config.json", "");
        let data = GameData::load_dir(dir.path()).unwrap();
        assert!(data.characters.is_empty());
        assert_eq!(data.config, UserConfig::default());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "weapons.json", "{ not json");
        let err = GameData::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
        assert!(err.to_string().contains("weapons.json"));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        write(&dir, "config.json", r#"{"loop_count": 8, "rng_seed": 3}"#);
        let config = GameData::load_dir(dir.path()).unwrap().config;
        assert_eq!(config.loop_count, 8);
        assert_eq!(config.rng_seed, 3);
        assert_eq!(config.simulation_runs, 1000);
        assert_eq!(config.seconds_per_action, 1.5);
    }

    #[test]
    fn hydrate_inlines_known_definitions() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "characters.json",
            r#"{"Alpha": {"name": "Alpha", "base_atk": 400, "resonance_energy_required": 125}}"#,
        );
        write(
            &dir,
            "weapons.json",
            r#"{"Blade": {"name": "Blade", "base_atk": 500, "sub_stat": {"key": "crit_rate", "value": 24.3}}}"#,
        );
        write(
            &dir,
            "builds.json",
            r#"{
                "alpha main": {"character_name": "Alpha", "weapon_name": "Blade", "constellation": 2,
                               "harmony1_name": "Missing Set",
                               "echo_list": [{"cost": 4, "main_stat": {"key": "crit_rate", "value": 22}}]},
                "ghost": {"character_name": "Ghost"}
            }"#,
        );
        let data = GameData::load_dir(dir.path()).unwrap();

        let team = data.team(&["alpha main".to_string(), "nobody".to_string()]);
        assert_eq!(team.len(), 1);
        let alpha = &team[0];
        assert_eq!(alpha.character_data.base_atk, 400.0);
        assert_eq!(alpha.weapon_data.base_atk, 500.0);
        assert_eq!(alpha.weapon_rank, 1);
        assert_eq!(alpha.constellation, 2);
        assert_eq!(alpha.harmony1_data, Some(HarmonyData::default()));
        assert_eq!(alpha.harmony2_data, None);
        assert_eq!(alpha.echo_list.len(), 1);

        let ghost = data.hydrate(&data.builds["ghost"]);
        assert_eq!(ghost.character_data, CharacterData::default());
    }

    #[test]
    fn scenario_reads_loop_key() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "scenarios.json",
            r#"{"opener": {"team": ["a"], "initial": [{"character": "A", "skill": "Hit"}],
                           "loop": [{"character": "A", "skill": "Hit"}, {"character": "A", "skill": "Hit"}],
                           "time_marks_loop": [true, false]}}"#,
        );
        let data = GameData::load_dir(dir.path()).unwrap();
        let scenario = &data.scenarios["opener"];
        assert_eq!(scenario.rotation().loop_actions.len(), 2);
        let options = data.config.damage_options(scenario);
        assert_eq!(options.time_marks_loop, vec![true, false]);
        assert!(data.stage_effect(&scenario.stage_effects_name).is_none());
    }
}
