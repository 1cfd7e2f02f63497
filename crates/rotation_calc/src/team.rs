//! Team-wide buff and skill collection plus roster validation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::buff::BuffTable;
use crate::data::{MAX_CONSTELLATION, MAX_ECHOES, MAX_WEAPON_RANK, MIN_WEAPON_RANK};
use crate::echo::{EchoError, validate_echo};
use crate::model::{Build, SkillData};

/// Every buff and skill a roster contributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamData {
    pub buffs: BuffTable,
    pub skills: BTreeMap<String, Vec<SkillData>>,
}

/// Collect buffs and skills from every build with a character.
///
/// Buff keys are namespaced by source and owner, so two characters defining
/// the same local key, wielding the same weapon or carrying the same echo skill
/// produce separate entries.
pub fn gather_team_data(team: &[Build]) -> TeamData {
    let mut data = TeamData::default();
    for build in team.iter().filter(|build| build.has_character()) {
        let name = build.character_name.as_str();
        let character = &build.character_data;
        let skills = data.skills.entry(name.to_string()).or_default();
        skills.extend(character.skills.iter().cloned());

        for (key, buff) in &character.buffs {
            data.buffs
                .insert(format!("char_{name}_{key}"), buff.owned_by(name));
        }

        for (&level, constellation) in character.constellations.range(..=build.constellation) {
            for (key, buff) in &constellation.buffs {
                data.buffs
                    .insert(format!("char_{name}_c{level}_{key}"), buff.owned_by(name));
            }
            skills.extend(constellation.skills.iter().cloned());
        }

        if let Some(effect) = &build.weapon_data.effect_data {
            data.buffs
                .insert(format!("weapon_{name}_{}", build.weapon_name), effect.owned_by(name));
        }

        if let Some(echo_skill) = &build.echo_skill_data {
            for (key, buff) in &echo_skill.buffs {
                data.buffs
                    .insert(
                    format!("echo_{name}_{}_{key}", echo_skill.name),
                    buff.owned_by(name),
                );
            }
            skills.extend(echo_skill.skills.iter().cloned());
        }
    }
    data
}

pub fn team_names(team: &[Build]) -> BTreeSet<String> {
    team.iter()
        .filter(|build| build.has_character())
        .map(|build| build.character_name.clone())
        .collect()
}

/// Default recipient of a single-target buff: the teammate after `owner` in
/// roster order, wrapping around. Falls back to `owner` on a solo team.
pub fn default_target<'a>(team: &'a [Build], owner: &'a str) -> &'a str {
    let members: Vec<&str> = team
        .iter()
        .filter(|build| build.has_character())
        .map(|build| build.character_name.as_str())
        .collect();
    let Some(index) = members.iter().position(|&name| name == owner) else {
        return members.first().copied().unwrap_or(owner);
    };
    members[(index + 1) % members.len()]
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigWarning {
    #[error("{name} appears more than once in the team")]
    DuplicateCharacter { name: String },
    #[error("{character}: constellation {value} outside 0..={max}", max = MAX_CONSTELLATION)]
    ConstellationOutOfRange { character: String, value: u8 },
    #[error(
        "{character}: weapon rank {value} outside {min}..={max}",
        min = MIN_WEAPON_RANK,
        max = MAX_WEAPON_RANK
    )]
    WeaponRankOutOfRange { character: String, value: u8 },
    #[error("{character}: {count} echoes equipped, at most {max}", max = MAX_ECHOES)]
    TooManyEchoes { character: String, count: usize },
    #[error("{character}: echo slot {slot}: {error}")]
    InvalidEcho {
        character: String,
        slot: usize,
        #[source]
        error: EchoError,
    },
    #[error("{character}: no resonance_energy_required, resonance energy caps at 1")]
    MissingResonanceRequirement { character: String },
}

/// Report configuration problems without rejecting the team.
pub fn validate_team(team: &[Build]) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();
    let mut seen = BTreeSet::new();
    for build in team.iter().filter(|build| build.has_character()) {
        let character = build.character_name.clone();
        if !seen.insert(build.character_name.as_str()) {
            warnings.push(ConfigWarning::DuplicateCharacter {
                name: character.clone(),
            });
        }
        if build.constellation > MAX_CONSTELLATION {
            warnings.push(ConfigWarning::ConstellationOutOfRange {
                character: character.clone(),
                value: build.constellation,
            });
        }
        if !(MIN_WEAPON_RANK..=MAX_WEAPON_RANK).contains(&build.weapon_rank) {
            warnings.push(ConfigWarning::WeaponRankOutOfRange {
                character: character.clone(),
                value: build.weapon_rank,
            });
        }
        if build.echo_list.len() > MAX_ECHOES {
            warnings.push(ConfigWarning::TooManyEchoes {
                character: character.clone(),
                count: build.echo_list.len(),
            });
        }
        for (slot, echo) in build.echo_list.iter().enumerate() {
            if let Err(error) = validate_echo(echo) {
                warnings.push(ConfigWarning::InvalidEcho {
                    character: character.clone(),
                    slot,
                    error,
                });
            }
        }
        if build.character_data.resonance_energy_required.is_none() {
            warnings.push(ConfigWarning::MissingResonanceRequirement { character });
        }
    }
    warnings
}
