//! Stat resolution: build description in, raw and final stats out.
//!
//! Percentage and flat bonuses for the same attribute are kept in separate
//! raw keys and only combined when final stats are derived:
//! `final = base * (1 + sum(percent) / 100) + sum(flat)`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::buff::{ActiveBuffs, BuffEffect, BuffTable, RankedValue};
use crate::data::{
    ALL_DAMAGE_UP, ATK_FLAT, ATK_PERCENT, CRIT_DAMAGE, CRIT_RATE, DEF_FLAT, DEF_PERCENT,
    DEFAULT_RAW_STATS, DEFAULT_RESONANCE_EFFICIENCY, HEAL_BONUS, HP_FLAT, HP_PERCENT,
    RESONANCE_EFFICIENCY, fixed_main_stat,
};
use crate::model::{Attribute, Build, HarmonyData, HarmonySet};

/// Accumulated stat contributions keyed by stat key.
///
/// Missing keys read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawStats(BTreeMap<String, f64>);

impl RawStats {
    pub fn with_defaults() -> Self {
        let mut raw = Self::default();
        for (key, value) in DEFAULT_RAW_STATS {
            raw.add(key, value);
        }
        raw
    }

    pub fn get(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(0.0)
    }

    pub fn add(&mut self, key: &str, value: f64) {
        *self.0.entry(key.to_string()).or_insert(0.0) += value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(key, value)| (key.as_str(), *value))
    }
}

/// Unmodified HP/ATK/DEF that percentage bonuses scale from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseValues {
    pub hp: f64,
    pub atk: f64,
    pub def: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalStats {
    pub hp: f64,
    pub atk: f64,
    pub def: f64,
    pub crit_rate: f64,
    pub crit_damage: f64,
    pub resonance_efficiency: f64,
    pub heal_bonus: f64,
    pub all_damage_up: f64,
    pub elemental_damage_up: BTreeMap<Attribute, f64>,
    /// Expected damage factor from crits: `1 + cr * cd`.
    pub crit_multiplier: f64,
}

impl FinalStats {
    pub fn derive(bases: &BaseValues, raw: &RawStats) -> Self {
        let crit_rate = raw.get(CRIT_RATE);
        let crit_damage = raw.get(CRIT_DAMAGE);
        Self {
            hp: bases.hp * (1.0 + raw.get(HP_PERCENT) / 100.0) + raw.get(HP_FLAT),
            atk: bases.atk * (1.0 + raw.get(ATK_PERCENT) / 100.0) + raw.get(ATK_FLAT),
            def: bases.def * (1.0 + raw.get(DEF_PERCENT) / 100.0) + raw.get(DEF_FLAT),
            crit_rate,
            crit_damage,
            resonance_efficiency: raw.get(RESONANCE_EFFICIENCY),
            heal_bonus: raw.get(HEAL_BONUS),
            all_damage_up: raw.get(ALL_DAMAGE_UP),
            elemental_damage_up: Attribute::ALL
                .into_iter()
                .map(|attribute| (attribute, raw.get(attribute.dmg_up_key())))
                .collect(),
            crit_multiplier: 1.0 + crit_rate.clamp(0.0, 100.0) / 100.0 * (crit_damage / 100.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStats {
    pub final_stats: FinalStats,
    pub raw: RawStats,
    pub bases: BaseValues,
}

impl ResolvedStats {
    /// Re-derive with `active` buffs applied on top of the unbuffed raw stats.
    pub fn with_buffs(&self, build: &Build, active: &ActiveBuffs, all_buffs: &BuffTable) -> Self {
        let raw = apply_buffs(
            &self.raw,
            active,
            &build.character_name,
            all_buffs,
            build.constellation,
            build.weapon_rank,
            None,
        );
        Self {
            final_stats: FinalStats::derive(&self.bases, &raw),
            raw,
            bases: self.bases,
        }
    }
}

/// Resolve a build's stats without any rotation buffs.
///
/// Missing character or weapon data contributes nothing.
pub fn calculate_base_stats(build: &Build) -> ResolvedStats {
    let character = &build.character_data;
    let weapon = &build.weapon_data;

    let mut raw = RawStats::with_defaults();
    for stat in &character.innate_stats {
        raw.add(&stat.key, stat.value);
    }
    for echo in &build.echo_list {
        let Some(cost) = echo.cost else {
            continue;
        };
        if let Some(main) = &echo.main_stat {
            raw.add(&main.key, main.value);
        }
        let fixed = fixed_main_stat(cost);
        raw.add(fixed.key, fixed.value);
        for sub in &echo.sub_stats {
            raw.add(&sub.key, sub.value);
        }
    }
    apply_harmony_effects(
        &mut raw,
        build.harmony1_data.as_ref(),
        build.harmony2_data.as_ref(),
    );
    if let Some(sub) = &weapon.sub_stat {
        if !sub.key.is_empty() {
            raw.add(&sub.key, sub.value);
        }
    }

    let bases = BaseValues {
        hp: character.base_hp,
        atk: character.base_atk + weapon.base_atk,
        def: character.base_def,
    };
    ResolvedStats {
        final_stats: FinalStats::derive(&bases, &raw),
        raw,
        bases,
    }
}

fn apply_set_effect(raw: &mut RawStats, harmony: &HarmonyData, set: HarmonySet) {
    if !harmony.is_set_enabled(set) {
        return;
    }
    let Some(effect) = harmony.buffs.get(&set) else {
        return;
    };
    for buff in effect.buffs.values() {
        for effect in &buff.effects {
            // Set bonuses do not scale with weapon rank.
            if let Some((key, value)) = effect.direct_bonus(1, 1) {
                raw.add(key, value);
            }
        }
    }
}

fn apply_harmony_effects(
    raw: &mut RawStats,
    first: Option<&HarmonyData>,
    second: Option<&HarmonyData>,
) {
    let Some(first) = first.filter(|h| !h.name.is_empty()) else {
        return;
    };
    let second = second.filter(|h| !h.name.is_empty());

    if second.is_some_and(|second| second.name == first.name) {
        apply_set_effect(raw, first, HarmonySet::TwoPiece);
        apply_set_effect(raw, first, HarmonySet::ThreePiece);
        apply_set_effect(raw, first, HarmonySet::FivePiece);
        return;
    }

    apply_set_effect(raw, first, HarmonySet::TwoPiece);
    apply_set_effect(raw, first, HarmonySet::ThreePiece);
    if let Some(second) = second {
        apply_set_effect(raw, second, HarmonySet::TwoPiece);
        apply_set_effect(raw, second, HarmonySet::ThreePiece);
    }
}

fn apply_stat_conversion(
    stats: &mut RawStats,
    source_stat: &str,
    dest_stat: &str,
    threshold: f64,
    per_unit: f64,
    gain_unit: &RankedValue,
    max_gain: Option<&RankedValue>,
    rank: u8,
) {
    let source = stats.get(source_stat);
    if source <= threshold || per_unit == 0.0 {
        return;
    }
    let bonus = (source - threshold) / per_unit * gain_unit.at(rank);
    let cap = max_gain.map_or(f64::INFINITY, |max| max.at(rank));
    stats.add(dest_stat, bonus.min(cap));
}

/// Apply every applicable active buff to a copy of `raw`.
///
/// Bonuses on the same key are summed, so the application order only
/// matters for stat conversions that read a key another buff writes.
pub fn apply_buffs(
    raw: &RawStats,
    active: &ActiveBuffs,
    character: &str,
    all_buffs: &BuffTable,
    constellation: u8,
    weapon_rank: u8,
    ignored_buff: Option<&str>,
) -> RawStats {
    let mut buffed = raw.clone();
    for (key, status) in active {
        if ignored_buff == Some(key.as_str()) {
            continue;
        }
        let Some(info) = all_buffs.get(key) else {
            continue;
        };
        if info.constellation > constellation || info.is_transient {
            continue;
        }
        if !info.applies_to(character, status) {
            continue;
        }
        for effect in &info.effects {
            if let Some((stat, value)) = effect.direct_bonus(weapon_rank, status.stacks()) {
                buffed.add(stat, value);
                continue;
            }
            if let BuffEffect::StatConversion {
                source_stat,
                dest_stat,
                threshold,
                conversion_per_unit,
                conversion_gain_unit,
                max_gain,
            } = effect
            {
                apply_stat_conversion(
                    &mut buffed,
                    source_stat,
                    dest_stat,
                    *threshold,
                    *conversion_per_unit,
                    conversion_gain_unit,
                    max_gain.as_ref(),
                    weapon_rank,
                );
            }
        }
    }
    buffed
}

/// Resonance efficiency of `build` under `active` buffs.
pub fn character_efficiency(
    build: Option<&Build>,
    base_raw: &RawStats,
    active: &ActiveBuffs,
    all_buffs: &BuffTable,
) -> f64 {
    let Some(build) = build else {
        return DEFAULT_RESONANCE_EFFICIENCY;
    };
    apply_buffs(
        base_raw,
        active,
        &build.character_name,
        all_buffs,
        build.constellation,
        build.weapon_rank,
        None,
    )
    .get(RESONANCE_EFFICIENCY)
}
