use crate::model::{Attribute, DamageType, EchoCost};

pub const MAX_ECHOES: usize = 5;
pub const MAX_SUB_STATS: usize = 5;
pub const MAX_CONSTELLATION: u8 = 6;
pub const MIN_WEAPON_RANK: u8 = 1;
pub const MAX_WEAPON_RANK: u8 = 5;

pub const CHARACTER_LEVEL: f64 = 90.0;
pub const DEFAULT_ENEMY_LEVEL: f64 = 90.0;
pub const DEFAULT_ENEMY_RESISTANCE: f64 = 10.0;

pub const DEFAULT_RESONANCE_EFFICIENCY: f64 = 100.0;
pub const DEFAULT_SECONDS_PER_ACTION: f64 = 1.5;
// Used when a character has no resonance requirement configured.
pub const DEFAULT_RESONANCE_CAP: f64 = 1.0;
pub const MAX_CONCERTO_ENERGY: f64 = 100.0;

// Stat keys shared by echoes, buffs and the damage formula.
pub const HP_PERCENT: &str = "hp_percent";
pub const ATK_PERCENT: &str = "atk_percent";
pub const DEF_PERCENT: &str = "def_percent";
pub const HP_FLAT: &str = "hp_flat";
pub const ATK_FLAT: &str = "atk_flat";
pub const DEF_FLAT: &str = "def_flat";
pub const CRIT_RATE: &str = "crit_rate";
pub const CRIT_DAMAGE: &str = "crit_damage";
pub const RESONANCE_EFFICIENCY: &str = "resonance_efficiency";
pub const HEAL_BONUS: &str = "heal_bonus";
pub const ALL_DAMAGE_UP: &str = "all_damage_up";
pub const SKILL_MULTIPLIER_BONUS: &str = "skill_multiplier_bonus";
pub const GENERIC_DMG_BOOST: &str = "generic_dmg_boost";
pub const DEF_SHRED: &str = "def_shred";
pub const RES_SHRED: &str = "res_shred";
pub const DMG_TAKEN_UP: &str = "dmg_taken_up";

/// Raw stats every character starts with before any contribution.
pub const DEFAULT_RAW_STATS: [(&str, f64); 3] = [
    (CRIT_RATE, 5.0),
    (CRIT_DAMAGE, 150.0),
    (RESONANCE_EFFICIENCY, DEFAULT_RESONANCE_EFFICIENCY),
];

pub struct StatOption {
    pub name: &'static str,
    pub key: &'static str,
    pub value: f64,
}

pub const MAIN_STATS_COST_4: &[StatOption] = &[
    StatOption {
        name: "HP%",
        key: HP_PERCENT,
        value: 33.0,
    },
    StatOption {
        name: "ATK%",
        key: ATK_PERCENT,
        value: 33.0,
    },
    StatOption {
        name: "DEF%",
        key: DEF_PERCENT,
        value: 41.5,
    },
    StatOption {
        name: "Crit. Rate",
        key: CRIT_RATE,
        value: 22.0,
    },
    StatOption {
        name: "Crit. DMG",
        key: CRIT_DAMAGE,
        value: 44.0,
    },
    StatOption {
        name: "Healing Bonus",
        key: HEAL_BONUS,
        value: 26.4,
    },
];

pub const MAIN_STATS_COST_3: &[StatOption] = &[
    StatOption {
        name: "Aero DMG Bonus",
        key: "aero_dmg_up",
        value: 30.0,
    },
    StatOption {
        name: "Fusion DMG Bonus",
        key: "fusion_dmg_up",
        value: 30.0,
    },
    StatOption {
        name: "Electro DMG Bonus",
        key: "electro_dmg_up",
        value: 30.0,
    },
    StatOption {
        name: "Glacio DMG Bonus",
        key: "glacio_dmg_up",
        value: 30.0,
    },
    StatOption {
        name: "Havoc DMG Bonus",
        key: "havoc_dmg_up",
        value: 30.0,
    },
    StatOption {
        name: "Spectro DMG Bonus",
        key: "spectro_dmg_up",
        value: 30.0,
    },
    StatOption {
        name: "Energy Regen",
        key: RESONANCE_EFFICIENCY,
        value: 32.0,
    },
    StatOption {
        name: "ATK%",
        key: ATK_PERCENT,
        value: 30.0,
    },
    StatOption {
        name: "HP%",
        key: HP_PERCENT,
        value: 30.0,
    },
    StatOption {
        name: "DEF%",
        key: DEF_PERCENT,
        value: 38.0,
    },
];

pub const MAIN_STATS_COST_1: &[StatOption] = &[
    StatOption {
        name: "HP%",
        key: HP_PERCENT,
        value: 22.8,
    },
    StatOption {
        name: "ATK%",
        key: ATK_PERCENT,
        value: 18.0,
    },
    StatOption {
        name: "DEF%",
        key: DEF_PERCENT,
        value: 18.0,
    },
];

pub const FIXED_MAIN_STAT_COST_4: StatOption = StatOption {
    name: "ATK",
    key: ATK_FLAT,
    value: 150.0,
};
pub const FIXED_MAIN_STAT_COST_3: StatOption = StatOption {
    name: "ATK",
    key: ATK_FLAT,
    value: 100.0,
};
pub const FIXED_MAIN_STAT_COST_1: StatOption = StatOption {
    name: "HP",
    key: HP_FLAT,
    value: 1520.0,
};

pub fn main_stat_options(cost: EchoCost) -> &'static [StatOption] {
    match cost {
        EchoCost::Four => MAIN_STATS_COST_4,
        EchoCost::Three => MAIN_STATS_COST_3,
        EchoCost::One => MAIN_STATS_COST_1,
    }
}

pub fn fixed_main_stat(cost: EchoCost) -> &'static StatOption {
    match cost {
        EchoCost::Four => &FIXED_MAIN_STAT_COST_4,
        EchoCost::Three => &FIXED_MAIN_STAT_COST_3,
        EchoCost::One => &FIXED_MAIN_STAT_COST_1,
    }
}

pub const TOTAL_SUB_STAT_TYPES: usize = 13;

pub struct SubStatData {
    pub name: &'static str,
    pub key: &'static str,
    // Roll values from lowest to highest tier.
    pub values: &'static [f64],
}

const VALUES_PERCENT: &[f64] = &[6.4, 7.1, 7.9, 8.6, 9.4, 10.1, 10.9, 11.6];
const VALUES_DEF_PERCENT: &[f64] = &[8.1, 9.0, 10.0, 10.9, 11.8, 12.8, 13.6, 14.7];
const VALUES_CRIT_RATE: &[f64] = &[6.3, 6.9, 7.5, 8.1, 8.7, 9.3, 9.9, 10.5];
const VALUES_CRIT_DAMAGE: &[f64] = &[12.6, 13.8, 15.0, 16.2, 17.4, 18.6, 19.8, 21.0];
const VALUES_HP_FLAT: &[f64] = &[320.0, 360.0, 390.0, 430.0, 470.0, 510.0, 540.0, 580.0];
const VALUES_ATK_FLAT: &[f64] = &[30.0, 30.0, 40.0, 40.0, 50.0, 50.0, 60.0, 60.0];
const VALUES_DEF_FLAT: &[f64] = &[40.0, 40.0, 50.0, 50.0, 60.0, 60.0, 70.0, 70.0];
const VALUES_ER: &[f64] = &[6.8, 7.6, 8.4, 9.2, 10.0, 10.8, 11.6, 12.4];

pub const SUB_STAT_TYPES: [SubStatData; TOTAL_SUB_STAT_TYPES] = [
    SubStatData {
        name: "HP%",
        key: HP_PERCENT,
        values: VALUES_PERCENT,
    },
    SubStatData {
        name: "ATK%",
        key: ATK_PERCENT,
        values: VALUES_PERCENT,
    },
    SubStatData {
        name: "DEF%",
        key: DEF_PERCENT,
        values: VALUES_DEF_PERCENT,
    },
    SubStatData {
        name: "Crit. Rate",
        key: CRIT_RATE,
        values: VALUES_CRIT_RATE,
    },
    SubStatData {
        name: "Crit. DMG",
        key: CRIT_DAMAGE,
        values: VALUES_CRIT_DAMAGE,
    },
    SubStatData {
        name: "HP",
        key: HP_FLAT,
        values: VALUES_HP_FLAT,
    },
    SubStatData {
        name: "ATK",
        key: ATK_FLAT,
        values: VALUES_ATK_FLAT,
    },
    SubStatData {
        name: "DEF",
        key: DEF_FLAT,
        values: VALUES_DEF_FLAT,
    },
    SubStatData {
        name: "Energy Regen",
        key: RESONANCE_EFFICIENCY,
        values: VALUES_ER,
    },
    SubStatData {
        name: "Basic Attack DMG Bonus",
        key: "normal_attack_dmg_up",
        values: VALUES_PERCENT,
    },
    SubStatData {
        name: "Heavy Attack DMG Bonus",
        key: "heavy_attack_dmg_up",
        values: VALUES_PERCENT,
    },
    SubStatData {
        name: "Resonance Skill DMG Bonus",
        key: "resonance_skill_dmg_up",
        values: VALUES_PERCENT,
    },
    SubStatData {
        name: "Resonance Liberation DMG Bonus",
        key: "resonance_liberation_dmg_up",
        values: VALUES_PERCENT,
    },
];

pub fn sub_stat_data(key: &str) -> Option<&'static SubStatData> {
    SUB_STAT_TYPES.iter().find(|sub| sub.key == key)
}

// Abnormal status effects (level 90 base).
pub const ABNORMAL_DAMAGE_BASE: f64 = 1103.0;
const FRAZZLE_OVERFLOW_PER_STACK: f64 = 1.812;

const STACKS_SPECTRO_FRAZZLE: &[f64] = &[
    1.0, 1.811, 2.624, 3.436, 4.249, 5.06, 5.873, 6.685, 7.496, 8.309,
];
const STACKS_AERO_EROSION: &[f64] = &[1.0, 2.5, 5.0, 7.5, 10.0, 12.5, 15.0, 17.5, 20.0];
const STACKS_SINGLE: &[f64] = &[1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbnormalEffect {
    SpectroFrazzle,
    AeroErosion,
    FusionBurst,
    HavocBane,
}

impl AbnormalEffect {
    pub const ALL: [AbnormalEffect; 4] = [
        AbnormalEffect::SpectroFrazzle,
        AbnormalEffect::AeroErosion,
        AbnormalEffect::FusionBurst,
        AbnormalEffect::HavocBane,
    ];

    /// Abnormal effects are scheduled as actions whose skill name is the effect name.
    pub fn from_skill_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|effect| effect.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            AbnormalEffect::SpectroFrazzle => "spectro_frazzle",
            AbnormalEffect::AeroErosion => "aero_erosion",
            AbnormalEffect::FusionBurst => "fusion_burst",
            AbnormalEffect::HavocBane => "havoc_bane",
        }
    }

    pub fn attribute_coefficient(self) -> f64 {
        match self {
            AbnormalEffect::SpectroFrazzle => 1.0,
            AbnormalEffect::AeroErosion => 1.5,
            AbnormalEffect::FusionBurst => 19.0,
            AbnormalEffect::HavocBane => 10.0,
        }
    }

    pub fn damage_type(self) -> DamageType {
        match self {
            AbnormalEffect::SpectroFrazzle => DamageType::Spectro,
            AbnormalEffect::AeroErosion => DamageType::Aero,
            AbnormalEffect::FusionBurst => DamageType::Fusion,
            AbnormalEffect::HavocBane => DamageType::Havoc,
        }
    }

    pub fn attribute(self) -> Attribute {
        match self {
            AbnormalEffect::SpectroFrazzle => Attribute::Spectro,
            AbnormalEffect::AeroErosion => Attribute::Aero,
            AbnormalEffect::FusionBurst => Attribute::Fusion,
            AbnormalEffect::HavocBane => Attribute::Havoc,
        }
    }

    pub fn boost_key(self) -> &'static str {
        match self {
            AbnormalEffect::SpectroFrazzle => "spectro_effect_dmg_boost",
            AbnormalEffect::AeroErosion => "aero_effect_dmg_boost",
            AbnormalEffect::FusionBurst => "fusion_effect_dmg_boost",
            AbnormalEffect::HavocBane => "havoc_effect_dmg_boost",
        }
    }

    /// Damage multiplier for `stacks` stacks. Zero stacks deal no damage.
    pub fn stack_multiplier(self, stacks: u32) -> f64 {
        if stacks == 0 {
            return 0.0;
        }
        let table = match self {
            AbnormalEffect::SpectroFrazzle => STACKS_SPECTRO_FRAZZLE,
            AbnormalEffect::AeroErosion => STACKS_AERO_EROSION,
            AbnormalEffect::FusionBurst | AbnormalEffect::HavocBane => STACKS_SINGLE,
        };
        let stacks = stacks as usize;
        if self == AbnormalEffect::SpectroFrazzle && stacks > table.len() {
            return table[table.len() - 1] + (stacks - table.len()) as f64 * FRAZZLE_OVERFLOW_PER_STACK;
        }
        table[stacks.min(table.len()) - 1]
    }
}
