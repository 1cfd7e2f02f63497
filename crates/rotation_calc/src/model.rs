//! Build, character and skill definitions as supplied by the data store.
//!
//! Every field defaults so that partially edited builds still deserialize.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::buff::BuffData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Aero,
    Fusion,
    Electro,
    Glacio,
    Havoc,
    Spectro,
}

impl Attribute {
    pub const ALL: [Attribute; 6] = [
        Attribute::Aero,
        Attribute::Fusion,
        Attribute::Electro,
        Attribute::Glacio,
        Attribute::Havoc,
        Attribute::Spectro,
    ];

    pub fn dmg_up_key(self) -> &'static str {
        match self {
            Attribute::Aero => "aero_dmg_up",
            Attribute::Fusion => "fusion_dmg_up",
            Attribute::Electro => "electro_dmg_up",
            Attribute::Glacio => "glacio_dmg_up",
            Attribute::Havoc => "havoc_dmg_up",
            Attribute::Spectro => "spectro_dmg_up",
        }
    }

    pub fn dmg_boost_key(self) -> &'static str {
        match self {
            Attribute::Aero => "aero_dmg_boost",
            Attribute::Fusion => "fusion_dmg_boost",
            Attribute::Electro => "electro_dmg_boost",
            Attribute::Glacio => "glacio_dmg_boost",
            Attribute::Havoc => "havoc_dmg_boost",
            Attribute::Spectro => "spectro_dmg_boost",
        }
    }

    pub fn res_shred_key(self) -> &'static str {
        match self {
            Attribute::Aero => "aero_res_shred",
            Attribute::Fusion => "fusion_res_shred",
            Attribute::Electro => "electro_res_shred",
            Attribute::Glacio => "glacio_res_shred",
            Attribute::Havoc => "havoc_res_shred",
            Attribute::Spectro => "spectro_res_shred",
        }
    }

    pub fn res_ignore_key(self) -> &'static str {
        match self {
            Attribute::Aero => "aero_res_ignore",
            Attribute::Fusion => "fusion_res_ignore",
            Attribute::Electro => "electro_res_ignore",
            Attribute::Glacio => "glacio_res_ignore",
            Attribute::Havoc => "havoc_res_ignore",
            Attribute::Spectro => "spectro_res_ignore",
        }
    }

    pub fn damage_type(self) -> DamageType {
        match self {
            Attribute::Aero => DamageType::Aero,
            Attribute::Fusion => DamageType::Fusion,
            Attribute::Electro => DamageType::Electro,
            Attribute::Glacio => DamageType::Glacio,
            Attribute::Havoc => DamageType::Havoc,
            Attribute::Spectro => DamageType::Spectro,
        }
    }
}

/// The stat a skill multiplier scales from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingStat {
    #[default]
    Atk,
    Hp,
    Def,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationType {
    BasicAttack,
    HeavyAttack,
    ResonanceSkill,
    ResonanceLiberation,
    IntroSkill,
    OutroSkill,
    EchoSkill,
}

impl ActivationType {
    pub const ALL: [ActivationType; 7] = [
        ActivationType::BasicAttack,
        ActivationType::HeavyAttack,
        ActivationType::ResonanceSkill,
        ActivationType::ResonanceLiberation,
        ActivationType::IntroSkill,
        ActivationType::OutroSkill,
        ActivationType::EchoSkill,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActivationType::BasicAttack => "basic_attack",
            ActivationType::HeavyAttack => "heavy_attack",
            ActivationType::ResonanceSkill => "resonance_skill",
            ActivationType::ResonanceLiberation => "resonance_liberation",
            ActivationType::IntroSkill => "intro_skill",
            ActivationType::OutroSkill => "outro_skill",
            ActivationType::EchoSkill => "echo_skill",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    BasicAttack,
    HeavyAttack,
    ResonanceSkill,
    ResonanceLiberation,
    IntroSkill,
    OutroSkill,
    EchoSkill,
    Coordinated,
    Aero,
    Fusion,
    Electro,
    Glacio,
    Havoc,
    Spectro,
    SpectroFrazzle,
    AeroErosion,
    FusionBurst,
    HavocBane,
    Other,
}

impl DamageType {
    /// The attribute whose resistance applies to this damage, if any.
    pub fn attribute(self) -> Option<Attribute> {
        match self {
            DamageType::Aero | DamageType::AeroErosion => Some(Attribute::Aero),
            DamageType::Fusion | DamageType::FusionBurst => Some(Attribute::Fusion),
            DamageType::Electro => Some(Attribute::Electro),
            DamageType::Glacio => Some(Attribute::Glacio),
            DamageType::Havoc | DamageType::HavocBane => Some(Attribute::Havoc),
            DamageType::Spectro | DamageType::SpectroFrazzle => Some(Attribute::Spectro),
            _ => None,
        }
    }

    pub fn dmg_up_key(self) -> Option<&'static str> {
        let key = match self {
            DamageType::BasicAttack => "normal_attack_dmg_up",
            DamageType::HeavyAttack => "heavy_attack_dmg_up",
            DamageType::ResonanceSkill => "resonance_skill_dmg_up",
            DamageType::ResonanceLiberation => "resonance_liberation_dmg_up",
            DamageType::IntroSkill => "intro_skill_dmg_up",
            DamageType::OutroSkill => "outro_skill_dmg_up",
            DamageType::EchoSkill => "echo_skill_dmg_up",
            DamageType::Coordinated => "synergy_attack_dmg_up",
            DamageType::Aero => "aero_dmg_up",
            DamageType::Fusion => "fusion_dmg_up",
            DamageType::Electro => "electro_dmg_up",
            DamageType::Glacio => "glacio_dmg_up",
            DamageType::Havoc => "havoc_dmg_up",
            DamageType::Spectro => "spectro_dmg_up",
            DamageType::SpectroFrazzle => "spectro_effect_dmg_up",
            DamageType::AeroErosion => "aero_effect_dmg_up",
            DamageType::FusionBurst => "fusion_effect_dmg_up",
            DamageType::HavocBane => "havoc_effect_dmg_up",
            DamageType::Other => return None,
        };
        Some(key)
    }

    pub fn dmg_boost_key(self) -> Option<&'static str> {
        let key = match self {
            DamageType::BasicAttack => "normal_attack_dmg_boost",
            DamageType::HeavyAttack => "heavy_attack_dmg_boost",
            DamageType::ResonanceSkill => "resonance_skill_dmg_boost",
            DamageType::ResonanceLiberation => "resonance_liberation_dmg_boost",
            DamageType::IntroSkill => "intro_skill_dmg_boost",
            DamageType::OutroSkill => "outro_skill_dmg_boost",
            DamageType::EchoSkill => "echo_skill_dmg_boost",
            DamageType::Coordinated => "synergy_attack_dmg_boost",
            DamageType::Aero => "aero_dmg_boost",
            DamageType::Fusion => "fusion_dmg_boost",
            DamageType::Electro => "electro_dmg_boost",
            DamageType::Glacio => "glacio_dmg_boost",
            DamageType::Havoc => "havoc_dmg_boost",
            DamageType::Spectro => "spectro_dmg_boost",
            DamageType::SpectroFrazzle => "spectro_effect_dmg_boost",
            DamageType::AeroErosion => "aero_effect_dmg_boost",
            DamageType::FusionBurst => "fusion_effect_dmg_boost",
            DamageType::HavocBane => "havoc_effect_dmg_boost",
            DamageType::Other => return None,
        };
        Some(key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub key: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Stat {
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
            name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EchoCost {
    One,
    Three,
    Four,
}

impl EchoCost {
    pub const ALL: [EchoCost; 3] = [EchoCost::Four, EchoCost::Three, EchoCost::One];
}

impl TryFrom<u8> for EchoCost {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EchoCost::One),
            3 => Ok(EchoCost::Three),
            4 => Ok(EchoCost::Four),
            other => Err(format!("echo cost must be 1, 3 or 4, got {other}")),
        }
    }
}

impl From<EchoCost> for u8 {
    fn from(cost: EchoCost) -> Self {
        match cost {
            EchoCost::One => 1,
            EchoCost::Three => 3,
            EchoCost::Four => 4,
        }
    }
}

impl fmt::Display for EchoCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Echo {
    pub name: String,
    // Echoes without a cost are placeholders and contribute nothing.
    pub cost: Option<EchoCost>,
    pub main_stat: Option<Stat>,
    pub sub_stats: Vec<Stat>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillData {
    pub name: String,
    pub multiplier: f64,
    pub attribute: ScalingStat,
    pub activation_types: Vec<ActivationType>,
    pub damage_types: Vec<DamageType>,
    pub concerto_energy: f64,
    pub resonance_energy_gain_flat: f64,
    pub resonance_energy_gain_scaling: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_category: Option<String>,
    pub is_healing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstellationData {
    pub buffs: BTreeMap<String, BuffData>,
    pub skills: Vec<SkillData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterData {
    pub name: String,
    pub base_hp: f64,
    pub base_atk: f64,
    pub base_def: f64,
    pub resonance_energy_required: Option<f64>,
    pub innate_stats: Vec<Stat>,
    pub skills: Vec<SkillData>,
    pub buffs: BTreeMap<String, BuffData>,
    pub weapon_type: String,
    pub attribute: Option<Attribute>,
    pub constellations: BTreeMap<u8, ConstellationData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponData {
    pub name: String,
    pub base_atk: f64,
    pub sub_stat: Option<Stat>,
    pub weapon_type: String,
    pub effect_data: Option<BuffData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HarmonySet {
    #[serde(rename = "2set")]
    TwoPiece,
    #[serde(rename = "3set")]
    ThreePiece,
    #[serde(rename = "5set")]
    FivePiece,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonySetEffect {
    pub buffs: BTreeMap<String, BuffData>,
    pub skills: Vec<SkillData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonyData {
    pub name: String,
    pub has_2set_effect: bool,
    pub has_3set_effect: bool,
    pub has_5set_effect: bool,
    pub buffs: BTreeMap<HarmonySet, HarmonySetEffect>,
}

impl HarmonyData {
    pub fn is_set_enabled(&self, set: HarmonySet) -> bool {
        match set {
            HarmonySet::TwoPiece => self.has_2set_effect,
            HarmonySet::ThreePiece => self.has_3set_effect,
            HarmonySet::FivePiece => self.has_5set_effect,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoSkillData {
    pub name: String,
    pub skills: Vec<SkillData>,
    pub buffs: BTreeMap<String, BuffData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageEffectData {
    pub name: String,
    pub skills: Vec<SkillData>,
    pub buffs: BTreeMap<String, BuffData>,
}

/// A character's full loadout with every referenced definition inlined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Build {
    pub character_name: String,
    pub character_data: CharacterData,
    pub weapon_name: String,
    pub weapon_data: WeaponData,
    pub constellation: u8,
    pub weapon_rank: u8,
    pub harmony1_name: String,
    pub harmony1_data: Option<HarmonyData>,
    pub harmony2_name: String,
    pub harmony2_data: Option<HarmonyData>,
    pub echo_list: Vec<Echo>,
    pub echo_skill_name: String,
    pub echo_skill_data: Option<EchoSkillData>,
}

impl Default for Build {
    fn default() -> Self {
        Self {
            character_name: String::new(),
            character_data: CharacterData::default(),
            weapon_name: String::new(),
            weapon_data: WeaponData::default(),
            constellation: 0,
            weapon_rank: 1,
            harmony1_name: String::new(),
            harmony1_data: None,
            harmony2_name: String::new(),
            harmony2_data: None,
            echo_list: Vec::new(),
            echo_skill_name: String::new(),
            echo_skill_data: None,
        }
    }
}

impl Build {
    pub fn has_character(&self) -> bool {
        !self.character_name.is_empty()
    }
}
