//! Per-action damage and phase totals.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::{Action, CalculationResult, LogEntry, PhaseResult};
use crate::buff::{ActiveBuffs, BuffEffect, BuffStatus, BuffTable, BuffTarget, TriggerContext};
use crate::crit::{CritModel, ExpectedCrit};
use crate::data::{
    ABNORMAL_DAMAGE_BASE, ALL_DAMAGE_UP, AbnormalEffect, CRIT_DAMAGE, CRIT_RATE,
    DEFAULT_RESONANCE_CAP, DEFAULT_SECONDS_PER_ACTION, GENERIC_DMG_BOOST, SKILL_MULTIPLIER_BONUS,
};
use crate::enemy::EnemyInfo;
use crate::energy::{EnergyGain, EnergyState};
use crate::model::{
    ActivationType, Attribute, Build, DamageType, ScalingStat, SkillData, StageEffectData,
};
use crate::rotation::resolve_skill;
use crate::stats::{
    BaseValues, FinalStats, RawStats, ResolvedStats, apply_buffs, calculate_base_stats,
    character_efficiency,
};
use crate::team::{TeamData, default_target, gather_team_data};

/// Owner recorded on buffs contributed by the stage rather than a character.
pub const STAGE_OWNER: &str = "Stage";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageOptions {
    pub seconds_per_action: f64,
    /// One flag per elapsed second; empty means "estimate from action count".
    pub time_marks_initial: Vec<bool>,
    pub time_marks_loop: Vec<bool>,
    /// Buff left out of every calculation, for measuring its contribution.
    pub ignored_buff: Option<String>,
}

impl Default for DamageOptions {
    fn default() -> Self {
        Self {
            seconds_per_action: DEFAULT_SECONDS_PER_ACTION,
            time_marks_initial: Vec::new(),
            time_marks_loop: Vec::new(),
            ignored_buff: None,
        }
    }
}

pub fn phase_time(time_marks: &[bool], action_count: usize, seconds_per_action: f64) -> f64 {
    if time_marks.is_empty() {
        action_count as f64 * seconds_per_action
    } else {
        time_marks.iter().filter(|&&mark| mark).count() as f64
    }
}

fn elemental_attribute(kind: DamageType) -> Option<Attribute> {
    Attribute::ALL
        .into_iter()
        .find(|attribute| attribute.damage_type() == kind)
}

/// Terms of the skill damage formula for one hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageBreakdown {
    pub reference_stat: ScalingStat,
    pub reference_value: f64,
    /// Skill multiplier in percent, before the bonus.
    pub skill_multiplier: f64,
    pub multiplier_bonus: f64,
    /// `reference_value * (skill_multiplier + multiplier_bonus) / 100`.
    pub base_damage: f64,
    pub damage_up: f64,
    pub damage_boost: f64,
    pub crit: f64,
    pub defense: f64,
    pub resistance: f64,
    pub damage_taken: f64,
    pub damage: f64,
}

/// Damage of one skill hit.
///
/// When the skill lists no elemental damage type, `character_attribute`
/// supplies one.
pub fn calculate_skill_damage<C: CritModel + ?Sized>(
    bases: &BaseValues,
    raw: &RawStats,
    skill: &SkillData,
    enemy: &EnemyInfo,
    character_attribute: Option<Attribute>,
    crit: &mut C,
) -> f64 {
    skill_damage_breakdown(bases, raw, skill, enemy, character_attribute, crit).damage
}

/// [`calculate_skill_damage`] with every factor of the product kept.
pub fn skill_damage_breakdown<C: CritModel + ?Sized>(
    bases: &BaseValues,
    raw: &RawStats,
    skill: &SkillData,
    enemy: &EnemyInfo,
    character_attribute: Option<Attribute>,
    crit: &mut C,
) -> DamageBreakdown {
    let stats = FinalStats::derive(bases, raw);
    let reference_value = match skill.attribute {
        ScalingStat::Atk => stats.atk,
        ScalingStat::Hp => stats.hp,
        ScalingStat::Def => stats.def,
    };
    let multiplier_bonus = raw.get(SKILL_MULTIPLIER_BONUS);
    let base_damage = reference_value * (skill.multiplier + multiplier_bonus) / 100.0;

    let mut damage_types = skill.damage_types.clone();
    if !damage_types
        .iter()
        .any(|&kind| elemental_attribute(kind).is_some())
    {
        if let Some(attribute) = character_attribute {
            damage_types.push(attribute.damage_type());
        }
    }

    let type_damage_up: f64 = damage_types
        .iter()
        .filter_map(|kind| kind.dmg_up_key())
        .map(|key| raw.get(key))
        .sum();
    let damage_up = 1.0 + (raw.get(ALL_DAMAGE_UP) + type_damage_up) / 100.0;
    let type_boost: f64 = damage_types
        .iter()
        .filter_map(|kind| kind.dmg_boost_key())
        .map(|key| raw.get(key))
        .sum();
    let damage_boost = 1.0 + (raw.get(GENERIC_DMG_BOOST) + type_boost) / 100.0;

    let crit_factor = crit.crit_factor(raw.get(CRIT_RATE), raw.get(CRIT_DAMAGE));
    let attribute = damage_types.iter().find_map(|&kind| elemental_attribute(kind));
    let enemy_factors = enemy.factors(raw, attribute);

    let damage = base_damage * damage_up * damage_boost * crit_factor * enemy_factors.product();
    DamageBreakdown {
        reference_stat: skill.attribute,
        reference_value,
        skill_multiplier: skill.multiplier,
        multiplier_bonus,
        base_damage,
        damage_up,
        damage_boost,
        crit: crit_factor,
        defense: enemy_factors.defense,
        resistance: enemy_factors.resistance,
        damage_taken: enemy_factors.damage_taken,
        damage: damage.max(0.0),
    }
}

/// Damage of one abnormal effect tick. Abnormal effects never crit.
pub fn calculate_abnormal_damage(
    effect: AbnormalEffect,
    stacks: u32,
    raw: &RawStats,
    enemy: &EnemyInfo,
) -> f64 {
    let initial =
        ABNORMAL_DAMAGE_BASE * effect.attribute_coefficient() * effect.stack_multiplier(stacks);
    let boost = 1.0 + raw.get(effect.boost_key()) / 100.0;
    let enemy_factors = enemy.factors(raw, Some(effect.attribute()));
    (initial * boost * enemy_factors.product()).max(0.0)
}

struct Member<'a> {
    build: &'a Build,
    stats: ResolvedStats,
    resonance_cap: f64,
}

/// Team-wide state shared by every phase of a damage pass.
pub(crate) struct DamageContext<'a> {
    team: &'a [Build],
    members: BTreeMap<&'a str, Member<'a>>,
    team_data: TeamData,
    buffs: BuffTable,
    trigger_team: BTreeSet<String>,
    enemy: &'a EnemyInfo,
    ignored_buff: Option<&'a str>,
}

impl<'a> DamageContext<'a> {
    pub(crate) fn new(
        team: &'a [Build],
        enemy: &'a EnemyInfo,
        buff_overrides: Option<&BuffTable>,
        stage: Option<&StageEffectData>,
        ignored_buff: Option<&'a str>,
    ) -> Self {
        let team_data = gather_team_data(team);
        let mut buffs = buff_overrides.cloned().unwrap_or_else(|| team_data.buffs.clone());
        let mut trigger_team: BTreeSet<String> = team
            .iter()
            .filter(|build| build.has_character())
            .map(|build| build.character_name.clone())
            .collect();
        if let Some(stage) = stage {
            for (key, buff) in &stage.buffs {
                buffs.insert(format!("stage_{key}"), buff.owned_by(STAGE_OWNER));
            }
            // Team-cast stage buffs fire for any actor.
            trigger_team.insert(STAGE_OWNER.to_string());
        }

        let mut members = BTreeMap::new();
        for build in team.iter().filter(|build| build.has_character()) {
            members
                .entry(build.character_name.as_str())
                .or_insert_with(|| Member {
                    build,
                    stats: calculate_base_stats(build),
                    resonance_cap: build
                        .character_data
                        .resonance_energy_required
                        .unwrap_or(DEFAULT_RESONANCE_CAP),
                });
        }

        Self {
            team,
            members,
            team_data,
            buffs,
            trigger_team,
            enemy,
            ignored_buff,
        }
    }

    fn first_member(&self) -> Option<&'a str> {
        self.team
            .iter()
            .find(|build| build.has_character())
            .map(|build| build.character_name.as_str())
    }

    fn trigger_persistent(&self, action: &Action, ctx: &TriggerContext<'_>, active: &mut ActiveBuffs) {
        for (key, buff) in &self.buffs {
            if buff.is_transient || !buff.is_triggered_by(ctx) {
                continue;
            }
            if action.overrides.disabled.contains(key) {
                active.remove(key);
                continue;
            }
            let status = match buff.stacking_max() {
                Some(max_stacks) => {
                    let count = action.overrides.stacks.get(key).copied().unwrap_or(max_stacks);
                    if count == 0 {
                        active.remove(key);
                        continue;
                    }
                    BuffStatus::Stacks(count)
                }
                None if buff.target == BuffTarget::SingleTeammate => {
                    let target_char = action
                        .target_selections
                        .get(key)
                        .cloned()
                        .unwrap_or_else(|| default_target(self.team, buff.owner()).to_string());
                    BuffStatus::Targeted { target_char }
                }
                None => BuffStatus::Active(true),
            };
            active.insert(key.clone(), status);
        }
    }

    fn apply_transient(
        &self,
        action: &Action,
        ctx: &TriggerContext<'_>,
        build: &Build,
        raw: &mut RawStats,
    ) {
        for (key, buff) in &self.buffs {
            if !buff.is_transient
                || self.ignored_buff == Some(key.as_str())
                || action.overrides.disabled.contains(key)
                || buff.constellation > build.constellation
                || !buff.is_triggered_by(ctx)
            {
                continue;
            }
            for effect in &buff.effects {
                let stacks = match effect {
                    BuffEffect::Stacking { max_stacks, .. } => {
                        action.overrides.stacks.get(key).copied().unwrap_or(*max_stacks)
                    }
                    _ => 1,
                };
                if let Some((stat, value)) = effect.direct_bonus(build.weapon_rank, stacks) {
                    raw.add(stat, value);
                }
            }
        }
    }

    fn efficiency(&self, member: &Member<'_>, active: &ActiveBuffs) -> f64 {
        character_efficiency(Some(member.build), &member.stats.raw, active, &self.buffs)
    }

    /// Resonance energy handed out by triggered persistent buffs, per receiver.
    /// Single-target grants without a selection go to the actor's next teammate.
    fn buff_energy(
        &self,
        action: &Action,
        ctx: &TriggerContext<'_>,
        active: &ActiveBuffs,
    ) -> BTreeMap<String, f64> {
        let mut grants = BTreeMap::new();
        for (key, buff) in &self.buffs {
            if buff.is_transient
                || self.ignored_buff == Some(key.as_str())
                || action.overrides.disabled.contains(key)
                || !buff.is_triggered_by(ctx)
            {
                continue;
            }
            let receivers: Vec<&str> = match buff.target {
                BuffTarget::SelfOnly => vec![buff.owner()],
                BuffTarget::Team => self.members.keys().copied().collect(),
                BuffTarget::SingleTeammate => vec![
                    action
                        .target_selections
                        .get(key)
                        .map(String::as_str)
                        .unwrap_or_else(|| default_target(self.team, ctx.actor)),
                ],
            };
            for effect in &buff.effects {
                for &receiver in &receivers {
                    let Some(member) = self.members.get(receiver) else {
                        continue;
                    };
                    let amount = match effect {
                        BuffEffect::ResonanceEnergyFixed { value } => *value,
                        BuffEffect::ResonanceEnergyScaling { value } => {
                            value * self.efficiency(member, active) / 100.0
                        }
                        _ => continue,
                    };
                    *grants.entry(receiver.to_string()).or_default() += amount;
                }
            }
        }
        grants
    }

    fn action_energy(
        &self,
        action: &Action,
        ctx: &TriggerContext<'_>,
        member: &Member<'_>,
        skill: Option<&SkillData>,
        active: &ActiveBuffs,
    ) -> EnergyGain {
        let resets_concerto = ctx.activation_types.contains(&ActivationType::OutroSkill);
        let concerto = match skill {
            Some(skill) if !resets_concerto => skill.concerto_energy,
            _ => 0.0,
        };
        let mut resonance = skill.map_or(0.0, |skill| {
            skill.resonance_energy_gain_scaling * self.efficiency(member, active) / 100.0
                + skill.resonance_energy_gain_flat
        });
        let mut teammates = self.buff_energy(action, ctx, active);
        resonance += teammates.remove(ctx.actor).unwrap_or_default();

        EnergyGain {
            concerto: action.manual_concerto_gain.unwrap_or(concerto),
            resonance: action.manual_resonance_gain.unwrap_or(resonance),
            teammates,
            resets_concerto,
            resets_resonance: ctx
                .activation_types
                .contains(&ActivationType::ResonanceLiberation),
        }
    }

    /// Run one phase. Triggered persistent buffs carry over to later actions
    /// of the same phase; energy meters continue from `energy`.
    pub(crate) fn run_phase<C: CritModel + ?Sized>(
        &self,
        actions: &[Action],
        time_marks: &[bool],
        seconds_per_action: f64,
        crit: &mut C,
        record_log: bool,
        mut energy: EnergyState,
    ) -> PhaseResult {
        let mut active = ActiveBuffs::new();
        let mut total_damage = 0.0;
        let mut log = Vec::new();

        for action in actions {
            let abnormal = AbnormalEffect::from_skill_name(&action.skill);
            let named = action.character.as_deref().filter(|name| !name.is_empty());
            let Some(name) = named.or_else(|| abnormal.and_then(|_| self.first_member())) else {
                continue;
            };
            let Some(member) = self.members.get(name) else {
                continue;
            };
            let build = member.build;

            let skill = resolve_skill(action, name, &self.team_data);
            let ctx = TriggerContext {
                actor: name,
                skill_name: &action.skill,
                activation_types: skill
                    .map(|skill| skill.activation_types.as_slice())
                    .unwrap_or_default(),
                is_healing: skill.is_some_and(|skill| skill.is_healing),
                team: &self.trigger_team,
            };

            self.trigger_persistent(action, &ctx, &mut active);
            let mut raw = apply_buffs(
                &member.stats.raw,
                &active,
                name,
                &self.buffs,
                build.constellation,
                build.weapon_rank,
                self.ignored_buff,
            );
            self.apply_transient(action, &ctx, build, &mut raw);

            let (damage, details) = match (abnormal, skill) {
                (Some(effect), _) => (
                    calculate_abnormal_damage(effect, action.stacks.unwrap_or(1), &raw, self.enemy),
                    None,
                ),
                (None, Some(skill)) => {
                    let breakdown = skill_damage_breakdown(
                        &member.stats.bases,
                        &raw,
                        skill,
                        self.enemy,
                        build.character_data.attribute,
                        crit,
                    );
                    (breakdown.damage, Some(breakdown))
                }
                (None, None) => (0.0, None),
            };

            let gain = self.action_energy(action, &ctx, member, skill, &active);
            energy.record(name, gain, |character| {
                self.members.get(character).map(|member| member.resonance_cap)
            });

            total_damage += damage;
            if record_log {
                log.push(LogEntry {
                    character: name.to_string(),
                    skill: action.skill.clone(),
                    damage,
                    total_damage,
                    concerto_energy: energy.concerto(name),
                    resonance_energy: energy.resonance(name),
                    calculation_details: details,
                });
            }
        }

        PhaseResult {
            total_damage,
            log,
            total_time: phase_time(time_marks, actions.len(), seconds_per_action),
            final_energy: energy,
        }
    }
}

/// Expected damage of both rotation phases.
///
/// `buff_overrides`, when given, replaces the buffs gathered from the team.
/// The phases are independent sums, though the loop phase starts from the
/// initial phase's energy meters; projecting over several loops is left to
/// [`CalculationResult::projected_damage`].
pub fn process_rotation(
    team: &[Build],
    initial: &[Action],
    loop_actions: &[Action],
    enemy: &EnemyInfo,
    buff_overrides: Option<&BuffTable>,
    stage: Option<&StageEffectData>,
    options: &DamageOptions,
) -> CalculationResult {
    let context = DamageContext::new(
        team,
        enemy,
        buff_overrides,
        stage,
        options.ignored_buff.as_deref(),
    );
    let mut crit = ExpectedCrit;
    let initial_phase = context.run_phase(
        initial,
        &options.time_marks_initial,
        options.seconds_per_action,
        &mut crit,
        true,
        EnergyState::default(),
    );
    let loop_phase = context.run_phase(
        loop_actions,
        &options.time_marks_loop,
        options.seconds_per_action,
        &mut crit,
        true,
        initial_phase.final_energy.clone(),
    );
    debug!(
        initial_damage = initial_phase.total_damage,
        loop_damage = loop_phase.total_damage,
        buffs = context.buffs.len(),
        "rotation damage computed"
    );
    CalculationResult {
        initial_phase,
        loop_phase,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::BuffOverrides;
    use crate::buff::{BuffData, RankedValue, TriggerCondition, TriggerEvent, TriggerSource, TriggerTiming};
    use crate::data::{ATK_PERCENT, CRIT_RATE};
    use crate::model::{ActivationType, CharacterData};

    const EPS: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS * b.abs().max(1.0)
    }

    /// Expected crit (5% / 150%), level 90 defense, 10% resistance.
    fn unbuffed_factor() -> f64 {
        1.075 * (1520.0 / 3032.0) * 0.9
    }

    fn skill(name: &str, multiplier: f64) -> SkillData {
        SkillData {
            name: name.to_string(),
            multiplier,
            activation_types: vec![ActivationType::BasicAttack],
            ..Default::default()
        }
    }

    fn alpha() -> Build {
        Build {
            character_name: "Alpha".to_string(),
            character_data: CharacterData {
                name: "Alpha".to_string(),
                base_atk: 1000.0,
                resonance_energy_required: Some(100.0),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn member(name: &str) -> Build {
        let mut build = alpha();
        build.character_name = name.to_string();
        build.character_data.name = name.to_string();
        build
    }

    fn on_skill(name: &str, source: TriggerSource) -> Vec<TriggerCondition> {
        vec![TriggerCondition {
            event: TriggerEvent::Skill(name.to_string()),
            source,
            timing: TriggerTiming::OnCast,
        }]
    }

    fn flat(stat: &str, value: f64) -> BuffEffect {
        BuffEffect::Flat {
            stat_to_buff: stat.to_string(),
            value: RankedValue::Scalar(value),
        }
    }

    #[test]
    fn single_hit_end_to_end() {
        let team = [alpha()];
        let actions = [Action::new("Alpha", skill("Strike", 100.0))];
        let result = process_rotation(
            &team,
            &actions,
            &[],
            &EnemyInfo::default(),
            None,
            None,
            &DamageOptions::default(),
        );
        let expected = 1000.0 * unbuffed_factor();
        assert_eq!(result.initial_phase.log.len(), 1);
        assert!(approx(result.initial_phase.log[0].damage, expected));
        assert_eq!(result.initial_phase.total_damage, result.initial_phase.log[0].damage);
        assert_eq!(result.loop_phase.total_damage, 0.0);
        assert_eq!(result.initial_phase.total_time, 1.5);
    }

    #[test]
    fn phase_total_is_sum_of_log() {
        let team = [alpha(), member("Beta")];
        let actions: Vec<Action> = (1..=7)
            .map(|i| {
                let who = if i % 2 == 0 { "Alpha" } else { "Beta" };
                Action::new(who, skill("Hit", 37.3 * i as f64))
            })
            .collect();
        let result = process_rotation(
            &team,
            &actions,
            &actions,
            &EnemyInfo::default(),
            None,
            None,
            &DamageOptions::default(),
        );
        for phase in [&result.initial_phase, &result.loop_phase] {
            let sum = phase.log.iter().fold(0.0, |acc, entry| acc + entry.damage);
            assert_eq!(phase.total_damage, sum);
            assert_eq!(phase.log.last().map(|entry| entry.total_damage), Some(sum));
        }
        assert!(approx(
            result.projected_damage(3),
            result.initial_phase.total_damage * 4.0
        ));
    }

    #[test]
    fn triggered_buffs_carry_over_within_phase() {
        let mut build = alpha();
        build.character_data.buffs.insert(
            "rally".to_string(),
            BuffData {
                trigger: on_skill("Rally", TriggerSource::SelfCast),
                effects: vec![flat(ATK_PERCENT, 100.0)],
                ..Default::default()
            },
        );
        let actions = [
            Action::new("Alpha", skill("Strike", 100.0)),
            Action::new("Alpha", skill("Rally", 0.0)),
            Action::new("Alpha", skill("Strike", 100.0)),
        ];
        let result = process_rotation(
            &[build],
            &actions,
            &actions[..1],
            &EnemyInfo::default(),
            None,
            None,
            &DamageOptions::default(),
        );
        let log = &result.initial_phase.log;
        assert!(approx(log[2].damage, 2.0 * log[0].damage));
        // Each phase starts without buffs.
        assert!(approx(result.loop_phase.log[0].damage, log[0].damage));
    }

    #[test]
    fn overrides_disable_and_zero_stacks_remove_buffs() {
        let mut build = alpha();
        build.character_data.buffs.insert(
            "focus".to_string(),
            BuffData {
                trigger: vec![TriggerCondition {
                    event: TriggerEvent::Always,
                    source: TriggerSource::SelfCast,
                    timing: TriggerTiming::OnHit,
                }],
                effects: vec![BuffEffect::Stacking {
                    stat_to_buff: ATK_PERCENT.to_string(),
                    effect_per_stack: RankedValue::Scalar(10.0),
                    max_stacks: 5,
                }],
                ..Default::default()
            },
        );
        let base = 1000.0 * unbuffed_factor();
        let mut two_stacks = Action::new("Alpha", skill("Strike", 100.0));
        two_stacks.overrides.stacks.insert("char_Alpha_focus".to_string(), 2);
        let mut zero_stacks = two_stacks.clone();
        zero_stacks.overrides = BuffOverrides {
            stacks: [("char_Alpha_focus".to_string(), 0)].into_iter().collect(),
            ..Default::default()
        };
        let mut disabled = two_stacks.clone();
        disabled.overrides = BuffOverrides {
            disabled: ["char_Alpha_focus".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let actions = [
            Action::new("Alpha", skill("Strike", 100.0)),
            two_stacks,
            zero_stacks,
            disabled,
        ];
        let result = process_rotation(
            &[build],
            &actions,
            &[],
            &EnemyInfo::default(),
            None,
            None,
            &DamageOptions::default(),
        );
        let damage: Vec<f64> = result.initial_phase.log.iter().map(|entry| entry.damage).collect();
        assert!(approx(damage[0], base * 1.5));
        assert!(approx(damage[1], base * 1.2));
        assert!(approx(damage[2], base));
        assert!(approx(damage[3], base));
    }

    #[test]
    fn transient_buffs_only_affect_their_action() {
        let mut build = alpha();
        build.character_data.buffs.insert(
            "burst".to_string(),
            BuffData {
                trigger: on_skill("Burst", TriggerSource::SelfCast),
                effects: vec![flat(CRIT_RATE, 95.0)],
                is_transient: true,
                ..Default::default()
            },
        );
        let actions = [
            Action::new("Alpha", skill("Burst", 100.0)),
            Action::new("Alpha", skill("Strike", 100.0)),
        ];
        let result = process_rotation(
            &[build],
            &actions,
            &[],
            &EnemyInfo::default(),
            None,
            None,
            &DamageOptions::default(),
        );
        let log = &result.initial_phase.log;
        let enemy = (1520.0 / 3032.0) * 0.9;
        assert!(approx(log[0].damage, 1000.0 * 2.5 * enemy));
        assert!(approx(log[1].damage, 1000.0 * unbuffed_factor()));
    }

    #[test]
    fn single_target_buff_defaults_to_next_teammate() {
        let mut support = member("Beta");
        support.character_data.buffs.insert(
            "outro".to_string(),
            BuffData {
                trigger: on_skill("Outro", TriggerSource::SelfCast),
                target: BuffTarget::SingleTeammate,
                effects: vec![flat(ATK_PERCENT, 50.0)],
                ..Default::default()
            },
        );
        let team = [alpha(), support];
        let mut chosen = Action::new("Beta", skill("Outro", 0.0));
        chosen
            .target_selections
            .insert("char_Beta_outro".to_string(), "Beta".to_string());
        let actions = [
            Action::new("Beta", skill("Outro", 0.0)),
            Action::new("Alpha", skill("Strike", 100.0)),
            Action::new("Beta", skill("Strike", 100.0)),
            chosen,
            Action::new("Alpha", skill("Strike", 100.0)),
            Action::new("Beta", skill("Strike", 100.0)),
        ];
        let result = process_rotation(
            &team,
            &actions,
            &[],
            &EnemyInfo::default(),
            None,
            None,
            &DamageOptions::default(),
        );
        let base = 1000.0 * unbuffed_factor();
        let log = &result.initial_phase.log;
        // Beta wraps around to Alpha by default.
        assert!(approx(log[1].damage, base * 1.5));
        assert!(approx(log[2].damage, base));
        assert!(approx(log[4].damage, base));
        assert!(approx(log[5].damage, base * 1.5));
    }

    #[test]
    fn abnormal_effect_without_character_uses_first_member() {
        let team = [alpha(), member("Beta")];
        let frazzle = Action {
            skill: "spectro_frazzle".to_string(),
            stacks: Some(3),
            ..Default::default()
        };
        let no_stacks = Action {
            stacks: Some(0),
            ..frazzle.clone()
        };
        let unknown = Action {
            skill: "Strike".to_string(),
            ..Default::default()
        };
        let result = process_rotation(
            &team,
            &[frazzle, no_stacks, unknown],
            &[],
            &EnemyInfo::default(),
            None,
            None,
            &DamageOptions::default(),
        );
        let log = &result.initial_phase.log;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].character, "Alpha");
        let expected = 1103.0 * 2.624 * (1520.0 / 3032.0) * 0.9;
        assert!(approx(log[0].damage, expected));
        assert_eq!(log[1].damage, 0.0);
    }

    #[test]
    fn buff_overrides_replace_team_buffs() {
        let mut build = alpha();
        build.character_data.buffs.insert(
            "own".to_string(),
            BuffData {
                trigger: on_skill("Strike", TriggerSource::SelfCast),
                effects: vec![flat(ATK_PERCENT, 100.0)],
                ..Default::default()
            },
        );
        let actions = [Action::new("Alpha", skill("Strike", 100.0))];
        let overrides = BuffTable::new();
        let result = process_rotation(
            &[build],
            &actions,
            &[],
            &EnemyInfo::default(),
            Some(&overrides),
            None,
            &DamageOptions::default(),
        );
        assert!(approx(
            result.initial_phase.total_damage,
            1000.0 * unbuffed_factor()
        ));
    }

    #[test]
    fn stage_buffs_apply_to_the_team() {
        let stage = StageEffectData {
            name: "Tower".to_string(),
            buffs: [(
                "heat".to_string(),
                BuffData {
                    trigger: vec![TriggerCondition {
                        event: TriggerEvent::Always,
                        source: TriggerSource::TeamCast,
                        timing: TriggerTiming::OnCast,
                    }],
                    target: BuffTarget::Team,
                    effects: vec![flat(ALL_DAMAGE_UP, 30.0)],
                    ..Default::default()
                },
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        let actions = [Action::new("Alpha", skill("Strike", 100.0))];
        let run = |ignored: Option<&str>| {
            let options = DamageOptions {
                ignored_buff: ignored.map(str::to_string),
                ..Default::default()
            };
            process_rotation(
                &[alpha()],
                &actions,
                &[],
                &EnemyInfo::default(),
                None,
                Some(&stage),
                &options,
            )
            .initial_phase
            .total_damage
        };
        let base = 1000.0 * unbuffed_factor();
        assert!(approx(run(None), base * 1.3));
        assert!(approx(run(Some("stage_heat")), base));
    }

    #[test]
    fn character_attribute_fills_missing_element() {
        let mut build = alpha();
        build.character_data.attribute = Some(Attribute::Glacio);
        build.character_data.innate_stats = vec![crate::model::Stat::new("glacio_dmg_up", 30.0)];
        let enemy = EnemyInfo {
            resistances: [(Attribute::Glacio, 40.0)].into_iter().collect(),
            ..Default::default()
        };
        let result = process_rotation(
            &[build],
            &[Action::new("Alpha", skill("Strike", 100.0))],
            &[],
            &enemy,
            None,
            None,
            &DamageOptions::default(),
        );
        let expected = 1000.0 * 1.3 * 1.075 * (1520.0 / 3032.0) * 0.6;
        assert!(approx(result.initial_phase.total_damage, expected));
    }

    #[test]
    fn total_time_counts_marks() {
        assert_eq!(phase_time(&[true, false, true, true], 10, 1.5), 3.0);
        assert_eq!(phase_time(&[], 4, 1.5), 6.0);
        assert_eq!(phase_time(&[false], 4, 1.5), 0.0);
    }

    #[test]
    fn empty_team_computes_nothing() {
        let actions = [Action::new("Alpha", skill("Strike", 100.0))];
        let result = process_rotation(
            &[],
            &actions,
            &[],
            &EnemyInfo::default(),
            None,
            None,
            &DamageOptions::default(),
        );
        assert!(result.initial_phase.log.is_empty());
        assert_eq!(result.initial_phase.total_damage, 0.0);
    }

    fn energy_skill(
        name: &str,
        activation: ActivationType,
        concerto: f64,
        resonance_flat: f64,
    ) -> SkillData {
        SkillData {
            concerto_energy: concerto,
            resonance_energy_gain_flat: resonance_flat,
            activation_types: vec![activation],
            ..skill(name, 0.0)
        }
    }

    #[test]
    fn damage_engine_tracks_energy_per_character() {
        let mut support = member("Beta");
        support.character_data.buffs.insert(
            "relay".to_string(),
            BuffData {
                trigger: on_skill("Outro", TriggerSource::SelfCast),
                target: BuffTarget::SingleTeammate,
                effects: vec![BuffEffect::ResonanceEnergyFixed { value: 20.0 }],
                ..Default::default()
            },
        );
        let mut lead = alpha();
        lead.character_data.innate_stats =
            vec![crate::model::Stat::new(crate::data::RESONANCE_EFFICIENCY, 50.0)];
        lead.character_data.buffs.insert(
            "surge".to_string(),
            BuffData {
                trigger: on_skill("Strike", TriggerSource::SelfCast),
                effects: vec![BuffEffect::ResonanceEnergyScaling { value: 10.0 }],
                ..Default::default()
            },
        );
        let team = [lead, support];
        let actions = [
            Action::new("Beta", energy_skill("Charge", ActivationType::BasicAttack, 60.0, 5.0)),
            Action::new("Beta", energy_skill("Outro", ActivationType::OutroSkill, 30.0, 0.0)),
            Action::new("Alpha", energy_skill("Strike", ActivationType::BasicAttack, 70.0, 10.0)),
            Action::new("Alpha", energy_skill("Strike", ActivationType::BasicAttack, 70.0, 10.0)),
            Action::new(
                "Alpha",
                energy_skill("Burst", ActivationType::ResonanceLiberation, 0.0, 40.0),
            ),
        ];
        let result = process_rotation(
            &team,
            &actions,
            &[],
            &EnemyInfo::default(),
            None,
            None,
            &DamageOptions::default(),
        );
        let log = &result.initial_phase.log;
        assert_eq!(log[0].concerto_energy, 60.0);
        assert_eq!(log[0].resonance_energy, 5.0);
        // Outro empties the meter and grants nothing itself.
        assert_eq!(log[1].concerto_energy, 0.0);
        // 20 from Beta's relay, then 10 flat plus 10 at 150% efficiency.
        assert!(approx(log[2].resonance_energy, 45.0));
        assert_eq!(log[3].concerto_energy, 100.0);
        assert!(approx(log[3].resonance_energy, 70.0));
        assert_eq!(log[4].resonance_energy, 0.0);

        let energy = &result.initial_phase.final_energy;
        assert_eq!(energy.concerto("Alpha"), 100.0);
        assert_eq!(energy.resonance("Beta"), 5.0);
    }

    #[test]
    fn manual_gains_replace_computed_energy() {
        let mut action = Action::new(
            "Alpha",
            energy_skill("Strike", ActivationType::BasicAttack, 10.0, 10.0),
        );
        action.manual_concerto_gain = Some(3.0);
        action.manual_resonance_gain = Some(500.0);
        let result = process_rotation(
            &[alpha()],
            &[action],
            &[],
            &EnemyInfo::default(),
            None,
            None,
            &DamageOptions::default(),
        );
        let entry = &result.initial_phase.log[0];
        assert_eq!(entry.concerto_energy, 3.0);
        assert_eq!(entry.resonance_energy, 100.0);
    }

    #[test]
    fn loop_phase_starts_from_initial_energy() {
        let charge = Action::new(
            "Alpha",
            energy_skill("Charge", ActivationType::BasicAttack, 40.0, 15.0),
        );
        let result = process_rotation(
            &[alpha()],
            &[charge.clone(), charge.clone()],
            &[charge],
            &EnemyInfo::default(),
            None,
            None,
            &DamageOptions::default(),
        );
        let looped = &result.loop_phase.log[0];
        assert_eq!(looped.concerto_energy, 100.0);
        assert_eq!(looped.resonance_energy, 45.0);
    }

    #[test]
    fn log_entries_carry_the_formula_terms() {
        let mut build = alpha();
        build.character_data.innate_stats = vec![crate::model::Stat::new(ALL_DAMAGE_UP, 20.0)];
        let mut strike = skill("Strike", 150.0);
        strike.damage_types = vec![DamageType::Spectro];
        let frazzle = Action {
            skill: "spectro_frazzle".to_string(),
            ..Default::default()
        };
        let result = process_rotation(
            &[build],
            &[Action::new("Alpha", strike), frazzle],
            &[],
            &EnemyInfo::default(),
            None,
            None,
            &DamageOptions::default(),
        );
        let log = &result.initial_phase.log;
        let Some(details) = &log[0].calculation_details else {
            panic!("skill hit without calculation details");
        };
        assert_eq!(details.reference_stat, ScalingStat::Atk);
        assert!(approx(details.reference_value, 1000.0));
        assert!(approx(details.base_damage, 1500.0));
        assert!(approx(details.damage_up, 1.2));
        assert!(approx(details.crit, 1.075));
        assert!(approx(details.defense, 1520.0 / 3032.0));
        assert!(approx(details.resistance, 0.9));
        assert!(approx(details.damage, log[0].damage));
        assert!(log[1].calculation_details.is_none());
    }

    #[test]
    fn buff_requirements_follow_the_acting_build() {
        let mut support = member("Beta");
        support.constellation = 2;
        support.character_data.buffs.insert(
            "anthem".to_string(),
            BuffData {
                trigger: vec![TriggerCondition {
                    event: TriggerEvent::Always,
                    source: TriggerSource::TeamCast,
                    timing: TriggerTiming::OnCast,
                }],
                target: BuffTarget::Team,
                effects: vec![flat(ATK_PERCENT, 100.0)],
                constellation: 2,
                ..Default::default()
            },
        );
        let actions = [
            Action::new("Beta", skill("Strike", 100.0)),
            Action::new("Alpha", skill("Strike", 100.0)),
        ];
        let result = process_rotation(
            &[alpha(), support],
            &actions,
            &[],
            &EnemyInfo::default(),
            None,
            None,
            &DamageOptions::default(),
        );
        let base = 1000.0 * unbuffed_factor();
        let log = &result.initial_phase.log;
        assert!(approx(log[0].damage, base * 2.0));
        // Alpha sits at constellation 0, below the buff's requirement.
        assert!(approx(log[1].damage, base));
    }
}
