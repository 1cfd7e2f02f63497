//! Energy simulation over a rotation.
//!
//! One call is a left fold over `initial ++ loop`. Energy counters start at
//! zero on every call and nothing is retained between calls.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::action::{Action, RotationState};
use crate::buff::ActiveBuffs;
use crate::data::DEFAULT_RESONANCE_CAP;
use crate::model::{Build, SkillData};
use crate::stats::{RawStats, calculate_base_stats, character_efficiency};
use crate::team::{TeamData, gather_team_data};

struct Member<'a> {
    build: &'a Build,
    base_raw: RawStats,
    resonance_cap: f64,
}

#[derive(Default)]
struct Meters {
    concerto: f64,
    resonance: f64,
}

/// The skill payload an action refers to: its own copy, or the acting
/// character's gathered skill of the same name.
pub(crate) fn resolve_skill<'a>(
    action: &'a Action,
    character: &str,
    team_data: &'a TeamData,
) -> Option<&'a SkillData> {
    action.skill_data.as_ref().or_else(|| {
        team_data
            .skills
            .get(character)?
            .iter()
            .find(|skill| skill.name == action.skill)
    })
}

fn roster(team: &[Build]) -> BTreeMap<&str, Member<'_>> {
    let mut members = BTreeMap::new();
    for build in team.iter().filter(|build| build.has_character()) {
        let name = build.character_name.as_str();
        let resonance_cap = match build.character_data.resonance_energy_required {
            Some(required) => required,
            None => {
                warn!(
                    character = name,
                    cap = DEFAULT_RESONANCE_CAP,
                    "no resonance energy requirement configured, using fallback cap"
                );
                DEFAULT_RESONANCE_CAP
            }
        };
        members.entry(name).or_insert_with(|| Member {
            build,
            base_raw: calculate_base_stats(build).raw,
            resonance_cap,
        });
    }
    members
}

/// Annotate copies of both rotation phases with buff snapshots and energy totals.
///
/// Actions whose character is not on the team come back unannotated; list
/// lengths and the initial/loop split are always preserved.
pub fn recalculate_rotation_state(
    team: &[Build],
    initial: &[Action],
    loop_actions: &[Action],
) -> RotationState {
    if team.is_empty() {
        return RotationState::default();
    }

    let team_data = gather_team_data(team);
    let members = roster(team);
    let carry_over = ActiveBuffs::new();
    let mut meters: BTreeMap<&str, Meters> = members
        .keys()
        .map(|&name| (name, Meters::default()))
        .collect();

    let mut annotated: Vec<Action> = initial.iter().chain(loop_actions).cloned().collect();
    let mut skipped = 0usize;
    for action in &mut annotated {
        let name = action.character.clone().unwrap_or_default();
        let (Some(member), Some(meter)) = (members.get(name.as_str()), meters.get_mut(name.as_str()))
        else {
            action.clear_annotations();
            skipped += 1;
            continue;
        };

        let character = member.build.character_name.as_str();
        let snapshot = carry_over.clone();
        let efficiency = character_efficiency(
            Some(member.build),
            &member.base_raw,
            &snapshot,
            &team_data.buffs,
        );
        let (concerto_gain, flat_gain, scaling_gain) =
            match resolve_skill(action, character, &team_data) {
                Some(skill) => (
                    skill.concerto_energy,
                    skill.resonance_energy_gain_flat,
                    skill.resonance_energy_gain_scaling,
                ),
                None => (0.0, 0.0, 0.0),
            };

        meter.concerto += concerto_gain;
        let gain = scaling_gain * (efficiency / 100.0) + flat_gain;
        meter.resonance = (meter.resonance + gain).min(member.resonance_cap);

        action.active_buffs = Some(snapshot);
        action.concerto_energy_total = Some(meter.concerto);
        action.resonance_energy_gain = Some(gain);
        action.resonance_energy_total = Some(meter.resonance);
    }

    if skipped > 0 {
        warn!(skipped, "actions reference characters outside the team");
    }
    debug!(
        actions = annotated.len(),
        members = members.len(),
        "rotation energy recalculated"
    );

    let loop_part = annotated.split_off(initial.len());
    RotationState {
        initial: annotated,
        loop_actions: loop_part,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buff::{BuffData, BuffEffect, RankedValue};
    use crate::data::RESONANCE_EFFICIENCY;
    use crate::model::CharacterData;

    fn skill(name: &str, concerto: f64, flat: f64, scaling: f64) -> SkillData {
        SkillData {
            name: name.to_string(),
            multiplier: 100.0,
            concerto_energy: concerto,
            resonance_energy_gain_flat: flat,
            resonance_energy_gain_scaling: scaling,
            ..Default::default()
        }
    }

    fn build(name: &str, cap: Option<f64>) -> Build {
        Build {
            character_name: name.to_string(),
            character_data: CharacterData {
                name: name.to_string(),
                base_atk: 500.0,
                resonance_energy_required: cap,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn empty_team_yields_empty_state() {
        let actions = vec![Action::new("A", skill("Hit", 5.0, 1.0, 0.0))];
        let state = recalculate_rotation_state(&[], &actions, &actions);
        assert!(state.initial.is_empty());
        assert!(state.loop_actions.is_empty());
    }

    #[test]
    fn split_point_and_length_are_preserved() {
        let team = [build("A", Some(100.0))];
        let initial = vec![
            Action::new("A", skill("Hit", 5.0, 1.0, 0.0)),
            Action::new("Ghost", skill("Hit", 5.0, 1.0, 0.0)),
        ];
        let loop_actions = vec![Action::new("A", skill("Hit", 5.0, 1.0, 0.0)); 3];
        let state = recalculate_rotation_state(&team, &initial, &loop_actions);
        assert_eq!(state.initial.len(), 2);
        assert_eq!(state.loop_actions.len(), 3);
        assert!(!state.initial[1].is_annotated());
        assert_eq!(state.loop_actions[2].concerto_energy_total, Some(20.0));
    }

    #[test]
    fn resonance_never_exceeds_cap() {
        let team = [build("A", Some(25.0)), build("B", None)];
        let actions: Vec<Action> = (0..10)
            .flat_map(|_| {
                [
                    Action::new("A", skill("Big", 0.0, 4.0, 3.0)),
                    Action::new("B", skill("Big", 0.0, 4.0, 3.0)),
                ]
            })
            .collect();
        let state = recalculate_rotation_state(&team, &actions, &[]);
        for action in &state.initial {
            let cap = if action.character.as_deref() == Some("A") {
                25.0
            } else {
                1.0
            };
            assert!(action.resonance_energy_total.unwrap() <= cap);
        }
        assert_eq!(state.initial[0].resonance_energy_gain, Some(7.0));
        assert_eq!(state.initial[18].resonance_energy_total, Some(25.0));
    }

    #[test]
    fn concerto_is_monotonic_per_character() {
        let team = [build("A", Some(100.0)), build("B", Some(100.0))];
        let actions = vec![
            Action::new("A", skill("One", 10.0, 0.0, 0.0)),
            Action::new("B", skill("Two", 3.0, 0.0, 0.0)),
            Action::new("A", skill("Three", 0.0, 0.0, 0.0)),
            Action::new("A", skill("Four", 7.5, 0.0, 0.0)),
        ];
        let state = recalculate_rotation_state(&team, &actions[..2], &actions[2..]);
        let totals: Vec<f64> = state
            .initial
            .iter()
            .chain(&state.loop_actions)
            .filter(|action| action.character.as_deref() == Some("A"))
            .map(|action| action.concerto_energy_total.unwrap())
            .collect();
        assert_eq!(totals, vec![10.0, 10.0, 17.5]);
        assert_eq!(state.initial[1].concerto_energy_total, Some(3.0));
    }

    #[test]
    fn efficiency_scales_resonance_gain() {
        let mut alpha = build("A", Some(1000.0));
        alpha.character_data.buffs.insert(
            "er".to_string(),
            BuffData {
                effects: vec![BuffEffect::Flat {
                    stat_to_buff: RESONANCE_EFFICIENCY.to_string(),
                    value: RankedValue::Scalar(50.0),
                }],
                ..Default::default()
            },
        );
        alpha
            .character_data
            .innate_stats
            .push(crate::model::Stat::new(RESONANCE_EFFICIENCY, 20.0));
        let state = recalculate_rotation_state(
            &[alpha],
            &[Action::new("A", skill("Hit", 0.0, 2.0, 10.0))],
            &[],
        );
        // No buffs carry over, so only the innate 120% applies.
        assert_eq!(state.initial[0].resonance_energy_gain, Some(14.0));
        assert_eq!(state.initial[0].active_buffs, Some(ActiveBuffs::new()));
    }

    #[test]
    fn recalculation_is_idempotent() {
        let team = [build("A", Some(50.0))];
        let actions = vec![Action::new("A", skill("Hit", 5.0, 1.0, 2.0)); 4];
        let first = recalculate_rotation_state(&team, &actions, &[]);
        let second = recalculate_rotation_state(&team, &first.initial, &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn skill_payload_falls_back_to_team_skills() {
        let mut alpha = build("A", Some(100.0));
        alpha.character_data.skills = vec![skill("Known", 4.0, 0.0, 0.0)];
        let action = Action {
            character: Some("A".to_string()),
            skill: "Known".to_string(),
            ..Default::default()
        };
        let state = recalculate_rotation_state(&[alpha], &[action], &[]);
        assert_eq!(state.initial[0].concerto_energy_total, Some(4.0));
    }
}
