use std::fs;

use rotation_calc::{DamageOptions, GameData, invoke, process_rotation};
use serde_json::{Value, json};
use tempfile::TempDir;

const EPS: f64 = 1e-6;
const DEFENSE: f64 = 1520.0 / 3032.0;
const CRIT: f64 = 1.075;
const RESISTANCE: f64 = 0.9;

fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < EPS
}

fn write(dir: &TempDir, name: &str, value: Value) {
    fs::write(
        dir.path().join(name),
        serde_json::to_string_pretty(&value).unwrap(),
    )
    .unwrap();
}

fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "characters.json",
        json!({
            "Alpha": {
                "name": "Alpha",
                "base_atk": 1000,
                "attribute": "spectro",
                "resonance_energy_required": 100,
                "skills": [{
                    "name": "Strike",
                    "multiplier": 100,
                    "activation_types": ["resonance_skill"],
                    "concerto_energy": 10,
                    "resonance_energy_gain_flat": 15
                }],
                "buffs": {
                    "focus": {
                        "description": "Team ATK +20% after a resonance skill",
                        "trigger": [{"event": "resonance_skill", "source": "self_cast"}],
                        "target": "team",
                        "effects": [{"type": "flat", "stat_to_buff": "atk_percent", "value": 20}]
                    }
                }
            },
            "Beta": {
                "name": "Beta",
                "base_atk": 500,
                "attribute": "aero",
                "resonance_energy_required": 100,
                "skills": [{"name": "Gust", "multiplier": 100, "activation_types": ["basic_attack"]}]
            }
        }),
    );
    write(
        &dir,
        "builds.json",
        json!({
            "alpha": {"character_name": "Alpha"},
            "beta": {"character_name": "Beta"}
        }),
    );
    write(
        &dir,
        "scenarios.json",
        json!({
            "duo": {
                "team": ["alpha", "beta"],
                "initial": [
                    {"character": "Alpha", "skill": "Strike"},
                    {"character": "Beta", "skill": "Gust"}
                ],
                "loop": [{"character": "Beta", "skill": "Gust"}]
            }
        }),
    );
    write(&dir, "config.json", json!({"loop_count": 3}));
    dir
}

#[test]
fn loaded_scenario_computes_buffed_damage() {
    let dir = data_dir();
    let data = GameData::load_dir(dir.path()).unwrap();

    let response = invoke("compute_damage", json!({"scenario": "duo"}), &data).unwrap();
    assert_eq!(response["status"], json!("computed"));
    assert_eq!(response["loops"], json!(3));

    let initial = &response["result"]["initial_phase"];
    let strike = initial["log"][0]["damage"].as_f64().unwrap();
    let gust = initial["log"][1]["damage"].as_f64().unwrap();
    assert!(approx(strike, 1200.0 * CRIT * DEFENSE * RESISTANCE));
    // The team buff from Alpha's skill carries over to Beta.
    assert!(approx(gust, 600.0 * CRIT * DEFENSE * RESISTANCE));
    assert!(approx(
        initial["total_damage"].as_f64().unwrap(),
        strike + gust
    ));
    assert_eq!(initial["total_time"], json!(3.0));

    // Each phase starts without carried buffs.
    let looped = response["result"]["loop_phase"]["total_damage"]
        .as_f64()
        .unwrap();
    assert!(approx(looped, 500.0 * CRIT * DEFENSE * RESISTANCE));
    let projected = response["projectedDamage"].as_f64().unwrap();
    assert!(approx(projected, strike + gust + looped * 3.0));
}

#[test]
fn ignored_buff_measures_its_contribution() {
    let dir = data_dir();
    let data = GameData::load_dir(dir.path()).unwrap();
    let scenario = &data.scenarios["duo"];
    let team = data.team(&scenario.team);
    let enemy = data.config.default_enemy();

    let with_buff = process_rotation(
        &team,
        &scenario.initial,
        &scenario.loop_actions,
        &enemy,
        None,
        None,
        &DamageOptions::default(),
    );
    let without_buff = process_rotation(
        &team,
        &scenario.initial,
        &scenario.loop_actions,
        &enemy,
        None,
        None,
        &DamageOptions {
            ignored_buff: Some("char_Alpha_focus".to_string()),
            ..Default::default()
        },
    );
    let unbuffed = (1000.0 + 500.0) * CRIT * DEFENSE * RESISTANCE;
    assert!(approx(without_buff.initial_phase.total_damage, unbuffed));
    assert!(with_buff.initial_phase.total_damage > without_buff.initial_phase.total_damage);
    assert_eq!(with_buff.loop_phase, without_buff.loop_phase);
}

#[test]
fn rotation_meters_follow_the_scenario() {
    let dir = data_dir();
    let data = GameData::load_dir(dir.path()).unwrap();

    let response = invoke("simulate_rotation", json!({"scenario": "duo"}), &data).unwrap();
    let initial = response["initial"].as_array().unwrap();
    assert_eq!(initial.len(), 2);
    assert_eq!(initial[0]["concerto_energy_total"], json!(10.0));
    assert_eq!(initial[0]["resonance_energy_total"], json!(15.0));
    // Beta's meters are separate from Alpha's.
    assert_eq!(initial[1]["concerto_energy_total"], json!(0.0));
    assert_eq!(response["loop"].as_array().map(Vec::len), Some(1));
    assert_eq!(response["warnings"], json!([]));
}

#[test]
fn seeded_simulation_is_reproducible() {
    let dir = data_dir();
    let data = GameData::load_dir(dir.path()).unwrap();
    let payload = json!({"scenario": "duo", "runs": 50, "seed": 9});

    let first = invoke("simulate_rng", payload.clone(), &data).unwrap();
    let second = invoke("simulate_rng", payload, &data).unwrap();
    assert_eq!(first, second);

    let stats = &first["stats"];
    assert_eq!(stats["simulations_count"], json!(50));
    let min = stats["total_damage_min"].as_f64().unwrap();
    let max = stats["total_damage_max"].as_f64().unwrap();
    let no_crit = (1200.0 + 600.0 + 500.0 * 3.0) * DEFENSE * RESISTANCE;
    assert!(min >= no_crit - EPS);
    assert!(max <= no_crit * 2.5 + EPS);
}

#[test]
fn damage_log_reports_energy_and_formula_terms() {
    let dir = data_dir();
    let data = GameData::load_dir(dir.path()).unwrap();

    let response = invoke("compute_damage", json!({"scenario": "duo"}), &data).unwrap();
    let result = &response["result"];
    let strike = &result["initial_phase"]["log"][0];
    assert_eq!(strike["concerto_energy"], json!(10.0));
    assert_eq!(strike["resonance_energy"], json!(15.0));
    assert_eq!(strike["calculation_details"]["reference_stat"], json!("atk"));
    assert!(approx(
        strike["calculation_details"]["base_damage"].as_f64().unwrap(),
        1200.0
    ));

    // Alpha does not act in the loop, so its meters are the initial phase's.
    let carried = &result["loop_phase"]["final_energy"];
    assert_eq!(carried["concerto"]["Alpha"], json!(10.0));
    assert_eq!(carried["resonance"]["Alpha"], json!(15.0));
}
