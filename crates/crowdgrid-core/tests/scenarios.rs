//! Whole-scenario runs through `Model::step`.
//!
//! Each test builds a scenario from its config, runs it for a while, and
//! checks a property that must hold after every tick.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::missing_panics_doc
)]

use std::collections::{BTreeMap, BTreeSet};

use crowdgrid_agents::Entity;
use crowdgrid_agents::patrol;
use crowdgrid_core::config::{
    CaptureFlagConfig, FlagWarConfig, MetroConfig, MetroLayout, ScenarioConfig, SimulationConfig,
};
use crowdgrid_core::scenario::{CaptureFlagScenario, FlagWarScenario, MetroScenario};
use crowdgrid_core::{Model, NoOpCallback, SnapshotLog, run_ticks};
use crowdgrid_types::{EntityKind, PerSide, Position, WorldSnapshot};
use crowdgrid_world::{InfluenceField, InfluenceMask};

fn config(scenario: ScenarioConfig, seed: u64) -> SimulationConfig {
    SimulationConfig {
        seed,
        ticks: 0,
        scenario,
    }
}

fn metro(layout: MetroLayout, rate: f64) -> MetroConfig {
    MetroConfig {
        layout,
        admission: PerSide::new(rate, rate),
        ..MetroConfig::default()
    }
}

/// Kinds present in each occupied cell.
fn cells(snapshot: &WorldSnapshot) -> BTreeMap<Position, Vec<EntityKind>> {
    let mut cells: BTreeMap<Position, Vec<EntityKind>> = BTreeMap::new();
    for e in &snapshot.entities {
        cells.entry(e.position).or_default().push(e.kind);
    }
    cells
}

fn count(kinds: &[EntityKind], kind: EntityKind) -> usize {
    kinds.iter().filter(|&&k| k == kind).count()
}

// =============================================================================
// Grid invariant and movement legality
// =============================================================================

#[test]
fn every_scenario_keeps_the_grid_consistent() {
    let scenarios = [
        ScenarioConfig::Metro(metro(MetroLayout::Unidirectional, 0.3)),
        ScenarioConfig::Metro(metro(MetroLayout::Bidirectional, 0.3)),
        ScenarioConfig::CaptureFlag(CaptureFlagConfig::default()),
        ScenarioConfig::FlagWar(FlagWarConfig::default()),
    ];
    for scenario in scenarios {
        let mut model = Model::from_config(&config(scenario, 11)).unwrap();
        for _ in 0..150 {
            model.step().unwrap();
            model.world().verify().unwrap();
            let snapshot = model.snapshot();
            let ids: BTreeSet<_> = snapshot.entities.iter().map(|e| e.id).collect();
            assert_eq!(ids.len(), snapshot.entities.len());
            assert_eq!(snapshot.entities.len(), model.world().grid().entity_count());
        }
    }
}

#[test]
fn walkers_never_share_a_cell_with_walls_or_walkers() {
    let mut model =
        Model::from_config(&config(ScenarioConfig::Metro(metro(MetroLayout::Unidirectional, 0.5)), 3))
            .unwrap();
    let mut log = SnapshotLog::default();
    run_ticks(&mut model, 300, &mut log).unwrap();
    let mut saw_walkers = false;
    for snapshot in &log.snapshots {
        for kinds in cells(snapshot).values() {
            let walkers = count(kinds, EntityKind::Walker);
            saw_walkers |= walkers > 0;
            assert!(walkers <= 1, "two walkers in one cell at tick {}", snapshot.tick);
            if walkers > 0 {
                assert_eq!(count(kinds, EntityKind::Wall), 0);
            }
        }
    }
    assert!(saw_walkers);
}

#[test]
fn players_never_share_a_cell_or_stand_in_walls() {
    let scenarios = [
        ScenarioConfig::CaptureFlag(CaptureFlagConfig::default()),
        ScenarioConfig::FlagWar(FlagWarConfig::default()),
    ];
    for scenario in scenarios {
        let mut model = Model::from_config(&config(scenario, 5)).unwrap();
        let mut log = SnapshotLog::default();
        run_ticks(&mut model, 200, &mut log).unwrap();
        for snapshot in &log.snapshots {
            for kinds in cells(snapshot).values() {
                let players = count(kinds, EntityKind::Player);
                assert!(players <= 1, "two players in one cell at tick {}", snapshot.tick);
                if players > 0 {
                    assert_eq!(count(kinds, EntityKind::Wall), 0);
                }
            }
        }
    }
}

// =============================================================================
// Admission
// =============================================================================

#[test]
fn gates_at_full_rate_admit_one_walker_each_on_first_tick() {
    let mut model =
        Model::from_config(&config(ScenarioConfig::Metro(metro(MetroLayout::Bidirectional, 1.0)), 1))
            .unwrap();
    let report = model.step().unwrap();
    assert_eq!(report.spawned, 12);
    let snapshot = model.snapshot();
    for walker in snapshot.of_kind(EntityKind::Walker) {
        assert!(walker.position.x == 0 || walker.position.x == 44);
    }
}

#[test]
fn closed_gates_never_admit() {
    let mut model =
        Model::from_config(&config(ScenarioConfig::Metro(metro(MetroLayout::Bidirectional, 0.0)), 1))
            .unwrap();
    let summary = run_ticks(&mut model, 100, &mut NoOpCallback).unwrap();
    assert_eq!(model.snapshot().count_kind(EntityKind::Walker), 0);
    assert_eq!(summary.exited_walkers, 0);
}

#[test]
fn walkers_cross_the_station_and_leave_records() {
    let mut model =
        Model::from_config(&config(ScenarioConfig::Metro(metro(MetroLayout::Unidirectional, 0.3)), 9))
            .unwrap();
    run_ticks(&mut model, 600, &mut NoOpCallback).unwrap();
    let records = model.walker_records();
    assert!(!records.is_empty());
    for record in records {
        assert!(record.age >= 1);
        assert!(record.activations <= record.age);
        assert!(record.distance >= 40.0);
        assert!((0.39..=0.91).contains(&record.speed));
    }
}

// =============================================================================
// Flags
// =============================================================================

#[test]
fn carried_flags_track_their_carrier_every_tick() {
    let mut carried_ticks = 0u32;
    for seed in 20..24 {
        let (world, scenario) = CaptureFlagScenario::build(&CaptureFlagConfig::default()).unwrap();
        let flags = scenario.tables().flags;
        let mut model = Model::new(world, scenario, seed);
        for _ in 0..300 {
            model.step().unwrap();
            for flag_id in [flags.left, flags.right] {
                let flag = model.world().flag(flag_id).unwrap();
                if let Some(carrier) = flag.carrier {
                    carried_ticks += 1;
                    assert_eq!(model.world().position(flag_id), model.world().position(carrier));
                    let player = model.world().player(carrier).unwrap();
                    assert_eq!(player.carried_flag, Some(flag_id));
                }
            }
        }
    }
    assert!(carried_ticks > 0, "no flag was ever captured");
}

#[test]
fn flag_war_carriers_hold_their_flag_on_their_cell() {
    let (world, scenario) = FlagWarScenario::build(&FlagWarConfig::default()).unwrap();
    let flags = scenario.tables().flags;
    let mut model = Model::new(world, scenario, 4);
    for _ in 0..400 {
        model.step().unwrap();
        for flag_id in [flags.left, flags.right] {
            let flag = model.world().flag(flag_id).unwrap();
            match flag.carrier {
                Some(carrier) => {
                    assert_eq!(model.world().position(flag_id), model.world().position(carrier));
                }
                None => {
                    let holders = model
                        .world()
                        .entities()
                        .iter()
                        .filter_map(|(_, e)| e.as_player())
                        .filter(|p| p.carried_flag == Some(flag_id))
                        .count();
                    assert_eq!(holders, 0);
                }
            }
        }
    }
}

#[test]
fn patrol_ring_wraps_from_last_index_to_first() {
    assert_eq!(patrol::next_index(15), 0);
    let center = Position::new(10, 10);
    let last = center.offset(patrol::offset_at(15).unwrap()).unwrap();
    let first = center.offset(patrol::offset_at(0).unwrap()).unwrap();
    assert_eq!(patrol::next_patrol_cell(center, last), Some(first));
}

// =============================================================================
// Determinism
// =============================================================================

fn final_snapshot(scenario: ScenarioConfig, seed: u64, ticks: u64) -> WorldSnapshot {
    let mut model = Model::from_config(&config(scenario, seed)).unwrap();
    run_ticks(&mut model, ticks, &mut NoOpCallback).unwrap();
    model.snapshot()
}

#[test]
fn same_seed_same_outcome() {
    let scenarios = [
        ScenarioConfig::Metro(metro(MetroLayout::Unidirectional, 0.2)),
        ScenarioConfig::CaptureFlag(CaptureFlagConfig::default()),
        ScenarioConfig::FlagWar(FlagWarConfig::default()),
    ];
    for scenario in scenarios {
        let a = final_snapshot(scenario.clone(), 77, 120);
        let b = final_snapshot(scenario, 77, 120);
        assert_eq!(a, b);
    }
}

#[test]
fn different_seeds_diverge() {
    let scenario = ScenarioConfig::Metro(metro(MetroLayout::Unidirectional, 0.2));
    let a = final_snapshot(scenario.clone(), 1, 100);
    let b = final_snapshot(scenario, 2, 100);
    assert_ne!(a, b);
}

#[test]
fn snapshots_serialize() {
    let snapshot = final_snapshot(ScenarioConfig::FlagWar(FlagWarConfig::default()), 3, 10);
    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("\"kind\":\"player\""));
}

// =============================================================================
// Influence field conservation
// =============================================================================

#[test]
fn threat_fields_match_a_recount_from_live_entities() {
    let config = FlagWarConfig {
        shoot_probability: 1.0,
        attackers: PerSide::new(4, 4),
        ..FlagWarConfig::default()
    };
    let (world, scenario) = FlagWarScenario::build(&config).unwrap();
    let mut model = Model::new(world, scenario, 8);
    let (width, height) = (config.width, config.height);

    for _ in 0..300 {
        model.step().unwrap();
        let mut players = InfluenceField::new(width, height, config.field_baseline).unwrap();
        let mut shots = InfluenceField::new(width, height, config.field_baseline).unwrap();
        for (id, entity) in model.world().entities().iter() {
            let pos = model.world().position(id).unwrap();
            match entity {
                Entity::Player(_) => players.apply(&InfluenceMask::pressure(), pos),
                Entity::FireShot(shot) if !shot.crashed => {
                    shots.apply(&InfluenceMask::directional(shot.orientation), pos);
                }
                _ => {}
            }
        }
        let fields = model.scenario().fields();
        assert_eq!(fields.players().values(), players.values());
        assert_eq!(fields.shots().values(), shots.values());
    }
}

#[test]
fn crowd_pressure_matches_a_recount_from_live_walkers() {
    let config = MetroConfig {
        track_pressure: true,
        admission: PerSide::new(0.4, 0.4),
        ..MetroConfig::default()
    };
    let (world, scenario) = MetroScenario::build(&config).unwrap();
    let mut model = Model::new(world, scenario, 12);
    for _ in 0..300 {
        model.step().unwrap();
        let mut expected = InfluenceField::new(config.width, config.height, 0).unwrap();
        for (id, entity) in model.world().entities().iter() {
            if matches!(entity, Entity::Walker(_)) {
                let pos = model.world().position(id).unwrap();
                expected.apply(&InfluenceMask::pressure(), pos);
            }
        }
        let pressure = model.scenario().pressure().unwrap();
        assert_eq!(pressure.field().values(), expected.values());
        assert!(pressure.field().min_value() >= 0);
    }
}

#[test]
fn removing_every_entity_restores_the_baseline() {
    let mut field = InfluenceField::new(12, 9, 1).unwrap();
    let mask = InfluenceMask::pressure();
    let cells = [Position::new(0, 0), Position::new(5, 4), Position::new(11, 8)];
    for &c in &cells {
        field.apply(&mask, c);
    }
    field.relocate(&mask, cells[1], Position::new(6, 4));
    field.withdraw(&mask, cells[0]);
    field.withdraw(&mask, Position::new(6, 4));
    field.withdraw(&mask, cells[2]);
    assert!(field.is_at_baseline());
}
