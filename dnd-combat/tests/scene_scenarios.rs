//! Two-combatant scenes with movement on a line.
//!
//! Run with: `cargo test -p dnd-combat --test scene_scenarios`

mod common;

use common::{archer, armory, goblin, greatsword_fighter, holding_guard, init_tracing};
use dnd_combat::{
    AttackKind, CombatantId, DamageType, Defenses, EncounterConfig, LogEntry, SceneRunner, Stance,
};

const FIGHTER: CombatantId = CombatantId(0);
const GUARD: CombatantId = CombatantId(1);

// =============================================================================
// Closing distance
// =============================================================================

/// Index of the first `Moved` entry for `mover` (any mover if `None`) and of
/// the first attack.
fn first_move_and_attack(
    entries: &[&LogEntry],
    mover: Option<CombatantId>,
) -> (usize, usize) {
    let first_move = entries
        .iter()
        .position(|e| matches!(e, LogEntry::Moved { id, .. } if mover.map_or(true, |m| *id == m)))
        .expect("someone should move");
    let first_attack = entries
        .iter()
        .position(|e| matches!(e, LogEntry::Attack { .. }))
        .expect("someone should attack");
    (first_move, first_attack)
}

#[test]
fn test_fighter_dashes_before_first_swing() {
    init_tracing();
    let armory = armory();
    for seed in 0..40 {
        let runner = SceneRunner::new(EncounterConfig::new(seed).with_starting_distance(80));
        let encounter = runner
            .run(greatsword_fighter(), holding_guard(), &armory)
            .unwrap();

        let entries: Vec<&LogEntry> = encounter.log.iter().collect();
        let (first_move, first_attack) = first_move_and_attack(&entries, Some(FIGHTER));
        match entries[first_move] {
            LogEntry::Moved {
                from, to, dashed, ..
            } => {
                assert!(*dashed, "seed {seed}: 75 ft to close needs a dash");
                assert_eq!((to - from).abs(), 60);
            }
            other => panic!("unexpected entry {other:?}"),
        }
        assert!(first_move < first_attack, "seed {seed}: attack before the dash");
    }
}

#[test]
fn test_advancing_guard_first_mover_dashes() {
    let armory = armory();
    let guard = || holding_guard().with_stance(Stance::Advance);
    for seed in 0..40 {
        let runner = SceneRunner::new(EncounterConfig::new(seed).with_starting_distance(80));
        let encounter = runner.run(greatsword_fighter(), guard(), &armory).unwrap();

        let entries: Vec<&LogEntry> = encounter.log.iter().collect();
        let (first_move, first_attack) = first_move_and_attack(&entries, None);
        assert!(
            matches!(entries[first_move], LogEntry::Moved { dashed: true, .. }),
            "seed {seed}: the opening move should be a dash"
        );
        assert!(first_move < first_attack, "seed {seed}: attack before the dash");
    }
}

#[test]
fn test_holding_guard_gets_readied_attack_first() {
    let armory = armory();
    let runner = SceneRunner::new(EncounterConfig::new(5).with_starting_distance(80));
    let encounter = runner
        .run(greatsword_fighter(), holding_guard(), &armory)
        .unwrap();

    assert!(encounter
        .log
        .iter()
        .any(|e| matches!(
            e,
            LogEntry::Readied { id, target } if *id == GUARD && *target == FIGHTER
        )));

    let first_attack = encounter
        .log
        .iter()
        .find_map(|e| match e {
            LogEntry::Attack {
                attacker, kind, ..
            } => Some((*attacker, *kind)),
            _ => None,
        })
        .unwrap();
    assert_eq!(first_attack, (GUARD, AttackKind::Readied));

    // A longsword cannot drop 22 HP in one swing, so the fighter swings back.
    assert!(encounter
        .log
        .attacks()
        .any(|(attacker, _, outcome)| attacker == FIGHTER && outcome.ok));
}

#[test]
fn test_archer_opens_fire_at_range() {
    let armory = armory();
    let runner = SceneRunner::new(EncounterConfig::new(8).with_starting_distance(60));
    let sentry = goblin("Snik").with_stance(Stance::Hold);
    let encounter = runner.run(archer(), sentry, &armory).unwrap();

    let (_, target, outcome) = encounter
        .log
        .attacks()
        .find(|(attacker, _, _)| *attacker == FIGHTER)
        .expect("archer should shoot");
    assert_eq!(target, GUARD);
    assert!(outcome.ok);
    assert!(outcome.ranged);
    assert!(outcome.ammo_spent);

    let archer = encounter.combatant("Archer").unwrap();
    let shots = encounter
        .log
        .attacks()
        .filter(|(attacker, _, o)| *attacker == FIGHTER && o.ammo_spent)
        .count() as u32;
    assert_eq!(
        archer
            .capabilities
            .ammo_count(dnd_combat::items::AmmoKind::Arrow),
        Some(20 - shots)
    );
}

// =============================================================================
// Endings
// =============================================================================

#[test]
fn test_scene_times_out_at_max_rounds() {
    let armory = armory();
    let stone = Defenses::default()
        .immune(DamageType::Slashing)
        .immune(DamageType::Piercing);
    let runner = SceneRunner::new(
        EncounterConfig::new(13)
            .with_starting_distance(10)
            .with_max_rounds(5),
    );
    let encounter = runner
        .run(
            greatsword_fighter().with_defenses(stone.clone()),
            goblin("Snik").with_defenses(stone),
            &armory,
        )
        .unwrap();

    assert!(encounter.summary.timed_out);
    assert_eq!(encounter.summary.rounds, 5);
    assert_eq!(encounter.summary.winner, None);
    assert!(encounter.combatants.iter().all(|c| c.hp == c.max_hp));
}

#[test]
fn test_scene_winner_has_a_dead_opponent() {
    let armory = armory();
    let runner = SceneRunner::new(EncounterConfig::new(21).with_max_rounds(200));
    let encounter = runner
        .run(greatsword_fighter(), goblin("Snik"), &armory)
        .unwrap();

    let summary = &encounter.summary;
    assert!(!summary.timed_out);
    let winner = summary.winner.as_deref().unwrap();
    for standing in &summary.standings {
        if standing.team != winner {
            assert!(standing.death.is_dead());
            assert_eq!(standing.hp, 0);
        }
    }
}
