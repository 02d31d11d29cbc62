//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use dnd_combat::items::AmmoKind;
use dnd_combat::{AbilityScores, Armory, Combatant, Stance};

/// Route `tracing` output through the test harness. Set `RUST_LOG=debug`
/// to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn armory() -> Armory {
    Armory::standard()
}

/// STR 18 fighter with a greatsword.
pub fn greatsword_fighter() -> Combatant {
    Combatant::new("Fighter", "party", 22)
        .with_abilities(AbilityScores::new(18, 12, 14, 10, 10, 10))
        .with_armor_class(16)
        .with_martial_training()
        .with_weapon("Greatsword")
}

/// Town guard that holds its ground with a longsword.
pub fn holding_guard() -> Combatant {
    Combatant::new("Guard", "town", 11)
        .with_abilities(AbilityScores::new(12, 12, 12, 10, 10, 10))
        .with_armor_class(14)
        .with_martial_training()
        .with_weapon("Longsword")
        .with_stance(Stance::Hold)
}

pub fn archer() -> Combatant {
    Combatant::new("Archer", "party", 16)
        .with_abilities(AbilityScores::new(10, 16, 12, 10, 12, 10))
        .with_armor_class(14)
        .with_martial_training()
        .with_weapon("Longbow")
        .with_ammunition(AmmoKind::Arrow, 20)
}

pub fn goblin(name: &str) -> Combatant {
    Combatant::new(name, "goblins", 7)
        .with_abilities(AbilityScores::new(8, 14, 10, 10, 8, 8))
        .with_armor_class(15)
        .with_martial_training()
        .with_weapon("Scimitar")
}
