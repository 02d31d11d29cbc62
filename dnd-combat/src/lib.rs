//! Deterministic D&D 5e encounter simulation.
//!
//! This crate provides:
//! - Seeded dice with advantage/disadvantage
//! - Attack resolution with range, cover, conditions, feats and fighting styles
//! - Damage with resistances, temporary HP, death saves and concentration
//! - Duel, scene (movement on a line) and team skirmish runners
//!
//! Every roll in an encounter derives from one seed, so running the same
//! roster with the same [`EncounterConfig`] reproduces the same log.
//!
//! # Quick Start
//!
//! ```
//! use dnd_combat::{AbilityScores, Armory, Combatant, EncounterConfig, SceneRunner};
//!
//! let armory = Armory::standard();
//! let fighter = Combatant::new("Fighter", "party", 22)
//!     .with_abilities(AbilityScores::new(18, 12, 14, 10, 10, 10))
//!     .with_martial_training()
//!     .with_weapon("Greatsword");
//! let guard = Combatant::new("Guard", "town", 11)
//!     .with_martial_training()
//!     .with_weapon("Longsword");
//!
//! let runner = SceneRunner::new(EncounterConfig::new(42).with_starting_distance(80));
//! let encounter = runner.run(fighter, guard, &armory)?;
//! println!("{:?} after {} rounds", encounter.summary.winner, encounter.summary.rounds);
//! # Ok::<(), dnd_combat::CombatError>(())
//! ```

pub mod attack;
pub mod combatant;
pub mod concentration;
pub mod config;
pub mod damage;
pub mod death;
pub mod dice;
pub mod error;
pub mod items;
pub mod log;
pub mod math;
pub mod runner;

// Primary public API
pub use attack::{resolve_attack, AttackOutcome, AttackRequest, Hand, RejectReason, Target};
pub use combatant::{
    Ability, AbilityScores, Arena, Capabilities, Combatant, CombatantId, Condition, Cover, Feat,
    FightingStyle, HitDice, Stance,
};
pub use concentration::{Concentration, ConcentrationCheck};
pub use config::EncounterConfig;
pub use damage::{apply_damage, apply_defenses, DamageType, Defenses};
pub use death::{DeathSaveEvent, DeathState};
pub use dice::{roll, Advantage, DiceError, DiceExpression, RollResult, Roller};
pub use error::CombatError;
pub use items::{Armory, ArmorLookup, ArmorProfile, WeaponLookup, WeaponProfile, WeaponProperty};
pub use log::{AttackKind, EncounterLog, EncounterSummary, LogEntry};
pub use math::{combine_modes, hit_probabilities, roll_outcome, HitProbabilities};
pub use runner::{DuelRunner, Encounter, SceneRunner, SkirmishRunner};
