//! Encounter configuration.

use serde::{Deserialize, Serialize};

/// Settings shared by every runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// The one seed every roll in the encounter is derived from.
    pub seed: u64,
    /// Rounds before the encounter ends in a timeout.
    pub max_rounds: u32,
    /// Feet between the two sides' front lines at the start.
    pub starting_distance: u32,
    /// Distance a ranged combatant tries to keep from melee enemies.
    pub kite_distance: u32,
    /// HP fraction below which a combatant drinks a potion if it has one.
    pub potion_threshold: f32,
    pub potion_dice: String,
    /// Strength save DC to act while restrained.
    pub restraint_escape_dc: i32,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_rounds: 20,
            starting_distance: 30,
            kite_distance: 30,
            potion_threshold: 1.0 / 3.0,
            potion_dice: "2d4+2".to_string(),
            restraint_escape_dc: 12,
        }
    }
}

impl EncounterConfig {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_starting_distance(mut self, feet: u32) -> Self {
        self.starting_distance = feet;
        self
    }

    pub fn with_kite_distance(mut self, feet: u32) -> Self {
        self.kite_distance = feet;
        self
    }

    pub fn with_potion_threshold(mut self, fraction: f32) -> Self {
        self.potion_threshold = fraction;
        self
    }

    pub fn with_potion_dice(mut self, dice: impl Into<String>) -> Self {
        self.potion_dice = dice.into();
        self
    }

    pub fn with_restraint_escape_dc(mut self, dc: i32) -> Self {
        self.restraint_escape_dc = dc;
        self
    }
}
