//! Death saving throws.
//!
//! A combatant at 0 HP is `Dying` until three successes stabilize it or three
//! failures kill it. `Stable` is also the state of every combatant that is
//! simply alive.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters never exceed this in either direction.
pub const DEATH_SAVE_LIMIT: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum DeathState {
    #[default]
    Stable,
    Dying {
        successes: u8,
        failures: u8,
    },
    Dead,
}

/// What a single death save did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathSaveEvent {
    /// Natural 20: back to stable at once.
    Revived,
    Success,
    Failure,
    /// Natural 1: two failures.
    CriticalFailure,
    Stabilized,
    Died,
    /// Not dying, so no save was made.
    NotDying,
}

impl DeathState {
    pub fn is_dead(&self) -> bool {
        matches!(self, DeathState::Dead)
    }

    pub fn is_dying(&self) -> bool {
        matches!(self, DeathState::Dying { .. })
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, DeathState::Stable)
    }

    pub fn successes(&self) -> u8 {
        match self {
            DeathState::Dying { successes, .. } => *successes,
            _ => 0,
        }
    }

    pub fn failures(&self) -> u8 {
        match self {
            DeathState::Dying { failures, .. } => *failures,
            DeathState::Dead => DEATH_SAVE_LIMIT,
            DeathState::Stable => 0,
        }
    }

    /// Dropping to 0 HP starts the dying clock.
    pub fn fall_unconscious(&mut self) {
        if !self.is_dead() {
            *self = DeathState::Dying {
                successes: 0,
                failures: 0,
            };
        }
    }

    /// Resolve a death save with the kept d20 face.
    pub fn roll_save(&mut self, face: u32) -> DeathSaveEvent {
        let DeathState::Dying {
            successes,
            failures,
        } = *self
        else {
            return DeathSaveEvent::NotDying;
        };

        let (successes, failures, event) = match face {
            20 => {
                *self = DeathState::Stable;
                return DeathSaveEvent::Revived;
            }
            1 => (successes, failures + 2, DeathSaveEvent::CriticalFailure),
            f if f >= 10 => (successes + 1, failures, DeathSaveEvent::Success),
            _ => (successes, failures + 1, DeathSaveEvent::Failure),
        };

        self.settle(successes, failures, event)
    }

    /// Taking damage while at 0 HP. A melee critical counts twice.
    pub fn damaged_at_zero(&mut self, melee_crit: bool) -> DeathSaveEvent {
        let added = if melee_crit { 2 } else { 1 };
        let (successes, failures) = match *self {
            DeathState::Dead => return DeathSaveEvent::NotDying,
            DeathState::Stable => (0, 0),
            DeathState::Dying {
                successes,
                failures,
            } => (successes, failures),
        };
        let event = if melee_crit {
            DeathSaveEvent::CriticalFailure
        } else {
            DeathSaveEvent::Failure
        };
        self.settle(successes, failures + added, event)
    }

    /// Any healing that brings HP above 0.
    pub fn revive(&mut self) {
        if !self.is_dead() {
            *self = DeathState::Stable;
        }
    }

    fn settle(&mut self, successes: u8, failures: u8, event: DeathSaveEvent) -> DeathSaveEvent {
        let successes = successes.min(DEATH_SAVE_LIMIT);
        let failures = failures.min(DEATH_SAVE_LIMIT);

        if failures >= DEATH_SAVE_LIMIT {
            *self = DeathState::Dead;
            DeathSaveEvent::Died
        } else if successes >= DEATH_SAVE_LIMIT {
            *self = DeathState::Stable;
            DeathSaveEvent::Stabilized
        } else {
            *self = DeathState::Dying {
                successes,
                failures,
            };
            event
        }
    }
}

impl fmt::Display for DeathState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeathState::Stable => write!(f, "stable"),
            DeathState::Dying {
                successes,
                failures,
            } => write!(f, "dying ({successes} successes, {failures} failures)"),
            DeathState::Dead => write!(f, "dead"),
        }
    }
}
