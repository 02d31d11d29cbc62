//! Concentration on an ongoing effect.
//!
//! A combatant holds at most one effect. Damage forces a Constitution save
//! against `max(10, damage / 2)`; falling unconscious ends it outright.

use crate::dice::{Advantage, RollResult, Roller};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concentration {
    pub label: Option<String>,
}

/// Result of a concentration check caused by damage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcentrationCheck {
    pub label: String,
    pub dc: i32,
    /// `None` when concentration ended without a save.
    pub roll: Option<RollResult>,
    pub maintained: bool,
    pub reason: Option<String>,
}

impl Concentration {
    /// Begin concentrating, replacing whatever was held. Returns the
    /// replaced effect.
    pub fn start(&mut self, label: impl Into<String>) -> Option<String> {
        self.label.replace(label.into())
    }

    pub fn is_concentrating(&self) -> bool {
        self.label.is_some()
    }

    pub fn end(&mut self) -> Option<String> {
        self.label.take()
    }

    pub fn dc_for(amount: i32) -> i32 {
        (amount / 2).max(10)
    }

    /// Constitution save after taking `amount` damage.
    ///
    /// Returns `None` when nothing is held or no damage was taken.
    pub fn on_damage(
        &mut self,
        amount: i32,
        save_bonus: i32,
        advantage: bool,
        roller: &mut Roller,
    ) -> Option<ConcentrationCheck> {
        if amount <= 0 {
            return None;
        }
        let label = self.label.clone()?;
        let dc = Self::dc_for(amount);
        let mode = if advantage {
            Advantage::Advantage
        } else {
            Advantage::Normal
        };
        let roll = roller.d20(mode, save_bonus);
        let maintained = roll.meets_dc(dc);

        let reason = if maintained {
            None
        } else {
            self.label = None;
            Some(format!(
                "failed DC {dc} Constitution save ({}) after {amount} damage",
                roll.total
            ))
        };

        Some(ConcentrationCheck {
            label,
            dc,
            roll: Some(roll),
            maintained,
            reason,
        })
    }

    /// Unconsciousness ends concentration with no save.
    pub fn on_unconscious(&mut self) -> Option<ConcentrationCheck> {
        let label = self.label.take()?;
        Some(ConcentrationCheck {
            label,
            dc: 0,
            roll: None,
            maintained: false,
            reason: Some("fell unconscious".to_string()),
        })
    }
}
