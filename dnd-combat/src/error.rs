//! Hard errors for the simulation core.
//!
//! These signal a caller defect (bad data, bad wiring). Rule-level refusals
//! such as an out-of-range shot are not errors; see
//! [`RejectReason`](crate::attack::RejectReason).

use crate::combatant::CombatantId;
use crate::dice::DiceError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombatError {
    #[error("Dice error: {0}")]
    Dice(#[from] DiceError),

    #[error("Unknown weapon: {0}")]
    UnknownWeapon(String),

    #[error("Unknown armor: {0}")]
    UnknownArmor(String),

    #[error("Unknown combatant: {0}")]
    UnknownCombatant(CombatantId),

    #[error("An encounter needs at least one combatant per side")]
    EmptyRoster,
}
