//! Stand-and-fight duel with no distance model.

use super::{Battle, Encounter};
use crate::combatant::{Combatant, CombatantId};
use crate::config::EncounterConfig;
use crate::error::CombatError;
use crate::items::WeaponLookup;

/// Runs two combatants against each other, round after round, with every
/// attack in reach and range.
#[derive(Debug, Clone, Default)]
pub struct DuelRunner {
    config: EncounterConfig,
}

impl DuelRunner {
    pub fn new(config: EncounterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncounterConfig {
        &self.config
    }

    pub fn run<W: WeaponLookup + ?Sized>(
        &self,
        first: Combatant,
        second: Combatant,
        weapons: &W,
    ) -> Result<Encounter, CombatError> {
        let mut battle = Battle::new(vec![first, second], weapons, &self.config, false)?;
        let order = battle.roll_initiative()?;
        let (a, b) = (CombatantId(0), CombatantId(1));

        let timed_out = battle.run_rounds(&order, |battle, actor| {
            let target = if actor == a { b } else { a };
            battle.attack_routine(actor, target)
        })?;
        Ok(battle.finish(timed_out))
    }
}
