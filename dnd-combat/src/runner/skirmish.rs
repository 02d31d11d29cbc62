//! Team fights with any number of combatants.

use super::scene::{take_turn, OpportunityScope};
use super::{Battle, Encounter};
use crate::combatant::{Combatant, CombatantId};
use crate::config::EncounterConfig;
use crate::error::CombatError;
use crate::items::WeaponLookup;

/// Runs a roster of combatants grouped by `team`.
///
/// The first combatant's team starts on one front line and every other team
/// on the opposite one. Each turn a combatant goes after the nearest enemy
/// still alive, and every enemy it walks away from may take an opportunity
/// attack.
#[derive(Debug, Clone, Default)]
pub struct SkirmishRunner {
    config: EncounterConfig,
}

impl SkirmishRunner {
    pub fn new(config: EncounterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncounterConfig {
        &self.config
    }

    pub fn run<W: WeaponLookup + ?Sized>(
        &self,
        roster: Vec<Combatant>,
        weapons: &W,
    ) -> Result<Encounter, CombatError> {
        if roster.is_empty() {
            return Err(CombatError::EmptyRoster);
        }
        let mut battle = Battle::new(roster, weapons, &self.config, true)?;
        battle.place_sides()?;
        let order = battle.roll_initiative()?;

        let timed_out = battle.run_rounds(&order, |battle, actor| {
            match nearest_enemy(battle, actor)? {
                Some(target) => take_turn(battle, actor, target, OpportunityScope::AllEnemies),
                None => Ok(()),
            }
        })?;
        Ok(battle.finish(timed_out))
    }
}

/// Closest enemy that is not dead. Ties go to the lowest HP, then name.
pub(crate) fn nearest_enemy<W: WeaponLookup + ?Sized>(
    battle: &Battle<'_, W>,
    actor: CombatantId,
) -> Result<Option<CombatantId>, CombatError> {
    let mut best: Option<(u32, i32, &str, CombatantId)> = None;
    for id in battle.arena.living_enemies(actor)? {
        let enemy = battle.arena.get(id)?;
        let key = (
            battle.arena.distance(actor, id)?,
            enemy.hp,
            enemy.name.as_str(),
            id,
        );
        if best.map_or(true, |current| key < current) {
            best = Some(key);
        }
    }
    Ok(best.map(|(_, _, _, id)| id))
}
