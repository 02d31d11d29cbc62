//! One-on-one fight on a line, with movement.
//!
//! Also home to the movement-and-attack turn policy the skirmish runner
//! reuses.

use super::{step_away, step_toward, Battle, Encounter};
use crate::attack::ADJACENT;
use crate::combatant::{Ability, Combatant, CombatantId, Condition, Stance};
use crate::config::EncounterConfig;
use crate::dice::{Advantage, DiceExpression};
use crate::error::CombatError;
use crate::items::{WeaponLookup, WeaponProfile};
use crate::log::LogEntry;
use tracing::debug;

/// Which enemies get opportunity attacks when a combatant moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpportunityScope {
    Opponent(CombatantId),
    AllEnemies,
}

impl OpportunityScope {
    fn enemies<W: WeaponLookup + ?Sized>(
        &self,
        battle: &Battle<'_, W>,
        actor: CombatantId,
    ) -> Result<Vec<CombatantId>, CombatError> {
        match self {
            OpportunityScope::Opponent(id) => Ok(vec![*id]),
            OpportunityScope::AllEnemies => battle.arena.living_enemies(actor),
        }
    }
}

/// Runs a two-combatant fight with a distance between them.
#[derive(Debug, Clone, Default)]
pub struct SceneRunner {
    config: EncounterConfig,
}

impl SceneRunner {
    pub fn new(config: EncounterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncounterConfig {
        &self.config
    }

    /// Fight `first` against `second`, starting `starting_distance` feet
    /// apart (plus each side's `front_distance`).
    pub fn run<W: WeaponLookup + ?Sized>(
        &self,
        first: Combatant,
        second: Combatant,
        weapons: &W,
    ) -> Result<Encounter, CombatError> {
        let mut battle = Battle::new(vec![first, second], weapons, &self.config, true)?;
        battle.place_sides()?;
        let order = battle.roll_initiative()?;
        let (a, b) = (CombatantId(0), CombatantId(1));

        let timed_out = battle.run_rounds(&order, |battle, actor| {
            let target = if actor == a { b } else { a };
            take_turn(battle, actor, target, OpportunityScope::Opponent(target))
        })?;
        Ok(battle.finish(timed_out))
    }
}

/// One combatant's turn: break free, drink, stand, then move and attack.
pub(crate) fn take_turn<W: WeaponLookup + ?Sized>(
    battle: &mut Battle<'_, W>,
    actor: CombatantId,
    target: CombatantId,
    scope: OpportunityScope,
) -> Result<(), CombatError> {
    let restrained = battle.arena.get(actor)?.has_condition(Condition::Restrained);
    if restrained && !escape_restraint(battle, actor)? {
        return Ok(());
    }

    if wants_potion(battle, actor)? {
        return drink_potion(battle, actor);
    }

    let mut budget = battle.arena.get(actor)?.current_speed();
    let combatant = battle.arena.get_mut(actor)?;
    if combatant.has_condition(Condition::Prone) {
        let cost = combatant.speed / 2;
        if budget >= cost {
            combatant.remove_condition(Condition::Prone);
            budget -= cost;
            battle.log.push(LogEntry::StoodUp { id: actor });
        }
    }

    let weapon = battle.main_weapon(actor)?;
    let enemies = scope.enemies(battle, actor)?;
    if weapon.is_ranged() {
        ranged_turn(battle, actor, target, weapon, budget, &enemies)
    } else {
        melee_turn(battle, actor, target, weapon, budget, &enemies)
    }
}

/// Close to reach and attack; dash when one move is not enough, or ready an
/// attack when the enemy will walk into reach anyway.
fn melee_turn<W: WeaponLookup + ?Sized>(
    battle: &mut Battle<'_, W>,
    actor: CombatantId,
    target: CombatantId,
    weapon: &WeaponProfile,
    budget: u32,
    enemies: &[CombatantId],
) -> Result<(), CombatError> {
    let reach = weapon.reach();
    let distance = battle.arena.distance(actor, target)?;
    if distance <= reach {
        return battle.attack_routine(actor, target);
    }

    let me = battle.arena.get(actor)?;
    if me.stance == Stance::Hold {
        return battle.ready(actor, target);
    }

    let from = me.position;
    let toward = battle.arena.get(target)?.position;
    let needed = distance - reach;
    if needed <= budget {
        let to = step_toward(from, toward, needed);
        if battle.move_to(actor, to, false, false, enemies)? {
            battle.attack_routine(actor, target)?;
        }
        return Ok(());
    }

    let enemy = battle.arena.get(target)?;
    let enemy_weapon = battle.main_weapon(target)?;
    let closes_in = !enemy_weapon.is_ranged()
        && enemy.is_conscious()
        && enemy.stance == Stance::Advance
        && enemy.current_speed() + enemy_weapon.reach() >= distance;
    if closes_in {
        debug!(actor = %actor, target = %target, "Holding for the enemy to close");
        return battle.ready(actor, target);
    }

    let to = step_toward(from, toward, needed.min(budget * 2));
    battle.move_to(actor, to, true, false, enemies)?;
    Ok(())
}

/// Keep a stand-off distance from melee enemies and shoot.
fn ranged_turn<W: WeaponLookup + ?Sized>(
    battle: &mut Battle<'_, W>,
    actor: CombatantId,
    target: CombatantId,
    weapon: &WeaponProfile,
    budget: u32,
    enemies: &[CombatantId],
) -> Result<(), CombatError> {
    let traits = weapon.traits();
    let me = battle.arena.get(actor)?;
    if let Some(kind) = traits.ammunition {
        if me.capabilities.ammo_count(kind) == Some(0) {
            return battle.dodge(actor);
        }
    }

    let (normal, long) = traits.range.unwrap_or((weapon.reach(), weapon.reach()));
    let preferred = battle.config.kite_distance.min(normal);
    let distance = battle.arena.distance(actor, target)?;
    let from = me.position;
    let stance = me.stance;

    let enemy = battle.arena.get(target)?;
    let enemy_at = enemy.position;
    let enemy_weapon = battle.main_weapon(target)?;
    let threat = (!enemy_weapon.is_ranged() && enemy.is_conscious())
        .then(|| enemy.current_speed() + enemy_weapon.reach());

    if stance == Stance::Hold {
        return if distance <= long {
            battle.attack_routine(actor, target)
        } else {
            battle.ready(actor, target)
        };
    }

    if let Some(threat) = threat {
        if distance <= ADJACENT {
            let to = step_away(from, enemy_at, budget);
            battle.move_to(actor, to, false, true, enemies)?;
            return Ok(());
        }
        if distance < preferred {
            if distance + budget <= threat {
                let to = step_away(from, enemy_at, budget * 2);
                battle.move_to(actor, to, true, false, enemies)?;
                return Ok(());
            }
            let to = step_away(from, enemy_at, budget.min(preferred - distance));
            if battle.move_to(actor, to, false, false, enemies)? {
                battle.attack_routine(actor, target)?;
            }
            return Ok(());
        }
    }

    if distance > normal {
        let gap = distance - normal;
        if distance.saturating_sub(budget) > long {
            let to = step_toward(from, enemy_at, gap.min(budget * 2));
            battle.move_to(actor, to, true, false, enemies)?;
            return Ok(());
        }
        let to = step_toward(from, enemy_at, gap.min(budget));
        if !battle.move_to(actor, to, false, false, enemies)? {
            return Ok(());
        }
    }

    battle.attack_routine(actor, target)
}

/// Strength save to act while restrained. Escaping ends the condition.
fn escape_restraint<W: WeaponLookup + ?Sized>(
    battle: &mut Battle<'_, W>,
    actor: CombatantId,
) -> Result<bool, CombatError> {
    let dc = battle.config.restraint_escape_dc;
    let bonus = battle.arena.get(actor)?.save_bonus(Ability::Strength);
    let roll = battle.roller.d20(Advantage::Normal, bonus);
    let escaped = roll.meets_dc(dc);
    if escaped {
        battle
            .arena
            .get_mut(actor)?
            .remove_condition(Condition::Restrained);
    }
    battle.log.push(LogEntry::RestraintSave {
        id: actor,
        roll,
        dc,
        escaped,
    });
    Ok(escaped)
}

fn wants_potion<W: WeaponLookup + ?Sized>(
    battle: &Battle<'_, W>,
    actor: CombatantId,
) -> Result<bool, CombatError> {
    let combatant = battle.arena.get(actor)?;
    Ok(combatant.potions > 0
        && combatant.hp > 0
        && combatant.hp < combatant.max_hp
        && combatant.hp_fraction() < battle.config.potion_threshold)
}

/// Drinking takes the whole turn.
fn drink_potion<W: WeaponLookup + ?Sized>(
    battle: &mut Battle<'_, W>,
    actor: CombatantId,
) -> Result<(), CombatError> {
    let dice = DiceExpression::parse(&battle.config.potion_dice)?;
    let roll = battle.roller.roll(&dice);
    let combatant = battle.arena.get_mut(actor)?;
    combatant.potions -= 1;
    let healed = combatant.heal(roll.total.max(0));
    debug!(name = %combatant.name, healed, "Potion drunk");
    battle.log.push(LogEntry::PotionDrunk {
        id: actor,
        roll,
        healed,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::AbilityScores;
    use crate::items::{AmmoKind, Armory};

    fn battle_of<'a>(
        armory: &'a Armory,
        config: &'a EncounterConfig,
        first: Combatant,
        second: Combatant,
    ) -> Battle<'a, Armory> {
        let mut battle = Battle::new(vec![first, second], armory, config, true).unwrap();
        battle.place_sides().unwrap();
        battle
    }

    fn moves(battle: &Battle<'_, Armory>) -> Vec<(i32, i32, bool, bool)> {
        battle
            .log
            .iter()
            .filter_map(|entry| match entry {
                LogEntry::Moved {
                    from,
                    to,
                    dashed,
                    disengaged,
                    ..
                } => Some((*from, *to, *dashed, *disengaged)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_melee_closes_and_attacks() {
        let armory = Armory::standard();
        let config = EncounterConfig::default().with_starting_distance(25);
        let mut battle = battle_of(
            &armory,
            &config,
            Combatant::new("Knight", "red", 30),
            Combatant::new("Bandit", "blue", 30),
        );
        take_turn(
            &mut battle,
            CombatantId(0),
            CombatantId(1),
            OpportunityScope::Opponent(CombatantId(1)),
        )
        .unwrap();
        assert_eq!(moves(&battle), vec![(0, 20, false, false)]);
        assert_eq!(battle.log.attacks().count(), 1);
    }

    #[test]
    fn test_melee_dashes_when_far() {
        let armory = Armory::standard();
        let config = EncounterConfig::default().with_starting_distance(80);
        let mut battle = battle_of(
            &armory,
            &config,
            Combatant::new("Knight", "red", 30),
            Combatant::new("Bandit", "blue", 30),
        );
        take_turn(
            &mut battle,
            CombatantId(0),
            CombatantId(1),
            OpportunityScope::Opponent(CombatantId(1)),
        )
        .unwrap();
        assert_eq!(moves(&battle), vec![(0, 60, true, false)]);
        assert_eq!(battle.log.attacks().count(), 0);
    }

    #[test]
    fn test_melee_readies_against_faster_enemy() {
        let armory = Armory::standard();
        let config = EncounterConfig::default().with_starting_distance(40);
        let mut battle = battle_of(
            &armory,
            &config,
            Combatant::new("Knight", "red", 30),
            Combatant::new("Wolf", "blue", 30).with_speed(40),
        );
        take_turn(
            &mut battle,
            CombatantId(0),
            CombatantId(1),
            OpportunityScope::Opponent(CombatantId(1)),
        )
        .unwrap();
        assert!(moves(&battle).is_empty());
        assert!(battle.arena.get(CombatantId(0)).unwrap().turn.readied.is_some());
    }

    #[test]
    fn test_archer_disengages_when_adjacent() {
        let armory = Armory::standard();
        let config = EncounterConfig::default().with_starting_distance(5);
        let mut battle = battle_of(
            &armory,
            &config,
            Combatant::new("Archer", "red", 20).with_weapon("Shortbow"),
            Combatant::new("Brute", "blue", 30),
        );
        take_turn(
            &mut battle,
            CombatantId(0),
            CombatantId(1),
            OpportunityScope::Opponent(CombatantId(1)),
        )
        .unwrap();
        assert_eq!(moves(&battle), vec![(0, -30, false, true)]);
        assert_eq!(battle.log.attacks().count(), 0);
    }

    #[test]
    fn test_archer_dashes_from_fast_threat() {
        let armory = Armory::standard();
        let config = EncounterConfig::default().with_starting_distance(20);
        let mut battle = battle_of(
            &armory,
            &config,
            Combatant::new("Archer", "red", 20).with_weapon("Shortbow"),
            Combatant::new("Rider", "blue", 30).with_speed(60),
        );
        take_turn(
            &mut battle,
            CombatantId(0),
            CombatantId(1),
            OpportunityScope::Opponent(CombatantId(1)),
        )
        .unwrap();
        assert_eq!(moves(&battle), vec![(0, -60, true, false)]);
    }

    #[test]
    fn test_archer_steps_back_and_shoots() {
        let armory = Armory::standard();
        let config = EncounterConfig::default().with_starting_distance(20);
        let mut battle = battle_of(
            &armory,
            &config,
            Combatant::new("Archer", "red", 20).with_weapon("Shortbow"),
            Combatant::new("Brute", "blue", 30),
        );
        take_turn(
            &mut battle,
            CombatantId(0),
            CombatantId(1),
            OpportunityScope::Opponent(CombatantId(1)),
        )
        .unwrap();
        assert_eq!(moves(&battle), vec![(0, -10, false, false)]);
        assert_eq!(battle.log.attacks().count(), 1);
    }

    #[test]
    fn test_archer_out_of_arrows_dodges() {
        let armory = Armory::standard();
        let config = EncounterConfig::default().with_starting_distance(60);
        let mut battle = battle_of(
            &armory,
            &config,
            Combatant::new("Archer", "red", 20)
                .with_weapon("Shortbow")
                .with_ammunition(AmmoKind::Arrow, 0),
            Combatant::new("Brute", "blue", 30),
        );
        take_turn(
            &mut battle,
            CombatantId(0),
            CombatantId(1),
            OpportunityScope::Opponent(CombatantId(1)),
        )
        .unwrap();
        assert!(battle.arena.get(CombatantId(0)).unwrap().turn.dodging);
        assert!(matches!(battle.log.entries.last(), Some(LogEntry::Dodged { .. })));
    }

    #[test]
    fn test_potion_takes_the_turn() {
        let armory = Armory::standard();
        let config = EncounterConfig::default().with_starting_distance(5);
        let mut hurt = Combatant::new("Hurt", "red", 30).with_potions(1);
        hurt.hp = 5;
        let mut battle = battle_of(&armory, &config, hurt, Combatant::new("Bandit", "blue", 30));
        take_turn(
            &mut battle,
            CombatantId(0),
            CombatantId(1),
            OpportunityScope::Opponent(CombatantId(1)),
        )
        .unwrap();

        let combatant = battle.arena.get(CombatantId(0)).unwrap();
        assert_eq!(combatant.potions, 0);
        assert!((9..=15).contains(&combatant.hp));
        assert_eq!(battle.log.attacks().count(), 0);
    }

    #[test]
    fn test_bad_potion_dice_is_error() {
        let armory = Armory::standard();
        let config = EncounterConfig::default().with_potion_dice("lots");
        let mut hurt = Combatant::new("Hurt", "red", 30).with_potions(1);
        hurt.hp = 1;
        let mut battle = battle_of(&armory, &config, hurt, Combatant::new("Bandit", "blue", 30));
        let result = take_turn(
            &mut battle,
            CombatantId(0),
            CombatantId(1),
            OpportunityScope::Opponent(CombatantId(1)),
        );
        assert!(matches!(result, Err(CombatError::Dice(_))));
    }

    #[test]
    fn test_restrained_must_escape() {
        let armory = Armory::standard();
        let config = EncounterConfig::default()
            .with_starting_distance(5)
            .with_restraint_escape_dc(40);
        let stuck = Combatant::new("Stuck", "red", 30)
            .with_abilities(AbilityScores::new(10, 10, 10, 10, 10, 10))
            .with_condition(Condition::Restrained);
        let mut battle = battle_of(&armory, &config, stuck, Combatant::new("Bandit", "blue", 30));
        take_turn(
            &mut battle,
            CombatantId(0),
            CombatantId(1),
            OpportunityScope::Opponent(CombatantId(1)),
        )
        .unwrap();
        assert!(matches!(
            battle.log.entries.last(),
            Some(LogEntry::RestraintSave { escaped: false, .. })
        ));
        assert_eq!(battle.log.attacks().count(), 0);
    }

    #[test]
    fn test_standing_up_costs_half_speed() {
        let armory = Armory::standard();
        let config = EncounterConfig::default().with_starting_distance(40);
        let prone = Combatant::new("Tripped", "red", 30).with_condition(Condition::Prone);
        let mut battle = battle_of(&armory, &config, prone, Combatant::new("Bandit", "blue", 30));
        take_turn(
            &mut battle,
            CombatantId(0),
            CombatantId(1),
            OpportunityScope::Opponent(CombatantId(1)),
        )
        .unwrap();
        assert!(!battle.arena.get(CombatantId(0)).unwrap().has_condition(Condition::Prone));
        // 15 feet left cannot close 35, so dash on what remains.
        assert_eq!(moves(&battle), vec![(0, 30, true, false)]);
    }
}
