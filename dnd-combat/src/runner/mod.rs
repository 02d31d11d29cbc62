//! Encounter runners.
//!
//! All three runners share one [`Battle`]: the arena, the roller, the log and
//! the turn mechanics (initiative, death saves, attacks, movement with
//! opportunity attacks). They differ only in turn policy:
//!
//! - [`DuelRunner`]: two combatants, no distance, attack every turn.
//! - [`SceneRunner`]: two combatants on a line with movement and kiting.
//! - [`SkirmishRunner`]: any number of combatants in teams, nearest-enemy
//!   targeting and opportunity attacks from every enemy.

mod duel;
mod scene;
mod skirmish;

pub use duel::DuelRunner;
pub use scene::SceneRunner;
pub use skirmish::SkirmishRunner;

use crate::attack::{resolve_attack, AttackOutcome, AttackRequest, Hand};
use crate::combatant::{Arena, Combatant, CombatantId, Condition};
use crate::config::EncounterConfig;
use crate::damage::apply_damage;
use crate::death::DeathSaveEvent;
use crate::dice::{Advantage, Roller};
use crate::error::CombatError;
use crate::items::{WeaponLookup, WeaponProfile};
use crate::log::{AttackKind, EncounterLog, EncounterSummary, InitiativeRoll, LogEntry, Standing};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// A finished encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub combatants: Vec<Combatant>,
    pub log: EncounterLog,
    pub summary: EncounterSummary,
}

impl Encounter {
    pub fn combatant(&self, name: &str) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.name == name)
    }
}

/// State of an encounter in progress.
pub(crate) struct Battle<'a, W: ?Sized> {
    pub(crate) arena: Arena,
    pub(crate) config: &'a EncounterConfig,
    pub(crate) roller: Roller,
    pub(crate) log: EncounterLog,
    pub(crate) round: u32,
    weapons: &'a W,
    spatial: bool,
}

impl<'a, W: WeaponLookup + ?Sized> Battle<'a, W> {
    /// Set up the arena. Every wielded weapon must exist and there must be
    /// at least two teams.
    pub(crate) fn new(
        roster: Vec<Combatant>,
        weapons: &'a W,
        config: &'a EncounterConfig,
        spatial: bool,
    ) -> Result<Self, CombatError> {
        let mut arena = Arena::new();
        for combatant in roster {
            for name in std::iter::once(&combatant.weapon).chain(combatant.off_hand.as_ref()) {
                if weapons.weapon(name).is_none() {
                    return Err(CombatError::UnknownWeapon(name.clone()));
                }
            }
            arena.add(combatant);
        }

        let teams: BTreeSet<&str> = arena.iter().map(|c| c.team.as_str()).collect();
        if teams.len() < 2 {
            return Err(CombatError::EmptyRoster);
        }

        info!(
            combatants = arena.len(),
            seed = config.seed,
            spatial,
            "Encounter started"
        );

        Ok(Self {
            arena,
            config,
            roller: Roller::new(config.seed),
            log: EncounterLog::default(),
            round: 0,
            weapons,
            spatial,
        })
    }

    pub(crate) fn weapon(&self, name: &str) -> Result<&'a WeaponProfile, CombatError> {
        let weapons: &'a W = self.weapons;
        weapons
            .weapon(name)
            .ok_or_else(|| CombatError::UnknownWeapon(name.to_string()))
    }

    pub(crate) fn main_weapon(&self, id: CombatantId) -> Result<&'a WeaponProfile, CombatError> {
        let name = &self.arena.get(id)?.weapon;
        self.weapon(name)
    }

    /// `None` for fights without a distance model.
    pub(crate) fn distance(
        &self,
        a: CombatantId,
        b: CombatantId,
    ) -> Result<Option<u32>, CombatError> {
        if self.spatial {
            Ok(Some(self.arena.distance(a, b)?))
        } else {
            Ok(None)
        }
    }

    /// Put the first combatant's team on one front line and everyone else
    /// on the other, `starting_distance` apart.
    pub(crate) fn place_sides(&mut self) -> Result<(), CombatError> {
        let Some(first) = self.arena.iter().next() else {
            return Err(CombatError::EmptyRoster);
        };
        let home = first.team.clone();
        let gap = self.config.starting_distance as i32;
        for id in self.arena.ids() {
            let combatant = self.arena.get_mut(id)?;
            let behind = combatant.front_distance as i32;
            combatant.position = if combatant.team == home {
                -behind
            } else {
                gap + behind
            };
        }
        Ok(())
    }

    /// Roll `d20 + DEX` for everyone and return the acting order.
    ///
    /// Ties go to the higher DEX modifier, then name, then arena id.
    pub(crate) fn roll_initiative(&mut self) -> Result<Vec<CombatantId>, CombatError> {
        let mut rolls = Vec::with_capacity(self.arena.len());
        for id in self.arena.ids() {
            let combatant = self.arena.get(id)?;
            let dex_mod = combatant.initiative_modifier();
            let roll = self.roller.d20(Advantage::Normal, dex_mod);
            rolls.push(InitiativeRoll {
                id,
                name: combatant.name.clone(),
                total: roll.total,
                dex_mod,
            });
        }
        rolls.sort_by(|a, b| {
            b.total
                .cmp(&a.total)
                .then(b.dex_mod.cmp(&a.dex_mod))
                .then_with(|| a.name.cmp(&b.name))
                .then(a.id.cmp(&b.id))
        });

        let order = rolls.iter().map(|r| r.id).collect();
        debug!(?rolls, "Initiative rolled");
        self.log.push(LogEntry::Initiative { order: rolls });
        Ok(order)
    }

    /// Start `id`'s turn. Returns whether it can act.
    ///
    /// Dying combatants make their death save here and lose the turn.
    pub(crate) fn start_turn(&mut self, id: CombatantId) -> Result<bool, CombatError> {
        if self.arena.get(id)?.is_dead() {
            return Ok(false);
        }

        if let Some(grappler) = self.arena.get(id)?.grappled_by {
            if self.arena.get(grappler)?.is_down() {
                let combatant = self.arena.get_mut(id)?;
                combatant.grappled_by = None;
                combatant.remove_condition(Condition::Grappled);
                self.log.push(LogEntry::GrappleEnded { id, grappler });
            }
        }

        let combatant = self.arena.get_mut(id)?;
        combatant.begin_turn();
        self.log.push(LogEntry::TurnStarted {
            id,
            name: combatant.name.clone(),
            hp: combatant.hp,
        });

        if combatant.hp <= 0 {
            if !combatant.death.is_dying() {
                self.log.push(LogEntry::Skipped {
                    id,
                    reason: "unconscious".to_string(),
                });
                return Ok(false);
            }
            let roll = self.roller.d20(Advantage::Normal, 0);
            let combatant = self.arena.get_mut(id)?;
            let outcome = combatant.death.roll_save(roll.face());
            if outcome == DeathSaveEvent::Revived {
                combatant.heal(1);
            }
            if outcome == DeathSaveEvent::Died {
                info!(name = %combatant.name, "Died after failed death saves");
            }
            let state = combatant.death;
            self.log.push(LogEntry::DeathSave {
                id,
                roll,
                outcome,
                state,
            });
            return Ok(false);
        }

        if let Some(condition) = combatant
            .conditions
            .iter()
            .find(|condition| condition.is_incapacitating())
        {
            let reason = condition.name().to_lowercase();
            self.log.push(LogEntry::Skipped { id, reason });
            return Ok(false);
        }

        Ok(true)
    }

    /// Conscious, alive and with its reaction unspent.
    pub(crate) fn can_react(&self, id: CombatantId) -> Result<bool, CombatError> {
        let combatant = self.arena.get(id)?;
        Ok(combatant.turn.reaction_available && combatant.is_conscious())
    }

    pub(crate) fn request_for(
        &self,
        id: CombatantId,
        hand: Hand,
    ) -> Result<AttackRequest, CombatError> {
        let combatant = self.arena.get(id)?;
        let name = match (hand, &combatant.off_hand) {
            (Hand::OffHand, Some(off_hand)) => off_hand.clone(),
            _ => combatant.weapon.clone(),
        };
        let weapon = self.weapon(&name)?;
        let two_hands = hand == Hand::Main
            && combatant.off_hand.is_none()
            && weapon.traits().versatile.is_some();

        let mut request = AttackRequest::new(name)
            .with_two_hands(two_hands)
            .with_power_attack(combatant.power_attack);
        request.hand = hand;
        Ok(request)
    }

    /// Resolve an attack, apply its damage and log both.
    pub(crate) fn attack(
        &mut self,
        attacker: CombatantId,
        target: CombatantId,
        kind: AttackKind,
        request: AttackRequest,
    ) -> Result<AttackOutcome, CombatError> {
        let distance = self.distance(attacker, target)?;
        let view = crate::attack::Target::of(self.arena.get(target)?, distance);
        let weapons: &'a W = self.weapons;
        let outcome = resolve_attack(
            self.arena.get_mut(attacker)?,
            &request,
            &view,
            weapons,
            &mut self.roller,
        )?;
        self.log.push(LogEntry::Attack {
            attacker,
            target,
            kind,
            outcome: outcome.clone(),
        });

        if let Some(damage) = &outcome.damage {
            let melee_crit = outcome.crit && !outcome.ranged;
            let defender = self.arena.get_mut(target)?;
            let report = apply_damage(
                defender,
                damage.total,
                damage.damage_type,
                melee_crit,
                &mut self.roller,
            );
            if report.dropped_to_zero {
                info!(name = %defender.name, "Dropped to 0 HP");
            }
            if report.death_save == Some(DeathSaveEvent::Died) {
                info!(name = %defender.name, "Killed");
            }
            self.log.push(LogEntry::Damage { target, report });
        }

        Ok(outcome)
    }

    /// Primary attacks (one plus extra attacks), then an off-hand attack if
    /// the off-hand weapon is a light melee weapon and nothing loading was
    /// fired this turn.
    pub(crate) fn attack_routine(
        &mut self,
        actor: CombatantId,
        target: CombatantId,
    ) -> Result<(), CombatError> {
        let attacks = 1 + self.arena.get(actor)?.capabilities.extra_attacks as usize;
        for _ in 0..attacks {
            if self.arena.get(target)?.is_dead() || self.arena.get(actor)?.is_down() {
                return Ok(());
            }
            let request = self.request_for(actor, Hand::Main)?;
            self.attack(actor, target, AttackKind::Primary, request)?;
        }

        let combatant = self.arena.get(actor)?;
        let Some(off_hand) = &combatant.off_hand else {
            return Ok(());
        };
        let weapon = self.weapon(off_hand)?;
        let traits = weapon.traits();
        let eligible = traits.light
            && !weapon.is_ranged()
            && !traits.loading
            && !combatant.turn.fired_loading
            && !combatant.is_down();
        if eligible && !self.arena.get(target)?.is_dead() {
            let request = self.request_for(actor, Hand::OffHand)?;
            self.attack(actor, target, AttackKind::OffHand, request)?;
        }
        Ok(())
    }

    /// Hold an attack for when `target` comes within range.
    pub(crate) fn ready(
        &mut self,
        actor: CombatantId,
        target: CombatantId,
    ) -> Result<(), CombatError> {
        self.arena.get_mut(actor)?.ready_attack(target);
        self.log.push(LogEntry::Readied { id: actor, target });
        Ok(())
    }

    pub(crate) fn dodge(&mut self, actor: CombatantId) -> Result<(), CombatError> {
        self.arena.get_mut(actor)?.dodge();
        self.log.push(LogEntry::Dodged { id: actor });
        Ok(())
    }

    /// Move `mover` to `to` on the battle line.
    ///
    /// Each enemy in `enemies` whose melee reach the mover leaves gets an
    /// opportunity attack at the pre-move distance unless the mover
    /// disengaged; each enemy holding a readied attack against the mover
    /// fires it once the mover comes within range. Returns `false` if the
    /// mover was dropped along the way.
    pub(crate) fn move_to(
        &mut self,
        mover: CombatantId,
        to: i32,
        dashed: bool,
        disengaged: bool,
        enemies: &[CombatantId],
    ) -> Result<bool, CombatError> {
        let from = self.arena.get(mover)?.position;
        if from == to {
            return Ok(true);
        }

        if !disengaged {
            for &enemy in enemies {
                if enemy == mover || !self.can_react(enemy)? {
                    continue;
                }
                let weapon = self.main_weapon(enemy)?;
                if weapon.is_ranged() {
                    continue;
                }
                let reach = weapon.reach();
                let position = self.arena.get(enemy)?.position;
                let before = (from - position).unsigned_abs();
                let after = (to - position).unsigned_abs();
                if before <= reach && after > reach {
                    self.arena.get_mut(enemy)?.turn.reaction_available = false;
                    let request = self.request_for(enemy, Hand::Main)?;
                    self.attack(enemy, mover, AttackKind::Opportunity, request)?;
                    if self.arena.get(mover)?.is_down() {
                        return Ok(false);
                    }
                }
            }
        }

        self.arena.get_mut(mover)?.position = to;
        self.log.push(LogEntry::Moved {
            id: mover,
            from,
            to,
            dashed,
            disengaged,
        });

        for &enemy in enemies {
            if enemy == mover || !self.can_react(enemy)? {
                continue;
            }
            let holder = self.arena.get(enemy)?;
            let Some(readied) = holder.turn.readied else {
                continue;
            };
            if readied.target_id != mover {
                continue;
            }
            let range = threat_range(self.main_weapon(enemy)?);
            let before = (from - holder.position).unsigned_abs();
            let after = (to - holder.position).unsigned_abs();
            if before > range && after <= range {
                let holder = self.arena.get_mut(enemy)?;
                holder.turn.readied = None;
                holder.turn.reaction_available = false;
                let request = self.request_for(enemy, Hand::Main)?;
                self.attack(enemy, mover, AttackKind::Readied, request)?;
                if self.arena.get(mover)?.is_down() {
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }

    /// One team or none left standing.
    pub(crate) fn decided(&self) -> bool {
        self.arena.teams_standing().len() <= 1
    }

    /// Play rounds in `order` until the fight is decided or the round cap
    /// is reached. Returns whether it timed out.
    pub(crate) fn run_rounds(
        &mut self,
        order: &[CombatantId],
        mut turn: impl FnMut(&mut Self, CombatantId) -> Result<(), CombatError>,
    ) -> Result<bool, CombatError> {
        while !self.decided() {
            if self.round >= self.config.max_rounds {
                return Ok(true);
            }
            self.round += 1;
            self.log.push(LogEntry::RoundStarted { round: self.round });
            debug!(round = self.round, "Round started");

            for &id in order {
                if self.decided() {
                    break;
                }
                if self.start_turn(id)? {
                    turn(self, id)?;
                }
            }
        }
        Ok(false)
    }

    pub(crate) fn finish(self, timed_out: bool) -> Encounter {
        let standing = self.arena.teams_standing();
        let winner = if standing.len() == 1 {
            standing.into_iter().next()
        } else {
            None
        };
        info!(
            winner = winner.as_deref().unwrap_or("none"),
            rounds = self.round,
            timed_out,
            "Encounter finished"
        );

        let combatants = self.arena.into_combatants();
        let summary = EncounterSummary {
            winner,
            rounds: self.round,
            timed_out,
            standings: combatants.iter().map(Standing::from).collect(),
        };
        Encounter {
            combatants,
            log: self.log,
            summary,
        }
    }
}

/// Distance at which a weapon can strike: reach for melee, normal range
/// for ranged.
pub(crate) fn threat_range(weapon: &WeaponProfile) -> u32 {
    if weapon.is_ranged() {
        weapon
            .traits()
            .range
            .map(|(normal, _)| normal)
            .unwrap_or_else(|| weapon.reach())
    } else {
        weapon.reach()
    }
}

/// Position `feet` from `from` in the direction of `toward`.
pub(crate) fn step_toward(from: i32, toward: i32, feet: u32) -> i32 {
    if toward >= from {
        from + feet as i32
    } else {
        from - feet as i32
    }
}

/// Position `feet` from `from` directly away from `away`.
pub(crate) fn step_away(from: i32, away: i32, feet: u32) -> i32 {
    if away > from {
        from - feet as i32
    } else {
        from + feet as i32
    }
}
