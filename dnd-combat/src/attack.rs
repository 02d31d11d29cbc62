//! Attack resolution.
//!
//! Folds the attacker's capabilities, the weapon profile and a read-only
//! view of the target into one [`AttackOutcome`]. Rule refusals (loading,
//! range, reach, total cover, ammunition) come back as `ok == false`
//! outcomes; only caller defects such as an unknown weapon are errors.

use crate::combatant::{Ability, Combatant, CombatantId, Condition, Cover, Feat, FightingStyle};
use crate::damage::DamageType;
use crate::dice::{Advantage, DiceExpression, RollResult, Roller};
use crate::error::CombatError;
use crate::items::WeaponLookup;
use crate::math::roll_outcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Feet within which a creature counts as adjacent.
pub const ADJACENT: u32 = 5;

const POWER_ATTACK_PENALTY: i32 = 5;
const POWER_ATTACK_BONUS: i32 = 10;

/// Why an attack could not be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    LoadingAlreadyFired,
    OutOfRange,
    OutOfReach,
    TotalCover,
    NoAmmunition,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::LoadingAlreadyFired => "loading_already_fired",
            RejectReason::OutOfRange => "out_of_range",
            RejectReason::OutOfReach => "out_of_reach",
            RejectReason::TotalCover => "total_cover",
            RejectReason::NoAmmunition => "no_ammunition",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// What the attacker can see of its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: CombatantId,
    pub name: String,
    pub ac: i32,
    pub hp: i32,
    pub cover: Cover,
    /// `None` when the fight has no distance model.
    pub distance: Option<u32>,
    pub conditions: BTreeSet<Condition>,
    pub dodging: bool,
}

impl Target {
    pub fn of(combatant: &Combatant, distance: Option<u32>) -> Self {
        Self {
            id: combatant.id,
            name: combatant.name.clone(),
            ac: combatant.armor_class,
            hp: combatant.hp,
            cover: combatant.cover,
            distance,
            conditions: combatant.conditions.clone(),
            dodging: combatant.turn.dodging,
        }
    }

    pub fn with_cover(mut self, cover: Cover) -> Self {
        self.cover = cover;
        self
    }

    fn has(&self, condition: Condition) -> bool {
        self.conditions.contains(&condition)
    }

    /// Unconscious for the purpose of attack rolls.
    fn is_helpless(&self) -> bool {
        self.hp <= 0 || self.has(Condition::Unconscious) || self.has(Condition::Paralyzed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    #[default]
    Main,
    OffHand,
}

/// One attack the caller wants to make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRequest {
    pub weapon: String,
    pub mode: Advantage,
    pub hand: Hand,
    /// Wield a versatile weapon in both hands.
    pub two_handed: bool,
    pub power_attack: bool,
    /// Fixed d20 faces instead of rolling.
    pub forced_d20: Option<[u32; 2]>,
}

impl AttackRequest {
    pub fn new(weapon: impl Into<String>) -> Self {
        Self {
            weapon: weapon.into(),
            mode: Advantage::Normal,
            hand: Hand::Main,
            two_handed: false,
            power_attack: false,
            forced_d20: None,
        }
    }

    pub fn off_hand(weapon: impl Into<String>) -> Self {
        Self {
            hand: Hand::OffHand,
            ..Self::new(weapon)
        }
    }

    pub fn with_mode(mut self, mode: Advantage) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_two_hands(mut self, two_handed: bool) -> Self {
        self.two_handed = two_handed;
        self
    }

    pub fn with_power_attack(mut self, power_attack: bool) -> Self {
        self.power_attack = power_attack;
        self
    }

    pub fn with_forced_d20(mut self, first: u32, second: u32) -> Self {
        self.forced_d20 = Some([first, second]);
        self
    }
}

/// A damage roll that landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRoll {
    pub roll: RollResult,
    pub damage_type: DamageType,
    /// Never negative.
    pub total: i32,
}

/// The resolved attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub ok: bool,
    pub reason: Option<RejectReason>,
    pub weapon: String,
    pub ranged: bool,
    pub hit: bool,
    pub crit: bool,
    pub mode: Advantage,
    /// Both d20 faces drawn; empty when rejected.
    pub faces: Vec<u32>,
    pub chosen: Option<u32>,
    pub attack_bonus: i32,
    pub total: Option<i32>,
    pub effective_ac: i32,
    pub damage: Option<DamageRoll>,
    pub ammo_spent: bool,
    pub notes: Vec<String>,
}

impl AttackOutcome {
    fn rejected(weapon: &str, reason: RejectReason, target: &Target, notes: Vec<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
            weapon: weapon.to_string(),
            ranged: false,
            hit: false,
            crit: false,
            mode: Advantage::Normal,
            faces: Vec::new(),
            chosen: None,
            attack_bonus: 0,
            total: None,
            effective_ac: target.ac,
            damage: None,
            ammo_spent: false,
            notes,
        }
    }

    pub fn damage_total(&self) -> i32 {
        self.damage.as_ref().map(|d| d.total).unwrap_or(0)
    }
}

/// Advantage and disadvantage sources, collapsed at the end.
#[derive(Debug, Default)]
struct ModeSources {
    advantage: bool,
    disadvantage: bool,
}

impl ModeSources {
    fn from_base(mode: Advantage) -> Self {
        Self {
            advantage: mode == Advantage::Advantage,
            disadvantage: mode == Advantage::Disadvantage,
        }
    }

    fn add(&mut self, mode: Advantage, notes: &mut Vec<String>, why: impl Into<String>) {
        match mode {
            Advantage::Advantage => self.advantage = true,
            Advantage::Disadvantage => self.disadvantage = true,
            Advantage::Normal => return,
        }
        notes.push(format!("{}: {}", mode.name(), why.into()));
    }

    fn mode(&self) -> Advantage {
        Advantage::from_sources(self.advantage, self.disadvantage)
    }
}

/// Resolve one attack by `attacker` against `target`.
pub fn resolve_attack<W: WeaponLookup + ?Sized>(
    attacker: &mut Combatant,
    request: &AttackRequest,
    target: &Target,
    weapons: &W,
    roller: &mut Roller,
) -> Result<AttackOutcome, CombatError> {
    let weapon = weapons
        .weapon(&request.weapon)
        .ok_or_else(|| CombatError::UnknownWeapon(request.weapon.clone()))?;
    let traits = weapon.traits();
    let caps = &attacker.capabilities;
    let mut notes = Vec::new();

    // Loading
    if traits.loading && attacker.turn.fired_loading {
        if caps.has_feat(Feat::CrossbowExpert) {
            notes.push("Crossbow Expert ignores loading".to_string());
        } else {
            notes.push(format!("{} must be reloaded", weapon.name));
            return Ok(AttackOutcome::rejected(
                &weapon.name,
                RejectReason::LoadingAlreadyFired,
                target,
                notes,
            ));
        }
    }

    // Range and reach
    let reach = weapon.reach();
    let ranged =
        weapon.is_ranged() || (traits.thrown && target.distance.is_some_and(|d| d > reach));
    let adjacent = target.distance.map_or(!ranged, |d| d <= ADJACENT);
    let mut sources = ModeSources::from_base(request.mode);

    if let Some(distance) = target.distance {
        if ranged {
            let (normal, long) = traits.range.unwrap_or((reach, reach));
            if distance > long {
                notes.push(format!("{distance} ft is beyond long range {long} ft"));
                return Ok(AttackOutcome::rejected(
                    &weapon.name,
                    RejectReason::OutOfRange,
                    target,
                    notes,
                ));
            }
            if distance > normal {
                if caps.has_feat(Feat::Sharpshooter) {
                    notes.push("Sharpshooter: no long range penalty".to_string());
                } else {
                    sources.add(Advantage::Disadvantage, &mut notes, "long range");
                }
            }
        } else if distance > reach {
            notes.push(format!("{distance} ft is beyond {reach} ft reach"));
            return Ok(AttackOutcome::rejected(
                &weapon.name,
                RejectReason::OutOfReach,
                target,
                notes,
            ));
        }
    }

    if ranged && target.distance.is_some_and(|d| d <= ADJACENT) {
        if caps.has_feat(Feat::CrossbowExpert) {
            notes.push("Crossbow Expert: no point-blank penalty".to_string());
        } else {
            sources.add(Advantage::Disadvantage, &mut notes, "ranged attack in melee");
        }
    }

    // Conditions
    for condition in [
        Condition::Blinded,
        Condition::Frightened,
        Condition::Poisoned,
        Condition::Prone,
        Condition::Restrained,
    ] {
        if attacker.has_condition(condition) {
            sources.add(
                Advantage::Disadvantage,
                &mut notes,
                format!("attacker {}", condition.name().to_lowercase()),
            );
        }
    }
    if attacker.has_condition(Condition::Invisible) {
        sources.add(Advantage::Advantage, &mut notes, "attacker unseen");
    }
    if target.is_helpless() {
        sources.add(Advantage::Advantage, &mut notes, "target helpless");
    } else if [Condition::Restrained, Condition::Stunned, Condition::Blinded]
        .iter()
        .any(|c| target.has(*c))
    {
        sources.add(Advantage::Advantage, &mut notes, "target cannot defend itself");
    }
    if target.has(Condition::Prone) {
        if adjacent {
            sources.add(Advantage::Advantage, &mut notes, "prone target adjacent");
        } else {
            sources.add(Advantage::Disadvantage, &mut notes, "prone target at range");
        }
    }
    if target.has(Condition::Invisible) {
        sources.add(Advantage::Disadvantage, &mut notes, "target unseen");
    }
    if target.dodging && target.hp > 0 {
        sources.add(Advantage::Disadvantage, &mut notes, "target dodging");
    }
    let helped = attacker.turn.help_tokens.contains(&target.id);
    if helped {
        sources.add(Advantage::Advantage, &mut notes, "helped");
    }
    let mode = sources.mode();

    // Cover
    let mut effective_ac = target.ac;
    match target.cover.ac_bonus() {
        None => {
            notes.push(format!("{} has total cover", target.name));
            return Ok(AttackOutcome::rejected(
                &weapon.name,
                RejectReason::TotalCover,
                target,
                notes,
            ));
        }
        Some(0) => {}
        Some(bonus) if ranged && caps.has_feat(Feat::Sharpshooter) => {
            notes.push(format!("Sharpshooter ignores +{bonus} cover"));
        }
        Some(bonus) => effective_ac += bonus,
    }

    // Ammunition
    let ammunition = traits.ammunition.filter(|_| weapon.is_ranged());
    if let Some(kind) = ammunition {
        if caps.ammo_count(kind) == Some(0) {
            notes.push(format!("out of {}s", kind.name()));
            return Ok(AttackOutcome::rejected(
                &weapon.name,
                RejectReason::NoAmmunition,
                target,
                notes,
            ));
        }
    }

    // Attack bonus
    let str_mod = attacker.ability_mod(Ability::Strength) as i32;
    let dex_mod = attacker.ability_mod(Ability::Dexterity) as i32;
    let ability_mod = if weapon.is_ranged() {
        dex_mod
    } else if traits.finesse || traits.thrown {
        str_mod.max(dex_mod)
    } else {
        str_mod
    };
    let mut attack_bonus = ability_mod;
    if caps.is_proficient(weapon) {
        attack_bonus += caps.proficiency_bonus as i32;
    }
    if weapon.is_ranged() && caps.has_style(FightingStyle::Archery) {
        attack_bonus += 2;
        notes.push("Archery +2".to_string());
    }
    let power_attack = request.power_attack
        && if weapon.is_ranged() {
            caps.has_feat(Feat::Sharpshooter)
        } else {
            traits.heavy && caps.has_feat(Feat::GreatWeaponMaster)
        };
    if power_attack {
        attack_bonus -= POWER_ATTACK_PENALTY;
        notes.push("power attack -5/+10".to_string());
    } else if request.power_attack {
        notes.push("power attack not available with this weapon".to_string());
    }

    // Commit: the attempt is legal from here on
    if helped {
        attacker.consume_help(target.id);
    }
    let ammo_spent = match ammunition {
        Some(kind) => attacker.capabilities.spend_ammo(kind),
        None => false,
    };
    if traits.loading {
        attacker.turn.fired_loading = true;
    }

    let faces = request.forced_d20.unwrap_or_else(|| roller.d20_pair());
    let chosen = match mode {
        Advantage::Normal => faces[0],
        Advantage::Advantage => faces[0].max(faces[1]),
        Advantage::Disadvantage => faces[0].min(faces[1]),
    };
    let (hit, mut crit) = roll_outcome(chosen, attack_bonus, effective_ac);
    if hit && !crit && !ranged && adjacent && target.is_helpless() {
        crit = true;
        notes.push("automatic critical against a helpless target".to_string());
    }

    let damage = if hit {
        let mut die = weapon.damage;
        if request.two_handed {
            if let Some(versatile) = traits.versatile {
                die = versatile;
                notes.push(format!("two-handed {versatile}"));
            }
        }
        if crit {
            die = die.doubled();
        }

        let styles = &attacker.capabilities;
        let mut modifier = ability_mod;
        if request.hand == Hand::OffHand && !styles.has_style(FightingStyle::TwoWeaponFighting) {
            modifier = modifier.min(0);
        }
        let one_handed = !traits.two_handed && !request.two_handed;
        if !ranged
            && one_handed
            && request.hand == Hand::Main
            && attacker.off_hand.is_none()
            && styles.has_style(FightingStyle::Dueling)
        {
            modifier += 2;
            notes.push("Dueling +2".to_string());
        }
        if power_attack {
            modifier += POWER_ATTACK_BONUS;
        }

        let roll = roller.roll(&DiceExpression::new(die.count, die.sides, modifier));
        Some(DamageRoll {
            total: roll.total.max(0),
            damage_type: weapon.damage_type,
            roll,
        })
    } else {
        None
    };

    debug!(
        attacker = %attacker.name,
        target_name = %target.name,
        weapon = %weapon.name,
        chosen,
        attack_bonus,
        effective_ac,
        hit,
        crit,
        "Attack resolved"
    );

    Ok(AttackOutcome {
        ok: true,
        reason: None,
        weapon: weapon.name.clone(),
        ranged,
        hit,
        crit,
        mode,
        faces: faces.to_vec(),
        chosen: Some(chosen),
        attack_bonus,
        total: Some(chosen as i32 + attack_bonus),
        effective_ac,
        damage,
        ammo_spent,
        notes,
    })
}
