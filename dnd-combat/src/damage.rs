//! Damage types, defenses and applying damage to a combatant.
//!
//! Order is fixed: immunity, then resistance and vulnerability (floored once),
//! then temporary HP, then real HP. Dropping to 0 HP starts death saves and
//! ends concentration; staying conscious triggers a concentration check.

use crate::combatant::{Ability, Combatant, Feat};
use crate::concentration::ConcentrationCheck;
use crate::death::DeathSaveEvent;
use crate::dice::Roller;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Types of damage in D&D 5e.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Slashing,
    Piercing,
    Bludgeoning,
    Fire,
    Cold,
    Lightning,
    Thunder,
    Acid,
    Poison,
    Necrotic,
    Radiant,
    Force,
    Psychic,
}

impl DamageType {
    pub fn name(&self) -> &'static str {
        match self {
            DamageType::Slashing => "slashing",
            DamageType::Piercing => "piercing",
            DamageType::Bludgeoning => "bludgeoning",
            DamageType::Fire => "fire",
            DamageType::Cold => "cold",
            DamageType::Lightning => "lightning",
            DamageType::Thunder => "thunder",
            DamageType::Acid => "acid",
            DamageType::Poison => "poison",
            DamageType::Necrotic => "necrotic",
            DamageType::Radiant => "radiant",
            DamageType::Force => "force",
            DamageType::Psychic => "psychic",
        }
    }

    pub fn is_physical(&self) -> bool {
        matches!(
            self,
            DamageType::Slashing | DamageType::Piercing | DamageType::Bludgeoning
        )
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DamageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "slashing" => Ok(DamageType::Slashing),
            "piercing" => Ok(DamageType::Piercing),
            "bludgeoning" => Ok(DamageType::Bludgeoning),
            "fire" => Ok(DamageType::Fire),
            "cold" => Ok(DamageType::Cold),
            "lightning" => Ok(DamageType::Lightning),
            "thunder" => Ok(DamageType::Thunder),
            "acid" => Ok(DamageType::Acid),
            "poison" => Ok(DamageType::Poison),
            "necrotic" => Ok(DamageType::Necrotic),
            "radiant" => Ok(DamageType::Radiant),
            "force" => Ok(DamageType::Force),
            "psychic" => Ok(DamageType::Psychic),
            other => Err(format!("Unknown damage type: {other}")),
        }
    }
}

/// Resistances, vulnerabilities and immunities by damage type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defenses {
    pub resistances: BTreeSet<DamageType>,
    pub vulnerabilities: BTreeSet<DamageType>,
    pub immunities: BTreeSet<DamageType>,
}

impl Defenses {
    pub fn resist(mut self, damage_type: DamageType) -> Self {
        self.resistances.insert(damage_type);
        self
    }

    pub fn vulnerable(mut self, damage_type: DamageType) -> Self {
        self.vulnerabilities.insert(damage_type);
        self
    }

    pub fn immune(mut self, damage_type: DamageType) -> Self {
        self.immunities.insert(damage_type);
        self
    }
}

/// Damage left after defenses and temporary HP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseOutcome {
    /// Amount that reaches real HP.
    pub amount: i32,
    /// Amount after resistance/vulnerability, before temporary HP.
    pub after_modifiers: i32,
    pub temp_hp_spent: i32,
    pub notes: Vec<String>,
}

/// Run `raw` damage through the defender's defenses and temporary HP.
///
/// Spends the defender's temporary HP but does not touch real HP.
pub fn apply_defenses(
    raw: i32,
    damage_type: DamageType,
    defender: &mut Combatant,
) -> DefenseOutcome {
    let raw = raw.max(0);
    let mut notes = Vec::new();
    let defenses = &defender.defenses;

    let after_modifiers = if defenses.immunities.contains(&damage_type) {
        notes.push(format!("immune to {damage_type}"));
        0
    } else {
        let mut numerator = 1;
        let mut denominator = 1;
        if defenses.resistances.contains(&damage_type) {
            denominator *= 2;
            notes.push(format!("resistant to {damage_type}"));
        }
        if defenses.vulnerabilities.contains(&damage_type) {
            numerator *= 2;
            notes.push(format!("vulnerable to {damage_type}"));
        }
        (raw * numerator).div_euclid(denominator)
    };

    let temp_hp_spent = defender.temp_hp.min(after_modifiers);
    if temp_hp_spent > 0 {
        defender.temp_hp -= temp_hp_spent;
        notes.push(format!("{temp_hp_spent} absorbed by temporary HP"));
    }

    DefenseOutcome {
        amount: after_modifiers - temp_hp_spent,
        after_modifiers,
        temp_hp_spent,
        notes,
    }
}

/// Everything that happened when damage landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageReport {
    pub raw: i32,
    pub damage_type: DamageType,
    pub defense: DefenseOutcome,
    pub hp_before: i32,
    pub hp_after: i32,
    pub dropped_to_zero: bool,
    pub death_save: Option<DeathSaveEvent>,
    pub concentration: Option<ConcentrationCheck>,
}

/// Apply damage to a combatant, updating HP, death saves and concentration.
///
/// `melee_crit` marks a critical melee hit, which costs a combatant already
/// at 0 HP two death-save failures instead of one.
pub fn apply_damage(
    defender: &mut Combatant,
    raw: i32,
    damage_type: DamageType,
    melee_crit: bool,
    roller: &mut Roller,
) -> DamageReport {
    let hp_before = defender.hp;
    let defense = apply_defenses(raw, damage_type, defender);

    let mut dropped_to_zero = false;
    let mut death_save = None;
    let mut concentration = None;

    if hp_before <= 0 {
        if defense.amount > 0 || defense.temp_hp_spent > 0 {
            death_save = Some(defender.death.damaged_at_zero(melee_crit));
        }
    } else {
        defender.hp = (defender.hp - defense.amount).max(0);
        if defender.hp == 0 {
            dropped_to_zero = true;
            defender.death.fall_unconscious();
            concentration = defender.concentration.on_unconscious();
        } else {
            let save_bonus = defender.save_bonus(Ability::Constitution);
            let advantage = defender.capabilities.has_feat(Feat::WarCaster);
            concentration = defender.concentration.on_damage(
                defense.after_modifiers,
                save_bonus,
                advantage,
                roller,
            );
        }
    }

    debug!(
        target_name = %defender.name,
        raw,
        damage_type = %damage_type,
        taken = defense.amount,
        hp = defender.hp,
        "Damage applied"
    );

    DamageReport {
        raw,
        damage_type,
        defense,
        hp_before,
        hp_after: defender.hp,
        dropped_to_zero,
        death_save,
        concentration,
    }
}
