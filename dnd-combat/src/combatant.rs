//! Combatants and the arena that owns them.
//!
//! Contains ability scores, conditions, capabilities (proficiencies, feats,
//! fighting styles, ammunition) and per-turn tactical state. Every relation
//! between combatants (grapples, help tokens, readied attacks) is a
//! [`CombatantId`] into the [`Arena`], never a reference.

use crate::concentration::Concentration;
use crate::damage::Defenses;
use crate::death::DeathState;
use crate::dice::{DiceExpression, Roller};
use crate::error::CombatError;
use crate::items::{armor_class, AmmoKind, ArmorLookup, WeaponCategory, WeaponProfile};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ID Types
// ============================================================================

/// Index of a combatant in its [`Arena`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct CombatantId(pub usize);

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Ability Scores
// ============================================================================

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

impl FromStr for Ability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "str" | "strength" => Ok(Ability::Strength),
            "dex" | "dexterity" => Ok(Ability::Dexterity),
            "con" | "constitution" => Ok(Ability::Constitution),
            "int" | "intelligence" => Ok(Ability::Intelligence),
            "wis" | "wisdom" => Ok(Ability::Wisdom),
            "cha" | "charisma" => Ok(Ability::Charisma),
            other => Err(format!("Unknown ability: {other}")),
        }
    }
}

/// Ability scores container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl AbilityScores {
    pub fn new(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    pub fn get(&self, ability: Ability) -> u8 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i8 {
        // Floor division: 8-9 = -1, 10-11 = 0, 12-13 = +1. Any u8 score
        // lands in -5..=122.
        (i16::from(self.get(ability)) - 10).div_euclid(2) as i8
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

// ============================================================================
// Conditions and Cover
// ============================================================================

/// D&D 5e conditions that matter in a fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Blinded,
    Frightened,
    Grappled,
    Incapacitated,
    Invisible,
    Paralyzed,
    Poisoned,
    Prone,
    Restrained,
    Stunned,
    Unconscious,
}

impl Condition {
    pub fn name(&self) -> &'static str {
        match self {
            Condition::Blinded => "Blinded",
            Condition::Frightened => "Frightened",
            Condition::Grappled => "Grappled",
            Condition::Incapacitated => "Incapacitated",
            Condition::Invisible => "Invisible",
            Condition::Paralyzed => "Paralyzed",
            Condition::Poisoned => "Poisoned",
            Condition::Prone => "Prone",
            Condition::Restrained => "Restrained",
            Condition::Stunned => "Stunned",
            Condition::Unconscious => "Unconscious",
        }
    }

    pub fn is_incapacitating(&self) -> bool {
        matches!(
            self,
            Condition::Incapacitated
                | Condition::Paralyzed
                | Condition::Stunned
                | Condition::Unconscious
        )
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cover {
    #[default]
    None,
    Half,
    ThreeQuarters,
    Total,
}

impl Cover {
    /// AC bonus; total cover cannot be attacked at all.
    pub fn ac_bonus(&self) -> Option<i32> {
        match self {
            Cover::None => Some(0),
            Cover::Half => Some(2),
            Cover::ThreeQuarters => Some(5),
            Cover::Total => None,
        }
    }
}

// ============================================================================
// Capabilities
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feat {
    /// Long range without disadvantage, ignores partial cover, ranged
    /// power attack.
    Sharpshooter,
    /// Heavy melee power attack.
    GreatWeaponMaster,
    /// Ignores loading and point-blank disadvantage.
    CrossbowExpert,
    /// Advantage on concentration saves.
    WarCaster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FightingStyle {
    Archery,
    Defense,
    Dueling,
    TwoWeaponFighting,
}

/// What an attacker can bring to bear, with explicit defaults for anything
/// a stat block leaves out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub proficiency_bonus: i8,
    pub weapon_categories: BTreeSet<WeaponCategory>,
    /// Individual weapons, lowercase.
    pub weapon_names: BTreeSet<String>,
    pub save_proficiencies: BTreeSet<Ability>,
    pub fighting_styles: BTreeSet<FightingStyle>,
    pub feats: BTreeSet<Feat>,
    /// Kinds missing from the map are not tracked.
    pub ammunition: BTreeMap<AmmoKind, u32>,
    pub extra_attacks: u8,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            proficiency_bonus: 2,
            weapon_categories: BTreeSet::from([WeaponCategory::Simple]),
            weapon_names: BTreeSet::new(),
            save_proficiencies: BTreeSet::new(),
            fighting_styles: BTreeSet::new(),
            feats: BTreeSet::new(),
            ammunition: BTreeMap::new(),
            extra_attacks: 0,
        }
    }
}

impl Capabilities {
    pub fn is_proficient(&self, weapon: &WeaponProfile) -> bool {
        self.weapon_categories.contains(&weapon.category)
            || self.weapon_names.contains(&weapon.name.to_lowercase())
    }

    pub fn has_feat(&self, feat: Feat) -> bool {
        self.feats.contains(&feat)
    }

    pub fn has_style(&self, style: FightingStyle) -> bool {
        self.fighting_styles.contains(&style)
    }

    /// Remaining ammunition, or `None` if the kind is not tracked.
    pub fn ammo_count(&self, kind: AmmoKind) -> Option<u32> {
        self.ammunition.get(&kind).copied()
    }

    /// Spend one piece of ammunition. Untracked kinds always succeed.
    pub fn spend_ammo(&mut self, kind: AmmoKind) -> bool {
        match self.ammunition.get_mut(&kind) {
            None => true,
            Some(0) => false,
            Some(count) => {
                *count -= 1;
                true
            }
        }
    }
}

// ============================================================================
// Hit Dice and Turn State
// ============================================================================

/// Hit dice pool of a single die size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitDice {
    pub faces: u32,
    pub total: u32,
    pub remaining: u32,
}

impl HitDice {
    pub fn new(faces: u32, total: u32) -> Self {
        Self {
            faces,
            total,
            remaining: total,
        }
    }

    pub fn spend(&mut self) -> bool {
        if self.remaining > 0 {
            self.remaining -= 1;
            true
        } else {
            false
        }
    }
}

impl Default for HitDice {
    fn default() -> Self {
        Self::new(8, 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyTrigger {
    /// The target moves into the holder's reach.
    EntersReach,
}

/// An attack held until its trigger happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadiedAction {
    pub target_id: CombatantId,
    pub trigger: ReadyTrigger,
}

/// How a combatant behaves when no enemy is in reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    /// Close in (melee) or keep a stand-off distance (ranged).
    #[default]
    Advance,
    /// Stay put and ready an attack for whoever comes close.
    Hold,
}

/// Tactical flags that live for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnFlags {
    pub dodging: bool,
    pub reaction_available: bool,
    pub fired_loading: bool,
    /// Targets this combatant has been helped against.
    pub help_tokens: BTreeSet<CombatantId>,
    pub readied: Option<ReadiedAction>,
}

impl Default for TurnFlags {
    fn default() -> Self {
        Self {
            dodging: false,
            reaction_available: true,
            fired_loading: false,
            help_tokens: BTreeSet::new(),
            readied: None,
        }
    }
}

// ============================================================================
// Combatant
// ============================================================================

/// A creature taking part in an encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub team: String,
    pub hp: i32,
    pub max_hp: i32,
    pub temp_hp: i32,
    pub armor_class: i32,
    pub abilities: AbilityScores,
    pub capabilities: Capabilities,
    pub weapon: String,
    pub off_hand: Option<String>,
    pub speed: u32,
    pub hit_dice: HitDice,
    pub conditions: BTreeSet<Condition>,
    pub defenses: Defenses,
    pub concentration: Concentration,
    pub death: DeathState,
    pub turn: TurnFlags,
    pub grappled_by: Option<CombatantId>,
    /// Feet behind this side's front line when the fight starts.
    pub front_distance: u32,
    /// Coordinate on the shared battle line.
    pub position: i32,
    pub cover: Cover,
    pub potions: u32,
    pub power_attack: bool,
    pub stance: Stance,
}

impl Combatant {
    pub fn new(name: impl Into<String>, team: impl Into<String>, max_hp: i32) -> Self {
        let max_hp = max_hp.max(1);
        Self {
            id: CombatantId::default(),
            name: name.into(),
            team: team.into(),
            hp: max_hp,
            max_hp,
            temp_hp: 0,
            armor_class: 10,
            abilities: AbilityScores::default(),
            capabilities: Capabilities::default(),
            weapon: "Club".to_string(),
            off_hand: None,
            speed: 30,
            hit_dice: HitDice::default(),
            conditions: BTreeSet::new(),
            defenses: Defenses::default(),
            concentration: Concentration::default(),
            death: DeathState::Stable,
            turn: TurnFlags::default(),
            grappled_by: None,
            front_distance: 0,
            position: 0,
            cover: Cover::None,
            potions: 0,
            power_attack: false,
            stance: Stance::Advance,
        }
    }

    pub fn with_abilities(mut self, abilities: AbilityScores) -> Self {
        self.abilities = abilities;
        self
    }

    pub fn with_armor_class(mut self, armor_class: i32) -> Self {
        self.armor_class = armor_class;
        self
    }

    /// Derive AC from worn armor looked up by name.
    pub fn with_armor(
        mut self,
        armory: &(impl ArmorLookup + ?Sized),
        name: &str,
        shield: bool,
    ) -> Result<Self, CombatError> {
        let armor = armory
            .armor(name)
            .ok_or_else(|| CombatError::UnknownArmor(name.to_string()))?;
        let defense = self.capabilities.has_style(FightingStyle::Defense);
        self.armor_class = armor_class(
            Some(armor),
            self.ability_mod(Ability::Dexterity),
            shield,
            defense,
        );
        Ok(self)
    }

    pub fn with_weapon(mut self, weapon: impl Into<String>) -> Self {
        self.weapon = weapon.into();
        self
    }

    pub fn with_off_hand(mut self, weapon: impl Into<String>) -> Self {
        self.off_hand = Some(weapon.into());
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_feat(mut self, feat: Feat) -> Self {
        self.capabilities.feats.insert(feat);
        self
    }

    pub fn with_style(mut self, style: FightingStyle) -> Self {
        self.capabilities.fighting_styles.insert(style);
        self
    }

    pub fn with_martial_training(mut self) -> Self {
        self.capabilities
            .weapon_categories
            .extend([WeaponCategory::Simple, WeaponCategory::Martial]);
        self
    }

    pub fn with_extra_attacks(mut self, extra: u8) -> Self {
        self.capabilities.extra_attacks = extra;
        self
    }

    pub fn with_ammunition(mut self, kind: AmmoKind, count: u32) -> Self {
        self.capabilities.ammunition.insert(kind, count);
        self
    }

    pub fn with_defenses(mut self, defenses: Defenses) -> Self {
        self.defenses = defenses;
        self
    }

    pub fn with_speed(mut self, speed: u32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_potions(mut self, potions: u32) -> Self {
        self.potions = potions;
        self
    }

    pub fn with_temp_hp(mut self, temp_hp: i32) -> Self {
        self.temp_hp = temp_hp.max(0);
        self
    }

    pub fn with_hit_dice(mut self, hit_dice: HitDice) -> Self {
        self.hit_dice = hit_dice;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.insert(condition);
        self
    }

    pub fn with_front_distance(mut self, feet: u32) -> Self {
        self.front_distance = feet;
        self
    }

    pub fn with_cover(mut self, cover: Cover) -> Self {
        self.cover = cover;
        self
    }

    pub fn with_power_attack(mut self, enabled: bool) -> Self {
        self.power_attack = enabled;
        self
    }

    pub fn with_stance(mut self, stance: Stance) -> Self {
        self.stance = stance;
        self
    }

    pub fn ability_mod(&self, ability: Ability) -> i8 {
        self.abilities.modifier(ability)
    }

    pub fn save_bonus(&self, ability: Ability) -> i32 {
        let base = self.ability_mod(ability) as i32;
        if self.capabilities.save_proficiencies.contains(&ability) {
            base + self.capabilities.proficiency_bonus as i32
        } else {
            base
        }
    }

    pub fn initiative_modifier(&self) -> i32 {
        self.ability_mod(Ability::Dexterity) as i32
    }

    pub fn is_dead(&self) -> bool {
        self.death.is_dead()
    }

    /// At 0 HP, whether dying, stable or dead.
    pub fn is_down(&self) -> bool {
        self.hp <= 0
    }

    pub fn is_conscious(&self) -> bool {
        self.hp > 0
            && !self
                .conditions
                .iter()
                .any(|condition| condition.is_incapacitating())
    }

    pub fn has_condition(&self, condition: Condition) -> bool {
        self.conditions.contains(&condition)
    }

    pub fn add_condition(&mut self, condition: Condition) -> bool {
        self.conditions.insert(condition)
    }

    pub fn remove_condition(&mut self, condition: Condition) -> bool {
        self.conditions.remove(&condition)
    }

    /// Walking speed this turn; grappled and restrained creatures cannot move.
    pub fn current_speed(&self) -> u32 {
        if self.grappled_by.is_some()
            || self.has_condition(Condition::Grappled)
            || self.has_condition(Condition::Restrained)
        {
            0
        } else {
            self.speed
        }
    }

    pub fn hp_fraction(&self) -> f32 {
        (self.hp as f32 / self.max_hp as f32).max(0.0)
    }

    /// Reset the per-turn flags at the start of this combatant's turn.
    pub fn begin_turn(&mut self) {
        self.turn.dodging = false;
        self.turn.reaction_available = true;
        self.turn.fired_loading = false;
        self.turn.readied = None;
    }

    /// Take the Dodge action until the start of the next turn.
    pub fn dodge(&mut self) {
        self.turn.dodging = true;
    }

    /// Receive the Help action against `target`.
    pub fn grant_help(&mut self, target: CombatantId) {
        self.turn.help_tokens.insert(target);
    }

    /// Spend the help token held against `target`, if any.
    pub fn consume_help(&mut self, target: CombatantId) -> bool {
        self.turn.help_tokens.remove(&target)
    }

    pub fn ready_attack(&mut self, target: CombatantId) {
        self.turn.readied = Some(ReadiedAction {
            target_id: target,
            trigger: ReadyTrigger::EntersReach,
        });
    }

    /// Restore hit points. Healing from 0 HP resets death saves.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if amount <= 0 || self.is_dead() {
            return 0;
        }
        let before = self.hp.max(0);
        self.hp = (before + amount).min(self.max_hp);
        if before == 0 && self.hp > 0 {
            self.death.revive();
        }
        self.hp - before
    }

    pub fn add_temp_hp(&mut self, amount: i32) {
        self.temp_hp = self.temp_hp.max(amount);
    }

    /// Spend one hit die: roll it, add CON (minimum 0 total) and heal.
    ///
    /// Returns the HP regained, or `None` with no dice left.
    pub fn spend_hit_die(&mut self, roller: &mut Roller) -> Option<i32> {
        if self.is_dead() || !self.hit_dice.spend() {
            return None;
        }
        let con = self.ability_mod(Ability::Constitution) as i32;
        let roll = roller.roll(&DiceExpression::new(1, self.hit_dice.faces, con));
        Some(self.heal(roll.total.max(0)))
    }
}

// ============================================================================
// Arena
// ============================================================================

/// Owns every combatant of an encounter, addressed by [`CombatantId`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    combatants: Vec<Combatant>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a combatant and assign its id.
    pub fn add(&mut self, mut combatant: Combatant) -> CombatantId {
        let id = CombatantId(self.combatants.len());
        combatant.id = id;
        self.combatants.push(combatant);
        id
    }

    pub fn get(&self, id: CombatantId) -> Result<&Combatant, CombatError> {
        self.combatants
            .get(id.0)
            .ok_or(CombatError::UnknownCombatant(id))
    }

    pub fn get_mut(&mut self, id: CombatantId) -> Result<&mut Combatant, CombatError> {
        self.combatants
            .get_mut(id.0)
            .ok_or(CombatError::UnknownCombatant(id))
    }

    /// Borrow two different combatants mutably at once.
    pub fn pair_mut(
        &mut self,
        a: CombatantId,
        b: CombatantId,
    ) -> Result<(&mut Combatant, &mut Combatant), CombatError> {
        let len = self.combatants.len();
        if a.0 >= len {
            return Err(CombatError::UnknownCombatant(a));
        }
        if b.0 >= len || a == b {
            return Err(CombatError::UnknownCombatant(b));
        }
        if a.0 < b.0 {
            let (left, right) = self.combatants.split_at_mut(b.0);
            Ok((&mut left[a.0], &mut right[0]))
        } else {
            let (left, right) = self.combatants.split_at_mut(a.0);
            Ok((&mut right[0], &mut left[b.0]))
        }
    }

    pub fn ids(&self) -> Vec<CombatantId> {
        self.combatants.iter().map(|c| c.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.iter()
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.name == name)
    }

    /// Enemies of `id` that are not dead.
    pub fn living_enemies(&self, id: CombatantId) -> Result<Vec<CombatantId>, CombatError> {
        let team = &self.get(id)?.team;
        Ok(self
            .combatants
            .iter()
            .filter(|c| &c.team != team && !c.is_dead())
            .map(|c| c.id)
            .collect())
    }

    /// Teams with at least one member not dead.
    pub fn teams_standing(&self) -> BTreeSet<String> {
        self.combatants
            .iter()
            .filter(|c| !c.is_dead())
            .map(|c| c.team.clone())
            .collect()
    }

    /// Feet between two combatants on the battle line.
    pub fn distance(&self, a: CombatantId, b: CombatantId) -> Result<u32, CombatError> {
        let a = self.get(a)?;
        let b = self.get(b)?;
        Ok((a.position - b.position).unsigned_abs())
    }

    pub fn into_combatants(self) -> Vec<Combatant> {
        self.combatants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::Armory;

    #[test]
    fn test_ability_modifier() {
        let scores = AbilityScores::new(18, 9, 10, 11, 1, 20);
        assert_eq!(scores.modifier(Ability::Strength), 4);
        assert_eq!(scores.modifier(Ability::Dexterity), -1);
        assert_eq!(scores.modifier(Ability::Constitution), 0);
        assert_eq!(scores.modifier(Ability::Intelligence), 0);
        assert_eq!(scores.modifier(Ability::Wisdom), -5);
        assert_eq!(scores.modifier(Ability::Charisma), 5);
    }

    #[test]
    fn test_ability_modifier_for_huge_scores() {
        let scores = AbilityScores::new(128, 137, 255, 0, 30, 127);
        assert_eq!(scores.modifier(Ability::Strength), 59);
        assert_eq!(scores.modifier(Ability::Dexterity), 63);
        assert_eq!(scores.modifier(Ability::Constitution), 122);
        assert_eq!(scores.modifier(Ability::Intelligence), -5);
        assert_eq!(scores.modifier(Ability::Wisdom), 10);
        assert_eq!(scores.modifier(Ability::Charisma), 58);
    }

    #[test]
    fn test_ability_from_str() {
        assert_eq!("dex".parse::<Ability>(), Ok(Ability::Dexterity));
        assert_eq!("Strength".parse::<Ability>(), Ok(Ability::Strength));
        assert!("luck".parse::<Ability>().is_err());
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut fighter = Combatant::new("Fighter", "party", 20);
        fighter.hp = 15;
        assert_eq!(fighter.heal(10), 5);
        assert_eq!(fighter.hp, 20);
    }

    #[test]
    fn test_heal_from_zero_resets_death_saves() {
        let mut fighter = Combatant::new("Fighter", "party", 20);
        fighter.hp = 0;
        fighter.death = DeathState::Dying {
            successes: 1,
            failures: 2,
        };
        assert_eq!(fighter.heal(4), 4);
        assert_eq!(fighter.hp, 4);
        assert_eq!(fighter.death, DeathState::Stable);
    }

    #[test]
    fn test_dead_cannot_be_healed() {
        let mut fighter = Combatant::new("Fighter", "party", 20);
        fighter.hp = 0;
        fighter.death = DeathState::Dead;
        assert_eq!(fighter.heal(10), 0);
        assert_eq!(fighter.hp, 0);
    }

    #[test]
    fn test_spend_hit_die() {
        let mut roller = Roller::new(11);
        let mut fighter = Combatant::new("Fighter", "party", 30)
            .with_abilities(AbilityScores::new(10, 10, 14, 10, 10, 10))
            .with_hit_dice(HitDice::new(10, 2));
        fighter.hp = 5;

        let healed = fighter.spend_hit_die(&mut roller).unwrap();
        assert!((3..=12).contains(&healed));
        assert_eq!(fighter.hp, 5 + healed);
        assert!(fighter.spend_hit_die(&mut roller).is_some());
        assert!(fighter.spend_hit_die(&mut roller).is_none());
        assert_eq!(fighter.hit_dice.remaining, 0);
    }

    #[test]
    fn test_ammunition() {
        let mut caps = Capabilities::default();
        assert!(caps.spend_ammo(AmmoKind::Arrow));
        caps.ammunition.insert(AmmoKind::Bolt, 1);
        assert!(caps.spend_ammo(AmmoKind::Bolt));
        assert!(!caps.spend_ammo(AmmoKind::Bolt));
        assert_eq!(caps.ammo_count(AmmoKind::Bolt), Some(0));
        assert_eq!(caps.ammo_count(AmmoKind::Arrow), None);
    }

    #[test]
    fn test_proficiency() {
        let armory = Armory::standard();
        let club = crate::items::WeaponLookup::weapon(&armory, "Club").unwrap();
        let rapier = crate::items::WeaponLookup::weapon(&armory, "Rapier").unwrap();

        let commoner = Combatant::new("Commoner", "town", 4);
        assert!(commoner.capabilities.is_proficient(club));
        assert!(!commoner.capabilities.is_proficient(rapier));

        let mut duelist = Combatant::new("Duelist", "town", 4);
        duelist.capabilities.weapon_names.insert("rapier".to_string());
        assert!(duelist.capabilities.is_proficient(rapier));
    }

    #[test]
    fn test_with_armor() {
        let armory = Armory::standard();
        let knight = Combatant::new("Knight", "party", 20)
            .with_abilities(AbilityScores::new(16, 14, 14, 10, 10, 10))
            .with_style(FightingStyle::Defense)
            .with_armor(&armory, "Chain Mail", true)
            .unwrap();
        assert_eq!(knight.armor_class, 19);

        let err = Combatant::new("Knight", "party", 20)
            .with_armor(&armory, "Cardboard", false)
            .unwrap_err();
        assert_eq!(err, CombatError::UnknownArmor("Cardboard".to_string()));
    }

    #[test]
    fn test_grappled_cannot_move() {
        let mut fighter = Combatant::new("Fighter", "party", 20);
        assert_eq!(fighter.current_speed(), 30);
        fighter.grappled_by = Some(CombatantId(3));
        assert_eq!(fighter.current_speed(), 0);
    }

    #[test]
    fn test_turn_flags_reset() {
        let mut fighter = Combatant::new("Fighter", "party", 20);
        fighter.dodge();
        fighter.turn.reaction_available = false;
        fighter.turn.fired_loading = true;
        fighter.ready_attack(CombatantId(1));
        fighter.grant_help(CombatantId(1));

        fighter.begin_turn();
        assert!(!fighter.turn.dodging);
        assert!(fighter.turn.reaction_available);
        assert!(!fighter.turn.fired_loading);
        assert!(fighter.turn.readied.is_none());
        // Help lasts until used.
        assert!(fighter.consume_help(CombatantId(1)));
        assert!(!fighter.consume_help(CombatantId(1)));
    }

    #[test]
    fn test_arena_pair_mut() {
        let mut arena = Arena::new();
        let a = arena.add(Combatant::new("A", "red", 10));
        let b = arena.add(Combatant::new("B", "blue", 10));
        assert_eq!(a, CombatantId(0));

        {
            let (second, first) = arena.pair_mut(b, a).unwrap();
            second.hp = 3;
            first.hp = 7;
        }
        assert_eq!(arena.get(a).unwrap().hp, 7);
        assert_eq!(arena.get(b).unwrap().hp, 3);
        assert!(arena.pair_mut(a, a).is_err());
        assert_eq!(
            arena.get(CombatantId(9)).unwrap_err(),
            CombatError::UnknownCombatant(CombatantId(9))
        );
    }

    #[test]
    fn test_living_enemies_and_teams() {
        let mut arena = Arena::new();
        let a = arena.add(Combatant::new("A", "red", 10));
        let b = arena.add(Combatant::new("B", "blue", 10));
        let c = arena.add(Combatant::new("C", "blue", 10));
        arena.get_mut(c).unwrap().death = DeathState::Dead;

        assert_eq!(arena.living_enemies(a).unwrap(), vec![b]);
        assert_eq!(arena.teams_standing().len(), 2);
        arena.get_mut(b).unwrap().death = DeathState::Dead;
        assert_eq!(
            arena.teams_standing(),
            BTreeSet::from(["red".to_string()])
        );
    }
}
