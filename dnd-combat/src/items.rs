//! Weapon and armor profiles plus the standard SRD armory.
//!
//! Profiles are read-only during an encounter. Callers load them once (from
//! the built-in tables or their own data files) and share the lookup by
//! reference across every attack.

use crate::damage::DamageType;
use crate::dice::DiceExpression;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Looks up weapon profiles by name.
pub trait WeaponLookup {
    fn weapon(&self, name: &str) -> Option<&WeaponProfile>;
}

/// Looks up armor profiles by name.
pub trait ArmorLookup {
    fn armor(&self, name: &str) -> Option<&ArmorProfile>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponCategory {
    Simple,
    Martial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    Melee,
    Ranged,
}

/// Ammunition tracked per kind on each combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmmoKind {
    Arrow,
    Bolt,
    Needle,
    SlingBullet,
}

impl AmmoKind {
    pub fn name(&self) -> &'static str {
        match self {
            AmmoKind::Arrow => "arrow",
            AmmoKind::Bolt => "bolt",
            AmmoKind::Needle => "needle",
            AmmoKind::SlingBullet => "sling bullet",
        }
    }
}

/// Weapon properties per D&D 5e, parsed once from their string tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponProperty {
    Finesse,
    Light,
    Heavy,
    TwoHanded,
    Versatile(DiceExpression),
    Thrown,
    Ammunition(AmmoKind),
    Loading,
    Reach,
    Range { normal: u32, long: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown weapon property: {0}")]
pub struct UnknownProperty(pub String);

impl FromStr for WeaponProperty {
    type Err = UnknownProperty;

    /// Parse tags such as `finesse`, `versatile:1d10`, `range:20/60` or
    /// `ammunition:arrow`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownProperty(s.to_string());
        let tag = s.trim().to_lowercase();
        let (name, arg) = match tag.split_once(':') {
            Some((name, arg)) => (name.trim().to_string(), Some(arg.trim().to_string())),
            None => (tag.clone(), None),
        };

        match (name.as_str(), arg) {
            ("finesse", None) => Ok(WeaponProperty::Finesse),
            ("light", None) => Ok(WeaponProperty::Light),
            ("heavy", None) => Ok(WeaponProperty::Heavy),
            ("two-handed" | "two_handed" | "twohanded", None) => Ok(WeaponProperty::TwoHanded),
            ("thrown", None) => Ok(WeaponProperty::Thrown),
            ("loading", None) => Ok(WeaponProperty::Loading),
            ("reach", None) => Ok(WeaponProperty::Reach),
            ("versatile", Some(die)) => DiceExpression::parse(&die)
                .map(WeaponProperty::Versatile)
                .map_err(|_| unknown()),
            ("range", Some(pair)) => {
                let (normal, long) = pair.split_once('/').ok_or_else(unknown)?;
                let normal: u32 = normal.trim().parse().map_err(|_| unknown())?;
                let long: u32 = long.trim().parse().map_err(|_| unknown())?;
                if long < normal {
                    return Err(unknown());
                }
                Ok(WeaponProperty::Range { normal, long })
            }
            ("ammunition", Some(kind)) => match kind.as_str() {
                "arrow" | "arrows" => Ok(WeaponProperty::Ammunition(AmmoKind::Arrow)),
                "bolt" | "bolts" => Ok(WeaponProperty::Ammunition(AmmoKind::Bolt)),
                "needle" | "needles" => Ok(WeaponProperty::Ammunition(AmmoKind::Needle)),
                "bullet" | "bullets" | "sling bullet" | "sling bullets" => {
                    Ok(WeaponProperty::Ammunition(AmmoKind::SlingBullet))
                }
                _ => Err(unknown()),
            },
            _ => Err(unknown()),
        }
    }
}

/// Property flags of a weapon folded into one value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeaponTraits {
    pub finesse: bool,
    pub light: bool,
    pub heavy: bool,
    pub two_handed: bool,
    pub thrown: bool,
    pub loading: bool,
    pub reach: bool,
    pub versatile: Option<DiceExpression>,
    pub ammunition: Option<AmmoKind>,
    pub range: Option<(u32, u32)>,
}

/// A weapon as the rules engine sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    pub name: String,
    pub category: WeaponCategory,
    pub kind: WeaponKind,
    pub damage: DiceExpression,
    pub damage_type: DamageType,
    pub properties: Vec<WeaponProperty>,
}

impl WeaponProfile {
    pub fn new(
        name: impl Into<String>,
        category: WeaponCategory,
        kind: WeaponKind,
        damage: DiceExpression,
        damage_type: DamageType,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            kind,
            damage,
            damage_type,
            properties: Vec::new(),
        }
    }

    pub fn with_properties(mut self, properties: Vec<WeaponProperty>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_range(mut self, normal: u32, long: u32) -> Self {
        self.properties.push(WeaponProperty::Range { normal, long });
        self
    }

    pub fn traits(&self) -> WeaponTraits {
        let mut traits = WeaponTraits::default();
        for property in &self.properties {
            match *property {
                WeaponProperty::Finesse => traits.finesse = true,
                WeaponProperty::Light => traits.light = true,
                WeaponProperty::Heavy => traits.heavy = true,
                WeaponProperty::TwoHanded => traits.two_handed = true,
                WeaponProperty::Versatile(die) => traits.versatile = Some(die),
                WeaponProperty::Thrown => traits.thrown = true,
                WeaponProperty::Ammunition(kind) => traits.ammunition = Some(kind),
                WeaponProperty::Loading => traits.loading = true,
                WeaponProperty::Reach => traits.reach = true,
                WeaponProperty::Range { normal, long } => traits.range = Some((normal, long)),
            }
        }
        traits
    }

    pub fn is_ranged(&self) -> bool {
        self.kind == WeaponKind::Ranged
    }

    /// Melee engagement distance in feet.
    pub fn reach(&self) -> u32 {
        if self.traits().reach {
            10
        } else {
            5
        }
    }
}

impl fmt::Display for WeaponProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.name, self.damage, self.damage_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorType {
    Light,
    Medium,
    Heavy,
}

/// Armor with D&D 5e properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmorProfile {
    pub name: String,
    pub armor_type: ArmorType,
    pub base_ac: u8,
    /// Largest DEX bonus the armor allows; `None` means uncapped.
    pub dex_cap: Option<i8>,
    pub stealth_disadvantage: bool,
}

impl ArmorProfile {
    pub fn new(name: impl Into<String>, armor_type: ArmorType, base_ac: u8) -> Self {
        let dex_cap = match armor_type {
            ArmorType::Light => None,
            ArmorType::Medium => Some(2),
            ArmorType::Heavy => Some(0),
        };
        Self {
            name: name.into(),
            armor_type,
            base_ac,
            dex_cap,
            stealth_disadvantage: false,
        }
    }

    pub fn with_stealth_disadvantage(mut self) -> Self {
        self.stealth_disadvantage = true;
        self
    }
}

/// Armor class from worn armor (or none), DEX, a shield and the Defense
/// fighting style.
pub fn armor_class(
    armor: Option<&ArmorProfile>,
    dex_mod: i8,
    shield: bool,
    defense_style: bool,
) -> i32 {
    let shield_bonus = if shield { 2 } else { 0 };
    let base = match armor {
        None => 10 + dex_mod as i32,
        Some(armor) => {
            let dex = match armor.dex_cap {
                Some(cap) => dex_mod.min(cap),
                None => dex_mod,
            };
            let style = if defense_style { 1 } else { 0 };
            armor.base_ac as i32 + dex as i32 + style
        }
    };
    base + shield_bonus
}

/// A weapon and armor table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Armory {
    pub weapons: Vec<WeaponProfile>,
    pub armor: Vec<ArmorProfile>,
}

impl Armory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The SRD weapon and armor tables.
    pub fn standard() -> Self {
        Self {
            weapons: WEAPONS.clone(),
            armor: ARMORS.clone(),
        }
    }

    /// Add or replace a weapon.
    pub fn with_weapon(mut self, weapon: WeaponProfile) -> Self {
        self.weapons
            .retain(|w| !w.name.eq_ignore_ascii_case(&weapon.name));
        self.weapons.push(weapon);
        self
    }

    pub fn with_armor(mut self, armor: ArmorProfile) -> Self {
        self.armor.retain(|a| !a.name.eq_ignore_ascii_case(&armor.name));
        self.armor.push(armor);
        self
    }
}

impl WeaponLookup for Armory {
    fn weapon(&self, name: &str) -> Option<&WeaponProfile> {
        self.weapons
            .iter()
            .find(|w| w.name.eq_ignore_ascii_case(name.trim()))
    }
}

impl ArmorLookup for Armory {
    fn armor(&self, name: &str) -> Option<&ArmorProfile> {
        self.armor
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name.trim()))
    }
}

fn simple_melee(name: &str, count: u32, sides: u32, damage_type: DamageType) -> WeaponProfile {
    WeaponProfile::new(
        name,
        WeaponCategory::Simple,
        WeaponKind::Melee,
        DiceExpression::new(count, sides, 0),
        damage_type,
    )
}

fn martial_melee(name: &str, count: u32, sides: u32, damage_type: DamageType) -> WeaponProfile {
    WeaponProfile::new(
        name,
        WeaponCategory::Martial,
        WeaponKind::Melee,
        DiceExpression::new(count, sides, 0),
        damage_type,
    )
}

fn ranged(
    name: &str,
    category: WeaponCategory,
    sides: u32,
    damage_type: DamageType,
) -> WeaponProfile {
    WeaponProfile::new(
        name,
        category,
        WeaponKind::Ranged,
        DiceExpression::new(1, sides, 0),
        damage_type,
    )
}

fn versatile(sides: u32) -> WeaponProperty {
    WeaponProperty::Versatile(DiceExpression::new(1, sides, 0))
}

// ============================================================================
// Tables
// ============================================================================

lazy_static::lazy_static! {
    /// Standard D&D 5e weapons.
    pub static ref WEAPONS: Vec<WeaponProfile> = {
        use DamageType::{Bludgeoning, Piercing, Slashing};
        use WeaponCategory::{Martial, Simple};
        use WeaponProperty::*;

        vec![
            // Simple Melee Weapons
            simple_melee("Club", 1, 4, Bludgeoning).with_properties(vec![Light]),
            simple_melee("Dagger", 1, 4, Piercing)
                .with_properties(vec![Finesse, Light, Thrown])
                .with_range(20, 60),
            simple_melee("Greatclub", 1, 8, Bludgeoning).with_properties(vec![TwoHanded]),
            simple_melee("Handaxe", 1, 6, Slashing)
                .with_properties(vec![Light, Thrown])
                .with_range(20, 60),
            simple_melee("Javelin", 1, 6, Piercing)
                .with_properties(vec![Thrown])
                .with_range(30, 120),
            simple_melee("Light Hammer", 1, 4, Bludgeoning)
                .with_properties(vec![Light, Thrown])
                .with_range(20, 60),
            simple_melee("Mace", 1, 6, Bludgeoning),
            simple_melee("Quarterstaff", 1, 6, Bludgeoning).with_properties(vec![versatile(8)]),
            simple_melee("Sickle", 1, 4, Slashing).with_properties(vec![Light]),
            simple_melee("Spear", 1, 6, Piercing)
                .with_properties(vec![Thrown, versatile(8)])
                .with_range(20, 60),

            // Martial Melee Weapons
            martial_melee("Battleaxe", 1, 8, Slashing).with_properties(vec![versatile(10)]),
            martial_melee("Flail", 1, 8, Bludgeoning),
            martial_melee("Glaive", 1, 10, Slashing).with_properties(vec![Heavy, Reach, TwoHanded]),
            martial_melee("Greataxe", 1, 12, Slashing).with_properties(vec![Heavy, TwoHanded]),
            martial_melee("Greatsword", 2, 6, Slashing).with_properties(vec![Heavy, TwoHanded]),
            martial_melee("Halberd", 1, 10, Slashing)
                .with_properties(vec![Heavy, Reach, TwoHanded]),
            martial_melee("Lance", 1, 12, Piercing).with_properties(vec![Reach]),
            martial_melee("Longsword", 1, 8, Slashing).with_properties(vec![versatile(10)]),
            martial_melee("Maul", 2, 6, Bludgeoning).with_properties(vec![Heavy, TwoHanded]),
            martial_melee("Morningstar", 1, 8, Piercing),
            martial_melee("Pike", 1, 10, Piercing).with_properties(vec![Heavy, Reach, TwoHanded]),
            martial_melee("Rapier", 1, 8, Piercing).with_properties(vec![Finesse]),
            martial_melee("Scimitar", 1, 6, Slashing).with_properties(vec![Finesse, Light]),
            martial_melee("Shortsword", 1, 6, Piercing).with_properties(vec![Finesse, Light]),
            martial_melee("Trident", 1, 6, Piercing)
                .with_properties(vec![Thrown, versatile(8)])
                .with_range(20, 60),
            martial_melee("War Pick", 1, 8, Piercing),
            martial_melee("Warhammer", 1, 8, Bludgeoning).with_properties(vec![versatile(10)]),
            martial_melee("Whip", 1, 4, Slashing).with_properties(vec![Finesse, Reach]),

            // Simple Ranged Weapons
            ranged("Light Crossbow", Simple, 8, Piercing)
                .with_properties(vec![Ammunition(AmmoKind::Bolt), Loading, TwoHanded])
                .with_range(80, 320),
            ranged("Dart", Simple, 4, Piercing)
                .with_properties(vec![Finesse, Thrown])
                .with_range(20, 60),
            ranged("Shortbow", Simple, 6, Piercing)
                .with_properties(vec![Ammunition(AmmoKind::Arrow), TwoHanded])
                .with_range(80, 320),
            ranged("Sling", Simple, 4, Bludgeoning)
                .with_properties(vec![Ammunition(AmmoKind::SlingBullet)])
                .with_range(30, 120),

            // Martial Ranged Weapons
            ranged("Blowgun", Martial, 1, Piercing)
                .with_properties(vec![Ammunition(AmmoKind::Needle), Loading])
                .with_range(25, 100),
            ranged("Hand Crossbow", Martial, 6, Piercing)
                .with_properties(vec![Ammunition(AmmoKind::Bolt), Light, Loading])
                .with_range(30, 120),
            ranged("Heavy Crossbow", Martial, 10, Piercing)
                .with_properties(vec![Ammunition(AmmoKind::Bolt), Heavy, Loading, TwoHanded])
                .with_range(100, 400),
            ranged("Longbow", Martial, 8, Piercing)
                .with_properties(vec![Ammunition(AmmoKind::Arrow), Heavy, TwoHanded])
                .with_range(150, 600),
        ]
    };

    /// Standard D&D 5e armor.
    pub static ref ARMORS: Vec<ArmorProfile> = vec![
        // Light Armor
        ArmorProfile::new("Padded Armor", ArmorType::Light, 11).with_stealth_disadvantage(),
        ArmorProfile::new("Leather Armor", ArmorType::Light, 11),
        ArmorProfile::new("Studded Leather", ArmorType::Light, 12),

        // Medium Armor
        ArmorProfile::new("Hide Armor", ArmorType::Medium, 12),
        ArmorProfile::new("Chain Shirt", ArmorType::Medium, 13),
        ArmorProfile::new("Scale Mail", ArmorType::Medium, 14).with_stealth_disadvantage(),
        ArmorProfile::new("Breastplate", ArmorType::Medium, 14),
        ArmorProfile::new("Half Plate", ArmorType::Medium, 15).with_stealth_disadvantage(),

        // Heavy Armor
        ArmorProfile::new("Ring Mail", ArmorType::Heavy, 14).with_stealth_disadvantage(),
        ArmorProfile::new("Chain Mail", ArmorType::Heavy, 16).with_stealth_disadvantage(),
        ArmorProfile::new("Splint Armor", ArmorType::Heavy, 17).with_stealth_disadvantage(),
        ArmorProfile::new("Plate Armor", ArmorType::Heavy, 18).with_stealth_disadvantage(),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_weapon() {
        let armory = Armory::standard();
        let longsword = armory.weapon("Longsword").unwrap();
        assert_eq!(longsword.damage, DiceExpression::new(1, 8, 0));
        assert_eq!(longsword.damage_type, DamageType::Slashing);
        assert_eq!(
            longsword.traits().versatile,
            Some(DiceExpression::new(1, 10, 0))
        );

        // Case insensitive
        let dagger = armory.weapon("dagger").unwrap();
        assert!(dagger.traits().finesse);
        assert_eq!(dagger.traits().range, Some((20, 60)));
        assert!(armory.weapon("Vorpal Spoon").is_none());
    }

    #[test]
    fn test_ranged_weapon_traits() {
        let armory = Armory::standard();
        let crossbow = armory.weapon("Light Crossbow").unwrap();
        let traits = crossbow.traits();
        assert!(crossbow.is_ranged());
        assert!(traits.loading);
        assert_eq!(traits.ammunition, Some(AmmoKind::Bolt));
        assert_eq!(traits.range, Some((80, 320)));
    }

    #[test]
    fn test_reach() {
        let armory = Armory::standard();
        assert_eq!(armory.weapon("Glaive").unwrap().reach(), 10);
        assert_eq!(armory.weapon("Longsword").unwrap().reach(), 5);
    }

    #[test]
    fn test_parse_property_tags() {
        assert_eq!(
            "finesse".parse::<WeaponProperty>(),
            Ok(WeaponProperty::Finesse)
        );
        assert_eq!(
            "Two-Handed".parse::<WeaponProperty>(),
            Ok(WeaponProperty::TwoHanded)
        );
        assert_eq!(
            "versatile:1d10".parse::<WeaponProperty>(),
            Ok(WeaponProperty::Versatile(DiceExpression::new(1, 10, 0)))
        );
        assert_eq!(
            "range:20/60".parse::<WeaponProperty>(),
            Ok(WeaponProperty::Range {
                normal: 20,
                long: 60
            })
        );
        assert_eq!(
            "ammunition:arrow".parse::<WeaponProperty>(),
            Ok(WeaponProperty::Ammunition(AmmoKind::Arrow))
        );
        assert!("range:60/20".parse::<WeaponProperty>().is_err());
        assert!("versatile".parse::<WeaponProperty>().is_err());
        assert!("sparkly".parse::<WeaponProperty>().is_err());
    }

    #[test]
    fn test_get_armor() {
        let armory = Armory::standard();
        let plate = armory.armor("Plate Armor").unwrap();
        assert_eq!(plate.base_ac, 18);
        assert_eq!(plate.dex_cap, Some(0));
        assert!(plate.stealth_disadvantage);
        assert!(armory.armor("Mithril Pajamas").is_none());
    }

    #[test]
    fn test_armor_class() {
        let armory = Armory::standard();
        let leather = armory.armor("Leather Armor");
        let half_plate = armory.armor("Half Plate");
        let chain = armory.armor("Chain Mail");

        assert_eq!(armor_class(None, 3, false, false), 13);
        assert_eq!(armor_class(leather, 3, false, false), 14);
        assert_eq!(armor_class(half_plate, 3, false, false), 17);
        assert_eq!(armor_class(chain, 3, true, true), 19);
        // Defense style needs armor.
        assert_eq!(armor_class(None, 2, false, true), 12);
    }

    #[test]
    fn test_custom_weapon_replaces_standard() {
        let armory = Armory::standard().with_weapon(
            WeaponProfile::new(
                "Longsword",
                WeaponCategory::Martial,
                WeaponKind::Melee,
                DiceExpression::new(2, 8, 0),
                DamageType::Radiant,
            ),
        );
        let sword = armory.weapon("longsword").unwrap();
        assert_eq!(sword.damage_type, DamageType::Radiant);
        assert_eq!(
            armory
                .weapons
                .iter()
                .filter(|w| w.name == "Longsword")
                .count(),
            1
        );
    }
}
