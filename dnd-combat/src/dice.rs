//! Seeded dice rolling.
//!
//! Supports the `XdY+Z` notation used by weapon and potion tables, plus
//! advantage/disadvantage on single d20 rolls. Every roll builds its own RNG
//! from a seed, so any individual result can be reproduced from that seed.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing and rolling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("Invalid dice expression: {0}")]
    InvalidExpression(String),
    #[error("Advantage/disadvantage not supported for {0}")]
    UnsupportedAdvantage(String),
}

/// Advantage state for d20 rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Advantage {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl Advantage {
    /// Combine two advantage states (advantage + disadvantage = normal).
    pub fn combine(self, other: Advantage) -> Advantage {
        match (self, other) {
            (Advantage::Normal, x) | (x, Advantage::Normal) => x,
            (Advantage::Advantage, Advantage::Disadvantage) => Advantage::Normal,
            (Advantage::Disadvantage, Advantage::Advantage) => Advantage::Normal,
            (Advantage::Advantage, Advantage::Advantage) => Advantage::Advantage,
            (Advantage::Disadvantage, Advantage::Disadvantage) => Advantage::Disadvantage,
        }
    }

    /// Collapse any number of sources: one advantage and one disadvantage
    /// cancel no matter how many of each there are.
    pub fn from_sources(advantage: bool, disadvantage: bool) -> Advantage {
        match (advantage, disadvantage) {
            (true, false) => Advantage::Advantage,
            (false, true) => Advantage::Disadvantage,
            _ => Advantage::Normal,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Advantage::Normal => "normal",
            Advantage::Advantage => "advantage",
            Advantage::Disadvantage => "disadvantage",
        }
    }
}

/// Largest dice count `parse` accepts.
pub const MAX_DICE: u32 = 1000;
/// Largest die size `parse` accepts.
pub const MAX_SIDES: u32 = 1000;
/// Largest absolute modifier `parse` accepts.
pub const MAX_MODIFIER: i32 = 100_000;

/// A dice expression of the form `[count]d<sides>[+/-modifier]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl DiceExpression {
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    /// A single d20 with a flat modifier.
    pub fn d20(modifier: i32) -> Self {
        Self::new(1, 20, modifier)
    }

    /// Parse a dice notation string.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let invalid = || DiceError::InvalidExpression(notation.to_string());
        let normalized: String = notation
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        let (count_str, rest) = normalized.split_once('d').ok_or_else(invalid)?;
        let count = if count_str.is_empty() {
            1
        } else {
            parse_digits(count_str).ok_or_else(invalid)?
        };

        let (sides_str, modifier) = match rest.find(|c: char| c == '+' || c == '-') {
            Some(pos) => {
                let (sides, modifier) = rest.split_at(pos);
                let digits = &modifier[1..];
                let magnitude = parse_digits(digits).ok_or_else(invalid)?;
                let magnitude = i32::try_from(magnitude).map_err(|_| invalid())?;
                let signed = if modifier.starts_with('-') {
                    -magnitude
                } else {
                    magnitude
                };
                (sides, signed)
            }
            None => (rest, 0),
        };

        let sides = parse_digits(sides_str).ok_or_else(invalid)?;
        if count == 0 || sides == 0 {
            return Err(invalid());
        }
        if count > MAX_DICE || sides > MAX_SIDES || modifier.abs() > MAX_MODIFIER {
            return Err(invalid());
        }

        Ok(DiceExpression {
            count,
            sides,
            modifier,
        })
    }

    /// The same dice with the count doubled and the modifier untouched.
    pub fn doubled(&self) -> Self {
        Self::new(self.count.saturating_mul(2), self.sides, self.modifier)
    }

    pub fn with_modifier(&self, modifier: i32) -> Self {
        Self::new(self.count, self.sides, modifier)
    }

    pub fn is_single_d20(&self) -> bool {
        self.count == 1 && self.sides == 20
    }

    /// Roll with a specific RNG.
    pub fn roll_with_rng<R: Rng>(&self, rng: &mut R) -> RollResult {
        let rolls: Vec<u32> = (0..self.count)
            .map(|_| rng.gen_range(1..=self.sides))
            .collect();
        let dice_total = rolls.iter().map(|&r| i64::from(r)).sum::<i64>();
        let single_d20 = self.is_single_d20();
        let face = rolls.first().copied();

        RollResult {
            expression: self.to_string(),
            kept: rolls.clone(),
            rolls,
            modifier: self.modifier,
            total: clamp_total(dice_total + i64::from(self.modifier)),
            natural_20: single_d20 && face == Some(20),
            natural_1: single_d20 && face == Some(1),
        }
    }

    /// Roll from a fresh RNG built from `seed`.
    pub fn roll_seeded(&self, seed: u64) -> RollResult {
        self.roll_with_rng(&mut ChaCha8Rng::seed_from_u64(seed))
    }

    /// Roll with advantage/disadvantage (only valid for a single d20).
    pub fn roll_with_advantage_seeded(
        &self,
        advantage: Advantage,
        seed: u64,
    ) -> Result<RollResult, DiceError> {
        if advantage == Advantage::Normal {
            return Ok(self.roll_seeded(seed));
        }
        if !self.is_single_d20() {
            return Err(DiceError::UnsupportedAdvantage(self.to_string()));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let first = rng.gen_range(1..=20u32);
        let second = rng.gen_range(1..=20u32);
        Ok(self.pick(advantage, [first, second]))
    }

    fn pick(&self, advantage: Advantage, faces: [u32; 2]) -> RollResult {
        let [first, second] = faces;
        let (chosen, rolls) = match advantage {
            Advantage::Advantage => (first.max(second), vec![first, second]),
            Advantage::Disadvantage => (first.min(second), vec![first, second]),
            Advantage::Normal => (first, vec![first]),
        };

        RollResult {
            expression: self.to_string(),
            rolls,
            kept: vec![chosen],
            modifier: self.modifier,
            total: clamp_total(i64::from(chosen) + i64::from(self.modifier)),
            natural_20: chosen == 20,
            natural_1: chosen == 1,
        }
    }
}

fn clamp_total(total: i64) -> i32 {
    total.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}

/// Complete result of a dice roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub expression: String,
    /// Every die drawn, including the one discarded by advantage/disadvantage.
    pub rolls: Vec<u32>,
    pub kept: Vec<u32>,
    pub modifier: i32,
    pub total: i32,
    pub natural_20: bool,
    pub natural_1: bool,
}

impl RollResult {
    /// Format the individual dice results for display, dropped dice in
    /// parentheses.
    pub fn dice_display(&self) -> String {
        let dice = if self.rolls.len() > self.kept.len() {
            let mut kept_used = vec![false; self.kept.len()];
            let shown: Vec<String> = self
                .rolls
                .iter()
                .map(|&roll| {
                    let kept = self.kept.iter().enumerate().any(|(i, &k)| {
                        if k == roll && !kept_used[i] {
                            kept_used[i] = true;
                            true
                        } else {
                            false
                        }
                    });
                    if kept {
                        roll.to_string()
                    } else {
                        format!("({roll})")
                    }
                })
                .collect();
            format!("[{}]", shown.join(", "))
        } else {
            let shown: Vec<String> = self.rolls.iter().map(|r| r.to_string()).collect();
            format!("[{}]", shown.join(", "))
        };

        match self.modifier {
            0 => dice,
            m if m > 0 => format!("{dice} + {m}"),
            m => format!("{dice} - {}", m.abs()),
        }
    }

    /// The kept d20 face, if this was a d20 roll.
    pub fn face(&self) -> u32 {
        self.kept.first().copied().unwrap_or(0)
    }

    pub fn meets_dc(&self, dc: i32) -> bool {
        self.total >= dc
    }
}

impl fmt::Display for RollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.dice_display(), self.total)
    }
}

/// Roll a dice expression from a seed.
///
/// `advantage` and `disadvantage` may not both be set, and either one
/// requires the expression to be a single d20.
pub fn roll(
    expression: &str,
    seed: u64,
    advantage: bool,
    disadvantage: bool,
) -> Result<RollResult, DiceError> {
    let expr = DiceExpression::parse(expression)?;
    if advantage && disadvantage {
        return Err(DiceError::UnsupportedAdvantage(format!(
            "{expr} with both advantage and disadvantage"
        )));
    }
    let mode = Advantage::from_sources(advantage, disadvantage);
    expr.roll_with_advantage_seeded(mode, seed)
}

/// Derives one independent seed per roll from a single encounter seed.
///
/// The stream only ever produces seeds; dice are drawn from a fresh RNG
/// built from each seed, never from this stream directly.
#[derive(Debug, Clone)]
pub struct Roller {
    seeds: ChaCha8Rng,
}

impl Roller {
    pub fn new(seed: u64) -> Self {
        Self {
            seeds: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn next_seed(&mut self) -> u64 {
        self.seeds.next_u64()
    }

    pub fn roll(&mut self, expr: &DiceExpression) -> RollResult {
        expr.roll_seeded(self.next_seed())
    }

    pub fn roll_notation(&mut self, notation: &str) -> Result<RollResult, DiceError> {
        let expr = DiceExpression::parse(notation)?;
        Ok(self.roll(&expr))
    }

    /// Roll a d20 check or save with the given advantage state.
    pub fn d20(&mut self, advantage: Advantage, modifier: i32) -> RollResult {
        let faces = self.d20_pair();
        DiceExpression::d20(modifier).pick(advantage, faces)
    }

    /// Two d20 faces drawn from one derived seed.
    pub fn d20_pair(&mut self) -> [u32; 2] {
        let mut rng = ChaCha8Rng::seed_from_u64(self.next_seed());
        [rng.gen_range(1..=20u32), rng.gen_range(1..=20u32)]
    }
}
