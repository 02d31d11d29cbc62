//! Attack roll math.
//!
//! Pure functions shared by attack resolution and odds display. The odds are
//! computed by enumerating every d20 outcome with [`roll_outcome`], so they
//! always agree with how attacks are actually resolved.

use crate::dice::Advantage;
use serde::{Deserialize, Serialize};

/// Combine two advantage modes. `Normal` is the identity and opposite modes
/// cancel.
pub fn combine_modes(a: Advantage, b: Advantage) -> Advantage {
    a.combine(b)
}

/// Decide `(hit, crit)` for a kept d20 face.
///
/// A natural 1 always misses and a natural 20 always hits and crits.
pub fn roll_outcome(face: u32, attack_bonus: i32, ac: i32) -> (bool, bool) {
    match face {
        1 => (false, false),
        20 => (true, true),
        _ => (face as i32 + attack_bonus >= ac, false),
    }
}

/// Exact odds of an attack roll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitProbabilities {
    /// Any hit, critical or not.
    pub hit: f64,
    pub crit: f64,
    pub normal_hit: f64,
}

/// Odds of hitting `ac` with `attack_bonus` under `mode`.
pub fn hit_probabilities(attack_bonus: i32, ac: i32, mode: Advantage) -> HitProbabilities {
    let faces: Vec<u32> = match mode {
        Advantage::Normal => (1..=20).collect(),
        Advantage::Advantage | Advantage::Disadvantage => (1..=20u32)
            .flat_map(|a| (1..=20u32).map(move |b| (a, b)))
            .map(|(a, b)| {
                if mode == Advantage::Advantage {
                    a.max(b)
                } else {
                    a.min(b)
                }
            })
            .collect(),
    };

    let outcomes = faces.len() as f64;
    let (mut hits, mut crits) = (0u32, 0u32);
    for face in faces {
        let (hit, crit) = roll_outcome(face, attack_bonus, ac);
        hits += hit as u32;
        crits += crit as u32;
    }

    HitProbabilities {
        hit: hits as f64 / outcomes,
        crit: crits as f64 / outcomes,
        normal_hit: (hits - crits) as f64 / outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_natural_one_always_misses() {
        assert_eq!(roll_outcome(1, 100, 2), (false, false));
    }

    #[test]
    fn test_natural_twenty_always_crits() {
        assert_eq!(roll_outcome(20, -10, 40), (true, true));
    }

    #[test]
    fn test_meets_ac_hits() {
        assert_eq!(roll_outcome(10, 5, 15), (true, false));
        assert_eq!(roll_outcome(9, 5, 15), (false, false));
    }

    #[test]
    fn test_combine_modes() {
        let (adv, dis, none) = (
            Advantage::Advantage,
            Advantage::Disadvantage,
            Advantage::Normal,
        );
        assert_eq!(combine_modes(adv, dis), none);
        assert_eq!(combine_modes(dis, adv), none);
        assert_eq!(combine_modes(none, adv), adv);
        assert_eq!(combine_modes(dis, none), dis);
        assert_eq!(combine_modes(adv, adv), adv);
    }

    #[test]
    fn test_normal_probabilities() {
        let odds = hit_probabilities(5, 15, Advantage::Normal);
        assert!(close(odds.hit, 11.0 / 20.0));
        assert!(close(odds.crit, 1.0 / 20.0));
        assert!(close(odds.normal_hit, 10.0 / 20.0));
    }

    #[test]
    fn test_advantage_probabilities() {
        let odds = hit_probabilities(5, 15, Advantage::Advantage);
        // Miss only when both dice are below 10.
        assert!(close(odds.hit, 1.0 - (9.0 * 9.0) / 400.0));
        assert!(close(odds.crit, 39.0 / 400.0));

        let dis = hit_probabilities(5, 15, Advantage::Disadvantage);
        assert!(close(dis.hit, (11.0 * 11.0) / 400.0));
        assert!(close(dis.crit, 1.0 / 400.0));
    }

    #[test]
    fn test_extremes_respect_natural_rolls() {
        let impossible = hit_probabilities(0, 50, Advantage::Normal);
        assert!(close(impossible.hit, 1.0 / 20.0));
        assert!(close(impossible.normal_hit, 0.0));

        let trivial = hit_probabilities(30, 5, Advantage::Normal);
        assert!(close(trivial.hit, 19.0 / 20.0));
    }
}
