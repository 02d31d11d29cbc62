//! The structured record of an encounter.
//!
//! Separate from `tracing` output: this is the value handed back to callers
//! (and compared byte-for-byte in determinism tests).

use crate::attack::AttackOutcome;
use crate::combatant::{Combatant, CombatantId};
use crate::damage::DamageReport;
use crate::death::{DeathSaveEvent, DeathState};
use crate::dice::RollResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    Primary,
    OffHand,
    Opportunity,
    Readied,
}

/// One initiative roll, in acting order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeRoll {
    pub id: CombatantId,
    pub name: String,
    pub total: i32,
    pub dex_mod: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEntry {
    Initiative {
        order: Vec<InitiativeRoll>,
    },
    RoundStarted {
        round: u32,
    },
    TurnStarted {
        id: CombatantId,
        name: String,
        hp: i32,
    },
    Attack {
        attacker: CombatantId,
        target: CombatantId,
        kind: AttackKind,
        outcome: AttackOutcome,
    },
    Damage {
        target: CombatantId,
        report: DamageReport,
    },
    DeathSave {
        id: CombatantId,
        roll: RollResult,
        outcome: DeathSaveEvent,
        state: DeathState,
    },
    Moved {
        id: CombatantId,
        from: i32,
        to: i32,
        dashed: bool,
        disengaged: bool,
    },
    Readied {
        id: CombatantId,
        target: CombatantId,
    },
    PotionDrunk {
        id: CombatantId,
        roll: RollResult,
        healed: i32,
    },
    RestraintSave {
        id: CombatantId,
        roll: RollResult,
        dc: i32,
        escaped: bool,
    },
    StoodUp {
        id: CombatantId,
    },
    Dodged {
        id: CombatantId,
    },
    GrappleEnded {
        id: CombatantId,
        grappler: CombatantId,
    },
    Skipped {
        id: CombatantId,
        reason: String,
    },
}

/// Ordered entries of one encounter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterLog {
    pub entries: Vec<LogEntry>,
}

impl EncounterLog {
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Attack outcomes in order, with who attacked whom.
    pub fn attacks(&self) -> impl Iterator<Item = (CombatantId, CombatantId, &AttackOutcome)> {
        self.entries.iter().filter_map(|entry| match entry {
            LogEntry::Attack {
                attacker,
                target,
                outcome,
                ..
            } => Some((*attacker, *target, outcome)),
            _ => None,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Final state of one combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub id: CombatantId,
    pub name: String,
    pub team: String,
    pub hp: i32,
    pub max_hp: i32,
    pub death: DeathState,
}

impl From<&Combatant> for Standing {
    fn from(combatant: &Combatant) -> Self {
        Self {
            id: combatant.id,
            name: combatant.name.clone(),
            team: combatant.team.clone(),
            hp: combatant.hp,
            max_hp: combatant.max_hp,
            death: combatant.death,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterSummary {
    /// The last team standing, if exactly one is.
    pub winner: Option<String>,
    pub rounds: u32,
    pub timed_out: bool,
    pub standings: Vec<Standing>,
}
