//! Combat events
//!
//! Every observable consequence of an engine call lands here, in order.
//! Display renders the log line a caller would print; the structured fields
//! are what tests and drivers actually match on.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::combat::{DamageCause, OutcomeKind};
use crate::effect::EffectKind;
use crate::engine::TerminalKind;
use crate::entity::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatEvent {
    Attack {
        attacker: String,
        defender: String,
        kind: OutcomeKind,
        roll: u32,
        raw_damage: i32,
    },
    Damage {
        target: String,
        cause: DamageCause,
        applied: i32,
    },
    /// Damage that scaled to nothing against resistance or immunity
    Shrugged {
        target: String,
        cause: DamageCause,
    },
    /// A channel broke under landed damage
    Interrupted {
        target: String,
    },
    EffectApplied {
        target: String,
        kind: EffectKind,
        refreshed: bool,
    },
    EffectExpired {
        target: String,
        kind: EffectKind,
    },
    EffectRemoved {
        target: String,
        kind: EffectKind,
    },
    /// A movement attempt denied outright by an effect
    MoveBlocked {
        target: String,
        kind: EffectKind,
    },
    /// A movement attempt decided by the chant toggle
    MoveTaxed {
        target: String,
        allowed: bool,
    },
    Knockback {
        target: String,
        pushed: u32,
        nominal: u32,
    },
    WallImpact {
        target: String,
    },
    EntityCollision {
        target: String,
        blocker: EntityId,
    },
    /// An anchored entity refused to be displaced
    HeldFast {
        target: String,
    },
    Healed {
        target: String,
        amount: i32,
    },
    Death {
        target: String,
        cause: DamageCause,
    },
    /// A player death asked the session to end
    TerminalRequested {
        target: String,
        kind: TerminalKind,
    },
}

impl fmt::Display for CombatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombatEvent::Attack {
                attacker,
                defender,
                kind,
                ..
            } => match kind {
                OutcomeKind::Hit => write!(f, "The {attacker} hits the {defender}."),
                OutcomeKind::Critical => {
                    write!(f, "The {attacker} strikes the {defender} a terrible blow!")
                }
                OutcomeKind::Miss => write!(f, "The {attacker} misses the {defender}."),
                OutcomeKind::Fumble => write!(f, "The {attacker} flails wildly and misses!"),
            },
            CombatEvent::Damage {
                target,
                cause,
                applied,
            } => write!(f, "The {target} takes {applied} damage from {cause}."),
            CombatEvent::Shrugged { target, cause } => {
                write!(f, "The {target} shrugs off the {cause} damage.")
            }
            CombatEvent::Interrupted { target } => write!(f, "The {target}'s chant falters!"),
            CombatEvent::EffectApplied {
                target,
                kind,
                refreshed,
            } => {
                if *refreshed {
                    write!(f, "The {kind} takes hold of the {target} anew.")
                } else {
                    write!(f, "The {kind} takes hold of the {target}.")
                }
            }
            CombatEvent::EffectExpired { target, kind } => {
                write!(f, "The {target}'s {kind} wears off.")
            }
            CombatEvent::EffectRemoved { target, kind } => {
                write!(f, "The {target}'s {kind} is dispelled.")
            }
            CombatEvent::MoveBlocked { target, kind } => match kind {
                EffectKind::Entangle => write!(f, "The {target} is held fast and cannot move!"),
                EffectKind::Stagger => write!(f, "The {target} reels, unable to act!"),
                _ => write!(f, "The {target} cannot move."),
            },
            CombatEvent::MoveTaxed { target, allowed } => {
                if *allowed {
                    write!(f, "The {target} strains forward mid-chant.")
                } else {
                    write!(f, "The chant roots the {target} in place.")
                }
            }
            CombatEvent::Knockback {
                target,
                pushed,
                ..
            } => match pushed {
                0 => write!(f, "The {target} is shoved hard but gives no ground!"),
                1 => write!(f, "The {target} is hurled back a tile!"),
                _ => write!(f, "The {target} is hurled back {pushed} tiles!"),
            },
            CombatEvent::WallImpact { target } => {
                write!(f, "The {target} slams into the wall!")
            }
            CombatEvent::EntityCollision { target, .. } => {
                write!(f, "The {target} crashes into another body!")
            }
            CombatEvent::HeldFast { target } => {
                write!(f, "The {target} holds fast against the blow.")
            }
            CombatEvent::Healed { target, amount } => {
                write!(f, "The {target} recovers {amount} hit points.")
            }
            CombatEvent::Death { target, cause } => match cause {
                DamageCause::Attack => write!(f, "The {target} is struck down!"),
                _ => write!(f, "The {target} succumbs to {cause}!"),
            },
            CombatEvent::TerminalRequested { target, kind } => match kind {
                TerminalKind::Defeat => {
                    write!(f, "The dungeon claims the {target}. The run is over.")
                }
                TerminalKind::Victory => write!(f, "The {target} stands triumphant!"),
            },
        }
    }
}
