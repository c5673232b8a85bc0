//! Knockback
//!
//! Forced displacement away from the attacker, tile by tile through the move
//! gate. Distance comes from the power gap alone; the walk is fully
//! deterministic and deals no damage. An interrupted push staggers the pushed
//! entity, never whatever it ran into.

use serde::{Deserialize, Serialize};

use crate::effect::StatusEffect;
use crate::engine::MoveGate;
use crate::entity::{Entity, EntityId, Pos};
use crate::event::CombatEvent;
use crate::metrics::KnockbackCategory;
use crate::Engine;

/// Turns of stagger after slamming into something
const IMPACT_STAGGER_TURNS: u32 = 2;

/// Push distance from the power gap between the two combatants.
///
/// Outmuscled attackers still shove one tile; past a gap of four the
/// distance stops growing.
pub const fn knockback_distance(attacker_power: i32, defender_power: i32) -> u32 {
    let delta = attacker_power - defender_power;
    if delta <= -1 {
        1
    } else if delta <= 1 {
        2
    } else if delta <= 3 {
        3
    } else {
        4
    }
}

/// What an interrupted push ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactKind {
    Wall,
    Entity,
}

/// Where a knockback ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnockbackResult {
    /// Distance the power gap asked for
    pub nominal: u32,
    /// Tiles actually covered
    pub moved: u32,
    /// What cut the push short, if anything
    pub impact: Option<ImpactKind>,
    /// The pushed entity picked up a stagger
    pub stunned: bool,
    /// Final position of the pushed entity
    pub dest: Pos,
}

impl Engine {
    /// Push the defender directly away from the attacker.
    ///
    /// Walks one tile at a time: a tile the gate refuses as terrain stops
    /// the push with a wall impact, an occupied tile stops it with an entity
    /// collision, and either leaves the defender staggered. An anchored
    /// defender does not move at all and is not staggered.
    pub fn resolve_knockback(
        &mut self,
        attacker: &Entity,
        defender: &mut Entity,
        gate: &mut dyn MoveGate,
    ) -> KnockbackResult {
        let nominal = knockback_distance(attacker.power, defender.power);
        let dx = (defender.pos.x - attacker.pos.x).signum();
        let dy = (defender.pos.y - attacker.pos.y).signum();

        let held = KnockbackResult {
            nominal,
            moved: 0,
            impact: None,
            stunned: false,
            dest: defender.pos,
        };
        if defender.is_dead() {
            return held;
        }
        debug_assert!(
            dx != 0 || dy != 0,
            "knockback between overlapping entities"
        );
        if dx == 0 && dy == 0 {
            return held;
        }

        if defender.effects.anchored() {
            self.metrics_mut()
                .record_knockback(KnockbackCategory::Anchored);
            self.push_event(CombatEvent::HeldFast {
                target: defender.name.clone(),
            });
            return held;
        }

        let mut moved = 0u32;
        let mut impact = None;
        let mut blocker = None;
        while moved < nominal {
            let next = defender.pos.offset(dx, dy);
            if !gate.can_enter(next) {
                if let Some(occupant) = gate.occupant(next) {
                    impact = Some(ImpactKind::Entity);
                    blocker = Some(occupant);
                } else {
                    impact = Some(ImpactKind::Wall);
                }
                break;
            }
            if !gate.move_to(defender.id, next) {
                // The gate balked without naming an obstacle; stop cleanly.
                break;
            }
            defender.pos = next;
            moved += 1;
        }

        self.push_event(CombatEvent::Knockback {
            target: defender.name.clone(),
            pushed: moved,
            nominal,
        });

        let category = match impact {
            None => KnockbackCategory::Clean,
            Some(ImpactKind::Wall) => {
                self.push_event(CombatEvent::WallImpact {
                    target: defender.name.clone(),
                });
                KnockbackCategory::WallImpact
            }
            Some(ImpactKind::Entity) => {
                self.push_event(CombatEvent::EntityCollision {
                    target: defender.name.clone(),
                    blocker: blocker.unwrap_or(EntityId::NONE),
                });
                KnockbackCategory::EntityImpact
            }
        };
        self.metrics_mut().record_knockback(category);

        let stunned = impact.is_some();
        if stunned {
            self.apply_effect_internal(defender, StatusEffect::stagger(IMPACT_STAGGER_TURNS));
        }

        KnockbackResult {
            nominal,
            moved,
            impact,
            stunned,
            dest: defender.pos,
        }
    }
}
