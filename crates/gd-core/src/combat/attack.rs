//! Attack checks
//!
//! A d20 plus the attacker's effective bonus must strictly exceed the
//! defender's armor class. The top face always connects and doubles raw
//! damage; the bottom face always misses. The resolver itself touches
//! neither combatant.

use crate::combat::{CombatOutcome, DamageCause, DamageResult, OutcomeKind};
use crate::engine::TurnAuthority;
use crate::entity::Entity;
use crate::event::CombatEvent;
use crate::rng::GameRng;
use crate::{Engine, EngineError};

const ATTACK_DIE: u32 = 20;
const CRIT_ROLL: u32 = 20;
const FUMBLE_ROLL: u32 = 1;

/// A roll beats an armor class only by strictly exceeding it
pub const fn check_beats_ac(roll: u32, bonus: i32, armor_class: i32) -> bool {
    roll as i32 + bonus > armor_class
}

/// Innate attack bonus shifted by whatever effects the attacker carries
pub fn effective_attack_bonus(attacker: &Entity) -> i32 {
    attacker.attack_bonus + attacker.effects.attack_bonus_modifier()
}

/// Resolve one swing. Pure: rolls dice, mutates nobody.
pub fn resolve_attack(attacker: &Entity, defender: &Entity, rng: &mut GameRng) -> CombatOutcome {
    let roll = rng.rnd(ATTACK_DIE);
    if roll == FUMBLE_ROLL {
        return CombatOutcome::fumble(roll);
    }

    let critical = roll == CRIT_ROLL;
    if !critical && !check_beats_ac(roll, effective_attack_bonus(attacker), defender.armor_class) {
        return CombatOutcome::miss(roll);
    }

    let mut raw_damage = attacker.damage.roll(rng);
    let kind = if critical {
        raw_damage *= 2;
        OutcomeKind::Critical
    } else {
        OutcomeKind::Hit
    };

    CombatOutcome {
        kind,
        roll,
        raw_damage,
        knockback_requested: attacker.damage.knockback,
    }
}

/// A resolved swing plus whatever it did to the defender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackReport {
    pub outcome: CombatOutcome,
    /// Present only when the swing connected
    pub damage: Option<DamageResult>,
}

impl AttackReport {
    /// The swing wants a knockback follow-up and the defender is still up
    pub fn knockback_pending(&self) -> bool {
        self.outcome.knockback_requested
            && self.outcome.connects()
            && self
                .damage
                .is_some_and(|d| !d.lethal && !d.already_dead)
    }
}

impl Engine {
    /// Resolve a swing through the engine's dice, recording it.
    ///
    /// No damage is applied; callers route the raw amount through
    /// [`Engine::apply_damage`] themselves or use [`Engine::attack`].
    pub fn resolve_attack(
        &mut self,
        attacker: &Entity,
        defender: &Entity,
    ) -> Result<CombatOutcome, EngineError> {
        attacker.damage.validate()?;
        let outcome = resolve_attack(attacker, defender, &mut self.rng);
        self.metrics_mut().record_attack(outcome.kind);
        self.push_event(CombatEvent::Attack {
            attacker: attacker.name.clone(),
            defender: defender.name.clone(),
            kind: outcome.kind,
            roll: outcome.roll,
            raw_damage: outcome.raw_damage,
        });
        Ok(outcome)
    }

    /// Resolve a swing and drive any raw damage through the damage path.
    pub fn attack(
        &mut self,
        attacker: &Entity,
        defender: &mut Entity,
        authority: &mut dyn TurnAuthority,
    ) -> Result<AttackReport, EngineError> {
        debug_assert!(!attacker.is_dead(), "{} is attacking while dead", attacker.name);
        let outcome = self.resolve_attack(attacker, defender)?;
        let damage = if outcome.connects() {
            Some(self.apply_damage(defender, outcome.raw_damage, DamageCause::Attack, authority))
        } else {
            None
        };
        Ok(AttackReport { outcome, damage })
    }
}
