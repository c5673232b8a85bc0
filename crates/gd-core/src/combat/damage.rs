//! Damage application
//!
//! Every hit-point reduction in the game funnels through
//! [`Engine::apply_damage`]: attacks, effect ticks and hazards alike. That
//! keeps resistance scaling, channel interrupts and death finalization in one
//! place, so nothing can kill an entity without the full bookkeeping.

use crate::combat::{DamageCause, DamageResult, ResistLevel};
use crate::engine::{TerminalKind, TurnAuthority};
use crate::entity::Entity;
use crate::event::CombatEvent;
use crate::Engine;

/// Resistance scaling: immunity zeroes, resistance halves rounding down.
///
/// There is no minimum; a resisted single point scales to nothing.
pub const fn scale_damage(amount: i32, level: ResistLevel) -> i32 {
    match level {
        ResistLevel::Immune => 0,
        ResistLevel::Resistant => amount / 2,
        ResistLevel::Normal => amount,
    }
}

impl Engine {
    /// Apply damage to a target. The only path that lowers hit points.
    ///
    /// Dead targets report `already_dead` and are otherwise untouched.
    /// Non-positive amounts do nothing; they never heal. A lethal
    /// application reduces to exactly zero, marks the target dead once, and
    /// for a player asks the authority for a terminal transition.
    pub fn apply_damage(
        &mut self,
        target: &mut Entity,
        amount: i32,
        cause: DamageCause,
        authority: &mut dyn TurnAuthority,
    ) -> DamageResult {
        if target.is_dead() {
            return DamageResult::ALREADY_DEAD;
        }
        if amount <= 0 {
            return DamageResult::NONE;
        }

        let applied = scale_damage(amount, target.resist_level(cause.category()));
        if applied == 0 {
            self.push_event(CombatEvent::Shrugged {
                target: target.name.clone(),
                cause,
            });
            return DamageResult::NONE;
        }

        target.reduce_hp(applied);
        self.metrics_mut().record_damage(cause, applied);
        self.push_event(CombatEvent::Damage {
            target: target.name.clone(),
            cause,
            applied,
        });

        // Only damage that actually lands breaks a channel.
        let interrupted = target.effects.interrupt_channel();
        if interrupted {
            self.push_event(CombatEvent::Interrupted {
                target: target.name.clone(),
            });
        }

        let lethal = target.hp() == 0;
        if lethal {
            self.finalize_death(target, cause, authority);
        }

        DamageResult {
            applied,
            lethal,
            already_dead: false,
            interrupted,
        }
    }

    /// Restore hit points, clamped to the maximum. Returns the amount
    /// actually gained. The dead stay dead; healing cannot raise them.
    pub fn apply_healing(&mut self, target: &mut Entity, amount: i32) -> i32 {
        if target.is_dead() || amount <= 0 {
            return 0;
        }
        let healed = target.restore_hp(amount);
        if healed > 0 {
            self.push_event(CombatEvent::Healed {
                target: target.name.clone(),
                amount: healed,
            });
        }
        healed
    }

    /// Runs exactly once per entity, on the application that reached zero.
    fn finalize_death(
        &mut self,
        target: &mut Entity,
        cause: DamageCause,
        authority: &mut dyn TurnAuthority,
    ) {
        target.mark_dead();
        self.metrics_mut().record_death();
        self.push_event(CombatEvent::Death {
            target: target.name.clone(),
            cause,
        });
        if target.player && !authority.is_terminal() {
            authority.request_terminal_transition(target.id, TerminalKind::Defeat);
            self.push_event(CombatEvent::TerminalRequested {
                target: target.name.clone(),
                kind: TerminalKind::Defeat,
            });
        }
    }
}
