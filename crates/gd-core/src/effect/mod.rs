//! Status effects
//!
//! Effects live on their owner and tick exactly once at the owner's turn
//! start. Applying a kind that is already present refreshes it in place;
//! nothing ever stacks. Movement gating is a single check-and-mutate call so
//! the chant toggle can never be observed between the check and the flip.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::combat::{DamageCategory, DamageCause};
use crate::engine::TurnAuthority;
use crate::entity::Entity;
use crate::event::CombatEvent;
use crate::{Engine, EngineError};

/// Closed set of effect kinds
///
/// Every behavior switch matches this exhaustively, so adding a kind forces
/// every site to decide how it participates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    /// Damage over time, poison category
    Poison,
    /// Damage over time, fire category
    Burning,
    /// Attack penalty while active
    Slow,
    /// Roots the owner: movement denied outright
    Entangle,
    /// Dazed from an impact: no actions at all
    Stagger,
    /// Permanent attack blessing
    Oath,
    /// A sustained chant: every other step is denied while it holds
    Chant,
}

impl EffectKind {
    /// Deals damage on each owner turn start
    pub const fn is_dot(self) -> bool {
        matches!(self, EffectKind::Poison | EffectKind::Burning)
    }

    /// Category the tick damage is resisted as
    pub const fn damage_category(self) -> DamageCategory {
        match self {
            EffectKind::Poison => DamageCategory::Poison,
            EffectKind::Burning => DamageCategory::Fire,
            EffectKind::Slow
            | EffectKind::Entangle
            | EffectKind::Stagger
            | EffectKind::Oath
            | EffectKind::Chant => DamageCategory::Physical,
        }
    }

    /// Flat adjustment to the owner's attack checks while active
    pub const fn attack_bonus_modifier(self) -> i32 {
        match self {
            EffectKind::Oath => 2,
            EffectKind::Slow => -2,
            EffectKind::Poison
            | EffectKind::Burning
            | EffectKind::Entangle
            | EffectKind::Stagger
            | EffectKind::Chant => 0,
        }
    }

    /// The owner can take no actions at all this turn
    pub const fn blocks_actions(self) -> bool {
        matches!(self, EffectKind::Stagger)
    }

    /// Movement is denied outright while this holds
    pub const fn hard_blocks_movement(self) -> bool {
        matches!(self, EffectKind::Entangle | EffectKind::Stagger)
    }

    /// Movement is denied on alternating attempts while this holds
    pub const fn taxes_movement(self) -> bool {
        matches!(self, EffectKind::Chant)
    }

    /// Cannot be displaced by knockback while this holds
    pub const fn anchors(self) -> bool {
        matches!(self, EffectKind::Entangle)
    }
}

/// Remaining lifetime of an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectDuration {
    /// Expires after this many owner turn starts
    Turns(u32),
    /// Never expires on its own
    Permanent,
}

impl EffectDuration {
    /// Count down one owner turn
    pub fn tick(&mut self) {
        if let EffectDuration::Turns(n) = self {
            *n = n.saturating_sub(1);
        }
    }

    pub const fn is_expired(self) -> bool {
        matches!(self, EffectDuration::Turns(0))
    }

    pub const fn is_permanent(self) -> bool {
        matches!(self, EffectDuration::Permanent)
    }
}

/// Which side of the alternating movement tax comes next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
enum TaxPhase {
    /// Next attempt goes through
    #[default]
    Allow,
    /// Next attempt is denied
    Deny,
}

impl TaxPhase {
    /// Advance the toggle, returning the phase that was consumed
    fn flip(&mut self) -> TaxPhase {
        let consumed = *self;
        *self = match consumed {
            TaxPhase::Allow => TaxPhase::Deny,
            TaxPhase::Deny => TaxPhase::Allow,
        };
        consumed
    }
}

/// One active effect instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: EffectKind,
    pub duration: EffectDuration,
    /// Damage dealt per owner turn start; zero for non-damaging kinds
    pub tick_damage: i32,
    tax_phase: TaxPhase,
    channeling: bool,
}

impl StatusEffect {
    const fn new(kind: EffectKind, duration: EffectDuration, tick_damage: i32) -> Self {
        Self {
            kind,
            duration,
            tick_damage,
            tax_phase: TaxPhase::Allow,
            channeling: false,
        }
    }

    pub const fn poison(turns: u32, per_tick: i32) -> Self {
        Self::new(EffectKind::Poison, EffectDuration::Turns(turns), per_tick)
    }

    pub const fn burning(turns: u32, per_tick: i32) -> Self {
        Self::new(EffectKind::Burning, EffectDuration::Turns(turns), per_tick)
    }

    pub const fn slow(turns: u32) -> Self {
        Self::new(EffectKind::Slow, EffectDuration::Turns(turns), 0)
    }

    pub const fn entangle(turns: u32) -> Self {
        Self::new(EffectKind::Entangle, EffectDuration::Turns(turns), 0)
    }

    pub const fn stagger(turns: u32) -> Self {
        Self::new(EffectKind::Stagger, EffectDuration::Turns(turns), 0)
    }

    pub const fn oath() -> Self {
        Self::new(EffectKind::Oath, EffectDuration::Permanent, 0)
    }

    pub const fn chant(turns: u32) -> Self {
        let mut effect = Self::new(EffectKind::Chant, EffectDuration::Turns(turns), 0);
        effect.channeling = true;
        effect
    }

    /// An interruptible channel is in progress while this effect holds
    pub const fn is_channeling(&self) -> bool {
        self.channeling
    }

    /// Reject instances that could never do anything sensible
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.duration == EffectDuration::Turns(0) {
            return Err(EngineError::ZeroDuration(self.kind));
        }
        if self.kind.is_dot() && self.tick_damage <= 0 {
            return Err(EngineError::NonPositiveTick {
                kind: self.kind,
                amount: self.tick_damage,
            });
        }
        Ok(())
    }
}

/// How an application landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectApply {
    /// The kind was not present; a new instance was added
    Fresh,
    /// The kind was present; the instance was replaced wholesale
    Refreshed,
    /// The owner is dead; nothing was applied
    Ignored,
}

/// Verdict of a single movement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MoveDecision {
    Allowed,
    /// An effect denies movement outright
    HardBlocked(EffectKind),
    /// The chant toggle let this attempt through
    TaxAllowed,
    /// The chant toggle ate this attempt
    TaxDenied,
}

/// What one turn-start tick produced
#[derive(Debug, Default)]
pub(crate) struct TickOutcome {
    /// Damage payloads to route through the damage path, in effect order
    pub dots: Vec<(EffectKind, i32)>,
    /// Kinds that reached zero duration this tick
    pub expired: Vec<EffectKind>,
}

/// The effects currently on one entity
///
/// At most one instance per kind. Mutation is crate-internal; callers go
/// through the engine so bookkeeping happens in one place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectSet {
    effects: Vec<StatusEffect>,
}

impl EffectSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or refresh. A refresh replaces the old instance wholesale, which
    /// also resets the chant toggle to its fresh state.
    pub(crate) fn add(&mut self, effect: StatusEffect) -> EffectApply {
        if let Some(existing) = self.effects.iter_mut().find(|e| e.kind == effect.kind) {
            *existing = effect;
            EffectApply::Refreshed
        } else {
            self.effects.push(effect);
            EffectApply::Fresh
        }
    }

    pub(crate) fn remove(&mut self, kind: EffectKind) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| e.kind != kind);
        self.effects.len() < before
    }

    pub fn has(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|e| e.kind == kind)
    }

    pub fn get(&self, kind: EffectKind) -> Option<&StatusEffect> {
        self.effects.iter().find(|e| e.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Net attack adjustment from everything active
    pub fn attack_bonus_modifier(&self) -> i32 {
        self.effects
            .iter()
            .map(|e| e.kind.attack_bonus_modifier())
            .sum()
    }

    /// The owner can do nothing at all this turn
    pub fn blocks_actions(&self) -> bool {
        self.effects.iter().any(|e| e.kind.blocks_actions())
    }

    pub fn is_channeling(&self) -> bool {
        self.effects.iter().any(|e| e.is_channeling())
    }

    /// Knockback cannot displace the owner
    pub fn anchored(&self) -> bool {
        self.effects.iter().any(|e| e.kind.anchors())
    }

    /// Decide one movement attempt and advance any alternating toggle.
    ///
    /// Hard blocks win and are checked first; a hard-blocked attempt never
    /// reaches the chant, so its toggle does not move.
    pub(crate) fn gate_movement(&mut self) -> MoveDecision {
        if let Some(blocker) = self.effects.iter().find(|e| e.kind.hard_blocks_movement()) {
            return MoveDecision::HardBlocked(blocker.kind);
        }
        if let Some(tax) = self
            .effects
            .iter_mut()
            .find(|e| e.kind.taxes_movement())
        {
            return match tax.tax_phase.flip() {
                TaxPhase::Allow => MoveDecision::TaxAllowed,
                TaxPhase::Deny => MoveDecision::TaxDenied,
            };
        }
        MoveDecision::Allowed
    }

    /// Break any channel in progress. Returns whether one was broken.
    pub(crate) fn interrupt_channel(&mut self) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| !e.is_channeling());
        self.effects.len() < before
    }

    /// Tick every effect for one owner turn start.
    ///
    /// Damage payloads are collected before expiry is applied, so an effect
    /// on its last turn still deals its final tick.
    pub(crate) fn begin_turn_tick(&mut self) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        for effect in &mut self.effects {
            if effect.kind.is_dot() {
                outcome.dots.push((effect.kind, effect.tick_damage));
            }
            effect.duration.tick();
        }
        self.effects.retain(|e| {
            if e.duration.is_expired() {
                outcome.expired.push(e.kind);
                false
            } else {
                true
            }
        });
        outcome
    }
}

// ============================================================================
// Engine operations
// ============================================================================

impl Engine {
    /// Apply an effect to a living entity.
    ///
    /// Applying a kind that is already present refreshes it in place instead
    /// of stacking. Applying anything to a corpse is ignored and says so.
    pub fn add_effect(
        &mut self,
        owner: &mut Entity,
        effect: StatusEffect,
    ) -> Result<EffectApply, EngineError> {
        if owner.is_dead() {
            return Ok(EffectApply::Ignored);
        }
        effect.validate()?;
        Ok(self.apply_effect_internal(owner, effect))
    }

    /// Strip an effect early. Returns whether anything was removed.
    pub fn remove_effect(&mut self, owner: &mut Entity, kind: EffectKind) -> bool {
        let removed = owner.effects.remove(kind);
        if removed {
            self.push_event(CombatEvent::EffectRemoved {
                target: owner.name.clone(),
                kind,
            });
        }
        removed
    }

    pub fn has_effect(&self, owner: &Entity, kind: EffectKind) -> bool {
        owner.effects.has(kind)
    }

    /// Run the owner's turn-start effect tick.
    ///
    /// Damage-over-time payloads route through the normal damage path, so
    /// resistances, lethality and interrupts all behave as if the damage came
    /// from anywhere else. Returns the events this tick produced, in order.
    pub fn process_turn_start(
        &mut self,
        owner: &mut Entity,
        authority: &mut dyn TurnAuthority,
    ) -> Vec<CombatEvent> {
        if owner.is_dead() {
            return Vec::new();
        }
        let turn = self.turn();
        if owner.last_tick_turn == Some(turn) {
            // Ticking the same entity twice in one turn is a driver bug.
            debug_assert!(false, "{} ticked twice on turn {turn}", owner.name);
            return Vec::new();
        }
        owner.last_tick_turn = Some(turn);

        let start = self.pending_count();
        let outcome = owner.effects.begin_turn_tick();
        for (kind, amount) in outcome.dots {
            self.metrics_mut().record_tick(kind);
            // A corpse partway through the list shrugs off the rest.
            self.apply_damage(owner, amount, DamageCause::Effect(kind), authority);
        }
        for kind in outcome.expired {
            self.push_event(CombatEvent::EffectExpired {
                target: owner.name.clone(),
                kind,
            });
        }
        self.events_since(start)
    }

    /// The one place effects actually land: set mutation, metrics and the
    /// event all happen here, for callers inside the crate too.
    pub(crate) fn apply_effect_internal(
        &mut self,
        owner: &mut Entity,
        effect: StatusEffect,
    ) -> EffectApply {
        let applied = owner.effects.add(effect);
        self.metrics_mut().record_application(effect.kind);
        self.push_event(CombatEvent::EffectApplied {
            target: owner.name.clone(),
            kind: effect.kind,
            refreshed: applied == EffectApply::Refreshed,
        });
        applied
    }
}
