//! Engine core
//!
//! Owns the dice, the global turn counter, the pending event queue and the
//! metrics. Geometry and session lifecycle stay behind the [`MoveGate`] and
//! [`TurnAuthority`] seams so the engine never reaches around its callers.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::effect::{EffectKind, MoveDecision};
use crate::entity::{Entity, EntityId, Pos};
use crate::event::CombatEvent;
use crate::metrics::CombatMetrics;
use crate::rng::GameRng;

/// Ways a session can end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum TerminalKind {
    Defeat,
    Victory,
}

/// The one object allowed to end the session.
///
/// The damage path asks it for a terminal transition when a player dies;
/// everything else only reads `is_terminal`.
pub trait TurnAuthority {
    fn is_terminal(&self) -> bool;
    fn request_terminal_transition(&mut self, entity: EntityId, kind: TerminalKind);
}

/// World geometry and occupancy, owned by the caller.
///
/// `can_enter` answers for terrain and occupancy together; `occupant` lets
/// the engine tell a body from a wall when a tile refuses entry.
pub trait MoveGate {
    fn can_enter(&self, tile: Pos) -> bool;
    fn occupant(&self, tile: Pos) -> Option<EntityId>;
    /// Commit a displacement. Returning false refuses it without comment.
    fn move_to(&mut self, entity: EntityId, to: Pos) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Active { turn_of: EntityId },
    /// Entered once; the session never leaves it
    Terminal(TerminalKind),
}

/// Session lifecycle authority.
///
/// Terminal is absorbing: the first transition wins and every later turn
/// grant or transition request is refused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    phase: SessionPhase,
    terminal_entity: Option<EntityId>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Active {
                turn_of: EntityId::NONE,
            },
            terminal_entity: None,
        }
    }

    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The entity whose death or victory ended the session
    pub const fn terminal_entity(&self) -> Option<EntityId> {
        self.terminal_entity
    }

    /// Hand the turn to an entity. Checks and claims in one call; returns
    /// false once the session is terminal.
    pub fn begin_turn(&mut self, entity: EntityId) -> bool {
        match self.phase {
            SessionPhase::Terminal(_) => false,
            SessionPhase::Active { .. } => {
                self.phase = SessionPhase::Active { turn_of: entity };
                true
            }
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnAuthority for SessionState {
    fn is_terminal(&self) -> bool {
        matches!(self.phase, SessionPhase::Terminal(_))
    }

    fn request_terminal_transition(&mut self, entity: EntityId, kind: TerminalKind) {
        // First cause wins.
        if self.is_terminal() {
            return;
        }
        self.phase = SessionPhase::Terminal(kind);
        self.terminal_entity = Some(entity);
    }
}

/// Outcome of one voluntary movement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// An effect denied the step outright
    EffectBlocked(EffectKind),
    /// The chant toggle ate this attempt
    TaxDenied,
    /// The gate refused the destination tile
    TerrainBlocked,
}

/// The combat engine
///
/// Holds no entities: combatants live with the caller and are lent in per
/// call, which keeps the engine serializable and the borrows simple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engine {
    pub rng: GameRng,
    turn: u64,
    /// Events since the last drain
    #[serde(skip)]
    events: Vec<CombatEvent>,
    history: Vec<CombatEvent>,
    metrics: CombatMetrics,
}

impl Engine {
    pub fn new(rng: GameRng) -> Self {
        Self {
            rng,
            turn: 0,
            events: Vec::new(),
            history: Vec::new(),
            metrics: CombatMetrics::new(),
        }
    }

    pub const fn turn(&self) -> u64 {
        self.turn
    }

    /// Bump the global turn counter. Drivers call this once per round,
    /// before handing out individual turns.
    pub fn advance_turn(&mut self) -> u64 {
        self.turn += 1;
        self.turn
    }

    /// Take everything that happened since the last drain, in order
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    /// Every event since the engine was created, drains included
    pub fn event_history(&self) -> &[CombatEvent] {
        &self.history
    }

    pub const fn metrics(&self) -> &CombatMetrics {
        &self.metrics
    }

    /// One voluntary step for a living entity.
    ///
    /// Effect gating and the chant toggle advance in this single call, so a
    /// caller can never observe the toggle between check and flip. Any
    /// non-`Moved` outcome still counts as the actor's attempt for the turn.
    pub fn attempt_move(
        &mut self,
        owner: &mut Entity,
        to: Pos,
        gate: &mut dyn MoveGate,
    ) -> MoveOutcome {
        debug_assert!(!owner.is_dead(), "{} is moving while dead", owner.name);
        if owner.is_dead() {
            return MoveOutcome::TerrainBlocked;
        }
        match owner.effects.gate_movement() {
            MoveDecision::HardBlocked(kind) => {
                self.push_event(CombatEvent::MoveBlocked {
                    target: owner.name.clone(),
                    kind,
                });
                return MoveOutcome::EffectBlocked(kind);
            }
            MoveDecision::TaxDenied => {
                self.push_event(CombatEvent::MoveTaxed {
                    target: owner.name.clone(),
                    allowed: false,
                });
                return MoveOutcome::TaxDenied;
            }
            MoveDecision::TaxAllowed => {
                self.push_event(CombatEvent::MoveTaxed {
                    target: owner.name.clone(),
                    allowed: true,
                });
            }
            MoveDecision::Allowed => {}
        }
        if !gate.can_enter(to) || !gate.move_to(owner.id, to) {
            return MoveOutcome::TerrainBlocked;
        }
        owner.pos = to;
        MoveOutcome::Moved
    }

    pub(crate) fn push_event(&mut self, event: CombatEvent) {
        self.history.push(event.clone());
        self.events.push(event);
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn events_since(&self, start: usize) -> Vec<CombatEvent> {
        self.events.get(start..).map(<[_]>::to_vec).unwrap_or_default()
    }

    pub(crate) fn metrics_mut(&mut self) -> &mut CombatMetrics {
        &mut self.metrics
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(GameRng::from_entropy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::StatusEffect;
    use crate::entity::DamageProfile;

    struct OpenFloor;

    impl MoveGate for OpenFloor {
        fn can_enter(&self, _tile: Pos) -> bool {
            true
        }
        fn occupant(&self, _tile: Pos) -> Option<EntityId> {
            None
        }
        fn move_to(&mut self, _entity: EntityId, _to: Pos) -> bool {
            true
        }
    }

    struct SealedRoom;

    impl MoveGate for SealedRoom {
        fn can_enter(&self, _tile: Pos) -> bool {
            false
        }
        fn occupant(&self, _tile: Pos) -> Option<EntityId> {
            None
        }
        fn move_to(&mut self, _entity: EntityId, _to: Pos) -> bool {
            false
        }
    }

    fn wisp() -> Entity {
        Entity::new(EntityId(1), "wisp", 10, DamageProfile::new(1, 4, 0))
    }

    #[test]
    fn test_turn_counter_advances() {
        let mut engine = Engine::new(GameRng::new(1));
        assert_eq!(engine.turn(), 0);
        assert_eq!(engine.advance_turn(), 1);
        assert_eq!(engine.advance_turn(), 2);
    }

    #[test]
    fn test_drain_empties_pending_but_keeps_history() {
        let mut engine = Engine::new(GameRng::new(1));
        engine.push_event(CombatEvent::Interrupted {
            target: "wisp".into(),
        });
        assert_eq!(engine.drain_events().len(), 1);
        assert!(engine.drain_events().is_empty());
        assert_eq!(engine.event_history().len(), 1);
    }

    #[test]
    fn test_session_refuses_turns_once_terminal() {
        let mut session = SessionState::new();
        assert!(session.begin_turn(EntityId(1)));
        session.request_terminal_transition(EntityId(1), TerminalKind::Defeat);
        assert!(!session.begin_turn(EntityId(2)));
        assert_eq!(session.phase(), SessionPhase::Terminal(TerminalKind::Defeat));
    }

    #[test]
    fn test_first_terminal_cause_wins() {
        let mut session = SessionState::new();
        session.request_terminal_transition(EntityId(1), TerminalKind::Defeat);
        session.request_terminal_transition(EntityId(2), TerminalKind::Victory);
        assert_eq!(session.phase(), SessionPhase::Terminal(TerminalKind::Defeat));
        assert_eq!(session.terminal_entity(), Some(EntityId(1)));
    }

    #[test]
    fn test_unencumbered_move_succeeds() {
        let mut engine = Engine::new(GameRng::new(1));
        let mut wisp = wisp();
        let outcome = engine.attempt_move(&mut wisp, Pos::new(1, 0), &mut OpenFloor);
        assert_eq!(outcome, MoveOutcome::Moved);
        assert_eq!(wisp.pos, Pos::new(1, 0));
    }

    #[test]
    fn test_entangle_denies_the_step() {
        let mut engine = Engine::new(GameRng::new(1));
        let mut wisp = wisp();
        wisp.effects.add(StatusEffect::entangle(3));
        let outcome = engine.attempt_move(&mut wisp, Pos::new(1, 0), &mut OpenFloor);
        assert_eq!(outcome, MoveOutcome::EffectBlocked(EffectKind::Entangle));
        assert_eq!(wisp.pos, Pos::new(0, 0));
    }

    #[test]
    fn test_chanting_mover_alternates() {
        let mut engine = Engine::new(GameRng::new(1));
        let mut wisp = wisp();
        wisp.effects.add(StatusEffect::chant(100));
        let mut gate = OpenFloor;
        let mut x = 0;
        let mut outcomes = Vec::new();
        for _ in 0..4 {
            let outcome = engine.attempt_move(&mut wisp, Pos::new(x + 1, 0), &mut gate);
            if outcome == MoveOutcome::Moved {
                x += 1;
            }
            outcomes.push(outcome);
        }
        assert_eq!(
            outcomes,
            vec![
                MoveOutcome::Moved,
                MoveOutcome::TaxDenied,
                MoveOutcome::Moved,
                MoveOutcome::TaxDenied,
            ]
        );
        assert_eq!(wisp.pos, Pos::new(2, 0));
    }

    #[test]
    fn test_sealed_room_blocks_terrain() {
        let mut engine = Engine::new(GameRng::new(1));
        let mut wisp = wisp();
        let outcome = engine.attempt_move(&mut wisp, Pos::new(1, 0), &mut SealedRoom);
        assert_eq!(outcome, MoveOutcome::TerrainBlocked);
        assert_eq!(wisp.pos, Pos::new(0, 0));
    }

    #[test]
    fn test_engine_serde_keeps_seed_and_turn() {
        let mut engine = Engine::new(GameRng::new(77));
        engine.advance_turn();
        engine.advance_turn();
        let json = serde_json::to_string(&engine).unwrap();
        let back: Engine = serde_json::from_str(&json).unwrap();
        assert_eq!(back.turn(), 2);
        assert_eq!(back.rng.seed(), 77);
    }
}
