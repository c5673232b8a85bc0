//! gd-core: Combat resolution and status-effect engine for Grimdelve
//!
//! All combat rules with no I/O dependencies: attack checks, the single
//! damage path, status effects, knockback and session lifecycle. The engine
//! owns dice, events and metrics; entities and the map live with the caller
//! and are lent in per call, so the whole thing stays pure and testable.

pub mod combat;
pub mod effect;
pub mod entity;
pub mod event;
pub mod metrics;

mod engine;
mod error;
mod rng;

pub use engine::{
    Engine, MoveGate, MoveOutcome, SessionPhase, SessionState, TerminalKind, TurnAuthority,
};
pub use error::EngineError;
pub use rng::GameRng;
