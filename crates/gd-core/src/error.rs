//! Engine error types

use thiserror::Error;

use crate::effect::EffectKind;

/// Invalid-input rejections
///
/// These indicate a broken caller contract, not bad player input. Redundant
/// operations (hitting a corpse, re-removing an effect) are not errors; they
/// come back as distinguishable no-op results instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("{0} must last at least one turn")]
    ZeroDuration(EffectKind),

    #[error("{kind} ticks for {amount}, expected a positive amount")]
    NonPositiveTick { kind: EffectKind, amount: i32 },

    #[error("damage profile {dice_num}d{dice_sides} rolls nothing")]
    EmptyDamageProfile { dice_num: u8, dice_sides: u8 },
}
