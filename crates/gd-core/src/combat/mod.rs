//! Combat resolution
//!
//! Split into three concerns: attack checks (`attack`), the single hit-point
//! mutation path (`damage`), and forced displacement (`knockback`).

mod attack;
mod damage;
mod knockback;

pub use attack::{check_beats_ac, effective_attack_bonus, resolve_attack, AttackReport};
pub use damage::scale_damage;
pub use knockback::{knockback_distance, ImpactKind, KnockbackResult};

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter};

use crate::effect::EffectKind;
use crate::entity::ResistFlags;

/// Damage categories matched against resistance and immunity tags
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DamageCategory {
    Physical,
    Fire,
    Cold,
    Poison,
    Arcane,
}

impl DamageCategory {
    pub const fn flag(self) -> ResistFlags {
        match self {
            DamageCategory::Physical => ResistFlags::PHYSICAL,
            DamageCategory::Fire => ResistFlags::FIRE,
            DamageCategory::Cold => ResistFlags::COLD,
            DamageCategory::Poison => ResistFlags::POISON,
            DamageCategory::Arcane => ResistFlags::ARCANE,
        }
    }
}

/// Where a damage application came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageCause {
    /// A resolved weapon attack
    Attack,
    /// A status effect ticking on its owner's turn
    Effect(EffectKind),
    /// Environmental damage of the given category
    Hazard(DamageCategory),
}

impl DamageCause {
    /// Category used for the defender's resistance lookup
    pub const fn category(self) -> DamageCategory {
        match self {
            DamageCause::Attack => DamageCategory::Physical,
            DamageCause::Effect(kind) => kind.damage_category(),
            DamageCause::Hazard(category) => category,
        }
    }
}

impl fmt::Display for DamageCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DamageCause::Attack => write!(f, "weapon"),
            DamageCause::Effect(kind) => write!(f, "{kind}"),
            DamageCause::Hazard(category) => write!(f, "{category} hazard"),
        }
    }
}

/// How much of a damage category gets through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResistLevel {
    Normal,
    /// Half damage, rounded down
    Resistant,
    /// No damage at all
    Immune,
}

/// Result categories for a single attack check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum OutcomeKind {
    Hit,
    /// Top roll: always connects, doubles raw damage
    Critical,
    Miss,
    /// Bottom roll: always misses, regardless of bonuses
    Fumble,
}

impl OutcomeKind {
    pub const fn connects(self) -> bool {
        matches!(self, OutcomeKind::Hit | OutcomeKind::Critical)
    }
}

/// Outcome of one attack check, before any damage is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatOutcome {
    pub kind: OutcomeKind,
    /// The raw die face that decided the outcome
    pub roll: u32,
    /// Raw damage rolled from the attacker's profile; zero on a miss
    pub raw_damage: i32,
    /// The attacker's profile wants a knockback follow-up
    pub knockback_requested: bool,
}

impl CombatOutcome {
    pub const fn miss(roll: u32) -> Self {
        Self {
            kind: OutcomeKind::Miss,
            roll,
            raw_damage: 0,
            knockback_requested: false,
        }
    }

    pub const fn fumble(roll: u32) -> Self {
        Self {
            kind: OutcomeKind::Fumble,
            roll,
            raw_damage: 0,
            knockback_requested: false,
        }
    }

    pub const fn connects(&self) -> bool {
        self.kind.connects()
    }
}

/// What a single damage application actually did to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageResult {
    /// Hit points removed after resistance scaling and clamping
    pub applied: i32,
    /// This application reduced the target to zero
    pub lethal: bool,
    /// The target was dead before this call; nothing happened
    pub already_dead: bool,
    /// A channel was broken by this application
    pub interrupted: bool,
}

impl DamageResult {
    /// Damage aimed at a corpse
    pub const ALREADY_DEAD: DamageResult = DamageResult {
        applied: 0,
        lethal: false,
        already_dead: true,
        interrupted: false,
    };

    /// Nothing got through
    pub const NONE: DamageResult = DamageResult {
        applied: 0,
        lethal: false,
        already_dead: false,
        interrupted: false,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_category_mapping() {
        assert_eq!(DamageCause::Attack.category(), DamageCategory::Physical);
        assert_eq!(
            DamageCause::Effect(EffectKind::Poison).category(),
            DamageCategory::Poison
        );
        assert_eq!(
            DamageCause::Effect(EffectKind::Burning).category(),
            DamageCategory::Fire
        );
        assert_eq!(
            DamageCause::Hazard(DamageCategory::Cold).category(),
            DamageCategory::Cold
        );
    }

    #[test]
    fn test_outcome_kind_connects() {
        assert!(OutcomeKind::Hit.connects());
        assert!(OutcomeKind::Critical.connects());
        assert!(!OutcomeKind::Miss.connects());
        assert!(!OutcomeKind::Fumble.connects());
    }

    #[test]
    fn test_cause_display() {
        assert_eq!(DamageCause::Attack.to_string(), "weapon");
        assert_eq!(
            DamageCause::Effect(EffectKind::Burning).to_string(),
            "burning"
        );
        assert_eq!(
            DamageCause::Hazard(DamageCategory::Fire).to_string(),
            "fire hazard"
        );
    }

    #[test]
    fn test_every_category_has_a_flag() {
        use strum::IntoEnumIterator;
        for category in DamageCategory::iter() {
            assert!(!category.flag().is_empty());
        }
    }
}
