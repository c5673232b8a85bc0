//! Combat metrics
//!
//! Cheap counters bumped at the single site each thing happens: attacks at
//! the resolver, damage at the damage path, effect counters at application
//! and tick time. Drivers read them out or merge them across bouts.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::combat::{DamageCause, OutcomeKind};
use crate::effect::EffectKind;

/// How a knockback resolution ended
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum KnockbackCategory {
    /// Covered the full nominal distance
    Clean,
    WallImpact,
    EntityImpact,
    /// The target was anchored and never moved
    Anchored,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombatMetrics {
    pub attacks: u64,
    pub hits: u64,
    pub crits: u64,
    pub fumbles: u64,
    /// Hit points removed across all causes, after scaling
    pub damage_total: u64,
    pub deaths: u64,

    applications: HashMap<EffectKind, u64>,
    ticks: HashMap<EffectKind, u64>,
    effect_damage: HashMap<EffectKind, u64>,
    knockbacks: HashMap<KnockbackCategory, u64>,
}

impl CombatMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Misses are implied rather than counted
    pub fn misses(&self) -> u64 {
        self.attacks - self.hits - self.crits - self.fumbles
    }

    /// Times this kind was applied or refreshed
    pub fn applications(&self, kind: EffectKind) -> u64 {
        self.applications.get(&kind).copied().unwrap_or(0)
    }

    /// Times this kind ticked at a turn start
    pub fn ticks(&self, kind: EffectKind) -> u64 {
        self.ticks.get(&kind).copied().unwrap_or(0)
    }

    /// Hit points this kind actually removed
    pub fn effect_damage(&self, kind: EffectKind) -> u64 {
        self.effect_damage.get(&kind).copied().unwrap_or(0)
    }

    pub fn knockbacks(&self, category: KnockbackCategory) -> u64 {
        self.knockbacks.get(&category).copied().unwrap_or(0)
    }

    /// Fold another run's counters into this one
    pub fn merge(&mut self, other: &CombatMetrics) {
        self.attacks += other.attacks;
        self.hits += other.hits;
        self.crits += other.crits;
        self.fumbles += other.fumbles;
        self.damage_total += other.damage_total;
        self.deaths += other.deaths;
        for (kind, n) in &other.applications {
            *self.applications.entry(*kind).or_default() += n;
        }
        for (kind, n) in &other.ticks {
            *self.ticks.entry(*kind).or_default() += n;
        }
        for (kind, n) in &other.effect_damage {
            *self.effect_damage.entry(*kind).or_default() += n;
        }
        for (category, n) in &other.knockbacks {
            *self.knockbacks.entry(*category).or_default() += n;
        }
    }

    pub(crate) fn record_attack(&mut self, kind: OutcomeKind) {
        self.attacks += 1;
        match kind {
            OutcomeKind::Hit => self.hits += 1,
            OutcomeKind::Critical => self.crits += 1,
            OutcomeKind::Fumble => self.fumbles += 1,
            OutcomeKind::Miss => {}
        }
    }

    pub(crate) fn record_damage(&mut self, cause: DamageCause, applied: i32) {
        self.damage_total += applied as u64;
        if let DamageCause::Effect(kind) = cause {
            *self.effect_damage.entry(kind).or_default() += applied as u64;
        }
    }

    pub(crate) fn record_application(&mut self, kind: EffectKind) {
        *self.applications.entry(kind).or_default() += 1;
    }

    pub(crate) fn record_tick(&mut self, kind: EffectKind) {
        *self.ticks.entry(kind).or_default() += 1;
    }

    pub(crate) fn record_knockback(&mut self, category: KnockbackCategory) {
        *self.knockbacks.entry(category).or_default() += 1;
    }

    pub(crate) fn record_death(&mut self) {
        self.deaths += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_outcomes_bucketed() {
        let mut metrics = CombatMetrics::new();
        metrics.record_attack(OutcomeKind::Hit);
        metrics.record_attack(OutcomeKind::Hit);
        metrics.record_attack(OutcomeKind::Critical);
        metrics.record_attack(OutcomeKind::Miss);
        metrics.record_attack(OutcomeKind::Fumble);
        assert_eq!(metrics.attacks, 5);
        assert_eq!(metrics.hits, 2);
        assert_eq!(metrics.crits, 1);
        assert_eq!(metrics.fumbles, 1);
        assert_eq!(metrics.misses(), 1);
    }

    #[test]
    fn test_effect_damage_split_by_kind() {
        let mut metrics = CombatMetrics::new();
        metrics.record_damage(DamageCause::Attack, 10);
        metrics.record_damage(DamageCause::Effect(EffectKind::Poison), 3);
        metrics.record_damage(DamageCause::Effect(EffectKind::Poison), 3);
        metrics.record_damage(DamageCause::Effect(EffectKind::Burning), 5);
        assert_eq!(metrics.damage_total, 21);
        assert_eq!(metrics.effect_damage(EffectKind::Poison), 6);
        assert_eq!(metrics.effect_damage(EffectKind::Burning), 5);
        assert_eq!(metrics.effect_damage(EffectKind::Slow), 0);
    }

    #[test]
    fn test_merge_is_additive() {
        let mut left = CombatMetrics::new();
        left.record_attack(OutcomeKind::Hit);
        left.record_application(EffectKind::Poison);
        left.record_knockback(KnockbackCategory::Clean);

        let mut right = CombatMetrics::new();
        right.record_attack(OutcomeKind::Critical);
        right.record_application(EffectKind::Poison);
        right.record_knockback(KnockbackCategory::WallImpact);
        right.record_death();

        left.merge(&right);
        assert_eq!(left.attacks, 2);
        assert_eq!(left.applications(EffectKind::Poison), 2);
        assert_eq!(left.knockbacks(KnockbackCategory::Clean), 1);
        assert_eq!(left.knockbacks(KnockbackCategory::WallImpact), 1);
        assert_eq!(left.deaths, 1);
    }

    #[test]
    fn test_metrics_serde_round_trip() {
        let mut metrics = CombatMetrics::new();
        metrics.record_attack(OutcomeKind::Hit);
        metrics.record_damage(DamageCause::Effect(EffectKind::Burning), 4);
        metrics.record_tick(EffectKind::Burning);
        let json = serde_json::to_string(&metrics).unwrap();
        let back: CombatMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.attacks, 1);
        assert_eq!(back.effect_damage(EffectKind::Burning), 4);
        assert_eq!(back.ticks(EffectKind::Burning), 1);
    }
}
