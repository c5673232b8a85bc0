//! Combatant entities
//!
//! Entities are created by external spawn logic and mutated only through the
//! engine: hit points go down through damage application and up through
//! healing, never by direct field writes.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::combat::{DamageCategory, ResistLevel};
use crate::effect::EffectSet;
use crate::rng::GameRng;

/// Unique identifier for entity instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    pub const NONE: EntityId = EntityId(0);

    pub fn next(self) -> Self {
        EntityId(self.0 + 1)
    }
}

/// Tile coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The tile one step away in the given direction
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

bitflags! {
    /// Damage-category tags for resistance and immunity lookups
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ResistFlags: u8 {
        const PHYSICAL = 0x01;
        const FIRE = 0x02;
        const COLD = 0x04;
        const POISON = 0x08;
        const ARCANE = 0x10;
    }
}

// Manual serde for ResistFlags
impl Serialize for ResistFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResistFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(ResistFlags::from_bits_truncate(bits))
    }
}

/// Configuration-supplied weapon damage formula
///
/// Raw damage is data, not code: spawn logic decides the dice, the resolver
/// only rolls them and applies critical doubling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageProfile {
    /// Number of damage dice
    pub dice_num: u8,
    /// Sides per damage die
    pub dice_sides: u8,
    /// Flat bonus added after the roll
    pub bonus: i32,
    /// Request a knockback follow-up whenever this profile connects
    #[serde(default)]
    pub knockback: bool,
}

impl DamageProfile {
    pub const fn new(dice_num: u8, dice_sides: u8, bonus: i32) -> Self {
        Self {
            dice_num,
            dice_sides,
            bonus,
            knockback: false,
        }
    }

    pub const fn with_knockback(mut self) -> Self {
        self.knockback = true;
        self
    }

    /// Reject profiles that can never roll anything
    pub fn validate(&self) -> Result<(), crate::EngineError> {
        if self.dice_num == 0 || self.dice_sides == 0 {
            return Err(crate::EngineError::EmptyDamageProfile {
                dice_num: self.dice_num,
                dice_sides: self.dice_sides,
            });
        }
        Ok(())
    }

    /// Roll the profile. Never negative.
    pub fn roll(&self, rng: &mut GameRng) -> i32 {
        let rolled = rng.dice(self.dice_num as u32, self.dice_sides as u32) as i32;
        (rolled + self.bonus).max(0)
    }

    /// Expected damage per connecting swing
    pub fn average(&self) -> f32 {
        if self.dice_sides == 0 {
            return 0.0;
        }
        self.dice_num as f32 * (self.dice_sides as f32 + 1.0) / 2.0 + self.bonus as f32
    }
}

/// A combatant
///
/// `hp` and the dead flag are private: the only way hit points move is the
/// engine's damage and healing paths, so every lethal outcome funnels through
/// one finalization site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,

    hp: i32,
    pub hp_max: i32,

    /// Ascending armor class: a check must exceed this to hit
    pub armor_class: i32,
    pub attack_bonus: i32,

    /// Used for knockback distance comparisons
    pub power: i32,

    pub pos: Pos,

    /// Half damage from these categories
    pub resistances: ResistFlags,
    /// No damage from these categories
    pub immunities: ResistFlags,

    pub damage: DamageProfile,

    /// Player-controlled; a lethal hit here ends the session
    pub player: bool,

    dead: bool,

    /// Turn this entity last ticked its effects; guards double ticking
    pub(crate) last_tick_turn: Option<u64>,

    pub effects: EffectSet,
}

impl Entity {
    pub fn new(id: EntityId, name: impl Into<String>, hp_max: i32, damage: DamageProfile) -> Self {
        Self {
            id,
            name: name.into(),
            hp: hp_max,
            hp_max,
            armor_class: 10,
            attack_bonus: 0,
            power: 0,
            pos: Pos::default(),
            resistances: ResistFlags::empty(),
            immunities: ResistFlags::empty(),
            damage,
            player: false,
            dead: false,
            last_tick_turn: None,
            effects: EffectSet::new(),
        }
    }

    pub fn with_armor_class(mut self, armor_class: i32) -> Self {
        self.armor_class = armor_class;
        self
    }

    pub fn with_attack_bonus(mut self, attack_bonus: i32) -> Self {
        self.attack_bonus = attack_bonus;
        self
    }

    pub fn with_power(mut self, power: i32) -> Self {
        self.power = power;
        self
    }

    pub fn with_pos(mut self, x: i32, y: i32) -> Self {
        self.pos = Pos::new(x, y);
        self
    }

    pub fn with_resistance(mut self, tags: ResistFlags) -> Self {
        self.resistances |= tags;
        self
    }

    pub fn with_immunity(mut self, tags: ResistFlags) -> Self {
        self.immunities |= tags;
        self
    }

    pub fn player_controlled(mut self) -> Self {
        self.player = true;
        self
    }

    /// Current hit points
    pub const fn hp(&self) -> i32 {
        self.hp
    }

    pub const fn is_dead(&self) -> bool {
        self.dead
    }

    /// Immunity wins over resistance when an entity carries both tags
    pub fn resist_level(&self, category: DamageCategory) -> ResistLevel {
        let tag = category.flag();
        if self.immunities.contains(tag) {
            ResistLevel::Immune
        } else if self.resistances.contains(tag) {
            ResistLevel::Resistant
        } else {
            ResistLevel::Normal
        }
    }

    /// Whether an interruptible channel is in progress
    pub fn is_channeling(&self) -> bool {
        self.effects.is_channeling()
    }

    // Hit-point mutation is crate-private: combat::damage is the only caller.

    pub(crate) fn reduce_hp(&mut self, amount: i32) {
        self.hp = (self.hp - amount).max(0);
    }

    /// Restore hit points up to the maximum, returning the amount gained
    pub(crate) fn restore_hp(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = (self.hp + amount).min(self.hp_max);
        self.hp - before
    }

    pub(crate) fn mark_dead(&mut self) {
        self.dead = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat() -> Entity {
        Entity::new(EntityId(1), "giant rat", 8, DamageProfile::new(1, 4, 0))
    }

    #[test]
    fn test_new_entity_starts_at_full_health() {
        let rat = rat();
        assert_eq!(rat.hp(), 8);
        assert_eq!(rat.hp_max, 8);
        assert!(!rat.is_dead());
        assert_eq!(rat.armor_class, 10);
    }

    #[test]
    fn test_entity_id_next() {
        let id = EntityId::NONE;
        assert_eq!(id.next(), EntityId(1));
        assert_eq!(id.next().next(), EntityId(2));
    }

    #[test]
    fn test_immunity_wins_over_resistance() {
        let rat = rat()
            .with_resistance(ResistFlags::FIRE)
            .with_immunity(ResistFlags::FIRE);
        assert_eq!(rat.resist_level(DamageCategory::Fire), ResistLevel::Immune);
        assert_eq!(
            rat.resist_level(DamageCategory::Poison),
            ResistLevel::Normal
        );
    }

    #[test]
    fn test_resistance_lookup_per_category() {
        let rat = rat().with_resistance(ResistFlags::COLD | ResistFlags::POISON);
        assert_eq!(
            rat.resist_level(DamageCategory::Cold),
            ResistLevel::Resistant
        );
        assert_eq!(
            rat.resist_level(DamageCategory::Poison),
            ResistLevel::Resistant
        );
        assert_eq!(rat.resist_level(DamageCategory::Fire), ResistLevel::Normal);
    }

    #[test]
    fn test_profile_roll_bounds() {
        let mut rng = GameRng::new(42);
        let profile = DamageProfile::new(2, 6, 1);
        for _ in 0..500 {
            let dmg = profile.roll(&mut rng);
            assert!((3..=13).contains(&dmg));
        }
    }

    #[test]
    fn test_profile_roll_never_negative() {
        let mut rng = GameRng::new(42);
        let profile = DamageProfile::new(1, 2, -10);
        for _ in 0..100 {
            assert_eq!(profile.roll(&mut rng), 0);
        }
    }

    #[test]
    fn test_profile_validation() {
        assert!(DamageProfile::new(1, 6, 0).validate().is_ok());
        assert!(DamageProfile::new(0, 6, 0).validate().is_err());
        assert!(DamageProfile::new(1, 0, 0).validate().is_err());
    }

    #[test]
    fn test_profile_average() {
        assert_eq!(DamageProfile::new(2, 6, 0).average(), 7.0);
        assert_eq!(DamageProfile::new(1, 4, 2).average(), 4.5);
    }

    #[test]
    fn test_resist_flags_serde_round_trip() {
        let flags = ResistFlags::FIRE | ResistFlags::ARCANE;
        let json = serde_json::to_string(&flags).unwrap();
        let back: ResistFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(flags, back);
    }
}
