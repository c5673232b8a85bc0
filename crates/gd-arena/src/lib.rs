//! gd-arena: Scripted combat bouts for the Grimdelve engine
//!
//! Loads a scenario, lends its combatants to the engine round by round and
//! reports who was left standing. Meant for balance checks and soak runs,
//! not for play: the "AI" walks at the nearest foe and swings.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use thiserror::Error;

use gd_core::combat::DamageCategory;
use gd_core::effect::{EffectKind, StatusEffect};
use gd_core::entity::{DamageProfile, Entity, EntityId, Pos};
use gd_core::metrics::{CombatMetrics, KnockbackCategory};
use gd_core::{
    Engine, GameRng, MoveGate, SessionPhase, SessionState, TerminalKind, TurnAuthority,
};

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("cannot read scenario: {0}")]
    Io(String),
    #[error("malformed scenario: {0}")]
    Parse(String),
    #[error("bad scenario: {0}")]
    Invalid(String),
    #[error("engine rejected the scenario: {0}")]
    Engine(String),
}

// ============================================================================
// Scenario files
// ============================================================================

/// One scripted fight, as read from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub arena: MapSpec,
    pub combatants: Vec<CombatantSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSpec {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub walls: Vec<(i32, i32)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatantSpec {
    pub name: String,
    pub hp: i32,
    #[serde(default = "default_armor_class")]
    pub armor_class: i32,
    #[serde(default)]
    pub attack_bonus: i32,
    #[serde(default)]
    pub power: i32,
    pub damage: DamageProfile,
    #[serde(default)]
    pub resistances: Vec<DamageCategory>,
    #[serde(default)]
    pub immunities: Vec<DamageCategory>,
    #[serde(default)]
    pub player: bool,
    pub pos: (i32, i32),
    /// Applied before the first round
    #[serde(default)]
    pub opening_effects: Vec<EffectSpec>,
    /// Rider applied to the target whenever this combatant's damage lands
    #[serde(default)]
    pub on_hit_effect: Option<EffectSpec>,
}

fn default_armor_class() -> i32 {
    10
}

/// Effect description in scenario terms
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EffectSpec {
    pub kind: EffectKind,
    /// Ignored for permanent kinds
    #[serde(default)]
    pub turns: u32,
    /// Only meaningful for damaging kinds
    #[serde(default)]
    pub per_tick: i32,
}

impl EffectSpec {
    pub fn build(&self) -> Result<StatusEffect, ScenarioError> {
        let effect = match self.kind {
            EffectKind::Poison => StatusEffect::poison(self.turns, self.per_tick),
            EffectKind::Burning => StatusEffect::burning(self.turns, self.per_tick),
            EffectKind::Slow => StatusEffect::slow(self.turns),
            EffectKind::Entangle => StatusEffect::entangle(self.turns),
            EffectKind::Stagger => StatusEffect::stagger(self.turns),
            EffectKind::Oath => StatusEffect::oath(),
            EffectKind::Chant => StatusEffect::chant(self.turns),
        };
        effect
            .validate()
            .map_err(|e| ScenarioError::Invalid(e.to_string()))?;
        Ok(effect)
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path).map_err(|e| ScenarioError::Io(e.to_string()))?;
        let scenario: Scenario =
            serde_json::from_str(&text).map_err(|e| ScenarioError::Parse(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.combatants.len() < 2 {
            return Err(ScenarioError::Invalid(
                "a scenario needs at least two combatants".into(),
            ));
        }
        if self.arena.width <= 0 || self.arena.height <= 0 {
            return Err(ScenarioError::Invalid("the arena has no floor".into()));
        }
        let walls: HashSet<(i32, i32)> = self.arena.walls.iter().copied().collect();
        let mut taken = HashSet::new();
        for spec in &self.combatants {
            if spec.hp <= 0 {
                return Err(ScenarioError::Invalid(format!(
                    "{} needs positive hit points",
                    spec.name
                )));
            }
            spec.damage
                .validate()
                .map_err(|e| ScenarioError::Invalid(format!("{}: {e}", spec.name)))?;
            let (x, y) = spec.pos;
            if x < 0 || y < 0 || x >= self.arena.width || y >= self.arena.height {
                return Err(ScenarioError::Invalid(format!(
                    "{} starts outside the arena",
                    spec.name
                )));
            }
            if walls.contains(&spec.pos) {
                return Err(ScenarioError::Invalid(format!(
                    "{} starts inside a wall",
                    spec.name
                )));
            }
            if !taken.insert(spec.pos) {
                return Err(ScenarioError::Invalid(format!(
                    "{} starts on top of another combatant",
                    spec.name
                )));
            }
            for effect in &spec.opening_effects {
                effect.build()?;
            }
            if let Some(effect) = &spec.on_hit_effect {
                effect.build()?;
            }
        }
        Ok(())
    }
}

/// The stock fight used when no scenario file is given: a sworn hero
/// against a venomous bog adder.
pub fn builtin_duel() -> Scenario {
    Scenario {
        name: "duel".into(),
        arena: MapSpec {
            width: 12,
            height: 9,
            walls: Vec::new(),
        },
        combatants: vec![
            CombatantSpec {
                name: "hero".into(),
                hp: 32,
                armor_class: 13,
                attack_bonus: 5,
                power: 6,
                damage: DamageProfile::new(1, 8, 1),
                resistances: Vec::new(),
                immunities: Vec::new(),
                player: true,
                pos: (2, 4),
                opening_effects: vec![EffectSpec {
                    kind: EffectKind::Oath,
                    turns: 0,
                    per_tick: 0,
                }],
                on_hit_effect: None,
            },
            CombatantSpec {
                name: "bog adder".into(),
                hp: 26,
                armor_class: 12,
                attack_bonus: 3,
                power: 3,
                damage: DamageProfile::new(1, 4, 0),
                resistances: vec![DamageCategory::Poison],
                immunities: Vec::new(),
                player: false,
                pos: (9, 4),
                opening_effects: Vec::new(),
                on_hit_effect: Some(EffectSpec {
                    kind: EffectKind::Poison,
                    turns: 4,
                    per_tick: 2,
                }),
            },
        ],
    }
}

// ============================================================================
// Arena map
// ============================================================================

/// Flat-floor arena implementing the engine's move gate
pub struct ArenaMap {
    width: i32,
    height: i32,
    walls: HashSet<Pos>,
    positions: HashMap<EntityId, Pos>,
}

impl ArenaMap {
    pub fn from_spec(spec: &MapSpec) -> Self {
        Self {
            width: spec.width,
            height: spec.height,
            walls: spec
                .walls
                .iter()
                .map(|&(x, y)| Pos::new(x, y))
                .collect(),
            positions: HashMap::new(),
        }
    }

    pub fn place(&mut self, entity: EntityId, pos: Pos) {
        self.positions.insert(entity, pos);
    }

    /// The dead stop occupying their tile
    pub fn vacate(&mut self, entity: EntityId) {
        self.positions.remove(&entity);
    }

    fn in_bounds(&self, tile: Pos) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width && tile.y < self.height
    }
}

impl MoveGate for ArenaMap {
    fn can_enter(&self, tile: Pos) -> bool {
        self.in_bounds(tile) && !self.walls.contains(&tile) && self.occupant(tile).is_none()
    }

    fn occupant(&self, tile: Pos) -> Option<EntityId> {
        self.positions
            .iter()
            .find(|(_, pos)| **pos == tile)
            .map(|(id, _)| *id)
    }

    fn move_to(&mut self, entity: EntityId, to: Pos) -> bool {
        self.positions.insert(entity, to);
        true
    }
}

// ============================================================================
// Bouts
// ============================================================================

struct Fighter {
    entity: Entity,
    on_hit: Option<StatusEffect>,
}

/// What one bout produced
#[derive(Debug, Clone, Serialize)]
pub struct BoutReport {
    pub seed: u64,
    /// Rounds played
    pub turns: u64,
    /// How the session ended, if it did
    pub outcome: Option<TerminalKind>,
    /// The single combatant left standing, if there is one
    pub winner: Option<String>,
    pub metrics: CombatMetrics,
    /// Rendered log lines, in order
    pub log: Vec<String>,
}

/// Run one bout of the scenario to its end or the round cap.
pub fn run_bout(scenario: &Scenario, seed: u64, max_turns: u64) -> Result<BoutReport, ScenarioError> {
    scenario.validate()?;

    let mut engine = Engine::new(GameRng::new(seed));
    let mut session = SessionState::new();
    let mut map = ArenaMap::from_spec(&scenario.arena);
    let mut fighters = build_fighters(scenario, &mut engine, &mut map)?;
    let mut log = Vec::new();

    'rounds: for _ in 0..max_turns {
        engine.advance_turn();
        for i in 0..fighters.len() {
            if fighters[i].entity.is_dead() {
                continue;
            }
            if !session.begin_turn(fighters[i].entity.id) {
                break 'rounds;
            }
            engine.process_turn_start(&mut fighters[i].entity, &mut session);
            if fighters[i].entity.is_dead() {
                map.vacate(fighters[i].entity.id);
                continue;
            }
            if fighters[i].entity.effects.blocks_actions() {
                continue;
            }

            let Some(j) = nearest_foe(&fighters, i) else {
                continue;
            };
            if chebyshev(fighters[i].entity.pos, fighters[j].entity.pos) > 1 {
                let to = step_toward(fighters[i].entity.pos, fighters[j].entity.pos);
                engine.attempt_move(&mut fighters[i].entity, to, &mut map);
                continue;
            }

            let (actor, target) = pair_mut(&mut fighters, i, j);
            let report = engine
                .attack(&actor.entity, &mut target.entity, &mut session)
                .map_err(|e| ScenarioError::Engine(e.to_string()))?;
            if let (Some(damage), Some(rider)) = (report.damage, actor.on_hit) {
                if damage.applied > 0 && !target.entity.is_dead() {
                    engine
                        .add_effect(&mut target.entity, rider)
                        .map_err(|e| ScenarioError::Engine(e.to_string()))?;
                }
            }
            if report.knockback_pending() {
                engine.resolve_knockback(&actor.entity, &mut target.entity, &mut map);
            }
            if target.entity.is_dead() {
                map.vacate(target.entity.id);
            }
        }

        for event in engine.drain_events() {
            log.push(event.to_string());
        }
        if session.is_terminal() {
            break;
        }
        let mut living = fighters.iter().filter(|f| !f.entity.is_dead());
        if let (Some(last), None) = (living.next(), living.next()) {
            session.request_terminal_transition(last.entity.id, TerminalKind::Victory);
            break;
        }
    }

    for event in engine.drain_events() {
        log.push(event.to_string());
    }

    let outcome = match session.phase() {
        SessionPhase::Terminal(kind) => Some(kind),
        SessionPhase::Active { .. } => None,
    };
    let mut living = fighters.iter().filter(|f| !f.entity.is_dead());
    let winner = match (living.next(), living.next()) {
        (Some(f), None) => Some(f.entity.name.clone()),
        _ => None,
    };

    Ok(BoutReport {
        seed,
        turns: engine.turn(),
        outcome,
        winner,
        metrics: engine.metrics().clone(),
        log,
    })
}

fn build_fighters(
    scenario: &Scenario,
    engine: &mut Engine,
    map: &mut ArenaMap,
) -> Result<Vec<Fighter>, ScenarioError> {
    let mut fighters = Vec::with_capacity(scenario.combatants.len());
    let mut id = EntityId::NONE;
    for spec in &scenario.combatants {
        id = id.next();
        let mut entity = Entity::new(id, spec.name.clone(), spec.hp, spec.damage)
            .with_armor_class(spec.armor_class)
            .with_attack_bonus(spec.attack_bonus)
            .with_power(spec.power)
            .with_pos(spec.pos.0, spec.pos.1);
        for category in &spec.resistances {
            entity = entity.with_resistance(category.flag());
        }
        for category in &spec.immunities {
            entity = entity.with_immunity(category.flag());
        }
        if spec.player {
            entity = entity.player_controlled();
        }
        for effect_spec in &spec.opening_effects {
            engine
                .add_effect(&mut entity, effect_spec.build()?)
                .map_err(|e| ScenarioError::Engine(e.to_string()))?;
        }
        let on_hit = spec.on_hit_effect.map(|s| s.build()).transpose()?;
        map.place(entity.id, entity.pos);
        fighters.push(Fighter { entity, on_hit });
    }
    Ok(fighters)
}

fn nearest_foe(fighters: &[Fighter], i: usize) -> Option<usize> {
    let me = fighters[i].entity.pos;
    fighters
        .iter()
        .enumerate()
        .filter(|(j, f)| *j != i && !f.entity.is_dead())
        .min_by_key(|(_, f)| chebyshev(me, f.entity.pos))
        .map(|(j, _)| j)
}

fn chebyshev(a: Pos, b: Pos) -> i32 {
    (a.x - b.x).abs().max((a.y - b.y).abs())
}

fn step_toward(from: Pos, to: Pos) -> Pos {
    from.offset((to.x - from.x).signum(), (to.y - from.y).signum())
}

/// Disjoint mutable borrows of two fighters
fn pair_mut(fighters: &mut [Fighter], i: usize, j: usize) -> (&mut Fighter, &mut Fighter) {
    debug_assert_ne!(i, j);
    if i < j {
        let (left, right) = fighters.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = fighters.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

// ============================================================================
// Summaries
// ============================================================================

/// Counters folded across a run of bouts
#[derive(Debug, Default, Serialize)]
pub struct ArenaSummary {
    pub bouts: u64,
    /// Bouts that hit the round cap with more than one combatant standing
    pub unresolved: u64,
    pub wins: BTreeMap<String, u64>,
    pub metrics: CombatMetrics,
}

impl ArenaSummary {
    pub fn absorb(&mut self, report: &BoutReport) {
        self.bouts += 1;
        match &report.winner {
            Some(name) => *self.wins.entry(name.clone()).or_default() += 1,
            None => self.unresolved += 1,
        }
        self.metrics.merge(&report.metrics);
    }
}

/// Render the summary as the table the arena binary prints.
pub fn render_summary(summary: &ArenaSummary) -> String {
    let metrics = &summary.metrics;
    let mut out = String::new();
    out.push_str(&format!("=== arena summary ({} bouts) ===\n", summary.bouts));
    for (name, wins) in &summary.wins {
        out.push_str(&format!("{name}: {wins} wins\n"));
    }
    if summary.unresolved > 0 {
        out.push_str(&format!("unresolved: {}\n", summary.unresolved));
    }
    out.push_str(&format!(
        "attacks: {} (hits {}, crits {}, fumbles {}, misses {})\n",
        metrics.attacks,
        metrics.hits,
        metrics.crits,
        metrics.fumbles,
        metrics.misses()
    ));
    out.push_str(&format!(
        "damage dealt: {}, deaths: {}\n",
        metrics.damage_total, metrics.deaths
    ));
    for kind in EffectKind::iter() {
        let applications = metrics.applications(kind);
        if applications == 0 {
            continue;
        }
        out.push_str(&format!(
            "{kind}: {applications} applied, {} ticks, {} damage\n",
            metrics.ticks(kind),
            metrics.effect_damage(kind)
        ));
    }
    for category in KnockbackCategory::iter() {
        let count = metrics.knockbacks(category);
        if count > 0 {
            out.push_str(&format!("knockback {category}: {count}\n"));
        }
    }
    out
}
