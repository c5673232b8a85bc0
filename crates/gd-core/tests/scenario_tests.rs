//! End-to-end scenarios driving the engine the way a game loop would:
//! a grid for the move gate, a session for the lifecycle, entities lent in.

use std::collections::{HashMap, HashSet};

use gd_core::combat::{DamageCause, ImpactKind, OutcomeKind};
use gd_core::effect::{EffectKind, StatusEffect};
use gd_core::entity::{DamageProfile, Entity, EntityId, Pos};
use gd_core::event::CombatEvent;
use gd_core::{
    Engine, GameRng, MoveGate, MoveOutcome, SessionPhase, SessionState, TerminalKind,
    TurnAuthority,
};

struct Grid {
    width: i32,
    height: i32,
    walls: HashSet<Pos>,
    occupants: HashMap<Pos, EntityId>,
}

impl Grid {
    fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            walls: HashSet::new(),
            occupants: HashMap::new(),
        }
    }

    fn wall(mut self, x: i32, y: i32) -> Self {
        self.walls.insert(Pos::new(x, y));
        self
    }

    fn place(&mut self, entity: &Entity) {
        self.occupants.insert(entity.pos, entity.id);
    }
}

impl MoveGate for Grid {
    fn can_enter(&self, tile: Pos) -> bool {
        tile.x >= 0
            && tile.y >= 0
            && tile.x < self.width
            && tile.y < self.height
            && !self.walls.contains(&tile)
            && !self.occupants.contains_key(&tile)
    }

    fn occupant(&self, tile: Pos) -> Option<EntityId> {
        self.occupants.get(&tile).copied()
    }

    fn move_to(&mut self, entity: EntityId, to: Pos) -> bool {
        self.occupants.retain(|_, id| *id != entity);
        self.occupants.insert(to, entity);
        true
    }
}

#[test]
fn evenly_matched_shove_covers_two_tiles() {
    let mut engine = Engine::new(GameRng::new(1));
    let attacker = Entity::new(EntityId(1), "ogre", 30, DamageProfile::new(1, 6, 0))
        .with_power(5)
        .with_pos(3, 5);
    let mut defender = Entity::new(EntityId(2), "goblin", 30, DamageProfile::new(1, 4, 0))
        .with_power(5)
        .with_pos(4, 5);
    let mut grid = Grid::new(20, 20);
    grid.place(&attacker);
    grid.place(&defender);

    let result = engine.resolve_knockback(&attacker, &mut defender, &mut grid);
    assert_eq!(result.nominal, 2);
    assert_eq!(result.moved, 2);
    assert_eq!(result.impact, None);
    assert!(!result.stunned);
    assert_eq!(defender.pos, Pos::new(6, 5));
    assert!(!engine.has_effect(&defender, EffectKind::Stagger));
}

#[test]
fn overwhelming_shove_into_a_wall_stops_and_staggers() {
    let mut engine = Engine::new(GameRng::new(1));
    let attacker = Entity::new(EntityId(1), "ogre", 30, DamageProfile::new(1, 6, 0))
        .with_power(9)
        .with_pos(4, 3);
    let mut defender = Entity::new(EntityId(2), "goblin", 30, DamageProfile::new(1, 4, 0))
        .with_power(3)
        .with_pos(5, 3);
    let mut grid = Grid::new(20, 20).wall(7, 3);
    grid.place(&attacker);
    grid.place(&defender);

    let result = engine.resolve_knockback(&attacker, &mut defender, &mut grid);
    assert_eq!(result.nominal, 4);
    assert_eq!(result.moved, 1);
    assert_eq!(result.impact, Some(ImpactKind::Wall));
    assert!(result.stunned);
    assert_eq!(defender.pos, Pos::new(6, 3));
    assert!(engine.has_effect(&defender, EffectKind::Stagger));

    let events = engine.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, CombatEvent::WallImpact { .. })));
}

#[test]
fn stagger_from_impact_wears_off_after_two_turns() {
    let mut engine = Engine::new(GameRng::new(1));
    let mut session = SessionState::new();
    let attacker = Entity::new(EntityId(1), "ogre", 30, DamageProfile::new(1, 6, 0))
        .with_power(9)
        .with_pos(4, 3);
    let mut defender = Entity::new(EntityId(2), "goblin", 30, DamageProfile::new(1, 4, 0))
        .with_power(3)
        .with_pos(5, 3);
    let mut grid = Grid::new(20, 20).wall(6, 3);
    grid.place(&attacker);
    grid.place(&defender);

    engine.resolve_knockback(&attacker, &mut defender, &mut grid);
    assert!(engine.has_effect(&defender, EffectKind::Stagger));

    // Staggered: the step is denied outright.
    let step = Pos::new(5, 4);
    assert_eq!(
        engine.attempt_move(&mut defender, step, &mut grid),
        MoveOutcome::EffectBlocked(EffectKind::Stagger)
    );

    engine.advance_turn();
    engine.process_turn_start(&mut defender, &mut session);
    engine.advance_turn();
    engine.process_turn_start(&mut defender, &mut session);
    assert!(!engine.has_effect(&defender, EffectKind::Stagger));
    assert_eq!(
        engine.attempt_move(&mut defender, step, &mut grid),
        MoveOutcome::Moved
    );
}

#[test]
fn knockback_follows_a_connecting_blow() {
    let mut engine = Engine::new(GameRng::new(8));
    let mut session = SessionState::new();
    let attacker = Entity::new(EntityId(1), "ogre", 40, DamageProfile::new(1, 4, 0).with_knockback())
        .with_attack_bonus(6)
        .with_power(9)
        .with_pos(4, 4);
    let mut defender = Entity::new(EntityId(2), "golem", 400, DamageProfile::new(1, 6, 0))
        .with_power(3)
        .with_pos(5, 4);
    let mut grid = Grid::new(30, 30);
    grid.place(&attacker);
    grid.place(&defender);

    // Swing until one lands, then resolve the follow-up shove.
    loop {
        let report = engine.attack(&attacker, &mut defender, &mut session).unwrap();
        if report.knockback_pending() {
            let result = engine.resolve_knockback(&attacker, &mut defender, &mut grid);
            assert_eq!(result.nominal, 4);
            assert_eq!(result.moved, 4);
            assert_eq!(defender.pos, Pos::new(9, 4));
            assert_eq!(grid.occupant(Pos::new(9, 4)), Some(defender.id));
            break;
        }
    }
}

#[test]
fn shove_into_a_body_staggers_the_pushed_one_only() {
    let mut engine = Engine::new(GameRng::new(1));
    let attacker = Entity::new(EntityId(1), "ogre", 30, DamageProfile::new(1, 6, 0))
        .with_power(8)
        .with_pos(2, 2);
    let mut defender = Entity::new(EntityId(2), "goblin", 30, DamageProfile::new(1, 4, 0))
        .with_power(3)
        .with_pos(3, 2);
    let bystander = Entity::new(EntityId(3), "mule", 30, DamageProfile::new(1, 4, 0))
        .with_pos(5, 2);
    let mut grid = Grid::new(20, 20);
    grid.place(&attacker);
    grid.place(&defender);
    grid.place(&bystander);

    let result = engine.resolve_knockback(&attacker, &mut defender, &mut grid);
    assert_eq!(result.moved, 1);
    assert_eq!(result.impact, Some(ImpactKind::Entity));
    assert_eq!(defender.pos, Pos::new(4, 2));
    assert!(engine.has_effect(&defender, EffectKind::Stagger));
    assert!(!engine.has_effect(&bystander, EffectKind::Stagger));
    assert_eq!(bystander.pos, Pos::new(5, 2));
}

#[test]
fn player_death_locks_the_session() {
    let mut engine = Engine::new(GameRng::new(1));
    let mut session = SessionState::new();
    let mut hero = Entity::new(EntityId(1), "hero", 10, DamageProfile::new(1, 6, 0))
        .player_controlled();

    engine.apply_damage(&mut hero, 50, DamageCause::Attack, &mut session);
    assert!(hero.is_dead());
    assert_eq!(session.phase(), SessionPhase::Terminal(TerminalKind::Defeat));
    assert_eq!(session.terminal_entity(), Some(EntityId(1)));

    // No more turns, and no later request rewrites the outcome.
    assert!(!session.begin_turn(EntityId(2)));
    session.request_terminal_transition(EntityId(2), TerminalKind::Victory);
    assert_eq!(session.phase(), SessionPhase::Terminal(TerminalKind::Defeat));
}

#[test]
fn chanting_walker_is_taxed_every_other_step() {
    let mut engine = Engine::new(GameRng::new(1));
    let mut walker = Entity::new(EntityId(1), "acolyte", 20, DamageProfile::new(1, 4, 0))
        .with_pos(0, 0);
    let mut grid = Grid::new(40, 40);
    grid.place(&walker);
    engine.add_effect(&mut walker, StatusEffect::chant(1000)).unwrap();

    let mut moved = 0;
    let mut denied = 0;
    for _ in 0..7 {
        let to = walker.pos.offset(1, 0);
        match engine.attempt_move(&mut walker, to, &mut grid) {
            MoveOutcome::Moved => moved += 1,
            MoveOutcome::TaxDenied => denied += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(moved, 4);
    assert_eq!(denied, 3);
    assert_eq!(walker.pos, Pos::new(4, 0));
}

fn run_duel(seed: u64) -> (String, u64, usize) {
    let mut engine = Engine::new(GameRng::new(seed));
    let mut session = SessionState::new();
    let mut hero = Entity::new(EntityId(1), "hero", 30, DamageProfile::new(1, 8, 1))
        .with_armor_class(12)
        .with_attack_bonus(4)
        .with_power(6)
        .player_controlled();
    let mut goblin = Entity::new(EntityId(2), "goblin", 24, DamageProfile::new(1, 6, 0))
        .with_armor_class(11)
        .with_attack_bonus(3)
        .with_power(4);
    engine.add_effect(&mut hero, StatusEffect::oath()).unwrap();
    engine.add_effect(&mut goblin, StatusEffect::poison(5, 1)).unwrap();

    for _ in 0..200 {
        engine.advance_turn();
        if session.is_terminal() {
            break;
        }
        session.begin_turn(hero.id);
        engine.process_turn_start(&mut hero, &mut session);
        if !hero.is_dead() && !hero.effects.blocks_actions() {
            engine.attack(&hero, &mut goblin, &mut session).unwrap();
        }
        if goblin.is_dead() {
            break;
        }
        session.begin_turn(goblin.id);
        engine.process_turn_start(&mut goblin, &mut session);
        if !goblin.is_dead() && !goblin.effects.blocks_actions() {
            engine.attack(&goblin, &mut hero, &mut session).unwrap();
        }
        if hero.is_dead() {
            break;
        }
    }

    let winner = if hero.is_dead() {
        "goblin"
    } else if goblin.is_dead() {
        "hero"
    } else {
        "draw"
    };
    (winner.to_string(), engine.turn(), engine.event_history().len())
}

#[test]
fn seeded_duel_is_reproducible() {
    assert_eq!(run_duel(31), run_duel(31));
    assert_eq!(run_duel(99), run_duel(99));
}

#[test]
fn duel_metrics_stay_consistent() {
    let mut engine = Engine::new(GameRng::new(17));
    let mut session = SessionState::new();
    let mut hero = Entity::new(EntityId(1), "hero", 40, DamageProfile::new(1, 8, 1))
        .with_armor_class(12)
        .with_attack_bonus(4)
        .player_controlled();
    let mut goblin = Entity::new(EntityId(2), "goblin", 24, DamageProfile::new(1, 6, 0))
        .with_armor_class(11)
        .with_attack_bonus(2);
    engine.add_effect(&mut goblin, StatusEffect::burning(8, 2)).unwrap();

    for _ in 0..200 {
        engine.advance_turn();
        if session.is_terminal() || goblin.is_dead() || hero.is_dead() {
            break;
        }
        session.begin_turn(hero.id);
        engine.process_turn_start(&mut hero, &mut session);
        engine.attack(&hero, &mut goblin, &mut session).unwrap();
        if goblin.is_dead() {
            break;
        }
        session.begin_turn(goblin.id);
        engine.process_turn_start(&mut goblin, &mut session);
        if !goblin.is_dead() {
            engine.attack(&goblin, &mut hero, &mut session).unwrap();
        }
    }

    let metrics = engine.metrics();
    assert!(goblin.is_dead());
    assert_eq!(metrics.deaths, 1);
    assert_eq!(
        metrics.attacks,
        metrics.hits + metrics.crits + metrics.fumbles + metrics.misses()
    );
    assert!(metrics.damage_total >= metrics.effect_damage(EffectKind::Burning));
    assert!(metrics.ticks(EffectKind::Burning) > 0);

    // Every event renders a printable log line.
    for event in engine.event_history() {
        assert!(!event.to_string().is_empty());
    }
}

#[test]
fn entangled_target_cannot_flee_but_still_fights() {
    let mut engine = Engine::new(GameRng::new(5));
    let mut session = SessionState::new();
    let mut brigand = Entity::new(EntityId(1), "brigand", 20, DamageProfile::new(1, 6, 0))
        .with_attack_bonus(10)
        .with_pos(3, 3);
    let mut knight = Entity::new(EntityId(2), "knight", 200, DamageProfile::new(1, 6, 0))
        .with_pos(4, 3);
    let mut grid = Grid::new(20, 20);
    grid.place(&brigand);
    grid.place(&knight);

    engine.add_effect(&mut brigand, StatusEffect::entangle(3)).unwrap();
    assert_eq!(
        engine.attempt_move(&mut brigand, Pos::new(2, 3), &mut grid),
        MoveOutcome::EffectBlocked(EffectKind::Entangle)
    );
    assert_eq!(brigand.pos, Pos::new(3, 3));

    // Entangle holds the feet, not the sword arm.
    loop {
        let report = engine.attack(&brigand, &mut knight, &mut session).unwrap();
        if report.outcome.kind == OutcomeKind::Hit || report.outcome.kind == OutcomeKind::Critical {
            assert!(report.damage.is_some());
            assert!(knight.hp() < 200);
            break;
        }
    }
}
