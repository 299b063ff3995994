//! Hero Modes
//!
//! This example drives a hero through idle, walk and attack modes the way a
//! game loop would.
//!
//! Key concepts:
//! - Eager and lazy mode registration through the builder
//! - Entry requirements that accumulate every violation
//! - Per-frame ticks routed to the active mode
//! - Bounded history and `go_back`
//!
//! Run with: cargo run --example hero_modes

use modeset::core::{ModeId, ModeState, ParentSlot, Params};
use modeset::{params, ModeEngine, StateResult};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

const IDLE: ModeId = ModeId(0);
const WALK: ModeId = ModeId(1);
const ATTACK: ModeId = ModeId(2);

struct Hero {
    stamina: AtomicU32,
}

#[derive(Default)]
struct Idle {
    parent: ParentSlot<Hero>,
}

impl ModeState<Hero> for Idle {
    fn parent(&self) -> &ParentSlot<Hero> {
        &self.parent
    }

    fn name(&self) -> &str {
        "idle"
    }

    // Resting recovers stamina.
    fn update(&mut self) -> StateResult {
        if let Some(hero) = self.parent.get() {
            hero.stamina.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

#[derive(Default)]
struct Walk {
    parent: ParentSlot<Hero>,
    speed: i64,
    steps: i64,
}

impl ModeState<Hero> for Walk {
    fn parent(&self) -> &ParentSlot<Hero> {
        &self.parent
    }

    fn name(&self) -> &str {
        "walk"
    }

    fn enter(&mut self, params: &Params) -> StateResult {
        self.speed = params.get_int("speed").unwrap_or(1);
        println!("  walking at speed {}", self.speed);
        Ok(())
    }

    fn update(&mut self) -> StateResult {
        self.steps += self.speed;
        Ok(())
    }

    fn exit(&mut self, _params: &Params) -> StateResult {
        println!("  walked {} steps", self.steps);
        Ok(())
    }
}

#[derive(Default)]
struct Attack {
    parent: ParentSlot<Hero>,
}

impl ModeState<Hero> for Attack {
    fn parent(&self) -> &ParentSlot<Hero> {
        &self.parent
    }

    fn name(&self) -> &str {
        "attack"
    }

    fn init(&mut self) -> StateResult {
        println!("  loading attack animations");
        Ok(())
    }

    fn start(&mut self) -> StateResult {
        if let Some(hero) = self.parent.get() {
            hero.stamina.fetch_sub(2, Ordering::Relaxed);
        }
        Ok(())
    }
}

fn stamina(engine: &ModeEngine<Hero>) -> u32 {
    engine.parent().stamina.load(Ordering::Relaxed)
}

fn main() {
    println!("=== Hero Modes Example ===\n");

    let hero = Arc::new(Hero {
        stamina: AtomicU32::new(0),
    });
    let mut engine = ModeEngine::builder()
        .parent(hero)
        .history_limit(4)
        .mode::<Idle>()
        .mode::<Walk>()
        .lazy_default::<Attack>()
        .initial(IDLE)
        .build()
        .unwrap();

    engine.on_rejected(|event| println!("  rejected {}: {}", event.to, event.reason));
    engine
        .configure_mode(ATTACK)
        .require(|ctx| ctx.params.get_bool("armed") == Some(true), "needs a weapon")
        .require(|ctx| ctx.params.get_int("stamina").unwrap_or(0) >= 2, "too tired");

    println!("Resting for three frames:");
    for _ in 0..3 {
        engine.update().unwrap();
    }
    println!("  stamina is {}", stamina(&engine));

    println!("\nWalking:");
    engine.select(WALK, params! { "speed" => 3 }).unwrap();
    engine.update().unwrap();
    engine.update().unwrap();

    println!("\nAttacking unarmed:");
    let accepted = engine.select(ATTACK, Params::new()).unwrap();
    println!("  accepted: {accepted}, attack loaded: {}", engine.is_materialized(ATTACK));

    println!("\nAttacking armed:");
    let current = i64::from(stamina(&engine));
    let accepted = engine
        .select(ATTACK, params! { "armed" => true, "stamina" => current })
        .unwrap();
    engine.update().unwrap();
    println!("  accepted: {accepted}, stamina is {}", stamina(&engine));

    println!("\nHistory (most recent first): {:?}", engine.history_modes());
    while engine.go_back(Params::new()).unwrap() {
        println!("  back to {:?}", engine.active());
    }

    println!("\n=== Example Complete ===");
}
