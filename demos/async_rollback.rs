//! Async Rollback
//!
//! This example loads a level asynchronously and shows the engine restoring
//! the menu when the level fails to load.
//!
//! Key concepts:
//! - Asynchronous enter/exit hooks
//! - Rollback of active, previous and history on a failed entry
//! - Rejection notifications carrying the rollback outcome
//! - Debug snapshot of the engine tables
//!
//! Run with: cargo run --example async_rollback

use async_trait::async_trait;
use modeset::core::{ModeId, ModeState, ParentSlot, Params};
use modeset::{params, ModeEngine, RejectReason, StateError, StateResult};
use std::sync::Arc;
use std::time::Duration;

struct Game;

#[derive(Default)]
struct Menu {
    parent: ParentSlot<Game>,
}

#[async_trait]
impl ModeState<Game> for Menu {
    fn parent(&self) -> &ParentSlot<Game> {
        &self.parent
    }

    fn name(&self) -> &str {
        "menu"
    }

    async fn enter_async(&mut self, _params: &Params) -> StateResult {
        println!("  menu shown");
        Ok(())
    }

    async fn exit_async(&mut self, _params: &Params) -> StateResult {
        println!("  menu hidden");
        Ok(())
    }
}

#[derive(Default)]
struct Level {
    parent: ParentSlot<Game>,
}

#[async_trait]
impl ModeState<Game> for Level {
    fn parent(&self) -> &ParentSlot<Game> {
        &self.parent
    }

    fn name(&self) -> &str {
        "level"
    }

    async fn enter_async(&mut self, params: &Params) -> StateResult {
        let level = params.get_text("level").unwrap_or("unknown");
        println!("  loading level {level}...");
        tokio::time::sleep(Duration::from_millis(20)).await;
        if level == "missing" {
            return Err(StateError::new(format!("level {level} not found")));
        }
        println!("  level {level} ready");
        Ok(())
    }

    async fn start_async(&mut self) -> StateResult {
        println!("  level started");
        Ok(())
    }
}

const MENU: ModeId = ModeId(0);
const LEVEL: ModeId = ModeId(1);

#[tokio::main]
async fn main() {
    println!("=== Async Rollback Example ===\n");

    let mut engine = ModeEngine::new(Arc::new(Game));
    engine.create::<Menu>(MENU).unwrap();
    engine.register_lazy_default::<Level>();

    engine.on_rejected(|event| {
        if let RejectReason::EnterFailed { message, rollback } = &event.reason {
            println!("  entry failed: {message}");
            println!("  rollback: {rollback}");
        }
    });

    println!("Opening the menu:");
    engine.select_async(MENU, Params::new()).await;

    println!("\nLoading a missing level:");
    let loaded = engine.select_async(LEVEL, params! { "level" => "missing" }).await;
    println!("  loaded: {loaded}, active: {:?}", engine.active());
    println!("  history: {:?}", engine.history_modes());

    println!("\nLoading a real level:");
    let loaded = engine.select_async(LEVEL, params! { "level" => "forest" }).await;
    engine.update_async().await.unwrap();
    println!("  loaded: {loaded}, active: {:?}", engine.active());

    #[cfg(feature = "diagnostics")]
    println!("\n{}", engine.snapshot());

    println!("=== Example Complete ===");
}
