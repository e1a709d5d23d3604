//! Test utilities & fixtures shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use craftbot::crafting::{
    builtin_recipes, CraftContext, Container, ContainerId, ContainerOwner, Item, ItemId,
    NamePattern, RecipeDescriptor, RecipeProcessor, SimulatedSession, Slot, Timing, TransformRule,
};

pub const BOT_BAG: ContainerId = 100;
pub const PLAYER_BAG: ContainerId = 200;

pub fn session() -> Arc<SimulatedSession> {
    Arc::new(SimulatedSession::new())
}

pub fn ctx(session: &Arc<SimulatedSession>) -> CraftContext {
    CraftContext::from_session(session.clone(), Timing::default())
}

pub fn ctx_with(session: &Arc<SimulatedSession>, timing: Timing) -> CraftContext {
    CraftContext::from_session(session.clone(), timing)
}

pub fn inv(id: ItemId, name: &str, position: u32) -> Item {
    Item::new(id, name, Slot::inventory(position))
}

pub fn bot_inv(id: ItemId, name: &str, position: u32) -> Item {
    inv(id, name, position).owned_by_bot()
}

pub fn in_bag(id: ItemId, name: &str, bag: ContainerId, position: u32) -> Item {
    Item::new(id, name, Slot::container(bag, position))
}

pub fn bot_bag(items: Vec<Item>) -> Container {
    Container {
        id: BOT_BAG,
        name: "Bot Tools".to_string(),
        owner: ContainerOwner::Bot,
        open: true,
        items,
    }
}

pub fn player_bag(items: Vec<Item>) -> Container {
    Container {
        id: PLAYER_BAG,
        name: "Player Backpack".to_string(),
        owner: ContainerOwner::Player("Arwen".to_string()),
        open: true,
        items,
    }
}

pub fn builtin(name: &str) -> RecipeDescriptor {
    builtin_recipes()
        .into_iter()
        .find(|d| d.name == name)
        .expect("builtin recipe")
}

pub fn processor(name: &str) -> RecipeProcessor {
    RecipeProcessor::new(builtin(name))
}

/// Rule producing `outputs` when `tool` is used on `target` (both
/// case-insensitive exact names).
pub fn rule(tool: &str, target: &str, outputs: &[&str]) -> TransformRule {
    TransformRule::new(
        NamePattern::ignore_case(tool),
        NamePattern::ignore_case(target),
        outputs,
    )
}

/// Bot-owned Nano Programming Interface plus the ICE transformation.
pub fn ice_world() -> Arc<SimulatedSession> {
    let s = session();
    s.add_item(bot_inv(1, "Nano Programming Interface", 0));
    s.add_item(inv(2, "Hacker ICE-Breaker Source", 1).with_quality(150));
    s.add_rule(rule(
        "Nano Programming Interface",
        "Hacker ICE-Breaker Source",
        &["Upgraded Controller Recompiler Unit"],
    ));
    s
}

pub fn names(items: &[Item]) -> Vec<String> {
    items.iter().map(|i| i.name.clone()).collect()
}
