mod common;

use std::time::Duration;

use common::*;
use craftbot::crafting::sim::{ActionKind, RecordedAction};
use craftbot::crafting::{
    NamePattern, SessionError, Timing, ToolLocator, ToolPolicy, ToolRequirement,
};
use craftbot::logutil::RecipeLog;

fn req(name: &str, policy: ToolPolicy) -> ToolRequirement {
    ToolRequirement::new(NamePattern::ignore_case(name), policy)
}

fn sink() -> RecipeLog {
    RecipeLog::new("locator-test")
}

#[tokio::test(start_paused = true)]
async fn player_provided_never_uses_the_only_bot_copy() {
    let s = session();
    s.add_item(bot_inv(1, "Nano Programming Interface", 0));
    let ctx = ctx(&s);
    let mut locator = ToolLocator::new();

    let found = locator
        .locate(&ctx, &req("Nano Programming Interface", ToolPolicy::PlayerProvided), &sink())
        .await;

    assert!(found.is_none());
    assert!(s.journal().is_empty());
    assert!(locator.ledger().is_empty());
}

#[tokio::test(start_paused = true)]
async fn player_provided_skips_bot_bags_and_bot_items() {
    let s = session();
    s.add_container(bot_bag(vec![in_bag(10, "Bio-Comminutor", BOT_BAG, 0).owned_by_bot()]));
    s.add_container(player_bag(vec![
        in_bag(20, "Bio-Comminutor", PLAYER_BAG, 0).owned_by_bot(),
    ]));
    let ctx = ctx(&s);

    let found = ToolLocator::new()
        .locate(&ctx, &req("Bio-Comminutor", ToolPolicy::PlayerProvided), &sink())
        .await;

    assert!(found.is_none());
    assert_eq!(s.action_count(ActionKind::MoveToInventory), 0);
}

#[tokio::test(start_paused = true)]
async fn player_provided_pulls_from_player_bag() {
    let s = session();
    s.add_item(bot_inv(1, "Bio-Comminutor", 0));
    s.add_container(player_bag(vec![in_bag(20, "Bio-Comminutor", PLAYER_BAG, 0)]));
    let ctx = ctx(&s);
    let mut locator = ToolLocator::new();

    let tool = locator
        .locate(&ctx, &req("Bio-Comminutor", ToolPolicy::PlayerProvided), &sink())
        .await
        .expect("player tool");

    assert_eq!(tool.id, 20);
    assert!(tool.slot.is_inventory());
    assert!(!tool.bot_owned);
    assert_eq!(s.action_count(ActionKind::MoveToInventory), 1);
    let entry = &locator.ledger().entries()[0];
    assert_eq!(entry.origin, PLAYER_BAG);
    assert!(!entry.origin_bot_owned);
}

#[tokio::test(start_paused = true)]
async fn fallback_prefers_player_copy_in_inventory() {
    let s = session();
    s.add_item(bot_inv(1, "Precious Metal Reclaimer", 0));
    s.add_item(inv(2, "Precious Metal Reclaimer", 1));
    let ctx = ctx(&s);

    let tool = ToolLocator::new()
        .locate(
            &ctx,
            &req("Precious Metal Reclaimer", ToolPolicy::PreferPlayerFallbackBot),
            &sink(),
        )
        .await
        .expect("tool");

    assert_eq!(tool.id, 2);
    assert!(s.journal().is_empty());
}

#[tokio::test(start_paused = true)]
async fn fallback_prefers_player_bag_over_bot_bag() {
    let s = session();
    s.add_container(bot_bag(vec![in_bag(10, "Kyr'Ozch Structural Analyzer", BOT_BAG, 0).owned_by_bot()]));
    s.add_container(player_bag(vec![in_bag(20, "Kyr'Ozch Structural Analyzer", PLAYER_BAG, 0)]));
    let ctx = ctx(&s);

    let tool = ToolLocator::new()
        .locate(
            &ctx,
            &req("Kyr'Ozch Structural Analyzer", ToolPolicy::PreferPlayerFallbackBot),
            &sink(),
        )
        .await
        .expect("tool");

    assert_eq!(tool.id, 20);
}

#[tokio::test(start_paused = true)]
async fn fallback_uses_bot_copy_when_player_has_none() {
    let s = session();
    s.add_container(bot_bag(vec![in_bag(10, "Bio-Comminutor", BOT_BAG, 3).owned_by_bot()]));
    let ctx = ctx(&s);
    let mut locator = ToolLocator::new();

    let tool = locator
        .locate(&ctx, &req("Bio-Comminutor", ToolPolicy::PreferPlayerFallbackBot), &sink())
        .await
        .expect("bot tool");

    assert_eq!(tool.id, 10);
    assert!(tool.bot_owned);
    let entry = &locator.ledger().entries()[0];
    assert_eq!(entry.origin, BOT_BAG);
    assert!(entry.origin_bot_owned);
}

#[tokio::test(start_paused = true)]
async fn pull_rereads_only_after_settle_delay() {
    let s = session();
    s.add_container(bot_bag(vec![in_bag(10, "Screwdriver", BOT_BAG, 0).owned_by_bot()]));
    s.set_visibility_lag(2);
    let ctx = ctx(&s);

    let tool = ToolLocator::new()
        .locate(&ctx, &req("Screwdriver", ToolPolicy::BotOwned), &sink())
        .await;
    assert!(tool.is_some());

    let moved_at = s
        .journal()
        .iter()
        .find(|e| matches!(e.action, RecordedAction::MoveToInventory { item: 10 }))
        .expect("move recorded")
        .at;
    let rereads: Vec<_> = s
        .inventory_read_times()
        .into_iter()
        .filter(|t| *t > moved_at)
        .collect();
    assert_eq!(rereads.len(), 2);
    assert!(rereads[0] - moved_at >= Timing::default().pull_settle);
    assert!(rereads[1] - rereads[0] >= Timing::default().pull_settle);
}

#[tokio::test(start_paused = true)]
async fn pull_gives_up_after_configured_attempts() {
    let s = session();
    s.add_container(bot_bag(vec![in_bag(10, "Screwdriver", BOT_BAG, 0).owned_by_bot()]));
    s.set_visibility_lag(10);
    let timing = Timing {
        pull_settle: Duration::from_millis(50),
        pull_attempts: 3,
        ..Timing::default()
    };
    let ctx = ctx_with(&s, timing);
    let mut locator = ToolLocator::new();

    let tool = locator
        .locate(&ctx, &req("Screwdriver", ToolPolicy::BotOwned), &sink())
        .await;

    assert!(tool.is_none());
    assert!(locator.ledger().is_empty());
    assert_eq!(s.action_count(ActionKind::MoveToInventory), 1);
    let moved_at = s.journal()[0].at;
    let rereads = s
        .inventory_read_times()
        .into_iter()
        .filter(|t| *t > moved_at)
        .count();
    assert_eq!(rereads, 3);
}

#[tokio::test(start_paused = true)]
async fn failed_pull_is_treated_as_not_found() {
    let s = session();
    s.add_container(bot_bag(vec![in_bag(10, "Screwdriver", BOT_BAG, 0).owned_by_bot()]));
    s.fail_next(ActionKind::MoveToInventory, SessionError::Rejected("busy".into()));
    let ctx = ctx(&s);
    let mut locator = ToolLocator::new();

    let tool = locator
        .locate(&ctx, &req("Screwdriver", ToolPolicy::BotOwned), &sink())
        .await;

    assert!(tool.is_none());
    assert!(locator.ledger().is_empty());
}

#[tokio::test(start_paused = true)]
async fn borrowed_bot_tools_go_back_and_player_tools_stay() {
    let s = session();
    s.add_container(bot_bag(vec![in_bag(10, "Screwdriver", BOT_BAG, 0).owned_by_bot()]));
    s.add_container(player_bag(vec![in_bag(20, "Trimmer Casing", PLAYER_BAG, 0)]));
    let ctx = ctx(&s);
    let mut locator = ToolLocator::new();

    locator
        .locate(&ctx, &req("Screwdriver", ToolPolicy::BotOwned), &sink())
        .await
        .expect("screwdriver");
    locator
        .locate(&ctx, &req("Trimmer Casing", ToolPolicy::PlayerProvided), &sink())
        .await
        .expect("casing");
    assert_eq!(locator.ledger().len(), 2);

    let summary = locator.ledger_mut().return_borrowed_tools(&ctx).await;

    assert_eq!(summary.returned, 1);
    assert_eq!(summary.left_for_player, 1);
    assert!(locator.ledger().is_empty());
    let bag = s.container(BOT_BAG).unwrap();
    assert!(bag.items.iter().any(|i| i.id == 10));
    assert!(s.inventory_items().iter().any(|i| i.id == 20));
}

#[tokio::test(start_paused = true)]
async fn failed_return_is_retried_next_time() {
    let s = session();
    s.add_container(bot_bag(vec![in_bag(10, "Screwdriver", BOT_BAG, 0).owned_by_bot()]));
    let ctx = ctx(&s);
    let mut locator = ToolLocator::new();
    locator
        .locate(&ctx, &req("Screwdriver", ToolPolicy::BotOwned), &sink())
        .await
        .expect("screwdriver");

    s.fail_next(ActionKind::MoveToContainer, SessionError::Disconnected);
    let first = locator.ledger_mut().return_borrowed_tools(&ctx).await;
    assert_eq!(first.failed, 1);
    assert_eq!(locator.ledger().len(), 1);

    let second = locator.ledger_mut().return_borrowed_tools(&ctx).await;
    assert_eq!(second.returned, 1);
    assert!(locator.ledger().is_empty());
}
