//! Tool resolution under an ownership policy.
//!
//! The locator is the single place where [`ToolPolicy`] is enforced: a
//! `PlayerProvided` requirement never resolves to a bot-owned item, whatever
//! the caller does with the result.
//!
//! Tools found in open containers are pulled into the working inventory and
//! recorded in the [`ToolLedger`] so the bot's own tools can be put back in
//! their bags once a trade is done.

use crate::logutil::{sanitize_name, RecipeLog};

use super::matcher::NamePattern;
use super::session::CraftContext;
use super::types::{Container, ContainerId, Item, ItemId, ToolPolicy, ToolRequirement};

// ============================================================================
// Tool ledger
// ============================================================================

/// A tool that was pulled out of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowedTool {
    pub item_id: ItemId,
    pub tool_name: String,
    pub origin: ContainerId,
    /// The origin container belongs to the bot.
    pub origin_bot_owned: bool,
}

/// Summary of one [`ToolLedger::return_borrowed_tools`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReturnSummary {
    /// Bot tools moved back to their origin container.
    pub returned: usize,
    /// Player tools left in the working inventory.
    pub left_for_player: usize,
    /// Tools no longer present (consumed or already moved).
    pub vanished: usize,
    /// Moves that failed; those entries stay in the ledger.
    pub failed: usize,
}

impl ReturnSummary {
    pub fn merge(&mut self, other: ReturnSummary) {
        self.returned += other.returned;
        self.left_for_player += other.left_for_player;
        self.vanished += other.vanished;
        self.failed += other.failed;
    }
}

#[derive(Debug, Default, Clone)]
pub struct ToolLedger {
    entries: Vec<BorrowedTool>,
}

impl ToolLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pulled tool. A second record for the same instance replaces
    /// the first.
    pub fn record(&mut self, entry: BorrowedTool) {
        self.entries.retain(|e| e.item_id != entry.item_id);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[BorrowedTool] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Put bot tools back where they came from. Player tools stay in the
    /// working inventory so the trade can hand them back.
    pub async fn return_borrowed_tools(&mut self, ctx: &CraftContext) -> ReturnSummary {
        let mut summary = ReturnSummary::default();
        let mut pending = Vec::new();
        let inventory = ctx.inventory();

        for entry in self.entries.drain(..) {
            if !entry.origin_bot_owned {
                log::debug!(
                    "leaving player tool {} (#{}) in inventory",
                    sanitize_name(&entry.tool_name),
                    entry.item_id
                );
                summary.left_for_player += 1;
                continue;
            }
            let Some(item) = inventory.iter().find(|i| i.id == entry.item_id) else {
                log::debug!(
                    "borrowed tool {} (#{}) no longer in inventory",
                    sanitize_name(&entry.tool_name),
                    entry.item_id
                );
                summary.vanished += 1;
                continue;
            };
            match ctx.actions.move_to_container(item, entry.origin).await {
                Ok(()) => {
                    log::info!(
                        "returned {} to bag {}",
                        sanitize_name(&entry.tool_name),
                        entry.origin
                    );
                    summary.returned += 1;
                }
                Err(e) => {
                    log::warn!(
                        "failed to return {} to bag {}: {}",
                        sanitize_name(&entry.tool_name),
                        entry.origin,
                        e
                    );
                    summary.failed += 1;
                    pending.push(entry);
                }
            }
        }

        self.entries = pending;
        summary
    }
}

// ============================================================================
// Locator
// ============================================================================

#[derive(Debug, Default)]
pub struct ToolLocator {
    ledger: ToolLedger,
}

impl ToolLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &ToolLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut ToolLedger {
        &mut self.ledger
    }

    /// Resolve `req` to a concrete item in the working inventory, pulling it
    /// from an open container when needed. `None` when no acceptable copy
    /// exists or a pull could not be confirmed.
    pub async fn locate(
        &mut self,
        ctx: &CraftContext,
        req: &ToolRequirement,
        log: &RecipeLog,
    ) -> Option<Item> {
        let found = match req.policy {
            ToolPolicy::BotOwned => self.bot_step(ctx, &req.pattern, log).await,
            ToolPolicy::PlayerProvided => self.player_step(ctx, &req.pattern, log).await,
            ToolPolicy::PreferPlayerFallbackBot => {
                match self.player_step(ctx, &req.pattern, log).await {
                    Some(tool) => Some(tool),
                    None => {
                        log.debug(&format!(
                            "no player-provided {}, falling back to bot copy",
                            req.name()
                        ));
                        self.bot_step(ctx, &req.pattern, log).await
                    }
                }
            }
        };

        match found {
            Some(tool) if tool.bot_owned && !req.policy.allows_bot_tool() => {
                log.error(&format!(
                    "refusing bot-owned {} (#{}) for player-provided requirement",
                    sanitize_name(&tool.name),
                    tool.id
                ));
                None
            }
            Some(tool) => {
                log.debug(&format!(
                    "resolved {} to #{} at {} ({})",
                    req.name(),
                    tool.id,
                    tool.slot,
                    req.policy.label()
                ));
                Some(tool)
            }
            None => {
                log.debug(&format!("{} not found ({})", req.name(), req.policy.label()));
                None
            }
        }
    }

    /// Any copy: working inventory first, then open containers.
    async fn bot_step(
        &mut self,
        ctx: &CraftContext,
        pattern: &NamePattern,
        log: &RecipeLog,
    ) -> Option<Item> {
        if let Some(tool) = ctx.inventory().into_iter().find(|i| pattern.is_match(&i.name)) {
            return Some(tool);
        }

        let (container, candidate) = first_in_containers(&ctx.containers(), |c, i| {
            c.open && pattern.is_match(&i.name)
        })?;
        self.pull_and_record(ctx, &container, &candidate, log).await
    }

    /// Non-bot copies only: working inventory first, then player containers.
    async fn player_step(
        &mut self,
        ctx: &CraftContext,
        pattern: &NamePattern,
        log: &RecipeLog,
    ) -> Option<Item> {
        if let Some(tool) = ctx
            .inventory()
            .into_iter()
            .find(|i| !i.bot_owned && pattern.is_match(&i.name))
        {
            return Some(tool);
        }

        let (container, candidate) = first_in_containers(&ctx.containers(), |c, i| {
            c.open && !c.is_bot_owned() && !i.bot_owned && pattern.is_match(&i.name)
        })?;
        let pulled = self.pull_and_record(ctx, &container, &candidate, log).await?;
        if pulled.bot_owned {
            log.error(&format!(
                "pulled {} (#{}) from bag {} turned out bot-owned",
                sanitize_name(&pulled.name),
                pulled.id,
                container.id
            ));
            return None;
        }
        Some(pulled)
    }

    async fn pull_and_record(
        &mut self,
        ctx: &CraftContext,
        container: &Container,
        candidate: &Item,
        log: &RecipeLog,
    ) -> Option<Item> {
        log.debug(&format!(
            "pulling {} (#{}) from bag {}",
            sanitize_name(&candidate.name),
            candidate.id,
            sanitize_name(&container.name)
        ));
        let pulled = pull_to_inventory(ctx, candidate, log).await?;
        self.ledger.record(BorrowedTool {
            item_id: pulled.id,
            tool_name: pulled.name.clone(),
            origin: container.id,
            origin_bot_owned: container.is_bot_owned(),
        });
        Some(pulled)
    }
}

fn first_in_containers<F>(containers: &[Container], accept: F) -> Option<(Container, Item)>
where
    F: Fn(&Container, &Item) -> bool,
{
    containers.iter().find_map(|c| {
        c.items
            .iter()
            .find(|i| accept(c, i))
            .map(|i| (c.clone(), i.clone()))
    })
}

/// Move `item` out of its container and wait until the same instance shows up
/// in the working inventory. Up to `pull_attempts` re-reads, each after
/// `pull_settle`.
pub async fn pull_to_inventory(ctx: &CraftContext, item: &Item, log: &RecipeLog) -> Option<Item> {
    if let Err(e) = ctx.actions.move_to_inventory(item).await {
        log.warn(&format!(
            "move of {} (#{}) to inventory failed: {}",
            sanitize_name(&item.name),
            item.id,
            e
        ));
        return None;
    }

    for attempt in 1..=ctx.timing.pull_attempts {
        tokio::time::sleep(ctx.timing.pull_settle).await;
        if let Some(found) = ctx.inventory().into_iter().find(|i| i.id == item.id) {
            return Some(found);
        }
        log.debug(&format!(
            "#{} not visible yet (attempt {}/{})",
            item.id, attempt, ctx.timing.pull_attempts
        ));
    }

    log.warn(&format!(
        "{} (#{}) never appeared in inventory after pull",
        sanitize_name(&item.name),
        item.id
    ));
    None
}
