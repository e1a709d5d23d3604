//! Generic recipe processor.
//!
//! A recipe is data ([`RecipeDescriptor`]): what it accepts, which tool it
//! needs under which policy, what it should produce and how long to wait.
//! [`RecipeProcessor`] runs any descriptor through the same state machine:
//!
//! ```text
//! Idle -> MatchChecked -> ToolResolved -> TargetResolved -> Combined -> Verified -> Done
//! ```
//!
//! Multi-step recipes append [`FollowUp`] steps that run only after the main
//! combine succeeded. [`ChainStep`] is the declarative follow-up used by the
//! catalog; code-level hooks implement the trait directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::logutil::{sanitize_name, RecipeLog};
use crate::metrics::{self, OutcomeKind};

use super::engine::{CombinationEngine, CombinePlan};
use super::errors::CraftError;
use super::locator::{pull_to_inventory, ReturnSummary, ToolLocator};
use super::matcher::{matches, normalize, same_name, RecipeRule};
use super::session::{CraftContext, Timing};
use super::types::{
    CombinationOutcome, ContainerId, Item, ItemId, RecipeAnalysis, ToolRequirement,
};

/// Longest per-recipe settle delay a descriptor may ask for.
pub const MAX_RECIPE_DELAY_MS: u64 = 10_000;

// ============================================================================
// Descriptors
// ============================================================================

/// Declarative follow-up combine, run on the previous step's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStep {
    pub tool: ToolRequirement,
    /// Which item the step works on.
    pub input: RecipeRule,
    /// What the step must produce. `{target}` is the input's name.
    pub output: RecipeRule,
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDescriptor {
    pub name: String,
    /// Short label used in analysis reports ("Gem Cutting").
    pub stage: String,
    /// Which items the recipe accepts.
    pub accepts: RecipeRule,
    pub tool: ToolRequirement,
    /// What a successful combine produces. `{target}` is the target's name.
    pub output: RecipeRule,
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub stack_results: bool,
    #[serde(default)]
    pub chain: Vec<ChainStep>,
}

impl RecipeDescriptor {
    pub fn validate(&self) -> Result<(), CraftError> {
        let invalid = |reason: &str| CraftError::InvalidRecipe {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if normalize(&self.name).is_empty() {
            return Err(invalid("name is empty"));
        }
        if normalize(&self.stage).is_empty() {
            return Err(invalid("stage label is empty"));
        }
        if self.accepts.accept.is_empty() {
            return Err(invalid("no accept patterns"));
        }
        if self.output.accept.is_empty() {
            return Err(invalid("no output patterns"));
        }
        if normalize(self.tool.name()).is_empty() {
            return Err(invalid("tool name is empty"));
        }
        let delays = std::iter::once(self.delay_ms).chain(self.chain.iter().map(|s| s.delay_ms));
        if delays.flatten().any(|ms| ms > MAX_RECIPE_DELAY_MS) {
            return Err(invalid("delay exceeds maximum"));
        }
        for step in &self.chain {
            if step.input.accept.is_empty() || step.output.accept.is_empty() {
                return Err(invalid("chain step without input or output patterns"));
            }
            if normalize(step.tool.name()).is_empty() {
                return Err(invalid("chain step tool name is empty"));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProcessStage {
    Idle,
    MatchChecked,
    ToolResolved,
    TargetResolved,
    Combined,
    Verified,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The recipe does not take this item.
    NotAccepted,
    /// The item is no longer anywhere the bot can see.
    ItemGone,
    ToolMissing,
    /// The target disappeared after the tool was resolved.
    TargetMissing,
    Combined(CombinationOutcome),
}

impl ProcessOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            ProcessOutcome::NotAccepted | ProcessOutcome::ItemGone => OutcomeKind::Skipped,
            ProcessOutcome::ToolMissing => OutcomeKind::ToolMissing,
            ProcessOutcome::TargetMissing => OutcomeKind::TargetMissing,
            ProcessOutcome::Combined(CombinationOutcome::Success { .. }) => OutcomeKind::Success,
            ProcessOutcome::Combined(CombinationOutcome::NoEffect) => OutcomeKind::NoEffect,
            ProcessOutcome::Combined(CombinationOutcome::Unknown { .. }) => OutcomeKind::Unknown,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProcessOutcome::Combined(o) if o.is_success())
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProcessOutcome::NotAccepted => "not-accepted",
            ProcessOutcome::ItemGone => "item-gone",
            ProcessOutcome::ToolMissing => "tool-missing",
            ProcessOutcome::TargetMissing => "target-missing",
            ProcessOutcome::Combined(o) => o.label(),
        }
    }
}

/// Everything one `process` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    pub recipe: String,
    pub item: String,
    /// Stage at which processing stopped; `Done` when it ran to the end.
    pub stage: ProcessStage,
    pub outcome: ProcessOutcome,
    /// Outcomes of follow-up steps, in order. Stops at the first non-success.
    pub follow_ups: Vec<CombinationOutcome>,
    /// Outputs moved to the return container.
    pub returned: usize,
}

impl ProcessReport {
    fn new(recipe: &str, item: &str) -> Self {
        Self {
            recipe: recipe.to_string(),
            item: item.to_string(),
            stage: ProcessStage::Idle,
            outcome: ProcessOutcome::NotAccepted,
            follow_ups: Vec::new(),
            returned: 0,
        }
    }

    fn exit(mut self, stage: ProcessStage, outcome: ProcessOutcome) -> Self {
        self.stage = stage;
        self.outcome = outcome;
        self
    }

    /// Every step, including follow-ups, succeeded.
    pub fn fully_succeeded(&self) -> bool {
        self.outcome.is_success() && self.follow_ups.iter().all(|o| o.is_success())
    }
}

// ============================================================================
// Follow-up hook
// ============================================================================

/// Extra work after a successful main combine.
#[async_trait]
pub trait FollowUp: Send + Sync {
    fn describe(&self) -> String;

    /// `produced` holds the previous step's outputs.
    async fn run(
        &self,
        ctx: &CraftContext,
        locator: &mut ToolLocator,
        produced: &[Item],
        log: &RecipeLog,
    ) -> CombinationOutcome;
}

#[async_trait]
impl FollowUp for ChainStep {
    fn describe(&self) -> String {
        format!("{} on previous output", self.tool.name())
    }

    async fn run(
        &self,
        ctx: &CraftContext,
        locator: &mut ToolLocator,
        produced: &[Item],
        log: &RecipeLog,
    ) -> CombinationOutcome {
        let Some(tool) = locator.locate(ctx, &self.tool, log).await else {
            return CombinationOutcome::Unknown {
                reason: format!("chain tool {} not found", self.tool.name()),
            };
        };

        let inventory = ctx.inventory();
        let input = produced
            .iter()
            .filter_map(|p| inventory.iter().find(|i| i.id == p.id))
            .chain(inventory.iter())
            .find(|i| i.id != tool.id && matches(&i.name, &self.input))
            .cloned();
        let Some(input) = input else {
            log.warn("chain input not in inventory");
            return CombinationOutcome::Unknown {
                reason: "chain input missing".to_string(),
            };
        };

        let plan = CombinePlan {
            expected: self.output.render(&input.name),
            settle: self
                .delay_ms
                .map(Duration::from_millis)
                .unwrap_or(ctx.timing.combine_delay),
            stack: false,
        };
        CombinationEngine::new(ctx, log).combine(&tool, &input, &plan).await
    }
}

// ============================================================================
// Processor
// ============================================================================

pub struct RecipeProcessor {
    descriptor: RecipeDescriptor,
    follow_ups: Vec<Box<dyn FollowUp>>,
    locator: ToolLocator,
    log: RecipeLog,
}

impl RecipeProcessor {
    pub fn new(descriptor: RecipeDescriptor) -> Self {
        let follow_ups = descriptor
            .chain
            .iter()
            .cloned()
            .map(|s| Box::new(s) as Box<dyn FollowUp>)
            .collect();
        let log = RecipeLog::new(&descriptor.name);
        Self {
            descriptor,
            follow_ups,
            locator: ToolLocator::new(),
            log,
        }
    }

    /// Append a code-level follow-up after the declarative chain.
    pub fn with_follow_up(mut self, step: Box<dyn FollowUp>) -> Self {
        self.follow_ups.push(step);
        self
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    pub fn locator(&self) -> &ToolLocator {
        &self.locator
    }

    pub fn locator_mut(&mut self) -> &mut ToolLocator {
        &mut self.locator
    }

    /// Override the settle delay, e.g. from configuration.
    pub fn set_delay(&mut self, delay: Duration) {
        self.descriptor.delay_ms = Some(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX));
    }

    /// Does this recipe take `item`? Never true for the bot's own items.
    pub fn can_process(&self, item: &Item) -> bool {
        !item.bot_owned && matches(&item.name, &self.descriptor.accepts)
    }

    /// Settle delay after a combine: the recipe's own, else the default.
    pub fn combination_delay(&self, timing: &Timing) -> Duration {
        self.descriptor
            .delay_ms
            .map(Duration::from_millis)
            .unwrap_or(timing.combine_delay)
    }

    /// Read-only feasibility summary.
    pub fn analyze_items(&self, items: &[Item]) -> RecipeAnalysis {
        let accepted: Vec<String> = items
            .iter()
            .filter(|i| self.can_process(i))
            .map(|i| i.name.clone())
            .collect();
        let count = accepted.len();
        let description = if count == 0 {
            format!("No items for {} processing", self.descriptor.stage)
        } else {
            format!("Found {} items for {} processing", count, self.descriptor.stage)
        };
        RecipeAnalysis {
            recipe: self.descriptor.name.clone(),
            can_process: count > 0,
            stage: self.descriptor.stage.clone(),
            processable_count: count,
            description,
            accepted,
        }
    }

    /// Run `item` through the recipe. Never fails: every problem ends up in
    /// the report's outcome. When `return_to` is set, new outputs are moved
    /// into that container afterwards.
    pub async fn process(
        &mut self,
        ctx: &CraftContext,
        item: &Item,
        return_to: Option<ContainerId>,
    ) -> ProcessReport {
        let report = self.run(ctx, item, return_to).await;
        metrics::record_outcome(&self.descriptor.name, report.outcome.kind());
        report
    }

    async fn run(
        &mut self,
        ctx: &CraftContext,
        item: &Item,
        return_to: Option<ContainerId>,
    ) -> ProcessReport {
        let log = self.log.clone();
        let report = ProcessReport::new(&self.descriptor.name, &item.name);

        if !self.can_process(item) {
            log.debug(&format!("not accepted: {}", sanitize_name(&item.name)));
            return report.exit(ProcessStage::MatchChecked, ProcessOutcome::NotAccepted);
        }
        if self.find_target(ctx, item, None).is_none() {
            log.info(&format!(
                "{} (#{}) no longer present, nothing to do",
                sanitize_name(&item.name),
                item.id
            ));
            return report.exit(ProcessStage::MatchChecked, ProcessOutcome::ItemGone);
        }

        let Some(tool) = self.locator.locate(ctx, &self.descriptor.tool, &log).await else {
            log.info(&format!("cannot process, {} not found", self.descriptor.tool.name()));
            return report.exit(ProcessStage::ToolResolved, ProcessOutcome::ToolMissing);
        };

        let Some(target) = self.resolve_target(ctx, item, &tool).await else {
            log.error(&format!(
                "{} vanished after {} was resolved",
                sanitize_name(&item.name),
                self.descriptor.tool.name()
            ));
            return report.exit(ProcessStage::TargetResolved, ProcessOutcome::TargetMissing);
        };

        let plan = CombinePlan {
            expected: self.descriptor.output.render(&target.name),
            settle: self.combination_delay(&ctx.timing),
            stack: self.descriptor.stack_results,
        };
        let outcome = CombinationEngine::new(ctx, &log)
            .combine(&tool, &target, &plan)
            .await;

        let mut report = report;
        report.stage = ProcessStage::Combined;
        let mut last_produced = match &outcome {
            CombinationOutcome::Success { produced, .. } => produced.clone(),
            _ => {
                report.outcome = ProcessOutcome::Combined(outcome);
                report.stage = ProcessStage::Done;
                return report;
            }
        };
        report.outcome = ProcessOutcome::Combined(outcome);
        report.stage = ProcessStage::Verified;

        for step in &self.follow_ups {
            log.debug(&format!("follow-up: {}", step.describe()));
            let step_outcome = step.run(ctx, &mut self.locator, &last_produced, &log).await;
            let ok = match &step_outcome {
                CombinationOutcome::Success { produced, .. } => {
                    last_produced = produced.clone();
                    true
                }
                _ => false,
            };
            report.follow_ups.push(step_outcome);
            if !ok {
                log.warn("follow-up did not succeed, stopping chain");
                break;
            }
        }

        if let Some(container) = return_to {
            let tools: Vec<ItemId> = std::iter::once(tool.id)
                .chain(self.locator.ledger().entries().iter().map(|b| b.item_id))
                .collect();
            report.returned =
                return_outputs(ctx, &last_produced, &tools, container, &log).await;
        }

        report.stage = ProcessStage::Done;
        report
    }

    /// Side-effect-free lookup of the target: the same instance, or another
    /// accepted copy with the same name, in the inventory or an open player
    /// container. Never returns `exclude`.
    fn find_target(&self, ctx: &CraftContext, item: &Item, exclude: Option<u64>) -> Option<Item> {
        let usable = |i: &Item| {
            Some(i.id) != exclude
                && (i.id == item.id || (same_name(&i.name, &item.name) && self.can_process(i)))
        };
        let inventory = ctx.inventory();
        if let Some(found) = inventory
            .iter()
            .find(|i| i.id == item.id && Some(i.id) != exclude)
            .or_else(|| inventory.iter().find(|&i| usable(i)))
        {
            return Some(found.clone());
        }
        ctx.containers()
            .into_iter()
            .filter(|c| c.open && !c.is_bot_owned())
            .flat_map(|c| c.items.into_iter())
            .find(|i| usable(i))
    }

    /// Fresh lookup of the target after the tool is in hand; pulls it into
    /// the working inventory when it still sits in a container.
    async fn resolve_target(&self, ctx: &CraftContext, item: &Item, tool: &Item) -> Option<Item> {
        let target = self.find_target(ctx, item, Some(tool.id))?;
        if target.slot.is_inventory() {
            return Some(target);
        }
        pull_to_inventory(ctx, &target, &self.log).await
    }

    /// Hand back bot tools pulled by this processor.
    pub async fn return_borrowed_tools(&mut self, ctx: &CraftContext) -> ReturnSummary {
        self.locator.ledger_mut().return_borrowed_tools(ctx).await
    }
}

/// Move `produced` into `container`. Tools and the bot's own items stay put.
async fn return_outputs(
    ctx: &CraftContext,
    produced: &[Item],
    tools: &[ItemId],
    container: ContainerId,
    log: &RecipeLog,
) -> usize {
    let inventory = ctx.inventory();
    let mut moved = 0;
    for output in produced {
        // Stacking may have merged this instance away.
        let Some(current) = inventory.iter().find(|i| i.id == output.id) else {
            continue;
        };
        if current.bot_owned || tools.contains(&current.id) {
            log.error(&format!(
                "refusing to return {} (#{}): it is a tool or bot-owned",
                sanitize_name(&current.name),
                current.id
            ));
            continue;
        }
        match ctx.actions.move_to_container(current, container).await {
            Ok(()) => moved += 1,
            Err(e) => log.warn(&format!(
                "could not return {} to bag {}: {}",
                sanitize_name(&current.name),
                container,
                e
            )),
        }
    }
    moved
}
