//! One combine action and its verification.
//!
//! The engine never retries. It issues exactly one combine, waits the plan's
//! settle delay, re-reads the inventory and classifies what it sees:
//!
//! | observation                                              | outcome    |
//! |----------------------------------------------------------|------------|
//! | new output instance, or output present and target gone   | `Success`  |
//! | no new output, tool and target both still present        | `NoEffect` |
//! | anything else                                            | `Unknown`  |
//!
//! The tool and target instances never count as output, even when their names
//! satisfy the output rule. `produced` only lists instances that were not in
//! the inventory before the combine; an output merged into an existing stack
//! is a success with nothing produced.

use std::collections::HashSet;
use std::time::Duration;

use crate::logutil::{sanitize_name, RecipeLog};

use super::matcher::{matches, RecipeRule};
use super::session::CraftContext;
use super::types::{CombinationOutcome, Item, ItemId};

/// What to expect from one combine.
#[derive(Debug, Clone)]
pub struct CombinePlan {
    /// Rule the produced item must satisfy, already rendered for the target.
    pub expected: RecipeRule,
    /// Wait between the combine and the verification re-read.
    pub settle: Duration,
    /// Merge two output instances after a success.
    pub stack: bool,
}

pub struct CombinationEngine<'a> {
    ctx: &'a CraftContext,
    log: &'a RecipeLog,
}

impl<'a> CombinationEngine<'a> {
    pub fn new(ctx: &'a CraftContext, log: &'a RecipeLog) -> Self {
        Self { ctx, log }
    }

    pub async fn combine(&self, tool: &Item, target: &Item, plan: &CombinePlan) -> CombinationOutcome {
        let before: HashSet<ItemId> = self.ctx.inventory().iter().map(|i| i.id).collect();

        self.log.debug(&format!(
            "combining {} ({}) with {} ({}), ql {}",
            sanitize_name(&tool.name),
            tool.slot,
            sanitize_name(&target.name),
            target.slot,
            target.quality
        ));
        if let Err(e) = self
            .ctx
            .actions
            .issue_combine(tool.slot, target.slot, target.quality)
            .await
        {
            self.log.warn(&format!("combine failed remotely: {}", e));
            return CombinationOutcome::Unknown {
                reason: format!("combine rejected: {}", e),
            };
        }

        tokio::time::sleep(plan.settle).await;

        let after = self.ctx.inventory();
        let outputs: Vec<Item> = after
            .iter()
            .filter(|i| i.id != tool.id && i.id != target.id)
            .filter(|i| matches(&i.name, &plan.expected))
            .cloned()
            .collect();
        let fresh: Vec<Item> = outputs
            .iter()
            .filter(|i| !before.contains(&i.id))
            .cloned()
            .collect();
        let tool_present = after.iter().any(|i| i.id == tool.id);
        let target_present = after.iter().any(|i| i.id == target.id);

        if !fresh.is_empty() || (!outputs.is_empty() && !target_present) {
            if fresh.is_empty() {
                self.log
                    .info("target consumed, output merged into an existing stack");
            } else {
                self.log.info(&format!(
                    "produced {}",
                    fresh
                        .iter()
                        .map(|i| sanitize_name(&i.name))
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
            let produced = fresh;
            let stacked = plan.stack && self.stack_outputs(&outputs).await;
            return CombinationOutcome::Success { produced, stacked };
        }

        if tool_present && target_present {
            self.log.debug("no output and both inputs still present");
            return CombinationOutcome::NoEffect;
        }

        let reason = match (tool_present, target_present) {
            (false, false) => "tool and target vanished without expected output",
            (false, true) => "tool vanished without expected output",
            _ => "target vanished without expected output",
        };
        self.log.warn(&format!(
            "unverified combine of {} on {}: {}",
            sanitize_name(&tool.name),
            sanitize_name(&target.name),
            reason
        ));
        CombinationOutcome::Unknown {
            reason: reason.to_string(),
        }
    }

    /// Merge the first output onto the second. `true` when the action was
    /// accepted by the session.
    async fn stack_outputs(&self, outputs: &[Item]) -> bool {
        let [first, second, ..] = outputs else {
            return false;
        };
        tokio::time::sleep(self.ctx.timing.stack_delay).await;
        match self.ctx.actions.issue_stack(first.slot, second.slot).await {
            Ok(()) => {
                self.log
                    .debug(&format!("stacked {} onto {}", first.slot, second.slot));
                true
            }
            Err(e) => {
                self.log.warn(&format!("stacking failed: {}", e));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crafting::matcher::NamePattern;
    use crate::crafting::session::Timing;
    use crate::crafting::sim::{SimulatedSession, TransformRule};
    use crate::crafting::types::Slot;
    use std::sync::Arc;

    fn plan(output: NamePattern) -> CombinePlan {
        CombinePlan {
            expected: RecipeRule::new().accepting(output),
            settle: Duration::from_millis(200),
            stack: true,
        }
    }

    fn setup(sim: SimulatedSession) -> (Arc<SimulatedSession>, CraftContext) {
        let sim = Arc::new(sim);
        let ctx = CraftContext::from_session(sim.clone(), Timing::default());
        (sim, ctx)
    }

    #[tokio::test(start_paused = true)]
    async fn tool_matching_output_rule_is_not_a_product() {
        let sim = SimulatedSession::new();
        let tool = Item::new(1, "Precious Metal Reclaimer", Slot::inventory(0)).owned_by_bot();
        let ring = Item::new(2, "Golden Ring", Slot::inventory(1));
        sim.add_item(tool.clone());
        sim.add_item(ring.clone());
        sim.add_rule(TransformRule::new(
            NamePattern::ignore_case("Precious Metal Reclaimer"),
            NamePattern::ignore_case("Golden Ring"),
            &[],
        ));
        let (sim, ctx) = setup(sim);
        let log = RecipeLog::new("engine-test");

        let outcome = CombinationEngine::new(&ctx, &log)
            .combine(&tool, &ring, &plan(NamePattern::contains("Precious")))
            .await;

        assert!(matches!(outcome, CombinationOutcome::Unknown { .. }));
        assert!(sim.inventory_items().iter().any(|i| i.id == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn merged_output_produces_nothing_new() {
        let sim = SimulatedSession::new();
        let tool = Item::new(1, "Nano Programming Interface", Slot::inventory(0));
        let crystal = Item::new(2, "Badly Corroded Crystal (Reflect)", Slot::inventory(1));
        sim.add_item(tool.clone());
        sim.add_item(crystal.clone());
        sim.add_item(Item::new(3, "Nano Crystal (Reflect)", Slot::inventory(2)));
        sim.add_rule(TransformRule::new(
            NamePattern::ignore_case("Nano Programming Interface"),
            NamePattern::prefix("Badly Corroded Crystal"),
            &[],
        ));
        let (sim, ctx) = setup(sim);
        let log = RecipeLog::new("engine-test");

        let outcome = CombinationEngine::new(&ctx, &log)
            .combine(&tool, &crystal, &plan(NamePattern::contains("Nano Crystal")))
            .await;

        assert_eq!(
            outcome,
            CombinationOutcome::Success {
                produced: Vec::new(),
                stacked: false,
            }
        );
        assert_eq!(sim.action_count(crate::crafting::sim::ActionKind::Stack), 0);
    }
}
