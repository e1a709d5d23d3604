//! Recipe routing and the per-session crafting actor.
//!
//! [`RecipeDispatcher`] owns an ordered list of processors; the first one that
//! accepts an item handles it. Items of one session are processed strictly one
//! after another: [`start_dispatcher`] moves the dispatcher into a single
//! tokio task fed by an unbounded channel, and [`DispatcherHandle`] is the only
//! way to reach it afterwards.

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::logutil::sanitize_name;

use super::locator::ReturnSummary;
use super::matcher::normalize;
use super::processor::{ProcessReport, RecipeProcessor};
use super::session::CraftContext;
use super::types::{ContainerId, Item, RecipeAnalysis};

/// Reports for one batch, in processing order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub reports: Vec<ProcessReport>,
    /// Names no recipe accepts, one entry per distinct name.
    pub unhandled: Vec<String>,
}

impl BatchReport {
    pub fn successes(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_success()).count()
    }
}

pub struct RecipeDispatcher {
    ctx: CraftContext,
    processors: Vec<RecipeProcessor>,
}

impl RecipeDispatcher {
    pub fn new(ctx: CraftContext, processors: Vec<RecipeProcessor>) -> Self {
        Self { ctx, processors }
    }

    pub fn context(&self) -> &CraftContext {
        &self.ctx
    }

    pub fn recipe_names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    fn position_for(&self, item: &Item) -> Option<usize> {
        self.processors.iter().position(|p| p.can_process(item))
    }

    /// First processor, in registration order, that accepts `item`.
    pub fn find_processor(&self, item: &Item) -> Option<&RecipeProcessor> {
        self.position_for(item).map(|i| &self.processors[i])
    }

    /// Route one item. `None` when no recipe accepts it.
    pub async fn dispatch(&mut self, item: &Item, return_to: Option<ContainerId>) -> Option<ProcessReport> {
        let Some(idx) = self.position_for(item) else {
            log::debug!("no recipe for {}", sanitize_name(&item.name));
            return None;
        };
        Some(self.processors[idx].process(&self.ctx, item, return_to).await)
    }

    /// Route a batch. Items are grouped by name, the recipe lookup runs once
    /// per distinct name, and every instance of a group is processed in turn
    /// with `between_items` between consecutive combines.
    pub async fn dispatch_batch(&mut self, items: &[Item], return_to: Option<ContainerId>) -> BatchReport {
        let mut groups: Vec<(String, Vec<&Item>)> = Vec::new();
        for item in items {
            let key = normalize(&item.name).to_lowercase();
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(item),
                None => groups.push((key, vec![item])),
            }
        }

        let mut batch = BatchReport::default();
        let mut first = true;
        for (_, members) in groups {
            let Some(idx) = members.iter().find_map(|i| self.position_for(i)) else {
                log::info!("no recipe accepts {}", sanitize_name(&members[0].name));
                batch.unhandled.push(members[0].name.clone());
                continue;
            };
            log::info!(
                "{} x{} -> {}",
                sanitize_name(&members[0].name),
                members.len(),
                self.processors[idx].name()
            );
            for item in members {
                if !first {
                    tokio::time::sleep(self.ctx.timing.between_items).await;
                }
                first = false;
                let report = self.processors[idx].process(&self.ctx, item, return_to).await;
                batch.reports.push(report);
            }
        }
        batch
    }

    /// Feasibility report from every recipe that accepts something in `items`.
    pub fn analyze(&self, items: &[Item]) -> Vec<RecipeAnalysis> {
        self.processors
            .iter()
            .map(|p| p.analyze_items(items))
            .filter(|a| a.can_process)
            .collect()
    }

    /// Put every borrowed bot tool back in its bag.
    pub async fn return_borrowed_tools(&mut self) -> ReturnSummary {
        let mut total = ReturnSummary::default();
        for processor in &mut self.processors {
            total.merge(processor.return_borrowed_tools(&self.ctx).await);
        }
        if total.returned + total.failed > 0 {
            log::info!(
                "tool return: {} returned, {} failed, {} left for player",
                total.returned,
                total.failed,
                total.left_for_player
            );
        }
        total
    }
}

// ============================================================================
// Actor
// ============================================================================

pub enum DispatchCommand {
    Submit {
        items: Vec<Item>,
        return_to: Option<ContainerId>,
        resp: oneshot::Sender<BatchReport>,
    },
    Analyze {
        items: Vec<Item>,
        resp: oneshot::Sender<Vec<RecipeAnalysis>>,
    },
    ReturnTools(oneshot::Sender<ReturnSummary>),
    Stats(oneshot::Sender<DispatcherStats>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatcherStats {
    pub batches: u64,
    pub items_processed: u64,
    pub successes: u64,
    pub unhandled: u64,
    pub tools_returned: u64,
}

#[derive(Clone, Debug)]
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<DispatchCommand>,
}

impl DispatcherHandle {
    /// Queue a batch and wait for its reports. `None` once the actor is gone.
    pub async fn submit(&self, items: Vec<Item>, return_to: Option<ContainerId>) -> Option<BatchReport> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(DispatchCommand::Submit {
                items,
                return_to,
                resp: tx,
            })
            .ok()?;
        rx.await.ok()
    }

    pub async fn analyze(&self, items: Vec<Item>) -> Option<Vec<RecipeAnalysis>> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(DispatchCommand::Analyze { items, resp: tx }).ok()?;
        rx.await.ok()
    }

    pub async fn return_tools(&self) -> Option<ReturnSummary> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(DispatchCommand::ReturnTools(tx)).ok()?;
        rx.await.ok()
    }

    pub async fn stats(&self) -> Option<DispatcherStats> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(DispatchCommand::Stats(tx)).ok()?;
        rx.await.ok()
    }

    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(DispatchCommand::Shutdown(tx));
        let _ = rx.await;
    }
}

pub fn start_dispatcher(mut dispatcher: RecipeDispatcher) -> DispatcherHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<DispatchCommand>();
    let handle = DispatcherHandle { tx };

    tokio::spawn(async move {
        let mut stats = DispatcherStats::default();
        while let Some(cmd) = rx.recv().await {
            match cmd {
                DispatchCommand::Submit {
                    items,
                    return_to,
                    resp,
                } => {
                    let batch = dispatcher.dispatch_batch(&items, return_to).await;
                    stats.batches += 1;
                    stats.items_processed += batch.reports.len() as u64;
                    stats.successes += batch.successes() as u64;
                    stats.unhandled += batch.unhandled.len() as u64;
                    let _ = resp.send(batch);
                }
                DispatchCommand::Analyze { items, resp } => {
                    let _ = resp.send(dispatcher.analyze(&items));
                }
                DispatchCommand::ReturnTools(resp) => {
                    let summary = dispatcher.return_borrowed_tools().await;
                    stats.tools_returned += summary.returned as u64;
                    let _ = resp.send(summary);
                }
                DispatchCommand::Stats(resp) => {
                    let _ = resp.send(stats.clone());
                }
                DispatchCommand::Shutdown(done) => {
                    let _ = done.send(());
                    break;
                }
            }
        }
        log::debug!(
            "dispatcher stopped after {} batches ({} items)",
            stats.batches,
            stats.items_processed
        );
    });

    handle
}
