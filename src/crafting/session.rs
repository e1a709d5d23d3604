//! Outbound seams to the remote game session.
//!
//! The engine talks to the world through two narrow interfaces:
//!
//! - [`RemoteActions`]: fire-and-forget actions (combine, move, stack). A
//!   successful return only means the action was dispatched; its effect is
//!   observed later by re-reading inventory.
//! - [`InventoryView`]: point-in-time snapshots of the working inventory and
//!   of the currently open remote containers.
//!
//! [`CraftContext`] bundles both with the [`Timing`] that governs every
//! settle delay in the engine.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::errors::SessionError;
use super::types::{Container, ContainerId, Item, Slot};

/// Upper bound on the delay between a container pull and the re-read.
pub const MAX_PULL_SETTLE: Duration = Duration::from_millis(150);

#[async_trait]
pub trait RemoteActions: Send + Sync {
    /// Use `tool` on `target`. `quality` is the target's quality level.
    async fn issue_combine(&self, tool: Slot, target: Slot, quality: u32)
        -> Result<(), SessionError>;

    /// Move an item from an open container into the working inventory.
    async fn move_to_inventory(&self, item: &Item) -> Result<(), SessionError>;

    /// Move an inventory item into a container.
    async fn move_to_container(&self, item: &Item, container: ContainerId)
        -> Result<(), SessionError>;

    /// Merge the item at `source` onto the stack at `target`.
    async fn issue_stack(&self, source: Slot, target: Slot) -> Result<(), SessionError>;
}

pub trait InventoryView: Send + Sync {
    /// Snapshot of the working inventory.
    fn working_inventory(&self) -> Vec<Item>;

    /// Snapshot of every currently open remote container, with contents.
    fn open_containers(&self) -> Vec<Container>;
}

/// Settle delays and retry bounds. All waits in the engine come from here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    /// Wait after a combine before verification.
    pub combine_delay: Duration,
    /// Wait after a container pull before each re-read. Clamped to
    /// [`MAX_PULL_SETTLE`].
    pub pull_settle: Duration,
    /// Number of re-reads after a pull before giving up.
    pub pull_attempts: u32,
    /// Wait before issuing a stacking action.
    pub stack_delay: Duration,
    /// Gap between consecutive items in a batch.
    pub between_items: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            combine_delay: Duration::from_millis(200),
            pull_settle: Duration::from_millis(150),
            pull_attempts: 3,
            stack_delay: Duration::from_millis(100),
            between_items: Duration::from_millis(200),
        }
    }
}

impl Timing {
    /// Clamp out-of-range values.
    pub fn sanitized(mut self) -> Self {
        if self.pull_settle > MAX_PULL_SETTLE {
            log::warn!(
                "pull settle {}ms exceeds bound, clamping to {}ms",
                self.pull_settle.as_millis(),
                MAX_PULL_SETTLE.as_millis()
            );
            self.pull_settle = MAX_PULL_SETTLE;
        }
        self.pull_attempts = self.pull_attempts.max(1);
        self
    }
}

/// Everything a processing call needs to reach the world.
#[derive(Clone)]
pub struct CraftContext {
    pub actions: Arc<dyn RemoteActions>,
    pub view: Arc<dyn InventoryView>,
    pub timing: Timing,
}

impl CraftContext {
    pub fn new(
        actions: Arc<dyn RemoteActions>,
        view: Arc<dyn InventoryView>,
        timing: Timing,
    ) -> Self {
        Self {
            actions,
            view,
            timing: timing.sanitized(),
        }
    }

    /// Context whose actions and view are served by the same session object.
    pub fn from_session<S>(session: Arc<S>, timing: Timing) -> Self
    where
        S: RemoteActions + InventoryView + 'static,
    {
        let actions: Arc<dyn RemoteActions> = session.clone();
        let view: Arc<dyn InventoryView> = session;
        Self::new(actions, view, timing)
    }

    /// Fresh working-inventory snapshot.
    pub fn inventory(&self) -> Vec<Item> {
        self.view.working_inventory()
    }

    /// Fresh open-container snapshot.
    pub fn containers(&self) -> Vec<Container> {
        self.view.open_containers()
    }
}
