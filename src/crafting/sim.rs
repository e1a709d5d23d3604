//! In-memory game session.
//!
//! `SimulatedSession` implements both outbound interfaces over a small world
//! model: a working inventory, containers, and transformation rules deciding
//! what a combine produces. It also carries the knobs the engine has to cope
//! with in the real world:
//!
//! * visibility lag: an item moved into the inventory only shows up after a
//!   number of inventory reads
//! * failure injection: the next action of a kind fails with a given error
//! * an action journal with `tokio::time::Instant` timestamps, so tests can
//!   check ordering and settle delays under a paused clock

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use tokio::time::Instant;

use super::errors::{CraftError, SessionError};
use super::matcher::NamePattern;
use super::session::{InventoryView, RemoteActions};
use super::types::{Container, ContainerId, Item, ItemId, Slot, SlotLocation};

/// What a combine of matching tool and target does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRule {
    pub tool: NamePattern,
    pub target: NamePattern,
    /// Names of the produced items. `{target}` is the target's name.
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub consumes_tool: bool,
}

impl TransformRule {
    pub fn new(tool: NamePattern, target: NamePattern, outputs: &[&str]) -> Self {
        Self {
            tool,
            target,
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            consumes_tool: false,
        }
    }

    pub fn consuming_tool(mut self) -> Self {
        self.consumes_tool = true;
        self
    }
}

/// Serializable world state, used by the CLI `simulate` command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(default)]
    pub inventory: Vec<Item>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub rules: Vec<TransformRule>,
    /// A moved item first shows up on this many-th inventory read after the
    /// move. Zero and one both mean immediately.
    #[serde(default)]
    pub visibility_lag: u32,
    /// Container to return outputs to.
    #[serde(default)]
    pub return_to: Option<ContainerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Combine,
    MoveToInventory,
    MoveToContainer,
    Stack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedAction {
    Combine { tool: Slot, target: Slot, quality: u32 },
    MoveToInventory { item: ItemId },
    MoveToContainer { item: ItemId, container: ContainerId },
    Stack { source: Slot, target: Slot },
}

impl RecordedAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            RecordedAction::Combine { .. } => ActionKind::Combine,
            RecordedAction::MoveToInventory { .. } => ActionKind::MoveToInventory,
            RecordedAction::MoveToContainer { .. } => ActionKind::MoveToContainer,
            RecordedAction::Stack { .. } => ActionKind::Stack,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub at: Instant,
    pub action: RecordedAction,
    pub ok: bool,
}

#[derive(Debug, Default)]
struct World {
    inventory: Vec<Item>,
    containers: Vec<Container>,
    rules: Vec<TransformRule>,
    /// Moved items not yet visible, with the reads left before they are.
    pending: Vec<(Item, u32)>,
    visibility_lag: u32,
    failures: HashMap<ActionKind, VecDeque<SessionError>>,
    journal: Vec<JournalEntry>,
    read_times: Vec<Instant>,
    next_id: ItemId,
}

impl World {
    fn record(&mut self, action: RecordedAction, ok: bool) {
        self.journal.push(JournalEntry {
            at: Instant::now(),
            action,
            ok,
        });
    }

    fn injected_failure(&mut self, kind: ActionKind) -> Option<SessionError> {
        self.failures.get_mut(&kind).and_then(|q| q.pop_front())
    }

    fn free_inventory_position(&self) -> u32 {
        let used: Vec<u32> = self
            .inventory
            .iter()
            .chain(self.pending.iter().map(|(i, _)| i))
            .map(|i| i.slot.position)
            .collect();
        (0..).find(|p| !used.contains(p)).unwrap_or(0)
    }

    fn fresh_id(&mut self) -> ItemId {
        let max_seen = self
            .inventory
            .iter()
            .chain(self.pending.iter().map(|(i, _)| i))
            .chain(self.containers.iter().flat_map(|c| c.items.iter()))
            .map(|i| i.id)
            .max()
            .unwrap_or(0);
        self.next_id = self.next_id.max(max_seen) + 1;
        self.next_id
    }

    fn inventory_index_at(&self, slot: Slot) -> Option<usize> {
        if !slot.is_inventory() {
            return None;
        }
        self.inventory.iter().position(|i| i.slot == slot)
    }

    fn place_in_inventory(&mut self, mut item: Item, lag: u32) {
        item.slot = Slot::inventory(self.free_inventory_position());
        if lag == 0 {
            self.inventory.push(item);
        } else {
            self.pending.push((item, lag));
        }
    }

    fn combine(&mut self, tool: Slot, target: Slot) -> Result<(), SessionError> {
        let tool_idx = self
            .inventory_index_at(tool)
            .ok_or_else(|| SessionError::Rejected(format!("no tool at {}", tool)))?;
        let target_idx = self
            .inventory_index_at(target)
            .ok_or_else(|| SessionError::Rejected(format!("no target at {}", target)))?;
        let tool_item = self.inventory[tool_idx].clone();
        let target_item = self.inventory[target_idx].clone();

        let Some(rule) = self
            .rules
            .iter()
            .find(|r| r.tool.is_match(&tool_item.name) && r.target.is_match(&target_item.name))
            .cloned()
        else {
            return Ok(());
        };

        self.inventory.retain(|i| {
            i.id != target_item.id && !(rule.consumes_tool && i.id == tool_item.id)
        });
        for name in &rule.outputs {
            let id = self.fresh_id();
            let output = Item::new(id, &name.replace("{target}", &target_item.name), Slot::inventory(0))
                .with_quality(target_item.quality);
            self.place_in_inventory(output, 0);
        }
        Ok(())
    }

    fn move_to_inventory(&mut self, item: ItemId) -> Result<(), SessionError> {
        let (ci, ii) = self
            .containers
            .iter()
            .enumerate()
            .filter(|(_, c)| c.open)
            .find_map(|(ci, c)| c.items.iter().position(|i| i.id == item).map(|ii| (ci, ii)))
            .ok_or(SessionError::ItemUnavailable(item))?;
        let moved = self.containers[ci].items.remove(ii);
        let lag = self.visibility_lag;
        self.place_in_inventory(moved, lag);
        Ok(())
    }

    fn move_to_container(&mut self, item: ItemId, container: ContainerId) -> Result<(), SessionError> {
        let ci = self
            .containers
            .iter()
            .position(|c| c.id == container)
            .ok_or(SessionError::ContainerUnavailable(container))?;
        let ii = self
            .inventory
            .iter()
            .position(|i| i.id == item)
            .ok_or(SessionError::ItemUnavailable(item))?;
        let mut moved = self.inventory.remove(ii);
        let used: Vec<u32> = self.containers[ci]
            .items
            .iter()
            .map(|i| i.slot.position)
            .collect();
        let position = (0..).find(|p| !used.contains(p)).unwrap_or(0);
        moved.slot = Slot::container(container, position);
        self.containers[ci].items.push(moved);
        Ok(())
    }

    fn stack(&mut self, source: Slot, target: Slot) -> Result<(), SessionError> {
        let si = self
            .inventory_index_at(source)
            .ok_or_else(|| SessionError::Rejected(format!("nothing at {}", source)))?;
        let ti = self
            .inventory_index_at(target)
            .ok_or_else(|| SessionError::Rejected(format!("nothing at {}", target)))?;
        if si == ti || self.inventory[si].name != self.inventory[ti].name {
            return Err(SessionError::Rejected("items do not stack".to_string()));
        }
        self.inventory.remove(si);
        Ok(())
    }
}

pub struct SimulatedSession {
    world: Mutex<World>,
}

impl Default for SimulatedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSession {
    pub fn new() -> Self {
        Self {
            world: Mutex::new(World::default()),
        }
    }

    pub fn from_snapshot(snapshot: WorldSnapshot) -> Self {
        let world = World {
            inventory: snapshot.inventory,
            containers: snapshot.containers,
            rules: snapshot.rules,
            visibility_lag: snapshot.visibility_lag,
            ..World::default()
        };
        Self {
            world: Mutex::new(world),
        }
    }

    fn world(&self) -> std::sync::MutexGuard<'_, World> {
        self.world.lock().expect("simulated world mutex poisoned")
    }

    // ========================================================================
    // World setup
    // ========================================================================

    pub fn add_item(&self, item: Item) {
        let mut w = self.world();
        match item.slot.location {
            SlotLocation::Inventory => w.inventory.push(item),
            SlotLocation::Container(id) => {
                if let Some(c) = w.containers.iter_mut().find(|c| c.id == id) {
                    c.items.push(item);
                }
            }
        }
    }

    pub fn add_container(&self, container: Container) {
        self.world().containers.push(container);
    }

    pub fn set_container_open(&self, id: ContainerId, open: bool) {
        if let Some(c) = self.world().containers.iter_mut().find(|c| c.id == id) {
            c.open = open;
        }
    }

    pub fn add_rule(&self, rule: TransformRule) {
        self.world().rules.push(rule);
    }

    pub fn set_visibility_lag(&self, reads: u32) {
        self.world().visibility_lag = reads;
    }

    /// Make the next action of `kind` fail with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, kind: ActionKind, error: SessionError) {
        self.world().failures.entry(kind).or_default().push_back(error);
    }

    /// Remove an item from wherever it is, as if a player took it back.
    pub fn remove_item(&self, id: ItemId) -> Option<Item> {
        let mut w = self.world();
        if let Some(pos) = w.inventory.iter().position(|i| i.id == id) {
            return Some(w.inventory.remove(pos));
        }
        for c in w.containers.iter_mut() {
            if let Some(pos) = c.items.iter().position(|i| i.id == id) {
                return Some(c.items.remove(pos));
            }
        }
        None
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn journal(&self) -> Vec<JournalEntry> {
        self.world().journal.clone()
    }

    pub fn action_count(&self, kind: ActionKind) -> usize {
        self.world()
            .journal
            .iter()
            .filter(|e| e.action.kind() == kind)
            .count()
    }

    /// Inventory contents, including items still hidden by visibility lag.
    /// Does not count as a read.
    pub fn inventory_items(&self) -> Vec<Item> {
        let w = self.world();
        w.inventory
            .iter()
            .cloned()
            .chain(w.pending.iter().map(|(i, _)| i.clone()))
            .collect()
    }

    pub fn container(&self, id: ContainerId) -> Option<Container> {
        self.world().containers.iter().find(|c| c.id == id).cloned()
    }

    /// When each `working_inventory` read happened, in order.
    pub fn inventory_read_times(&self) -> Vec<Instant> {
        self.world().read_times.clone()
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let w = self.world();
        WorldSnapshot {
            inventory: w
                .inventory
                .iter()
                .cloned()
                .chain(w.pending.iter().map(|(i, _)| i.clone()))
                .collect(),
            containers: w.containers.clone(),
            rules: w.rules.clone(),
            visibility_lag: w.visibility_lag,
            return_to: None,
        }
    }
}

/// Read a [`WorldSnapshot`] from a JSON file.
pub fn load_world_from_json<P: AsRef<Path>>(path: P) -> Result<WorldSnapshot, CraftError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| CraftError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[async_trait]
impl RemoteActions for SimulatedSession {
    async fn issue_combine(&self, tool: Slot, target: Slot, quality: u32) -> Result<(), SessionError> {
        let mut w = self.world();
        let action = RecordedAction::Combine {
            tool,
            target,
            quality,
        };
        let result = match w.injected_failure(ActionKind::Combine) {
            Some(e) => Err(e),
            None => w.combine(tool, target),
        };
        w.record(action, result.is_ok());
        result
    }

    async fn move_to_inventory(&self, item: &Item) -> Result<(), SessionError> {
        let mut w = self.world();
        let result = match w.injected_failure(ActionKind::MoveToInventory) {
            Some(e) => Err(e),
            None => w.move_to_inventory(item.id),
        };
        w.record(RecordedAction::MoveToInventory { item: item.id }, result.is_ok());
        result
    }

    async fn move_to_container(&self, item: &Item, container: ContainerId) -> Result<(), SessionError> {
        let mut w = self.world();
        let result = match w.injected_failure(ActionKind::MoveToContainer) {
            Some(e) => Err(e),
            None => w.move_to_container(item.id, container),
        };
        w.record(
            RecordedAction::MoveToContainer {
                item: item.id,
                container,
            },
            result.is_ok(),
        );
        result
    }

    async fn issue_stack(&self, source: Slot, target: Slot) -> Result<(), SessionError> {
        let mut w = self.world();
        let result = match w.injected_failure(ActionKind::Stack) {
            Some(e) => Err(e),
            None => w.stack(source, target),
        };
        w.record(RecordedAction::Stack { source, target }, result.is_ok());
        result
    }
}

impl InventoryView for SimulatedSession {
    fn working_inventory(&self) -> Vec<Item> {
        let mut w = self.world();
        w.read_times.push(Instant::now());
        let mut still_pending = Vec::new();
        for (item, reads_left) in std::mem::take(&mut w.pending) {
            if reads_left <= 1 {
                w.inventory.push(item);
            } else {
                still_pending.push((item, reads_left - 1));
            }
        }
        w.pending = still_pending;
        w.inventory.clone()
    }

    fn open_containers(&self) -> Vec<Container> {
        self.world()
            .containers
            .iter()
            .filter(|c| c.open)
            .cloned()
            .collect()
    }
}
