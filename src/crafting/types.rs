//! Core data model shared by the matcher, locator, engine and processor.
//!
//! Items and containers are snapshots of remote state: the engine never
//! creates or destroys them, it only reads them and asks the session to move
//! them around.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::matcher::NamePattern;

/// Remote instance id of an item. Stable while the item exists, never reused
/// for a different item within one session.
pub type ItemId = u64;

/// Remote id of a container (bag, backpack).
pub type ContainerId = u64;

// ============================================================================
// Items, slots and containers
// ============================================================================

/// Where an item currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotLocation {
    /// The bot's working inventory.
    Inventory,
    /// Inside a remote container.
    Container(ContainerId),
}

/// Location plus position within that location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub location: SlotLocation,
    pub position: u32,
}

impl Slot {
    pub fn inventory(position: u32) -> Self {
        Self {
            location: SlotLocation::Inventory,
            position,
        }
    }

    pub fn container(container: ContainerId, position: u32) -> Self {
        Self {
            location: SlotLocation::Container(container),
            position,
        }
    }

    pub fn is_inventory(&self) -> bool {
        matches!(self.location, SlotLocation::Inventory)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            SlotLocation::Inventory => write!(f, "inv:{}", self.position),
            SlotLocation::Container(id) => write!(f, "bag{}:{}", id, self.position),
        }
    }
}

/// A tradeable in-world object as seen in one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Display name. The only identity used for matching; not unique.
    pub name: String,
    pub slot: Slot,
    /// Quality level, forwarded with the combine action.
    #[serde(default = "default_quality")]
    pub quality: u32,
    /// Part of the bot operator's own equipment.
    #[serde(default)]
    pub bot_owned: bool,
}

fn default_quality() -> u32 {
    1
}

impl Item {
    pub fn new(id: ItemId, name: &str, slot: Slot) -> Self {
        Self {
            id,
            name: name.to_string(),
            slot,
            quality: default_quality(),
            bot_owned: false,
        }
    }

    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = quality;
        self
    }

    pub fn owned_by_bot(mut self) -> Self {
        self.bot_owned = true;
        self
    }
}

/// Who a container belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerOwner {
    Bot,
    Player(String),
}

/// A bag-like grouping of items. Remote containers must be open before their
/// contents are visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub name: String,
    pub owner: ContainerOwner,
    #[serde(default)]
    pub open: bool,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Container {
    pub fn is_bot_owned(&self) -> bool {
        matches!(self.owner, ContainerOwner::Bot)
    }
}

// ============================================================================
// Tool requirements
// ============================================================================

/// Ownership policy for a recipe's catalyst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolPolicy {
    /// Use the bot's own tool; risking it is acceptable.
    BotOwned,
    /// Must never use the bot's copy.
    PlayerProvided,
    /// Player-provided first, the bot's tool only when none exists.
    PreferPlayerFallbackBot,
}

impl ToolPolicy {
    pub fn allows_bot_tool(self) -> bool {
        !matches!(self, ToolPolicy::PlayerProvided)
    }

    pub fn label(self) -> &'static str {
        match self {
            ToolPolicy::BotOwned => "bot",
            ToolPolicy::PlayerProvided => "player",
            ToolPolicy::PreferPlayerFallbackBot => "player-then-bot",
        }
    }
}

/// A named catalyst and the policy governing which copy may be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequirement {
    pub pattern: NamePattern,
    pub policy: ToolPolicy,
}

impl ToolRequirement {
    pub fn new(pattern: NamePattern, policy: ToolPolicy) -> Self {
        Self { pattern, policy }
    }

    /// Display name of the tool, for logs and reports.
    pub fn name(&self) -> &str {
        &self.pattern.token
    }
}

// ============================================================================
// Outcomes and reports
// ============================================================================

/// Result of one combine attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombinationOutcome {
    /// Expected output observed.
    Success {
        /// Newly observed output instances.
        produced: Vec<Item>,
        /// Whether a stacking action was issued afterwards.
        stacked: bool,
    },
    /// Both inputs still present, nothing produced.
    NoEffect,
    /// Something happened but verification could not confirm it.
    Unknown { reason: String },
}

impl CombinationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CombinationOutcome::Success { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            CombinationOutcome::Success { .. } => "success",
            CombinationOutcome::NoEffect => "no-effect",
            CombinationOutcome::Unknown { .. } => "unknown",
        }
    }
}

/// Read-only feasibility summary for a batch of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeAnalysis {
    pub recipe: String,
    pub can_process: bool,
    pub stage: String,
    pub processable_count: usize,
    pub description: String,
    /// Names of the accepted items, in input order.
    pub accepted: Vec<String>,
}
