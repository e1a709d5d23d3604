//! Recipe-processing engine.
//!
//! Leaves first: [`matcher`] decides whether a name fits a rule, [`locator`]
//! finds tools under an ownership policy, [`engine`] performs and verifies a
//! single combine, [`processor`] runs one recipe end to end and [`dispatch`]
//! routes items to recipes. [`sim`] is an in-memory session for tests and the
//! CLI.

pub mod catalog;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod locator;
pub mod matcher;
pub mod processor;
pub mod session;
pub mod sim;
pub mod types;

pub use catalog::{build_catalog, build_processors, builtin_recipes, load_recipes_from_json, CatalogOptions};
pub use dispatch::{start_dispatcher, BatchReport, DispatcherHandle, DispatcherStats, RecipeDispatcher};
pub use engine::{CombinationEngine, CombinePlan};
pub use errors::{CraftError, SessionError};
pub use locator::{BorrowedTool, ReturnSummary, ToolLedger, ToolLocator};
pub use matcher::{matches, MatchMode, NamePattern, RecipeRule};
pub use processor::{
    ChainStep, FollowUp, ProcessOutcome, ProcessReport, ProcessStage, RecipeDescriptor, RecipeProcessor,
};
pub use session::{CraftContext, InventoryView, RemoteActions, Timing};
pub use sim::{load_world_from_json, SimulatedSession, TransformRule, WorldSnapshot};
pub use types::{
    CombinationOutcome, Container, ContainerId, ContainerOwner, Item, ItemId, RecipeAnalysis, Slot,
    SlotLocation, ToolPolicy, ToolRequirement,
};
