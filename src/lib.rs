//! # Craftbot - Recipe Engine for a Trade-Based Crafting Bot
//!
//! A player hands items to the bot; the bot works out which recipe they
//! belong to, finds the tool the recipe needs, performs the combine through
//! the remote game session and checks what came out.
//!
//! ## Features
//!
//! - **Declarative recipes**: every recipe is a [`crafting::RecipeDescriptor`]
//!   (accepted names, tool, expected output, delay), built in or loaded from JSON.
//! - **Ownership-safe tool handling**: recipes that must use the player's own
//!   tool can never pick up the bot's copy; borrowed bot tools go back to their bags.
//! - **Verified combines**: one action per call, a bounded settle delay, and an
//!   explicit success / no-effect / unknown classification.
//! - **Sequential dispatch**: one actor task per session processes items in order.
//! - **Simulated session**: an in-memory world with visibility lag and failure
//!   injection for tests and dry runs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use craftbot::config::Config;
//! use craftbot::crafting::{build_processors, CraftContext, RecipeDispatcher, SimulatedSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let session = Arc::new(SimulatedSession::new());
//!     let ctx = CraftContext::from_session(session, config.timing());
//!     let processors = build_processors(&config.catalog_options()?)?;
//!     let mut dispatcher = RecipeDispatcher::new(ctx, processors);
//!     let batch = dispatcher.dispatch_batch(&[], None).await;
//!     println!("{} items processed", batch.reports.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`crafting`] - matcher, tool locator, combination engine, processor, dispatcher
//! - [`config`] - TOML configuration
//! - [`logutil`] - log-safe name rendering and the per-recipe log sink
//! - [`metrics`] - per-recipe outcome counters

pub mod config;
pub mod crafting;
pub mod logutil;
pub mod metrics;
