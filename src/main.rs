//! Binary entrypoint for the craftbot CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml`
//! - `recipes` - list enabled recipes with their tool and ownership policy
//! - `analyze <names...>` - which recipes would take the given item names
//! - `simulate <world.json> [--return-to <bag>]` - run every player item of a
//!   simulated world through the dispatcher and print the reports
//!
//! See the library crate docs for module-level details: `craftbot::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::sync::Arc;

use craftbot::config::Config;
use craftbot::crafting::{
    build_processors, load_world_from_json, start_dispatcher, CraftContext, InventoryView, Item,
    RecipeDispatcher, SimulatedSession, Slot,
};
use craftbot::metrics;

#[derive(Parser)]
#[command(name = "craftbot")]
#[command(about = "Recipe engine for a trade-based crafting bot")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// List enabled recipes
    Recipes,
    /// Report which recipes accept the given item names
    Analyze {
        /// Item display names
        #[arg(required = true)]
        names: Vec<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Process every player item of a simulated world
    Simulate {
        /// World snapshot (JSON)
        world: String,
        /// Container to move produced items into (overrides the snapshot)
        #[arg(long)]
        return_to: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&config, cli.verbose);

    let config = match (&cli.command, config) {
        (Commands::Init, _) => Config::default(),
        (_, Some(config)) => config,
        (_, None) => Config::load_or_default(&cli.config).await?,
    };

    match cli.command {
        Commands::Init => {
            info!("Initializing new craftbot configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Recipes => {
            let processors = build_processors(&config.catalog_options()?)?;
            let timing = config.timing();
            for p in &processors {
                let d = p.descriptor();
                println!(
                    "{:<22} tool: {:<38} policy: {:<16} delay: {}ms{}",
                    d.name,
                    d.tool.name(),
                    d.tool.policy.label(),
                    p.combination_delay(&timing).as_millis(),
                    if d.chain.is_empty() {
                        String::new()
                    } else {
                        format!(" (+{} follow-up steps)", d.chain.len())
                    }
                );
            }
        }
        Commands::Analyze { names, json } => {
            let processors = build_processors(&config.catalog_options()?)?;
            let items: Vec<Item> = names
                .iter()
                .enumerate()
                .map(|(i, name)| Item::new(i as u64 + 1, name, Slot::inventory(i as u32)))
                .collect();
            let session = Arc::new(SimulatedSession::new());
            let ctx = CraftContext::from_session(session, config.timing());
            let dispatcher = RecipeDispatcher::new(ctx, processors);
            let report = dispatcher.analyze(&items);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.is_empty() {
                println!("No recipe accepts any of the given items.");
            } else {
                for a in &report {
                    println!("{}: {} [{}]", a.recipe, a.description, a.accepted.join(", "));
                }
            }
        }
        Commands::Simulate { world, return_to } => {
            let snapshot = load_world_from_json(&world)
                .map_err(|e| anyhow!("Failed to load world {}: {}", world, e))?;
            let return_to = return_to.or(snapshot.return_to);
            let session = Arc::new(SimulatedSession::from_snapshot(snapshot));
            let ctx = CraftContext::from_session(session.clone(), config.timing());

            let mut items: Vec<Item> = session
                .working_inventory()
                .into_iter()
                .filter(|i| !i.bot_owned)
                .collect();
            items.extend(
                session
                    .open_containers()
                    .into_iter()
                    .filter(|c| !c.is_bot_owned())
                    .flat_map(|c| c.items.into_iter())
                    .filter(|i| !i.bot_owned),
            );
            info!("Simulating {} player items from {}", items.len(), world);

            let processors = build_processors(&config.catalog_options()?)?;
            let handle = start_dispatcher(RecipeDispatcher::new(ctx, processors));
            let batch = handle
                .submit(items, return_to)
                .await
                .ok_or_else(|| anyhow!("dispatcher stopped unexpectedly"))?;
            let returned = handle.return_tools().await.unwrap_or_default();

            for r in &batch.reports {
                println!("{:<22} {:<40} {:?} {}", r.recipe, r.item, r.stage, r.outcome.label());
                for (n, step) in r.follow_ups.iter().enumerate() {
                    println!("{:<22}   step {}: {}", "", n + 1, step.label());
                }
            }
            for name in &batch.unhandled {
                println!("{:<22} {:<40} no recipe", "-", name);
            }
            println!(
                "tools: {} returned, {} left for player, {} failed",
                returned.returned, returned.left_for_player, returned.failed
            );

            let mut counters: Vec<_> = metrics::recipe_counters_snapshot().into_iter().collect();
            counters.sort_by(|a, b| a.0.cmp(&b.0));
            for (recipe, c) in counters {
                println!(
                    "{:<22} attempts={} success={} no_effect={} unknown={} tool_missing={} target_missing={} skipped={}",
                    recipe, c.attempts, c.successes, c.no_effect, c.unknown, c.tool_missing, c.target_missing, c.skipped
                );
            }
            if let Some(stats) = handle.stats().await {
                info!("dispatcher stats: {}", serde_json::to_string(&stats)?);
            }
            handle.shutdown().await;
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Only echo to the console when someone is watching
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
