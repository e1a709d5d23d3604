//! Built-in recipes and the JSON recipe loader.
//!
//! Matching strictness is chosen per pattern here: gem and ore lists are
//! case-insensitive exact names, part families use substring matches, and
//! damaged crystals are recognized by prefix.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use super::errors::CraftError;
use super::matcher::{same_name, MatchMode, NamePattern, RecipeRule};
use super::processor::{ChainStep, RecipeDescriptor, RecipeProcessor};
use super::types::{ToolPolicy, ToolRequirement};

const GEMS: &[&str] = &[
    "Blue Pearl by Conner",
    "Crystal Sphere",
    "Ember",
    "Ember Sphere",
    "Flawless Spring Crystal",
    "Gem",
    "High Quality Silver Onyx",
    "Hot Stone",
    "Pearl of Rubi-Ka",
    "Rubi-Ka Ruby",
    "Ruby",
    "Silver Pearl",
    "Soul Fragment",
    "Gold 2 Sphere Pearl by Peters & Tool",
    "Shining 2 Sphere by Pearl, Peters & Tool",
    "Pearl",
    "Almandine",
    "Amber",
    "Aquamarine",
    "Balas ruby",
    "Black opal",
    "Chrysoberyl",
    "Coral",
    "Demantoid",
    "Diamond",
    "Emerald",
    "Fire opal",
    "Jet",
    "Red beryl",
    "Ruby Pearl",
    "Sapphire",
    "Star Ruby",
    "Topaz",
    "Water opal",
    "White opal",
];

const PRECIOUS_METALS: &[&str] = &[
    "Golden Sphere",
    "Golden Ring",
    "Marriage Ring",
    "Bracer of Shielding - Elements",
    "Bracelet of Ka",
    "Golden Bracer",
    "Golden Nugget",
    "Pink Ring",
    "Silver Nugget",
    "Flower Ring",
    "OT Ring",
    "Ring of Luck - Defensive",
    "Ring of Power - Elements",
    "Ring of Suffering",
    "Ring of Zern",
    "Snake Ring",
    "Toe-Ring",
    "Ring of Luck - Offensive",
    "Bracer of Reflection - Elements",
    "Engagement Ring",
    "Ring of Flowers",
    "Flower-Ring",
    "Engagement-Ring",
];

const MONSTER_PARTS: &[&str] = &[
    "Monster Parts",
    "Pelted Monster Parts",
    "Pelted Monster Parts with Ivory",
    "Monster Parts with Ivory",
];

const DAMAGED_CRYSTALS: &[&str] = &[
    "Badly Corroded Crystal",
    "Failed Repaired Crystal",
    "Badly Eroded Crystal",
    "Hacked Corroded Crystal",
    "Blood Stained and Corroded Crystal",
    "Overcharged Corroded Nano Crystal",
    "Severly Corroded Shadow Crystal",
    "Cracked and Miskept Shadow Crystal",
    "Snow Crashed Shadow Crystal",
    "Cracked Crystal",
    "Tainted Shadow Crystal",
    "Dirty Money Shadow Crystal",
    "Weird looking",
];

fn tool(name: &str, policy: ToolPolicy) -> ToolRequirement {
    ToolRequirement::new(NamePattern::ignore_case(name), policy)
}

fn named(names: &[&str]) -> RecipeRule {
    RecipeRule::new().accepting_all(names, MatchMode::IgnoreCase)
}

fn recipe(name: &str, stage: &str, accepts: RecipeRule, tool: ToolRequirement, output: RecipeRule) -> RecipeDescriptor {
    RecipeDescriptor {
        name: name.to_string(),
        stage: stage.to_string(),
        accepts,
        tool,
        output,
        delay_ms: None,
        stack_results: false,
        chain: Vec::new(),
    }
}

/// The recipes every bot knows, in routing order.
pub fn builtin_recipes() -> Vec<RecipeDescriptor> {
    let mut ice = recipe(
        "ICE",
        "ICE Upgrade",
        named(&["Hacker ICE-Breaker Source"]),
        tool("Nano Programming Interface", ToolPolicy::BotOwned),
        named(&["Upgraded Controller Recompiler Unit"]),
    );
    ice.stack_results = true;

    let pearl = recipe(
        "Pearl",
        "Gem Cutting",
        named(GEMS),
        tool("Jensen Gem Cutter", ToolPolicy::BotOwned),
        RecipeRule::new().accepting(NamePattern::ignore_case("Perfectly Cut {target}")),
    );

    let plasma = recipe(
        "Plasma",
        "Blood Plasma",
        named(MONSTER_PARTS).accepting(NamePattern::contains("monster parts")),
        ToolRequirement::new(
            NamePattern::contains("Bio-Comminutor"),
            ToolPolicy::PreferPlayerFallbackBot,
        ),
        RecipeRule::new().accepting(NamePattern::contains("Blood Plasma")),
    );

    let mut metal_output = RecipeRule::new()
        .accepting(NamePattern::contains("Gold"))
        .accepting(NamePattern::contains("Silver"))
        .accepting(NamePattern::contains("Precious"));
    for input in PRECIOUS_METALS {
        metal_output = metal_output.rejecting(NamePattern::ignore_case(input));
    }
    let smelting = recipe(
        "Smelting",
        "Metal Reclamation",
        named(PRECIOUS_METALS),
        tool("Precious Metal Reclaimer", ToolPolicy::PreferPlayerFallbackBot),
        metal_output,
    );

    let clumps = recipe(
        "Clumps",
        "Kyr'Ozch Bio-Material",
        named(&["Solid Clump of Kyr'Ozch Bio-Material"]),
        tool("Kyr'Ozch Structural Analyzer", ToolPolicy::PreferPlayerFallbackBot),
        RecipeRule::new()
            .accepting(NamePattern::contains("Kyr'Ozch Bio-Material"))
            .rejecting(NamePattern::contains("Solid Clump")),
    );

    let pit_demon = recipe(
        "Pit Demon Heart",
        "Pit Demon Heart",
        named(&["Pit Demon Heart"]),
        ToolRequirement::new(
            NamePattern::contains("Bio-Comminutor"),
            ToolPolicy::PlayerProvided,
        ),
        RecipeRule::new().accepting(NamePattern::contains("Indigo Carmine")),
    );

    let trimmer = recipe(
        "Trimmer",
        "Trimmer",
        named(&["Smelly Liquid"]),
        tool("Trimmer Casing", ToolPolicy::PlayerProvided),
        RecipeRule::new()
            .accepting(NamePattern::contains("Trimmer"))
            .accepting(NamePattern::contains("Improve Actuators"))
            .rejecting(NamePattern::contains("Casing")),
    );

    let mut robot_brain = recipe(
        "Robot Brain",
        "Robot Brain",
        named(&["Robot Junk"]),
        tool("Screwdriver", ToolPolicy::BotOwned),
        named(&["Nano Sensor"]),
    );
    robot_brain.chain = vec![
        ChainStep {
            tool: ToolRequirement::new(
                NamePattern::contains("Bio Analyzing Computer"),
                ToolPolicy::BotOwned,
            ),
            input: named(&["Nano Sensor"]),
            output: RecipeRule::new()
                .accepting(NamePattern::contains("Basic Robot Brain"))
                .rejecting(NamePattern::contains("Personalized")),
            delay_ms: None,
        },
        ChainStep {
            tool: tool("MasterComm - Personalization Device", ToolPolicy::BotOwned),
            input: RecipeRule::new()
                .accepting(NamePattern::contains("Basic Robot Brain"))
                .rejecting(NamePattern::contains("Personalized")),
            output: RecipeRule::new()
                .accepting(NamePattern::contains("Personalized Basic Robot Brain")),
            delay_ms: None,
        },
    ];

    let mut crystal_accepts = RecipeRule::new();
    let mut crystal_output = RecipeRule::new().accepting(NamePattern::contains("Crystal"));
    for prefix in DAMAGED_CRYSTALS {
        crystal_accepts = crystal_accepts.accepting(NamePattern::prefix(prefix));
        crystal_output = crystal_output.rejecting(NamePattern::prefix(prefix));
    }
    let mut crystal = recipe(
        "Nano Crystal Repair",
        "Nano Crystal Repair",
        crystal_accepts,
        tool("Nano Programming Interface", ToolPolicy::PlayerProvided),
        crystal_output,
    );
    crystal.delay_ms = Some(500);

    let stalker = recipe(
        "Stalker Helmet",
        "Stalker Helmet",
        named(&["Stalker Carapace"]),
        tool("MasterComm - Personalization Device", ToolPolicy::PlayerProvided),
        RecipeRule::new().accepting(NamePattern::contains("Stalker Helmet")),
    );

    vec![
        ice,
        pearl,
        plasma,
        smelting,
        clumps,
        pit_demon,
        trimmer,
        robot_brain,
        crystal,
        stalker,
    ]
}

/// Load additional descriptors from a JSON array.
pub fn load_recipes_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<RecipeDescriptor>, CraftError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let recipes: Vec<RecipeDescriptor> =
        serde_json::from_str(&content).map_err(|source| CraftError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    for r in &recipes {
        r.validate()?;
    }
    Ok(recipes)
}

/// Which recipes to build and how to tune them.
#[derive(Debug, Clone, Default)]
pub struct CatalogOptions {
    /// Appended after the built-ins.
    pub extra: Vec<RecipeDescriptor>,
    /// Recipe names to leave out (case-insensitive).
    pub disabled: Vec<String>,
    /// Per-recipe settle delay overrides, by recipe name.
    pub delay_overrides: HashMap<String, Duration>,
}

/// Assemble the routing-ordered recipe list: built-ins then extras, minus
/// disabled ones, with delay overrides applied. Names must be unique.
pub fn build_catalog(options: &CatalogOptions) -> Result<Vec<RecipeDescriptor>, CraftError> {
    let mut out: Vec<RecipeDescriptor> = Vec::new();
    for descriptor in builtin_recipes().into_iter().chain(options.extra.iter().cloned()) {
        descriptor.validate()?;
        if out.iter().any(|d| same_name(&d.name, &descriptor.name)) {
            return Err(CraftError::DuplicateRecipe(descriptor.name));
        }
        out.push(descriptor);
    }

    out.retain(|d| {
        let keep = !options.disabled.iter().any(|n| same_name(n, &d.name));
        if !keep {
            log::info!("recipe {} disabled by configuration", d.name);
        }
        keep
    });

    for (name, delay) in &options.delay_overrides {
        match out.iter_mut().find(|d| same_name(&d.name, name)) {
            Some(d) => d.delay_ms = Some(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)),
            None => log::warn!("delay override for unknown recipe {}", name),
        }
    }
    Ok(out)
}

pub fn build_processors(options: &CatalogOptions) -> Result<Vec<RecipeProcessor>, CraftError> {
    Ok(build_catalog(options)?
        .into_iter()
        .map(RecipeProcessor::new)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crafting::matcher::matches;

    fn find<'a>(all: &'a [RecipeDescriptor], name: &str) -> &'a RecipeDescriptor {
        all.iter().find(|d| d.name == name).expect("recipe present")
    }

    #[test]
    fn builtins_are_valid_and_unique() {
        let all = builtin_recipes();
        assert_eq!(all.len(), 10);
        for d in &all {
            d.validate().expect("valid builtin");
        }
        assert!(build_catalog(&CatalogOptions::default()).is_ok());
    }

    #[test]
    fn plasma_accepts_exact_and_family_names() {
        let all = builtin_recipes();
        let plasma = find(&all, "Plasma");
        assert!(matches("pelted monster parts", &plasma.accepts));
        assert!(matches("Ancient Monster Parts", &plasma.accepts));
        assert!(!matches("Blood Plasma", &plasma.accepts));
    }

    #[test]
    fn trimmer_output_excludes_casing() {
        let all = builtin_recipes();
        let trimmer = find(&all, "Trimmer");
        assert!(matches("Trimmer - Increase Aggressiveness", &trimmer.output));
        assert!(matches("Improve Actuators", &trimmer.output));
        assert!(!matches("Trimmer Casing", &trimmer.output));
    }

    #[test]
    fn smelting_output_is_not_an_input() {
        let all = builtin_recipes();
        let smelting = find(&all, "Smelting");
        assert!(matches("Gold Ingot", &smelting.output));
        assert!(!matches("Golden Ring", &smelting.output));
    }

    #[test]
    fn crystal_repair_matches_by_prefix() {
        let all = builtin_recipes();
        let crystal = find(&all, "Nano Crystal Repair");
        assert!(matches("Badly Corroded Crystal (Nano Crystal)", &crystal.accepts));
        assert!(!matches("Nano Crystal (Reflect)", &crystal.accepts));
        assert!(matches("Nano Crystal (Reflect)", &crystal.output));
        assert_eq!(crystal.tool.policy, ToolPolicy::PlayerProvided);
    }

    #[test]
    fn disabled_and_overrides_apply() {
        let mut delay_overrides = HashMap::new();
        delay_overrides.insert("pearl".to_string(), Duration::from_millis(750));
        let options = CatalogOptions {
            extra: Vec::new(),
            disabled: vec!["ice".to_string()],
            delay_overrides,
        };
        let all = build_catalog(&options).unwrap();
        assert!(all.iter().all(|d| d.name != "ICE"));
        assert_eq!(find(&all, "Pearl").delay_ms, Some(750));
    }

    #[test]
    fn oversized_override_saturates() {
        let mut delay_overrides = HashMap::new();
        delay_overrides.insert("Pearl".to_string(), Duration::MAX);
        let options = CatalogOptions {
            delay_overrides,
            ..CatalogOptions::default()
        };
        let all = build_catalog(&options).unwrap();
        assert_eq!(find(&all, "Pearl").delay_ms, Some(u64::MAX));
    }

    #[test]
    fn duplicate_extra_is_rejected() {
        let mut dup = builtin_recipes().remove(0);
        dup.name = "ice".to_string();
        let options = CatalogOptions {
            extra: vec![dup],
            ..CatalogOptions::default()
        };
        assert!(matches!(
            build_catalog(&options),
            Err(CraftError::DuplicateRecipe(name)) if name == "ice"
        ));
    }
}
