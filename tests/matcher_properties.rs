use craftbot::crafting::{matches, MatchMode, NamePattern, RecipeRule};

const SAMPLES: &[&str] = &[
    "",
    " ",
    "\t\n",
    "Ruby",
    "Pelted Monster Parts",
    "Solid Clump of Kyr'Ozch Bio-Material",
    "Ωmega ✨ Ring",
    "ÅNGSTRÖM",
    "   padded   name   ",
    "a\u{0}b",
];

#[test]
fn substring_accepts_token_in_any_case_and_position() {
    let rule = RecipeRule::new().accepting(NamePattern::contains("monster parts"));
    for name in [
        "Monster Parts",
        "monster parts",
        "MONSTER PARTS",
        "Pelted Monster Parts with Ivory",
        "xxMonster Partsxx",
    ] {
        assert!(matches(name, &rule), "expected {:?} to match", name);
    }
    assert!(!matches("Monster", &rule));
    assert!(!matches("Parts of a Monster", &rule));
}

#[test]
fn whitespace_and_case_variants_match_identically() {
    let base = "Hacker ICE-Breaker Source";
    let variants = [
        "hacker ice-breaker source",
        "  Hacker ICE-Breaker Source  ",
        "HACKER\tICE-BREAKER   SOURCE",
    ];
    for mode in [MatchMode::IgnoreCase, MatchMode::Contains] {
        let rule = RecipeRule::new().accepting_all(&[base], mode);
        assert!(matches(base, &rule));
        for v in variants {
            assert_eq!(
                matches(v, &rule),
                matches(base, &rule),
                "mode {:?} disagreed on {:?}",
                mode,
                v
            );
        }
    }
}

#[test]
fn exact_mode_only_forgives_whitespace() {
    let rule = RecipeRule::new().accepting(NamePattern::exact("Trimmer Casing"));
    assert!(matches(" Trimmer   Casing ", &rule));
    assert!(!matches("trimmer casing", &rule));
}

#[test]
fn matching_is_total_and_deterministic() {
    let rules = [
        RecipeRule::new(),
        RecipeRule::new().accepting(NamePattern::contains("")),
        RecipeRule::new().accepting(NamePattern::contains("Ring")),
        RecipeRule::new()
            .accepting(NamePattern::prefix("Ω"))
            .rejecting(NamePattern::contains("✨")),
        RecipeRule::new().accepting(NamePattern::ignore_case("ångström")),
    ];
    for rule in &rules {
        for name in SAMPLES {
            let first = matches(name, rule);
            let second = matches(name, rule);
            assert_eq!(first, second);
        }
    }
    // Empty rule and empty token never accept
    for name in SAMPLES {
        assert!(!matches(name, &rules[0]));
        assert!(!matches(name, &rules[1]));
    }
    assert!(matches("Ωmega ✨ Ring", &rules[2]));
    assert!(!matches("Ωmega ✨ Ring", &rules[3]));
    assert!(matches("ÅNGSTRÖM", &rules[4]));
}

#[test]
fn reject_wins_over_any_accept() {
    let rule = RecipeRule::new()
        .accepting(NamePattern::contains("Trimmer"))
        .accepting(NamePattern::contains("Casing"))
        .rejecting(NamePattern::contains("Casing"));
    assert!(matches("Trimmer - Improve Actuators", &rule));
    assert!(!matches("Trimmer Casing", &rule));
    assert!(!matches("Casing", &rule));
}
