use std::path::Path;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use stackfit::confidence::ConfidenceBreakdown;
use stackfit::{Category, MatchResult, TechProfile};

fn header(path: &Path) {
    println!("\n {} v{}", "stackfit".bold(), env!("CARGO_PKG_VERSION"));
    println!(" Scanning: {}\n", path.display());
}

/// Render a detected profile.
pub fn render_profile(
    profile: &TechProfile,
    breakdown: &ConfidenceBreakdown,
    path: &Path,
    verbose: bool,
    quiet: bool,
) {
    if quiet {
        println!(
            "Languages: {}  Frameworks: {}  Libraries: {}  Tools: {}  Confidence: {}",
            profile.languages.len(),
            profile.frameworks.len(),
            profile.libraries.len(),
            profile.tools.len(),
            confidence_str(profile.confidence),
        );
        return;
    }

    header(path);

    if profile.is_empty() {
        println!(" {} No technologies detected.\n", "[INFO]".cyan().bold());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Category").add_attribute(Attribute::Bold),
            Cell::new("Detected").add_attribute(Attribute::Bold),
        ]);

    for category in Category::ALL {
        let labels = profile.get(category);
        if labels.is_empty() {
            continue;
        }
        let joined = labels.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
        table.add_row(vec![Cell::new(category.to_string()), Cell::new(joined)]);
    }
    println!("{}", table);

    println!("\n Confidence: {}", confidence_str(profile.confidence));
    if verbose {
        println!(
            "   languages {:.2}  frameworks {:.2}  libraries {:.2}  tools {:.2}  weighted {:.2}  bonus {:.2}",
            breakdown.languages,
            breakdown.frameworks,
            breakdown.libraries,
            breakdown.tools,
            breakdown.weighted,
            breakdown.bonus,
        );
    }
    println!();
}

/// Render ranked rules. `fallback` names the rule used when the list is
/// empty.
pub fn render_matches(
    matches: &[MatchResult],
    profile: &TechProfile,
    lang: &str,
    fallback: Option<&str>,
    path: &Path,
    quiet: bool,
) {
    if quiet {
        match matches.first() {
            Some(best) => println!(
                "Best: {} ({:.2})  Matches: {}",
                best.rule.id,
                best.score,
                matches.len()
            ),
            None => println!("No matching rule"),
        }
        return;
    }

    header(path);
    println!(
        " Profile: {}  (confidence {})\n",
        profile
            .iter()
            .map(|(_, label)| label)
            .collect::<Vec<_>>()
            .join(", "),
        confidence_str(profile.confidence)
    );

    if matches.is_empty() {
        println!(" {} No rule matched this project.", "[WARN]".yellow().bold());
        if let Some(id) = fallback {
            println!("        Falling back to '{}'.", id);
        }
        println!();
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Rule").add_attribute(Attribute::Bold),
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Source").add_attribute(Attribute::Bold),
            Cell::new("Score").add_attribute(Attribute::Bold),
        ]);

    for (rank, result) in matches.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&result.rule.id),
            Cell::new(result.rule.name.resolve(lang)),
            Cell::new(result.source.to_string()),
            Cell::new(format!("{:.2}", result.score))
                .fg(score_color(result.score))
                .set_alignment(CellAlignment::Right),
        ]);
    }

    println!("{}", table);
    println!();
}

fn score_color(score: f64) -> Color {
    if score >= 0.8 {
        Color::Green
    } else if score >= 0.5 {
        Color::Yellow
    } else {
        Color::DarkGrey
    }
}

fn confidence_str(confidence: f64) -> ColoredString {
    let s = format!("{:.2}", confidence);
    if confidence >= 0.7 {
        s.green()
    } else if confidence >= 0.4 {
        s.yellow()
    } else {
        s.red()
    }
}
