// Colored terminal output for verdicts, statistics and term lists.
//
// main.rs delegates all display to these functions.

use std::collections::BTreeSet;

use colored::{ColoredString, Colorize};

use crate::config::EnginePolicy;
use crate::fusion::{BatchEntry, Category, CheckOutcome, Decision};
use crate::store::{StoreStatus, ViolationStats};

/// Display one check outcome.
pub fn display_outcome(outcome: &CheckOutcome) {
    let verdict = &outcome.verdict;

    println!();
    println!(
        "  {}  {}  risk {:.2}  ({})",
        colorize_decision(outcome.decision),
        colorize_category(verdict.category),
        verdict.risk_score,
        outcome.action.to_string().bold(),
    );
    println!("  {}", verdict.text_preview.dimmed());

    if verdict.truncated {
        println!("  {}", "(text truncated before analysis)".dimmed());
    }

    println!(
        "  Lexical: {} match(es), severity {:.2}, confidence {}",
        verdict.lexical.matched_terms.len(),
        verdict.lexical.severity,
        verdict.lexical.confidence,
    );

    let external = if !verdict.external.available {
        "unavailable".dimmed()
    } else if verdict.external.has_signal {
        "profanity".red()
    } else {
        "clean".green()
    };
    println!("  External: {external}");

    for reason in &outcome.reasons {
        println!("  {} {}", "-".red(), reason);
    }

    if outcome.block_content {
        println!("  {}", outcome.message.red().bold());
    } else {
        println!("  {}", outcome.message);
    }
}

/// Display batch results, one line per entry.
pub fn display_batch(entries: &[BatchEntry]) {
    println!(
        "\n{}",
        format!("=== Batch ({} texts) ===", entries.len()).bold()
    );
    for entry in entries {
        match (&entry.outcome, &entry.error) {
            (Some(outcome), _) => println!(
                "  {:>3}. {:<8} {:<14} {:>5.2}  {}",
                entry.index,
                colorize_decision(outcome.decision),
                colorize_category(outcome.verdict.category),
                outcome.verdict.risk_score,
                entry.text_preview.dimmed(),
            ),
            (None, Some(error)) => println!(
                "  {:>3}. {}  {}",
                entry.index,
                "error".yellow(),
                error
            ),
            (None, None) => {}
        }
    }

    let blocked = entries
        .iter()
        .filter(|e| {
            e.outcome
                .as_ref()
                .is_some_and(|o| o.decision == Decision::Unsafe)
        })
        .count();
    println!("\n  {} of {} flagged", blocked, entries.len());
}

/// Display violation statistics.
pub fn display_stats(stats: &ViolationStats) {
    println!("\n{}", "=== Violation Statistics ===".bold());
    println!("  Store: {}", stats.location);

    if stats.status == StoreStatus::NoViolationsYet {
        println!("  No violations recorded yet.");
        return;
    }

    println!("  Total violations: {}", stats.total_violations);
    println!("  Last 24 hours:    {}", stats.recent_violations);
    println!("  Text signal:      {}", stats.text_violations);
    println!("  Image signal:     {}", stats.image_violations);
    for (category, count) in &stats.by_category {
        println!("    {:<14} {:>6}", colorize_category(*category), count);
    }
}

/// Display the restricted vocabulary.
pub fn display_terms(terms: &BTreeSet<String>) {
    println!(
        "\n{}",
        format!("=== Restricted Terms ({}) ===", terms.len()).bold()
    );
    let list: Vec<&str> = terms.iter().map(String::as_str).collect();
    for chunk in list.chunks(8) {
        println!("  {}", chunk.join(", "));
    }
}

/// Display the result of a discovery run.
pub fn display_discovery(confirmed: &BTreeSet<String>, probed: usize, total_terms: usize) {
    println!("\n{}", "=== Term Discovery ===".bold());
    println!("  Candidates probed: {probed}");
    if confirmed.is_empty() {
        println!("  Classifier confirmed no new terms.");
    } else {
        let list: Vec<&str> = confirmed.iter().map(String::as_str).collect();
        println!("  Confirmed ({}): {}", confirmed.len(), list.join(", ").red());
    }
    println!("  Restricted terms now: {total_terms}");
}

/// Display the current policy.
pub fn display_policy(policy: &EnginePolicy) {
    println!(
        "  Policy: text_threshold={:.2} auto_block={} log_violations={}",
        policy.text_threshold, policy.auto_block, policy.log_violations
    );
}

fn colorize_decision(decision: Decision) -> ColoredString {
    match decision {
        Decision::Safe => "SAFE".green().bold(),
        Decision::Unsafe => "UNSAFE".red().bold(),
    }
}

fn colorize_category(category: Category) -> ColoredString {
    let label = category.as_str();
    match category {
        Category::HateSpeech => label.red().bold(),
        Category::Violence => label.bright_red(),
        Category::Inappropriate => label.yellow(),
        Category::Spam => label.cyan(),
        Category::Safe => label.green(),
    }
}
