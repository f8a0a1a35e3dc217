use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use sieve::classifier::{DisabledSource, PacedSource, ProfanityClient, SignalSource};
use sieve::config::Config;
use sieve::fusion::{CheckRequest, FusionMode, Moderator};
use sieve::output::terminal;
use sieve::store::{JsonlStore, ViolationStore};
use sieve::terms::defaults::DEFAULT_DISCOVERY_CANDIDATES;
use sieve::terms::{RestrictedTermSet, TermDiscovery};

/// Sieve: real-time text moderation.
///
/// Matches text against a restricted vocabulary, optionally asks an
/// external profanity classifier, and fuses both signals into a verdict.
#[derive(Parser)]
#[command(name = "sieve", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Unsafe when any signal fires
    Any,
    /// Unsafe only when the risk score reaches 0.4
    Score,
}

impl From<ModeArg> for FusionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Any => FusionMode::AnySignal,
            ModeArg::Score => FusionMode::ScoreThreshold,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check a single text
    Check {
        /// The text to moderate
        text: String,

        /// User identifier recorded with any violation
        #[arg(long)]
        user: Option<String>,

        /// Also ask the external profanity classifier
        #[arg(long)]
        external: bool,

        /// How the unsafe decision is made
        #[arg(long, value_enum, default_value = "any")]
        mode: ModeArg,

        /// Print the outcome as JSON instead of a colored summary
        #[arg(long)]
        json: bool,
    },

    /// Check every line of a file (up to 100 lines)
    Batch {
        /// File with one text per line
        file: PathBuf,

        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        external: bool,

        #[arg(long, value_enum, default_value = "any")]
        mode: ModeArg,
    },

    /// Grow the restricted terms by probing the external classifier
    Discover {
        /// Candidate terms (defaults to a built-in probe list)
        candidates: Vec<String>,

        /// Max classifier requests per second (0 disables pacing)
        #[arg(long, default_value = "2", value_parser = parse_qps)]
        qps: f64,

        /// Write the resulting vocabulary to this file (defaults to SIEVE_TERMS_PATH)
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// List, extend or export the restricted terms
    Terms {
        /// Terms to add before listing (saved to SIEVE_TERMS_PATH when set)
        #[arg(long, num_args = 1..)]
        add: Vec<String>,

        /// Write the vocabulary to this file, one term per line
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Show violation statistics
    Stats,

    /// Show engine status (terms, policy, classifier, store)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sieve=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load();

    match cli.command {
        Commands::Check {
            text,
            user,
            external,
            mode,
            json,
        } => {
            if external {
                config.require_classifier()?;
            }
            let moderator = build_moderator(&config)?;
            let request = CheckRequest {
                text,
                user_id: user,
                use_external: external,
                mode: mode.into(),
                image: None,
            };
            let outcome = moderator.check(&request).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                terminal::display_outcome(&outcome);
            }
        }

        Commands::Batch {
            file,
            user,
            external,
            mode,
        } => {
            if external {
                config.require_classifier()?;
            }
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let texts: Vec<String> = content.lines().map(str::to_string).collect();

            let moderator = build_moderator(&config)?;
            let entries = moderator
                .check_batch(&texts, user.as_deref(), external, mode.into())
                .await?;
            terminal::display_batch(&entries);
        }

        Commands::Discover {
            candidates,
            qps,
            save,
        } => {
            config.require_classifier()?;
            let terms = load_terms(&config);
            let source: Arc<dyn SignalSource> =
                Arc::new(PacedSource::new(build_classifier(&config)?, qps));

            let candidates: Vec<String> = if candidates.is_empty() {
                DEFAULT_DISCOVERY_CANDIDATES
                    .iter()
                    .map(|c| c.to_string())
                    .collect()
            } else {
                candidates
            };

            println!("Probing {} candidate terms...", candidates.len());
            let pb = ProgressBar::new(candidates.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );

            let discovery = TermDiscovery::new(terms.clone(), source);
            let mut probed = 0usize;
            let confirmed = discovery
                .discover_with_progress(&candidates, |term, result| {
                    probed += 1;
                    pb.set_message(term.to_string());
                    if !result.available {
                        pb.println(format!("  {} no answer for {term:?}", "Warning:".yellow()));
                    }
                    pb.inc(1);
                })
                .await;
            pb.finish_and_clear();

            terminal::display_discovery(&confirmed, probed, terms.len());

            let target = save.or_else(|| config.terms_path.clone());
            persist_terms(&terms, target.as_deref())?;
        }

        Commands::Terms { add, export } => {
            let terms = load_terms(&config);
            if !add.is_empty() {
                let added = terms.add(&add);
                info!(added, "Added restricted terms");
                println!("Added {} new term(s)", added);
                if added > 0 {
                    persist_terms(&terms, config.terms_path.as_deref())?;
                }
            }
            terminal::display_terms(&terms.snapshot());

            if let Some(path) = export {
                let written = terms.export(&path)?;
                println!("\nExported {} terms to {}", written, path.display());
            }
        }

        Commands::Stats => {
            let store = build_store(&config)?;
            let stats = store.statistics().await?;
            terminal::display_stats(&stats);
        }

        Commands::Status => {
            let terms = RestrictedTermSet::new();
            let source = terms.load(config.terms_path.as_deref());
            let store = build_store(&config)?;

            println!("\n{}", "=== Sieve Status ===".bold());
            println!("  Restricted terms: {} (from {})", terms.len(), source);
            terminal::display_policy(&config.policy);
            if config.has_classifier() {
                println!(
                    "  Classifier: {} (timeout {}s)",
                    config.classifier_url,
                    config.classifier_timeout.as_secs()
                );
            } else {
                println!(
                    "  Classifier: {}",
                    "not configured (set SIEVE_CLASSIFIER_API_KEY)".dimmed()
                );
            }
            match store.total_count().await {
                Ok(total) => println!("  Violations: {} in {}", total, store.location()),
                Err(e) => println!(
                    "  Violations: {} {}",
                    "unreadable:".yellow(),
                    format!("{e:#}")
                ),
            }
        }
    }

    Ok(())
}

/// Clap parser for `--qps`: a finite, non-negative rate.
fn parse_qps(raw: &str) -> std::result::Result<f64, String> {
    let qps: f64 = raw.parse().map_err(|_| format!("`{raw}` is not a number"))?;
    if !qps.is_finite() || qps < 0.0 {
        return Err(format!("rate must be a finite number >= 0, got {raw}"));
    }
    Ok(qps)
}

/// Write the vocabulary back to the term file so later runs load it.
fn persist_terms(terms: &RestrictedTermSet, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let written = terms.export(path)?;
            println!("Saved {} terms to {}", written, path.display());
        }
        None => {
            warn!("SIEVE_TERMS_PATH not set; term changes are not persisted");
            println!(
                "  {} set SIEVE_TERMS_PATH (or pass a path) to keep these terms",
                "Note:".yellow()
            );
        }
    }
    Ok(())
}

fn load_terms(config: &Config) -> Arc<RestrictedTermSet> {
    let terms = RestrictedTermSet::new();
    terms.load(config.terms_path.as_deref());
    Arc::new(terms)
}

/// The profanity client when an API key is configured, otherwise a source
/// that always reports no external signal.
fn build_classifier(config: &Config) -> Result<Arc<dyn SignalSource>> {
    if !config.has_classifier() {
        return Ok(Arc::new(DisabledSource));
    }
    let client = ProfanityClient::new(
        &config.classifier_url,
        &config.classifier_api_key,
        config.classifier_timeout,
    )?;
    Ok(Arc::new(client))
}

/// SQLite when SIEVE_VIOLATION_DB is set (and the feature is compiled in),
/// otherwise the JSON-lines log.
fn build_store(config: &Config) -> Result<Arc<dyn ViolationStore>> {
    #[cfg(feature = "sqlite")]
    {
        if let Some(db_path) = &config.violation_db {
            return Ok(Arc::new(sieve::store::SqliteStore::open(db_path)?));
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        if config.violation_db.is_some() {
            tracing::warn!("SIEVE_VIOLATION_DB set but sqlite support not compiled in; using JSON log");
        }
    }

    Ok(Arc::new(JsonlStore::new(&config.violation_log)))
}

fn build_moderator(config: &Config) -> Result<Moderator> {
    let terms = load_terms(config);
    let classifier = build_classifier(config)?;
    let store = build_store(config)?;
    Ok(Moderator::new(terms, classifier, store).with_policy(config.policy.clone()))
}
