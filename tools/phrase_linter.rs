/// Phrase Linter: checks every stored line and tag set in a phrase database.
///
/// Usage: phrase_linter <database> [--config <file.ron>]

use phrase_engine::core::config::EngineConfig;
use phrase_engine::core::template::Template;
use phrase_engine::schema::category::{CategoryTag, CategoryTags};
use phrase_engine::storage::phrase_store::{PhraseStore, SqlitePhraseStore};
use rustc_hash::FxHashSet;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: phrase_linter <database> [--config <file.ron>]");
        process::exit(0);
    }

    let database = &args[1];
    let mut config_path = None;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            i += 1;
            config_path = Some(args[i].clone());
        }
        i += 1;
    }

    if !Path::new(database).is_file() {
        eprintln!("ERROR: Database '{}' does not exist", database);
        process::exit(1);
    }

    let config = match config_path {
        Some(ref path) => match EngineConfig::load_from_ron(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: Failed to load config: {}", e);
                process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let store = SqlitePhraseStore::new(database);
    let (errors, warnings) = match lint_phrases(&store, &config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    println!("\n=== Phrase Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if !errors.is_empty() {
        process::exit(1);
    }
}

/// Row-by-row so one bad row does not hide the rest.
fn lint_phrases(
    store: &SqlitePhraseStore,
    config: &EngineConfig,
) -> Result<(Vec<String>, Vec<String>), Box<dyn std::error::Error>> {
    let source = &config.source;
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let known: FxHashSet<CategoryTag> = config
        .categories
        .values()
        .flat_map(|tags| tags.iter())
        .collect();
    let mut used: Vec<CategoryTags> = Vec::new();

    let ids = store.get_ids(&source.table, None)?;
    println!("Checking {} lines in '{}'", ids.len(), source.table);

    for id in ids {
        let line = store
            .get_field(id, &source.line_column, &source.table)?
            .unwrap_or_default();
        if line.trim().is_empty() {
            warnings.push(format!("[{}] line is empty", id));
        }
        if let Err(e) = Template::parse(&line, &config.delimiters) {
            errors.push(format!("[{}] {} in {:?}", id, e, line));
        }

        let raw_tags = store
            .get_field(id, &source.tag_column, &source.table)?
            .unwrap_or_default();
        match CategoryTags::decode(&raw_tags) {
            Ok(tags) => {
                if !tags.iter().any(|tag| known.contains(&tag)) {
                    warnings.push(format!(
                        "[{}] tags '{}' are not used by any category",
                        id,
                        tags.encode()
                    ));
                }
                used.push(tags);
            }
            Err(e) => errors.push(format!("[{}] bad tags '{}': {}", id, raw_tags, e)),
        }
    }

    let mut names: Vec<&String> = config.categories.keys().collect();
    names.sort();
    for name in names {
        let tags = &config.categories[name];
        if !used.iter().any(|line_tags| line_tags.intersects(tags)) {
            warnings.push(format!("category '{}' has no lines", name));
        }
    }

    Ok((errors, warnings))
}
