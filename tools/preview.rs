/// Preview: resolve one category against a phrase database and print it.
///
/// Usage: preview <database> <category> [--config <file.ron>] [--seed <n>]
///                [--user <name>] [--channel <name>] [--server <name>]
///
/// `category` is a configured name such as greeting, member-left, mention,
/// went-online or shutdown.

use phrase_engine::{Category, PhraseEngine, RenderContext};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let database = &args[1];
    let category = Category::from_name(&args[2]);
    let mut config_path = None;
    let mut seed: Option<u64> = None;
    let mut context = RenderContext::new().with_bot("bot", "Bot");

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                match parse_seed(&args[i]) {
                    Ok(n) => seed = Some(n),
                    Err(e) => {
                        eprintln!("{}", e);
                        print_usage();
                        process::exit(1);
                    }
                }
            }
            "--user" if i + 1 < args.len() => {
                i += 1;
                let name = &args[i];
                context = context.with_user(name, name, &format!("@{}", name));
            }
            "--channel" if i + 1 < args.len() => {
                i += 1;
                context = context.with_channel(&args[i]);
            }
            "--server" if i + 1 < args.len() => {
                i += 1;
                context = context.with_server(&args[i]);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let mut builder = PhraseEngine::builder().database(database);
    if let Some(ref path) = config_path {
        builder = builder.config_file(path);
    }
    let engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    let result = match seed {
        Some(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            engine.resolve_with_rng(&category, Some(&context), None, &mut rng)
        }
        None => engine.resolve(&category, Some(&context), None),
    };

    match result {
        Ok(text) if text.is_empty() => println!("(nothing to say for '{}')", category),
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Usage: preview <database> <category> [--config <file.ron>] [--seed <n>]");
    println!("               [--user <name>] [--channel <name>] [--server <name>]");
}

fn parse_seed(raw: &str) -> Result<u64, String> {
    raw.parse()
        .map_err(|_| format!("Invalid seed '{}': expected a non-negative integer", raw))
}
