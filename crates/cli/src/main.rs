// prefsync CLI - headless preference inspection and mutation
//
// Operates on the same persisted store as an embedding host: reads seed the
// registry exactly like an in-process engine, writes run the full
// user-setter contract (reflection into an in-memory mirror, notification,
// persistence).

use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use prefsync_engine::{
    DiskStore, EngineOptions, Preference, PreferenceEngine, StorageBackend, SYSTEM,
};

const EXIT_SUCCESS: u8 = 0;
const EXIT_UNKNOWN_KEY: u8 = 2;

#[derive(Parser)]
#[command(name = "prefsync")]
#[command(about = "Inspect and mutate persisted preferences (headless)")]
#[command(version)]
struct Cli {
    /// Read and write this preferences file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Register an additional preference as key=value (the value seeds the
    /// system slot); may be repeated
    #[arg(long = "declare", global = true, value_name = "KEY=VALUE", value_parser = parse_declared)]
    declared: Vec<(String, String)>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered preference with user, system, and resolved values
    List {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print one preference
    Get {
        key: String,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Set a user override (persisted to the store)
    Set { key: String, value: String },
    /// Clear a user override back to the system value
    Reset { key: String },
}

fn parse_declared(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

/// Build an engine over the requested store. The bool reports whether a
/// persistent store is actually attached (platforms without a config
/// directory degrade to in-memory state).
fn open_engine(cli: &Cli) -> (PreferenceEngine, bool) {
    let storage: Option<Rc<dyn StorageBackend>> = match &cli.store {
        Some(path) => Some(Rc::new(DiskStore::at(path.clone()))),
        None => DiskStore::open().map(|store| Rc::new(store) as Rc<dyn StorageBackend>),
    };
    let persistent = storage.is_some();
    let engine = PreferenceEngine::new(EngineOptions {
        storage,
        declared: cli.declared.clone(),
        ..EngineOptions::default()
    });
    (engine, persistent)
}

fn snapshot_value(preference: &Preference) -> serde_json::Value {
    serde_json::to_value(preference.snapshot()).unwrap_or(serde_json::Value::Null)
}

fn print_preference(preference: &Preference) {
    let snapshot = preference.snapshot();
    println!("user:     {}", snapshot.user);
    println!("system:   {}", snapshot.system);
    println!("resolved: {}", snapshot.resolved);
}

fn run(cli: Cli) -> u8 {
    let (engine, persistent) = open_engine(&cli);

    match cli.command {
        Commands::List { json } => {
            if json {
                let mut map = serde_json::Map::new();
                for (key, preference) in engine.registry().snapshot() {
                    map.insert(key, snapshot_value(&preference));
                }
                println!("{}", serde_json::Value::Object(map));
            } else {
                for (key, preference) in engine.registry().snapshot() {
                    let snapshot = preference.snapshot();
                    println!(
                        "{key:<12} resolved={:<12} user={:<12} system={}",
                        snapshot.resolved, snapshot.user, snapshot.system
                    );
                }
            }
            EXIT_SUCCESS
        }
        Commands::Get { key, json } => match engine.get(&key) {
            Some(preference) => {
                if json {
                    println!("{}", snapshot_value(&preference));
                } else {
                    print_preference(&preference);
                }
                EXIT_SUCCESS
            }
            None => {
                eprintln!("unknown preference: {key}");
                EXIT_UNKNOWN_KEY
            }
        },
        Commands::Set { key, value } => match engine.get(&key) {
            Some(preference) => {
                preference.set_user(value);
                if !persistent {
                    eprintln!("warning: no writable store; change not persisted");
                }
                print_preference(&preference);
                EXIT_SUCCESS
            }
            None => {
                eprintln!("unknown preference: {key}");
                EXIT_UNKNOWN_KEY
            }
        },
        Commands::Reset { key } => match engine.get(&key) {
            Some(preference) => {
                preference.set_user(SYSTEM);
                if !persistent {
                    eprintln!("warning: no writable store; change not persisted");
                }
                print_preference(&preference);
                EXIT_SUCCESS
            }
            None => {
                eprintln!("unknown preference: {key}");
                EXIT_UNKNOWN_KEY
            }
        },
    }
}

fn main() -> ExitCode {
    ExitCode::from(run(Cli::parse()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_declared() {
        assert_eq!(
            parse_declared("density=compact"),
            Ok(("density".to_string(), "compact".to_string()))
        );
        // Values may contain the separator.
        assert_eq!(
            parse_declared("motto=a=b"),
            Ok(("motto".to_string(), "a=b".to_string()))
        );
        assert!(parse_declared("no-separator").is_err());
        assert!(parse_declared("=value").is_err());
    }

    #[test]
    fn test_set_roundtrip_through_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");

        let cli = Cli::parse_from(["prefsync", "--store", path.to_str().unwrap(), "set", "theme", "dark"]);
        assert_eq!(run(cli), EXIT_SUCCESS);

        let (engine, persistent) = open_engine(&Cli::parse_from([
            "prefsync",
            "--store",
            path.to_str().unwrap(),
            "list",
        ]));
        assert!(persistent);
        assert_eq!(engine.theme().user(), "dark");
    }

    #[test]
    fn test_unknown_key_exit_code() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        let cli = Cli::parse_from(["prefsync", "--store", path.to_str().unwrap(), "get", "nope"]);
        assert_eq!(run(cli), EXIT_UNKNOWN_KEY);
    }
}
