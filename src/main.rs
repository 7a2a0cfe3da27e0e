//! Offline tooling for data fabric subscription configurations.
//!
//! ```text
//! data-fabric check fabric.toml
//! data-fabric resolve fabric.toml /employers/ABC/employees --query "since=2024-01-01"
//! ```

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use data_fabric::config::{load_config, ConfigError, FabricConfig};
use data_fabric::observability::logging::init_logging;
use data_fabric::subscriptions::{
    FnProvider, Provider, ProviderCatalog, QueryParameters, SubscriptionMatcher,
    SubscriptionTree,
};

#[derive(Parser)]
#[command(name = "data-fabric")]
#[command(about = "Validate and exercise data fabric subscription configurations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration and build its subscription tree
    Check {
        config: PathBuf,
    },
    /// Match a concrete path and print the provider and parameters it binds
    Resolve {
        config: PathBuf,
        path: String,
        /// Extra query parameters, e.g. "since=2024-01-01&limit=10"
        #[arg(short, long, default_value = "")]
        query: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Check { config } => {
            let loaded = load_config(&config);
            if let Ok(config) = &loaded {
                init(config);
            }

            let report = check_report(loaded)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report["status"] != "ok" {
                let problems = report["conflicts"].as_array().map_or(0, Vec::len);
                return Err(format!("{} problem(s) found", problems).into());
            }
        }
        Commands::Resolve {
            config,
            path,
            query,
        } => {
            let config = load_config(&config)?;
            init(&config);

            let catalog: ProviderCatalog = config
                .subscriptions
                .iter()
                .map(|s| stub_provider(&s.provider))
                .collect();
            let tree = SubscriptionTree::from_config(&config.subscriptions, &catalog)?;
            let matcher = SubscriptionMatcher::new(tree);
            let descriptor = matcher.match_path(&path)?;
            let query = QueryParameters::parse(&query);

            let parameters: serde_json::Map<String, Value> = descriptor
                .parameters()
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            let query: serde_json::Map<String, Value> = query
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect();

            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "provider": descriptor.provider().name(),
                    "parameters": parameters,
                    "query": query,
                }))?
            );
        }
    }
    Ok(())
}

fn init(config: &FabricConfig) {
    if let Err(e) = init_logging(&config.observability) {
        eprintln!("Warning: logging not initialized: {}", e);
    }
    tracing::debug!(subscriptions = config.subscriptions.len(), "Configuration loaded");
}

/// Summarize validation problems and registration conflicts as JSON.
///
/// I/O and parse failures are returned as errors; everything else is reported.
fn check_report(loaded: Result<FabricConfig, ConfigError>) -> Result<Value, ConfigError> {
    let config = match loaded {
        Ok(config) => config,
        Err(ConfigError::Validation(errors)) => {
            let conflicts: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Ok(json!({
                "status": "invalid",
                "registered": 0,
                "conflicts": conflicts,
            }));
        }
        Err(e) => return Err(e),
    };

    let mut tree = SubscriptionTree::new();
    let mut conflicts = Vec::new();
    for entry in &config.subscriptions {
        if let Err(e) = tree.register_path(&entry.path, stub_provider(&entry.provider)) {
            conflicts.push(e.to_string());
        }
    }

    let status = if conflicts.is_empty() { "ok" } else { "conflicts" };
    Ok(json!({
        "status": status,
        "registered": tree.len(),
        "conflicts": conflicts,
    }))
}

/// Inert stand-in for a configured provider.
fn stub_provider(name: &str) -> Arc<dyn Provider> {
    FnProvider::new(name, vec![], |_| async { Ok(Value::Null) }).shared()
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_fabric::config::loader::parse_config;

    #[test]
    fn test_check_reports_registration_conflicts() {
        let report = check_report(parse_config(
            r#"
[[subscriptions]]
path = "/employers/{employerId}"
provider = "GetEmployer"

[[subscriptions]]
path = "/employers/{id}/employees"
provider = "GetEmployees"

[[subscriptions]]
path = "/employers"
provider = "GetEmployers"
"#,
        ))
        .unwrap();

        assert_eq!(report["status"], "conflicts");
        assert_eq!(report["registered"], 2);
        assert_eq!(report["conflicts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_check_reports_validation_problems() {
        let report = check_report(parse_config(
            r#"
[[subscriptions]]
path = "/employers"
provider = "GetEmployers"

[[subscriptions]]
path = "/Employers/"
provider = "GetEmployers"

[[subscriptions]]
path = "/{tenant}/employees"
provider = "GetEmployees"
"#,
        ))
        .unwrap();

        assert_eq!(report["status"], "invalid");
        assert_eq!(report["conflicts"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_check_ignores_metrics_settings() {
        let config = r#"
[observability]
metrics_enabled = true
metrics_address = "127.0.0.1:1"

[[subscriptions]]
path = "/employers"
provider = "GetEmployers"
"#;
        for _ in 0..2 {
            let report = check_report(parse_config(config)).unwrap();
            assert_eq!(report["status"], "ok");
            assert_eq!(report["registered"], 1);
        }
    }

    #[test]
    fn test_check_propagates_parse_errors() {
        let err = check_report(parse_config("[[subscriptions]\npath = 1")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
