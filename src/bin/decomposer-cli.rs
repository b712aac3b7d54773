//! Decomposer CLI - Standalone command-line interface for the decomposition engine
//!
//! This binary runs the engine without MCP. It has feature parity with the
//! MCP tools: every action goes through the same dispatcher.

use clap::{Parser, Subcommand, ValueEnum};
use decomposer::core::{DecompositionEngine, EngineError};
use decomposer::mcp::health::{validate_config, EntityCounts, HealthChecker};
use decomposer::mcp::server::ServerConfig;
use decomposer::mcp::tools::configure::{apply_config_updates, ConfigRequest, ConfigResponse};
use decomposer::mcp::tools::decompose::{dispatch_value_with_config, ToolEnvelope};
use decomposer::mcp::tools::health::{execute_health, HealthRequest};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Read};
use std::process::ExitCode;
use tracing::debug;

/// Decomposer CLI - Break problems into components and measure the structure
#[derive(Parser)]
#[command(name = "decomposer-cli")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Validate configuration and exit
    #[arg(long)]
    validate_config: bool,

    /// Override the maximum identifier length
    #[arg(long, global = true)]
    max_identifier_length: Option<usize>,

    /// Override the complexity used when a request omits it (1-10)
    #[arg(long, global = true)]
    default_complexity: Option<u8>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for CLI responses
#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for programmatic use
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a script of requests against one engine
    ///
    /// The script is a JSON array of request objects or one request object
    /// per line. Each request carries `action` plus the action's fields,
    /// e.g. {"action": "createProblem", "problemId": "p1", "problemStatement": "..."}.
    Run {
        /// Script file (or - for stdin)
        #[arg(short = 'i', long)]
        file: Option<String>,

        /// Exit with failure if any request failed
        #[arg(long)]
        strict: bool,
    },

    /// Run a single action on a fresh engine
    Action {
        /// Action name (createProblem, calculateMetrics, ...)
        #[arg(short, long)]
        name: String,

        /// Action arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Show or adjust configuration
    Config {
        /// Show current configuration without applying updates
        #[arg(long)]
        show: bool,

        /// Set maximum statement/name/description length
        #[arg(long)]
        max_text_length: Option<usize>,

        /// Set maximum number of constraints or dependencies
        #[arg(long)]
        max_list_length: Option<usize>,

        /// Enable/disable the per-action summary log line
        #[arg(long)]
        log_summaries: Option<bool>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Check health status
    Health {
        /// Check specific component (engine, config)
        #[arg(short, long)]
        component: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
#[allow(clippy::enum_variant_names)]
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

// ============================================================================
// Response Types
// ============================================================================

/// Summary printed after a script run in text mode.
#[derive(Serialize)]
struct RunSummary {
    /// Number of requests executed
    requests: usize,
    /// Number of requests that returned a success envelope
    succeeded: usize,
    /// Number of requests that returned a failed envelope
    failed: usize,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(io::stderr)
        .init();

    let config = effective_config(&cli);

    // Handle --validate-config flag
    if cli.validate_config {
        return execute_validate_config(&config);
    }

    // Require a subcommand if not validating config
    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            eprintln!("Error: A subcommand is required. Use --help for usage.");
            return ExitCode::from(2);
        }
    };

    let result = match command {
        Commands::Run { file, strict } => execute_run(cli.format, &config, file, strict),

        Commands::Action { name, args } => execute_action(cli.format, &config, &name, &args),

        Commands::Config {
            show,
            max_text_length,
            max_list_length,
            log_summaries,
        } => {
            let request = ConfigRequest {
                max_text_length,
                max_list_length,
                log_summaries,
                ..Default::default()
            };
            execute_config(cli.format, config, show, &request)
        }

        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }

        Commands::Health { component } => execute_health_check(cli.format, &config, component),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Default configuration with the global overrides applied
fn effective_config(cli: &Cli) -> ServerConfig {
    let mut config = ServerConfig::default();
    if let Some(len) = cli.max_identifier_length {
        config.max_identifier_length = len;
    }
    if let Some(complexity) = cli.default_complexity {
        config.default_complexity = complexity;
    }
    config
}

// ============================================================================
// Command Implementations
// ============================================================================

fn execute_run(
    format: OutputFormat,
    config: &ServerConfig,
    file: Option<String>,
    strict: bool,
) -> Result<(), String> {
    check_config(config)?;

    let script = read_script(file)?;
    let requests = parse_script(&script)?;
    debug!(requests = requests.len(), "Running script");

    let mut engine = DecompositionEngine::new();
    let mut summary = RunSummary {
        requests: requests.len(),
        succeeded: 0,
        failed: 0,
    };

    for (index, request) in requests.into_iter().enumerate() {
        let (action, envelope) = run_request(&mut engine, config, request)?;
        if envelope.is_success() {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }
        output_envelope(format, index, &action, &envelope)?;
    }

    if let OutputFormat::Text = format {
        println!();
        output_response(format, &summary)?;
    }

    if strict && summary.failed > 0 {
        return Err(format!(
            "{} of {} requests failed",
            summary.failed, summary.requests
        ));
    }
    Ok(())
}

fn execute_action(
    format: OutputFormat,
    config: &ServerConfig,
    name: &str,
    args: &str,
) -> Result<(), String> {
    check_config(config)?;

    let mut engine = DecompositionEngine::new();
    let envelope = match serde_json::from_str::<Value>(args) {
        Ok(args) => dispatch_value_with_config(&mut engine, name, args, config)
            .map_err(|e| e.to_string())?,
        Err(e) => ToolEnvelope::failed(&EngineError::validation("args", e.to_string())),
    };

    output_response(format, &envelope)?;

    match envelope.error() {
        Some(error) => Err(error.to_string()),
        None => Ok(()),
    }
}

fn execute_config(
    format: OutputFormat,
    mut config: ServerConfig,
    show: bool,
    request: &ConfigRequest,
) -> Result<(), String> {
    let applied = if show {
        false
    } else {
        apply_config_updates(&mut config, request)
    };

    if !show && request.has_updates() && !applied {
        return Err("No valid configuration values given".to_string());
    }

    output_response(
        format,
        &ConfigResponse {
            applied,
            current_config: config,
        },
    )
}

fn generate_completions(shell: Shell) {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as ClapShell};

    let mut cmd = Cli::command();
    let shell = match shell {
        Shell::Bash => ClapShell::Bash,
        Shell::Zsh => ClapShell::Zsh,
        Shell::Fish => ClapShell::Fish,
        Shell::PowerShell => ClapShell::PowerShell,
    };
    generate(shell, &mut cmd, "decomposer-cli", &mut io::stdout());
}

fn execute_validate_config(config: &ServerConfig) -> ExitCode {
    match validate_config(config) {
        Ok(()) => {
            println!("Configuration is valid.");
            ExitCode::SUCCESS
        }
        Err(errors) => {
            eprintln!("Configuration errors:");
            for error in errors {
                eprintln!("  - {}", error);
            }
            ExitCode::FAILURE
        }
    }
}

fn execute_health_check(
    format: OutputFormat,
    config: &ServerConfig,
    component: Option<String>,
) -> Result<(), String> {
    let checker = HealthChecker::new();
    let response = execute_health(
        &HealthRequest::default(),
        &checker,
        config,
        EntityCounts::default(),
    );

    // If specific component requested, filter the response
    if let Some(comp) = component {
        let components = &response.status.components;
        let status = match comp.to_lowercase().as_str() {
            "engine" => &components.engine,
            "config" => &components.config,
            _ => return Err(format!("Unknown component: {}. Use: engine, config", comp)),
        };
        return output_response(format, status);
    }

    output_response(format, &response)
}

// ============================================================================
// Helper Functions
// ============================================================================

fn check_config(config: &ServerConfig) -> Result<(), String> {
    validate_config(config).map_err(|errors| format!("Invalid configuration: {}", errors.join("; ")))
}

/// Read the script from a file, or from stdin when `file` is `None` or "-".
fn read_script(file: Option<String>) -> Result<String, String> {
    match file {
        Some(path) if path != "-" => std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read script '{}': {}", path, e)),
        _ => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .map_err(|e| format!("Failed to read script from stdin: {}", e))?;
            Ok(input)
        }
    }
}

/// Split a script into request values.
///
/// A script starting with `[` is one JSON array; anything else is one JSON
/// value per non-blank line. A line that does not parse is kept as a string
/// so it is reported as a failed request rather than aborting the run.
fn parse_script(script: &str) -> Result<Vec<Value>, String> {
    let trimmed = script.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<Value>>(trimmed)
            .map_err(|e| format!("Invalid request array: {}", e));
    }

    Ok(script
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).unwrap_or_else(|_| Value::String(line.to_string())))
        .collect())
}

/// Execute one scripted request and return its action name and envelope
fn run_request(
    engine: &mut DecompositionEngine,
    config: &ServerConfig,
    request: Value,
) -> Result<(String, ToolEnvelope), String> {
    let mut object = match request {
        Value::Object(object) => object,
        other => {
            let err = EngineError::validation(
                "request",
                format!("expected a JSON object, got {}", other),
            );
            return Ok((String::new(), ToolEnvelope::failed(&err)));
        }
    };

    let action = match object.remove("action") {
        Some(Value::String(action)) => action,
        _ => {
            let err = EngineError::validation("action", "is required");
            return Ok((String::new(), ToolEnvelope::failed(&err)));
        }
    };

    let envelope = dispatch_value_with_config(engine, &action, Value::Object(object), config)
        .map_err(|e| e.to_string())?;
    Ok((action, envelope))
}

/// Print one envelope of a script run.
///
/// JSON output is one compact envelope per line; text output prefixes each
/// envelope with its position and action.
fn output_envelope(
    format: OutputFormat,
    index: usize,
    action: &str,
    envelope: &ToolEnvelope,
) -> Result<(), String> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string(envelope)
                .map_err(|e| format!("Failed to serialize response: {}", e))?;
            println!("{}", json);
            Ok(())
        }
        OutputFormat::Text => {
            let label = if action.is_empty() { "?" } else { action };
            println!("[{}] {}", index, label);
            let value = serde_json::to_value(envelope)
                .map_err(|e| format!("Failed to serialize response: {}", e))?;
            print_value(&value, 1);
            Ok(())
        }
    }
}

/// Output a response in the specified format.
///
/// Serializes the response to JSON (pretty-printed) or human-readable text format.
fn output_response<T: Serialize>(format: OutputFormat, response: &T) -> Result<(), String> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(response)
                .map_err(|e| format!("Failed to serialize response: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            let value = serde_json::to_value(response)
                .map_err(|e| format!("Failed to serialize response: {}", e))?;
            print_value(&value, 0);
        }
    }
    Ok(())
}

/// Recursively print a JSON value with indentation for human-readable output.
///
/// Objects print as "key: value" pairs, arrays as indexed or bulleted items.
fn print_value(value: &Value, indent: usize) {
    let prefix = "  ".repeat(indent);
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                match val {
                    Value::Object(_) | Value::Array(_) => {
                        println!("{}{}:", prefix, key);
                        print_value(val, indent + 1);
                    }
                    _ => {
                        println!("{}{}: {}", prefix, key, format_simple_value(val));
                    }
                }
            }
        }
        Value::Array(arr) => {
            for (i, val) in arr.iter().enumerate() {
                match val {
                    Value::Object(_) | Value::Array(_) => {
                        println!("{}[{}]:", prefix, i);
                        print_value(val, indent + 1);
                    }
                    _ => {
                        println!("{}- {}", prefix, format_simple_value(val));
                    }
                }
            }
        }
        _ => {
            println!("{}{}", prefix, format_simple_value(value));
        }
    }
}

fn format_simple_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => value.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_script_array() {
        let script = r#"[{"action": "getPhaseHistory"}, {"action": "getPhaseHistory"}]"#;
        let requests = parse_script(script).unwrap();
        assert_eq!(requests.len(), 2);
    }

    #[test]
    fn test_parse_script_lines_skip_blank() {
        let script = "{\"action\": \"getPhaseHistory\"}\n\n   \n{\"action\": \"getPhaseHistory\"}\n";
        let requests = parse_script(script).unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(Value::is_object));
    }

    #[test]
    fn test_parse_script_keeps_bad_line() {
        let requests = parse_script("not json\n").unwrap();
        assert_eq!(requests, vec![Value::String("not json".to_string())]);
    }

    #[test]
    fn test_parse_script_bad_array() {
        assert!(parse_script("[{\"action\": ").is_err());
    }

    #[test]
    fn test_run_request_shares_engine() {
        let mut engine = DecompositionEngine::new();
        let config = ServerConfig::default();

        let (action, envelope) = run_request(
            &mut engine,
            &config,
            json!({"action": "createProblem", "problemId": "p1", "problemStatement": "x"}),
        )
        .unwrap();
        assert_eq!(action, "createProblem");
        assert!(envelope.is_success());

        let (_, envelope) = run_request(
            &mut engine,
            &config,
            json!({"action": "getProblemDetails", "problemId": "p1"}),
        )
        .unwrap();
        assert_eq!(envelope.get("componentCount"), Some(&json!(0)));
    }

    #[test]
    fn test_run_request_missing_action() {
        let mut engine = DecompositionEngine::new();
        let (action, envelope) =
            run_request(&mut engine, &ServerConfig::default(), json!({"problemId": "p1"}))
                .unwrap();
        assert!(action.is_empty());
        assert!(envelope.error().unwrap().contains("action"));
    }

    #[test]
    fn test_run_request_not_an_object() {
        let mut engine = DecompositionEngine::new();
        let (_, envelope) =
            run_request(&mut engine, &ServerConfig::default(), json!("oops")).unwrap();
        assert!(!envelope.is_success());
    }

    #[test]
    fn test_check_config_rejects_bad_override() {
        let config = ServerConfig {
            default_complexity: 0,
            ..Default::default()
        };
        assert!(check_config(&config).is_err());
        assert!(check_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_format_simple_value() {
        assert_eq!(format_simple_value(&Value::String("test".to_string())), "test");
        assert_eq!(format_simple_value(&json!(42)), "42");
        assert_eq!(format_simple_value(&Value::Bool(true)), "true");
        assert_eq!(format_simple_value(&Value::Null), "null");
    }
}
