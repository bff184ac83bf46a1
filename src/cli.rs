use crate::config::InvokerConfig;
use crate::dispatch::{Capability, OperationRequest};
use crate::error::{ErrorEnvelope, Result};
use crate::invoker::ChaincodeInvoker;
use clap::Parser;
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;

pub const NO_FUNCTION_MESSAGE: &str = "No function specified";

#[derive(Parser, Debug)]
#[command(
    name = "fabric-invoker",
    about = "Submit or evaluate a chaincode function and print the JSON result",
    version
)]
pub struct Cli {
    /// TOML configuration file (defaults to ./fabric-invoker.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Evaluate without committing, whatever the function name
    #[arg(long, conflicts_with = "submit")]
    pub query: bool,

    /// Endorse and commit, whatever the function name
    #[arg(long)]
    pub submit: bool,

    /// Chaincode function name followed by its arguments. Options are only
    /// recognised before the function name; everything after it is passed
    /// through verbatim.
    #[arg(
        value_name = "FUNCTION [ARGS]",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub invocation: Vec<String>,
}

impl Cli {
    /// The function to invoke. An empty name counts as missing.
    pub fn function(&self) -> Option<&str> {
        self.invocation
            .first()
            .map(String::as_str)
            .filter(|f| !f.is_empty())
    }

    pub fn args(&self) -> &[String] {
        self.invocation.get(1..).unwrap_or_default()
    }

    /// Capability requested explicitly on the command line.
    pub fn capability(&self) -> Option<Capability> {
        match (self.query, self.submit) {
            (true, _) => Some(Capability::Query),
            (_, true) => Some(Capability::Submit),
            _ => None,
        }
    }
}

/// Envelope for a command line that could not be parsed, carrying the first
/// line of clap's diagnostic.
pub fn usage_envelope(error: &clap::Error) -> Value {
    let rendered = error.to_string();
    let message = rendered
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches("error: ");
    ErrorEnvelope::new(message).to_value()
}

/// Runs one invocation and returns the JSON value to print. `build` is
/// called only once a function name is known and configuration loaded.
pub async fn execute<F, Fut>(cli: Cli, build: F) -> Value
where
    F: FnOnce(InvokerConfig) -> Fut,
    Fut: Future<Output = Result<ChaincodeInvoker>>,
{
    let Some(function) = cli.function().map(str::to_string) else {
        return ErrorEnvelope::new(NO_FUNCTION_MESSAGE).to_value();
    };

    let config = match InvokerConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return ErrorEnvelope::from(e).to_value(),
    };
    let capability = cli
        .capability()
        .unwrap_or_else(|| Capability::classify(&function, &config.query_prefix));

    let invoker = match build(config).await {
        Ok(invoker) => invoker,
        Err(e) => {
            log::error!("Setup failed: {}", e);
            return ErrorEnvelope::from(e).to_value();
        }
    };
    invoker
        .invoke_enveloped(&OperationRequest::new(function, cli.args().to_vec(), capability))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_args_are_passed_through() {
        let cli = Cli::try_parse_from([
            "fabric-invoker",
            "transferEnergy",
            "assetId123",
            "--not-a-flag",
            "-50",
        ])
        .unwrap();
        assert_eq!(cli.function(), Some("transferEnergy"));
        assert_eq!(cli.args(), ["assetId123", "--not-a-flag", "-50"]);
        assert_eq!(cli.capability(), None);
    }

    #[test]
    fn options_after_the_function_are_arguments() {
        let cli =
            Cli::try_parse_from(["fabric-invoker", "transferEnergy", "--query", "x"]).unwrap();
        assert_eq!(cli.function(), Some("transferEnergy"));
        assert_eq!(cli.args(), ["--query", "x"]);
        assert_eq!(cli.capability(), None);

        let cli = Cli::try_parse_from(["fabric-invoker", "transferEnergy", "--help"]).unwrap();
        assert_eq!(cli.args(), ["--help"]);
    }

    #[test]
    fn unparsable_command_line_becomes_an_envelope() {
        let err = Cli::try_parse_from(["fabric-invoker", "--config"]).unwrap_err();
        let value = usage_envelope(&err);
        assert_eq!(value["status"], "ERROR");
        let message = value["message"].as_str().unwrap();
        assert!(message.contains("--config"));
        assert!(!message.contains('\n'));
    }

    #[test]
    fn explicit_capability_flags() {
        let cli = Cli::try_parse_from(["fabric-invoker", "--query", "queryAssetHistory", "a1"])
            .unwrap();
        assert_eq!(cli.capability(), Some(Capability::Query));

        let cli = Cli::try_parse_from(["fabric-invoker", "--submit", "getAndIncrement"]).unwrap();
        assert_eq!(cli.capability(), Some(Capability::Submit));

        assert!(Cli::try_parse_from(["fabric-invoker", "--query", "--submit", "f"]).is_err());
    }

    #[test]
    fn function_is_optional() {
        let cli = Cli::try_parse_from(["fabric-invoker"]).unwrap();
        assert!(cli.function().is_none());
        assert!(cli.args().is_empty());
    }

    #[tokio::test]
    async fn missing_function_yields_envelope_without_setup() {
        let cli = Cli::try_parse_from(["fabric-invoker"]).unwrap();
        let mut built = false;
        let value = execute(cli, |_config| {
            built = true;
            async { Err(crate::error::InvokerError::config("unreachable")) }
        })
        .await;
        assert!(!built);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"status":"ERROR","message":"No function specified"}"#
        );
    }

    #[tokio::test]
    async fn empty_function_name_counts_as_missing() {
        let cli = Cli::try_parse_from(["fabric-invoker", ""]).unwrap();
        let mut built = false;
        let value = execute(cli, |_config| {
            built = true;
            async { Err(crate::error::InvokerError::config("unreachable")) }
        })
        .await;
        assert!(!built);
        assert_eq!(value["message"], NO_FUNCTION_MESSAGE);
    }

    #[tokio::test]
    async fn setup_failure_is_enveloped() {
        let cli = Cli::try_parse_from(["fabric-invoker", "getUserState", "alice"]).unwrap();
        let value = execute(cli, |_config| async {
            Err(crate::error::InvokerError::config("cannot read connection profile"))
        })
        .await;
        assert_eq!(value["status"], "ERROR");
        assert_eq!(value["message"], "cannot read connection profile");
    }
}
