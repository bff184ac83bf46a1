use crate::error::{InvokerError, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "fabric-invoker.toml";
pub const ENV_PREFIX: &str = "FABRIC_INVOKER_";

/// Peer discovery options handed to the gateway connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryOptions {
    pub enabled: bool,
    /// Rewrite peer hosts to `localhost`, as needed when the network runs in
    /// local containers.
    pub as_localhost: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            as_localhost: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokerConfig {
    pub wallet_path: PathBuf,
    pub connection_profile: PathBuf,
    /// Wallet label of the operating identity.
    pub identity_label: String,
    pub channel: String,
    pub contract: String,
    /// Key of the CA entry in the connection profile.
    pub ca_name: String,
    pub enrollment_id: String,
    pub enrollment_secret: String,
    pub msp_id: String,
    pub discovery: DiscoveryOptions,
    /// Function names starting with this prefix default to evaluation.
    pub query_prefix: String,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            wallet_path: PathBuf::from("wallet"),
            connection_profile: PathBuf::from(
                "../fabric-samples/test-network/organizations/peerOrganizations/org1.example.com/connection-org1.json",
            ),
            identity_label: "admin".to_string(),
            channel: "energychannel".to_string(),
            contract: "energytrading".to_string(),
            ca_name: "ca.org1.example.com".to_string(),
            enrollment_id: "admin".to_string(),
            enrollment_secret: "adminpw".to_string(),
            msp_id: "Org1MSP".to_string(),
            discovery: DiscoveryOptions::default(),
            query_prefix: "get".to_string(),
        }
    }
}

impl InvokerConfig {
    /// Layers defaults, the TOML file and `FABRIC_INVOKER_*` environment
    /// variables. Nested keys use `__`, e.g.
    /// `FABRIC_INVOKER_DISCOVERY__AS_LOCALHOST=false`.
    ///
    /// An explicitly named file must exist; `fabric-invoker.toml` is read
    /// only when present.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let file = match config_file {
            Some(path) => Toml::file_exact(path),
            None => Toml::file(DEFAULT_CONFIG_FILE),
        };
        Figment::new()
            .merge(Serialized::defaults(InvokerConfig::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| InvokerError::config(format!("invalid configuration: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_org1_test_network() {
        figment::Jail::expect_with(|_jail| {
            let config = InvokerConfig::load(None).expect("defaults should load");
            assert_eq!(config, InvokerConfig::default());
            assert_eq!(config.channel, "energychannel");
            assert_eq!(config.contract, "energytrading");
            assert_eq!(config.msp_id, "Org1MSP");
            assert!(config.discovery.enabled);
            Ok(())
        });
    }

    #[test]
    fn file_and_env_override_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "invoker.toml",
                r#"
                    channel = "mychannel"
                    contract = "basic"
                    query_prefix = "query"

                    [discovery]
                    as_localhost = false
                "#,
            )?;
            jail.set_env("FABRIC_INVOKER_IDENTITY_LABEL", "appUser");
            jail.set_env("FABRIC_INVOKER_DISCOVERY__ENABLED", "false");

            let config =
                InvokerConfig::load(Some(Path::new("invoker.toml"))).expect("should load");
            assert_eq!(config.channel, "mychannel");
            assert_eq!(config.contract, "basic");
            assert_eq!(config.query_prefix, "query");
            assert_eq!(config.identity_label, "appUser");
            assert!(!config.discovery.enabled);
            assert!(!config.discovery.as_localhost);
            assert_eq!(config.enrollment_secret, "adminpw");
            Ok(())
        });
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(DEFAULT_CONFIG_FILE, "channel = [1, 2")?;
            let err = InvokerConfig::load(None).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Config);
            Ok(())
        });
    }

    #[test]
    fn missing_explicit_file_is_a_config_error() {
        figment::Jail::expect_with(|_jail| {
            let err = InvokerConfig::load(Some(Path::new("does-not-exist.toml"))).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Config);
            Ok(())
        });
    }
}
