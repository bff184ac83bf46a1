use crate::error::{InvokerError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Common connection profile for one organization, as produced by the
/// Fabric test network (`connection-org1.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub organizations: HashMap<String, Organization>,
    #[serde(default)]
    pub peers: HashMap<String, NodeEndpoint>,
    #[serde(default)]
    pub orderers: HashMap<String, NodeEndpoint>,
    #[serde(default, rename = "certificateAuthorities")]
    pub certificate_authorities: HashMap<String, CertificateAuthorityInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientSection {
    #[serde(default)]
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Organization {
    pub mspid: String,
    #[serde(default)]
    pub peers: Vec<String>,
    #[serde(default, rename = "certificateAuthorities")]
    pub certificate_authorities: Vec<String>,
}

/// A peer or orderer entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeEndpoint {
    pub url: String,
    #[serde(default, rename = "tlsCACerts")]
    pub tls_ca_certs: Option<TlsCaCerts>,
    #[serde(default, rename = "grpcOptions")]
    pub grpc_options: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CertificateAuthorityInfo {
    pub url: String,
    #[serde(default, rename = "caName")]
    pub ca_name: Option<String>,
    #[serde(default, rename = "tlsCACerts")]
    pub tls_ca_certs: Option<TlsCaCerts>,
    #[serde(default, rename = "httpOptions")]
    pub http_options: HttpOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpOptions {
    #[serde(default = "default_verify")]
    pub verify: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            verify: default_verify(),
        }
    }
}

fn default_verify() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct TlsCaCerts {
    #[serde(default)]
    pub pem: Option<PemSource>,
    #[serde(default)]
    pub path: Option<String>,
}

/// Peers carry a single PEM string, CAs a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PemSource {
    One(String),
    Many(Vec<String>),
}

impl TlsCaCerts {
    /// Concatenated PEM bundle, reading `path` when no inline PEM is given.
    pub fn pem_bundle(&self) -> Result<String> {
        match (&self.pem, &self.path) {
            (Some(PemSource::One(pem)), _) => Ok(pem.clone()),
            (Some(PemSource::Many(pems)), _) => Ok(pems.join("\n")),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                InvokerError::config(format!("cannot read TLS CA certificate {path}: {e}"))
            }),
            (None, None) => Err(InvokerError::config("tlsCACerts has neither pem nor path")),
        }
    }
}

impl NodeEndpoint {
    /// TLS server name to verify against; differs from the URL host when
    /// the peer is reached through `localhost`.
    pub fn ssl_target_name(&self) -> Option<String> {
        ["ssl-target-name-override", "hostnameOverride"]
            .iter()
            .find_map(|key| self.grpc_options.get(*key))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }
}

impl ConnectionProfile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            InvokerError::config(format!(
                "cannot read connection profile {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| InvokerError::config(format!("malformed connection profile: {e}")))
    }

    pub fn certificate_authority(&self, name: &str) -> Result<&CertificateAuthorityInfo> {
        self.certificate_authorities.get(name).ok_or_else(|| {
            InvokerError::config(format!(
                "certificate authority '{name}' not found in connection profile"
            ))
        })
    }

    /// The organization the client belongs to. Falls back to the only
    /// organization when `client.organization` is absent.
    pub fn client_organization(&self) -> Result<(&str, &Organization)> {
        if let Some(name) = &self.client.organization {
            return self
                .organizations
                .get_key_value(name)
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| {
                    InvokerError::config(format!("organization '{name}' not found in profile"))
                });
        }
        let mut orgs = self.organizations.iter();
        match (orgs.next(), orgs.next()) {
            (Some((k, v)), None) => Ok((k.as_str(), v)),
            _ => Err(InvokerError::config(
                "connection profile does not name a client organization",
            )),
        }
    }

    /// Peer used as the gateway endpoint: the first listed peer of the client
    /// organization.
    pub fn gateway_peer(&self) -> Result<(&str, &NodeEndpoint)> {
        let (org_name, org) = self.client_organization()?;
        let peer_name = org.peers.first().ok_or_else(|| {
            InvokerError::session(format!("organization '{org_name}' lists no peers"))
        })?;
        self.peers
            .get_key_value(peer_name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| {
                InvokerError::session(format!("peer '{peer_name}' not found in connection profile"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORG1_PROFILE: &str = r#"{
        "name": "test-network-org1",
        "version": "1.0.0",
        "client": { "organization": "Org1" },
        "organizations": {
            "Org1": {
                "mspid": "Org1MSP",
                "peers": ["peer0.org1.example.com"],
                "certificateAuthorities": ["ca.org1.example.com"]
            }
        },
        "peers": {
            "peer0.org1.example.com": {
                "url": "grpcs://localhost:7051",
                "tlsCACerts": { "pem": "-----BEGIN CERTIFICATE-----\nPEER\n-----END CERTIFICATE-----\n" },
                "grpcOptions": {
                    "ssl-target-name-override": "peer0.org1.example.com",
                    "hostnameOverride": "peer0.org1.example.com"
                }
            }
        },
        "certificateAuthorities": {
            "ca.org1.example.com": {
                "url": "https://localhost:7054",
                "caName": "ca-org1",
                "tlsCACerts": { "pem": ["-----BEGIN CERTIFICATE-----\nCA\n-----END CERTIFICATE-----\n"] },
                "httpOptions": { "verify": false }
            }
        }
    }"#;

    #[test]
    fn parses_test_network_profile() {
        let profile = ConnectionProfile::from_json(ORG1_PROFILE).unwrap();
        assert_eq!(profile.name, "test-network-org1");

        let ca = profile.certificate_authority("ca.org1.example.com").unwrap();
        assert_eq!(ca.url, "https://localhost:7054");
        assert_eq!(ca.ca_name.as_deref(), Some("ca-org1"));
        assert!(!ca.http_options.verify);
        assert!(ca.tls_ca_certs.as_ref().unwrap().pem_bundle().unwrap().contains("CA"));

        let (name, peer) = profile.gateway_peer().unwrap();
        assert_eq!(name, "peer0.org1.example.com");
        assert_eq!(peer.ssl_target_name().as_deref(), Some("peer0.org1.example.com"));
        assert!(peer.tls_ca_certs.as_ref().unwrap().pem_bundle().unwrap().contains("PEER"));
    }

    #[test]
    fn unknown_ca_is_a_config_error() {
        let profile = ConnectionProfile::from_json(ORG1_PROFILE).unwrap();
        let err = profile.certificate_authority("ca.org2.example.com").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn malformed_profile_is_rejected() {
        let err = ConnectionProfile::from_json("{ not json").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn missing_profile_file_is_a_config_error() {
        let err = ConnectionProfile::from_file(Path::new("/nonexistent/connection.json"))
            .unwrap_err();
        assert!(err.to_string().contains("cannot read connection profile"));
    }
}
