use serde::{Deserialize, Serialize};

pub const X509_TYPE: &str = "X.509";

/// Certificate and key issued by a CA enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub certificate: String,
    /// PKCS#8 PEM.
    pub private_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub certificate: String,
    #[serde(rename = "privateKey")]
    pub private_key: String,
}

/// Wallet entry, laid out the way the Fabric SDKs store `<label>.id` files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct X509Identity {
    pub credentials: Credentials,
    #[serde(rename = "mspId")]
    pub msp_id: String,
    #[serde(rename = "type")]
    pub identity_type: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

impl X509Identity {
    pub fn from_enrollment(enrollment: Enrollment, msp_id: impl Into<String>) -> Self {
        Self {
            credentials: Credentials {
                certificate: enrollment.certificate,
                private_key: enrollment.private_key,
            },
            msp_id: msp_id.into(),
            identity_type: X509_TYPE.to_string(),
            version: default_version(),
        }
    }

    pub fn is_x509(&self) -> bool {
        self.identity_type == X509_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_in_sdk_wallet_layout() {
        let identity = X509Identity::from_enrollment(
            Enrollment {
                certificate: "CERT".to_string(),
                private_key: "KEY".to_string(),
            },
            "Org1MSP",
        );
        let value = serde_json::to_value(&identity).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "credentials": { "certificate": "CERT", "privateKey": "KEY" },
                "mspId": "Org1MSP",
                "type": "X.509",
                "version": 1
            })
        );
    }

    #[test]
    fn reads_entries_without_version() {
        let identity: X509Identity = serde_json::from_str(
            r#"{"credentials":{"certificate":"C","privateKey":"K"},"mspId":"Org1MSP","type":"X.509"}"#,
        )
        .unwrap();
        assert!(identity.is_x509());
        assert_eq!(identity.version, 1);
    }
}
