use super::certificate::Enrollment;
use crate::error::{InvokerError, Result};
use crate::network::profile::CertificateAuthorityInfo;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Issues credentials for an enrollment id.
#[async_trait]
pub trait Enroller: Send + Sync {
    async fn enroll(
        &self,
        ca: &CertificateAuthorityInfo,
        enrollment_id: &str,
        enrollment_secret: &str,
    ) -> Result<Enrollment>;
}

/// Fabric CA client speaking the REST enrollment API.
pub struct FabricCaClient;

#[derive(Serialize)]
struct EnrollRequest<'a> {
    certificate_request: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    caname: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EnrollResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<EnrollResult>,
    #[serde(default)]
    errors: Vec<CaMessage>,
}

#[derive(Debug, Deserialize)]
struct EnrollResult {
    #[serde(rename = "Cert")]
    cert: String,
}

#[derive(Debug, Deserialize)]
struct CaMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Generates a P-256 key and a CSR whose subject CN is the enrollment id.
/// Returns `(csr_pem, private_key_pem)`.
pub fn generate_csr(enrollment_id: &str) -> Result<(String, String)> {
    let key_pair = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)
        .map_err(|e| InvokerError::identity(format!("key generation failed: {e}")))?;
    let mut params = rcgen::CertificateParams::new(Vec::<String>::new())
        .map_err(|e| InvokerError::identity(format!("invalid CSR parameters: {e}")))?;
    params.distinguished_name = rcgen::DistinguishedName::new();
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, enrollment_id);
    let csr = params
        .serialize_request(&key_pair)
        .and_then(|csr| csr.pem())
        .map_err(|e| InvokerError::identity(format!("CSR generation failed: {e}")))?;
    Ok((csr, key_pair.serialize_pem()))
}

fn enroll_url(ca_url: &str) -> String {
    format!("{}/api/v1/enroll", ca_url.trim_end_matches('/'))
}

impl FabricCaClient {
    pub fn new() -> Self {
        Self
    }

    fn http_client(ca: &CertificateAuthorityInfo) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().use_rustls_tls();
        if !ca.http_options.verify {
            builder = builder.danger_accept_invalid_certs(true);
        } else if let Some(tls) = &ca.tls_ca_certs {
            let bundle = tls.pem_bundle()?;
            let certs = reqwest::Certificate::from_pem_bundle(bundle.as_bytes())
                .map_err(|e| InvokerError::config(format!("invalid CA TLS certificate: {e}")))?;
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }
        builder
            .build()
            .map_err(|e| InvokerError::identity(format!("cannot build CA client: {e}")))
    }
}

fn parse_enroll_response(body: &str) -> Result<String> {
    let response: EnrollResponse = serde_json::from_str(body)
        .map_err(|e| InvokerError::identity(format!("malformed CA response: {e}")))?;
    if !response.success || !response.errors.is_empty() {
        let detail = response
            .errors
            .iter()
            .map(|m| format!("code: {}, message: {}", m.code, m.message))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(InvokerError::identity(format!(
            "Enrollment failed with errors [{detail}]"
        )));
    }
    let result = response
        .result
        .ok_or_else(|| InvokerError::identity("CA response carries no certificate"))?;
    let cert = STANDARD
        .decode(result.cert.as_bytes())
        .map_err(|e| InvokerError::identity(format!("certificate is not base64: {e}")))?;
    String::from_utf8(cert)
        .map_err(|e| InvokerError::identity(format!("certificate is not UTF-8 PEM: {e}")))
}

#[async_trait]
impl Enroller for FabricCaClient {
    async fn enroll(
        &self,
        ca: &CertificateAuthorityInfo,
        enrollment_id: &str,
        enrollment_secret: &str,
    ) -> Result<Enrollment> {
        let (csr, private_key) = generate_csr(enrollment_id)?;
        let client = Self::http_client(ca)?;

        log::debug!("Enrolling '{}' at {}", enrollment_id, ca.url);
        let response = client
            .post(enroll_url(&ca.url))
            .basic_auth(enrollment_id, Some(enrollment_secret))
            .json(&EnrollRequest {
                certificate_request: &csr,
                caname: ca.ca_name.as_deref(),
            })
            .send()
            .await
            .map_err(|e| InvokerError::identity(format!("CA request failed: {e}")))?;
        let body = response
            .text()
            .await
            .map_err(|e| InvokerError::identity(format!("CA response unreadable: {e}")))?;

        let certificate = parse_enroll_response(&body)?;
        Ok(Enrollment {
            certificate,
            private_key,
        })
    }
}
