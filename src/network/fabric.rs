use super::gateway::{ContractRef, GatewayConnector, LedgerSession};
use super::profile::ConnectionProfile;
use super::proto::{gateway, peer, rpc};
use super::signer::{self, IdentitySigner};
use crate::config::DiscoveryOptions;
use crate::error::{InvokerError, Result};
use crate::pki::X509Identity;
use async_trait::async_trait;
use prost::Message;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};

/// Connects to the Fabric Gateway service hosted by an organization peer.
pub struct HyperledgerFabricGateway;

impl HyperledgerFabricGateway {
    pub fn new() -> Self {
        Self
    }
}

/// Peer URL translated to a tonic endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PeerAddress {
    pub uri: String,
    pub tls: bool,
    pub host: String,
}

/// Maps `grpc(s)://host:port` to `http(s)://...`, optionally pointing the
/// host at `localhost`. `host` keeps the original name for TLS checks.
pub(crate) fn peer_address(url: &str, as_localhost: bool) -> Result<PeerAddress> {
    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| InvokerError::session(format!("peer url '{url}' has no scheme")))?;
    let tls = match scheme {
        "grpcs" | "https" => true,
        "grpc" | "http" => false,
        other => {
            return Err(InvokerError::session(format!(
                "unsupported peer url scheme '{other}'"
            )));
        }
    };
    let authority = rest.split('/').next().unwrap_or_default();
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    };
    if host.is_empty() {
        return Err(InvokerError::session(format!("peer url '{url}' has no host")));
    }
    let target = if as_localhost { "localhost" } else { host };
    let scheme = if tls { "https" } else { "http" };
    let uri = match port {
        Some(port) => format!("{scheme}://{target}:{port}"),
        None => format!("{scheme}://{target}"),
    };
    Ok(PeerAddress {
        uri,
        tls,
        host: host.to_string(),
    })
}

#[async_trait]
impl GatewayConnector for HyperledgerFabricGateway {
    async fn connect(
        &self,
        profile: &ConnectionProfile,
        identity: &X509Identity,
        discovery: &DiscoveryOptions,
    ) -> Result<Box<dyn LedgerSession>> {
        let signer = IdentitySigner::new(identity)?;
        let (peer_name, peer) = profile.gateway_peer()?;
        let address = peer_address(&peer.url, discovery.as_localhost)?;

        log::info!("Connecting to Hyperledger Fabric gateway {} ({})", peer_name, address.uri);

        let mut endpoint = Endpoint::from_shared(address.uri.clone())
            .map_err(|e| InvokerError::session(format!("invalid peer endpoint: {e}")))?;
        if address.tls {
            let pem = peer
                .tls_ca_certs
                .as_ref()
                .ok_or_else(|| {
                    InvokerError::config(format!("peer '{peer_name}' has no tlsCACerts"))
                })?
                .pem_bundle()?;
            let domain = peer.ssl_target_name().unwrap_or(address.host.clone());
            let tls = ClientTlsConfig::new()
                .ca_certificate(Certificate::from_pem(pem))
                .domain_name(domain);
            endpoint = endpoint
                .tls_config(tls)
                .map_err(|e| InvokerError::session(format!("invalid TLS configuration: {e}")))?;
        }
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| InvokerError::session(format!("failed to connect to {peer_name}: {e}")))?;

        // The gateway peer runs discovery itself; without it only the
        // client's own organization is asked to endorse.
        let organizations = if discovery.enabled {
            Vec::new()
        } else {
            vec![signer.msp_id().to_string()]
        };

        log::info!("Connected to HLF network as {}", signer.msp_id());
        Ok(Box::new(FabricSession {
            grpc: Grpc::new(channel),
            signer,
            organizations,
        }))
    }
}

pub struct FabricSession {
    grpc: Grpc<Channel>,
    signer: IdentitySigner,
    organizations: Vec<String>,
}

/// Error message for a failed gateway call, including per-peer details.
pub(crate) fn describe_status(operation: &str, status: &tonic::Status) -> String {
    let mut message = format!("{operation} failed: {}", status.message());
    if let Ok(details) = rpc::Status::decode(status.details()) {
        for any in details.details {
            if let Ok(detail) = gateway::ErrorDetail::decode(any.value.as_slice()) {
                if !detail.message.is_empty() {
                    message.push_str(&format!(
                        "; peer={} mspid={}: {}",
                        detail.address, detail.msp_id, detail.message
                    ));
                }
            }
        }
    }
    message
}

impl FabricSession {
    async fn unary<Req, Resp>(&mut self, operation: &str, path: &'static str, request: Req) -> Result<Resp>
    where
        Req: Message + Send + Sync + 'static,
        Resp: Message + Default + Send + Sync + 'static,
    {
        self.grpc
            .ready()
            .await
            .map_err(|e| InvokerError::session(format!("gateway not ready: {e}")))?;
        let codec: ProstCodec<Req, Resp> = ProstCodec::default();
        let response = self
            .grpc
            .unary(tonic::Request::new(request), PathAndQuery::from_static(path), codec)
            .await
            .map_err(|status| InvokerError::operation(describe_status(operation, &status)))?;
        Ok(response.into_inner())
    }

    async fn wait_for_commit(&mut self, channel: &str, transaction_id: &str) -> Result<()> {
        let request = gateway::CommitStatusRequest {
            transaction_id: transaction_id.to_string(),
            channel_id: channel.to_string(),
            identity: self.signer.creator(),
        }
        .encode_to_vec();
        let signature = self.signer.sign(&request);
        let status: gateway::CommitStatusResponse = self
            .unary(
                "Commit status",
                gateway::COMMIT_STATUS_PATH,
                gateway::SignedCommitStatusRequest { request, signature },
            )
            .await?;

        if status.result != 0 {
            return Err(InvokerError::operation(format!(
                "Transaction {transaction_id} failed to commit with status code {} ({})",
                status.result,
                peer::validation_code_name(status.result)
            )));
        }
        log::debug!("Transaction {} committed in block {}", transaction_id, status.block_number);
        Ok(())
    }
}

#[async_trait]
impl LedgerSession for FabricSession {
    async fn evaluate_transaction(
        &mut self,
        contract: &ContractRef,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        let proposal =
            signer::build_proposal(&self.signer, &contract.channel, &contract.name, function, args);
        let request = gateway::EvaluateRequest {
            transaction_id: proposal.transaction_id,
            channel_id: contract.channel.clone(),
            proposed_transaction: Some(proposal.signed),
            target_organizations: self.organizations.clone(),
        };
        let response: gateway::EvaluateResponse = self
            .unary("Evaluate", gateway::EVALUATE_PATH, request)
            .await?;
        Ok(response.result.map(|r| r.payload).unwrap_or_default())
    }

    async fn submit_transaction(
        &mut self,
        contract: &ContractRef,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        let proposal =
            signer::build_proposal(&self.signer, &contract.channel, &contract.name, function, args);
        let transaction_id = proposal.transaction_id.clone();

        let endorsed: gateway::EndorseResponse = self
            .unary(
                "Endorse",
                gateway::ENDORSE_PATH,
                gateway::EndorseRequest {
                    transaction_id: transaction_id.clone(),
                    channel_id: contract.channel.clone(),
                    proposed_transaction: Some(proposal.signed),
                    endorsing_organizations: self.organizations.clone(),
                },
            )
            .await?;
        let mut envelope = endorsed
            .prepared_transaction
            .ok_or_else(|| InvokerError::operation("Endorse returned no prepared transaction"))?;
        let result = signer::endorsed_result(&envelope)?;
        envelope.signature = self.signer.sign(&envelope.payload);

        let _: gateway::SubmitResponse = self
            .unary(
                "Submit",
                gateway::SUBMIT_PATH,
                gateway::SubmitRequest {
                    transaction_id: transaction_id.clone(),
                    channel_id: contract.channel.clone(),
                    prepared_transaction: Some(envelope),
                },
            )
            .await?;

        self.wait_for_commit(&contract.channel, &transaction_id).await?;
        Ok(result)
    }

    async fn disconnect(self: Box<Self>) {
        // Dropping the last handle closes the HTTP/2 connection.
        drop(self);
        log::info!("Disconnected from HLF network");
    }
}
