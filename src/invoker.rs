use crate::config::InvokerConfig;
use crate::dispatch::{self, Capability, OperationRequest};
use crate::error::{ErrorEnvelope, Result};
use crate::identity::IdentityBootstrapper;
use crate::network::{ConnectionProfile, GatewayConnector, HyperledgerFabricGateway, SessionManager};
use crate::pki::{Enroller, FabricCaClient};
use crate::wallet::{FileSystemWallet, IdentityStore};
use serde_json::Value;
use std::sync::Arc;

/// Identity bootstrap, gateway session and dispatch for one invocation.
pub struct ChaincodeInvoker {
    profile: ConnectionProfile,
    bootstrapper: IdentityBootstrapper,
    sessions: SessionManager,
    query_prefix: String,
}

impl ChaincodeInvoker {
    pub fn new(
        config: &InvokerConfig,
        profile: ConnectionProfile,
        wallet: Arc<dyn IdentityStore>,
        enroller: Arc<dyn Enroller>,
        connector: Arc<dyn GatewayConnector>,
    ) -> Self {
        Self {
            profile,
            bootstrapper: IdentityBootstrapper::new(wallet, enroller, config),
            sessions: SessionManager::new(connector, config),
            query_prefix: config.query_prefix.clone(),
        }
    }

    /// Wires the file-system wallet, Fabric CA client and Fabric gateway.
    pub async fn from_config(config: &InvokerConfig) -> Result<Self> {
        let wallet = FileSystemWallet::open(&config.wallet_path).await?;
        let profile = ConnectionProfile::from_file(&config.connection_profile)?;
        Ok(Self::new(
            config,
            profile,
            Arc::new(wallet),
            Arc::new(FabricCaClient::new()),
            Arc::new(HyperledgerFabricGateway::new()),
        ))
    }

    pub fn classify(&self, function: &str) -> Capability {
        Capability::classify(function, &self.query_prefix)
    }

    pub async fn invoke(&self, request: &OperationRequest) -> Result<Value> {
        let identity = self.bootstrapper.ensure_identity(&self.profile).await?;
        let payload = self
            .sessions
            .execute(&self.profile, &identity, request)
            .await?;
        dispatch::decode_payload(&payload)
    }

    /// Like [`invoke`](Self::invoke), with failures flattened into the
    /// error envelope.
    pub async fn invoke_enveloped(&self, request: &OperationRequest) -> Value {
        match self.invoke(request).await {
            Ok(value) => value,
            Err(e) => {
                log::error!("{} failed ({}): {}", request.function, e.kind().description(), e);
                ErrorEnvelope::from(&e).to_value()
            }
        }
    }

    pub async fn submit(&self, function: &str, args: Vec<String>) -> Value {
        self.invoke_enveloped(&OperationRequest::submit(function, args))
            .await
    }

    pub async fn query(&self, function: &str, args: Vec<String>) -> Value {
        self.invoke_enveloped(&OperationRequest::query(function, args))
            .await
    }
}
