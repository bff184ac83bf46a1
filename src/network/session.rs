use super::gateway::{ContractRef, GatewayConnector};
use super::profile::ConnectionProfile;
use crate::config::{DiscoveryOptions, InvokerConfig};
use crate::dispatch::{self, OperationRequest};
use crate::error::Result;
use crate::pki::X509Identity;
use std::sync::Arc;

/// Opens one gateway session per request and always releases it.
pub struct SessionManager {
    connector: Arc<dyn GatewayConnector>,
    contract: ContractRef,
    discovery: DiscoveryOptions,
}

impl SessionManager {
    pub fn new(connector: Arc<dyn GatewayConnector>, config: &InvokerConfig) -> Self {
        Self {
            connector,
            contract: ContractRef::new(config.channel.clone(), config.contract.clone()),
            discovery: config.discovery.clone(),
        }
    }

    pub fn contract(&self) -> &ContractRef {
        &self.contract
    }

    /// Connects, dispatches `request`, and disconnects before returning,
    /// whether or not the operation succeeded.
    pub async fn execute(
        &self,
        profile: &ConnectionProfile,
        identity: &X509Identity,
        request: &OperationRequest,
    ) -> Result<Vec<u8>> {
        let mut session = self
            .connector
            .connect(profile, identity, &self.discovery)
            .await?;
        log::debug!(
            "Resolved contract {} on channel {}",
            self.contract.name,
            self.contract.channel
        );
        let outcome = dispatch::dispatch(session.as_mut(), &self.contract, request).await;
        session.disconnect().await;
        outcome
    }
}
