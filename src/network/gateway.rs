use crate::config::DiscoveryOptions;
use crate::error::Result;
use crate::network::profile::ConnectionProfile;
use crate::pki::X509Identity;
use async_trait::async_trait;

/// A chaincode addressed by channel and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractRef {
    pub channel: String,
    pub name: String,
}

impl ContractRef {
    pub fn new(channel: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            name: name.into(),
        }
    }
}

/// Opens sessions against the ledger network.
#[async_trait]
pub trait GatewayConnector: Send + Sync {
    async fn connect(
        &self,
        profile: &ConnectionProfile,
        identity: &X509Identity,
        discovery: &DiscoveryOptions,
    ) -> Result<Box<dyn LedgerSession>>;
}

/// A connected gateway. `disconnect` consumes the session, so it can be
/// released only once.
#[async_trait]
pub trait LedgerSession: Send {
    /// Read-only evaluation on a single peer; nothing is written to the ledger.
    async fn evaluate_transaction(
        &mut self,
        contract: &ContractRef,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>>;

    /// Endorse, order and wait for the commit of a transaction.
    async fn submit_transaction(
        &mut self,
        contract: &ContractRef,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>>;

    async fn disconnect(self: Box<Self>);
}
