pub mod fabric;
pub mod gateway;
pub mod profile;
pub mod proto;
pub mod session;
pub mod signer;

pub use fabric::HyperledgerFabricGateway;
pub use gateway::{ContractRef, GatewayConnector, LedgerSession};
pub use profile::ConnectionProfile;
pub use session::SessionManager;
