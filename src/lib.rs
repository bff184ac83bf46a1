//! Command-line bridge to a Hyperledger Fabric network: enrolls the operating
//! identity on first use, opens a gateway session, and submits or evaluates
//! a chaincode function, returning its JSON result.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod invoker;
pub mod network;
pub mod pki;
pub mod wallet;

pub use config::{DiscoveryOptions, InvokerConfig};
pub use dispatch::{Capability, OperationRequest};
pub use error::{ErrorEnvelope, ErrorKind, InvokerError};
pub use invoker::ChaincodeInvoker;
