pub mod filesystem;
pub mod memory;

pub use filesystem::FileSystemWallet;
pub use memory::InMemoryWallet;

use crate::error::Result;
use crate::pki::X509Identity;
use async_trait::async_trait;

/// Durable identity storage keyed by label.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get(&self, label: &str) -> Result<Option<X509Identity>>;
    async fn put(&self, label: &str, identity: &X509Identity) -> Result<()>;
    async fn remove(&self, label: &str) -> Result<()>;
    async fn list(&self) -> Result<Vec<String>>;
}
