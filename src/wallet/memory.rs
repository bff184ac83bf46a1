use super::IdentityStore;
use crate::error::Result;
use crate::pki::X509Identity;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Non-persistent wallet.
#[derive(Clone, Default)]
pub struct InMemoryWallet {
    identities: Arc<RwLock<HashMap<String, X509Identity>>>,
}

impl InMemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for InMemoryWallet {
    async fn get(&self, label: &str) -> Result<Option<X509Identity>> {
        Ok(self.identities.read().await.get(label).cloned())
    }

    async fn put(&self, label: &str, identity: &X509Identity) -> Result<()> {
        self.identities
            .write()
            .await
            .insert(label.to_string(), identity.clone());
        Ok(())
    }

    async fn remove(&self, label: &str) -> Result<()> {
        self.identities.write().await.remove(label);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut labels: Vec<String> = self.identities.read().await.keys().cloned().collect();
        labels.sort();
        Ok(labels)
    }
}
