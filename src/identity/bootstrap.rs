use crate::config::InvokerConfig;
use crate::error::Result;
use crate::network::profile::ConnectionProfile;
use crate::pki::{Enroller, X509Identity};
use crate::wallet::IdentityStore;
use std::sync::Arc;

/// Makes sure the operating identity exists in the wallet, enrolling it
/// against the CA the first time it is needed.
pub struct IdentityBootstrapper {
    wallet: Arc<dyn IdentityStore>,
    enroller: Arc<dyn Enroller>,
    label: String,
    ca_name: String,
    enrollment_id: String,
    enrollment_secret: String,
    msp_id: String,
}

impl IdentityBootstrapper {
    pub fn new(
        wallet: Arc<dyn IdentityStore>,
        enroller: Arc<dyn Enroller>,
        config: &InvokerConfig,
    ) -> Self {
        Self {
            wallet,
            enroller,
            label: config.identity_label.clone(),
            ca_name: config.ca_name.clone(),
            enrollment_id: config.enrollment_id.clone(),
            enrollment_secret: config.enrollment_secret.clone(),
            msp_id: config.msp_id.clone(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub async fn ensure_identity(&self, profile: &ConnectionProfile) -> Result<X509Identity> {
        if let Some(identity) = self.wallet.get(&self.label).await? {
            return Ok(identity);
        }

        log::info!("Admin identity not found, enrolling admin...");
        let ca = profile.certificate_authority(&self.ca_name)?;
        let enrollment = self
            .enroller
            .enroll(ca, &self.enrollment_id, &self.enrollment_secret)
            .await?;
        let identity = X509Identity::from_enrollment(enrollment, self.msp_id.clone());
        self.wallet.put(&self.label, &identity).await?;
        log::info!("Admin enrolled successfully");

        Ok(identity)
    }
}
