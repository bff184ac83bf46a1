use super::IdentityStore;
use crate::error::{InvokerError, Result};
use crate::pki::X509Identity;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const ID_EXTENSION: &str = "id";

/// One `<label>.id` JSON file per identity, the layout used by the Fabric
/// SDK file-system wallets.
pub struct FileSystemWallet {
    root: PathBuf,
}

impl FileSystemWallet {
    /// Opens the wallet, creating its directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            InvokerError::identity(format!("cannot create wallet {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, label: &str) -> Result<PathBuf> {
        if label.is_empty() || label.contains(['/', '\\']) || label == "." || label == ".." {
            return Err(InvokerError::identity(format!("invalid identity label '{label}'")));
        }
        Ok(self.root.join(format!("{label}.{ID_EXTENSION}")))
    }
}

#[async_trait]
impl IdentityStore for FileSystemWallet {
    async fn get(&self, label: &str) -> Result<Option<X509Identity>> {
        let path = self.entry_path(label)?;
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(InvokerError::identity(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };
        serde_json::from_slice(&raw).map(Some).map_err(|e| {
            InvokerError::identity(format!("corrupt wallet entry {}: {e}", path.display()))
        })
    }

    async fn put(&self, label: &str, identity: &X509Identity) -> Result<()> {
        let path = self.entry_path(label)?;
        let raw = serde_json::to_vec(identity)
            .map_err(|e| InvokerError::identity(format!("cannot serialize identity: {e}")))?;
        // `<label>.id` is only ever replaced whole.
        let staging = self.root.join(format!(".{label}.{ID_EXTENSION}.tmp"));
        tokio::fs::write(&staging, raw).await.map_err(|e| {
            InvokerError::identity(format!("cannot write {}: {e}", staging.display()))
        })?;
        tokio::fs::rename(&staging, &path).await.map_err(|e| {
            InvokerError::identity(format!("cannot write {}: {e}", path.display()))
        })
    }

    async fn remove(&self, label: &str) -> Result<()> {
        let path = self.entry_path(label)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(InvokerError::identity(format!(
                "cannot remove {}: {e}",
                path.display()
            ))),
        }
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            InvokerError::identity(format!("cannot list {}: {e}", self.root.display()))
        })?;
        let mut labels = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| InvokerError::identity(format!("cannot list wallet: {e}")))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(ID_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    labels.push(stem.to_string());
                }
            }
        }
        labels.sort();
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pki::Enrollment;
    use tokio_test::{assert_err, assert_ok};

    fn identity() -> X509Identity {
        X509Identity::from_enrollment(
            Enrollment {
                certificate: "CERT".to_string(),
                private_key: "KEY".to_string(),
            },
            "Org1MSP",
        )
    }

    #[tokio::test]
    async fn stores_identity_under_label() {
        let dir = tempfile::tempdir().unwrap();
        let wallet = assert_ok!(FileSystemWallet::open(dir.path().join("wallet")).await);

        assert_eq!(assert_ok!(wallet.get("admin").await), None);
        assert_ok!(wallet.put("admin", &identity()).await);

        assert!(dir.path().join("wallet/admin.id").exists());
        assert_eq!(assert_ok!(wallet.get("admin").await), Some(identity()));
        assert_eq!(assert_ok!(wallet.list().await), vec!["admin".to_string()]);

        assert_ok!(wallet.remove("admin").await);
        assert_eq!(assert_ok!(wallet.get("admin").await), None);
        assert_ok!(wallet.remove("admin").await);
    }

    #[tokio::test]
    async fn overwrite_replaces_entry_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let wallet = assert_ok!(FileSystemWallet::open(dir.path()).await);
        std::fs::write(dir.path().join("admin.id"), "{\"truncated").unwrap();

        assert_ok!(wallet.put("admin", &identity()).await);
        assert_eq!(assert_ok!(wallet.get("admin").await), Some(identity()));

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("admin.id")]);
    }

    #[tokio::test]
    async fn reads_sdk_written_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("appUser.id"),
            r#"{"credentials":{"certificate":"C","privateKey":"K"},"mspId":"Org1MSP","type":"X.509","version":1}"#,
        )
        .unwrap();
        let wallet = FileSystemWallet::open(dir.path()).await.unwrap();
        let entry = wallet.get("appUser").await.unwrap().unwrap();
        assert_eq!(entry.msp_id, "Org1MSP");
        assert_eq!(entry.credentials.private_key, "K");
    }

    #[tokio::test]
    async fn corrupt_entry_is_an_identity_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("admin.id"), "garbage").unwrap();
        let wallet = FileSystemWallet::open(dir.path()).await.unwrap();
        let err = assert_err!(wallet.get("admin").await);
        assert_eq!(err.kind(), crate::error::ErrorKind::Identity);
    }

    #[tokio::test]
    async fn rejects_path_like_labels() {
        let dir = tempfile::tempdir().unwrap();
        let wallet = FileSystemWallet::open(dir.path()).await.unwrap();
        assert_err!(wallet.put("../admin", &identity()).await);
    }
}
