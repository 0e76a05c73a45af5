//! Stores payment-proof images on disk; the order workflow only ever sees
//! the returned reference string.

use rand::distributions::Alphanumeric;
use rand::Rng;
use shared::OrderError;
use std::path::{Path, PathBuf};
use tracing::warn;

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "png", "webp"];
const PUBLIC_PREFIX: &str = "/uploads/payments";

#[derive(Debug, Clone)]
pub struct ProofStore {
    dir: PathBuf,
    max_bytes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredProof {
    pub path: PathBuf,
    /// Public reference saved on the payment, e.g. `/uploads/payments/payment_proof-....png`.
    pub reference: String,
}

impl ProofStore {
    pub fn new(upload_root: impl AsRef<Path>, max_bytes: usize) -> Self {
        Self {
            dir: upload_root.as_ref().join("payments"),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Checks extension and mime type against the image allow-list and
    /// returns the normalized extension.
    pub fn validate(&self, file_name: &str, content_type: Option<&str>) -> Result<String, OrderError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .filter(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()));

        let mime_ok = content_type
            .and_then(|ct| ct.strip_prefix("image/"))
            .map(|subtype| ALLOWED_EXTENSIONS.contains(&subtype.to_ascii_lowercase().as_str()))
            .unwrap_or(false);

        match extension {
            Some(ext) if mime_ok => Ok(ext),
            _ => Err(OrderError::validation("Only images are allowed (jpeg, jpg, png, webp)")),
        }
    }

    pub async fn save(&self, file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> Result<StoredProof, OrderError> {
        let extension = self.validate(file_name, content_type)?;
        if bytes.is_empty() {
            return Err(OrderError::validation("Please upload a payment proof"));
        }
        if bytes.len() > self.max_bytes {
            return Err(OrderError::validation(format!(
                "Payment proof exceeds the {} byte limit",
                self.max_bytes
            )));
        }

        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect();
        let stored_name = format!(
            "payment_proof-{}-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            suffix,
            extension
        );

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| OrderError::Persistence(format!("Cannot create upload directory: {}", e)))?;
        let path = self.dir.join(&stored_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| OrderError::Persistence(format!("Cannot write payment proof: {}", e)))?;

        Ok(StoredProof {
            path,
            reference: format!("{}/{}", PUBLIC_PREFIX, stored_name),
        })
    }

    /// Removes a stored proof whose payment update did not go through.
    pub async fn discard(&self, proof: &StoredProof) {
        if let Err(e) = tokio::fs::remove_file(&proof.path).await {
            warn!("Failed to remove orphaned payment proof {}: {}", proof.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ProofStore {
        let root = std::env::temp_dir().join(format!("proof-store-{}", uuid::Uuid::new_v4()));
        ProofStore::new(root, 16)
    }

    #[test]
    fn test_validate_accepts_images() {
        let store = store();
        assert_eq!(store.validate("receipt.PNG", Some("image/png")).unwrap(), "png");
        assert_eq!(store.validate("receipt.jpg", Some("image/jpeg")).unwrap(), "jpg");
    }

    #[test]
    fn test_validate_rejects_other_files() {
        let store = store();
        assert!(store.validate("receipt.pdf", Some("application/pdf")).is_err());
        assert!(store.validate("receipt.png", Some("text/plain")).is_err());
        assert!(store.validate("receipt", Some("image/png")).is_err());
        assert!(store.validate("receipt.png", None).is_err());
    }

    #[tokio::test]
    async fn test_save_and_discard() {
        let store = store();
        let stored = store.save("proof.webp", Some("image/webp"), b"RIFF....WEBP").await.unwrap();

        assert!(stored.reference.starts_with("/uploads/payments/payment_proof-"));
        assert!(stored.reference.ends_with(".webp"));
        assert_eq!(tokio::fs::read(&stored.path).await.unwrap(), b"RIFF....WEBP");

        store.discard(&stored).await;
        assert!(tokio::fs::metadata(&stored.path).await.is_err());
    }

    #[tokio::test]
    async fn test_save_rejects_oversized_and_empty() {
        let store = store();
        let err = store.save("proof.png", Some("image/png"), &[0u8; 17]).await.unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));

        let err = store.save("proof.png", Some("image/png"), &[]).await.unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }
}
