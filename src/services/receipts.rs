use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::core::config::Settings;

/// Object storage for bank-transfer receipts. Absent credentials disable the
/// service and receipt upload endpoints report it as unavailable.
#[derive(Debug, Clone)]
pub(crate) struct ReceiptStorage {
    client: Client,
    bucket: String,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredReceipt {
    pub(crate) key: String,
    pub(crate) size: i64,
    pub(crate) sha256: String,
}

impl ReceiptStorage {
    pub(crate) async fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        if settings.s3().access_key.is_empty() || settings.s3().secret_key.is_empty() {
            return Ok(None);
        }

        let creds = Credentials::new(
            settings.s3().access_key.clone(),
            settings.s3().secret_key.clone(),
            None,
            None,
            "ikhtibar-static",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(settings.s3().endpoint.clone())
            .region(aws_config::Region::new(settings.s3().region.clone()))
            .credentials_provider(creds)
            .load()
            .await;

        let client = Client::new(&config);

        Ok(Some(Self { client, bucket: settings.s3().bucket.clone() }))
    }

    pub(crate) async fn upload_receipt(
        &self,
        order_id: &str,
        extension: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> anyhow::Result<StoredReceipt> {
        let size = bytes.len() as i64;
        let hash = Sha256::digest(&bytes);
        let sha256 = hex::encode(hash);
        let key = format!("receipts/{order_id}/{}.{extension}", &sha256[..16]);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await?;

        Ok(StoredReceipt { key, size, sha256 })
    }

    pub(crate) async fn presign_get(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> anyhow::Result<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(PresigningConfig::expires_in(expires_in)?)
            .await?;

        Ok(presigned.uri().to_string())
    }
}

/// Lowercased file extension when the settings allow it.
pub(crate) fn allowed_extension(filename: &str, settings: &Settings) -> Option<String> {
    let extension = filename.rsplit_once('.')?.1.to_lowercase();
    if settings.uploads().allowed_receipt_extensions.iter().any(|item| item == &extension) {
        Some(extension)
    } else {
        None
    }
}

pub(crate) fn within_size_limit(size_bytes: usize, settings: &Settings) -> bool {
    size_bytes as u64 <= settings.uploads().max_receipt_size_mb * 1024 * 1024
}

pub(crate) fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Settings;

    fn settings() -> Settings {
        let _guard = crate::test_support::env_lock();
        std::env::set_var("SECRET_KEY", "test-secret");
        std::env::remove_var("ALLOWED_RECEIPT_EXTENSIONS");
        std::env::remove_var("MAX_RECEIPT_SIZE_MB");
        Settings::load().expect("settings")
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let settings = settings();
        assert_eq!(allowed_extension("receipt.PNG", &settings).as_deref(), Some("png"));
        assert_eq!(allowed_extension("receipt.pdf", &settings).as_deref(), Some("pdf"));
        assert!(allowed_extension("receipt.exe", &settings).is_none());
        assert!(allowed_extension("no-extension", &settings).is_none());
    }

    #[test]
    fn size_limit_uses_megabytes() {
        let settings = settings();
        assert!(within_size_limit(1024, &settings));
        assert!(within_size_limit(10 * 1024 * 1024, &settings));
        assert!(!within_size_limit(10 * 1024 * 1024 + 1, &settings));
    }

    #[test]
    fn content_types_cover_allowed_extensions() {
        assert_eq!(content_type_for("jpg"), "image/jpeg");
        assert_eq!(content_type_for("pdf"), "application/pdf");
        assert_eq!(content_type_for("zzz"), "application/octet-stream");
    }
}
