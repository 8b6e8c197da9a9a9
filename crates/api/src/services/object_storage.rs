//! Storage for inspiration images.
//!
//! [`HostedStorage`] uploads to the managed storage API; [`LocalStorage`]
//! writes under `UPLOAD_DIR`, which the router serves at `/uploads`.

use std::path::PathBuf;

use async_trait::async_trait;
use url::Url;
use wedflex_core::types::EntityId;
use wedflex_hosted::HostedClient;

use crate::middleware::auth::CurrentIdentity;

/// Public bucket for wedding inspiration images.
pub const INSPIRATION_BUCKET: &str = "wedding_inspo";

/// URL prefix under which [`LocalStorage`] objects are served.
pub const LOCAL_UPLOADS_PREFIX: &str = "/uploads";

const MAX_EXTENSION_LEN: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Only image uploads are accepted (got '{0}')")]
    NotAnImage(String),

    #[error("File is larger than the {max_bytes} byte limit")]
    TooLarge { max_bytes: usize },

    /// The storage service refused or failed; message shown verbatim.
    #[error("{0}")]
    Remote(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One object to store.
#[derive(Debug, Clone)]
pub struct UploadObject {
    pub bucket: &'static str,
    /// Object path inside the bucket, e.g. `<owner>/<uuid>.png`.
    pub path: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadObject {
    /// Check an uploaded inspiration image and give it a fresh object path.
    pub fn inspiration(
        owner: Option<EntityId>,
        file_name: Option<&str>,
        content_type: &str,
        bytes: Vec<u8>,
        max_bytes: usize,
    ) -> Result<Self, StorageError> {
        let content_type = content_type.trim().to_ascii_lowercase();
        let Some(subtype) = content_type.strip_prefix("image/") else {
            return Err(StorageError::NotAnImage(content_type));
        };
        if bytes.len() > max_bytes {
            return Err(StorageError::TooLarge { max_bytes });
        }

        let extension = file_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| {
                !ext.is_empty()
                    && ext.len() <= MAX_EXTENSION_LEN
                    && ext.chars().all(|c| c.is_ascii_alphanumeric())
            })
            .unwrap_or_else(|| subtype.split('+').next().unwrap_or(subtype).to_string());

        let folder = owner.map_or_else(|| "anonymous".to_string(), |id| id.to_string());
        Ok(Self {
            bucket: INSPIRATION_BUCKET,
            path: format!("{folder}/{}.{extension}", EntityId::new_v4()),
            content_type,
            bytes,
        })
    }
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store the object and return its public URL.
    async fn upload(
        &self,
        caller: Option<&CurrentIdentity>,
        object: UploadObject,
    ) -> Result<String, StorageError>;
}

// ---------------------------------------------------------------------------
// Hosted
// ---------------------------------------------------------------------------

pub struct HostedStorage {
    client: HostedClient,
}

impl HostedStorage {
    pub fn new(client: HostedClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStorage for HostedStorage {
    async fn upload(
        &self,
        caller: Option<&CurrentIdentity>,
        object: UploadObject,
    ) -> Result<String, StorageError> {
        let credential = match caller {
            Some(caller) => caller.credential.as_str().to_string(),
            None => self.client.anon_credential(),
        };
        self.client
            .upload_object(
                &credential,
                object.bucket,
                &object.path,
                &object.content_type,
                object.bytes,
            )
            .await
            .map_err(|e| StorageError::Remote(e.user_message()))?;
        Ok(self.client.public_object_url(object.bucket, &object.path))
    }
}

// ---------------------------------------------------------------------------
// Local directory
// ---------------------------------------------------------------------------

pub struct LocalStorage {
    root: PathBuf,
    public_origin: Url,
}

impl LocalStorage {
    pub fn new(root: PathBuf, public_origin: Url) -> Self {
        Self {
            root,
            public_origin,
        }
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}{LOCAL_UPLOADS_PREFIX}/{bucket}/{path}",
            self.public_origin.as_str().trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(
        &self,
        _caller: Option<&CurrentIdentity>,
        object: UploadObject,
    ) -> Result<String, StorageError> {
        let target = self.root.join(object.bucket).join(&object.path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &object.bytes).await?;
        tracing::debug!(path = %target.display(), bytes = object.bytes.len(), "Upload stored");
        Ok(self.public_url(object.bucket, &object.path))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn only_images_within_limit_are_accepted() {
        assert_matches!(
            UploadObject::inspiration(None, Some("notes.pdf"), "application/pdf", vec![1], 10),
            Err(StorageError::NotAnImage(_))
        );
        assert_matches!(
            UploadObject::inspiration(None, Some("a.png"), "image/png", vec![0; 11], 10),
            Err(StorageError::TooLarge { max_bytes: 10 })
        );
    }

    #[test]
    fn object_path_is_owner_scoped_with_extension() {
        let owner = EntityId::new_v4();
        let object =
            UploadObject::inspiration(Some(owner), Some("Arch.JPG"), "image/jpeg", vec![1], 10)
                .unwrap();
        assert_eq!(object.bucket, INSPIRATION_BUCKET);
        assert!(object.path.starts_with(&format!("{owner}/")));
        assert!(object.path.ends_with(".jpg"));

        let svg = UploadObject::inspiration(None, None, "image/svg+xml", vec![1], 10).unwrap();
        assert!(svg.path.starts_with("anonymous/"));
        assert!(svg.path.ends_with(".svg"));
    }

    #[tokio::test]
    async fn local_storage_writes_file_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(
            dir.path().to_path_buf(),
            Url::parse("http://localhost:3000").unwrap(),
        );
        let object = UploadObject::inspiration(None, Some("a.png"), "image/png", vec![7; 4], 10)
            .unwrap();
        let path = object.path.clone();

        let url = storage.upload(None, object).await.unwrap();
        assert_eq!(
            url,
            format!("http://localhost:3000/uploads/{INSPIRATION_BUCKET}/{path}")
        );
        let written = std::fs::read(dir.path().join(INSPIRATION_BUCKET).join(&path)).unwrap();
        assert_eq!(written, vec![7; 4]);
    }
}
