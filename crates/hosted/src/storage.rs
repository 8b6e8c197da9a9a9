//! Object storage for inspiration images.

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;

use crate::client::{HostedClient, HostedError};

impl HostedClient {
    /// `POST /storage/v1/object/{bucket}/{path}`.
    ///
    /// Never overwrites; uploading to an existing path is an error.
    pub async fn upload_object(
        &self,
        credential: &str,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), HostedError> {
        let response = self
            .as_caller(
                Method::POST,
                &format!("/storage/v1/object/{bucket}/{path}"),
                credential,
            )
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// Public URL of an object in a public bucket.
    pub fn public_object_url(&self, bucket: &str, path: &str) -> String {
        self.url(&format!("/storage/v1/object/public/{bucket}/{path}"))
    }
}

#[cfg(test)]
mod tests {
    use crate::HostedClient;

    #[test]
    fn public_url_points_at_public_bucket_path() {
        let client = HostedClient::new("https://proj.example", "anon");
        assert_eq!(
            client.public_object_url("wedding_inspo", "u1/abc.png"),
            "https://proj.example/storage/v1/object/public/wedding_inspo/u1/abc.png"
        );
    }
}
