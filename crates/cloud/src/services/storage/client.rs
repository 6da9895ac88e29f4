//! Object Storage HTTP calls.

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{RequestBuilder, StatusCode};
use tracing::{debug, info};

use super::models::{ListBucketResult, StorageObject};
use super::ObjectStore;
use crate::client::YandexCloud;
use crate::error::CloudError;

/// Header carrying the IAM token.
const SUBJECT_TOKEN_HEADER: &str = "X-YaCloud-SubjectToken";

/// Percent-encode each path segment of an object key.
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl YandexCloud {
    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoints.storage,
            urlencoding::encode(bucket),
            encode_key(key)
        )
    }

    async fn storage_request(&self, request: RequestBuilder) -> Result<reqwest::Response, CloudError> {
        let token = self.iam_token().await?;
        Ok(request.header(SUBJECT_TOKEN_HEADER, token).send().await?)
    }

    async fn storage_error(response: reqwest::Response) -> CloudError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Self::status_error(status, text)
    }
}

#[async_trait]
impl ObjectStore for YandexCloud {
    async fn put_object(&self, object: StorageObject) -> Result<(), CloudError> {
        let url = self.object_url(&object.bucket, &object.key);
        debug!(url = %url, size = object.body.len(), "PUT object");

        let mut request = self.http().put(&url);
        if let Some(content_type) = &object.content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        if let Some(cache_control) = &object.cache_control {
            request = request.header(CACHE_CONTROL, cache_control);
        }

        let response = self.storage_request(request.body(object.body)).await?;
        if !response.status().is_success() {
            return Err(Self::storage_error(response).await);
        }

        info!(bucket = %object.bucket, key = %object.key, "Object uploaded");
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<StorageObject, CloudError> {
        let url = self.object_url(bucket, key);
        debug!(url = %url, "GET object");

        let response = self.storage_request(self.http().get(&url)).await?;
        if !response.status().is_success() {
            return Err(Self::storage_error(response).await);
        }

        let headers = response.headers().clone();
        let header = |name| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(ToString::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let cache_control = header(CACHE_CONTROL);
        let body = response.bytes().await?.to_vec();

        Ok(StorageObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body,
            content_type,
            cache_control,
        })
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, CloudError> {
        let url = format!("{}/{}", self.endpoints.storage, urlencoding::encode(bucket));
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut query = vec![("list-type", "2".to_string())];
            if let Some(token) = &continuation {
                query.push(("continuation-token", token.clone()));
            }

            debug!(url = %url, page = ?continuation, "LIST objects");
            let response = self
                .storage_request(self.http().get(&url).query(&query))
                .await?;
            if !response.status().is_success() {
                return Err(Self::storage_error(response).await);
            }

            let text = response.text().await?;
            let page: ListBucketResult = quick_xml::de::from_str(&text)?;
            keys.extend(page.contents.into_iter().map(|object| object.key));

            match page.next_continuation_token {
                Some(token) if page.is_truncated => continuation = Some(token),
                _ => break,
            }
        }

        debug!(bucket = %bucket, count = keys.len(), "Listed objects");
        Ok(keys)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), CloudError> {
        let url = self.object_url(bucket, key);
        debug!(url = %url, "DELETE object");

        let response = self.storage_request(self.http().delete(&url)).await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(Self::storage_error(response).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_segments_are_encoded() {
        assert_eq!(encode_key("css/app.css"), "css/app.css");
        assert_eq!(encode_key("docs/my file#1.txt"), "docs/my%20file%231.txt");
        assert_eq!(encode_key("d4e1/abc123.zip"), "d4e1/abc123.zip");
    }
}
