//! Object Storage models.

use serde::Deserialize;

/// Object to upload or a downloaded object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageObject {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Content.
    pub body: Vec<u8>,
    /// `Content-Type` header.
    pub content_type: Option<String>,
    /// `Cache-Control` header.
    pub cache_control: Option<String>,
}

impl StorageObject {
    /// Object with content and no extra headers.
    #[must_use]
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            body,
            content_type: None,
            cache_control: None,
        }
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the cache control header.
    #[must_use]
    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }
}

/// `ListObjectsV2` result page.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListBucketResult {
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(default)]
    pub next_continuation_token: Option<String>,
    #[serde(default)]
    pub contents: Vec<ObjectSummary>,
}

/// Entry of a listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ObjectSummary {
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_bucket_result_from_xml() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>site</Name>
  <KeyCount>2</KeyCount>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>page-2</NextContinuationToken>
  <Contents><Key>index.html</Key><Size>10</Size></Contents>
  <Contents><Key>css/app.css</Key><Size>20</Size></Contents>
</ListBucketResult>"#;

        let page: ListBucketResult = quick_xml::de::from_str(xml).unwrap();
        assert!(page.is_truncated);
        assert_eq!(page.next_continuation_token.as_deref(), Some("page-2"));
        let keys: Vec<_> = page.contents.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["index.html", "css/app.css"]);
    }

    #[test]
    fn test_empty_bucket_listing() {
        let xml = "<ListBucketResult><Name>site</Name><IsTruncated>false</IsTruncated></ListBucketResult>";
        let page: ListBucketResult = quick_xml::de::from_str(xml).unwrap();
        assert!(page.contents.is_empty());
        assert!(!page.is_truncated);
    }
}
