//! Upload a directory tree to an Object Storage bucket.

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::Args;
use tracing::info;
use yc_cloud::{ObjectStore, StorageObject, YandexCloud};

use crate::inputs::{optional, required, CacheControl};
use crate::sources::{SourceFile, SourceSelector};
use crate::workflow::{group, RunnerContext};

/// Inputs of the upload action.
#[derive(Args, Debug, Clone, Default)]
pub struct UploadArgs {
    /// Target bucket.
    #[arg(long, env = "BUCKET")]
    pub bucket: Option<String>,

    /// Directory to upload, relative to the workspace.
    #[arg(long, env = "ROOT")]
    pub root: Option<String>,

    /// Key prefix of uploaded objects.
    #[arg(long, env = "PREFIX")]
    pub prefix: Option<String>,

    /// Globs of files to upload, relative to the root.
    #[arg(long, env = "INCLUDE", value_delimiter = '\n', default_value = ".")]
    pub include: Vec<String>,

    /// Globs of files to leave out.
    #[arg(long, env = "EXCLUDE", value_delimiter = '\n')]
    pub exclude: Vec<String>,

    /// Delete every object of the bucket first.
    #[arg(long, env = "CLEAR", value_parser = BoolishValueParser::new())]
    pub clear: bool,

    /// `pattern: value` lines; `*` sets the default.
    #[arg(long, env = "CACHE_CONTROL", value_delimiter = '\n')]
    pub cache_control: Vec<String>,
}

/// What an upload did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    /// Objects deleted by `CLEAR`.
    pub deleted: usize,
    /// Keys of uploaded objects.
    pub uploaded: Vec<String>,
}

/// Object key for a file: `<prefix>/<relative path>`.
#[must_use]
pub fn object_key(prefix: Option<&str>, file_key: &str) -> String {
    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix}/{file_key}"),
        None => file_key.to_string(),
    }
}

/// Upload to the bucket with the authenticated client.
///
/// # Errors
///
/// Returns error on invalid inputs, unreadable files or storage errors.
pub async fn run(cloud: &YandexCloud, ctx: &RunnerContext, args: &UploadArgs) -> Result<UploadSummary> {
    upload(cloud, ctx, args).await
}

/// Upload the selected files to `store`.
///
/// # Errors
///
/// Returns error on invalid inputs, unreadable files or storage errors.
pub async fn upload(store: &dyn ObjectStore, ctx: &RunnerContext, args: &UploadArgs) -> Result<UploadSummary> {
    let bucket = required(args.bucket.as_ref(), "BUCKET")?;
    let root = required(args.root.as_ref(), "ROOT")?;
    let prefix = optional(args.prefix.as_ref());
    let cache_control = CacheControl::parse(&args.cache_control);

    let mut summary = UploadSummary::default();

    if args.clear {
        let _group = group("Clear bucket");
        summary.deleted = clear_bucket(store, bucket)
            .await
            .context("Failed to clear bucket")?;
    }

    let _group = group("Upload");
    let files = SourceSelector::new(ctx.resolve(root))
        .include(&args.include)
        .exclude(&args.exclude)?
        .select()?;
    info!(bucket = %bucket, files = files.len(), "Upload start");

    for file in &files {
        let key = object_key(prefix, &file.key);
        store
            .put_object(storage_object(bucket, &key, file, &cache_control)?)
            .await
            .with_context(|| format!("Failed to upload object {key}"))?;
        summary.uploaded.push(key);
    }

    info!(bucket = %bucket, uploaded = summary.uploaded.len(), "Upload complete");
    Ok(summary)
}

fn storage_object(
    bucket: &str,
    key: &str,
    file: &SourceFile,
    cache_control: &CacheControl,
) -> Result<StorageObject> {
    let body = std::fs::read(&file.path)
        .with_context(|| format!("failed to read {}", file.path.display()))?;
    info!(file = %file.path.display(), bucket = %bucket, key = %key, "Uploading");

    let mut object = StorageObject::new(bucket, key, body);
    if let Some(mime) = mime_guess::from_path(key).first() {
        object = object.with_content_type(mime.essence_str());
    }
    if let Some(value) = cache_control.value_for(key) {
        object = object.with_cache_control(value);
    }
    Ok(object)
}

async fn clear_bucket(store: &dyn ObjectStore, bucket: &str) -> Result<usize> {
    info!(bucket = %bucket, "Clearing bucket");
    let keys = store.list_objects(bucket).await?;
    for key in &keys {
        store.delete_object(bucket, key).await?;
    }
    info!(bucket = %bucket, deleted = keys.len(), "Bucket cleared");
    Ok(keys.len())
}
