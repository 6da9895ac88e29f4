use yc_cloud::containers::StorageMount;

use super::non_empty_lines;
use crate::error::InputError;

/// Parse `bucket[/prefix]:mount_path[:mode]`.
///
/// The mode defaults to read-only; accepted spellings are `read-only`,
/// `ro`, `readonly`, `read_only` and `read-write`, `rw`, `readwrite`,
/// `read_write` in any case.
///
/// # Errors
///
/// Returns [`InputError::StorageMount`] for malformed specs.
pub fn parse_storage_mount(input: &str) -> Result<StorageMount, InputError> {
    let broken = |reason| InputError::StorageMount {
        input: input.to_string(),
        reason,
    };

    let parts: Vec<&str> = input.split(':').map(str::trim).collect();
    if !(2..=3).contains(&parts.len()) {
        return Err(broken("has wrong format"));
    }

    let (s3_path, mount_point_path) = (parts[0], parts[1]);
    if s3_path.is_empty() {
        return Err(broken("has empty S3 path"));
    }
    if mount_point_path.is_empty() {
        return Err(broken("has empty mount path"));
    }

    let (bucket_id, prefix) = s3_path.split_once('/').unwrap_or((s3_path, ""));

    let read_only = match parts.get(2).map(|mode| mode.to_lowercase()).as_deref() {
        None | Some("" | "read-only" | "ro" | "readonly" | "read_only") => true,
        Some("read-write" | "rw" | "readwrite" | "read_write") => false,
        Some(_) => return Err(broken("has invalid access mode")),
    };

    Ok(StorageMount {
        bucket_id: bucket_id.to_string(),
        prefix: prefix.to_string(),
        mount_point_path: mount_point_path.to_string(),
        read_only,
    })
}

/// Parse storage mounts, one per line. Empty lines are skipped.
///
/// # Errors
///
/// Fails on the first malformed mount.
pub fn parse_storage_mounts(lines: &[String]) -> Result<Vec<StorageMount>, InputError> {
    non_empty_lines(lines).map(parse_storage_mount).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount(bucket: &str, prefix: &str, path: &str, read_only: bool) -> StorageMount {
        StorageMount {
            bucket_id: bucket.into(),
            prefix: prefix.into(),
            mount_point_path: path.into(),
            read_only,
        }
    }

    #[test]
    fn test_parse_storage_mounts() {
        let lines = vec![
            "bucket1/folder:mountpoint1".to_string(),
            String::new(),
            "bucket2:/mountpoint2:read-only".to_string(),
            "bucket3 : /mountpoint3 : RW".to_string(),
            "bucket4/a/b/c:/data:".to_string(),
        ];

        assert_eq!(
            parse_storage_mounts(&lines).unwrap(),
            vec![
                mount("bucket1", "folder", "mountpoint1", true),
                mount("bucket2", "", "/mountpoint2", true),
                mount("bucket3", "", "/mountpoint3", false),
                mount("bucket4", "a/b/c", "/data", true),
            ]
        );
    }

    #[test]
    fn test_parse_storage_mounts_empty_input() {
        assert!(parse_storage_mounts(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_parse_storage_mount_errors() {
        let cases = [
            ("bucket1:mountpoint1:read-only:extra", "has wrong format"),
            ("bucket1", "has wrong format"),
            (":mountpoint1", "has empty S3 path"),
            ("bucket1:", "has empty mount path"),
            ("bucket1:/data:append", "has invalid access mode"),
        ];

        for (input, reason) in cases {
            assert_eq!(
                parse_storage_mount(input).unwrap_err(),
                InputError::StorageMount {
                    input: input.to_string(),
                    reason,
                },
                "{input}"
            );
        }
    }
}
