use std::path::{Component, Path, PathBuf};

use crate::{ChatError, ChatResult};

/// Where uploaded files live. A reference is the file's relative path; the
/// HTTP layer serves `root` under `url_prefix`.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
    url_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef(String);

impl BlobRef {
    pub fn path(&self) -> &str {
        &self.0
    }
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        BlobStore {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_owned(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn upload(&self, path: &str, bytes: &[u8]) -> ChatResult<BlobRef> {
        let relative = Path::new(path);
        let plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if path.is_empty() || !plain {
            return Err(ChatError::validation(format!("bad upload path {path:?}")));
        }

        let target = self.root.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        log::debug!("stored {} bytes at {}", bytes.len(), target.display());
        Ok(BlobRef(path.to_owned()))
    }

    pub fn url(&self, blob: &BlobRef) -> String {
        format!("{}/{}", self.url_prefix, blob.0)
    }
}

/// Keep only characters that are safe in both a path segment and a URL.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let clean: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let clean = clean.trim_start_matches('.');

    if clean.is_empty() { "upload".to_owned() } else { clean.to_owned() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = BlobStore::new(dir.path(), "/blobs/");

        let blob = blobs.upload("chat_images/u1_u2/1_cat.png", b"png").await.unwrap();

        assert_eq!(blobs.url(&blob), "/blobs/chat_images/u1_u2/1_cat.png");
        let stored = tokio::fs::read(dir.path().join("chat_images/u1_u2/1_cat.png")).await.unwrap();
        assert_eq!(stored, b"png");
    }

    #[tokio::test]
    async fn refuses_paths_outside_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = BlobStore::new(dir.path(), "/blobs");

        for path in ["../escape.png", "/etc/passwd", "a/../../b", ""] {
            let err = blobs.upload(path, b"x").await.unwrap_err();
            assert!(matches!(err, ChatError::Validation(_)), "{path}");
        }
    }

    #[test]
    fn sanitizes_file_names() {
        assert_eq!(sanitize_file_name("cat.png"), "cat.png");
        assert_eq!(sanitize_file_name("my cat (1).png"), "my_cat__1_.png");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\dog.jpg"), "dog.jpg");
        assert_eq!(sanitize_file_name("../../.hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "upload");
    }
}
