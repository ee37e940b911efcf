use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Key prefix for every stored object; also the route the objects are served under.
pub const OBJECT_PREFIX: &str = "uploads";

const MAX_NAME_LEN: usize = 100;

// Same-millisecond uploads of the same name get a counter suffix.
const MAX_NAME_ATTEMPTS: u32 = 64;

/// Flat on-disk object store for uploaded images.
///
/// An object with key `uploads/{name}` lives at `{dir}/{name}` and is
/// publicly reachable at `{public_base}/uploads/{name}`.
pub struct ObjectStore {
    dir: PathBuf,
    public_base: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

impl ObjectStore {
    pub async fn new(dir: PathBuf, public_base: &str) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload directory: {}", dir.display());
        Ok(Self {
            dir,
            public_base: public_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `data` under a fresh time-prefixed key and return its public URL.
    /// Never replaces an existing object.
    pub async fn put(&self, original_name: &str, data: &[u8]) -> Result<StoredObject> {
        let millis = chrono::Utc::now().timestamp_millis();
        let base = sanitize(original_name);

        let mut attempt = 0;
        let (name, mut file) = loop {
            let name = object_name(millis, attempt, &base);
            let opened = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.dir.join(&name))
                .await;
            match opened {
                Ok(file) => break (name, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS => {
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };
        file.write_all(data).await?;
        file.flush().await?;

        let key = format!("{}/{}", OBJECT_PREFIX, name);
        let url = format!("{}/{}", self.public_base, key);
        debug!("Stored {} ({} bytes)", key, data.len());
        Ok(StoredObject { key, url })
    }
}

fn object_name(millis: i64, attempt: u32, safe_name: &str) -> String {
    if attempt == 0 {
        format!("{}-{}", millis, safe_name)
    } else {
        format!("{}-{}-{}", millis, attempt, safe_name)
    }
}

/// Reduce a client-supplied file name to a safe single path segment.
pub fn sanitize(name: &str) -> String {
    // Browsers on Windows may send the full path
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize("leaf spot.png"), "leaf_spot.png");
        assert_eq!(sanitize("../../etc/passwd"), "passwd");
        assert_eq!(sanitize("C:\\Users\\me\\tomato.JPG"), "tomato.JPG");
        assert_eq!(sanitize("..."), "image");
        assert_eq!(sanitize(""), "image");
        assert_eq!(sanitize(&"a".repeat(300)).len(), MAX_NAME_LEN);
    }

    #[test]
    fn object_name_is_time_prefixed() {
        assert_eq!(object_name(1700000000000, 0, "rot.png"), "1700000000000-rot.png");
        assert_eq!(object_name(1700000000000, 2, "rot.png"), "1700000000000-2-rot.png");
    }

    #[tokio::test]
    async fn put_writes_file_and_builds_public_url() {
        let dir = std::env::temp_dir().join(format!("leafcare-store-{}", uuid::Uuid::new_v4()));
        let store = ObjectStore::new(dir.clone(), "http://localhost:3000/").await.unwrap();

        let obj = store.put("my leaf.png", b"png-bytes").await.unwrap();
        assert!(obj.key.starts_with("uploads/"));
        assert!(obj.key.ends_with("-my_leaf.png"));
        assert_eq!(obj.url, format!("http://localhost:3000/{}", obj.key));

        let name = obj.key.trim_start_matches("uploads/");
        assert_eq!(std::fs::read(dir.join(name)).unwrap(), b"png-bytes");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn same_name_uploads_never_overwrite() {
        let dir = std::env::temp_dir().join(format!("leafcare-store-{}", uuid::Uuid::new_v4()));
        let store = ObjectStore::new(dir.clone(), "http://localhost:3000").await.unwrap();

        let first = store.put("leaf.png", b"alice").await.unwrap();
        let second = store.put("leaf.png", b"bob").await.unwrap();
        assert_ne!(first.key, second.key);

        let read = |key: &str| std::fs::read(dir.join(key.trim_start_matches("uploads/"))).unwrap();
        assert_eq!(read(&first.key), b"alice");
        assert_eq!(read(&second.key), b"bob");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn put_skips_names_already_on_disk() {
        let dir = std::env::temp_dir().join(format!("leafcare-store-{}", uuid::Uuid::new_v4()));
        let store = ObjectStore::new(dir.clone(), "http://localhost:3000").await.unwrap();

        // Pre-create the plain name for a window of milliseconds so the put
        // has to step past it.
        let now = chrono::Utc::now().timestamp_millis();
        for millis in now..now + 2000 {
            std::fs::write(dir.join(object_name(millis, 0, "leaf.png")), b"alice").unwrap();
        }

        let obj = store.put("leaf.png", b"bob").await.unwrap();
        let name = obj.key.trim_start_matches("uploads/");
        assert!(name.ends_with("-1-leaf.png"), "unexpected name {name}");
        assert_eq!(std::fs::read(dir.join(name)).unwrap(), b"bob");
        let plain = name.replace("-1-leaf.png", "-leaf.png");
        assert_eq!(std::fs::read(dir.join(plain)).unwrap(), b"alice");

        let _ = std::fs::remove_dir_all(dir);
    }
}
