//! Snapshot image format and on-disk replacement
//!
//! A snapshot is a flat JSON object mapping every key to its string value,
//! pretty printed and sorted by key so that two saves of the same mapping
//! produce byte-identical files.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Errors raised while saving or loading a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot file could not be read or written
    #[error("snapshot I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The snapshot file exists but is not a flat object of strings
    #[error("malformed snapshot {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The in-memory mapping could not be serialized
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Serialize entries into a snapshot image
pub fn encode_snapshot<'a, I>(entries: I) -> Result<Vec<u8>, serde_json::Error>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let sorted: BTreeMap<&str, &str> = entries
        .into_iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let mut image = serde_json::to_vec_pretty(&sorted)?;
    image.push(b'\n');
    Ok(image)
}

/// Parse a snapshot image into a staging map
///
/// Anything other than a JSON object whose values are all strings is rejected.
pub fn decode_snapshot(data: &[u8]) -> Result<HashMap<String, String>, serde_json::Error> {
    serde_json::from_slice(data)
}

/// Replace `path` with `image`
///
/// The image goes to a sibling `.tmp` file that is synced and then renamed
/// over the destination, so readers never see a half-written snapshot.
pub(crate) async fn write_atomic(path: &Path, image: &[u8]) -> Result<(), SnapshotError> {
    let tmp = temp_path(path);

    let result = async {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(image).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, path).await
    }
    .await;

    if let Err(source) = result {
        // Best effort, the temporary may not even exist
        let _ = fs::remove_file(&tmp).await;
        return Err(SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    Ok(())
}

/// Read a snapshot file, `None` if it does not exist
pub(crate) async fn read_image(path: &Path) -> Result<Option<Vec<u8>>, SnapshotError> {
    match fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
