use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncReadExt;

use crate::services::validation::{self, ValidationError, MAX_VIDEO_BYTES};

/// Fallback MIME type when neither the content nor the extension identify the file.
const UNKNOWN_MIME: &str = "application/octet-stream";

/// Leading bytes read to sniff the content type.
const SNIFF_BYTES: u64 = 8 * 1024;

/// A candidate video selected by the user.
///
/// The payload is reference counted so the upload body can be streamed in
/// chunks without copying the whole file up front.
#[derive(Debug, Clone)]
pub struct VideoFile {
    pub name: String,
    pub mime_type: String,
    data: Arc<[u8]>,
}

impl VideoFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: Arc::from(data),
        }
    }

    /// Read a file from disk, sniffing its MIME type from the content and
    /// falling back to the extension.
    ///
    /// The type and the on-disk size are checked before the payload is
    /// read, so an oversized or non-video file is never loaded.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let mut file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());

        let mut data = Vec::new();
        (&mut file).take(SNIFF_BYTES).read_to_end(&mut data).await?;

        let mime_type = infer::get(&data)
            .map(|kind| kind.mime_type().to_string())
            .or_else(|| mime_from_extension(path).map(str::to_string))
            .unwrap_or_else(|| UNKNOWN_MIME.to_string());

        validation::check(&mime_type, size)?;

        // The file may grow between the metadata call and the read
        data.reserve(size.saturating_sub(data.len() as u64) as usize);
        let remaining = MAX_VIDEO_BYTES + 1 - data.len() as u64;
        file.take(remaining).read_to_end(&mut data).await?;
        validation::check(&mime_type, data.len() as u64)?;

        tracing::debug!(file = %name, mime_type = %mime_type, size = data.len(), "Loaded video file");

        Ok(Self::new(name, mime_type, data))
    }

    /// Size of the payload in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn shared_data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read video file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Rejected(#[from] ValidationError),
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "wmv" => "video/x-ms-wmv",
        "webm" => "video/webm",
        _ => return None,
    };
    Some(mime)
}
