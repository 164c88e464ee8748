use crate::models::video::VideoFile;

/// Largest video accepted for upload: 100 MiB.
pub const MAX_VIDEO_BYTES: u64 = 100 * 1024 * 1024;

/// Required prefix of the declared MIME type.
const VIDEO_MIME_PREFIX: &str = "video/";

/// Pre-flight checks run before any network activity.
///
/// The type check runs first, so an oversized non-video file reports
/// `InvalidType`.
pub fn validate(file: &VideoFile) -> Result<(), ValidationError> {
    check(&file.mime_type, file.size())
}

/// [`validate`] on a declared type and size, for callers that have not read
/// the payload yet.
pub fn check(mime_type: &str, size: u64) -> Result<(), ValidationError> {
    if !is_video_type(mime_type) {
        return Err(ValidationError::InvalidType {
            mime_type: mime_type.to_string(),
        });
    }

    if size > MAX_VIDEO_BYTES {
        return Err(ValidationError::TooLarge { size });
    }

    Ok(())
}

/// `video/<subtype>` with an RFC 6838 subtype and optional `;key=value`
/// parameters. Anything looser would be refused when building the upload.
fn is_video_type(mime_type: &str) -> bool {
    let Some(rest) = mime_type.strip_prefix(VIDEO_MIME_PREFIX) else {
        return false;
    };

    let (subtype, params) = match rest.split_once(';') {
        Some((subtype, params)) => (subtype, Some(params)),
        None => (rest, None),
    };
    if !is_token(subtype) {
        return false;
    }

    params.map_or(true, |params| {
        params.split(';').all(|param| match param.trim().split_once('=') {
            Some((key, value)) => is_token(key) && (is_token(value) || is_quoted(value)),
            None => false,
        })
    })
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
}

fn is_quoted(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('"') && s.ends_with('"') && !s[1..s.len() - 1].contains('"')
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please select a valid video file")]
    InvalidType { mime_type: String },

    #[error("File size exceeds 100MB limit")]
    TooLarge { size: u64 },
}
