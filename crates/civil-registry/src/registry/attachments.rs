use mime::Mime;
use uuid::Uuid;

pub const ATTACHMENT_FOLDER: &str = "attachments";

const DOC: &str = "application/msword";
const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Raw file handed over by the upload endpoint.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub description: String,
    pub bytes: Vec<u8>,
}

/// Upload that passed validation, with its storage name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    pub content_type: Mime,
    pub stored_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttachmentError {
    #[error("no file provided")]
    Empty,
    #[error("file too large: {size} bytes, maximum {max} bytes")]
    TooLarge { size: u64, max: u64 },
    #[error("file type not allowed: '{0}'")]
    DisallowedType(String),
    #[error("file content does not match the .{0} extension")]
    ContentMismatch(String),
}

fn allowed(content_type: &Mime) -> bool {
    *content_type == mime::IMAGE_JPEG
        || *content_type == mime::IMAGE_PNG
        || *content_type == mime::IMAGE_GIF
        || *content_type == mime::APPLICATION_PDF
        || matches!(content_type.essence_str(), DOC | DOCX)
}

/// Leading bytes expected for each accepted extension.
fn signature_matches(extension: &str, bytes: &[u8]) -> bool {
    match extension {
        "pdf" => bytes.starts_with(b"%PDF"),
        "png" => bytes.starts_with(&[0x89, b'P', b'N', b'G']),
        "jpg" | "jpeg" => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        "gif" => bytes.starts_with(b"GIF8"),
        "doc" => bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]),
        "docx" => bytes.starts_with(b"PK\x03\x04"),
        _ => false,
    }
}

/// Check size, extension and content, and pick a random storage name.
pub fn validate(upload: &AttachmentUpload, max_bytes: u64) -> Result<ValidatedUpload, AttachmentError> {
    let size = upload.bytes.len() as u64;
    if size == 0 {
        return Err(AttachmentError::Empty);
    }
    if size > max_bytes {
        return Err(AttachmentError::TooLarge {
            size,
            max: max_bytes,
        });
    }

    let extension = std::path::Path::new(upload.file_name.trim())
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| AttachmentError::DisallowedType(upload.file_name.clone()))?;

    let content_type = mime_guess::from_ext(&extension)
        .iter()
        .find(allowed)
        .ok_or_else(|| AttachmentError::DisallowedType(extension.clone()))?;

    if !signature_matches(&extension, &upload.bytes) {
        return Err(AttachmentError::ContentMismatch(extension));
    }

    Ok(ValidatedUpload {
        content_type,
        stored_name: format!("{}.{extension}", Uuid::new_v4().simple()),
    })
}
