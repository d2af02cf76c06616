use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;

use super::domain::ReferenceNumber;

const MIN_DIMENSION: u32 = 240;

/// PNG image of a reference number, named for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("reference could not be encoded as a QR symbol: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("QR image could not be written as PNG: {0}")]
    Render(#[from] image::ImageError),
}

/// Encode the reference into a QR code PNG. Same input, same bytes.
pub fn encode(reference: &ReferenceNumber) -> Result<QrArtifact, QrError> {
    let code = QrCode::new(reference.as_str().as_bytes())?;
    let symbol = code
        .render::<Luma<u8>>()
        .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
        .build();

    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(symbol).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;

    Ok(QrArtifact {
        file_name: format!("{}.png", reference.as_str()),
        bytes,
    })
}
