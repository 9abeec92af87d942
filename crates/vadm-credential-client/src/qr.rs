//! QR rendering for credential documents.
//!
//! Credentials are handed to scanning apps as QR codes. Rendering matches
//! the established wire format: low error correction (verifier credentials
//! are large), 2x2 pixels per module, a standard 4-module quiet zone.

use image::{GrayImage, Luma};
use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode};

/// Pixels per QR module.
const MODULE_SCALE: u32 = 2;

/// Quiet-zone width in modules on each side.
const QUIET_ZONE: u32 = 4;

/// Errors from QR rendering.
#[derive(Debug, thiserror::Error)]
pub enum QrRenderError {
    /// The payload does not fit in any QR version at the required error
    /// correction level.
    #[error("QR encoding failed: {0}")]
    Encode(#[from] QrError),
    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Png(#[from] image::ImageError),
}

/// Render a credential document (serialized JSON) as a PNG QR image.
pub fn credential_qr_png(credential_json: &str) -> Result<Vec<u8>, QrRenderError> {
    let code = QrCode::with_error_correction_level(credential_json.as_bytes(), EcLevel::L)?;
    let width = code.width() as u32;
    let dim = (width + 2 * QUIET_ZONE) * MODULE_SCALE;

    let mut img = GrayImage::from_pixel(dim, dim, Luma([255u8]));
    for y in 0..width {
        for x in 0..width {
            if code[(x as usize, y as usize)] == Color::Dark {
                let px = (x + QUIET_ZONE) * MODULE_SCALE;
                let py = (y + QUIET_ZONE) * MODULE_SCALE;
                for dy in 0..MODULE_SCALE {
                    for dx in 0..MODULE_SCALE {
                        img.put_pixel(px + dx, py + dy, Luma([0u8]));
                    }
                }
            }
        }
    }

    let mut png = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut png),
        image::ImageFormat::Png,
    )?;
    Ok(png)
}
