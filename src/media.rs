use anyhow::{Result, anyhow};
use image::{GenericImageView, ImageFormat};

/// Image types accepted as generation sources. Matches the formats the
/// bundled decoder is built with.
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/bmp",
];

pub fn is_supported_image(mime_type: &str) -> bool {
    let normalized = mime_type.to_lowercase();
    let normalized = if normalized == "image/jpg" {
        "image/jpeg"
    } else {
        normalized.as_str()
    };
    SUPPORTED_IMAGE_TYPES.iter().any(|supported| *supported == normalized)
}

pub fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.starts_with(b"BM") {
        return Some("image/bmp");
    }
    None
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.to_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        _ => "bin",
    }
}

pub fn mime_to_format(mime_type: &str) -> Result<ImageFormat> {
    match mime_type.to_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Ok(ImageFormat::Jpeg),
        "image/png" => Ok(ImageFormat::Png),
        "image/webp" => Ok(ImageFormat::WebP),
        "image/gif" => Ok(ImageFormat::Gif),
        "image/bmp" => Ok(ImageFormat::Bmp),
        other => Err(anyhow!("unsupported image type: {other}")),
    }
}

pub fn get_dimensions(bytes: &[u8], mime_type: &str) -> Result<(u32, u32)> {
    let format = mime_to_format(mime_type)?;
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|err| anyhow!("decode image failed: {err}"))?;
    Ok(image.dimensions())
}
