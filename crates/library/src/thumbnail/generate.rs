use crate::thumbnail::ThumbnailSettings;
use crate::thumbnail::error::{ErrorKind, Result};
use exn::ResultExt;
use image::imageops::FilterType;
use tankobon_render::{Encoding, encode};

/// Size of the thumbnail for a `width`x`height` source: scaled to fit within
/// `max`x`max`, never enlarged, never collapsed to zero.
pub(crate) fn scaled_size(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width.max(1), height.max(1));
    }
    let scale = (f64::from(max) / f64::from(width)).min(f64::from(max) / f64::from(height)).min(1.0);
    let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Decode, downscale and re-encode as JPEG. CPU-bound: run it on a blocking
/// thread.
pub(crate) fn downscale(bytes: &[u8], settings: ThumbnailSettings) -> Result<Vec<u8>> {
    let image = image::load_from_memory(bytes).or_raise(|| ErrorKind::Decode)?;
    let (width, height) = scaled_size(image.width(), image.height(), settings.max_size);
    let image = match (width, height) == (image.width(), image.height()) {
        true => image,
        false => image.resize_exact(width, height, FilterType::Lanczos3),
    };
    encode(&image, Encoding::Jpeg { quality: settings.quality }).or_raise(|| ErrorKind::Encode)
}
