use crate::Encoding;
use crate::error::{ErrorKind, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use exn::ResultExt;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;

/// Encode a bitmap. JPEG has no alpha channel, so the image is flattened to
/// RGB first.
pub fn encode(image: &DynamicImage, encoding: Encoding) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match encoding {
        Encoding::Jpeg { quality } => {
            if !(1..=100).contains(&quality) {
                exn::bail!(ErrorKind::InvalidSettings(format!("JPEG quality {quality} not in 1..=100")));
            }
            image
                .to_rgb8()
                .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))
                .or_raise(|| ErrorKind::Encode)?;
        },
        Encoding::Png => {
            image.write_with_encoder(PngEncoder::new(&mut bytes)).or_raise(|| ErrorKind::Encode)?;
        },
    }
    Ok(bytes)
}

/// Build a `data:` URL from a MIME type and raw bytes.
///
/// ```
/// assert_eq!(tankobon_render::to_data_url("image/png", b"hi"), "data:image/png;base64,aGk=");
/// ```
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use rstest::rstest;

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 4, Rgba([200, 10, 10, 128])))
    }

    #[rstest]
    #[case::jpeg_flattens_alpha(Encoding::Jpeg { quality: 80 }, ImageFormat::Jpeg)]
    #[case::jpeg_lowest_quality(Encoding::Jpeg { quality: 1 }, ImageFormat::Jpeg)]
    #[case::jpeg_highest_quality(Encoding::Jpeg { quality: 100 }, ImageFormat::Jpeg)]
    #[case::png_keeps_alpha(Encoding::Png, ImageFormat::Png)]
    fn test_encode(#[case] encoding: Encoding, #[case] format: ImageFormat) {
        let bytes = encode(&sample(), encoding).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), format);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
        assert_eq!(decoded.color().has_alpha(), format == ImageFormat::Png);
    }

    #[rstest]
    #[case(0)]
    #[case(101)]
    #[case(255)]
    fn test_invalid_quality(#[case] quality: u8) {
        let err = encode(&sample(), Encoding::Jpeg { quality }).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidSettings(_)));
    }

    #[rstest]
    #[case(Encoding::Jpeg { quality: 90 }, &[0xff, 0xd8], "data:image/jpeg;base64,/9g=")]
    #[case(Encoding::Png, b"hi", "data:image/png;base64,aGk=")]
    fn test_data_url(#[case] encoding: Encoding, #[case] bytes: &[u8], #[case] expected: &str) {
        assert_eq!(to_data_url(encoding.mime(), bytes), expected);
    }
}
