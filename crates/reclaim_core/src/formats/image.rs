//! Image header probing and full decode/re-encode.

use crate::error::{CoreError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::ImageReader;
use std::io::{BufRead, Seek};

/// Reads only enough of the stream to learn the image dimensions.
///
/// Pixel data is never decoded, so a file passing this probe may still fail
/// [`reencode_jpeg`].
pub fn probe_bounds<R: BufRead + Seek>(reader: R) -> Result<(usize, usize)> {
    let size = imagesize::reader_size(reader).map_err(|e| match e {
        imagesize::ImageError::IoError(io) => CoreError::Io(io),
        other => CoreError::invalid(format!("image header: {other:?}")),
    })?;
    if size.width == 0 || size.height == 0 {
        return Err(CoreError::invalid(format!(
            "image reports {}x{} bounds",
            size.width, size.height
        )));
    }
    Ok((size.width, size.height))
}

/// Fully decodes the image and encodes it as a baseline JPEG.
pub fn reencode_jpeg<R: BufRead + Seek>(reader: R, quality: u8) -> Result<Vec<u8>> {
    let decoded = ImageReader::new(reader).with_guessed_format()?.decode()?;
    let rgb = decoded.to_rgb8();

    let mut encoded = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut encoded, quality.clamp(1, 100));
    encoder.encode_image(&rgb)?;
    Ok(encoded)
}
