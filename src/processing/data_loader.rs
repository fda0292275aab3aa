use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use log::debug;

use crate::error::ErrorType;

/// Formats derived images are written in. Anything else is re-encoded as png.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Bmp,
}

impl OutputFormat {
    pub fn from_detected(format: Option<ImageFormat>) -> Self {
        match format {
            Some(ImageFormat::Jpeg) => OutputFormat::Jpeg,
            Some(ImageFormat::Bmp) => OutputFormat::Bmp,
            _ => OutputFormat::Png,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Bmp => "bmp",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Bmp => ImageFormat::Bmp,
        }
    }
}

/// Decodes an upload, reporting the format it should be written back in.
pub fn decode_image(bytes: &[u8]) -> Result<(RgbImage, OutputFormat), ErrorType> {
    let format = OutputFormat::from_detected(image::guess_format(bytes).ok());
    let image = image::load_from_memory(bytes)
        .map_err(|e| ErrorType::InvalidImage(e.to_string()))?
        .to_rgb8();

    debug!(
        "decoded {}x{} upload as {:?}",
        image.width(),
        image.height(),
        format
    );

    Ok((image, format))
}

pub fn encode_image(image: &RgbImage, format: OutputFormat) -> Result<Vec<u8>, ErrorType> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, format.image_format())?;
    debug!("encoded {}x{} as {:?}", image.width(), image.height(), format);
    Ok(bytes.into_inner())
}
