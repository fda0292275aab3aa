use image::{
    imageops::{self, FilterType},
    DynamicImage, Rgb, RgbImage,
};
use imageproc::geometric_transformations::{warp, Interpolation, Projection};
use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::ErrorType;

use super::job::{AugmentParams, AugmentationKind};

/// Runs one augmentation over `image`. The input is never modified.
pub fn apply<R: Rng + ?Sized>(
    kind: AugmentationKind,
    image: &RgbImage,
    params: &AugmentParams,
    rng: &mut R,
) -> Result<RgbImage, ErrorType> {
    debug!("applying {} to {}x{}", kind, image.width(), image.height());

    Ok(match kind {
        AugmentationKind::Hflip => imageops::flip_horizontal(image),
        AugmentationKind::Vflip => imageops::flip_vertical(image),
        AugmentationKind::FlipBoth => imageops::rotate180(image),
        AugmentationKind::Crop => {
            let (cw, ch) = params.crop_window(image.dimensions());
            random_crop(image, cw, ch, rng)
        }
        AugmentationKind::Brightness => {
            let factor = rng.gen_range(params.brightness.clone());
            adjust_brightness(image, factor)
        }
        AugmentationKind::GaussianNoise => {
            add_gaussian_noise(image, params.noise_mean, params.noise_sigma, rng)?
        }
        AugmentationKind::GaussianBlur => gaussian_blur(image, params.blur_sigma),
        AugmentationKind::Scale => {
            let factor = rng.gen_range(params.scale.clone());
            scale(image, factor)
        }
        AugmentationKind::Shear => {
            let factor = rng.gen_range(params.shear.clone());
            shear(image, factor)?
        }
        AugmentationKind::Grayscale => to_grayscale(image),
        AugmentationKind::Color => {
            let factor = rng.gen_range(params.color.clone());
            adjust_color(image, factor)
        }
    })
}

/// Cuts a `width x height` window at a random position, clamped to the image.
pub fn random_crop<R: Rng + ?Sized>(
    image: &RgbImage,
    width: u32,
    height: u32,
    rng: &mut R,
) -> RgbImage {
    let (w, h) = image.dimensions();
    let (cw, ch) = (width.min(w), height.min(h));

    let x = rng.gen_range(0..=w - cw);
    let y = rng.gen_range(0..=h - ch);

    imageops::crop_imm(image, x, y, cw, ch).to_image()
}

/// Scales the HSV value channel, keeping hue and saturation.
///
/// With hue and saturation fixed every RGB channel is proportional to the
/// value, so scaling the channels by `new_value / value` is the same as a
/// round trip through HSV.
pub fn adjust_brightness(image: &RgbImage, factor: f32) -> RgbImage {
    let mut out = image.clone();

    for pixel in out.pixels_mut() {
        let value = pixel.0.iter().copied().max().unwrap_or(0);
        if value == 0 {
            continue;
        }

        let scaled = (value as f32 * factor).clamp(0.0, 255.0);
        let ratio = scaled / value as f32;

        for channel in pixel.0.iter_mut() {
            *channel = (*channel as f32 * ratio).round().clamp(0.0, 255.0) as u8;
        }
    }

    out
}

/// Multiplies every channel by `factor`, truncating into `[0, 255]`.
pub fn adjust_color(image: &RgbImage, factor: f32) -> RgbImage {
    let mut out = image.clone();
    for channel in out.iter_mut() {
        *channel = (*channel as f32 * factor).clamp(0.0, 255.0) as u8;
    }
    out
}

pub fn add_gaussian_noise<R: Rng + ?Sized>(
    image: &RgbImage,
    mean: f32,
    sigma: f32,
    rng: &mut R,
) -> Result<RgbImage, ErrorType> {
    // Normal::new only rejects a non-finite deviation
    if !(sigma >= 0.0) || !mean.is_finite() {
        return Err(ErrorType::InvalidParams(format!(
            "noise needs a finite mean and a non-negative sigma, got N({mean}, {sigma})"
        )));
    }
    let normal =
        Normal::new(mean, sigma).map_err(|e| ErrorType::InvalidParams(format!("noise: {e}")))?;

    let mut out = image.clone();
    for channel in out.iter_mut() {
        let noisy = *channel as f32 + normal.sample(rng);
        *channel = noisy.round().clamp(0.0, 255.0) as u8;
    }

    Ok(out)
}

pub fn gaussian_blur(image: &RgbImage, sigma: f32) -> RgbImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Bilinear resize by `factor`. Each side keeps at least one pixel.
pub fn scale(image: &RgbImage, factor: f32) -> RgbImage {
    let (w, h) = image.dimensions();
    let nw = ((w as f32 * factor) as u32).max(1);
    let nh = ((h as f32 * factor) as u32).max(1);

    imageops::resize(image, nw, nh, FilterType::Triangle)
}

/// Horizontal shear `x' = x + factor * y` on a canvas of the same size.
/// Uncovered pixels are black.
///
/// Bilinear sampling in `warp` needs the right and bottom neighbours inside
/// the image, so the source gets one replicated column and row before the
/// warp and the result is cropped back.
pub fn shear(image: &RgbImage, factor: f32) -> Result<RgbImage, ErrorType> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Ok(image.clone());
    }

    #[rustfmt::skip]
    let matrix = [
        1.0, factor, 0.0,
        0.0, 1.0,    0.0,
        0.0, 0.0,    1.0,
    ];

    let projection = Projection::from_matrix(matrix)
        .ok_or_else(|| ErrorType::InvalidParams(format!("shear {factor} is not invertible")))?;

    let padded = RgbImage::from_fn(w + 1, h + 1, |x, y| {
        *image.get_pixel(x.min(w - 1), y.min(h - 1))
    });
    let warped = warp(&padded, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]));

    Ok(imageops::crop_imm(&warped, 0, 0, w, h).to_image())
}

/// Luma conversion, written back as three identical channels.
pub fn to_grayscale(image: &RgbImage) -> RgbImage {
    DynamicImage::ImageLuma8(imageops::grayscale(image)).to_rgb8()
}
