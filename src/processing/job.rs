use std::{fmt::Display, ops::Range};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AugmentationKind {
    Hflip,
    Vflip,
    FlipBoth,
    Crop,
    Brightness,
    GaussianNoise,
    GaussianBlur,
    Scale,
    Shear,
    Grayscale,
    Color,
}

impl AugmentationKind {
    /// Every upload goes through this table, in this order.
    pub const ALL: [AugmentationKind; 10] = [
        AugmentationKind::Hflip,
        AugmentationKind::Vflip,
        AugmentationKind::FlipBoth,
        AugmentationKind::Crop,
        AugmentationKind::Brightness,
        AugmentationKind::GaussianNoise,
        AugmentationKind::GaussianBlur,
        AugmentationKind::Scale,
        AugmentationKind::Shear,
        AugmentationKind::Grayscale,
    ];

    /// Kinds the random picker draws from.
    pub const RANDOM_POOL: [AugmentationKind; 5] = [
        AugmentationKind::Hflip,
        AugmentationKind::Vflip,
        AugmentationKind::Crop,
        AugmentationKind::Brightness,
        AugmentationKind::Color,
    ];

    /// Filename prefix of the derived image.
    pub fn name(&self) -> &'static str {
        match self {
            AugmentationKind::Hflip => "hflip",
            AugmentationKind::Vflip => "vflip",
            AugmentationKind::FlipBoth => "flip_both",
            AugmentationKind::Crop => "crop",
            AugmentationKind::Brightness => "brightness",
            AugmentationKind::GaussianNoise => "gaussian_noise",
            AugmentationKind::GaussianBlur => "gaussian_blur",
            AugmentationKind::Scale => "scale",
            AugmentationKind::Shear => "shear",
            AugmentationKind::Grayscale => "grayscale",
            AugmentationKind::Color => "color",
        }
    }
}

impl Display for AugmentationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Tunable constants of the augmentations.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentParams {
    pub crop_size: u32,
    /// When set, the crop window is this fraction of each side instead of
    /// `crop_size`.
    pub crop_fraction: Option<f32>,
    pub brightness: Range<f32>,
    pub noise_mean: f32,
    pub noise_sigma: f32,
    /// Matches a 5x5 kernel with sigma derived from the kernel size.
    pub blur_sigma: f32,
    pub scale: Range<f32>,
    pub shear: Range<f32>,
    pub color: Range<f32>,
}

impl Default for AugmentParams {
    fn default() -> Self {
        Self {
            crop_size: 100,
            crop_fraction: None,
            brightness: 0.7..1.5,
            noise_mean: 0.0,
            noise_sigma: 25.0,
            blur_sigma: 1.1,
            scale: 0.8..1.5,
            shear: -0.3..0.3,
            color: 0.5..1.5,
        }
    }
}

impl AugmentParams {
    /// Parameters of the random picker: 80% crops and a wider brightness
    /// range.
    pub fn random_pool(&self) -> Self {
        Self {
            crop_fraction: Some(0.8),
            brightness: 0.5..1.5,
            ..self.clone()
        }
    }

    /// Crop window for an image of `(width, height)`, before clamping.
    pub fn crop_window(&self, (width, height): (u32, u32)) -> (u32, u32) {
        match self.crop_fraction {
            Some(fraction) => (
                ((width as f32 * fraction) as u32).max(1),
                ((height as f32 * fraction) as u32).max(1),
            ),
            None => (self.crop_size, self.crop_size),
        }
    }
}
