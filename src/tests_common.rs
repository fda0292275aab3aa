#![cfg(test)]

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rand::{rngs::StdRng, SeedableRng};
use tempfile::TempDir;

use crate::storage::MediaStore;

/// Pixel `(x, y)` is `[x, y, x ^ y]`, so every pixel tells where it came from.
pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    assert!(width <= 256 && height <= 256);
    RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, (x ^ y) as u8]))
}

pub fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut bytes, format)
        .unwrap();
    bytes.into_inner()
}

pub fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64(0x5eed)
}

pub fn temp_store() -> (TempDir, MediaStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = MediaStore::new(dir.path().join("media"), "/media/");
    store.ensure_root().unwrap();
    (dir, store)
}
