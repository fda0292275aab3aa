use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::{
    error::ErrorType,
    processing::{
        augment,
        data_loader::{decode_image, encode_image},
        job::{AugmentParams, AugmentationKind},
    },
    storage::{MediaName, MediaStore},
};

pub const MAX_RANDOM_AUGMENTATIONS: usize = 32;

#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AugmentMode {
    /// Every augmentation of the table, in table order.
    Full,
    /// `n` draws with replacement from [`AugmentationKind::RANDOM_POOL`].
    Random(usize),
}

#[derive(Debug, Clone)]
pub struct AugmentOutcome {
    pub original: MediaName,
    pub derived: Vec<(AugmentationKind, MediaName)>,
}

impl AugmentOutcome {
    pub fn derived_names(&self) -> impl Iterator<Item = &MediaName> {
        self.derived.iter().map(|(_, name)| name)
    }
}

/// Hands out one rng per request. With a seed the sequence of requests is
/// reproducible.
#[derive(Debug)]
pub struct RngSource {
    seed: Option<u64>,
    counter: AtomicU64,
}

impl RngSource {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            seed,
            counter: AtomicU64::new(0),
        }
    }

    pub fn next_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => {
                let n = self.counter.fetch_add(1, Ordering::Relaxed);
                StdRng::seed_from_u64(seed.wrapping_add(n))
            }
            None => StdRng::from_entropy(),
        }
    }
}

fn plan<R: Rng + ?Sized>(mode: AugmentMode, rng: &mut R) -> Vec<(String, AugmentationKind)> {
    match mode {
        AugmentMode::Full => AugmentationKind::ALL
            .iter()
            .map(|kind| (kind.name().to_string(), *kind))
            .collect(),
        AugmentMode::Random(n) => (0..n)
            .filter_map(|i| {
                AugmentationKind::RANDOM_POOL
                    .choose(&mut *rng)
                    .map(|kind| (format!("augmented_{}_{}", i, kind), *kind))
            })
            .collect(),
    }
}

/// Saves the original, then applies each planned augmentation in turn.
/// The first failing save aborts the run.
pub fn augment_upload<R: Rng + ?Sized>(
    store: &MediaStore,
    params: &AugmentParams,
    upload: &Upload,
    mode: AugmentMode,
    rng: &mut R,
) -> Result<AugmentOutcome, ErrorType> {
    let (image, format) = decode_image(&upload.bytes)?;
    let original = store.stored_name(&upload.filename, &upload.bytes, format);

    if image::guess_format(&upload.bytes).ok() == Some(format.image_format()) {
        store.write(&original, &upload.bytes)?;
    } else {
        debug!("re-encoding {} as {:?}", upload.filename, format);
        store.write(&original, &encode_image(&image, format)?)?;
    }

    info!(
        "Stored upload {:?} as {} ({}x{})",
        upload.filename,
        original,
        image.width(),
        image.height()
    );

    let params = match mode {
        AugmentMode::Full => params.clone(),
        AugmentMode::Random(_) => params.random_pool(),
    };

    let mut derived = Vec::new();
    for (prefix, kind) in plan(mode, rng) {
        let augmented = augment::apply(kind, &image, &params, rng)?;
        let name = store.derived_name(&prefix, &original);

        store.write(&name, &encode_image(&augmented, format)?)?;
        derived.push((kind, name));
    }

    info!("Wrote {} augmented images for {}", derived.len(), original);

    Ok(AugmentOutcome { original, derived })
}

/// Runs [`augment_upload`] on the blocking pool.
pub async fn run_blocking(
    store: MediaStore,
    params: AugmentParams,
    upload: Upload,
    mode: AugmentMode,
    mut rng: StdRng,
) -> Result<AugmentOutcome, ErrorType> {
    tokio::task::spawn_blocking(move || augment_upload(&store, &params, &upload, mode, &mut rng)).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_common::{encode, gradient_image, seeded_rng, temp_store};
    use image::ImageFormat;

    fn png_upload(name: &str, w: u32, h: u32) -> Upload {
        Upload {
            filename: name.into(),
            bytes: encode(&gradient_image(w, h), ImageFormat::Png),
        }
    }

    #[test]
    fn full_mode_writes_the_whole_table() {
        let (_dir, store) = temp_store();
        let upload = png_upload("cat.png", 120, 80);

        let outcome = augment_upload(
            &store,
            &AugmentParams::default(),
            &upload,
            AugmentMode::Full,
            &mut seeded_rng(),
        )
        .unwrap();

        assert_eq!(std::fs::read(store.path(&outcome.original)).unwrap(), upload.bytes);

        let kinds: Vec<_> = outcome.derived.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds, AugmentationKind::ALL);

        for (kind, name) in &outcome.derived {
            assert_eq!(name.as_str(), format!("{}_{}", kind, outcome.original));
            assert!(store.path(name).exists(), "{name} missing");
        }

        let files = std::fs::read_dir(store.root()).unwrap().count();
        assert_eq!(files, 11);
    }

    #[test]
    fn derived_images_have_the_expected_shape() {
        let (_dir, store) = temp_store();
        let upload = png_upload("cat.png", 120, 80);

        let outcome = augment_upload(
            &store,
            &AugmentParams::default(),
            &upload,
            AugmentMode::Full,
            &mut seeded_rng(),
        )
        .unwrap();

        for (kind, name) in &outcome.derived {
            let img = image::open(store.path(name)).unwrap().to_rgb8();
            match kind {
                AugmentationKind::Crop => assert_eq!(img.dimensions(), (100, 80)),
                AugmentationKind::Scale => assert!((96..180).contains(&img.width())),
                AugmentationKind::Grayscale => {
                    assert!(img.pixels().all(|p| p[0] == p[1] && p[1] == p[2]))
                }
                _ => assert_eq!(img.dimensions(), (120, 80), "{kind}"),
            }
        }
    }

    #[test]
    fn random_mode_names_each_draw() {
        let (_dir, store) = temp_store();
        let upload = png_upload("dog.png", 30, 30);

        let outcome = augment_upload(
            &store,
            &AugmentParams::default(),
            &upload,
            AugmentMode::Random(5),
            &mut seeded_rng(),
        )
        .unwrap();

        assert_eq!(outcome.derived.len(), 5);
        for (i, (kind, name)) in outcome.derived.iter().enumerate() {
            let expected = format!("augmented_{}_{}_{}", i, kind, outcome.original);
            assert_eq!(name.as_str(), expected);
            assert!(store.path(name).exists());
        }
    }

    #[test]
    fn random_mode_draws_from_its_own_pool() {
        let (_dir, store) = temp_store();
        let upload = png_upload("dog.png", 50, 30);

        let outcome = augment_upload(
            &store,
            &AugmentParams::default(),
            &upload,
            AugmentMode::Random(MAX_RANDOM_AUGMENTATIONS),
            &mut seeded_rng(),
        )
        .unwrap();

        for (kind, name) in &outcome.derived {
            assert!(AugmentationKind::RANDOM_POOL.contains(kind), "{kind} drawn");

            let img = image::open(store.path(name)).unwrap().to_rgb8();
            if *kind == AugmentationKind::Crop {
                assert_eq!(img.dimensions(), (40, 24));
            } else {
                assert_eq!(img.dimensions(), (50, 30), "{kind}");
            }
        }
        assert!(outcome
            .derived
            .iter()
            .any(|(kind, _)| *kind == AugmentationKind::Color));
    }

    #[test]
    fn unsupported_formats_are_stored_as_png() {
        let (_dir, store) = temp_store();
        let upload = Upload {
            filename: "anim.gif".into(),
            bytes: encode(&gradient_image(10, 10), ImageFormat::Gif),
        };

        let outcome = augment_upload(
            &store,
            &AugmentParams::default(),
            &upload,
            AugmentMode::Full,
            &mut seeded_rng(),
        )
        .unwrap();

        assert!(outcome.original.as_str().ends_with("_anim.png"));
        let stored = std::fs::read(store.path(&outcome.original)).unwrap();
        assert_eq!(image::guess_format(&stored).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn garbage_upload_writes_nothing() {
        let (_dir, store) = temp_store();
        let upload = Upload {
            filename: "notes.txt".into(),
            bytes: b"hello".to_vec(),
        };

        let err = augment_upload(
            &store,
            &AugmentParams::default(),
            &upload,
            AugmentMode::Full,
            &mut seeded_rng(),
        )
        .unwrap_err();

        assert!(matches!(err, ErrorType::InvalidImage(_)));
        assert_eq!(std::fs::read_dir(store.root()).unwrap().count(), 0);
    }

    #[test]
    fn seeded_source_is_reproducible() {
        let a = RngSource::new(Some(42));
        let b = RngSource::new(Some(42));

        for _ in 0..3 {
            assert_eq!(a.next_rng().gen::<u64>(), b.next_rng().gen::<u64>());
        }

        let c = RngSource::new(Some(42));
        let first = c.next_rng().gen::<u64>();
        assert_ne!(first, c.next_rng().gen::<u64>());
    }

    #[tokio::test]
    async fn run_blocking_matches_the_direct_call() {
        let (_dir, store) = temp_store();
        let upload = png_upload("cat.png", 20, 20);

        let outcome = run_blocking(
            store.clone(),
            AugmentParams::default(),
            upload,
            AugmentMode::Random(3),
            StdRng::seed_from_u64(1),
        )
        .await
        .unwrap();

        assert_eq!(outcome.derived_names().count(), 3);
    }
}
