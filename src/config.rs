use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

use crate::processing::job::AugmentParams;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Url prefixes owned by the api and download routes.
const RESERVED_PREFIXES: [&str; 2] = ["/api/", "/download/"];

#[derive(Parser, Debug, Clone)]
#[clap(about = "Upload an image and get back a set of augmented variants")]
pub struct Args {
    /// Address the http server binds to
    #[clap(long, env = "AUGMENT_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Directory holding uploaded and augmented images
    #[clap(long, env = "MEDIA_ROOT", default_value = "media")]
    pub media_root: PathBuf,

    /// Url prefix under which media files are served
    #[clap(long, env = "MEDIA_URL", default_value = "/media/")]
    pub media_url: String,

    /// Largest accepted request body
    #[clap(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Side of the random crop window
    #[clap(long, env = "CROP_SIZE", default_value_t = 100)]
    pub crop_size: u32,

    /// Seed for reproducible augmentations
    #[clap(long, env = "AUGMENT_SEED")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("media url must start and end with '/', got {0:?}")]
    InvalidMediaUrl(String),
    #[error("media url {0:?} overlaps a built-in route")]
    ReservedMediaUrl(String),
    #[error("crop size cannot be zero")]
    ZeroCropSize,
    #[error("max upload size cannot be zero")]
    ZeroUploadLimit,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub media_root: PathBuf,
    pub media_url: String,
    pub max_upload_bytes: usize,
    pub params: AugmentParams,
    pub seed: Option<u64>,
}

impl TryFrom<Args> for Config {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if !args.media_url.starts_with('/') || !args.media_url.ends_with('/') {
            return Err(ConfigError::InvalidMediaUrl(args.media_url));
        }
        if RESERVED_PREFIXES.iter().any(|p| args.media_url.starts_with(p)) {
            return Err(ConfigError::ReservedMediaUrl(args.media_url));
        }
        if args.crop_size == 0 {
            return Err(ConfigError::ZeroCropSize);
        }
        if args.max_upload_bytes == 0 {
            return Err(ConfigError::ZeroUploadLimit);
        }

        Ok(Config {
            bind: args.bind,
            media_root: args.media_root,
            media_url: args.media_url,
            max_upload_bytes: args.max_upload_bytes,
            params: AugmentParams {
                crop_size: args.crop_size,
                ..AugmentParams::default()
            },
            seed: args.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn parse(argv: &[&str]) -> Result<Config, ConfigError> {
        let mut full = vec!["imgaugment"];
        full.extend_from_slice(argv);
        Config::try_from(Args::try_parse_from(full).unwrap())
    }

    #[test]
    #[serial]
    fn defaults() {
        let config = parse(&[]).unwrap();

        assert_eq!(config.bind, "127.0.0.1:8000".parse().unwrap());
        assert_eq!(config.media_root, PathBuf::from("media"));
        assert_eq!(config.media_url, "/media/");
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.params.crop_size, 100);
        assert_eq!(config.seed, None);
    }

    #[test]
    #[serial]
    fn environment_overrides_defaults() {
        std::env::set_var("MEDIA_ROOT", "/tmp/augmented");
        std::env::set_var("AUGMENT_SEED", "7");
        let config = parse(&[]);
        std::env::remove_var("MEDIA_ROOT");
        std::env::remove_var("AUGMENT_SEED");

        let config = config.unwrap();
        assert_eq!(config.media_root, PathBuf::from("/tmp/augmented"));
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    #[serial]
    fn rejects_bad_values() {
        assert_eq!(
            parse(&["--media-url", "media"]).unwrap_err(),
            ConfigError::InvalidMediaUrl("media".into())
        );
        assert_eq!(
            parse(&["--crop-size", "0"]).unwrap_err(),
            ConfigError::ZeroCropSize
        );
    }

    #[test]
    #[serial]
    fn media_url_cannot_shadow_builtin_routes() {
        for url in ["/download/", "/api/", "/download/media/"] {
            assert_eq!(
                parse(&["--media-url", url]).unwrap_err(),
                ConfigError::ReservedMediaUrl(url.into())
            );
        }
        assert_eq!(parse(&["--media-url", "/files/"]).unwrap().media_url, "/files/");
    }
}
