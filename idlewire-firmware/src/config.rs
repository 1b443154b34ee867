//! Build-time configuration
//!
//! `build.rs` validates `idlewire.toml` and encodes it with postcard. The
//! blob is decoded once at boot.

use defmt::*;

use idlewire_core::PipelineConfig;

static CONFIG_BLOB: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/idlewire.bin"));

/// Decode the embedded configuration, falling back to defaults
pub fn load() -> PipelineConfig {
    match postcard::from_bytes::<PipelineConfig>(CONFIG_BLOB) {
        Ok(config) => {
            info!("Loaded configuration ({} bytes)", CONFIG_BLOB.len());
            config
        }
        Err(_) => {
            warn!("Embedded configuration unreadable, using defaults");
            PipelineConfig::default()
        }
    }
}
