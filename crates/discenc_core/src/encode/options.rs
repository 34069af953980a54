//! Encoder options.
//!
//! Most options are plain values copied from the `[encode]` settings. Crop is
//! the exception: a manual crop and the autocrop switch compete, and whichever
//! was set last wins. Each of the two carries the tick of a shared
//! [`OptionClock`] at which it was set.

use crate::config::{ConfigError, ConfigResult, Settings};
use crate::models::{Crop, Title};

/// A value and the clock tick at which it was set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tracked<T> {
    pub value: T,
    pub set_at: u64,
}

/// Monotonic counter handing out `set_at` ticks.
#[derive(Debug, Clone, Default)]
pub struct OptionClock {
    ticks: u64,
}

impl OptionClock {
    pub fn stamp<T>(&mut self, value: T) -> Tracked<T> {
        self.ticks += 1;
        Tracked {
            value,
            set_at: self.ticks,
        }
    }
}

/// Everything the command builder and encoder need to know about policy.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub encoder: String,
    pub tune: Option<String>,
    pub two_pass: bool,
    /// Global target width for high-definition titles.
    pub hd_width: Option<u32>,
    pub bitrate_1080: u32,
    pub bitrate_1360: u32,
    pub bitrate_720: u32,
    pub bitrate_hd_low: u32,
    pub bitrate_sd: u32,
    pub bonus_bitrate_scale: f64,
    pub audio_codec: String,
    pub audio_bitrate: u32,
    pub grayscale: bool,
    pub dry_run: bool,
    /// Run loudness analysis before encoding.
    pub normalize: bool,
    pub poll_interval_ms: u64,
    autocrop: Tracked<bool>,
    crop: Tracked<Option<Crop>>,
    clock: OptionClock,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::base(&Settings::default())
    }
}

impl EncodeOptions {
    fn base(settings: &Settings) -> Self {
        let encode = &settings.encode;
        let mut clock = OptionClock::default();
        let autocrop = clock.stamp(encode.autocrop);
        let crop = clock.stamp(None);

        Self {
            encoder: encode.encoder.clone(),
            tune: encode.tune.clone(),
            two_pass: encode.two_pass,
            hd_width: encode.hd_width,
            bitrate_1080: encode.bitrate_1080,
            bitrate_1360: encode.bitrate_1360,
            bitrate_720: encode.bitrate_720,
            bitrate_hd_low: encode.bitrate_hd_low,
            bitrate_sd: encode.bitrate_sd,
            bonus_bitrate_scale: encode.bonus_bitrate_scale,
            audio_codec: encode.audio_codec.clone(),
            audio_bitrate: encode.audio_bitrate,
            grayscale: encode.grayscale,
            dry_run: encode.dry_run,
            normalize: settings.normalize.enabled,
            poll_interval_ms: encode.poll_interval_ms,
            autocrop,
            crop,
            clock,
        }
    }

    /// Build options from settings.
    ///
    /// `key_order` lists the `[encode]` keys as they appear in the config
    /// file; `crop` and `autocrop` are applied in that order.
    pub fn from_settings(settings: &Settings, key_order: &[String]) -> ConfigResult<Self> {
        let mut options = Self::base(settings);

        let manual = match settings.encode.crop.as_deref() {
            Some(value) => Some(
                Crop::parse(value).ok_or_else(|| ConfigError::invalid_value("encode.crop", value))?,
            ),
            None => None,
        };

        if let Some(crop) = manual {
            options.set_crop(crop);
        }
        for key in key_order {
            match key.as_str() {
                "autocrop" => options.set_autocrop(settings.encode.autocrop),
                "crop" => {
                    if let Some(crop) = manual {
                        options.set_crop(crop);
                    }
                }
                _ => {}
            }
        }

        Ok(options)
    }

    pub fn set_autocrop(&mut self, enabled: bool) {
        self.autocrop = self.clock.stamp(enabled);
    }

    pub fn set_crop(&mut self, crop: Crop) {
        self.crop = self.clock.stamp(Some(crop));
    }

    pub fn autocrop(&self) -> Tracked<bool> {
        self.autocrop
    }

    pub fn manual_crop(&self) -> Tracked<Option<Crop>> {
        self.crop
    }

    /// Whether a manual crop was set after autocrop was last requested.
    pub fn manual_crop_wins(&self) -> bool {
        self.crop.value.is_some() && self.crop.set_at > self.autocrop.set_at
    }

    /// Crop to apply to `title`; zero crop when neither source applies.
    pub fn effective_crop(&self, title: &Title) -> Crop {
        match (self.crop.value, self.autocrop.value) {
            (Some(manual), _) if self.manual_crop_wins() => manual,
            (_, true) => title.autocrop,
            (Some(manual), false) => manual,
            (None, false) => Crop::default(),
        }
    }
}
