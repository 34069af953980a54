//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Output, temp and log folders.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// External tool executables.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Probe scan behavior.
    #[serde(default)]
    pub scan: ScanSettings,

    /// Default track-selection policy.
    #[serde(default)]
    pub selection: SelectionSettings,

    /// Encoder policy (resolution, bitrate, crop, audio).
    #[serde(default)]
    pub encode: EncodeSettings,

    /// Loudness normalization.
    #[serde(default)]
    pub normalize: NormalizeSettings,
}

/// Path configuration for output, temp, and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Output folder for encoded files.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Root folder for per-job working files (decoded audio, ...).
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    /// Folder for job log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_output_folder() -> String {
    "encoded".to_string()
}

fn default_temp_root() -> String {
    ".temp".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            temp_root: default_temp_root(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level for job logs.
    #[serde(default)]
    pub level: LogLevel,

    /// Keep encoder output out of job logs unless the job fails.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of encoder output lines shown when a job fails.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Log the encoder command one option per line.
    #[serde(default)]
    pub show_options_pretty: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            error_tail: default_error_tail(),
            show_options_pretty: false,
        }
    }
}

/// External tool executables (names on PATH or absolute paths).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Probe tool used for `--scan`.
    #[serde(default = "default_handbrake")]
    pub probe: String,

    /// Encoder.
    #[serde(default = "default_handbrake")]
    pub encoder: String,

    /// Player used to decode one audio stream to WAV.
    #[serde(default = "default_extractor")]
    pub extractor: String,

    /// Loudness analysis tool.
    #[serde(default = "default_gain_analyzer")]
    pub gain_analyzer: String,

    /// Matroska metadata editor.
    #[serde(default = "default_metadata_editor")]
    pub metadata_editor: String,
}

fn default_handbrake() -> String {
    "HandBrakeCLI".to_string()
}

fn default_extractor() -> String {
    "mplayer".to_string()
}

fn default_gain_analyzer() -> String {
    "wavegain".to_string()
}

fn default_metadata_editor() -> String {
    "mkvpropedit".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            probe: default_handbrake(),
            encoder: default_handbrake(),
            extractor: default_extractor(),
            gain_analyzer: default_gain_analyzer(),
            metadata_editor: default_metadata_editor(),
        }
    }
}

/// Probe scan behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Persist raw probe output next to the source and reuse it.
    #[serde(default = "default_true")]
    pub cache_scans: bool,

    /// Titles shorter than this (minutes) are not encode candidates.
    #[serde(default)]
    pub min_time: u32,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            cache_scans: true,
            min_time: 0,
        }
    }
}

/// Default track-selection policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSettings {
    /// Preferred language (ISO 639-2).
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Put the closed-caption track first instead of last.
    #[serde(default)]
    pub closed_captions_first: bool,
}

fn default_lang() -> String {
    "eng".to_string()
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            closed_captions_first: false,
        }
    }
}

/// Encoder policy.
///
/// Bitrates are in kbps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeSettings {
    /// Video encoder name passed to `--encoder`.
    #[serde(default = "default_video_encoder")]
    pub encoder: String,

    /// Optional encoder tuning (`--encoder-tune`).
    #[serde(default)]
    pub tune: Option<String>,

    /// Two-pass encode (analysis pass + final pass).
    #[serde(default = "default_true")]
    pub two_pass: bool,

    /// Global target width for high-definition titles.
    #[serde(default)]
    pub hd_width: Option<u32>,

    #[serde(default = "default_bitrate_1080")]
    pub bitrate_1080: u32,

    #[serde(default = "default_bitrate_1360")]
    pub bitrate_1360: u32,

    #[serde(default = "default_bitrate_720")]
    pub bitrate_720: u32,

    /// High definition narrower than 1280.
    #[serde(default = "default_bitrate_hd_low")]
    pub bitrate_hd_low: u32,

    /// Standard definition.
    #[serde(default = "default_bitrate_sd")]
    pub bitrate_sd: u32,

    /// Bitrate multiplier for bonus features (< 1).
    #[serde(default = "default_bonus_scale")]
    pub bonus_bitrate_scale: f64,

    /// Use the probe's detected crop.
    #[serde(default = "default_true")]
    pub autocrop: bool,

    /// Manual crop `top:bottom:left:right`.
    #[serde(default)]
    pub crop: Option<String>,

    /// Audio codec for every selected track.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate for every selected track.
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: u32,

    #[serde(default)]
    pub grayscale: bool,

    /// Log the encoder command without running it.
    #[serde(default)]
    pub dry_run: bool,

    /// Supervisor polling interval while the encoder runs.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_video_encoder() -> String {
    "x264".to_string()
}

fn default_bitrate_1080() -> u32 {
    4500
}

fn default_bitrate_1360() -> u32 {
    3500
}

fn default_bitrate_720() -> u32 {
    3000
}

fn default_bitrate_hd_low() -> u32 {
    2500
}

fn default_bitrate_sd() -> u32 {
    1800
}

fn default_bonus_scale() -> f64 {
    0.5
}

fn default_audio_codec() -> String {
    "faac".to_string()
}

fn default_audio_bitrate() -> u32 {
    160
}

fn default_poll_interval() -> u64 {
    100
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            encoder: default_video_encoder(),
            tune: None,
            two_pass: true,
            hd_width: None,
            bitrate_1080: default_bitrate_1080(),
            bitrate_1360: default_bitrate_1360(),
            bitrate_720: default_bitrate_720(),
            bitrate_hd_low: default_bitrate_hd_low(),
            bitrate_sd: default_bitrate_sd(),
            bonus_bitrate_scale: default_bonus_scale(),
            autocrop: true,
            crop: None,
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            grayscale: false,
            dry_run: false,
            poll_interval_ms: default_poll_interval(),
        }
    }
}

/// Loudness normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizeSettings {
    /// Compute per-track gain before the encode.
    #[serde(default)]
    pub enabled: bool,
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Tools,
    Scan,
    Selection,
    Encode,
    Normalize,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 7] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Tools,
        ConfigSection::Scan,
        ConfigSection::Selection,
        ConfigSection::Encode,
        ConfigSection::Normalize,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Tools => "tools",
            ConfigSection::Scan => "scan",
            ConfigSection::Selection => "selection",
            ConfigSection::Encode => "encode",
            ConfigSection::Normalize => "normalize",
        }
    }

    /// Comment written above the table in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output and working directories",
            ConfigSection::Logging => "Job logging",
            ConfigSection::Tools => "External tools",
            ConfigSection::Scan => "Source scanning",
            ConfigSection::Selection => "Default track selection",
            ConfigSection::Encode => "Encoder policy (bitrates in kbps)",
            ConfigSection::Normalize => "Loudness normalization",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[encode]"));
        assert!(toml.contains("bitrate_1080"));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[encode]\nbitrate_sd = 1200\n\n[selection]\nlang = \"fre\"";
        let parsed: Settings = toml::from_str(minimal).unwrap();

        assert_eq!(parsed.encode.bitrate_sd, 1200);
        assert_eq!(parsed.selection.lang, "fre");
        assert_eq!(parsed.encode.bitrate_1080, 4500);
        assert_eq!(parsed.tools.probe, "HandBrakeCLI");
        assert!(parsed.scan.cache_scans);
    }

    #[test]
    fn log_level_reads_lowercase() {
        let parsed: Settings = toml::from_str("[logging]\nlevel = \"debug\"").unwrap();
        assert_eq!(parsed.logging.level, LogLevel::Debug);
    }
}
