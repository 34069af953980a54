//! Encoder command builder.
//!
//! Turns a scanned title, the selected tracks and the encode options into the
//! encoder's argument tokens. The computed [`EncodePlan`] travels with the
//! tokens so the encoder and the track renamer see the same track order.

use serde::Serialize;

use super::errors::{EncodeError, EncodeResult};
use super::gain::TrackGains;
use super::options::EncodeOptions;
use crate::models::{Crop, Title};
use crate::scan::ScanError;
use crate::select::{SelectedAudio, SelectedSubtitle};

/// Widest standard-definition source; anything wider is high definition.
pub const SD_MAX_WIDTH: u32 = 720;

/// Display width for anamorphic widescreen standard-definition output.
const WIDESCREEN_DISPLAY_WIDTH: &str = "854";

/// Pixel aspect for 4:3 standard-definition output.
const STANDARD_PIXEL_ASPECT: &str = "8:9";

/// Subtitle token that asks the encoder to search for forced subtitles.
const SUBTITLE_SCAN: &str = "scan";

/// What the builder decided for one title.
#[derive(Debug, Clone, Serialize)]
pub struct EncodePlan {
    /// Probe number of the title.
    pub title_number: u32,
    /// Target width, high-definition titles only.
    pub width: Option<u32>,
    /// Video bitrate in kbps.
    pub bitrate: u32,
    pub crop: Crop,
    /// Whether forced subtitles are burned in through the subtitle scan.
    pub burn_in: bool,
    pub audio: Vec<SelectedAudio>,
    pub subtitles: Vec<SelectedSubtitle>,
}

/// Argument tokens plus the plan they were built from.
#[derive(Debug, Clone)]
pub struct EncodeCommand {
    pub tokens: Vec<String>,
    pub plan: EncodePlan,
}

/// Family of a standard-definition display aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AspectFamily {
    Widescreen,
    Standard,
}

impl AspectFamily {
    fn from_display_aspect(aspect: &str) -> Option<Self> {
        match aspect.trim() {
            "16x9" | "16:9" | "1.77" | "1.78" => Some(Self::Widescreen),
            "4x3" | "4:3" | "1.33" => Some(Self::Standard),
            _ => None,
        }
    }
}

/// Builder for encoder command lines.
pub struct EncodeCommandBuilder<'a> {
    options: &'a EncodeOptions,
    width_override: Option<u32>,
    gains: Option<&'a TrackGains>,
}

impl<'a> EncodeCommandBuilder<'a> {
    pub fn new(options: &'a EncodeOptions) -> Self {
        Self {
            options,
            width_override: None,
            gains: None,
        }
    }

    /// Per-job target width for high-definition titles.
    pub fn width_override(mut self, width: Option<u32>) -> Self {
        self.width_override = width;
        self
    }

    /// Per-track gain values to pass with `--gain`.
    pub fn gains(mut self, gains: Option<&'a TrackGains>) -> Self {
        self.gains = gains;
        self
    }

    /// Build the command for `title`.
    pub fn build(
        &self,
        title: &Title,
        audio: &[SelectedAudio],
        subtitles: &[SelectedSubtitle],
        is_bonus: bool,
    ) -> EncodeResult<EncodeCommand> {
        if !title.is_valid() {
            return Err(ScanError::invalid_title(title.number).into());
        }

        let (width, base_bitrate) = self.dimensions(title)?;
        let bitrate = if is_bonus {
            (base_bitrate as f64 * self.options.bonus_bitrate_scale).round() as u32
        } else {
            base_bitrate
        };

        let burn_in = title.supports_subtitle_scan() && subtitles.iter().any(|s| s.is_burnable());

        let plan = EncodePlan {
            title_number: title.number,
            width,
            bitrate,
            crop: self.options.effective_crop(title),
            burn_in,
            audio: audio.to_vec(),
            subtitles: subtitles.to_vec(),
        };

        let mut tokens = Vec::new();
        self.add_video_options(&mut tokens, &plan);
        self.add_picture_options(&mut tokens, title, &plan);
        self.add_audio_options(&mut tokens, &plan);
        self.add_subtitle_options(&mut tokens, &plan);

        tracing::debug!(
            "Built encoder command for title {} ({} tokens, {} kbps)",
            title.number,
            tokens.len(),
            bitrate
        );

        Ok(EncodeCommand { tokens, plan })
    }

    /// Target width and base bitrate.
    fn dimensions(&self, title: &Title) -> EncodeResult<(Option<u32>, u32)> {
        if title.pixel_width > SD_MAX_WIDTH {
            let width = self
                .width_override
                .or(self.options.hd_width)
                .unwrap_or(title.pixel_width);
            return Ok((Some(width), self.hd_bitrate(width)));
        }

        if AspectFamily::from_display_aspect(&title.display_aspect).is_none() {
            return Err(EncodeError::unsupported_aspect(
                title.number,
                &title.display_aspect,
            ));
        }
        Ok((None, self.options.bitrate_sd))
    }

    fn hd_bitrate(&self, width: u32) -> u32 {
        match width {
            w if w >= 1920 => self.options.bitrate_1080,
            w if w >= 1360 => self.options.bitrate_1360,
            w if w >= 1280 => self.options.bitrate_720,
            _ => self.options.bitrate_hd_low,
        }
    }

    fn add_video_options(&self, tokens: &mut Vec<String>, plan: &EncodePlan) {
        tokens.push("--encoder".to_string());
        tokens.push(self.options.encoder.clone());
        tokens.push("--vb".to_string());
        tokens.push(plan.bitrate.to_string());

        if self.options.two_pass {
            tokens.push("--two-pass".to_string());
            tokens.push("--turbo".to_string());
        }
        if let Some(ref tune) = self.options.tune {
            tokens.push("--encoder-tune".to_string());
            tokens.push(tune.clone());
        }
        if self.options.grayscale {
            tokens.push("--grayscale".to_string());
        }
    }

    fn add_picture_options(&self, tokens: &mut Vec<String>, title: &Title, plan: &EncodePlan) {
        tokens.push("--crop".to_string());
        tokens.push(plan.crop.to_arg());

        if let Some(width) = plan.width {
            tokens.push("--width".to_string());
            tokens.push(width.to_string());
            return;
        }

        tokens.push("--custom-anamorphic".to_string());
        match AspectFamily::from_display_aspect(&title.display_aspect) {
            Some(AspectFamily::Widescreen) => {
                tokens.push("--display-width".to_string());
                tokens.push(WIDESCREEN_DISPLAY_WIDTH.to_string());
            }
            Some(AspectFamily::Standard) => {
                tokens.push("--pixel-aspect".to_string());
                tokens.push(STANDARD_PIXEL_ASPECT.to_string());
            }
            // Rejected in dimensions()
            None => {}
        }
    }

    fn add_audio_options(&self, tokens: &mut Vec<String>, plan: &EncodePlan) {
        if plan.audio.is_empty() {
            return;
        }

        let orders: Vec<u32> = plan.audio.iter().map(|a| a.order()).collect();
        let count = orders.len();

        tokens.push("-a".to_string());
        tokens.push(join(orders.iter()));
        tokens.push("-A".to_string());
        tokens.push(join(plan.audio.iter().map(|a| escape_list_item(&a.name))));
        tokens.push("-E".to_string());
        tokens.push(vec![self.options.audio_codec.as_str(); count].join(","));
        tokens.push("-B".to_string());
        tokens.push(join(std::iter::repeat(self.options.audio_bitrate).take(count)));

        if let Some(gains) = self.gains {
            tokens.push("--gain".to_string());
            tokens.push(join(
                gains.in_order(&orders).iter().map(|g| format!("{:.1}", g)),
            ));
        }
    }

    fn add_subtitle_options(&self, tokens: &mut Vec<String>, plan: &EncodePlan) {
        if plan.subtitles.is_empty() {
            return;
        }

        let mut orders: Vec<String> = plan.subtitles.iter().map(|s| s.order().to_string()).collect();
        let mut names: Vec<String> = plan
            .subtitles
            .iter()
            .map(|s| escape_list_item(&s.name))
            .collect();
        if plan.burn_in {
            orders.insert(0, SUBTITLE_SCAN.to_string());
            names.insert(0, String::new());
        }

        tokens.push("-s".to_string());
        tokens.push(orders.join(","));
        tokens.push("--subname".to_string());
        tokens.push(names.join(","));

        if plan.burn_in {
            tokens.push("--subtitle-forced=1".to_string());
            tokens.push("--subtitle-burned=1".to_string());
        }
    }
}

/// Escape separators so a name stays one entry of a comma list.
fn escape_list_item(name: &str) -> String {
    name.replace('\\', "\\\\").replace(',', "\\,")
}

fn join<T: ToString>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AudioStream, Stream, SubtitleKind, SubtitleStream};

    fn hd_title(width: u32) -> Title {
        let mut title = Title::new(2);
        title.pixel_width = width;
        title.pixel_height = 1080;
        title.display_aspect = "1.78".to_string();
        title.autocrop = Crop::new(0, 0, 0, 0);
        title
    }

    fn sd_title(aspect: &str) -> Title {
        let mut title = Title::new(1);
        title.pixel_width = 720;
        title.pixel_height = 480;
        title.display_aspect = aspect.to_string();
        title.autocrop = Crop::new(2, 2, 0, 0);
        title
    }

    fn audio(order: u32, name: &str) -> SelectedAudio {
        SelectedAudio {
            stream: AudioStream::new(
                Stream::new(order).with_native_id(128 + order as i32).with_lang("eng"),
            ),
            name: name.to_string(),
        }
    }

    fn subtitle(order: u32, name: &str, kind: SubtitleKind) -> SelectedSubtitle {
        SelectedSubtitle {
            stream: SubtitleStream::new(
                Stream::new(order).with_native_id(order as i32).with_lang("eng"),
                kind,
            ),
            name: name.to_string(),
        }
    }

    fn value_after<'t>(tokens: &'t [String], flag: &str) -> Option<&'t str> {
        tokens
            .iter()
            .position(|t| t == flag)
            .and_then(|i| tokens.get(i + 1))
            .map(|s| s.as_str())
    }

    #[test]
    fn builds_1080_command() {
        let options = EncodeOptions::default();
        let cmd = EncodeCommandBuilder::new(&options)
            .build(&hd_title(1920), &[audio(1, "English")], &[], false)
            .unwrap();

        assert_eq!(value_after(&cmd.tokens, "--width"), Some("1920"));
        assert_eq!(value_after(&cmd.tokens, "--vb"), Some("4500"));
        assert_eq!(value_after(&cmd.tokens, "--encoder"), Some("x264"));
        assert_eq!(value_after(&cmd.tokens, "--crop"), Some("0:0:0:0"));
        assert!(cmd.tokens.contains(&"--two-pass".to_string()));
        assert!(!cmd.tokens.contains(&"--custom-anamorphic".to_string()));
        assert_eq!(cmd.plan.width, Some(1920));
    }

    #[test]
    fn width_override_selects_tier() {
        let mut options = EncodeOptions::default();
        options.hd_width = Some(1360);

        let global = EncodeCommandBuilder::new(&options)
            .build(&hd_title(1920), &[], &[], false)
            .unwrap();
        assert_eq!(global.plan.bitrate, 3500);

        let per_job = EncodeCommandBuilder::new(&options)
            .width_override(Some(1280))
            .build(&hd_title(1920), &[], &[], false)
            .unwrap();
        assert_eq!(value_after(&per_job.tokens, "--width"), Some("1280"));
        assert_eq!(per_job.plan.bitrate, 3000);

        let narrow = EncodeCommandBuilder::new(&options)
            .width_override(Some(960))
            .build(&hd_title(1920), &[], &[], false)
            .unwrap();
        assert_eq!(narrow.plan.bitrate, 2500);
    }

    #[test]
    fn widescreen_sd_is_anamorphic() {
        let options = EncodeOptions::default();
        let cmd = EncodeCommandBuilder::new(&options)
            .build(&sd_title("16x9"), &[], &[], false)
            .unwrap();

        assert!(cmd.tokens.contains(&"--custom-anamorphic".to_string()));
        assert_eq!(value_after(&cmd.tokens, "--display-width"), Some("854"));
        assert_eq!(value_after(&cmd.tokens, "--vb"), Some("1800"));
        assert_eq!(value_after(&cmd.tokens, "--crop"), Some("2:2:0:0"));
        assert_eq!(cmd.plan.width, None);
    }

    #[test]
    fn standard_sd_uses_pixel_aspect() {
        let options = EncodeOptions::default();
        let cmd = EncodeCommandBuilder::new(&options)
            .build(&sd_title("4:3"), &[], &[], false)
            .unwrap();

        assert_eq!(value_after(&cmd.tokens, "--pixel-aspect"), Some("8:9"));
        assert!(!cmd.tokens.contains(&"--display-width".to_string()));
    }

    #[test]
    fn unknown_sd_aspect_is_rejected() {
        let options = EncodeOptions::default();
        let result = EncodeCommandBuilder::new(&options).build(&sd_title("2.35"), &[], &[], false);

        match result {
            Err(EncodeError::UnsupportedAspect { title, aspect }) => {
                assert_eq!(title, 1);
                assert_eq!(aspect, "2.35");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn invalid_title_is_a_scan_error() {
        let options = EncodeOptions::default();
        let result = EncodeCommandBuilder::new(&options).build(&Title::new(5), &[], &[], false);

        assert!(matches!(
            result,
            Err(EncodeError::Scan(ScanError::InvalidTitle { number: 5 }))
        ));
    }

    #[test]
    fn bonus_bitrate_is_scaled() {
        let options = EncodeOptions::default();
        let cmd = EncodeCommandBuilder::new(&options)
            .build(&sd_title("1.78"), &[], &[], true)
            .unwrap();

        assert_eq!(cmd.plan.bitrate, 900);
    }

    #[test]
    fn video_flags_follow_options() {
        let mut options = EncodeOptions::default();
        options.two_pass = false;
        options.tune = Some("film".to_string());
        options.grayscale = true;

        let cmd = EncodeCommandBuilder::new(&options)
            .build(&hd_title(1920), &[], &[], false)
            .unwrap();

        assert!(!cmd.tokens.contains(&"--two-pass".to_string()));
        assert_eq!(value_after(&cmd.tokens, "--encoder-tune"), Some("film"));
        assert!(cmd.tokens.contains(&"--grayscale".to_string()));
    }

    #[test]
    fn audio_lists_share_order() {
        let options = EncodeOptions::default();
        let cmd = EncodeCommandBuilder::new(&options)
            .build(
                &hd_title(1920),
                &[audio(3, "Commentary 1 (eng)"), audio(1, "Main")],
                &[],
                false,
            )
            .unwrap();

        assert_eq!(value_after(&cmd.tokens, "-a"), Some("3,1"));
        assert_eq!(value_after(&cmd.tokens, "-A"), Some("Commentary 1 (eng),Main"));
        assert_eq!(value_after(&cmd.tokens, "-E"), Some("faac,faac"));
        assert_eq!(value_after(&cmd.tokens, "-B"), Some("160,160"));
        assert!(!cmd.tokens.contains(&"--gain".to_string()));
    }

    #[test]
    fn commas_in_names_are_escaped() {
        let subs = [subtitle(2, "Notes, Signs", SubtitleKind::ClosedCaption)];

        let options = EncodeOptions::default();
        let cmd = EncodeCommandBuilder::new(&options)
            .build(
                &hd_title(1920),
                &[audio(1, "Director, Writer"), audio(2, "Main")],
                &subs,
                false,
            )
            .unwrap();

        assert_eq!(value_after(&cmd.tokens, "-A"), Some("Director\\, Writer,Main"));
        assert_eq!(value_after(&cmd.tokens, "--subname"), Some("Notes\\, Signs"));
        assert_eq!(cmd.plan.audio[0].name, "Director, Writer");
    }

    #[test]
    fn gains_follow_audio_order() {
        let options = EncodeOptions::default();
        let gains = TrackGains::from_pairs([(1, -2.0), (3, -5.0)]);
        let cmd = EncodeCommandBuilder::new(&options)
            .gains(Some(&gains))
            .build(&hd_title(1920), &[audio(3, "A"), audio(1, "B")], &[], false)
            .unwrap();

        assert_eq!(value_after(&cmd.tokens, "--gain"), Some("-5.0,-2.0"));
    }

    #[test]
    fn burnable_subtitles_prepend_scan() {
        let mut title = hd_title(1920);
        title.subtitle_streams = vec![SubtitleStream::new(
            Stream::new(1).with_native_id(1),
            SubtitleKind::Vobsub,
        )];
        let subs = [
            subtitle(1, "English", SubtitleKind::Vobsub),
            subtitle(3, "CC", SubtitleKind::ClosedCaption),
        ];

        let options = EncodeOptions::default();
        let cmd = EncodeCommandBuilder::new(&options)
            .build(&title, &[], &subs, false)
            .unwrap();

        assert!(cmd.plan.burn_in);
        assert_eq!(value_after(&cmd.tokens, "-s"), Some("scan,1,3"));
        assert_eq!(value_after(&cmd.tokens, "--subname"), Some(",English,CC"));
        assert!(cmd.tokens.contains(&"--subtitle-burned=1".to_string()));
        assert!(cmd.tokens.contains(&"--subtitle-forced=1".to_string()));
    }

    #[test]
    fn text_only_title_keeps_soft_subtitles() {
        let subs = [subtitle(2, "CC", SubtitleKind::ClosedCaption)];

        let options = EncodeOptions::default();
        let cmd = EncodeCommandBuilder::new(&options)
            .build(&hd_title(1920), &[], &subs, false)
            .unwrap();

        assert!(!cmd.plan.burn_in);
        assert_eq!(value_after(&cmd.tokens, "-s"), Some("2"));
        assert_eq!(value_after(&cmd.tokens, "--subname"), Some("CC"));
        assert!(!cmd.tokens.iter().any(|t| t.starts_with("--subtitle-")));
    }
}
