//! Track selection.
//!
//! Resolves a job's requested audio and subtitle tracks against a scanned
//! title. Requests name tracks by their probe order; an empty request falls
//! back to the preferred-language policy.

use serde::Serialize;

use crate::config::SelectionSettings;
use crate::models::{AudioStream, SubtitleStream, Title, TrackSelection, TrackType};

/// An audio stream chosen for a job, with its name for this job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedAudio {
    pub stream: AudioStream,
    pub name: String,
}

impl SelectedAudio {
    pub fn order(&self) -> u32 {
        self.stream.stream.order
    }
}

/// A subtitle stream chosen for a job, with its name for this job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedSubtitle {
    pub stream: SubtitleStream,
    pub name: String,
}

impl SelectedSubtitle {
    pub fn order(&self) -> u32 {
        self.stream.stream.order
    }

    pub fn is_burnable(&self) -> bool {
        self.stream.is_burnable()
    }
}

/// A requested track the title does not have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingTrackWarning {
    pub title: u32,
    pub track_type: TrackType,
    pub track_number: u32,
}

impl std::fmt::Display for MissingTrackWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Title {} has no {} track {}, skipping it",
            self.title, self.track_type, self.track_number
        )
    }
}

/// Resolved tracks plus the requests that could not be honoured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<T> {
    pub tracks: Vec<T>,
    pub warnings: Vec<MissingTrackWarning>,
}

impl<T> Resolution<T> {
    fn new() -> Self {
        Self {
            tracks: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn missing(&mut self, title: &Title, track_type: TrackType, track_number: u32) {
        let warning = MissingTrackWarning {
            title: title.user_number,
            track_type,
            track_number,
        };
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// Picks tracks for a job.
#[derive(Debug, Clone)]
pub struct TrackSelector {
    lang: String,
    closed_captions_first: bool,
}

impl TrackSelector {
    pub fn new(settings: &SelectionSettings) -> Self {
        Self {
            lang: settings.lang.clone(),
            closed_captions_first: settings.closed_captions_first,
        }
    }

    pub fn resolve_audio(
        &self,
        title: &Title,
        selection: &TrackSelection,
    ) -> Resolution<SelectedAudio> {
        if selection.is_empty() {
            return Resolution {
                tracks: self.default_audio(title),
                warnings: Vec::new(),
            };
        }

        let mut resolution = Resolution::new();
        for request in selection.iter() {
            match title.audio_by_order(request.track_number) {
                Some(audio) => resolution.tracks.push(SelectedAudio {
                    stream: audio.clone(),
                    name: effective_name(&request.override_name, &audio.stream.name),
                }),
                None => resolution.missing(title, TrackType::Audio, request.track_number),
            }
        }
        resolution
    }

    pub fn resolve_subtitles(
        &self,
        title: &Title,
        selection: &TrackSelection,
    ) -> Resolution<SelectedSubtitle> {
        if selection.is_empty() {
            return Resolution {
                tracks: self.default_subtitles(title),
                warnings: Vec::new(),
            };
        }

        let mut resolution = Resolution::new();
        for request in selection.iter() {
            match title.subtitle_by_order(request.track_number) {
                Some(subtitle) => resolution.tracks.push(SelectedSubtitle {
                    stream: subtitle.clone(),
                    name: effective_name(&request.override_name, &subtitle.stream.name),
                }),
                None => resolution.missing(title, TrackType::Subtitles, request.track_number),
            }
        }
        resolution
    }

    /// Main track in the preferred language plus its commentaries.
    fn default_audio(&self, title: &Title) -> Vec<SelectedAudio> {
        let primary = title
            .audio_streams
            .iter()
            .find(|a| a.stream.language_code == self.lang)
            .or_else(|| {
                title
                    .audio_streams
                    .iter()
                    .find(|a| a.stream.language_code == "unknown")
            });

        let primary = match primary {
            Some(primary) => primary,
            None => {
                let Some(first) = title.audio_streams.first() else {
                    return Vec::new();
                };
                tracing::warn!(
                    "Title {} has no '{}' audio, using track {} ({})",
                    title.user_number,
                    self.lang,
                    first.stream.order,
                    first.stream.language_code
                );
                first
            }
        };

        let mut selected = vec![SelectedAudio {
            stream: primary.clone(),
            name: primary.stream.name.clone(),
        }];

        let commentaries = title.audio_streams.iter().filter(|a| {
            a.stream.order != primary.stream.order
                && a.stream.language_code == self.lang
                && a.stream.name.to_lowercase().contains("commentary")
        });
        for (index, audio) in commentaries.enumerate() {
            selected.push(SelectedAudio {
                stream: audio.clone(),
                name: format!("Commentary {} ({})", index + 1, self.lang),
            });
        }

        selected
    }

    /// Burnable preferred-language subtitles plus closed captions.
    fn default_subtitles(&self, title: &Title) -> Vec<SelectedSubtitle> {
        let mut selected: Vec<SelectedSubtitle> = title
            .subtitle_streams
            .iter()
            .filter(|s| s.stream.language_code == self.lang && s.is_burnable())
            .map(|s| SelectedSubtitle {
                stream: s.clone(),
                name: s.stream.name.clone(),
            })
            .collect();

        if let Some(cc) = title.closed_caption() {
            let cc = SelectedSubtitle {
                stream: cc.clone(),
                name: cc.stream.name.clone(),
            };
            if self.closed_captions_first {
                selected.insert(0, cc);
            } else {
                selected.push(cc);
            }
        }

        selected
    }
}

fn effective_name(override_name: &str, stream_name: &str) -> String {
    if override_name.is_empty() {
        stream_name.to_string()
    } else {
        override_name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Stream, SubtitleKind};

    fn audio(order: u32, lang: &str, name: &str) -> AudioStream {
        AudioStream::new(
            Stream::new(order)
                .with_native_id(order as i32)
                .with_lang(lang)
                .with_name(name),
        )
    }

    fn subtitle(order: u32, lang: &str, name: &str, kind: SubtitleKind) -> SubtitleStream {
        SubtitleStream::new(
            Stream::new(order)
                .with_native_id(order as i32)
                .with_lang(lang)
                .with_name(name),
            kind,
        )
    }

    fn selector(lang: &str, cc_first: bool) -> TrackSelector {
        TrackSelector::new(&SelectionSettings {
            lang: lang.to_string(),
            closed_captions_first: cc_first,
        })
    }

    fn sample_title() -> Title {
        let mut title = Title::new(1);
        title.audio_streams = vec![
            audio(1, "fre", "Francais"),
            audio(2, "eng", "English"),
            audio(3, "eng", "Director's Commentary"),
            audio(4, "fre", "Commentaire / Commentary"),
            audio(5, "eng", "Cast commentary"),
        ];
        title.subtitle_streams = vec![
            subtitle(1, "eng", "English", SubtitleKind::Vobsub),
            subtitle(2, "fre", "Francais", SubtitleKind::Vobsub),
            subtitle(3, "eng", "Closed Captions", SubtitleKind::ClosedCaption),
        ];
        title
    }

    #[test]
    fn default_audio_takes_language_match_and_commentaries() {
        let title = sample_title();
        let resolved = selector("eng", false).resolve_audio(&title, &TrackSelection::new());

        let orders: Vec<u32> = resolved.tracks.iter().map(|a| a.order()).collect();
        let names: Vec<&str> = resolved.tracks.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(orders, vec![2, 3, 5]);
        assert_eq!(
            names,
            vec!["English", "Commentary 1 (eng)", "Commentary 2 (eng)"]
        );
    }

    #[test]
    fn default_audio_falls_back_to_unknown_language() {
        let mut title = Title::new(1);
        title.audio_streams = vec![audio(1, "fre", "Francais"), audio(2, "unknown", "")];

        let resolved = selector("eng", false).resolve_audio(&title, &TrackSelection::new());
        assert_eq!(resolved.tracks.len(), 1);
        assert_eq!(resolved.tracks[0].order(), 2);
    }

    #[test]
    fn default_audio_falls_back_to_first_track() {
        let mut title = Title::new(1);
        title.audio_streams = vec![
            audio(1, "fre", "Francais"),
            audio(2, "spa", "Espanol"),
            audio(3, "fre", "Commentary"),
        ];

        let resolved = selector("eng", false).resolve_audio(&title, &TrackSelection::new());

        let orders: Vec<u32> = resolved.tracks.iter().map(|a| a.order()).collect();
        assert_eq!(orders, vec![1]);
        assert_eq!(resolved.tracks[0].name, "Francais");
    }

    #[test]
    fn default_audio_is_empty_without_streams() {
        let title = Title::new(1);
        let resolved = selector("eng", false).resolve_audio(&title, &TrackSelection::new());
        assert!(resolved.tracks.is_empty());
    }

    #[test]
    fn explicit_request_applies_override_and_skips_missing() {
        let title = sample_title();
        let selection = TrackSelection::from_pairs([(1, "Main"), (9, ""), (2, "")]);

        let resolved = selector("eng", false).resolve_audio(&title, &selection);

        let names: Vec<&str> = resolved.tracks.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Main", "English"]);
        assert_eq!(
            resolved.warnings,
            vec![MissingTrackWarning {
                title: 1,
                track_type: TrackType::Audio,
                track_number: 9,
            }]
        );
        // The title itself keeps its names
        assert_eq!(title.audio_streams[0].stream.name, "Francais");
    }

    #[test]
    fn default_subtitles_place_closed_captions_by_setting() {
        let title = sample_title();

        let last = selector("eng", false).resolve_subtitles(&title, &TrackSelection::new());
        let orders: Vec<u32> = last.tracks.iter().map(|s| s.order()).collect();
        assert_eq!(orders, vec![1, 3]);

        let first = selector("eng", true).resolve_subtitles(&title, &TrackSelection::new());
        let orders: Vec<u32> = first.tracks.iter().map(|s| s.order()).collect();
        assert_eq!(orders, vec![3, 1]);
    }

    #[test]
    fn default_subtitles_empty_without_matches() {
        let mut title = Title::new(1);
        title.subtitle_streams = vec![subtitle(1, "fre", "Francais", SubtitleKind::Vobsub)];

        let resolved = selector("eng", false).resolve_subtitles(&title, &TrackSelection::new());
        assert!(resolved.tracks.is_empty());
    }

    #[test]
    fn missing_subtitle_warning_names_track_type() {
        let title = sample_title();
        let selection = TrackSelection::from_pairs([(4, "")]);

        let resolved = selector("eng", false).resolve_subtitles(&title, &selection);
        assert!(resolved.tracks.is_empty());
        assert_eq!(
            resolved.warnings[0].to_string(),
            "Title 1 has no subtitles track 4, skipping it"
        );
    }
}
