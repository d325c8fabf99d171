//! Sync data generation.
//!
//! Cuts one section out of a release whose subtitle is already timed, then
//! stores what synchronization needs later: the section's fingerprints, its
//! subtitle (trimmed to the section and pointed at the stored media) and any
//! attachments.

use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{PipelineError, PipelineResult};
use crate::config::Settings;
use crate::fingerprint::FingerprintSource;
use crate::keyframes::{format_keyframes_file, plan_cut, CutConfig, CutPlan};
use crate::media::{MediaBackend, MediaError};
use crate::store::{self, SectionPaths};
use crate::subtitles::{self, retain_section_dialogue, tag_section_metadata, AssDocument};

/// Input of [`generate_sync_data`].
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Release the section is cut from.
    pub source: PathBuf,
    /// Subtitle timed against `source`. When absent the first subtitle
    /// stream of the cut media is used.
    pub subtitle: Option<PathBuf>,
    /// Stored instead when the section has too little dialogue.
    pub template: Option<PathBuf>,
    /// Section id; the next free number when absent.
    pub name: Option<String>,
    pub data_dir: PathBuf,
    /// Section start in seconds (default 0).
    pub start: Option<f64>,
    /// Section end in seconds (default: source duration).
    pub end: Option<f64>,
    /// Don't write the Aegisub keyframes file.
    pub skip_keyframes: bool,
}

impl GenerateRequest {
    pub fn new(source: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            subtitle: None,
            template: None,
            name: None,
            data_dir: data_dir.into(),
            start: None,
            end: None,
            skip_keyframes: false,
        }
    }
}

/// What ended up in the section's subtitle file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtitleOutcome {
    /// The cut subtitle had enough dialogue and was stored.
    Stored { entries: usize },
    /// The template was stored in its place.
    Template,
    /// Nothing usable; the section is skipped by synchronization.
    Missing,
}

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub id: String,
    pub plan: CutPlan,
    /// Section end in source time.
    pub end: f64,
    /// Media the section was fingerprinted from.
    pub media: PathBuf,
    pub fingerprint_count: usize,
    pub keyframes_file: Option<PathBuf>,
    pub subtitle: SubtitleOutcome,
    pub attachments: Vec<PathBuf>,
}

/// Cut a section of `request.source` and store its sync data.
pub fn generate_sync_data(
    request: &GenerateRequest,
    backend: &dyn MediaBackend,
    fingerprinter: &dyn FingerprintSource,
    settings: &Settings,
) -> PipelineResult<GenerateOutcome> {
    let source = request.source.as_path();
    if !source.exists() {
        return Err(MediaError::SourceNotFound(source.to_path_buf()).into());
    }

    let id = match &request.name {
        Some(name) => {
            fs::create_dir_all(&request.data_dir)
                .map_err(|e| PipelineError::io(&request.data_dir, e))?;
            name.clone()
        }
        None => store::next_section_id(&request.data_dir)?.to_string(),
    };
    let paths = SectionPaths::new(&request.data_dir, id.as_str());

    let info = backend.probe(source)?;
    let start = request.start.unwrap_or(0.0);
    let end = request.end.unwrap_or(info.duration_secs);
    if end <= start {
        return Err(PipelineError::EmptySection { start, end });
    }

    let keyframes = if info.has_video {
        backend.list_keyframes(source, start)?
    } else {
        Vec::new()
    };
    let plan = plan_cut(start, &keyframes, info.has_video, &CutConfig::from(&settings.extraction));

    let media = if plan.can_use_source() {
        source.to_path_buf()
    } else {
        let output = paths.media();
        tracing::info!("Cutting section '{}' from {:.3}s to {:.3}s", id, plan.start, end);
        backend.cut(source, plan.start, end, plan.needs_reencode, &output)?;
        output
    };

    let fingerprints = fingerprinter.fingerprint_file(&media)?;
    store::write_fingerprints(&paths.fingerprints(), &fingerprints)?;
    tracing::info!("Stored {} fingerprints for section '{}'", fingerprints.len(), id);

    let keyframes_file = if info.has_video
        && !request.skip_keyframes
        && settings.extraction.write_keyframes_file
    {
        let fps = backend.frame_rate(&media)?;
        let scenes = backend.scene_changes(&media, settings.extraction.scene_threshold)?;
        let path = paths.keyframes();
        fs::write(&path, format_keyframes_file(&scenes, fps))
            .map_err(|e| PipelineError::io(&path, e))?;
        Some(path)
    } else {
        None
    };

    let subtitle_path = paths.subtitle();
    let extracted = match &request.subtitle {
        Some(subtitle) => {
            let window = (plan.media_start(), end);
            backend.extract_subtitle(subtitle, Some(window), &subtitle_path)?
        }
        None => backend.extract_subtitle(&media, None, &subtitle_path)?,
    };

    let media_ref = if media == paths.media() {
        format!("{}.mkv", id)
    } else {
        fs::canonicalize(&media)
            .unwrap_or_else(|_| media.clone())
            .display()
            .to_string()
    };

    let cut = if extracted && subtitle_path.is_file() {
        section_subtitle(&subtitle_path, end - start, settings)?
    } else {
        None
    };

    let (subtitle, attachments) = match cut {
        Some((mut doc, entries)) => {
            tag_section_metadata(&mut doc, &id, &media_ref, info.has_video);
            subtitles::write_file(&doc, &subtitle_path)?;
            let attachments = collect_attachments(backend, &media, &paths.attachments_dir())?;
            (SubtitleOutcome::Stored { entries }, attachments)
        }
        None => match &request.template {
            Some(template) => {
                tracing::info!("Using template {} for section '{}'", template.display(), id);
                let mut doc = subtitles::parse_file(template)?;
                tag_section_metadata(&mut doc, &id, &media_ref, info.has_video);
                subtitles::write_file(&doc, &subtitle_path)?;
                (SubtitleOutcome::Template, Vec::new())
            }
            None => {
                tracing::warn!("Section '{}' has no usable subtitle", id);
                (SubtitleOutcome::Missing, Vec::new())
            }
        },
    };

    Ok(GenerateOutcome {
        id,
        plan,
        end,
        media,
        fingerprint_count: fingerprints.len(),
        keyframes_file,
        subtitle,
        attachments,
    })
}

/// Trim the extracted subtitle to the section. `None` when too little
/// dialogue is left for it to be worth storing.
fn section_subtitle(
    path: &Path,
    duration: f64,
    settings: &Settings,
) -> PipelineResult<Option<(AssDocument, usize)>> {
    let mut doc = subtitles::parse_file(path)?;
    let required = settings.extraction.min_dialogue_events as usize;

    match retain_section_dialogue(&mut doc, duration) {
        Some(entries) if entries > required => Ok(Some((doc, entries))),
        Some(entries) => {
            tracing::warn!(
                "Subtitle {} keeps only {} events, need more than {}",
                path.display(),
                entries,
                required
            );
            Ok(None)
        }
        None => {
            tracing::warn!("Subtitle {} has no events section", path.display());
            Ok(None)
        }
    }
}

/// Dump attachments into `dir`, removing it again when nothing was dumped.
fn collect_attachments(
    backend: &dyn MediaBackend,
    media: &Path,
    dir: &Path,
) -> PipelineResult<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
    backend.dump_attachments(media, dir)?;

    let files = store::list_attachments(dir)?;
    if files.is_empty() {
        if let Err(e) = fs::remove_dir(dir) {
            tracing::debug!("Keeping attachment dir {}: {}", dir.display(), e);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{Fingerprint, FingerprintSequence};
    use crate::media::{MediaInfo, MediaResult};
    use crate::timestamp::format_timestamp;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct FakeMedia {
        info: MediaInfo,
        keyframes: Vec<f64>,
        subtitle: Option<String>,
        attachments: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeMedia {
        fn new(duration_secs: f64, has_video: bool) -> Self {
            Self {
                info: MediaInfo {
                    duration_secs,
                    has_video,
                },
                keyframes: Vec::new(),
                subtitle: None,
                attachments: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MediaBackend for FakeMedia {
        fn probe(&self, _path: &Path) -> MediaResult<MediaInfo> {
            Ok(self.info)
        }

        fn list_keyframes(&self, _path: &Path, _around: f64) -> MediaResult<Vec<f64>> {
            Ok(self.keyframes.clone())
        }

        fn cut(&self, _source: &Path, start: f64, end: f64, reencode: bool, output: &Path) -> MediaResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("cut {:.2} {:.2} {}", start, end, reencode));
            fs::write(output, b"media")?;
            Ok(())
        }

        fn extract_subtitle(&self, _input: &Path, window: Option<(f64, f64)>, output: &Path) -> MediaResult<bool> {
            let label = match window {
                Some((start, end)) => format!("subtitle {:.2}-{:.2}", start, end),
                None => "subtitle embedded".to_string(),
            };
            self.calls.lock().unwrap().push(label);
            match &self.subtitle {
                Some(content) => {
                    fs::write(output, content)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        fn dump_attachments(&self, _media: &Path, dir: &Path) -> MediaResult<()> {
            for name in &self.attachments {
                fs::write(dir.join(name), b"font")?;
            }
            Ok(())
        }

        fn frame_rate(&self, _path: &Path) -> MediaResult<f64> {
            Ok(24.0)
        }

        fn scene_changes(&self, _path: &Path, _threshold: f64) -> MediaResult<Vec<f64>> {
            Ok(vec![1.0, 2.5])
        }
    }

    struct FakeFingerprints;

    impl FingerprintSource for FakeFingerprints {
        fn timing_factor(&self) -> f64 {
            0.1
        }

        fn fingerprint_file(&self, _path: &Path) -> Result<FingerprintSequence, MediaError> {
            Ok((0..5).map(|i| Fingerprint::new(i, i + 100)).collect())
        }
    }

    fn script(title: &str, events: usize) -> String {
        let mut s = format!(
            "[Script Info]\nTitle: {}\nScriptType: v4.00+\n\n[V4+ Styles]\n\
             Format: Name, Fontname, Fontsize\nStyle: Default,Arial,20\n\n[Events]\n\
             Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n",
            title
        );
        for i in 0..events {
            s.push_str(&format!(
                "Dialogue: 0,{},{},Default,,0,0,0,,line {}\n",
                format_timestamp(i as f64),
                format_timestamp(i as f64 + 0.5),
                i
            ));
        }
        s
    }

    fn setup() -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.mkv");
        fs::write(&source, b"source").unwrap();
        (dir, source)
    }

    #[test]
    fn audio_only_source_is_used_directly() {
        let (dir, source) = setup();
        let data_dir = dir.path().join("data");
        let mut media = FakeMedia::new(100.0, false);
        media.subtitle = Some(script("Source", 12));

        let request = GenerateRequest::new(&source, &data_dir);
        let outcome =
            generate_sync_data(&request, &media, &FakeFingerprints, &Settings::default()).unwrap();

        assert_eq!(outcome.id, "1");
        assert_eq!(outcome.media, source);
        assert_eq!(outcome.subtitle, SubtitleOutcome::Stored { entries: 13 });
        assert_eq!(media.calls(), ["subtitle embedded"]);
        assert!(outcome.keyframes_file.is_none());

        let paths = SectionPaths::new(&data_dir, "1");
        assert_eq!(store::read_fingerprints(&paths.fingerprints()).unwrap().len(), 5);
        assert!(!paths.attachments_dir().exists());

        let stored = subtitles::parse_file(paths.subtitle()).unwrap();
        assert_eq!(stored.section("Script Info").unwrap().get("Title"), Some("1"));
        let project = stored.section("Aegisub Project Garbage").unwrap();
        let canonical = fs::canonicalize(&source).unwrap();
        assert_eq!(project.get("Audio File"), Some(canonical.display().to_string().as_str()));
        assert_eq!(project.get("Video File"), None);
    }

    #[test]
    fn video_section_is_cut_on_keyframe() {
        let (dir, source) = setup();
        let data_dir = dir.path().join("data");
        let subtitle = dir.path().join("source.ass");
        fs::write(&subtitle, "unused").unwrap();

        let mut media = FakeMedia::new(100.0, true);
        media.keyframes = vec![10.0, 20.0, 30.0];
        media.subtitle = Some(script("Source", 12));
        media.attachments = vec!["font.ttf"];

        let mut request = GenerateRequest::new(&source, &data_dir);
        request.subtitle = Some(subtitle);
        request.start = Some(21.0);
        request.end = Some(60.0);
        let outcome =
            generate_sync_data(&request, &media, &FakeFingerprints, &Settings::default()).unwrap();

        assert!(!outcome.plan.needs_reencode);
        assert_eq!(media.calls(), ["cut 23.33 60.00 false", "subtitle 23.33-60.00"]);

        let paths = SectionPaths::new(&data_dir, "1");
        assert_eq!(outcome.media, paths.media());
        assert_eq!(
            fs::read_to_string(paths.keyframes()).unwrap(),
            "# keyframe format v1\r\nfps 0\r\n24\r\n60\r\n"
        );
        assert_eq!(outcome.attachments, vec![paths.attachments_dir().join("font.ttf")]);

        let stored = subtitles::parse_file(paths.subtitle()).unwrap();
        let project = stored.section("Aegisub Project Garbage").unwrap();
        assert_eq!(project.get("Video File"), Some("1.mkv"));
        assert_eq!(project.get("Keyframes File"), Some("1-keyframes.txt"));
    }

    #[test]
    fn uncut_video_keeps_subtitle_at_source_start() {
        let (dir, source) = setup();
        let subtitle = dir.path().join("source.ass");
        fs::write(&subtitle, "unused").unwrap();

        let mut media = FakeMedia::new(100.0, true);
        media.keyframes = vec![0.0, 1.0, 2.0];
        media.subtitle = Some(script("Source", 12));

        let mut request = GenerateRequest::new(&source, dir.path());
        request.subtitle = Some(subtitle);
        request.end = Some(60.0);
        request.skip_keyframes = true;
        let outcome =
            generate_sync_data(&request, &media, &FakeFingerprints, &Settings::default()).unwrap();

        assert!(outcome.plan.can_use_source());
        assert!(outcome.plan.start > 0.0);
        assert_eq!(outcome.media, source);
        assert_eq!(media.calls(), ["subtitle 0.00-60.00"]);
    }

    #[test]
    fn distant_keyframe_forces_reencode() {
        let (dir, source) = setup();
        let mut media = FakeMedia::new(100.0, true);
        media.keyframes = vec![10.0, 50.0];

        let mut request = GenerateRequest::new(&source, dir.path());
        request.name = Some("ed".to_string());
        request.start = Some(20.0);
        request.end = Some(60.0);
        request.skip_keyframes = true;
        let outcome =
            generate_sync_data(&request, &media, &FakeFingerprints, &Settings::default()).unwrap();

        assert_eq!(outcome.id, "ed");
        assert!(outcome.plan.needs_reencode);
        assert_eq!(media.calls()[0], "cut 20.00 60.00 true");
        assert!(outcome.keyframes_file.is_none());
        assert_eq!(outcome.subtitle, SubtitleOutcome::Missing);
        assert!(!SectionPaths::new(dir.path(), "ed").subtitle().exists());
    }

    #[test]
    fn short_subtitle_falls_back_to_template() {
        let (dir, source) = setup();
        let template = dir.path().join("template.ass");
        fs::write(&template, script("Template", 0)).unwrap();

        let mut media = FakeMedia::new(100.0, false);
        media.subtitle = Some(script("Source", 10));

        let mut request = GenerateRequest::new(&source, dir.path());
        request.template = Some(template);
        let outcome =
            generate_sync_data(&request, &media, &FakeFingerprints, &Settings::default()).unwrap();

        assert_eq!(outcome.subtitle, SubtitleOutcome::Template);
        let stored = subtitles::parse_file(SectionPaths::new(dir.path(), "1").subtitle()).unwrap();
        assert_eq!(stored.section("Script Info").unwrap().get("Title"), Some("1"));
        assert_eq!(stored.dialogue().count(), 0);
    }

    #[test]
    fn dialogue_past_section_end_does_not_count() {
        let (dir, source) = setup();
        let mut media = FakeMedia::new(100.0, false);
        media.subtitle = Some(script("Source", 20));

        let mut request = GenerateRequest::new(&source, dir.path());
        request.end = Some(10.5);
        let outcome =
            generate_sync_data(&request, &media, &FakeFingerprints, &Settings::default()).unwrap();

        // Events start at 0..=10 inside the section: 11 lines plus Format.
        assert_eq!(outcome.subtitle, SubtitleOutcome::Stored { entries: 12 });
    }

    #[test]
    fn empty_range_is_rejected() {
        let (dir, source) = setup();
        let media = FakeMedia::new(100.0, false);

        let mut request = GenerateRequest::new(&source, dir.path());
        request.start = Some(50.0);
        request.end = Some(40.0);
        let err = generate_sync_data(&request, &media, &FakeFingerprints, &Settings::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptySection { .. }));
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = tempdir().unwrap();
        let media = FakeMedia::new(100.0, false);
        let request = GenerateRequest::new(dir.path().join("absent.mkv"), dir.path());

        let err = generate_sync_data(&request, &media, &FakeFingerprints, &Settings::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Media(MediaError::SourceNotFound(_))));
    }
}
