use std::fs;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::Utc;
use omni_core::{ConversionRequest, FileEntry, ProgressState, TargetFormat};
use omni_engine::{
    convert_with_progress, FailureKind, ProgressSink, SimulatedConverter, SimulationSettings,
    UnitConverter,
};
use tempfile::TempDir;

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<ProgressState>>>,
}

impl TestSink {
    fn take(&self) -> Vec<ProgressState> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, progress: ProgressState) {
        self.events.lock().unwrap().push(progress);
    }
}

fn instant(output_dir: Option<std::path::PathBuf>) -> SimulatedConverter {
    SimulatedConverter::new(SimulationSettings {
        delay_scale: 0.0,
        output_dir,
    })
}

fn clip() -> FileEntry {
    FileEntry::new("clip.final.mov", "video/quicktime", Utc::now(), Bytes::from_static(b"frames"))
}

#[tokio::test]
async fn conversion_reports_staged_progress_and_writes_output() {
    let temp = TempDir::new().unwrap();
    let converter = instant(Some(temp.path().to_path_buf()));
    let sink = TestSink::default();

    let artifact = converter
        .convert(&clip(), &ConversionRequest::for_target(TargetFormat::Mp4), &sink)
        .await
        .expect("conversion ok");

    assert_eq!(artifact.filename, "omni_clip.mp4");
    let written = temp.path().join("omni_clip.mp4");
    assert_eq!(artifact.reference, written.display().to_string());
    assert_eq!(fs::read(&written).unwrap(), b"frames");

    let progress = sink.take();
    let labels: Vec<_> = progress.iter().map(|p| p.step.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "Initializing Engine...",
            "Reading File Buffer...",
            "Encoding...",
            "Optimizing...",
            "Finalizing Output...",
            "Done",
        ]
    );
    let percentages: Vec<_> = progress.iter().map(|p| p.percentage).collect();
    assert_eq!(percentages, vec![10, 30, 40, 60, 95, 100]);
}

#[tokio::test]
async fn transcription_has_extra_stages_and_text_output() {
    let temp = TempDir::new().unwrap();
    let converter = instant(Some(temp.path().to_path_buf()));
    let sink = TestSink::default();

    let artifact = converter
        .convert(&clip(), &ConversionRequest::for_target(TargetFormat::Srt), &sink)
        .await
        .expect("transcription ok");

    assert_eq!(artifact.filename, "omni_clip.srt");
    let text = fs::read_to_string(temp.path().join("omni_clip.srt")).unwrap();
    assert!(text.starts_with("1\n00:00:00,000 --> "));
    assert!(text.contains("clip.final.mov"));

    let percentages: Vec<_> = sink.take().iter().map(|p| p.percentage).collect();
    assert_eq!(percentages, vec![10, 30, 40, 60, 80, 95, 100]);
}

#[tokio::test]
async fn in_memory_output_uses_memory_reference() {
    let converter = instant(None);
    let artifact = converter
        .convert(
            &clip(),
            &ConversionRequest::for_target(TargetFormat::Wav),
            &TestSink::default(),
        )
        .await
        .unwrap();
    assert_eq!(artifact.reference, "memory://omni_clip.wav");
}

#[tokio::test]
async fn empty_input_is_rejected_before_any_progress() {
    let converter = instant(None);
    let sink = TestSink::default();
    let empty = FileEntry::new("blank.mp3", "audio/mpeg", Utc::now(), Bytes::new());

    let err = converter
        .convert(&empty, &ConversionRequest::for_target(TargetFormat::Txt), &sink)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Processing);
    assert!(sink.take().is_empty());
}

#[tokio::test(start_paused = true)]
async fn default_pacing_follows_stage_timings() {
    let converter = SimulatedConverter::default();
    let started = tokio::time::Instant::now();
    converter
        .convert(
            &clip(),
            &ConversionRequest::for_target(TargetFormat::Webm),
            &TestSink::default(),
        )
        .await
        .unwrap();
    // 800 + 1200 + 2 * 1500 + 600 ms.
    assert_eq!(started.elapsed().as_millis(), 5600);
}

#[tokio::test]
async fn progress_is_forwarded_while_converting() {
    let converter = instant(None);
    let mut seen = Vec::new();
    let artifact = convert_with_progress(
        &converter,
        &clip(),
        &ConversionRequest::for_target(TargetFormat::Png),
        |progress| seen.push(progress.percentage),
    )
    .await
    .unwrap();

    assert_eq!(artifact.filename, "omni_clip.png");
    assert_eq!(seen, vec![10, 30, 40, 60, 95, 100]);
}

#[tokio::test]
async fn same_stem_inputs_get_distinct_outputs_on_disk() {
    let temp = TempDir::new().unwrap();
    let converter = instant(Some(temp.path().to_path_buf()));
    let request = ConversionRequest::for_target(TargetFormat::Mp4);
    let first = FileEntry::new("clip.mov", "video/quicktime", Utc::now(), Bytes::from_static(b"FIRST"));
    let second =
        FileEntry::new("b/clip.avi", "video/x-msvideo", Utc::now(), Bytes::from_static(b"SECOND"));

    let sink = TestSink::default();
    let a = converter.convert(&first, &request, &sink).await.unwrap();
    let b = converter.convert(&second, &request, &sink).await.unwrap();

    assert_eq!(a.filename, "omni_clip.mp4");
    assert_eq!(b.filename, "omni_clip-2.mp4");
    assert_ne!(a.reference, b.reference);
    assert_eq!(fs::read(&a.reference).unwrap(), b"FIRST");
    assert_eq!(fs::read(&b.reference).unwrap(), b"SECOND");
}

#[tokio::test]
async fn existing_output_file_is_left_untouched() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("omni_clip.wav"), b"earlier run").unwrap();
    let converter = instant(Some(temp.path().to_path_buf()));
    let request = ConversionRequest::for_target(TargetFormat::Wav);

    let artifact = converter.convert(&clip(), &request, &TestSink::default()).await.unwrap();

    assert_eq!(artifact.filename, "omni_clip-2.wav");
    assert_eq!(fs::read(temp.path().join("omni_clip.wav")).unwrap(), b"earlier run");
}

#[tokio::test]
async fn memory_references_are_not_reused() {
    let converter = instant(None);
    let request = ConversionRequest::for_target(TargetFormat::Jpg);
    let mut references = Vec::new();
    for _ in 0..3 {
        let artifact = converter.convert(&clip(), &request, &TestSink::default()).await.unwrap();
        references.push(artifact.reference);
    }
    assert_eq!(
        references,
        vec!["memory://omni_clip.jpg", "memory://omni_clip-2.jpg", "memory://omni_clip-3.jpg"]
    );
}

#[tokio::test]
async fn unreadable_media_type_is_rejected_before_any_progress() {
    let converter = instant(None);
    let sink = TestSink::default();
    let archive =
        FileEntry::new("notes.zip", "application/zip", Utc::now(), Bytes::from_static(b"PK"));

    let err = converter
        .convert(&archive, &ConversionRequest::for_target(TargetFormat::Mp3), &sink)
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::UnsupportedInput {
            media_type: "application/zip".to_string()
        }
    );
    assert!(sink.take().is_empty());
    assert!(SimulatedConverter::supports("Audio/MPEG"));
}
