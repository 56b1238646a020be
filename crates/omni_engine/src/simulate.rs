use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use omni_logging::omni_debug;

use omni_core::{ConversionRequest, FileEntry, OutputArtifact, ProgressState, TargetFormat};

use crate::converter::{ConvertError, FailureKind, ProgressSink, UnitConverter};
use crate::filename::{numbered_filename, output_filename};
use crate::persist::AtomicFileWriter;

#[derive(Debug, Clone)]
pub struct SimulationSettings {
    /// Multiplier on the built-in stage timings; `0.0` disables waiting.
    pub delay_scale: f32,
    /// Where outputs are written. `None` keeps them in memory only.
    pub output_dir: Option<PathBuf>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            delay_scale: 1.0,
            output_dir: None,
        }
    }
}

/// Media type families the engine can read.
const SUPPORTED_INPUTS: [&str; 3] = ["video/", "audio/", "image/"];

/// Stand-in converter that walks through the engine stages with realistic
/// pacing and writes a placeholder output.
///
/// Output names are never reused: a name already taken on disk, or already
/// handed out as a `memory://` reference, gets a `-2`, `-3`, ... suffix.
#[derive(Debug, Clone, Default)]
pub struct SimulatedConverter {
    settings: SimulationSettings,
    memory_names: Arc<Mutex<HashSet<String>>>,
}

impl SimulatedConverter {
    pub fn new(settings: SimulationSettings) -> Self {
        Self {
            settings,
            memory_names: Arc::default(),
        }
    }

    pub fn supports(media_type: &str) -> bool {
        let media_type = media_type.to_ascii_lowercase();
        SUPPORTED_INPUTS
            .iter()
            .any(|family| media_type.starts_with(family))
    }

    /// Per-file stages as `(percentage, label, base delay in ms)`.
    pub fn stages(request: &ConversionRequest) -> Vec<(u8, &'static str, u64)> {
        let mut stages = vec![
            (10, "Initializing Engine...", 800),
            (30, "Reading File Buffer...", 1200),
        ];
        let work: &[&'static str] = if request.is_transcription() {
            &["Analyzing Audio...", "Translating Speech...", "Formatting Text..."]
        } else {
            &["Encoding...", "Optimizing..."]
        };
        for (i, label) in work.iter().enumerate() {
            stages.push((40 + 20 * i as u8, *label, 1500));
        }
        stages.push((95, "Finalizing Output...", 600));
        stages
    }

    async fn pause(&self, base_ms: u64) {
        if self.settings.delay_scale > 0.0 {
            let scaled = (base_ms as f64 * f64::from(self.settings.delay_scale)).round();
            tokio::time::sleep(Duration::from_millis(scaled as u64)).await;
        }
    }

    /// Stores `content` and returns the final `(filename, reference)`.
    async fn write_output(
        &self,
        filename: &str,
        content: Bytes,
    ) -> Result<(String, String), ConvertError> {
        let Some(dir) = self.settings.output_dir.clone() else {
            let name = self.claim_memory_name(filename);
            let reference = format!("memory://{name}");
            return Ok((name, reference));
        };
        let writer = AtomicFileWriter::new(dir);
        let name = filename.to_string();
        let written = tokio::task::spawn_blocking(move || writer.write_new(&name, &content))
            .await
            .map_err(|err| ConvertError::new(FailureKind::Output, err.to_string()))?
            .map_err(|err| ConvertError::new(FailureKind::Output, err.to_string()))?;
        let name = written
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_string());
        Ok((name, written.display().to_string()))
    }

    fn claim_memory_name(&self, filename: &str) -> String {
        let mut issued = self
            .memory_names
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut variant = 1;
        loop {
            let candidate = numbered_filename(filename, variant);
            if issued.insert(candidate.clone()) {
                return candidate;
            }
            variant += 1;
        }
    }
}

#[async_trait::async_trait]
impl UnitConverter for SimulatedConverter {
    async fn convert(
        &self,
        file: &FileEntry,
        request: &ConversionRequest,
        sink: &dyn ProgressSink,
    ) -> Result<OutputArtifact, ConvertError> {
        if !Self::supports(file.media_type()) {
            return Err(ConvertError::new(
                FailureKind::UnsupportedInput {
                    media_type: file.media_type().to_string(),
                },
                format!("{} cannot be read", file.name()),
            ));
        }
        if file.data().is_empty() {
            return Err(ConvertError::new(
                FailureKind::Processing,
                format!("{} is empty", file.name()),
            ));
        }

        for (percentage, label, delay_ms) in Self::stages(request) {
            sink.emit(ProgressState::new(percentage, label));
            self.pause(delay_ms).await;
        }

        let target = request.target();
        let content = placeholder_output(file, target);
        let (filename, reference) = self
            .write_output(&output_filename(file.name(), target), content)
            .await?;
        sink.emit(ProgressState::new(100, "Done"));
        omni_debug!("Simulated {} -> {}", file.name(), reference);

        Ok(OutputArtifact {
            reference,
            filename,
        })
    }
}

fn placeholder_output(file: &FileEntry, target: TargetFormat) -> Bytes {
    match target {
        TargetFormat::Txt => Bytes::from(format!("[transcript of {}]\n", file.name())),
        TargetFormat::Srt => Bytes::from(format!(
            "1\n00:00:00,000 --> 00:00:05,000\n[transcript of {}]\n",
            file.name()
        )),
        _ => file.data().clone(),
    }
}
