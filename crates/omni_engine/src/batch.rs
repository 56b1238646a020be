use tokio::sync::mpsc;

use omni_core::{ConversionRequest, FileEntry, OutputArtifact, ProgressState};

use crate::converter::{ConvertError, ProgressSink, UnitConverter};

/// Forwards converter progress into a channel drained by the driver.
pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<ProgressState>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::UnboundedSender<ProgressState>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, progress: ProgressState) {
        let _ = self.tx.send(progress);
    }
}

/// Converts one file, handing each progress update to `on_progress` while
/// the conversion is still running.
///
/// Every update emitted before the converter resolves is delivered before
/// this returns.
pub async fn convert_with_progress<F>(
    converter: &dyn UnitConverter,
    file: &FileEntry,
    request: &ConversionRequest,
    mut on_progress: F,
) -> Result<OutputArtifact, ConvertError>
where
    F: FnMut(ProgressState),
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let sink = ChannelProgressSink::new(tx);

    let result = {
        let mut conversion = converter.convert(file, request, &sink);
        loop {
            tokio::select! {
                biased;
                Some(progress) = rx.recv() => on_progress(progress),
                result = &mut conversion => break result,
            }
        }
    };

    while let Ok(progress) = rx.try_recv() {
        on_progress(progress);
    }
    result
}
