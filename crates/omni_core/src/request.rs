use std::fmt;
use std::str::FromStr;

/// Media category a target format belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Video,
    Audio,
    Image,
    Intelligence,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Video => write!(f, "video"),
            Category::Audio => write!(f, "audio"),
            Category::Image => write!(f, "image"),
            Category::Intelligence => write!(f, "intelligence"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoFormat {
    Mp4,
    Webm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Mp3,
    Wav,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpg,
    Webp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscriptFormat {
    Txt,
    Srt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Resolution {
    #[default]
    Source,
    P480,
    P720,
    P1080,
    P2160,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Bitrate {
    Kbps128,
    #[default]
    Kbps192,
    Kbps256,
    Kbps320,
}

impl Bitrate {
    pub fn kbps(self) -> u32 {
        match self {
            Bitrate::Kbps128 => 128,
            Bitrate::Kbps192 => 192,
            Bitrate::Kbps256 => 256,
            Bitrate::Kbps320 => 320,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageQuality {
    Low,
    Medium,
    #[default]
    High,
    Lossless,
}

/// Flat identifier of every output format the workflow can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    Mp4,
    Webm,
    Mp3,
    Wav,
    Png,
    Jpg,
    Webp,
    Txt,
    Srt,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 9] = [
        TargetFormat::Mp4,
        TargetFormat::Webm,
        TargetFormat::Mp3,
        TargetFormat::Wav,
        TargetFormat::Png,
        TargetFormat::Jpg,
        TargetFormat::Webp,
        TargetFormat::Txt,
        TargetFormat::Srt,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Mp4 => "mp4",
            TargetFormat::Webm => "webm",
            TargetFormat::Mp3 => "mp3",
            TargetFormat::Wav => "wav",
            TargetFormat::Png => "png",
            TargetFormat::Jpg => "jpg",
            TargetFormat::Webp => "webp",
            TargetFormat::Txt => "txt",
            TargetFormat::Srt => "srt",
        }
    }

    pub fn category(self) -> Category {
        match self {
            TargetFormat::Mp4 | TargetFormat::Webm => Category::Video,
            TargetFormat::Mp3 | TargetFormat::Wav => Category::Audio,
            TargetFormat::Png | TargetFormat::Jpg | TargetFormat::Webp => Category::Image,
            TargetFormat::Txt | TargetFormat::Srt => Category::Intelligence,
        }
    }

    /// Text and subtitle outputs are produced by transcription.
    pub fn is_transcription(self) -> bool {
        matches!(self, TargetFormat::Txt | TargetFormat::Srt)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFormat(pub String);

impl fmt::Display for UnknownFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown target format {:?}", self.0)
    }
}

impl std::error::Error for UnknownFormat {}

impl FromStr for TargetFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.');
        TargetFormat::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

/// The operation applied uniformly to every file of a batch.
///
/// Options are keyed by category so that, for example, an audio bitrate can
/// never be attached to a video target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionRequest {
    Video {
        format: VideoFormat,
        resolution: Resolution,
        quality: QualityTier,
    },
    Audio {
        format: AudioFormat,
        bitrate: Bitrate,
    },
    Image {
        format: ImageFormat,
        quality: ImageQuality,
    },
    Intelligence {
        format: TranscriptFormat,
    },
}

impl ConversionRequest {
    /// Request for `target` with the category's default options.
    pub fn for_target(target: TargetFormat) -> Self {
        match target {
            TargetFormat::Mp4 => Self::video(VideoFormat::Mp4),
            TargetFormat::Webm => Self::video(VideoFormat::Webm),
            TargetFormat::Mp3 => Self::audio(AudioFormat::Mp3),
            TargetFormat::Wav => Self::audio(AudioFormat::Wav),
            TargetFormat::Png => Self::image(ImageFormat::Png),
            TargetFormat::Jpg => Self::image(ImageFormat::Jpg),
            TargetFormat::Webp => Self::image(ImageFormat::Webp),
            TargetFormat::Txt => ConversionRequest::Intelligence {
                format: TranscriptFormat::Txt,
            },
            TargetFormat::Srt => ConversionRequest::Intelligence {
                format: TranscriptFormat::Srt,
            },
        }
    }

    fn video(format: VideoFormat) -> Self {
        ConversionRequest::Video {
            format,
            resolution: Resolution::default(),
            quality: QualityTier::default(),
        }
    }

    fn audio(format: AudioFormat) -> Self {
        ConversionRequest::Audio {
            format,
            bitrate: Bitrate::default(),
        }
    }

    fn image(format: ImageFormat) -> Self {
        ConversionRequest::Image {
            format,
            quality: ImageQuality::default(),
        }
    }

    pub fn target(&self) -> TargetFormat {
        match *self {
            ConversionRequest::Video { format, .. } => match format {
                VideoFormat::Mp4 => TargetFormat::Mp4,
                VideoFormat::Webm => TargetFormat::Webm,
            },
            ConversionRequest::Audio { format, .. } => match format {
                AudioFormat::Mp3 => TargetFormat::Mp3,
                AudioFormat::Wav => TargetFormat::Wav,
            },
            ConversionRequest::Image { format, .. } => match format {
                ImageFormat::Png => TargetFormat::Png,
                ImageFormat::Jpg => TargetFormat::Jpg,
                ImageFormat::Webp => TargetFormat::Webp,
            },
            ConversionRequest::Intelligence { format } => match format {
                TranscriptFormat::Txt => TargetFormat::Txt,
                TranscriptFormat::Srt => TargetFormat::Srt,
            },
        }
    }

    pub fn category(&self) -> Category {
        match self {
            ConversionRequest::Video { .. } => Category::Video,
            ConversionRequest::Audio { .. } => Category::Audio,
            ConversionRequest::Image { .. } => Category::Image,
            ConversionRequest::Intelligence { .. } => Category::Intelligence,
        }
    }

    /// Selects the transcription cost tier; there is no separate code path.
    pub fn is_transcription(&self) -> bool {
        self.target().is_transcription()
    }
}
