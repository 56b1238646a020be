//! Command-line surface of the `omni` binary.

use std::path::PathBuf;

use anyhow::bail;
use clap::{Args, Parser, Subcommand, ValueEnum};
use omni_core::{
    Bitrate, Category, ConversionRequest, ImageQuality, QualityTier, Resolution, TargetFormat,
};

#[derive(Parser, Debug)]
#[command(name = "omni")]
#[command(about = "Credit-metered batch media conversion")]
#[command(version)]
pub struct Cli {
    /// Configuration file (RON); defaults to ./omni.ron when present
    #[arg(short, long, global = true, env = "OMNI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Signed-in identity; omit to use the guest balance
    #[arg(short, long, global = true, env = "OMNI_IDENTITY")]
    pub identity: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a batch of files to one target format
    Convert(ConvertArgs),
    /// Show the current credit balance
    Balance,
    /// List target formats and their per-file cost
    Formats,
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input files, converted in the order given
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Target format: mp4, webm, mp3, wav, png, jpg, webp, txt or srt
    #[arg(short = 't', long = "to")]
    pub target: TargetFormat,

    /// Video resolution
    #[arg(long, value_enum)]
    pub resolution: Option<ResolutionArg>,

    /// Video quality tier
    #[arg(long, value_enum)]
    pub quality: Option<QualityArg>,

    /// Audio bitrate in kbps
    #[arg(long, value_enum)]
    pub bitrate: Option<BitrateArg>,

    /// Image quality
    #[arg(long, value_enum)]
    pub image_quality: Option<ImageQualityArg>,

    /// Directory for converted files; overrides the config
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Skip the simulated processing delays
    #[arg(long)]
    pub instant: bool,

    /// Print the quote and exit without converting
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionArg {
    Source,
    #[value(name = "480p")]
    P480,
    #[value(name = "720p")]
    P720,
    #[value(name = "1080p")]
    P1080,
    #[value(name = "2160p", alias = "4k")]
    P2160,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityArg {
    Low,
    Medium,
    High,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitrateArg {
    #[value(name = "128")]
    Kbps128,
    #[value(name = "192")]
    Kbps192,
    #[value(name = "256")]
    Kbps256,
    #[value(name = "320")]
    Kbps320,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageQualityArg {
    Low,
    Medium,
    High,
    Lossless,
}

impl From<ResolutionArg> for Resolution {
    fn from(arg: ResolutionArg) -> Self {
        match arg {
            ResolutionArg::Source => Resolution::Source,
            ResolutionArg::P480 => Resolution::P480,
            ResolutionArg::P720 => Resolution::P720,
            ResolutionArg::P1080 => Resolution::P1080,
            ResolutionArg::P2160 => Resolution::P2160,
        }
    }
}

impl From<QualityArg> for QualityTier {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Low => QualityTier::Low,
            QualityArg::Medium => QualityTier::Medium,
            QualityArg::High => QualityTier::High,
        }
    }
}

impl From<BitrateArg> for Bitrate {
    fn from(arg: BitrateArg) -> Self {
        match arg {
            BitrateArg::Kbps128 => Bitrate::Kbps128,
            BitrateArg::Kbps192 => Bitrate::Kbps192,
            BitrateArg::Kbps256 => Bitrate::Kbps256,
            BitrateArg::Kbps320 => Bitrate::Kbps320,
        }
    }
}

impl From<ImageQualityArg> for ImageQuality {
    fn from(arg: ImageQualityArg) -> Self {
        match arg {
            ImageQualityArg::Low => ImageQuality::Low,
            ImageQualityArg::Medium => ImageQuality::Medium,
            ImageQualityArg::High => ImageQuality::High,
            ImageQualityArg::Lossless => ImageQuality::Lossless,
        }
    }
}

impl ConvertArgs {
    /// Builds the request for the chosen target, rejecting options that
    /// belong to another category.
    pub fn request(&self) -> anyhow::Result<ConversionRequest> {
        let mut request = ConversionRequest::for_target(self.target);
        let category = request.category();

        match &mut request {
            ConversionRequest::Video {
                resolution,
                quality,
                ..
            } => {
                if let Some(arg) = self.resolution {
                    *resolution = arg.into();
                }
                if let Some(arg) = self.quality {
                    *quality = arg.into();
                }
            }
            ConversionRequest::Audio { bitrate, .. } => {
                if let Some(arg) = self.bitrate {
                    *bitrate = arg.into();
                }
            }
            ConversionRequest::Image { quality, .. } => {
                if let Some(arg) = self.image_quality {
                    *quality = arg.into();
                }
            }
            ConversionRequest::Intelligence { .. } => {}
        }

        let misplaced = [
            ("--resolution", self.resolution.is_some(), Category::Video),
            ("--quality", self.quality.is_some(), Category::Video),
            ("--bitrate", self.bitrate.is_some(), Category::Audio),
            ("--image-quality", self.image_quality.is_some(), Category::Image),
        ]
        .into_iter()
        .find(|(_, given, owner)| *given && *owner != category);
        if let Some((flag, _, owner)) = misplaced {
            bail!("{flag} applies to {owner} targets, not {}", self.target);
        }

        Ok(request)
    }
}
