use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// Locate quoted sentences in a spoken-word recording and cut tight clips
/// for them via two-stage transcript alignment.
#[derive(Parser, Debug)]
#[command(name = "clipsnip", version, about, long_about = None)]
pub struct Cli {
    /// Activate debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Emit machine-readable JSON events instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Use an alternative config file
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate the coarse segment-level transcript for a recording
    Transcribe(TranscribeArgs),
    /// Find a sentence's coarse time span in a transcript
    Locate(LocateArgs),
    /// Refine a sentence's span inside a short clip using word timings
    Refine(RefineArgs),
    /// Cut a span out of a media file without re-encoding
    Cut(CutArgs),
    /// Run the full two-stage pipeline over all statement collections
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TranscribeArgs {
    /// Source video or audio file
    #[arg(value_hint = ValueHint::FilePath)]
    pub media: PathBuf,

    /// Workspace root for intermediate artifacts (default: ./intermediate)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub workdir: Option<PathBuf>,

    /// Re-generate the transcript even if cached
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LocateArgs {
    /// The sentence to look for (case- and punctuation-sensitive)
    pub sentence: String,

    /// Coarse transcript JSON file
    #[arg(short = 't', long = "transcript", value_hint = ValueHint::FilePath)]
    pub transcript: PathBuf,

    /// Safety margin in seconds around the located span
    #[arg(long)]
    pub margin: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct RefineArgs {
    /// The sentence to look for
    pub sentence: String,

    /// Short clip to transcribe at word level
    #[arg(value_hint = ValueHint::FilePath)]
    pub clip: PathBuf,

    /// Absolute start of the clip in the original recording; when given,
    /// the absolute span is printed alongside the clip-local one
    #[arg(long)]
    pub offset: Option<f64>,

    /// Language hint override for the transcription service
    #[arg(long)]
    pub language: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CutArgs {
    /// Input media file
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output clip path
    #[arg(short = 'o', long = "out", value_hint = ValueHint::FilePath)]
    pub out: PathBuf,

    /// Start time in seconds
    #[arg(long)]
    pub start: f64,

    /// End time in seconds
    #[arg(long)]
    pub end: f64,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Source recording the quotes were extracted from
    #[arg(value_hint = ValueHint::FilePath)]
    pub video: PathBuf,

    /// Directory of collection files (default: <workdir>/topic_collections)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub collections: Option<PathBuf>,

    /// How many statements to process concurrently
    #[arg(long, default_value_t = 1)]
    pub jobs: usize,

    /// Workspace root for intermediate artifacts (default: ./intermediate)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub workdir: Option<PathBuf>,

    /// Re-generate the coarse transcript even if cached
    #[arg(long)]
    pub force: bool,
}
