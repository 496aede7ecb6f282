//! ffmpeg/ffprobe wrappers for audio extraction and clip cutting.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use crate::align::Span;
use crate::ui::{Level, emit};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("{tool} failed for {input}: {detail}")]
    CommandFailed {
        tool: &'static str,
        input: PathBuf,
        detail: String,
    },

    #[error("Failed to launch {tool}: {source}")]
    Launch {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {tool} output: {detail}")]
    BadOutput { tool: &'static str, detail: String },
}

const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "wav", "flac", "m4a", "ogg", "aac"];

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Seam for cutting media, so orchestration can be tested with a mock.
pub trait MediaCutter: Send + Sync {
    fn cut(&self, input: &Path, output: &Path, span: Span) -> Result<(), MediaError>;
}

/// Cuts clips by invoking ffmpeg with stream copy.
pub struct FfmpegCutter;

impl MediaCutter for FfmpegCutter {
    fn cut(&self, input: &Path, output: &Path, span: Span) -> Result<(), MediaError> {
        cut_clip(input, output, span)
    }
}

pub fn probe_duration_seconds(path: &Path) -> Result<f64, MediaError> {
    ensure_input_exists(path)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .map_err(|source| MediaError::Launch {
            tool: "ffprobe",
            source,
        })?;

    if !output.status.success() {
        return Err(MediaError::CommandFailed {
            tool: "ffprobe",
            input: path.to_path_buf(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .trim()
        .parse()
        .map_err(|_| MediaError::BadOutput {
            tool: "ffprobe",
            detail: format!("duration `{}` is not a float", stdout.trim()),
        })
}

/// Extract the audio track of a video into an mp3 next to it.
pub fn extract_audio(input: &Path, output: &Path) -> Result<(), MediaError> {
    ensure_input_exists(input)?;

    emit(
        Level::Info,
        "media.extract",
        &format!("Extracting audio from {}...", input.display()),
        None,
    );

    run_ffmpeg(
        input,
        &[
            "-y",
            "-i",
            &input.to_string_lossy(),
            "-q:a",
            "0",
            "-map",
            "a",
            &output.to_string_lossy(),
        ],
    )
}

/// Cut `span` out of a media file without re-encoding. The span is in the
/// time base of `input`.
pub fn cut_clip(input: &Path, output: &Path, span: Span) -> Result<(), MediaError> {
    ensure_input_exists(input)?;

    emit(
        Level::Info,
        "media.cut",
        &format!(
            "Cutting {:.2}s-{:.2}s into {}",
            span.start,
            span.end,
            output.display()
        ),
        None,
    );

    run_ffmpeg(
        input,
        &[
            "-y",
            "-i",
            &input.to_string_lossy(),
            "-ss",
            &format!("{}", span.start),
            "-t",
            &format!("{}", span.duration()),
            "-c:v",
            "copy",
            "-c:a",
            "copy",
            &output.to_string_lossy(),
        ],
    )
}

/// Re-encoded audio trim, used to chunk long recordings for the coarse
/// transcription service.
pub fn trim_audio(
    input: &Path,
    output: &Path,
    start_seconds: f64,
    duration_seconds: f64,
) -> Result<(), MediaError> {
    ensure_input_exists(input)?;

    run_ffmpeg(
        input,
        &[
            "-y",
            "-i",
            &input.to_string_lossy(),
            "-ss",
            &format!("{start_seconds}"),
            "-t",
            &format!("{duration_seconds}"),
            "-c:a",
            "libmp3lame",
            "-q:a",
            "2",
            &output.to_string_lossy(),
        ],
    )
}

fn run_ffmpeg(input: &Path, args: &[&str]) -> Result<(), MediaError> {
    let output = Command::new("ffmpeg")
        .args(args)
        .output()
        .map_err(|source| MediaError::Launch {
            tool: "ffmpeg",
            source,
        })?;

    if !output.status.success() {
        return Err(MediaError::CommandFailed {
            tool: "ffmpeg",
            input: input.to_path_buf(),
            detail: last_stderr_line(&output.stderr),
        });
    }

    Ok(())
}

fn ensure_input_exists(path: &Path) -> Result<(), MediaError> {
    if !path.exists() {
        return Err(MediaError::InputNotFound(path.to_path_buf()));
    }
    Ok(())
}

// ffmpeg writes a banner to stderr; only the last line carries the error.
fn last_stderr_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("no error output")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_is_reported_distinctly() {
        let missing = Path::new("/nonexistent/input.mp4");
        let err = cut_clip(missing, Path::new("/tmp/out.mp4"), Span::new(0.0, 1.0)).unwrap_err();
        assert!(matches!(err, MediaError::InputNotFound(_)));

        let err = probe_duration_seconds(missing).unwrap_err();
        assert!(matches!(err, MediaError::InputNotFound(_)));
    }

    #[test]
    fn last_stderr_line_skips_blank_lines() {
        assert_eq!(
            last_stderr_line(b"banner\nactual error\n\n"),
            "actual error"
        );
        assert_eq!(last_stderr_line(b""), "no error output");
    }
}
