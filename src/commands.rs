use anyhow::{Context, Result, bail};

use crate::align::{locate, refine};
use crate::cli::{Cli, Commands, CutArgs, LocateArgs, RefineArgs, TranscribeArgs};
use crate::config::Config;
use crate::media;
use crate::transcribe::{AssemblyClient, WordTranscriber, ensure_coarse_transcript};
use crate::transcript::CoarseTranscript;
use crate::ui::{Level, emit};
use crate::workspace::{Workspace, canonicalize_existing};

pub async fn handle_command(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Transcribe(args) => handle_transcribe(args, &config).await,
        Commands::Locate(args) => handle_locate(args, &config),
        Commands::Refine(args) => handle_refine(args, &config).await,
        Commands::Cut(args) => handle_cut(args),
        Commands::Run(args) => crate::pipeline::run::handle_run(args, &config).await,
    }
}

async fn handle_transcribe(args: TranscribeArgs, config: &Config) -> Result<()> {
    let media = canonicalize_existing(&args.media)?;
    let workspace = Workspace::new(args.workdir)?;
    let path = ensure_coarse_transcript(&media, &workspace, config, args.force).await?;
    println!("{}", path.display());
    Ok(())
}

fn handle_locate(args: LocateArgs, config: &Config) -> Result<()> {
    let transcript = CoarseTranscript::load(&args.transcript)?;
    let margin = args.margin.unwrap_or(config.locate_margin_seconds);

    let span = locate(&args.sentence, &transcript, margin)
        .context("Cannot search for this sentence")?;

    match span {
        Some(span) => {
            emit(
                Level::Success,
                "align.locate.hit",
                &format!("Found at {:.2}s-{:.2}s", span.start, span.end),
                Some(serde_json::json!({
                    "start": span.start,
                    "end": span.end,
                })),
            );
            Ok(())
        }
        None => bail!("Sentence not found in transcript"),
    }
}

async fn handle_refine(args: RefineArgs, config: &Config) -> Result<()> {
    let clip = canonicalize_existing(&args.clip)?;
    let language = args.language.as_deref().unwrap_or(&config.language);

    let client = AssemblyClient::new(
        config.assemblyai_api_key()?,
        config.poll_interval(),
        config.transcribe_timeout(),
    );
    let tokens = client
        .transcribe_words(&clip, language)
        .await
        .context("Word-level transcription failed")?;

    let span = refine(&args.sentence, &tokens).context("Cannot search for this sentence")?;
    match span {
        Some(span) => {
            let mut data = serde_json::json!({
                "start": span.start,
                "end": span.end,
            });
            let mut message = format!(
                "Found at {:.2}s-{:.2}s within the clip",
                span.start, span.end
            );
            if let Some(offset) = args.offset {
                let absolute = span.offset_by(offset);
                message.push_str(&format!(
                    " ({:.2}s-{:.2}s in the recording)",
                    absolute.start, absolute.end
                ));
                data["absolute_start"] = serde_json::json!(absolute.start);
                data["absolute_end"] = serde_json::json!(absolute.end);
            }
            emit(Level::Success, "align.refine.hit", &message, Some(data));
            Ok(())
        }
        None => bail!("Sentence not found in clip"),
    }
}

fn handle_cut(args: CutArgs) -> Result<()> {
    if !args.start.is_finite() || !args.end.is_finite() || args.start < 0.0 {
        bail!("Start and end must be non-negative numbers");
    }
    if args.end <= args.start {
        bail!("End ({}) must be after start ({})", args.end, args.start);
    }

    let input = canonicalize_existing(&args.input)?;
    media::cut_clip(&input, &args.out, crate::align::Span::new(args.start, args.end))?;

    emit(
        Level::Success,
        "media.done",
        &format!("Wrote {}", args.out.display()),
        None,
    );
    Ok(())
}
