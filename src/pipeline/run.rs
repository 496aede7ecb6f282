//! Batch run: coarse transcript, then the two-stage cut for every
//! statement in every collection file.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use futures_util::stream;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;

use super::collection::{Collection, list_collection_files};
use super::{ClipPipeline, RunSummary};
use crate::cli::RunArgs;
use crate::config::Config;
use crate::media::FfmpegCutter;
use crate::transcribe::{AssemblyClient, ensure_coarse_transcript};
use crate::transcript::CoarseTranscript;
use crate::ui::{Level, emit};
use crate::workspace::{Workspace, canonicalize_existing};

pub async fn handle_run(args: RunArgs, config: &Config) -> Result<()> {
    let video = canonicalize_existing(&args.video)?;
    let workspace = Workspace::new(args.workdir.clone())?;

    let transcript_path =
        ensure_coarse_transcript(&video, &workspace, config, args.force).await?;
    let transcript = CoarseTranscript::load(&transcript_path)?;

    let collections_dir = args
        .collections
        .clone()
        .unwrap_or_else(|| workspace.collections_dir());
    let files = list_collection_files(&collections_dir)?;
    if files.is_empty() {
        anyhow::bail!(
            "No collection files found in {}",
            collections_dir.display()
        );
    }

    let pipeline = ClipPipeline {
        cutter: Box::new(FfmpegCutter),
        transcriber: Box::new(AssemblyClient::new(
            config.assemblyai_api_key()?,
            config.poll_interval(),
            config.transcribe_timeout(),
        )),
        language: config.language.clone(),
        locate_margin: config.locate_margin_seconds,
        rough_buffer: config.rough_buffer_seconds,
        word_retries: config.word_retries,
    };

    let jobs = args.jobs.max(1);
    let mut summary = RunSummary::default();

    for file in &files {
        match process_collection(file, &video, &transcript, &workspace, &pipeline, jobs).await {
            Ok(collection_summary) => {
                summary.precise += collection_summary.precise;
                summary.rough_only += collection_summary.rough_only;
                summary.unresolved += collection_summary.unresolved;
            }
            Err(err) => {
                // One broken collection file must not stop the run.
                emit(
                    Level::Error,
                    "run.collection_failed",
                    &format!("Skipping {}: {:#}", file.display(), err),
                    None,
                );
            }
        }
    }

    emit(
        Level::Success,
        "run.summary",
        &format!(
            "Processed {} statements: {} precise, {} rough-only, {} unresolved",
            summary.total(),
            summary.precise,
            summary.rough_only,
            summary.unresolved
        ),
        Some(serde_json::json!({
            "precise": summary.precise,
            "rough_only": summary.rough_only,
            "unresolved": summary.unresolved,
        })),
    );

    Ok(())
}

async fn process_collection(
    file: &Path,
    video: &Path,
    transcript: &CoarseTranscript,
    workspace: &Workspace,
    pipeline: &ClipPipeline,
    jobs: usize,
) -> Result<RunSummary> {
    let topic = file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .context("Collection file has no usable name")?
        .to_string();

    let mut collection = Collection::load(file)?;
    let topic_dir = workspace.topic_dir(&topic);
    fs::create_dir_all(&topic_dir)
        .with_context(|| format!("Failed to create topic directory {}", topic_dir.display()))?;

    emit(
        Level::Info,
        "run.topic",
        &format!(
            "Processing topic `{}` ({} statements)",
            topic,
            collection.statements.len()
        ),
        None,
    );

    let bar = ProgressBar::new(collection.statements.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40} {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=> "),
    );
    bar.set_message(topic.clone());

    // Statements are independent; run up to `jobs` of them concurrently.
    // Rough-clip paths are keyed by statement id, so no two tasks collide.
    let outcomes: Vec<_> = stream::iter(collection.statements.iter_mut().map(|statement| {
        let bar = &bar;
        let topic_dir = &topic_dir;
        async move {
            let outcome = pipeline
                .process_statement(video, transcript, topic_dir, statement)
                .await;
            bar.inc(1);
            outcome
        }
    }))
    .buffer_unordered(jobs)
    .collect()
    .await;

    bar.finish_and_clear();

    let mut summary = RunSummary::default();
    for outcome in outcomes {
        summary.record(outcome);
    }

    // Persist the updated collection (clip paths + timestamps) alongside
    // the clips it describes.
    let output_path = topic_dir.join(file.file_name().context("Collection file has no name")?);
    collection.save(&output_path)?;

    Ok(summary)
}
