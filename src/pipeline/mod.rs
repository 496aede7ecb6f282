//! Two-stage clip orchestration.
//!
//! Per statement the pipeline walks a one-directional state machine with
//! three terminal states: Precise (rough cut, refined, tighter cut, rough
//! deleted), Rough-only (refinement failed, rough cut is the deliverable),
//! and Unresolved (the sentence never located, nothing produced). A failure
//! on one statement never aborts its siblings.

pub mod collection;
pub mod run;

use std::fs;
use std::path::{Path, PathBuf};

use crate::align::{locate, refine};
use crate::media::MediaCutter;
use crate::transcribe::{TranscribeError, WordTranscriber};
use crate::transcript::{CoarseTranscript, WordToken};
use crate::ui::{Level, emit};
use crate::workspace::extension_or_default;
use collection::{ClipTimestamps, Statement};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementOutcome {
    /// Refinement accepted a window; the tight clip is the artifact.
    Precise,
    /// Rough clip kept because refinement failed or missed the threshold.
    RoughOnly,
    /// Coarse location failed; no artifact for this statement.
    Unresolved,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub precise: usize,
    pub rough_only: usize,
    pub unresolved: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: StatementOutcome) {
        match outcome {
            StatementOutcome::Precise => self.precise += 1,
            StatementOutcome::RoughOnly => self.rough_only += 1,
            StatementOutcome::Unresolved => self.unresolved += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.precise + self.rough_only + self.unresolved
    }
}

pub struct ClipPipeline {
    pub cutter: Box<dyn MediaCutter>,
    pub transcriber: Box<dyn WordTranscriber>,
    pub language: String,
    /// Margin around the coarse segment span (seconds).
    pub locate_margin: f64,
    /// Extra buffer before cutting the rough clip (seconds).
    pub rough_buffer: f64,
    pub word_retries: u32,
}

impl ClipPipeline {
    /// Run the full state machine for one statement, updating its clip path
    /// and timestamp record in place.
    pub async fn process_statement(
        &self,
        source: &Path,
        transcript: &CoarseTranscript,
        topic_dir: &Path,
        statement: &mut Statement,
    ) -> StatementOutcome {
        let rough = match locate(&statement.quote, transcript, self.locate_margin) {
            Ok(Some(span)) => span.with_margin(self.rough_buffer),
            Ok(None) => {
                emit(
                    Level::Warn,
                    "align.locate.miss",
                    &format!(
                        "Statement {}: sentence not in transcript: \"{}\"",
                        statement.id,
                        quote_prefix(&statement.quote)
                    ),
                    None,
                );
                return StatementOutcome::Unresolved;
            }
            Err(err) => {
                emit(
                    Level::Error,
                    "align.locate.invalid",
                    &format!("Statement {}: {}", statement.id, err),
                    None,
                );
                return StatementOutcome::Unresolved;
            }
        };

        let extension = extension_or_default(source, "mp4");
        let rough_path =
            topic_dir.join(format!("statement_{}_rough.{}", statement.id, extension));
        if let Err(err) = self.cutter.cut(source, &rough_path, rough) {
            emit(
                Level::Error,
                "media.rough_failed",
                &format!("Statement {}: rough cut failed: {}", statement.id, err),
                None,
            );
            return StatementOutcome::Unresolved;
        }

        let refined = match self.transcribe_with_retry(&rough_path).await {
            Ok(tokens) => self.refine_tokens(statement, &tokens),
            Err(err) => {
                let code = match err {
                    TranscribeError::Timeout(_) => "words.timeout",
                    _ => "words.failed",
                };
                emit(
                    Level::Warn,
                    code,
                    &format!(
                        "Statement {}: word-level transcription failed: {}",
                        statement.id, err
                    ),
                    None,
                );
                None
            }
        };

        // Refined spans are local to the rough clip, which is exactly the
        // time base the second cut needs.
        if let Some(local) = refined {
            let final_path =
                topic_dir.join(format!("statement_{}_final.{}", statement.id, extension));
            match self.cutter.cut(&rough_path, &final_path, local) {
                Ok(()) => {
                    if let Err(err) = fs::remove_file(&rough_path) {
                        emit(
                            Level::Warn,
                            "media.cleanup_failed",
                            &format!(
                                "Failed to remove rough clip {}: {}",
                                rough_path.display(),
                                err
                            ),
                            None,
                        );
                    }
                    statement.clip_path = Some(final_path);
                    statement.timestamps = Some(ClipTimestamps {
                        rough: Some(rough),
                        precise: Some(local),
                    });
                    emit(
                        Level::Success,
                        "statement.precise",
                        &format!(
                            "Statement {}: precise clip {:.2}s-{:.2}s",
                            statement.id, local.start, local.end
                        ),
                        None,
                    );
                    return StatementOutcome::Precise;
                }
                Err(err) => {
                    emit(
                        Level::Warn,
                        "media.precise_failed",
                        &format!(
                            "Statement {}: precise cut failed, keeping rough clip: {}",
                            statement.id, err
                        ),
                        None,
                    );
                }
            }
        }

        self.fall_back_to_rough(statement, rough_path, rough)
    }

    fn refine_tokens(
        &self,
        statement: &Statement,
        tokens: &[WordToken],
    ) -> Option<crate::align::Span> {
        match refine(&statement.quote, tokens) {
            Ok(Some(span)) => Some(span),
            Ok(None) => {
                emit(
                    Level::Warn,
                    "align.refine.miss",
                    &format!(
                        "Statement {}: no window met the match threshold",
                        statement.id
                    ),
                    None,
                );
                None
            }
            Err(err) => {
                emit(
                    Level::Error,
                    "align.refine.invalid",
                    &format!("Statement {}: {}", statement.id, err),
                    None,
                );
                None
            }
        }
    }

    fn fall_back_to_rough(
        &self,
        statement: &mut Statement,
        rough_path: PathBuf,
        rough: crate::align::Span,
    ) -> StatementOutcome {
        statement.clip_path = Some(rough_path);
        statement.timestamps = Some(ClipTimestamps {
            rough: Some(rough),
            precise: None,
        });
        emit(
            Level::Info,
            "statement.rough_only",
            &format!(
                "Statement {}: rough clip kept ({:.2}s-{:.2}s)",
                statement.id, rough.start, rough.end
            ),
            None,
        );
        StatementOutcome::RoughOnly
    }

    async fn transcribe_with_retry(
        &self,
        clip: &Path,
    ) -> Result<Vec<WordToken>, TranscribeError> {
        let mut attempt = 0;
        loop {
            match self
                .transcriber
                .transcribe_words(clip, &self.language)
                .await
            {
                Ok(tokens) => return Ok(tokens),
                Err(err) if err.is_transient() && attempt < self.word_retries => {
                    attempt += 1;
                    emit(
                        Level::Warn,
                        "words.retry",
                        &format!(
                            "Word-level transcription failed ({}), retry {}/{}",
                            err, attempt, self.word_retries
                        ),
                        None,
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn quote_prefix(quote: &str) -> String {
    const MAX: usize = 80;
    if quote.chars().count() <= MAX {
        quote.to_string()
    } else {
        let prefix: String = quote.chars().take(MAX).collect();
        format!("{prefix}...")
    }
}

#[cfg(test)]
mod tests {
    use super::collection::StatementId;
    use super::*;
    use crate::align::Span;
    use crate::media::MediaError;
    use crate::transcript::TranscriptSegment;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    struct MockCutter {
        cuts: Mutex<Vec<(PathBuf, PathBuf, Span)>>,
        fail_on_final: bool,
    }

    impl MockCutter {
        fn new() -> Self {
            Self {
                cuts: Mutex::new(Vec::new()),
                fail_on_final: false,
            }
        }
    }

    impl MediaCutter for MockCutter {
        fn cut(&self, input: &Path, output: &Path, span: Span) -> Result<(), MediaError> {
            if self.fail_on_final && output.to_string_lossy().contains("_final") {
                return Err(MediaError::CommandFailed {
                    tool: "ffmpeg",
                    input: input.to_path_buf(),
                    detail: "simulated codec failure".to_string(),
                });
            }
            fs::write(output, b"clip").unwrap();
            self.cuts
                .lock()
                .unwrap()
                .push((input.to_path_buf(), output.to_path_buf(), span));
            Ok(())
        }
    }

    struct MockTranscriber {
        responses: Mutex<VecDeque<Result<Vec<WordToken>, TranscribeError>>>,
    }

    impl MockTranscriber {
        fn new(responses: Vec<Result<Vec<WordToken>, TranscribeError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }

        fn remaining(&self) -> usize {
            self.responses.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl WordTranscriber for MockTranscriber {
        async fn transcribe_words(
            &self,
            _media: &Path,
            _language: &str,
        ) -> Result<Vec<WordToken>, TranscribeError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[async_trait]
    impl WordTranscriber for std::sync::Arc<MockTranscriber> {
        async fn transcribe_words(
            &self,
            media: &Path,
            language: &str,
        ) -> Result<Vec<WordToken>, TranscribeError> {
            self.as_ref().transcribe_words(media, language).await
        }
    }

    fn token(text: &str, start_ms: u64, end_ms: u64) -> WordToken {
        WordToken {
            text: text.to_string(),
            start_ms,
            end_ms,
            confidence: None,
        }
    }

    fn quote_tokens() -> Vec<WordToken> {
        vec![
            token("wie", 1000, 1300),
            token("geht", 1300, 1600),
            token("es", 1600, 1800),
            token("dir", 1800, 2100),
        ]
    }

    fn transcript() -> CoarseTranscript {
        CoarseTranscript::from_segments(vec![
            TranscriptSegment {
                start: 0.0,
                end: 5.0,
                text: "Hallo ".to_string(),
            },
            TranscriptSegment {
                start: 5.0,
                end: 12.0,
                text: "wie geht es dir ".to_string(),
            },
            TranscriptSegment {
                start: 12.0,
                end: 15.0,
                text: "heute".to_string(),
            },
        ])
    }

    fn statement(id: u64, quote: &str) -> Statement {
        Statement {
            id: StatementId::Number(id),
            quote: quote.to_string(),
            clip_path: None,
            timestamps: None,
            extra: serde_json::Map::new(),
        }
    }

    fn pipeline(
        cutter: MockCutter,
        transcriber: MockTranscriber,
        retries: u32,
    ) -> ClipPipeline {
        ClipPipeline {
            cutter: Box::new(cutter),
            transcriber: Box::new(transcriber),
            language: "de".to_string(),
            locate_margin: 5.0,
            rough_buffer: 0.0,
            word_retries: retries,
        }
    }

    #[tokio::test]
    async fn precise_path_cuts_twice_and_removes_rough_clip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("talk.mp4");
        fs::write(&source, b"video").unwrap();

        let pipeline = pipeline(
            MockCutter::new(),
            MockTranscriber::new(vec![Ok(quote_tokens())]),
            0,
        );
        let mut stmt = statement(1, "wie geht es dir");

        let outcome = pipeline
            .process_statement(&source, &transcript(), dir.path(), &mut stmt)
            .await;

        assert_eq!(outcome, StatementOutcome::Precise);

        let rough_path = dir.path().join("statement_1_rough.mp4");
        let final_path = dir.path().join("statement_1_final.mp4");
        assert!(!rough_path.exists(), "rough clip must be deleted");
        assert!(final_path.exists());
        assert_eq!(stmt.clip_path.as_deref(), Some(final_path.as_path()));

        let timestamps = stmt.timestamps.unwrap();
        let rough = timestamps.rough.unwrap();
        let precise = timestamps.precise.unwrap();
        // Coarse span 5-12 with 5s margin.
        assert_eq!(rough, Span::new(0.0, 17.0));
        // Clip-local refined span from the token timings.
        assert!((precise.start - 0.5).abs() < 1e-9);
        assert!((precise.end - 2.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn timeout_falls_back_to_rough_without_touching_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("talk.mp4");
        fs::write(&source, b"video").unwrap();

        let pipeline = pipeline(
            MockCutter::new(),
            MockTranscriber::new(vec![
                Err(TranscribeError::Timeout(Duration::from_secs(600))),
                Ok(quote_tokens()),
            ]),
            0,
        );

        let mut first = statement(1, "wie geht es dir");
        let outcome = pipeline
            .process_statement(&source, &transcript(), dir.path(), &mut first)
            .await;
        assert_eq!(outcome, StatementOutcome::RoughOnly);

        let rough_path = dir.path().join("statement_1_rough.mp4");
        assert!(rough_path.exists(), "rough clip is the deliverable");
        assert_eq!(first.clip_path.as_deref(), Some(rough_path.as_path()));
        let timestamps = first.timestamps.unwrap();
        assert!(timestamps.rough.is_some());
        assert!(timestamps.precise.is_none());

        // The sibling statement still completes precisely.
        let mut second = statement(2, "wie geht es dir");
        let outcome = pipeline
            .process_statement(&source, &transcript(), dir.path(), &mut second)
            .await;
        assert_eq!(outcome, StatementOutcome::Precise);
    }

    #[tokio::test]
    async fn unlocatable_sentence_is_unresolved_and_produces_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("talk.mp4");
        fs::write(&source, b"video").unwrap();

        let cutter = MockCutter::new();
        let pipeline = pipeline(cutter, MockTranscriber::new(vec![]), 0);
        let mut stmt = statement(7, "dieser Satz kommt nicht vor");

        let outcome = pipeline
            .process_statement(&source, &transcript(), dir.path(), &mut stmt)
            .await;

        assert_eq!(outcome, StatementOutcome::Unresolved);
        assert!(stmt.clip_path.is_none());
        assert!(stmt.timestamps.is_none());
        assert!(!dir.path().join("statement_7_rough.mp4").exists());
    }

    #[tokio::test]
    async fn below_threshold_keeps_rough_clip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("talk.mp4");
        fs::write(&source, b"video").unwrap();

        let unrelated = vec![
            token("ganz", 0, 200),
            token("andere", 200, 400),
            token("worte", 400, 600),
            token("hier", 600, 800),
        ];
        let pipeline = pipeline(
            MockCutter::new(),
            MockTranscriber::new(vec![Ok(unrelated)]),
            0,
        );
        let mut stmt = statement(3, "wie geht es dir");

        let outcome = pipeline
            .process_statement(&source, &transcript(), dir.path(), &mut stmt)
            .await;

        assert_eq!(outcome, StatementOutcome::RoughOnly);
        assert!(stmt.timestamps.unwrap().precise.is_none());
    }

    #[tokio::test]
    async fn transient_service_failure_is_retried_once() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("talk.mp4");
        fs::write(&source, b"video").unwrap();

        let transcriber = MockTranscriber::new(vec![
            Err(TranscribeError::Service("flaky backend".to_string())),
            Ok(quote_tokens()),
        ]);
        let pipeline = pipeline(MockCutter::new(), transcriber, 1);
        let mut stmt = statement(4, "wie geht es dir");

        let outcome = pipeline
            .process_statement(&source, &transcript(), dir.path(), &mut stmt)
            .await;
        assert_eq!(outcome, StatementOutcome::Precise);
    }

    #[tokio::test]
    async fn timeout_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("talk.mp4");
        fs::write(&source, b"video").unwrap();

        let transcriber = std::sync::Arc::new(MockTranscriber::new(vec![
            Err(TranscribeError::Timeout(Duration::from_secs(600))),
            Ok(quote_tokens()),
        ]));
        let pipeline = ClipPipeline {
            cutter: Box::new(MockCutter::new()),
            transcriber: Box::new(transcriber.clone()),
            language: "de".to_string(),
            locate_margin: 5.0,
            rough_buffer: 0.0,
            word_retries: 2,
        };
        let mut stmt = statement(5, "wie geht es dir");

        let outcome = pipeline
            .process_statement(&source, &transcript(), dir.path(), &mut stmt)
            .await;

        assert_eq!(outcome, StatementOutcome::RoughOnly);
        // The queued success response was never consumed: no retry happened.
        assert_eq!(transcriber.remaining(), 1);
    }

    #[tokio::test]
    async fn precise_cut_failure_keeps_rough_clip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("talk.mp4");
        fs::write(&source, b"video").unwrap();

        let mut cutter = MockCutter::new();
        cutter.fail_on_final = true;
        let pipeline = pipeline(
            cutter,
            MockTranscriber::new(vec![Ok(quote_tokens())]),
            0,
        );
        let mut stmt = statement(6, "wie geht es dir");

        let outcome = pipeline
            .process_statement(&source, &transcript(), dir.path(), &mut stmt)
            .await;

        assert_eq!(outcome, StatementOutcome::RoughOnly);
        let rough_path = dir.path().join("statement_6_rough.mp4");
        assert!(rough_path.exists());
        assert_eq!(stmt.clip_path.as_deref(), Some(rough_path.as_path()));
        assert!(stmt.timestamps.unwrap().precise.is_none());
    }

    #[test]
    fn summary_counts_outcomes() {
        let mut summary = RunSummary::default();
        summary.record(StatementOutcome::Precise);
        summary.record(StatementOutcome::RoughOnly);
        summary.record(StatementOutcome::RoughOnly);
        summary.record(StatementOutcome::Unresolved);
        assert_eq!(summary.precise, 1);
        assert_eq!(summary.rough_only, 2);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.total(), 4);
    }
}
