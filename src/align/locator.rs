use super::normalize::collapse_whitespace;
use super::{AlignError, Span};
use crate::transcript::CoarseTranscript;

/// Character range a segment occupies in the normalized joined text.
/// Half-open; empty segments occupy empty ranges and never cover a match.
#[derive(Debug, Clone, Copy)]
struct SegmentRange {
    start: usize,
    end: usize,
}

impl SegmentRange {
    fn covers(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}

/// Locate `sentence` in the coarse transcript and return its segment-level
/// span expanded by `margin` seconds (start floored at zero).
///
/// The search is an exact substring match on whitespace-normalized text:
/// case and punctuation must match. `Ok(None)` means the sentence does not
/// occur in the transcript.
///
/// Each segment is normalized individually and joined with single spaces,
/// and the recorded character ranges refer to that same joined string, so
/// the offset-to-segment mapping is exact rather than approximated from raw
/// segment lengths.
pub fn locate(
    sentence: &str,
    transcript: &CoarseTranscript,
    margin: f64,
) -> Result<Option<Span>, AlignError> {
    let needle = collapse_whitespace(sentence);
    if needle.is_empty() {
        return Err(AlignError::EmptySentence);
    }
    if transcript.timestamps.is_empty() {
        return Err(AlignError::EmptyTranscript);
    }

    let (joined, ranges) = join_normalized_segments(transcript);

    let Some(match_start) = joined.find(&needle) else {
        return Ok(None);
    };
    let match_last = match_start + needle.len() - 1;

    let Some(first) = ranges.iter().position(|r| r.covers(match_start)) else {
        // The first character of the needle is never a join space, so some
        // segment always covers it; guard anyway.
        return Ok(None);
    };

    let start = transcript.timestamps[first].start;
    let end = match ranges.iter().position(|r| r.covers(match_last)) {
        Some(last) => transcript.timestamps[last].end,
        // No segment covers the end offset: fall back to the final segment.
        None => transcript
            .timestamps
            .last()
            .map(|segment| segment.end)
            .unwrap_or(start),
    };

    Ok(Some(Span::new(start, end).with_margin(margin)))
}

fn join_normalized_segments(transcript: &CoarseTranscript) -> (String, Vec<SegmentRange>) {
    let mut joined = String::with_capacity(transcript.transcript.len());
    let mut ranges = Vec::with_capacity(transcript.timestamps.len());

    for segment in &transcript.timestamps {
        let text = collapse_whitespace(&segment.text);
        if !text.is_empty() && !joined.is_empty() {
            joined.push(' ');
        }
        let start = joined.len();
        joined.push_str(&text);
        ranges.push(SegmentRange {
            start,
            end: joined.len(),
        });
    }

    (joined, ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptSegment;

    fn segment(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    fn interview_transcript() -> CoarseTranscript {
        CoarseTranscript::from_segments(vec![
            segment(0.0, 5.0, "Hallo "),
            segment(5.0, 12.0, "wie geht es dir "),
            segment(12.0, 15.0, "heute"),
        ])
    }

    #[test]
    fn finds_sentence_within_one_segment() {
        let span = locate("wie geht es dir", &interview_transcript(), 0.0)
            .unwrap()
            .unwrap();
        assert_eq!(span, Span::new(5.0, 12.0));
    }

    #[test]
    fn applies_margin_and_floors_start_at_zero() {
        let transcript = interview_transcript();

        let span = locate("wie geht es dir", &transcript, 3.0).unwrap().unwrap();
        assert_eq!(span, Span::new(2.0, 15.0));

        let span = locate("Hallo", &transcript, 10.0).unwrap().unwrap();
        assert_eq!(span.start, 0.0);
        assert_eq!(span.end, 15.0);
    }

    #[test]
    fn sentence_crossing_segments_spans_both() {
        let span = locate("Hallo wie geht", &interview_transcript(), 0.0)
            .unwrap()
            .unwrap();
        assert_eq!(span, Span::new(0.0, 12.0));
    }

    #[test]
    fn returned_span_contains_every_intersecting_segment() {
        let transcript = interview_transcript();
        let span = locate("dir heute", &transcript, 0.0).unwrap().unwrap();

        // Segments 1 and 2 intersect the matched text; the span must cover
        // both of them fully.
        for segment in &transcript.timestamps[1..] {
            assert!(span.start <= segment.start && span.end >= segment.end);
        }
        assert_eq!(span, Span::new(5.0, 15.0));
    }

    #[test]
    fn absent_sentence_is_not_found() {
        let result = locate("das steht nirgendwo", &interview_transcript(), 5.0).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn search_is_case_sensitive() {
        let result = locate("WIE GEHT ES DIR", &interview_transcript(), 0.0).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn messy_whitespace_in_sentence_still_matches() {
        let span = locate("wie \n geht\t es   dir", &interview_transcript(), 0.0)
            .unwrap()
            .unwrap();
        assert_eq!(span, Span::new(5.0, 12.0));
    }

    #[test]
    fn empty_segments_never_cover_a_match() {
        let transcript = CoarseTranscript::from_segments(vec![
            segment(0.0, 2.0, "eins "),
            segment(2.0, 3.0, "   "),
            segment(3.0, 6.0, "zwei drei"),
        ]);
        let span = locate("zwei drei", &transcript, 0.0).unwrap().unwrap();
        assert_eq!(span, Span::new(3.0, 6.0));
    }

    #[test]
    fn malformed_inputs_fail_fast() {
        assert_eq!(
            locate("  ", &interview_transcript(), 0.0),
            Err(AlignError::EmptySentence)
        );
        let empty = CoarseTranscript::from_segments(Vec::new());
        assert_eq!(
            locate("Hallo", &empty, 0.0),
            Err(AlignError::EmptyTranscript)
        );
    }

    #[test]
    fn repeated_calls_yield_identical_spans() {
        let transcript = interview_transcript();
        let first = locate("wie geht es dir", &transcript, 5.0).unwrap();
        let second = locate("wie geht es dir", &transcript, 5.0).unwrap();
        assert_eq!(first, second);
    }
}
