//! Event detection adapter.
//!
//! The backend's silence and scene scans report their findings as FFmpeg log
//! lines. This module turns those lines into [`SilenceInterval`]s and
//! [`SceneMark`]s. Parsing never fails: lines that cannot be understood are
//! skipped and simply produce fewer events, and a scan that fails outright
//! yields no events at all so the planner falls back to fixed cuts.

use std::path::Path;

use tracing::{debug, info, warn};

use vchunk_models::{DetectionConfig, SceneMark, SilenceInterval};

use crate::backend::MediaBackend;

const SILENCE_START_KEY: &str = "silence_start:";
const SILENCE_END_KEY: &str = "silence_end:";
const PTS_TIME_KEY: &str = "pts_time:";

/// Slack for comparing computed durations against the configured minimum.
const DURATION_EPSILON: f64 = 1e-9;

/// Scan `source` for silences and parse the result.
pub async fn detect_silence(
    backend: &dyn MediaBackend,
    source: &Path,
    config: &DetectionConfig,
) -> Vec<SilenceInterval> {
    info!(
        file = %source.display(),
        threshold_db = config.silence_threshold_db,
        min_duration = config.min_silence_duration,
        "Analyzing silence"
    );

    match backend
        .scan_silence(source, config.silence_threshold_db, config.min_silence_duration)
        .await
    {
        Ok(output) => {
            let intervals = parse_silence_events(&output, config.min_silence_duration);
            info!(file = %source.display(), count = intervals.len(), "Silence analysis complete");
            intervals
        }
        Err(e) => {
            warn!(file = %source.display(), error = %e, "Silence scan failed, continuing without silences");
            Vec::new()
        }
    }
}

/// Scan `source` for scene changes above `threshold` and parse the result.
pub async fn detect_scenes(backend: &dyn MediaBackend, source: &Path, threshold: f64) -> Vec<SceneMark> {
    info!(file = %source.display(), threshold, "Analyzing scene changes");

    match backend.scan_scenes(source, threshold).await {
        Ok(output) => {
            let marks = parse_scene_events(&output);
            info!(file = %source.display(), count = marks.len(), "Scene analysis complete");
            marks
        }
        Err(e) => {
            warn!(file = %source.display(), error = %e, "Scene scan failed, continuing without scene marks");
            Vec::new()
        }
    }
}

/// Pair `silence_start` / `silence_end` markers into intervals.
///
/// A start is closed by the next end. A second start before that end
/// replaces the first; ends without an open start and starts left open at
/// the end of the log are dropped. Intervals shorter than `min_duration`
/// are discarded.
pub fn parse_silence_events(output: &str, min_duration: f64) -> Vec<SilenceInterval> {
    let mut intervals = Vec::new();
    let mut open_start: Option<f64> = None;

    for line in output.lines() {
        if line.contains(SILENCE_START_KEY) {
            match value_after(line, SILENCE_START_KEY) {
                Some(start) => {
                    if let Some(dropped) = open_start.replace(start.max(0.0)) {
                        debug!(start = dropped, "Unclosed silence start replaced");
                    }
                }
                None => debug!(line, "Skipping malformed silence_start line"),
            }
        } else if line.contains(SILENCE_END_KEY) {
            let Some(start) = open_start.take() else {
                debug!(line, "Skipping silence_end without a start");
                continue;
            };
            let Some(end) = value_after(line, SILENCE_END_KEY) else {
                debug!(line, "Skipping malformed silence_end line");
                continue;
            };
            match SilenceInterval::new(start, end) {
                Some(interval) if interval.duration + DURATION_EPSILON >= min_duration => {
                    intervals.push(interval);
                }
                Some(_) => {}
                None => debug!(start, end, "Skipping empty silence interval"),
            }
        }
    }

    if let Some(start) = open_start {
        debug!(start, "Dropping silence that never ended");
    }

    intervals.sort_by(|a, b| a.start.total_cmp(&b.start));
    intervals
}

/// Collect `pts_time` values from `showinfo` lines, sorted ascending.
pub fn parse_scene_events(output: &str) -> Vec<SceneMark> {
    let mut marks: Vec<SceneMark> = output
        .lines()
        .filter(|line| line.contains("showinfo") && line.contains(PTS_TIME_KEY))
        .filter_map(|line| {
            let value = value_after(line, PTS_TIME_KEY);
            if value.is_none() {
                debug!(line, "Skipping malformed showinfo line");
            }
            value
        })
        .filter(|t| *t >= 0.0)
        .map(SceneMark)
        .collect();

    marks.sort_by(|a, b| a.0.total_cmp(&b.0));
    marks
}

/// Parse the number following `key` on `line`.
fn value_after(line: &str, key: &str) -> Option<f64> {
    let (_, rest) = line.split_once(key)?;
    let token = rest
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '|')
        .next()?;
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SILENCE_LOG: &str = "\
[silencedetect @ 0x5581] silence_start: 115
[silencedetect @ 0x5581] silence_end: 116 | silence_duration: 1
size=N/A time=00:02:00.00 bitrate=N/A speed= 300x
[silencedetect @ 0x5581] silence_start: 235
[silencedetect @ 0x5581] silence_end: 237 | silence_duration: 2";

    #[test]
    fn test_parse_silence_pairs() {
        let intervals = parse_silence_events(SILENCE_LOG, 0.3);
        assert_eq!(intervals.len(), 2);
        assert_eq!((intervals[0].start, intervals[0].end), (115.0, 116.0));
        assert_eq!(intervals[1].duration, 2.0);
    }

    #[test]
    fn test_unclosed_start_is_dropped() {
        let log = "[silencedetect @ 0x1] silence_start: 10.5\n\
                   [silencedetect @ 0x1] silence_start: 20\n\
                   [silencedetect @ 0x1] silence_end: 21.5 | silence_duration: 1.5\n\
                   [silencedetect @ 0x1] silence_start: 50";
        let intervals = parse_silence_events(log, 0.3);
        assert_eq!(intervals, vec![SilenceInterval::new(20.0, 21.5).unwrap()]);
    }

    #[test]
    fn test_end_without_start_is_ignored() {
        let log = "[silencedetect @ 0x1] silence_end: 4 | silence_duration: 1\n\
                   [silencedetect @ 0x1] silence_start: 7\n\
                   [silencedetect @ 0x1] silence_end: 8 | silence_duration: 1";
        let intervals = parse_silence_events(log, 0.3);
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].start, 7.0);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let log = "[silencedetect @ 0x1] silence_start: abc\n\
                   [silencedetect @ 0x1] silence_start\n\
                   [silencedetect @ 0x1] silence_end: 3 | silence_duration: 1\n\
                   [silencedetect @ 0x1] silence_start: 30\n\
                   [silencedetect @ 0x1] silence_end: nan?\n\
                   [silencedetect @ 0x1] silence_start: 40\n\
                   [silencedetect @ 0x1] silence_end: 41";
        let intervals = parse_silence_events(log, 0.3);
        assert_eq!(intervals, vec![SilenceInterval::new(40.0, 41.0).unwrap()]);
    }

    #[test]
    fn test_short_silences_filtered() {
        let log = "[silencedetect @ 0x1] silence_start: 1\n\
                   [silencedetect @ 0x1] silence_end: 1.2 | silence_duration: 0.2\n\
                   [silencedetect @ 0x1] silence_start: 5\n\
                   [silencedetect @ 0x1] silence_end: 5.3 | silence_duration: 0.3";
        let intervals = parse_silence_events(log, 0.3);
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].start, 5.0);
    }

    #[test]
    fn test_negative_start_clamped() {
        let log = "[silencedetect @ 0x1] silence_start: -0.0133\n\
                   [silencedetect @ 0x1] silence_end: 1.5 | silence_duration: 1.51";
        let intervals = parse_silence_events(log, 0.3);
        assert_eq!(intervals[0].start, 0.0);
        assert_eq!(intervals[0].end, 1.5);
    }

    #[test]
    fn test_parse_scene_marks_sorted() {
        let log = "\
[Parsed_showinfo_1 @ 0x55] n:   1 pts: 368640 pts_time:24.0    duration:512 fmt:yuv420p
[Parsed_showinfo_1 @ 0x55] n:   0 pts: 153600 pts_time:10      duration:512 fmt:yuv420p
[Parsed_showinfo_1 @ 0x55] n:   2 pts: ?????? pts_time:garbage
frame=  100 fps=0.0 q=-0.0 size=N/A time=00:00:04.00 bitrate=N/A
[Parsed_showinfo_1 @ 0x55] n:   3 pts: 1 pts_time:130.5";
        let marks = parse_scene_events(log);
        assert_eq!(marks, vec![SceneMark(10.0), SceneMark(24.0), SceneMark(130.5)]);
    }

    struct UnavailableBackend;

    #[async_trait::async_trait]
    impl MediaBackend for UnavailableBackend {
        async fn probe(&self, source: &Path) -> crate::MediaResult<crate::VideoInfo> {
            Err(crate::MediaError::FileNotFound(source.to_path_buf()))
        }

        async fn scan_silence(&self, _source: &Path, _db: f64, _min: f64) -> crate::MediaResult<String> {
            Err(crate::MediaError::FfmpegNotFound)
        }

        async fn scan_scenes(&self, _source: &Path, _threshold: f64) -> crate::MediaResult<String> {
            Err(crate::MediaError::FfmpegNotFound)
        }

        async fn materialize(&self, _request: &crate::MaterializeRequest) -> crate::MediaResult<()> {
            Err(crate::MediaError::FfmpegNotFound)
        }
    }

    #[test]
    fn test_failed_scans_yield_no_events() {
        let source = Path::new("missing.mkv");
        let config = DetectionConfig::default();

        let silences = tokio_test::block_on(detect_silence(&UnavailableBackend, source, &config));
        let scenes = tokio_test::block_on(detect_scenes(&UnavailableBackend, source, 0.4));

        assert!(silences.is_empty());
        assert!(scenes.is_empty());
    }

    #[test]
    fn test_empty_output_yields_no_events() {
        assert!(parse_silence_events("", 0.3).is_empty());
        assert!(parse_scene_events("").is_empty());
    }
}
