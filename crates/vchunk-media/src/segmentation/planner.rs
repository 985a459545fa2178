//! Cut-point planning.
//!
//! Every event-driven strategy shares one windowed search. From the last
//! accepted cut `current`, candidates are looked for in
//!
//! ```text
//! [current + target - window, min(current + target + window, total)]
//! ```
//!
//! and when nothing qualifies the cut falls back to
//! `min(current + target, total)`. A candidate is accepted only if it lies
//! strictly between `current` and `total`; the first rejected candidate ends
//! the plan, so the last chunk runs from the final cut to the end of file.

use serde::{Deserialize, Serialize};
use tracing::debug;

use vchunk_models::{CutPoints, PlanError, PlannerConfig, SceneMark, SilenceInterval, SplitStrategy};

/// Detected events available to the planner for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanningSignals {
    pub silences: Vec<SilenceInterval>,
    pub scenes: Vec<SceneMark>,
}

impl PlanningSignals {
    pub fn with_silences(silences: Vec<SilenceInterval>) -> Self {
        Self {
            silences,
            scenes: Vec::new(),
        }
    }

    pub fn with_scenes(scenes: Vec<SceneMark>) -> Self {
        Self {
            silences: Vec::new(),
            scenes,
        }
    }
}

/// Minimum event counts for the smart chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartRule {
    /// Scene marks needed to choose `scene`
    pub min_scene_marks: usize,
    /// Silence intervals needed to choose `silence`
    pub min_silences: usize,
}

impl Default for SmartRule {
    fn default() -> Self {
        Self {
            min_scene_marks: 3,
            min_silences: 2,
        }
    }
}

impl SmartRule {
    /// Strategy the smart chain settles on given the events found.
    pub fn choose(&self, signals: &PlanningSignals) -> SplitStrategy {
        if signals.scenes.len() >= self.min_scene_marks {
            SplitStrategy::Scene
        } else if signals.silences.len() >= self.min_silences {
            SplitStrategy::Silence
        } else {
            SplitStrategy::Fixed
        }
    }
}

/// Cut rule applied inside the planning loop.
#[derive(Debug, Clone, Copy)]
enum CutRule {
    Fixed,
    Silence,
    Scene,
}

/// Turns a duration, a strategy and detected events into cut points.
#[derive(Debug, Clone, Copy, Default)]
pub struct Segmenter {
    config: PlannerConfig,
    smart: SmartRule,
}

impl Segmenter {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            smart: SmartRule::default(),
        }
    }

    pub fn with_smart_rule(mut self, smart: SmartRule) -> Self {
        self.smart = smart;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan the cut points for a file of `total` seconds.
    ///
    /// `Smart` is resolved against `signals` with this segmenter's
    /// [`SmartRule`]. The result always starts with 0; a file no longer than
    /// the target yields exactly `[0]`.
    pub fn plan(
        &self,
        total: f64,
        strategy: SplitStrategy,
        signals: &PlanningSignals,
    ) -> Result<CutPoints, PlanError> {
        self.config.validate()?;
        if !total.is_finite() || total < 0.0 {
            return Err(PlanError::InvalidTotalDuration(total));
        }

        let rule = match strategy {
            SplitStrategy::Fixed => CutRule::Fixed,
            SplitStrategy::Silence => CutRule::Silence,
            SplitStrategy::Scene => CutRule::Scene,
            SplitStrategy::Smart => match self.smart.choose(signals) {
                SplitStrategy::Scene => CutRule::Scene,
                SplitStrategy::Silence => CutRule::Silence,
                _ => CutRule::Fixed,
            },
        };

        let target = self.config.target_duration;
        let mut cuts = CutPoints::new();
        if total <= target {
            return Ok(cuts);
        }

        loop {
            let current = cuts.last();
            let fallback = (current + target).min(total);
            let candidate = match rule {
                CutRule::Fixed => fallback,
                CutRule::Silence => self
                    .best_silence(current, total, &signals.silences)
                    .map(|interval| interval.midpoint())
                    .unwrap_or(fallback),
                CutRule::Scene => self
                    .best_scene(current, total, &signals.scenes)
                    .map(SceneMark::seconds)
                    .unwrap_or(fallback),
            };

            if !cuts.try_push(candidate, total) {
                break;
            }
            debug!(cut = candidate, from = current, "Accepted cut point");
        }

        Ok(cuts)
    }

    /// Search bounds around the next ideal cut after `current`.
    fn window(&self, current: f64, total: f64) -> (f64, f64) {
        let PlannerConfig {
            target_duration,
            search_window,
        } = self.config;
        (
            current + (target_duration - search_window),
            (current + target_duration + search_window).min(total),
        )
    }

    /// Longest silence starting inside the window; earliest wins ties.
    fn best_silence<'a>(
        &self,
        current: f64,
        total: f64,
        silences: &'a [SilenceInterval],
    ) -> Option<&'a SilenceInterval> {
        let (search_start, search_end) = self.window(current, total);
        silences
            .iter()
            .filter(|s| s.start >= search_start && s.start <= search_end)
            .fold(None, |best: Option<&SilenceInterval>, s| match best {
                Some(b) if s.duration <= b.duration => Some(b),
                _ => Some(s),
            })
    }

    /// Scene mark inside the window closest to the ideal cut; earliest wins ties.
    fn best_scene(&self, current: f64, total: f64, scenes: &[SceneMark]) -> Option<SceneMark> {
        let (search_start, search_end) = self.window(current, total);
        let ideal = current + self.config.target_duration;
        scenes
            .iter()
            .copied()
            .filter(|m| m.0 >= search_start && m.0 <= search_end)
            .fold(None, |best: Option<SceneMark>, m| match best {
                Some(b) if (m.0 - ideal).abs() >= (b.0 - ideal).abs() => Some(b),
                _ => Some(m),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter() -> Segmenter {
        Segmenter::new(PlannerConfig::new(120.0, 20.0))
    }

    fn silence(start: f64, end: f64) -> SilenceInterval {
        SilenceInterval::new(start, end).unwrap()
    }

    /// Deterministic xorshift stream for sweeping inputs.
    fn pseudo_random(seed: u64) -> impl Iterator<Item = f64> {
        let mut state = seed.max(1);
        std::iter::from_fn(move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            Some((state % 1_000_000) as f64 / 1_000_000.0)
        })
    }

    #[test]
    fn test_silence_scenario() {
        let signals = PlanningSignals::with_silences(vec![silence(115.0, 116.0), silence(235.0, 237.0)]);
        let cuts = segmenter().plan(300.0, SplitStrategy::Silence, &signals).unwrap();

        assert_eq!(cuts.as_slice(), &[0.0, 115.5, 236.0]);
        let ranges: Vec<(f64, f64)> = cuts.ranges(300.0).iter().map(|r| (r.start, r.end)).collect();
        assert_eq!(ranges, vec![(0.0, 115.5), (115.5, 236.0), (236.0, 300.0)]);
    }

    #[test]
    fn test_silence_without_events_falls_back() {
        let cuts = segmenter()
            .plan(300.0, SplitStrategy::Silence, &PlanningSignals::default())
            .unwrap();
        assert_eq!(cuts.as_slice(), &[0.0, 120.0, 240.0]);
        let lengths: Vec<f64> = cuts.ranges(300.0).iter().map(|r| r.duration()).collect();
        assert_eq!(lengths, vec![120.0, 120.0, 60.0]);
    }

    #[test]
    fn test_short_file_is_single_chunk_for_every_strategy() {
        let signals = PlanningSignals {
            silences: vec![silence(105.0, 107.0)],
            scenes: vec![SceneMark(100.0), SceneMark(110.0)],
        };
        for strategy in SplitStrategy::ALL {
            for total in [0.0, 1.0, 110.0, 120.0] {
                let cuts = segmenter().plan(total, *strategy, &signals).unwrap();
                assert_eq!(cuts.as_slice(), &[0.0], "{strategy} with total {total}");
            }
        }
    }

    #[test]
    fn test_fixed_spacing() {
        let segmenter = Segmenter::new(PlannerConfig::new(45.0, 10.0));
        let cuts = segmenter
            .plan(1000.0, SplitStrategy::Fixed, &PlanningSignals::default())
            .unwrap();

        for pair in cuts.as_slice().windows(2) {
            assert_eq!(pair[1] - pair[0], 45.0);
        }
        let last = cuts.ranges(1000.0).last().copied().unwrap();
        assert!(last.duration() < 45.0 || (last.duration() - 45.0).abs() < 1e-9);
        assert_eq!(cuts.len(), 23);
    }

    #[test]
    fn test_fixed_exact_multiple_has_no_empty_tail() {
        let cuts = segmenter()
            .plan(360.0, SplitStrategy::Fixed, &PlanningSignals::default())
            .unwrap();
        assert_eq!(cuts.as_slice(), &[0.0, 120.0, 240.0]);
    }

    #[test]
    fn test_float_drift_leaves_no_sliver_tail() {
        let segmenter = Segmenter::new(PlannerConfig::new(33.3, 5.0));
        let cuts = segmenter
            .plan(99.9, SplitStrategy::Fixed, &PlanningSignals::default())
            .unwrap();

        assert_eq!(cuts.len(), 3);
        let last = cuts.ranges(99.9).last().copied().unwrap();
        assert!((last.duration() - 33.3).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_ignores_signals() {
        let signals = PlanningSignals::with_silences(vec![silence(110.0, 112.0)]);
        let cuts = segmenter().plan(300.0, SplitStrategy::Fixed, &signals).unwrap();
        assert_eq!(cuts.as_slice(), &[0.0, 120.0, 240.0]);
    }

    #[test]
    fn test_longest_silence_wins() {
        let signals = PlanningSignals::with_silences(vec![
            silence(101.0, 102.0),
            silence(125.0, 128.0),
            silence(139.0, 140.5),
        ]);
        let cuts = segmenter().plan(200.0, SplitStrategy::Silence, &signals).unwrap();
        assert_eq!(cuts.as_slice(), &[0.0, 126.5]);
    }

    #[test]
    fn test_silence_tie_prefers_earliest() {
        let signals = PlanningSignals::with_silences(vec![silence(110.0, 112.0), silence(130.0, 132.0)]);
        let cuts = segmenter().plan(200.0, SplitStrategy::Silence, &signals).unwrap();
        assert_eq!(cuts.as_slice(), &[0.0, 111.0]);
    }

    #[test]
    fn test_silence_outside_window_ignored() {
        // 99 is just before the window, 141 just after.
        let signals = PlanningSignals::with_silences(vec![silence(99.0, 105.0), silence(141.0, 150.0)]);
        let cuts = segmenter().plan(200.0, SplitStrategy::Silence, &signals).unwrap();
        assert_eq!(cuts.as_slice(), &[0.0, 120.0]);
    }

    #[test]
    fn test_silence_window_bounds_inclusive() {
        let signals = PlanningSignals::with_silences(vec![silence(100.0, 100.5)]);
        let cuts = segmenter().plan(200.0, SplitStrategy::Silence, &signals).unwrap();
        assert_eq!(cuts.as_slice(), &[0.0, 100.25]);
    }

    #[test]
    fn test_silence_midpoint_past_end_stops() {
        // Window end is clamped to the total, but the midpoint can still land
        // on or after it; the plan must stop rather than emit that cut.
        let signals = PlanningSignals::with_silences(vec![silence(139.0, 141.0)]);
        let cuts = segmenter().plan(140.0, SplitStrategy::Silence, &signals).unwrap();
        assert_eq!(cuts.as_slice(), &[0.0]);
    }

    #[test]
    fn test_scene_closest_to_target() {
        let signals = PlanningSignals::with_scenes(vec![
            SceneMark(90.0),
            SceneMark(104.0),
            SceneMark(123.0),
            SceneMark(135.0),
        ]);
        let cuts = segmenter().plan(200.0, SplitStrategy::Scene, &signals).unwrap();
        assert_eq!(cuts.as_slice(), &[0.0, 123.0]);
    }

    #[test]
    fn test_scene_tie_prefers_earliest() {
        let signals = PlanningSignals::with_scenes(vec![SceneMark(115.0), SceneMark(125.0)]);
        let cuts = segmenter().plan(200.0, SplitStrategy::Scene, &signals).unwrap();
        assert_eq!(cuts.as_slice(), &[0.0, 115.0]);
    }

    #[test]
    fn test_scene_fallback_then_resume() {
        let signals = PlanningSignals::with_scenes(vec![SceneMark(250.0)]);
        let cuts = segmenter().plan(400.0, SplitStrategy::Scene, &signals).unwrap();
        // No mark near 120 -> fixed fallback; then 250 is within [220, 260].
        assert_eq!(cuts.as_slice(), &[0.0, 120.0, 250.0, 370.0]);
    }

    #[test]
    fn test_smart_uses_available_signals() {
        let segmenter = segmenter();
        let scenes = PlanningSignals::with_scenes(vec![SceneMark(50.0), SceneMark(118.0), SceneMark(240.0)]);
        assert_eq!(
            segmenter.plan(300.0, SplitStrategy::Smart, &scenes).unwrap().as_slice(),
            &[0.0, 118.0, 240.0]
        );

        let few_scenes = PlanningSignals {
            silences: vec![silence(115.0, 116.0), silence(235.0, 237.0)],
            scenes: vec![SceneMark(50.0)],
        };
        assert_eq!(
            segmenter.plan(300.0, SplitStrategy::Smart, &few_scenes).unwrap().as_slice(),
            &[0.0, 115.5, 236.0]
        );

        let nothing = PlanningSignals::with_silences(vec![silence(115.0, 116.0)]);
        assert_eq!(
            segmenter.plan(300.0, SplitStrategy::Smart, &nothing).unwrap().as_slice(),
            &[0.0, 120.0, 240.0]
        );
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        let bad_target = Segmenter::new(PlannerConfig::new(0.0, 20.0));
        assert_eq!(
            bad_target.plan(300.0, SplitStrategy::Fixed, &PlanningSignals::default()),
            Err(PlanError::InvalidTargetDuration(0.0))
        );

        assert!(segmenter()
            .plan(f64::NAN, SplitStrategy::Fixed, &PlanningSignals::default())
            .is_err());
        assert!(segmenter()
            .plan(-1.0, SplitStrategy::Fixed, &PlanningSignals::default())
            .is_err());
    }

    #[test]
    fn test_event_cuts_respect_window_and_idempotence() {
        let mut rng = pseudo_random(0x5eed);
        for _ in 0..50 {
            let total = 200.0 + rng.next().unwrap() * 3000.0;
            let mut silences = Vec::new();
            let mut t = 0.0;
            while t < total {
                t += 5.0 + rng.next().unwrap() * 60.0;
                let len = 0.3 + rng.next().unwrap() * 4.0;
                silences.push(silence(t, t + len));
                t += len;
            }
            let scenes: Vec<SceneMark> = (0..(total as usize / 40))
                .map(|i| SceneMark(i as f64 * 40.0 + rng.next().unwrap() * 39.0))
                .collect();
            let signals = PlanningSignals {
                silences: silences.clone(),
                scenes: scenes.clone(),
            };

            let seg = segmenter();
            let silence_cuts = seg.plan(total, SplitStrategy::Silence, &signals).unwrap();
            let scene_cuts = seg.plan(total, SplitStrategy::Scene, &signals).unwrap();

            assert_eq!(silence_cuts, seg.plan(total, SplitStrategy::Silence, &signals).unwrap());
            assert_eq!(scene_cuts, seg.plan(total, SplitStrategy::Scene, &signals).unwrap());

            for pair in silence_cuts.as_slice().windows(2) {
                let (prev, cut) = (pair[0], pair[1]);
                assert!(cut > prev && cut < total);
                if let Some(s) = silences.iter().find(|s| s.midpoint() == cut) {
                    assert!(s.start >= prev + 100.0 && s.start <= prev + 140.0);
                } else {
                    assert_eq!(cut, prev + 120.0);
                }
            }

            for pair in scene_cuts.as_slice().windows(2) {
                let (prev, cut) = (pair[0], pair[1]);
                assert!(cut > prev && cut < total);
                let is_mark = scenes.iter().any(|m| m.0 == cut);
                assert!(is_mark || cut == prev + 120.0);
                if is_mark {
                    assert!(cut >= prev + 100.0 && cut <= prev + 140.0);
                }
            }
        }
    }
}
