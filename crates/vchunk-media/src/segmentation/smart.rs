//! Strategy resolution.
//!
//! Runs only the scans a strategy needs. `smart` probes scene changes at a
//! loose threshold first, then silences, and settles on `fixed` when neither
//! produced enough events. The chain runs once per file and its outcome
//! applies to every cut of that file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use vchunk_models::{DetectionConfig, SplitStrategy};

use super::planner::{PlanningSignals, SmartRule};
use crate::backend::MediaBackend;
use crate::detection::{detect_scenes, detect_silence};

impl From<&DetectionConfig> for SmartRule {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            min_scene_marks: config.smart_min_scene_marks,
            min_silences: config.smart_min_silences,
        }
    }
}

/// The concrete strategy for a file and the events gathered for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlan {
    /// Never [`SplitStrategy::Smart`]
    pub strategy: SplitStrategy,
    pub signals: PlanningSignals,
}

/// Resolve `requested` for `source`, running the detection scans it needs.
///
/// Scan failures degrade to "no events" and therefore, for event-driven
/// strategies, to fixed-interval cuts.
pub async fn resolve_strategy(
    backend: &dyn MediaBackend,
    source: &Path,
    requested: SplitStrategy,
    config: &DetectionConfig,
) -> ResolvedPlan {
    let resolved = match requested {
        SplitStrategy::Fixed => ResolvedPlan {
            strategy: SplitStrategy::Fixed,
            signals: PlanningSignals::default(),
        },
        SplitStrategy::Silence => ResolvedPlan {
            strategy: SplitStrategy::Silence,
            signals: PlanningSignals::with_silences(detect_silence(backend, source, config).await),
        },
        SplitStrategy::Scene => ResolvedPlan {
            strategy: SplitStrategy::Scene,
            signals: PlanningSignals::with_scenes(
                detect_scenes(backend, source, config.scene_threshold).await,
            ),
        },
        SplitStrategy::Smart => resolve_smart(backend, source, config).await,
    };

    info!(
        file = %source.display(),
        requested = %requested,
        strategy = %resolved.strategy,
        silences = resolved.signals.silences.len(),
        scenes = resolved.signals.scenes.len(),
        "Resolved split strategy"
    );
    resolved
}

async fn resolve_smart(backend: &dyn MediaBackend, source: &Path, config: &DetectionConfig) -> ResolvedPlan {
    let rule = SmartRule::from(config);

    // The loose-threshold marks are reused for planning; no second scan.
    let scenes = detect_scenes(backend, source, config.smart_scene_threshold).await;
    let mut signals = PlanningSignals::with_scenes(scenes);
    if rule.choose(&signals) == SplitStrategy::Scene {
        return ResolvedPlan {
            strategy: SplitStrategy::Scene,
            signals,
        };
    }

    signals.silences = detect_silence(backend, source, config).await;
    ResolvedPlan {
        strategy: rule.choose(&signals),
        signals,
    }
}
