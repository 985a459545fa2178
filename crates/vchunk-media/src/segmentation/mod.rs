//! Segmentation planning.
//!
//! | Strategy | Scans | Cut rule |
//! |----------|-------|----------|
//! | `fixed` | none | every `target` seconds |
//! | `silence` | silencedetect | midpoint of the longest silence in the window |
//! | `scene` | scene score | scene mark closest to the ideal cut |
//! | `smart` | scenes at a loose threshold, then silences | first of the above with enough events, else `fixed` |
//!
//! [`resolve_strategy`] runs the scans, [`Segmenter::plan`] is pure.

pub mod planner;
pub mod smart;

pub use planner::{PlanningSignals, Segmenter, SmartRule};
pub use smart::{resolve_strategy, ResolvedPlan};
