//! Designer session configuration.
//!
//! The tuning margins used by position resolution are empirical values, so
//! they live here instead of in the search code.
//!
//! # Environment
//!
//! - `FORMLAY_PAINT_ALIGNMENT`: "1"/"true" to paint alignment hints
//! - `FORMLAY_PAINT_GAPS`: "1"/"true" to paint gaps
//! - `FORMLAY_CLOSED_GROUP_MARGIN`: entry margin for closed groups (px)
//! - `FORMLAY_VERTICAL_OVERLAP_MARGIN`: vertical overlap tolerance (px)
//! - `FORMLAY_CENTER_TOLERANCE`: slack for center/same-edge comparisons (px)

use serde::{Deserialize, Serialize};

/// Default margin a target must penetrate before entering a closed group.
pub const DEFAULT_CLOSED_GROUP_MARGIN: i32 = 10;

/// Default overlap slack applied only when placing along the vertical axis.
pub const DEFAULT_VERTICAL_OVERLAP_MARGIN: i32 = 4;

/// Default slack when comparing centers and edges.
pub const DEFAULT_CENTER_TOLERANCE: i32 = 5;

/// Lower bound for every margin.
pub const MIN_MARGIN: i32 = 0;

/// Upper bound for every margin.
pub const MAX_MARGIN: i32 = 64;

/// Configuration threaded through one designer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignerConfig {
    /// Ask the renderer to paint alignment hints for the selection.
    pub paint_alignment: bool,
    /// Ask the renderer to paint gaps.
    pub paint_gaps: bool,
    pub closed_group_margin: i32,
    pub vertical_overlap_margin: i32,
    pub center_tolerance: i32,
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self {
            paint_alignment: false,
            paint_gaps: false,
            closed_group_margin: DEFAULT_CLOSED_GROUP_MARGIN,
            vertical_overlap_margin: DEFAULT_VERTICAL_OVERLAP_MARGIN,
            center_tolerance: DEFAULT_CENTER_TOLERANCE,
        }
    }
}

impl DesignerConfig {
    #[must_use]
    pub fn with_paint_alignment(mut self, paint: bool) -> Self {
        self.paint_alignment = paint;
        self
    }

    #[must_use]
    pub fn with_paint_gaps(mut self, paint: bool) -> Self {
        self.paint_gaps = paint;
        self
    }

    #[must_use]
    pub fn with_closed_group_margin(mut self, margin: i32) -> Self {
        self.closed_group_margin = margin;
        self
    }

    #[must_use]
    pub fn with_vertical_overlap_margin(mut self, margin: i32) -> Self {
        self.vertical_overlap_margin = margin;
        self
    }

    #[must_use]
    pub fn with_center_tolerance(mut self, tolerance: i32) -> Self {
        self.center_tolerance = tolerance;
        self
    }

    /// Load config from environment variables, clamped to valid ranges.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("FORMLAY_PAINT_ALIGNMENT") {
            config.paint_alignment = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("FORMLAY_PAINT_GAPS") {
            config.paint_gaps = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("FORMLAY_CLOSED_GROUP_MARGIN")
            && let Ok(px) = val.parse::<i32>()
        {
            config.closed_group_margin = px;
        }

        if let Ok(val) = std::env::var("FORMLAY_VERTICAL_OVERLAP_MARGIN")
            && let Ok(px) = val.parse::<i32>()
        {
            config.vertical_overlap_margin = px;
        }

        if let Ok(val) = std::env::var("FORMLAY_CENTER_TOLERANCE")
            && let Ok(px) = val.parse::<i32>()
        {
            config.center_tolerance = px;
        }

        config.validated()
    }

    /// Clamp every margin to `MIN_MARGIN..=MAX_MARGIN`.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.closed_group_margin = self.closed_group_margin.clamp(MIN_MARGIN, MAX_MARGIN);
        self.vertical_overlap_margin = self.vertical_overlap_margin.clamp(MIN_MARGIN, MAX_MARGIN);
        self.center_tolerance = self.center_tolerance.clamp(MIN_MARGIN, MAX_MARGIN);
        self
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        *self == self.validated()
    }
}

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tuning_constants() {
        let config = DesignerConfig::default();
        assert_eq!(config.closed_group_margin, 10);
        assert_eq!(config.vertical_overlap_margin, 4);
        assert!(!config.paint_gaps);
        assert!(config.is_valid());
    }

    #[test]
    fn validated_clamps_margins() {
        let config = DesignerConfig::default()
            .with_closed_group_margin(500)
            .with_vertical_overlap_margin(-3)
            .validated();
        assert_eq!(config.closed_group_margin, MAX_MARGIN);
        assert_eq!(config.vertical_overlap_margin, MIN_MARGIN);
    }

    #[test]
    fn flags_accept_numeric_and_word_forms() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("yes"));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = DesignerConfig::default().with_paint_gaps(true);
        let json = serde_json::to_string(&config).expect("serialize");
        let back: DesignerConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, config);
    }
}
