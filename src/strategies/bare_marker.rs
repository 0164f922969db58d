use regex::Regex;

use crate::semantic::{Detection, DetectionStrategy, SlotOrigin};

/// Finds every literal `{}` marker, inner whitespace allowed.
#[derive(Debug, Clone)]
pub struct BareMarkerStrategy {
    marker: Regex,
}

impl Default for BareMarkerStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl BareMarkerStrategy {
    pub fn new() -> Self {
        Self {
            marker: Regex::new(r"\{[ \t]*\}").unwrap(),
        }
    }
}

impl DetectionStrategy for BareMarkerStrategy {
    fn name(&self) -> &'static str {
        "bare_marker"
    }

    fn origin(&self) -> SlotOrigin {
        SlotOrigin::BareMarker
    }

    fn detect(&self, text: &str) -> Vec<Detection> {
        self.marker
            .find_iter(text)
            .map(|m| Detection {
                span: m.range(),
                candidate_name: None,
            })
            .collect()
    }
}
