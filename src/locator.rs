use std::ops::Range;

use crate::catalog::FieldKind;
use crate::rules::RuleBook;
use crate::semantic::{Detection, DetectionStrategy, PlaceholderSlot, SlotOrigin};
use crate::strategies::{AlternateSyntaxStrategy, BareMarkerStrategy, StructuralStrategy};
use crate::utility::{chars_back, chars_forward};

/// Characters of context kept on each side of a slot.
pub const CONTEXT_WINDOW: usize = 200;

/// Runs detection strategies over a template and keeps the most productive
/// one. Strategies are tried in the order they were added; on equal counts
/// the earlier one wins.
#[derive(Debug, Default)]
pub struct PlaceholderLocator {
    strategies: Vec<Box<dyn DetectionStrategy>>,
}

impl PlaceholderLocator {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Bare markers, then alternate syntaxes, then row labels.
    pub fn with_defaults(rules: &RuleBook) -> Self {
        Self::new()
            .add(BareMarkerStrategy::new())
            .add(AlternateSyntaxStrategy::new())
            .add(StructuralStrategy::new(rules))
    }

    pub fn add<S: DetectionStrategy + 'static>(mut self, strategy: S) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Slots in document order, names left empty for the namer.
    ///
    /// Never empty: when no strategy finds anything the sixteen catalog
    /// fields come back as positionless fallback slots.
    pub fn locate(&self, text: &str) -> Vec<PlaceholderSlot> {
        let mut best: Option<(&dyn DetectionStrategy, Vec<Detection>)> = None;

        for strategy in &self.strategies {
            let found = Self::ordered(strategy.detect(text));
            tracing::debug!(strategy = strategy.name(), count = found.len(), "detection pass");

            let better = match &best {
                Some((_, current)) => found.len() > current.len(),
                None => !found.is_empty(),
            };
            if better {
                best = Some((strategy.as_ref(), found));
            }
        }

        match best {
            Some((strategy, detections)) => {
                tracing::debug!(
                    strategy = strategy.name(),
                    slots = detections.len(),
                    "selected detection strategy"
                );
                Self::build_slots(text, strategy.origin(), detections)
            }
            None => {
                tracing::warn!("no placeholders found, using the catalog field list");
                Self::fallback_slots()
            }
        }
    }

    /// Sorted by offset, one detection per offset.
    fn ordered(mut detections: Vec<Detection>) -> Vec<Detection> {
        detections.sort_by_key(|d| (d.span.start, d.span.end));
        detections.dedup_by_key(|d| d.span.start);
        detections
    }

    fn build_slots(text: &str, origin: SlotOrigin, detections: Vec<Detection>) -> Vec<PlaceholderSlot> {
        let spans: Vec<Range<usize>> = detections.iter().map(|d| d.span.clone()).collect();

        detections
            .into_iter()
            .enumerate()
            .map(|(index, detection)| {
                let span = detection.span;
                let floor = if index > 0 { spans[index - 1].end.min(span.start) } else { 0 };
                let line_end = text[span.end..]
                    .find('\n')
                    .map(|offset| span.end + offset)
                    .unwrap_or(text.len());
                let ceil = spans
                    .get(index + 1)
                    .map(|next| next.start.max(span.end).min(line_end))
                    .unwrap_or(line_end);

                let before_start = chars_back(text, span.start, CONTEXT_WINDOW, floor);
                let after_end = chars_forward(text, span.end, CONTEXT_WINDOW, ceil);

                PlaceholderSlot {
                    index,
                    context_before: text[before_start..span.start].to_string(),
                    context_after: text[span.end..after_end].to_string(),
                    span: Some(span),
                    candidate_name: detection.candidate_name,
                    name: String::new(),
                    origin,
                }
            })
            .collect()
    }

    fn fallback_slots() -> Vec<PlaceholderSlot> {
        FieldKind::ALL
            .iter()
            .enumerate()
            .map(|(index, kind)| PlaceholderSlot {
                index,
                span: None,
                context_before: String::new(),
                context_after: String::new(),
                candidate_name: Some(kind.canonical_name().to_string()),
                name: String::new(),
                origin: SlotOrigin::Fallback,
            })
            .collect()
    }
}
