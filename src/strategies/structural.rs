use regex::Regex;

use crate::rules::RuleBook;
use crate::semantic::{Detection, DetectionStrategy, SlotOrigin};

/// Test-panel row labels as implied placeholders.
///
/// Flattening can drop marker glyphs, so a known label counts as a slot on its
/// own when it heads a line or a table cell. When a `{}` still follows the
/// label on the same line (before the next label) that marker is the slot.
/// Otherwise a table row gets an insertion point in its last empty cell, and
/// any other line one right after the label.
#[derive(Debug, Clone)]
pub struct StructuralStrategy {
    labels: Vec<(String, Regex)>,
    marker: Regex,
}

struct LabelHit {
    start: usize,
    end: usize,
    name: String,
}

impl StructuralStrategy {
    pub fn new(rules: &RuleBook) -> Self {
        Self {
            labels: rules
                .fields()
                .iter()
                .map(|f| (f.name.clone(), f.label.clone()))
                .collect(),
            marker: Regex::new(r"\{[ \t]*\}").unwrap(),
        }
    }

    fn label_hits(&self, text: &str) -> Vec<LabelHit> {
        let mut hits: Vec<LabelHit> = self
            .labels
            .iter()
            .flat_map(|(name, re)| {
                re.find_iter(text)
                    .filter(|m| heads_row(text, m.start()))
                    .map(move |m| LabelHit {
                        start: m.start(),
                        end: m.end(),
                        name: name.clone(),
                    })
            })
            .collect();

        hits.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        let mut kept: Vec<LabelHit> = Vec::with_capacity(hits.len());
        for hit in hits {
            if kept.last().is_some_and(|last| hit.start < last.end) {
                continue;
            }
            kept.push(hit);
        }
        kept
    }
}

fn line_start(text: &str, idx: usize) -> usize {
    text[..idx].rfind('\n').map_or(0, |nl| nl + 1)
}

/// Only whitespace or a cell border precedes `start` on its line.
fn heads_row(text: &str, start: usize) -> bool {
    let before = &text[line_start(text, start)..start];
    let trimmed = before.trim_end();
    trimmed.is_empty() || trimmed.ends_with('|') || before.ends_with('\t')
}

/// Offset just inside the last blank `| |` cell of `text[from..limit]`.
fn last_empty_cell(text: &str, from: usize, limit: usize) -> Option<usize> {
    let pipes: Vec<usize> = text[from..limit].match_indices('|').map(|(i, _)| from + i).collect();
    pipes
        .windows(2)
        .rev()
        .find(|pair| text[pair[0] + 1..pair[1]].trim().is_empty())
        .map(|pair| pair[0] + 1)
}

impl DetectionStrategy for StructuralStrategy {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn origin(&self) -> SlotOrigin {
        SlotOrigin::Structural
    }

    fn detect(&self, text: &str) -> Vec<Detection> {
        let hits = self.label_hits(text);
        let mut detections = Vec::with_capacity(hits.len());

        for (i, hit) in hits.iter().enumerate() {
            let line_end = text[hit.end..]
                .find('\n')
                .map(|offset| hit.end + offset)
                .unwrap_or(text.len());
            let limit = hits
                .get(i + 1)
                .map(|next| next.start.min(line_end))
                .unwrap_or(line_end);

            let is_table_row = text[line_start(text, hit.start)..].trim_start().starts_with('|');
            let span = match self.marker.find(&text[hit.end..limit]) {
                Some(m) => hit.end + m.start()..hit.end + m.end(),
                None => {
                    let at = is_table_row
                        .then(|| last_empty_cell(text, hit.end, limit))
                        .flatten()
                        .unwrap_or(hit.end);
                    at..at
                }
            };

            detections.push(Detection {
                span,
                candidate_name: Some(hit.name.clone()),
            });
        }

        detections
    }
}
