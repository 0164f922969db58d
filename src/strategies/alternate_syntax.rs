use regex::Regex;

use crate::semantic::{Detection, DetectionStrategy, SlotOrigin};

const HTML_TAGS: &[&str] = &[
    "p", "br", "hr", "b", "i", "u", "em", "strong", "span", "div", "table", "tr", "td", "th",
    "thead", "tbody", "ul", "ol", "li", "sup", "sub",
];

/// Named placeholders: `{{name}}`, `[name]`, `__name__`, `${name}`, `<name>`.
#[derive(Debug, Clone)]
pub struct AlternateSyntaxStrategy {
    syntaxes: Vec<(&'static str, Regex)>,
}

impl Default for AlternateSyntaxStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl AlternateSyntaxStrategy {
    pub fn new() -> Self {
        let syntaxes = vec![
            ("double_brace", Regex::new(r"\{\{\s*([^{}\s][^{}]*?)\s*\}\}").unwrap()),
            ("dollar_brace", Regex::new(r"\$\{\s*([^{}\s][^{}]*?)\s*\}").unwrap()),
            ("bracket", Regex::new(r"\[\s*([A-Za-z][A-Za-z0-9_ .\-]*?)\s*\]").unwrap()),
            ("underscore", Regex::new(r"__([A-Za-z][A-Za-z0-9_ ]*?[A-Za-z0-9])__").unwrap()),
            ("angle", Regex::new(r"<\s*([A-Za-z][A-Za-z0-9_ ]*?)\s*>").unwrap()),
        ];
        Self { syntaxes }
    }

    fn is_html_tag(inner: &str) -> bool {
        HTML_TAGS.contains(&inner.trim().to_ascii_lowercase().as_str())
    }
}

impl DetectionStrategy for AlternateSyntaxStrategy {
    fn name(&self) -> &'static str {
        "alternate_syntax"
    }

    fn origin(&self) -> SlotOrigin {
        SlotOrigin::AlternateSyntax
    }

    fn detect(&self, text: &str) -> Vec<Detection> {
        let mut found: Vec<Detection> = Vec::new();

        for (syntax, re) in &self.syntaxes {
            for caps in re.captures_iter(text) {
                let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                if *syntax == "angle" && Self::is_html_tag(inner.as_str()) {
                    continue;
                }
                found.push(Detection {
                    span: whole.range(),
                    candidate_name: Some(inner.as_str().to_string()),
                });
            }
        }

        // earliest start wins, longer match first on equal starts
        found.sort_by(|a, b| {
            a.span
                .start
                .cmp(&b.span.start)
                .then(b.span.end.cmp(&a.span.end))
        });

        let mut kept: Vec<Detection> = Vec::with_capacity(found.len());
        for detection in found {
            if kept
                .last()
                .is_some_and(|last| detection.span.start < last.span.end)
            {
                continue;
            }
            kept.push(detection);
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(text: &str) -> Vec<String> {
        AlternateSyntaxStrategy::new()
            .detect(text)
            .into_iter()
            .filter_map(|d| d.candidate_name)
            .collect()
    }

    #[test]
    fn test_all_syntaxes() {
        let text = "A {{product_name}} B [Batch No] C __expiry_date__ D ${ph} E <appearance>";
        assert_eq!(
            names(text),
            vec!["product_name", "Batch No", "expiry_date", "ph", "appearance"]
        );
    }

    #[test]
    fn test_html_tags_are_not_placeholders() {
        assert_eq!(names("<p>pH <b>{{ph}}</b></p>"), vec!["ph"]);
    }

    #[test]
    fn test_overlaps_keep_earliest() {
        let text = "${[inner]}";
        let found = AlternateSyntaxStrategy::new().detect(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].span, 0..text.len());
    }

    #[test]
    fn test_empty_braces_are_not_named() {
        assert!(names("Batch: {} and {{ }}").is_empty());
    }
}
