//! Placeholder detection and field mapping for Certificate-of-Analysis
//! templates.
//!
//! A template goes through the [`PlaceholderLocator`] and the
//! [`PlaceholderNamer`]; extracted data goes through the [`FieldNormalizer`];
//! the [`SequentialFiller`] then pairs the two with help of the
//! [`ContextScorer`]. [`FillEngine`] wires everything to one [`RuleBook`].

pub mod base_parser;
pub mod catalog;
pub mod extraction;
pub mod filler;
pub mod locator;
pub mod namer;
pub mod normalizer;
pub mod rules;
pub mod scorer;
pub mod semantic;
pub mod strategies;
pub mod utility;

pub use base_parser::{FlattenError, flatten_markdown};
pub use catalog::FieldKind;
pub use extraction::{CollaboratorError, FieldExtractor, JobStatus, ProcessingJob, TextExtractor};
pub use filler::{BooleanRendering, FillOptions, FillOutcome, RenderMode, SequentialFiller};
pub use locator::PlaceholderLocator;
pub use namer::PlaceholderNamer;
pub use normalizer::FieldNormalizer;
pub use rules::{RuleBook, RuleError};
pub use scorer::ContextScorer;
pub use semantic::{
    Detection, DetectionStrategy, ExtractedFieldSet, FieldValue, MatchPolicy, MatchResult, MatchSource,
    PlaceholderSlot, SlotOrigin, Template,
};

use utility::content_id;

/// A rule book and the locator built from it.
#[derive(Debug)]
pub struct FillEngine {
    rules: RuleBook,
    locator: PlaceholderLocator,
}

impl Default for FillEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FillEngine {
    pub fn new() -> Self {
        Self::with_rules(RuleBook::builtin())
    }

    pub fn with_rules(rules: RuleBook) -> Self {
        let locator = PlaceholderLocator::with_defaults(&rules);
        Self { rules, locator }
    }

    /// Replaces the default locator, e.g. to add a strategy for another
    /// document family.
    pub fn with_locator(mut self, locator: PlaceholderLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    pub fn locator(&self) -> &PlaceholderLocator {
        &self.locator
    }

    /// Locates and names the slots of `content`. The id is derived from the
    /// content, so the same text always gets the same id.
    pub fn template(&self, content: &str) -> Template {
        self.template_with_id(content_id(content), content)
    }

    pub fn template_with_id(&self, id: impl Into<String>, content: &str) -> Template {
        let mut slots = self.locator.locate(content);
        PlaceholderNamer::new(&self.rules).name_all(content, &mut slots);
        tracing::debug!(slots = slots.len(), "template parsed");
        Template::new(id.into(), content.to_string(), slots)
    }

    /// Flattens a Markdown template first.
    pub fn template_from_markdown(&self, markdown: &str) -> Result<Template, FlattenError> {
        let flat = flatten_markdown(markdown)?;
        Ok(self.template(&flat))
    }

    pub fn normalize(&self, raw: &ExtractedFieldSet, aux_text: Option<&str>) -> ExtractedFieldSet {
        FieldNormalizer::new(&self.rules).normalize(raw, aux_text)
    }

    pub fn match_slots(&self, template: &Template, fields: &ExtractedFieldSet, policy: MatchPolicy) -> Vec<MatchResult> {
        SequentialFiller::new(&self.rules).match_slots(template.slots(), fields, policy)
    }

    pub fn fill(&self, template: &Template, fields: &ExtractedFieldSet, options: FillOptions) -> FillOutcome {
        SequentialFiller::new(&self.rules).fill(template, fields, options)
    }

    /// Filled text with `[EMPTY]` where nothing matched.
    pub fn preview(&self, template: &Template, fields: &ExtractedFieldSet) -> String {
        self.fill(template, fields, FillOptions::preview()).text
    }

    /// Filled text for the final document.
    pub fn render(&self, template: &Template, fields: &ExtractedFieldSet) -> String {
        self.fill(template, fields, FillOptions::render()).text
    }
}
