use crate::semantic::{PlaceholderSlot, SlotOrigin, Template};

/// Prints the located slots of a template for debugging purposes.
pub struct SlotPrinter;

impl SlotPrinter {
    fn origin_tag(origin: SlotOrigin) -> &'static str {
        match origin {
            SlotOrigin::BareMarker => "{}",
            SlotOrigin::AlternateSyntax => "{{}}",
            SlotOrigin::Structural => "row",
            SlotOrigin::Fallback => "fallback",
        }
    }

    fn render_slot(slot: &PlaceholderSlot) -> String {
        let guess = match &slot.candidate_name {
            Some(candidate) if candidate != &slot.name => format!(" (guess: {})", candidate),
            _ => String::new(),
        };
        format!(
            "{:>3} [{:^8}] {}{} :: {:?}",
            slot.index,
            Self::origin_tag(slot.origin),
            slot.name,
            guess,
            slot.local_context().trim()
        )
    }

    pub fn render(template: &Template) -> String {
        let mut out = format!("template {} ({} slots)\n", template.id(), template.slots().len());
        for slot in template.slots() {
            out.push_str(&Self::render_slot(slot));
            out.push('\n');
        }
        out
    }

    pub fn print(template: &Template) {
        print!("{}", Self::render(template));
    }
}
