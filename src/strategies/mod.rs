mod alternate_syntax;
mod bare_marker;
mod debug;
mod structural;

pub use alternate_syntax::AlternateSyntaxStrategy;
pub use bare_marker::BareMarkerStrategy;
pub use debug::SlotPrinter;
pub use structural::StructuralStrategy;
