//! Flattening of rich templates into the line-oriented text the locator works
//! on.
//!
//! Every paragraph, heading and list item becomes one line and every table row
//! becomes one `| cell | cell |` line, so row labels stay next to their
//! markers. Inline content is copied verbatim from the source, which keeps
//! placeholder syntax such as `__name__` or `[name]` intact even where
//! Markdown would read it as emphasis or a link.

use markdown::mdast::Node;
use markdown::ParseOptions;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlattenError>;

#[derive(Error, Debug)]
pub enum FlattenError {
    #[error("Markdown parsing error: {0}")]
    MarkdownParseError(String),
}

/// Position in the source string
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub start: usize,
    pub end: usize,
}

impl Position {
    pub fn merge(&self, other: &Position) -> Position {
        Position {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// One flattened line.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatLine {
    pub text: String,
    pub is_table_row: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FlatTemplate {
    pub lines: Vec<FlatLine>,
}

impl FlatTemplate {
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Flattens a Markdown template (GFM tables included) to plain text.
pub fn flatten_markdown(input: &str) -> Result<String> {
    MarkdownFlattener::flatten(input).map(|flat| flat.text())
}

pub struct MarkdownFlattener;

impl MarkdownFlattener {
    fn convert_position(pos: &markdown::unist::Position) -> Position {
        Position {
            start: pos.start.offset,
            end: pos.end.offset,
        }
    }

    pub fn flatten(input: &str) -> Result<FlatTemplate> {
        let root = markdown::to_mdast(input, &ParseOptions::gfm())
            .map_err(|e| FlattenError::MarkdownParseError(e.to_string()))?;

        let mut flat = FlatTemplate::default();
        if let Some(children) = root.children() {
            Self::flatten_blocks(children, input, &mut flat.lines);
        }
        Ok(flat)
    }

    fn flatten_blocks(blocks: &[Node], source: &str, lines: &mut Vec<FlatLine>) {
        for block in blocks {
            match block {
                Node::Paragraph(_) | Node::Heading(_) => {
                    let source_pos = Self::merge_inline_positions(block);
                    let text = Self::slice(source, source_pos.as_ref());
                    // soft line breaks inside a paragraph stay separate lines
                    for part in text.lines() {
                        lines.push(FlatLine {
                            text: part.trim().to_string(),
                            is_table_row: false,
                        });
                    }
                }
                Node::Table(table) => {
                    for row in &table.children {
                        lines.push(Self::flatten_row(row, source));
                    }
                }
                Node::List(_) | Node::ListItem(_) | Node::Blockquote(_) => {
                    if let Some(children) = block.children() {
                        Self::flatten_blocks(children, source, lines);
                    }
                }
                Node::Code(code) => {
                    for part in code.value.lines() {
                        lines.push(FlatLine {
                            text: part.to_string(),
                            is_table_row: false,
                        });
                    }
                }
                Node::Html(html) => {
                    lines.push(FlatLine {
                        text: html.value.trim().to_string(),
                        is_table_row: false,
                    });
                }
                _ => {}
            }
        }
    }

    fn flatten_row(row: &Node, source: &str) -> FlatLine {
        let mut cells = Vec::new();
        if let Some(children) = row.children() {
            for cell in children {
                let pos = Self::merge_inline_positions_of_children(cell);
                cells.push(Self::slice(source, pos.as_ref()).trim().to_string());
            }
        }

        FlatLine {
            text: format!("| {} |", cells.join(" | ")),
            is_table_row: true,
        }
    }

    fn slice<'a>(source: &'a str, pos: Option<&Position>) -> &'a str {
        match pos {
            Some(p) if p.start <= p.end && p.end <= source.len() => &source[p.start..p.end],
            _ => "",
        }
    }

    /// Span of a block's inline content, without heading hashes.
    fn merge_inline_positions(node: &Node) -> Option<Position> {
        match node {
            Node::Heading(_) => Self::merge_inline_positions_of_children(node),
            _ => node.position().map(Self::convert_position),
        }
    }

    fn merge_inline_positions_of_children(node: &Node) -> Option<Position> {
        let mut merged: Option<Position> = None;

        if let Some(children) = node.children() {
            for child in children {
                if let Some(pos) = child.position() {
                    let p = Self::convert_position(pos);
                    merged = Some(match merged {
                        Some(existing) => existing.merge(&p),
                        None => p,
                    });
                }
            }
        }

        merged
    }
}
