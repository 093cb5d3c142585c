//! Markdown Parser: splits a resume source into headings, bullets, and paragraphs.
//!
//! Only the block structure a resume uses is recognized. Anything else passes
//! through as a paragraph, so parsing never fails on malformed Markdown; the
//! only error is an unreadable source file.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::errors::PipelineError;
use crate::markdown::inline::plain_text;

// ────────────────────────────────────────────────────────────────────────────
// Block model
// ────────────────────────────────────────────────────────────────────────────

/// Structural kind of a parsed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading,
    Bullet,
    Paragraph,
}

/// A single structural unit of the resume.
///
/// `level` is the heading depth (1–6) for headings, the nesting depth
/// (0-based) for bullets, and always 0 for paragraphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
    pub level: u8,
}

impl Block {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Heading,
            text: text.into(),
            level,
        }
    }

    pub fn bullet(level: u8, text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Bullet,
            text: text.into(),
            level,
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            text: text.into(),
            level: 0,
        }
    }

    pub fn is_heading(&self) -> bool {
        self.kind == BlockKind::Heading
    }

    pub fn is_bullet(&self) -> bool {
        self.kind == BlockKind::Bullet
    }

    /// Heading/bullet text with inline `**` markers removed.
    pub fn title(&self) -> String {
        plain_text(&self.text)
    }
}

/// An ordered, immutable sequence of blocks.
///
/// Trimming never edits a document in place; it builds a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn bullet_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_bullet()).count()
    }

    /// Returns a copy of this document without the blocks at `indices`.
    pub fn without(&self, indices: &BTreeSet<usize>) -> Document {
        let blocks = self
            .blocks
            .iter()
            .enumerate()
            .filter(|(i, _)| !indices.contains(i))
            .map(|(_, b)| b.clone())
            .collect();
        Document { blocks }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Parsing
// ────────────────────────────────────────────────────────────────────────────

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.+?)(?:\s+#+)?\s*$").expect("heading pattern"))
}

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([ \t]*)[-*+][ \t]+(.+)$").expect("bullet pattern"))
}

fn rule_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:-{3,}|\*{3,}|_{3,})\s*$").expect("rule pattern"))
}

/// Reads and parses a Markdown resume from disk.
///
/// Invalid UTF-8 is decoded lossily rather than rejected.
pub fn read_document(path: &Path) -> Result<Document, PipelineError> {
    let bytes = std::fs::read(path).map_err(|source| PipelineError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let document = parse(&text);
    debug!(
        path = %path.display(),
        blocks = document.len(),
        bullets = document.bullet_count(),
        "Parsed resume source"
    );
    Ok(document)
}

/// Splits raw Markdown into blocks. Infallible.
pub fn parse(source: &str) -> Document {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let blocks = normalize_lines(source)
        .into_iter()
        .map(|line| classify(&line))
        .collect();
    Document { blocks }
}

/// Strips trailing whitespace, drops horizontal rules and blank lines.
fn normalize_lines(source: &str) -> Vec<String> {
    source
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !rule_re().is_match(line))
        .map(str::to_string)
        .collect()
}

fn classify(line: &str) -> Block {
    if let Some(caps) = heading_re().captures(line) {
        let level = caps[1].len() as u8;
        return Block::heading(level, caps[2].trim());
    }

    if let Some(caps) = bullet_re().captures(line) {
        return Block::bullet(indent_depth(&caps[1]), caps[2].trim());
    }

    Block::paragraph(line.trim())
}

/// Two spaces or one tab per nesting level.
fn indent_depth(indent: &str) -> u8 {
    let columns: usize = indent
        .chars()
        .map(|c| if c == '\t' { 2 } else { 1 })
        .sum();
    (columns / 2).min(u8::MAX as usize) as u8
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
