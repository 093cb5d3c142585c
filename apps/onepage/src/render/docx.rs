//! DOCX Renderer: maps parsed blocks onto the WordprocessingML model.
//!
//! Pure and deterministic: the same `Document` and `StyleConfig` always yield
//! an identical `DocxModel`, and therefore identical package bytes.

use std::collections::HashMap;

use crate::markdown::inline::{plain_text, spans};
use crate::markdown::{Block, BlockKind, Document};
use crate::render::model::{
    DocxModel, DocxParagraph, HyperlinkRel, Indent, Inline, ParagraphRole, ParagraphSpacing,
    SectionLayout, TextRun,
};
use crate::render::style::StyleConfig;

/// Deepest bullet level with its own indent; deeper bullets reuse it.
pub const MAX_BULLET_LEVEL: u8 = 2;

/// Relationship ids 1 and 2 are taken by styles and numbering.
const FIRST_HYPERLINK_REL: usize = 3;

const DEFAULT_TITLE: &str = "Resume";

/// Renders every block into exactly one paragraph.
pub fn render(document: &Document, style: &StyleConfig) -> DocxModel {
    let mut links = LinkTable::default();
    let line = style.line_units();

    let paragraphs = document
        .blocks()
        .iter()
        .map(|block| render_block(block, style, line, &mut links))
        .collect();

    let title = document
        .blocks()
        .iter()
        .find(|b| b.kind == BlockKind::Heading && b.level == 1)
        .map(|b| plain_text(&b.text))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    DocxModel {
        title,
        font_family: style.font_family.clone(),
        body_size_half_pt: StyleConfig::half_points(style.font_size_pt),
        line,
        bullet_indent: bullet_indent(style, 0),
        section: section_layout(style),
        paragraphs,
        hyperlinks: links.rels,
    }
}

fn render_block(
    block: &Block,
    style: &StyleConfig,
    line: u32,
    links: &mut LinkTable,
) -> DocxParagraph {
    let (role, size_pt, before_pt, after_pt) = match block.kind {
        BlockKind::Heading => match block.level {
            1 => (ParagraphRole::Name, style.name_size_pt, 0.0, style.name_space_after_pt),
            2 => (
                ParagraphRole::Section,
                style.section_size_pt,
                style.section_space_before_pt,
                style.section_space_after_pt,
            ),
            _ => (
                ParagraphRole::Entry,
                style.entry_size_pt,
                style.entry_space_before_pt,
                style.entry_space_after_pt,
            ),
        },
        BlockKind::Bullet => (
            ParagraphRole::Bullet,
            style.font_size_pt,
            0.0,
            style.bullet_space_after_pt,
        ),
        BlockKind::Paragraph => (
            ParagraphRole::Body,
            style.font_size_pt,
            0.0,
            style.paragraph_space_after_pt,
        ),
    };

    let size_half_pt = StyleConfig::half_points(size_pt);
    let inlines = spans(&block.text, block.is_heading())
        .into_iter()
        .map(|span| {
            let run = TextRun {
                text: span.text,
                bold: span.bold,
                size_half_pt,
                underline: span.link.is_some(),
            };
            match span.link {
                Some(target) => Inline::Hyperlink {
                    rel_id: links.rel_for(target),
                    run,
                },
                None => Inline::Run(run),
            }
        })
        .collect();

    let bullet_level = block.is_bullet().then(|| block.level.min(MAX_BULLET_LEVEL));

    DocxParagraph {
        role,
        spacing: ParagraphSpacing {
            before_twips: StyleConfig::pt_to_twips(before_pt),
            after_twips: StyleConfig::pt_to_twips(after_pt),
            line,
        },
        bullet_level,
        indent: bullet_level.map(|level| bullet_indent(style, level)),
        inlines,
    }
}

/// Indent for a bullet at `level`: the base indent once per level, same hanging.
pub fn bullet_indent(style: &StyleConfig, level: u8) -> Indent {
    let steps = f32::from(level) + 1.0;
    Indent {
        left_twips: StyleConfig::in_to_twips(style.bullet_indent_in * steps),
        hanging_twips: StyleConfig::in_to_twips(style.bullet_hanging_in),
    }
}

fn section_layout(style: &StyleConfig) -> SectionLayout {
    let (width, height) = style.page_size.twips();
    let m = &style.margins;
    SectionLayout {
        page_width_twips: width,
        page_height_twips: height,
        margin_top_twips: StyleConfig::in_to_twips(m.top_in),
        margin_bottom_twips: StyleConfig::in_to_twips(m.bottom_in),
        margin_left_twips: StyleConfig::in_to_twips(m.left_in),
        margin_right_twips: StyleConfig::in_to_twips(m.right_in),
    }
}

/// Hyperlink relationships in first-seen order, one per distinct target.
#[derive(Default)]
struct LinkTable {
    rels: Vec<HyperlinkRel>,
    by_target: HashMap<String, String>,
}

impl LinkTable {
    fn rel_for(&mut self, target: String) -> String {
        if let Some(id) = self.by_target.get(&target) {
            return id.clone();
        }
        let rel_id = format!("rId{}", FIRST_HYPERLINK_REL + self.rels.len());
        self.by_target.insert(target.clone(), rel_id.clone());
        self.rels.push(HyperlinkRel {
            rel_id: rel_id.clone(),
            target,
        });
        rel_id
    }
}
