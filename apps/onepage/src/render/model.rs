//! In-memory WordprocessingML model produced by the renderer.
//!
//! All measurements are already converted to OOXML units (twips, half-points,
//! 240ths of a line) so serialization is a straight walk over the tree.

/// Role a paragraph plays on the page; maps to a paragraph style id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphRole {
    Name,
    Section,
    Entry,
    Bullet,
    Body,
}

impl ParagraphRole {
    pub fn style_id(self) -> &'static str {
        match self {
            ParagraphRole::Name => "Heading1",
            ParagraphRole::Section => "Heading2",
            ParagraphRole::Entry => "Heading3",
            ParagraphRole::Bullet => "ListBullet",
            ParagraphRole::Body => "Normal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphSpacing {
    pub before_twips: u32,
    pub after_twips: u32,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indent {
    pub left_twips: u32,
    pub hanging_twips: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
    pub size_half_pt: u32,
    pub underline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Run(TextRun),
    /// `rel_id` points into `DocxModel::hyperlinks`.
    Hyperlink { rel_id: String, run: TextRun },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocxParagraph {
    pub role: ParagraphRole,
    pub spacing: ParagraphSpacing,
    /// Bullet nesting level for numbered (bulleted) paragraphs.
    pub bullet_level: Option<u8>,
    pub indent: Option<Indent>,
    pub inlines: Vec<Inline>,
}

impl DocxParagraph {
    /// Concatenated visible text.
    pub fn text(&self) -> String {
        self.inlines
            .iter()
            .map(|i| match i {
                Inline::Run(run) | Inline::Hyperlink { run, .. } => run.text.as_str(),
            })
            .collect()
    }
}

/// External hyperlink relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperlinkRel {
    pub rel_id: String,
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionLayout {
    pub page_width_twips: u32,
    pub page_height_twips: u32,
    pub margin_top_twips: u32,
    pub margin_bottom_twips: u32,
    pub margin_left_twips: u32,
    pub margin_right_twips: u32,
}

/// A complete document, ready for `to_bytes` / `write_to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocxModel {
    pub title: String,
    pub font_family: String,
    pub body_size_half_pt: u32,
    pub line: u32,
    /// `(left, hanging)` in twips for bullet level 0; deeper levels add `left` again.
    pub bullet_indent: Indent,
    pub section: SectionLayout,
    pub paragraphs: Vec<DocxParagraph>,
    pub hyperlinks: Vec<HyperlinkRel>,
}
