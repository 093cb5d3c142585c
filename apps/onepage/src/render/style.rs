//! Style sheet applied by the DOCX renderer.
//!
//! Defaults reproduce the tight single-page preset: Calibri 10pt body,
//! 0.5" margins, single line spacing, zero paragraph spacing for bullets.

use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

pub const TWIPS_PER_INCH: f32 = 1440.0;
pub const TWIPS_PER_POINT: f32 = 20.0;
/// OOXML "auto" line spacing unit: 240 = single spacing.
pub const LINE_UNITS_SINGLE: f32 = 240.0;

/// Paper size for the single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    #[default]
    Letter,
    A4,
}

impl PageSize {
    /// `(width, height)` in inches.
    pub fn inches(self) -> (f32, f32) {
        match self {
            PageSize::Letter => (8.5, 11.0),
            PageSize::A4 => (8.27, 11.69),
        }
    }

    /// `(width, height)` in twips.
    pub fn twips(self) -> (u32, u32) {
        match self {
            PageSize::Letter => (12240, 15840),
            PageSize::A4 => (11906, 16838),
        }
    }
}

/// Page margins in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top_in: f32,
    pub bottom_in: f32,
    pub left_in: f32,
    pub right_in: f32,
}

impl Margins {
    pub fn uniform(inches: f32) -> Self {
        Self {
            top_in: inches,
            bottom_in: inches,
            left_in: inches,
            right_in: inches,
        }
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.top_in, self.bottom_in, self.left_in, self.right_in]
    }

    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            top_in: f(self.top_in),
            bottom_in: f(self.bottom_in),
            left_in: f(self.left_in),
            right_in: f(self.right_in),
        }
    }
}

/// Every render parameter. The shrink policy produces reduced copies of this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub font_family: String,
    /// Body text size.
    pub font_size_pt: f32,
    /// Level-1 heading (the name line).
    pub name_size_pt: f32,
    /// Level-2 headings (sections).
    pub section_size_pt: f32,
    /// Level-3+ headings (roles, projects).
    pub entry_size_pt: f32,
    pub margins: Margins,
    /// Line spacing multiple (1.0 = single).
    pub line_spacing: f32,
    /// Left indent of a level-0 bullet; each nesting level adds the same again.
    pub bullet_indent_in: f32,
    /// Hanging indent between the bullet glyph and its text.
    pub bullet_hanging_in: f32,
    pub name_space_after_pt: f32,
    pub section_space_before_pt: f32,
    pub section_space_after_pt: f32,
    pub entry_space_before_pt: f32,
    pub entry_space_after_pt: f32,
    pub paragraph_space_after_pt: f32,
    pub bullet_space_after_pt: f32,
    pub page_size: PageSize,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_family: "Calibri".to_string(),
            font_size_pt: 10.0,
            name_size_pt: 13.0,
            section_size_pt: 10.5,
            entry_size_pt: 10.0,
            margins: Margins::uniform(0.5),
            line_spacing: 1.0,
            bullet_indent_in: 0.25,
            bullet_hanging_in: 0.15,
            name_space_after_pt: 2.0,
            section_space_before_pt: 4.0,
            section_space_after_pt: 1.0,
            entry_space_before_pt: 2.0,
            entry_space_after_pt: 0.0,
            paragraph_space_after_pt: 0.0,
            bullet_space_after_pt: 0.0,
            page_size: PageSize::Letter,
        }
    }
}

impl StyleConfig {
    /// Rejects styles that cannot produce a usable page.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.font_family.trim().is_empty() {
            return Err(PipelineError::Config("font_family must not be empty".into()));
        }

        let sizes = [
            ("font_size_pt", self.font_size_pt),
            ("name_size_pt", self.name_size_pt),
            ("section_size_pt", self.section_size_pt),
            ("entry_size_pt", self.entry_size_pt),
            ("line_spacing", self.line_spacing),
        ];
        for (name, value) in sizes {
            if !(value.is_finite() && value > 0.0) {
                return Err(PipelineError::Config(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        let non_negative = [
            ("bullet_indent_in", self.bullet_indent_in),
            ("bullet_hanging_in", self.bullet_hanging_in),
            ("name_space_after_pt", self.name_space_after_pt),
            ("section_space_before_pt", self.section_space_before_pt),
            ("section_space_after_pt", self.section_space_after_pt),
            ("entry_space_before_pt", self.entry_space_before_pt),
            ("entry_space_after_pt", self.entry_space_after_pt),
            ("paragraph_space_after_pt", self.paragraph_space_after_pt),
            ("bullet_space_after_pt", self.bullet_space_after_pt),
        ];
        for (name, value) in non_negative
            .into_iter()
            .chain(self.margins.as_array().map(|m| ("margins", m)))
        {
            if !(value.is_finite() && value >= 0.0) {
                return Err(PipelineError::Config(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }

        let (width, height) = self.page_size.inches();
        let m = &self.margins;
        if m.left_in + m.right_in >= width || m.top_in + m.bottom_in >= height {
            return Err(PipelineError::Config(
                "margins leave no printable area on the page".into(),
            ));
        }

        Ok(())
    }

    /// Font size in OOXML half-points.
    pub fn half_points(pt: f32) -> u32 {
        (pt * 2.0).round() as u32
    }

    pub fn pt_to_twips(pt: f32) -> u32 {
        (pt * TWIPS_PER_POINT).round() as u32
    }

    pub fn in_to_twips(inches: f32) -> u32 {
        (inches * TWIPS_PER_INCH).round() as u32
    }

    /// Line spacing in 240ths of a line.
    pub fn line_units(&self) -> u32 {
        (self.line_spacing * LINE_UNITS_SINGLE).round() as u32
    }
}
