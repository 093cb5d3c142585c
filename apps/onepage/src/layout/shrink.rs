//! Shrink Policy: the deterministic sequence of reductions tried on overflow.
//!
//! Levers are exhausted in a fixed order, each down to its floor before the
//! next one moves:
//! 1. body font (heading sizes follow by the same delta)
//! 2. all four margins
//! 3. line spacing
//! 4. profile trim rules, in listed order
//! 5. the lowest-priority bullet, one per step
//!
//! No step ever increases a style value.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout::trim::{drop_lowest_priority_bullet, TrimRule};
use crate::markdown::Document;
use crate::render::StyleConfig;

/// Values at or below a floor are never reduced further.
const EPSILON: f32 = 1e-4;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Lowest values the policy may reach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleFloor {
    pub font_size_pt: f32,
    pub margin_in: f32,
    pub line_spacing: f32,
}

impl Default for StyleFloor {
    fn default() -> Self {
        Self {
            font_size_pt: 9.0,
            margin_in: 0.4,
            line_spacing: 0.9,
        }
    }
}

/// Decrement applied per step, per lever.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShrinkSteps {
    pub font_pt: f32,
    pub margin_in: f32,
    pub line_spacing: f32,
}

impl Default for ShrinkSteps {
    fn default() -> Self {
        Self {
            font_pt: 0.5,
            margin_in: 0.05,
            line_spacing: 0.05,
        }
    }
}

/// One applied reduction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ShrinkStep {
    ReduceFontSize { from_pt: f32, to_pt: f32 },
    /// `from_in`/`to_in` report the widest margin.
    ReduceMargins { from_in: f32, to_in: f32 },
    ReduceLineSpacing { from: f32, to: f32 },
    ApplyTrimRule { rule: TrimRule, removed_blocks: usize },
    DropBullet { text: String },
}

impl ShrinkStep {
    /// Position of this step's lever in the fixed policy order.
    pub fn rank(&self) -> u8 {
        match self {
            ShrinkStep::ReduceFontSize { .. } => 0,
            ShrinkStep::ReduceMargins { .. } => 1,
            ShrinkStep::ReduceLineSpacing { .. } => 2,
            ShrinkStep::ApplyTrimRule { .. } => 3,
            ShrinkStep::DropBullet { .. } => 4,
        }
    }
}

impl fmt::Display for ShrinkStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShrinkStep::ReduceFontSize { from_pt, to_pt } => {
                write!(f, "font {from_pt}pt -> {to_pt}pt")
            }
            ShrinkStep::ReduceMargins { from_in, to_in } => {
                write!(f, "margins {from_in}in -> {to_in}in")
            }
            ShrinkStep::ReduceLineSpacing { from, to } => {
                write!(f, "line spacing {from} -> {to}")
            }
            ShrinkStep::ApplyTrimRule {
                rule,
                removed_blocks,
            } => write!(f, "{rule} ({removed_blocks} blocks removed)"),
            ShrinkStep::DropBullet { text } => write!(f, "drop bullet '{text}'"),
        }
    }
}

/// Result of one policy step: the step plus the style and document it produced.
#[derive(Debug, Clone)]
pub struct Shrunk {
    pub step: ShrinkStep,
    pub style: StyleConfig,
    pub document: Document,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShrinkPolicy {
    pub floor: StyleFloor,
    pub steps: ShrinkSteps,
    pub trim_rules: Vec<TrimRule>,
    pub min_bullets_per_group: usize,
}

impl Default for ShrinkPolicy {
    fn default() -> Self {
        Self {
            floor: StyleFloor::default(),
            steps: ShrinkSteps::default(),
            trim_rules: Vec::new(),
            min_bullets_per_group: 1,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Policy
// ────────────────────────────────────────────────────────────────────────────

impl ShrinkPolicy {
    /// Computes the next reduction, or `None` once every lever is exhausted.
    ///
    /// `rule_cursor` tracks which trim rules have already been consumed and is
    /// advanced past rules that change nothing.
    pub fn next(
        &self,
        style: &StyleConfig,
        document: &Document,
        rule_cursor: &mut usize,
    ) -> Option<Shrunk> {
        if let Some((from, to)) =
            reduce(style.font_size_pt, self.steps.font_pt, self.floor.font_size_pt)
        {
            let delta = from - to;
            let floor = self.floor.font_size_pt;
            let style = StyleConfig {
                font_size_pt: to,
                name_size_pt: lower_by(style.name_size_pt, delta, floor),
                section_size_pt: lower_by(style.section_size_pt, delta, floor),
                entry_size_pt: lower_by(style.entry_size_pt, delta, floor),
                ..style.clone()
            };
            let step = ShrinkStep::ReduceFontSize {
                from_pt: from,
                to_pt: to,
            };
            return Some(restyled(step, style, document));
        }

        let widest = widest_margin(style);
        if reduce(widest, self.steps.margin_in, self.floor.margin_in).is_some() {
            let margins = style.margins.map(|m| {
                reduce(m, self.steps.margin_in, self.floor.margin_in)
                    .map(|(_, to)| to)
                    .unwrap_or(m)
            });
            let style = StyleConfig {
                margins,
                ..style.clone()
            };
            let step = ShrinkStep::ReduceMargins {
                from_in: widest,
                to_in: widest_margin(&style),
            };
            return Some(restyled(step, style, document));
        }

        if let Some((from, to)) =
            reduce(style.line_spacing, self.steps.line_spacing, self.floor.line_spacing)
        {
            let style = StyleConfig {
                line_spacing: to,
                ..style.clone()
            };
            let step = ShrinkStep::ReduceLineSpacing { from, to };
            return Some(restyled(step, style, document));
        }

        while let Some(rule) = self.trim_rules.get(*rule_cursor) {
            *rule_cursor += 1;
            let trimmed = rule.apply(document);
            let removed_blocks = document.len() - trimmed.len();
            if removed_blocks == 0 {
                debug!(rule = %rule, "Trim rule matched nothing; skipping");
                continue;
            }
            return Some(Shrunk {
                step: ShrinkStep::ApplyTrimRule {
                    rule: rule.clone(),
                    removed_blocks,
                },
                style: style.clone(),
                document: trimmed,
            });
        }

        drop_lowest_priority_bullet(document, self.min_bullets_per_group).map(|(text, trimmed)| {
            Shrunk {
                step: ShrinkStep::DropBullet { text },
                style: style.clone(),
                document: trimmed,
            }
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn restyled(step: ShrinkStep, style: StyleConfig, document: &Document) -> Shrunk {
    Shrunk {
        step,
        style,
        document: document.clone(),
    }
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// `(from, to)` for one step of `current` toward `floor`, or `None` at the floor.
fn reduce(current: f32, step: f32, floor: f32) -> Option<(f32, f32)> {
    if step <= 0.0 || current <= floor + EPSILON {
        return None;
    }
    let next = round2((current - step).max(floor)).min(current);
    (next < current).then_some((current, next))
}

/// Lowers a heading size by the body-font delta without crossing the floor.
fn lower_by(size: f32, delta: f32, floor: f32) -> f32 {
    if size <= floor {
        return size;
    }
    round2((size - delta).max(floor)).min(size)
}

fn widest_margin(style: &StyleConfig) -> f32 {
    style.margins.as_array().into_iter().fold(0.0, f32::max)
}
