use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::PipelineError;
use crate::layout::shrink::{ShrinkPolicy, ShrinkSteps, StyleFloor};
use crate::layout::trim::TrimRule;
use crate::render::StyleConfig;

/// Everything that parameterizes one run: starting style, floors, step sizes
/// and trim rules. Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitProfile {
    pub style: StyleConfig,
    pub floor: StyleFloor,
    pub steps: ShrinkSteps,
    pub trim_rules: Vec<TrimRule>,
    pub min_bullets_per_group: usize,
}

impl Default for FitProfile {
    fn default() -> Self {
        Self {
            style: StyleConfig::default(),
            floor: StyleFloor::default(),
            steps: ShrinkSteps::default(),
            trim_rules: Vec::new(),
            min_bullets_per_group: 1,
        }
    }
}

impl FitProfile {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Cannot read profile {}: {e}", path.display()))
        })?;
        let profile: FitProfile = serde_json::from_str(&raw).map_err(|e| {
            PipelineError::Config(format!("Invalid profile {}: {e}", path.display()))
        })?;
        profile.validate()?;
        debug!(path = %path.display(), rules = profile.trim_rules.len(), "Loaded fit profile");
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.style.validate()?;

        let positive = [
            ("floor.font_size_pt", self.floor.font_size_pt),
            ("floor.line_spacing", self.floor.line_spacing),
            ("steps.font_pt", self.steps.font_pt),
            ("steps.margin_in", self.steps.margin_in),
            ("steps.line_spacing", self.steps.line_spacing),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(PipelineError::Config(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !(self.floor.margin_in.is_finite() && self.floor.margin_in >= 0.0) {
            return Err(PipelineError::Config(format!(
                "floor.margin_in must be non-negative, got {}",
                self.floor.margin_in
            )));
        }
        Ok(())
    }

    pub fn policy(&self) -> ShrinkPolicy {
        ShrinkPolicy {
            floor: self.floor,
            steps: self.steps,
            trim_rules: self.trim_rules.clone(),
            min_bullets_per_group: self.min_bullets_per_group,
        }
    }
}
