//! JSON configuration and report helpers for a stitching run.

use crate::StitchOutcome;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tilestitch_core::{AffineTransform, Group};
use tilestitch_global::{GlobalOptParams, SubsetState};
use tilestitch_pairwise::{PairwiseParams, PairwiseResult};

#[derive(thiserror::Error, Debug)]
pub enum StitchIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Parameters of both stages; every field falls back to its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    pub pairwise: PairwiseParams,
    pub global: GlobalOptParams,
}

impl StitchConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, StitchIoError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, StitchIoError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), StitchIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementEntry {
    pub group: Group,
    /// Update to compose onto the group's starting transform.
    pub update: AffineTransform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsetEntry {
    pub groups: Vec<Group>,
    pub state: String,
    pub iterations: usize,
    pub average_error: f64,
    pub max_error: f64,
}

/// Serializable summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StitchReport {
    pub config: StitchConfig,
    pub results: Vec<PairwiseResult>,
    pub skipped: Vec<(Group, Group, String)>,
    pub failed: Vec<(Group, Group, String)>,
    pub stale_removed: usize,
    pub removed_links: Vec<(Group, Group)>,
    pub placements: Vec<PlacementEntry>,
    pub subsets: Vec<SubsetEntry>,
}

fn state_label(state: &SubsetState) -> String {
    match state {
        SubsetState::Converged => "converged".to_string(),
        SubsetState::Exhausted => "exhausted".to_string(),
        SubsetState::Skipped => "skipped".to_string(),
        SubsetState::Failed(why) => format!("failed: {why}"),
    }
}

impl StitchReport {
    /// Build a report from a finished run.
    pub fn new(config: &StitchConfig, outcome: &StitchOutcome) -> Self {
        let pairwise = &outcome.pairwise;
        Self {
            config: config.clone(),
            results: pairwise.results.clone(),
            skipped: pairwise
                .skipped
                .iter()
                .map(|((a, b), why)| (a.clone(), b.clone(), why.to_string()))
                .collect(),
            failed: pairwise
                .failed
                .iter()
                .map(|((a, b), why)| (a.clone(), b.clone(), why.clone()))
                .collect(),
            stale_removed: outcome.stale_removed,
            removed_links: outcome.global.removed.clone(),
            placements: outcome
                .global
                .transforms
                .iter()
                .map(|(group, update)| PlacementEntry {
                    group: group.clone(),
                    update: update.clone(),
                })
                .collect(),
            subsets: outcome
                .global
                .subsets
                .iter()
                .map(|s| SubsetEntry {
                    groups: s.groups.clone(),
                    state: state_label(&s.state),
                    iterations: s.iterations,
                    average_error: s.average_error,
                    max_error: s.max_error,
                })
                .collect(),
        }
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, StitchIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), StitchIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
