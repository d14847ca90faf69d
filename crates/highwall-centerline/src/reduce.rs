//! Graph reduction between spur pruning and junction splitting.
//!
//! The engine ships two named pipeline configurations. This module
//! defines the [`SkeletonReducer`] trait for the reduction step and the
//! [`ReductionStrategy`] enum that selects between them at runtime.

use serde::{Deserialize, Serialize};

use crate::graph::SkeletonGraph;
use crate::spine::{SpineReport, extract_spines};
use crate::types::{CenterlineConfig, CenterlineError};

/// Selects which reduction runs before junction splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionStrategy {
    /// Hand the pruned graph straight to the junction splitter.
    ///
    /// Every branch longer than `min_branch_length` survives as its own
    /// centerline.
    #[default]
    JunctionSplit,

    /// Peel dominant spines out of the pruned graph first and split only
    /// what they cover.
    ///
    /// Side structure that never forms part of a spine of at least
    /// `min_spine_length` is dropped, which suits highwalls whose
    /// skeletons carry many medium-length side branches.
    SpineExtraction,
}

impl ReductionStrategy {
    /// Short human-readable name, as used on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::JunctionSplit => "junction-split",
            Self::SpineExtraction => "spine-extraction",
        }
    }
}

/// The reduced graph plus whatever the reducer learned on the way.
#[derive(Debug, Clone)]
pub struct Reduction {
    /// Graph handed on to the junction splitter.
    pub graph: SkeletonGraph,
    /// Spine statistics, present only for spine extraction.
    pub spines: Option<SpineReport>,
}

/// Trait for graph reduction strategies.
///
/// Input: a pruned skeleton graph, owned. Output: the graph to split.
pub trait SkeletonReducer {
    /// Reduce `graph` according to `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CenterlineError::PathReconstruction`] if a spine path
    /// cannot be rebuilt.
    fn reduce(
        &self,
        graph: SkeletonGraph,
        config: &CenterlineConfig,
    ) -> Result<Reduction, CenterlineError>;
}

impl SkeletonReducer for ReductionStrategy {
    fn reduce(
        &self,
        graph: SkeletonGraph,
        config: &CenterlineConfig,
    ) -> Result<Reduction, CenterlineError> {
        match *self {
            Self::JunctionSplit => Ok(Reduction {
                graph,
                spines: None,
            }),
            Self::SpineExtraction => {
                let (graph, report) = extract_spines(graph, config.min_spine_length)?;
                Ok(Reduction {
                    graph,
                    spines: Some(report),
                })
            }
        }
    }
}
