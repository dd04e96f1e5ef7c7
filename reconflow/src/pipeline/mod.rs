//! Pipelines and their stage entries.
//!
//! A pipeline is one user-initiated run: an ordered sequence of stage
//! entries sharing one ephemeral intermediate directory. Entries are
//! strictly increasing in stage kind; the builder is responsible for
//! upholding that when registering records.

mod builder;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use builder::PipelineBuilder;

use crate::core::{ResourceId, StageKind};

/// User-selectable processing quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Fast, coarse results.
    Low,
    /// Balanced.
    #[default]
    Medium,
    /// Slow, dense results.
    High,
}

/// User parameters for a feature-match stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureMatchParams {
    /// Match quality.
    pub quality: Quality,
}

/// User parameters for a photo-orientation stage. The adjustment runs
/// with a fixed policy, so there is nothing to choose yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoOrientationParams {}

/// User parameters for a point-cloud stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointCloudParams {
    /// Generation quality.
    pub quality: Quality,
    /// Whether the sparse cloud seeds densification.
    pub use_sparse_seed: bool,
}

/// User parameters for a surface-model stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceModelParams {}

/// User parameters for a texture stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureParams {
    /// Optional elevation model draped under the textured output.
    pub dem_path: Option<PathBuf>,
    /// Elevation model x scale.
    pub dem_x_scale: f64,
    /// Elevation model y scale.
    pub dem_y_scale: f64,
    /// Output tile width in pixels.
    pub tile_size_x: u32,
    /// Output tile height in pixels.
    pub tile_size_y: u32,
}

impl Default for TextureParams {
    fn default() -> Self {
        Self {
            dem_path: None,
            dem_x_scale: 1.0,
            dem_y_scale: 1.0,
            tile_size_x: 4096,
            tile_size_y: 4096,
        }
    }
}

/// Per-stage user parameters, tagged by stage kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageParams {
    /// Feature-match parameters.
    FeatureMatch(FeatureMatchParams),
    /// Photo-orientation parameters.
    PhotoOrientation(PhotoOrientationParams),
    /// Point-cloud parameters.
    PointCloud(PointCloudParams),
    /// Surface-model parameters.
    SurfaceModel(SurfaceModelParams),
    /// Texture parameters.
    Texture(TextureParams),
}

impl StageParams {
    /// The stage kind these parameters apply to.
    #[must_use]
    pub const fn kind(&self) -> StageKind {
        match self {
            Self::FeatureMatch(_) => StageKind::FeatureMatch,
            Self::PhotoOrientation(_) => StageKind::PhotoOrientation,
            Self::PointCloud(_) => StageKind::PointCloud,
            Self::SurfaceModel(_) => StageKind::SurfaceModel,
            Self::Texture(_) => StageKind::Texture,
        }
    }

    /// Default parameters for a stage kind.
    #[must_use]
    pub fn default_for(kind: StageKind) -> Self {
        match kind {
            StageKind::FeatureMatch => Self::FeatureMatch(FeatureMatchParams::default()),
            StageKind::PhotoOrientation => {
                Self::PhotoOrientation(PhotoOrientationParams::default())
            }
            StageKind::PointCloud => Self::PointCloud(PointCloudParams::default()),
            StageKind::SurfaceModel => Self::SurfaceModel(SurfaceModelParams::default()),
            StageKind::Texture => Self::Texture(TextureParams::default()),
        }
    }
}

/// One stage within a pipeline: the record it runs for plus the user's
/// parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEntry {
    /// The stage record, registered before execution.
    pub resource_id: ResourceId,
    /// The user's parameters.
    pub params: StageParams,
}

impl StageEntry {
    /// The entry's stage kind.
    #[must_use]
    pub const fn kind(&self) -> StageKind {
        self.params.kind()
    }
}

/// One queued run of stages sharing an intermediate directory.
#[derive(Debug)]
pub struct Pipeline {
    id: Uuid,
    intermediate_dir: PathBuf,
    entries: VecDeque<StageEntry>,
}

impl Pipeline {
    /// Creates a pipeline from already-registered entries.
    ///
    /// Entries must be strictly increasing in stage kind;
    /// [`PipelineBuilder`] produces them that way.
    #[must_use]
    pub fn new(id: Uuid, intermediate_dir: impl Into<PathBuf>, entries: Vec<StageEntry>) -> Self {
        Self {
            id,
            intermediate_dir: intermediate_dir.into(),
            entries: entries.into(),
        }
    }

    /// Pipeline identity; also the intermediate directory's name.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The pipeline's scratch directory.
    #[must_use]
    pub fn intermediate_dir(&self) -> &Path {
        &self.intermediate_dir
    }

    /// The next entry to execute.
    #[must_use]
    pub fn front(&self) -> Option<&StageEntry> {
        self.entries.front()
    }

    pub(crate) fn pop_front(&mut self) -> Option<StageEntry> {
        self.entries.pop_front()
    }

    /// Whether all entries have been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of remaining entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Remaining stage kinds, in execution order.
    #[must_use]
    pub fn kinds(&self) -> Vec<StageKind> {
        self.entries.iter().map(StageEntry::kind).collect()
    }

    /// Whether entries are strictly increasing in stage kind.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.entries
            .iter()
            .zip(self.entries.iter().skip(1))
            .all(|(a, b)| a.kind() < b.kind())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: StageKind, resource_id: ResourceId) -> StageEntry {
        StageEntry {
            resource_id,
            params: StageParams::default_for(kind),
        }
    }

    #[test]
    fn test_entry_kind_follows_params() {
        assert_eq!(
            entry(StageKind::PointCloud, 1).kind(),
            StageKind::PointCloud
        );
    }

    #[test]
    fn test_pipeline_consumption() {
        let mut pipeline = Pipeline::new(
            Uuid::new_v4(),
            "/tmp/run",
            vec![
                entry(StageKind::FeatureMatch, 1),
                entry(StageKind::PhotoOrientation, 2),
            ],
        );

        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.front().map(StageEntry::kind), Some(StageKind::FeatureMatch));

        pipeline.pop_front();
        assert_eq!(pipeline.front().map(StageEntry::kind), Some(StageKind::PhotoOrientation));

        pipeline.pop_front();
        assert!(pipeline.is_empty());
    }

    #[test]
    fn test_ordering_check() {
        let ordered = Pipeline::new(
            Uuid::new_v4(),
            "/tmp/run",
            vec![
                entry(StageKind::FeatureMatch, 1),
                entry(StageKind::PointCloud, 2),
            ],
        );
        assert!(ordered.is_ordered());

        let unordered = Pipeline::new(
            Uuid::new_v4(),
            "/tmp/run",
            vec![
                entry(StageKind::PointCloud, 1),
                entry(StageKind::FeatureMatch, 2),
            ],
        );
        assert!(!unordered.is_ordered());
    }

    #[test]
    fn test_params_serde_round_trip() {
        let params = StageParams::PointCloud(PointCloudParams {
            quality: Quality::High,
            use_sparse_seed: true,
        });
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains(r#""kind":"point_cloud""#));

        let back: StageParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
