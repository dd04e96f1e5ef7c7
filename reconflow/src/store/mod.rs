//! Resource store contract and workspace path derivation.
//!
//! The store holds the persistent records stages are registered in and
//! read from. The scheduler only ever talks to the [`ResourceStore`]
//! trait; [`MemoryStore`] is the shipped in-memory implementation, used
//! by the test suite and by embedders running without a database.

mod memory;
mod records;

use std::path::{Path, PathBuf};

pub use memory::MemoryStore;
pub use records::{
    default_name, BlockRecord, CopiedStage, NewStageRecord, PhotoRecord, PhotogroupRecord,
    StageRecord,
};

use crate::core::{RecordFlags, ResourceId, StageKind};
use crate::errors::StoreError;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Access to the records backing pipeline execution.
///
/// Every operation is synchronous and atomic from the scheduler's point
/// of view. Listing operations return records ordered by id.
pub trait ResourceStore: Send + Sync {
    /// Registers a new stage record under `parent_id`, assigning its id
    /// and default name.
    fn add_stage(&self, kind: StageKind, parent_id: ResourceId) -> StoreResult<NewStageRecord>;

    /// Fetches one stage record.
    fn stage(&self, kind: StageKind, id: ResourceId) -> StoreResult<StageRecord>;

    /// Lists every record of a stage kind.
    fn stages(&self, kind: StageKind) -> StoreResult<Vec<StageRecord>>;

    /// Lists the records of a stage kind owned by `parent_id`.
    fn stages_of_parent(
        &self,
        kind: StageKind,
        parent_id: ResourceId,
    ) -> StoreResult<Vec<StageRecord>>;

    /// Overwrites a stage record's completion flags.
    fn update_stage_flags(
        &self,
        kind: StageKind,
        id: ResourceId,
        flags: RecordFlags,
    ) -> StoreResult<()>;

    /// Deletes a stage record.
    fn remove_stage(&self, kind: StageKind, id: ResourceId) -> StoreResult<()>;

    /// Duplicates a stage record under the same parent with a derived
    /// name and cleared completion flags.
    fn copy_stage(&self, kind: StageKind, id: ResourceId) -> StoreResult<CopiedStage>;

    /// Fetches a block record.
    fn block(&self, id: ResourceId) -> StoreResult<BlockRecord>;

    /// Fetches a photogroup record.
    fn photogroup(&self, id: ResourceId) -> StoreResult<PhotogroupRecord>;

    /// Lists the photogroups of a block.
    fn photogroups_of_block(&self, block_id: ResourceId) -> StoreResult<Vec<PhotogroupRecord>>;

    /// Fetches a photo record.
    fn photo(&self, id: ResourceId) -> StoreResult<PhotoRecord>;

    /// Lists the photos of a photogroup.
    fn photos_of_group(&self, photogroup_id: ResourceId) -> StoreResult<Vec<PhotoRecord>>;

    /// Lists every photo in the store, across all blocks.
    fn photos(&self) -> StoreResult<Vec<PhotoRecord>>;

    /// The layout artifact paths are derived from.
    fn layout(&self) -> &WorkspaceLayout;
}

/// Derives artifact paths from a workspace root.
///
/// Each stage record owns the directory `<root>/<kind>/<id>`; artifact
/// files live at fixed names inside it. Paths are computed on read, so
/// records never store them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    root: PathBuf,
}

impl WorkspaceLayout {
    /// Creates a layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The workspace root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory owned by one stage record.
    #[must_use]
    pub fn stage_dir(&self, kind: StageKind, id: ResourceId) -> PathBuf {
        self.root.join(kind.to_string()).join(id.to_string())
    }

    /// Keypoint-set file of a feature-match record.
    #[must_use]
    pub fn keysets_path(&self, feature_match_id: ResourceId) -> PathBuf {
        self.stage_dir(StageKind::FeatureMatch, feature_match_id)
            .join("keysets.bin")
    }

    /// Pairwise match table of a feature-match record.
    #[must_use]
    pub fn matches_path(&self, feature_match_id: ResourceId) -> PathBuf {
        self.stage_dir(StageKind::FeatureMatch, feature_match_id)
            .join("matches.bin")
    }

    /// Intrinsic parameter file of an orientation record.
    #[must_use]
    pub fn intrinsic_path(&self, orientation_id: ResourceId) -> PathBuf {
        self.stage_dir(StageKind::PhotoOrientation, orientation_id)
            .join("intrinsics.json")
    }

    /// Extrinsic parameter file of an orientation record.
    #[must_use]
    pub fn extrinsic_path(&self, orientation_id: ResourceId) -> PathBuf {
        self.stage_dir(StageKind::PhotoOrientation, orientation_id)
            .join("extrinsics.json")
    }

    /// Similarity-transform file of an orientation record.
    #[must_use]
    pub fn similarity_path(&self, orientation_id: ResourceId) -> PathBuf {
        self.stage_dir(StageKind::PhotoOrientation, orientation_id)
            .join("similarity.json")
    }

    /// Feature-track file of an orientation record.
    #[must_use]
    pub fn tracks_path(&self, orientation_id: ResourceId) -> PathBuf {
        self.stage_dir(StageKind::PhotoOrientation, orientation_id)
            .join("tracks.bin")
    }

    /// Sparse point cloud of an orientation record.
    #[must_use]
    pub fn sparse_cloud_path(&self, orientation_id: ResourceId) -> PathBuf {
        self.stage_dir(StageKind::PhotoOrientation, orientation_id)
            .join("sparse_pointcloud.bin")
    }

    /// Dense point cloud of a point-cloud record.
    #[must_use]
    pub fn dense_cloud_path(&self, point_cloud_id: ResourceId) -> PathBuf {
        self.stage_dir(StageKind::PointCloud, point_cloud_id)
            .join("dense_pointcloud.bin")
    }

    /// Mesh description of a surface-model record.
    #[must_use]
    pub fn mesh_path(&self, surface_model_id: ResourceId) -> PathBuf {
        self.stage_dir(StageKind::SurfaceModel, surface_model_id)
            .join("surface_model.xml")
    }

    /// Output directory of a texture record.
    #[must_use]
    pub fn texture_dir(&self, texture_id: ResourceId) -> PathBuf {
        self.stage_dir(StageKind::Texture, texture_id)
    }
}
