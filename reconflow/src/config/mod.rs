//! Resolved stage configurations.
//!
//! A [`StageConfig`] is everything a stage task needs to run: record and
//! artifact paths gathered from the store, normalized pose priors,
//! deduplicated calibration blocks, and the user's parameters. Configs
//! are produced by the [`ConfigResolver`] immediately before dispatch,
//! one variant per stage kind; the scheduler never inspects their
//! contents.

mod resolver;


use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use resolver::ConfigResolver;

use crate::core::{ResourceId, StageKind};
use crate::params::{
    ExtrinsicParams, IntrinsicParams, PosePrior, SimilarityTransform,
};
use crate::pipeline::Quality;

/// A photo id paired with its image location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// The photo record.
    pub photo_id: ResourceId,
    /// The image file.
    pub path: PathBuf,
}

/// One photo's inputs to feature matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureMatchImage {
    /// The photo record.
    pub photo_id: ResourceId,
    /// The image file.
    pub image_path: PathBuf,
    /// Where the stage writes this photo's descriptors (scratch, inside
    /// the pipeline's intermediate directory).
    pub descriptor_path: PathBuf,
}

/// Inputs of a feature-match stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatchConfig {
    /// Every photo in the owning block.
    pub images: Vec<FeatureMatchImage>,
    /// Output keypoint-set file.
    pub keysets_path: PathBuf,
    /// Output pairwise match table.
    pub matches_path: PathBuf,
    /// Valid, Cartesian-normalized position priors.
    pub pose_priors: Vec<PosePrior>,
    /// Match quality.
    pub quality: Quality,
    /// Concurrency hint.
    pub worker_threads: usize,
}

/// Inputs of a photo-orientation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoOrientationConfig {
    /// Every photo in the owning block.
    pub images: Vec<ImageRef>,
    /// Parent feature match's keypoint sets.
    pub keysets_path: PathBuf,
    /// Parent feature match's match table.
    pub matches_path: PathBuf,
    /// One calibration block per distinct photogroup, in discovery
    /// order.
    pub intrinsics: Vec<IntrinsicParams>,
    /// The photogroup id behind each calibration block, same order.
    pub intrinsic_ids: Vec<ResourceId>,
    /// Photo id to calibration block index.
    pub intrinsic_index_by_photo: BTreeMap<ResourceId, usize>,
    /// Valid, Cartesian-normalized position priors.
    pub pose_priors: Vec<PosePrior>,
    /// Output intrinsic parameter file.
    pub intrinsic_path: PathBuf,
    /// Output extrinsic parameter file.
    pub extrinsic_path: PathBuf,
    /// Output similarity-transform file.
    pub similarity_path: PathBuf,
    /// Output feature-track file.
    pub tracks_path: PathBuf,
    /// Output sparse point cloud.
    pub sparse_cloud_path: PathBuf,
    /// The record's working directory.
    pub workspace_dir: PathBuf,
    /// Concurrency hint.
    pub worker_threads: usize,
}

/// Inputs of a point-cloud stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudConfig {
    /// Image location of every photo in the store.
    pub photo_paths: BTreeMap<ResourceId, PathBuf>,
    /// Parent orientation's working directory.
    pub orientation_dir: PathBuf,
    /// Parent orientation's intrinsic parameter file.
    pub intrinsic_path: PathBuf,
    /// Parent orientation's extrinsic parameter file.
    pub extrinsic_path: PathBuf,
    /// Parent orientation's sparse point cloud.
    pub sparse_cloud_path: PathBuf,
    /// Output dense point cloud.
    pub dense_cloud_path: PathBuf,
    /// The pipeline's scratch directory.
    pub intermediate_dir: PathBuf,
    /// Generation quality.
    pub quality: Quality,
    /// Whether the sparse cloud seeds densification.
    pub use_sparse_seed: bool,
    /// Concurrency hint.
    pub worker_threads: usize,
}

/// Inputs of a surface-model stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceModelConfig {
    /// Working input description the stage assembles in scratch space.
    pub input_xml_path: PathBuf,
    /// Parent point cloud's dense cloud.
    pub dense_cloud_path: PathBuf,
    /// Directory the mesh is written into.
    pub output_dir: PathBuf,
    /// Concurrency hint.
    pub worker_threads: usize,
}

/// One photo's bundle for texturing: pose, calibration, and pixel
/// dimensions, fully embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TexturedImage {
    /// The photo record.
    pub photo_id: ResourceId,
    /// The calibration block (photogroup) the pose was adjusted under.
    pub intrinsic_id: ResourceId,
    /// The image file.
    pub path: PathBuf,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// The photo's calibration.
    pub intrinsic: IntrinsicParams,
    /// The photo's adjusted pose.
    pub extrinsic: ExtrinsicParams,
}

/// Inputs of a texture stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureConfig {
    /// Parent surface model's mesh description.
    pub mesh_path: PathBuf,
    /// Model-to-georeference transform from the orientation artifacts.
    pub similarity: SimilarityTransform,
    /// Per-photo parameter bundles.
    pub images: Vec<TexturedImage>,
    /// Optional elevation model.
    pub dem_path: Option<PathBuf>,
    /// Elevation model x scale.
    pub dem_x_scale: f64,
    /// Elevation model y scale.
    pub dem_y_scale: f64,
    /// Output tile width in pixels.
    pub tile_size_x: u32,
    /// Output tile height in pixels.
    pub tile_size_y: u32,
    /// Directory the textured model is written into.
    pub output_dir: PathBuf,
    /// Concurrency hint.
    pub worker_threads: usize,
}

/// A resolved stage configuration, tagged by stage kind.
///
/// The scheduler pattern-matches on this to construct the right task;
/// there are no runtime downcasts anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageConfig {
    /// Feature-match inputs.
    FeatureMatch(FeatureMatchConfig),
    /// Photo-orientation inputs.
    PhotoOrientation(PhotoOrientationConfig),
    /// Point-cloud inputs.
    PointCloud(PointCloudConfig),
    /// Surface-model inputs.
    SurfaceModel(SurfaceModelConfig),
    /// Texture inputs.
    Texture(TextureConfig),
}

impl StageConfig {
    /// The stage kind this configuration drives.
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
}
