//! Pipeline assembly.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    FeatureMatchParams, PhotoOrientationParams, Pipeline, PointCloudParams, StageEntry,
    StageParams, SurfaceModelParams, TextureParams,
};
use crate::core::{ResourceId, StageKind};
use crate::errors::BuildError;
use crate::store::ResourceStore;

/// Assembles a [`Pipeline`] from a contiguous range of stage kinds.
///
/// For each kind in the range the builder registers a fresh stage record,
/// threading every new id forward as the parent of the next kind. The
/// first kind's parent is caller-supplied: a block when starting from
/// feature matching, or an existing record of the preceding kind when
/// continuing a partial chain.
///
/// Registration failures cut the range short: the failed kind and
/// everything after it are skipped, leaving a shorter but
/// dependency-consistent pipeline. Building fails only when no stage at
/// all could be registered.
pub struct PipelineBuilder {
    store: Arc<dyn ResourceStore>,
    intermediate_root: PathBuf,
    start: StageKind,
    end: StageKind,
    first_parent: ResourceId,
    feature_match: FeatureMatchParams,
    photo_orientation: PhotoOrientationParams,
    point_cloud: PointCloudParams,
    surface_model: SurfaceModelParams,
    texture: TextureParams,
}

impl PipelineBuilder {
    /// Creates a builder covering the full stage range, with default
    /// parameters everywhere.
    #[must_use]
    pub fn new(
        store: Arc<dyn ResourceStore>,
        intermediate_root: impl Into<PathBuf>,
        first_parent: ResourceId,
    ) -> Self {
        Self {
            store,
            intermediate_root: intermediate_root.into(),
            start: StageKind::FeatureMatch,
            end: StageKind::Texture,
            first_parent,
            feature_match: FeatureMatchParams::default(),
            photo_orientation: PhotoOrientationParams::default(),
            point_cloud: PointCloudParams::default(),
            surface_model: SurfaceModelParams::default(),
            texture: TextureParams::default(),
        }
    }

    /// Restricts the build to the inclusive range `start..=end`.
    #[must_use]
    pub fn stages(mut self, start: StageKind, end: StageKind) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Sets feature-match parameters.
    #[must_use]
    pub fn feature_match(mut self, params: FeatureMatchParams) -> Self {
        self.feature_match = params;
        self
    }

    /// Sets photo-orientation parameters.
    #[must_use]
    pub fn photo_orientation(mut self, params: PhotoOrientationParams) -> Self {
        self.photo_orientation = params;
        self
    }

    /// Sets point-cloud parameters.
    #[must_use]
    pub fn point_cloud(mut self, params: PointCloudParams) -> Self {
        self.point_cloud = params;
        self
    }

    /// Sets surface-model parameters.
    #[must_use]
    pub fn surface_model(mut self, params: SurfaceModelParams) -> Self {
        self.surface_model = params;
        self
    }

    /// Sets texture parameters.
    #[must_use]
    pub fn texture(mut self, params: TextureParams) -> Self {
        self.texture = params;
        self
    }

    fn params_for(&self, kind: StageKind) -> StageParams {
        match kind {
            StageKind::FeatureMatch => StageParams::FeatureMatch(self.feature_match),
            StageKind::PhotoOrientation => StageParams::PhotoOrientation(self.photo_orientation),
            StageKind::PointCloud => StageParams::PointCloud(self.point_cloud),
            StageKind::SurfaceModel => StageParams::SurfaceModel(self.surface_model),
            StageKind::Texture => StageParams::Texture(self.texture.clone()),
        }
    }

    /// Registers the stage records and assembles the pipeline.
    ///
    /// The caller decides what to do with the result; typically it goes
    /// straight to [`Scheduler::enqueue`](crate::scheduler::Scheduler::enqueue).
    pub fn build(self) -> Result<Pipeline, BuildError> {
        if self.start > self.end {
            return Err(BuildError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }

        let id = Uuid::new_v4();
        let intermediate_dir = self.intermediate_root.join(id.to_string());
        if let Err(err) = std::fs::create_dir_all(&intermediate_dir) {
            // Best effort only; stages that need the directory will fail
            // on their own.
            warn!(
                pipeline_id = %id,
                path = %intermediate_dir.display(),
                error = %err,
                "Failed to create intermediate directory"
            );
        }

        let mut entries = Vec::new();
        let mut parent = self.first_parent;
        let mut first_failure = None;

        for kind in StageKind::span(self.start, self.end) {
            match self.store.add_stage(kind, parent) {
                Ok(new) => {
                    debug!(pipeline_id = %id, %kind, resource_id = new.id, name = %new.name,
                        "Registered stage record");
                    entries.push(StageEntry {
                        resource_id: new.id,
                        params: self.params_for(kind),
                    });
                    parent = new.id;
                }
                Err(err) => {
                    warn!(pipeline_id = %id, %kind, error = %err,
                        "Stage registration failed; dropping this and later stages");
                    first_failure = Some(err.to_string());
                    break;
                }
            }
        }

        if entries.is_empty() {
            return Err(BuildError::NothingRegistered {
                start: self.start,
                reason: first_failure
                    .unwrap_or_else(|| "no stage kinds in range".to_string()),
            });
        }

        Ok(Pipeline::new(id, intermediate_dir, entries))
    }
}
