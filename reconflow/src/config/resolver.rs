//! Stage configuration resolution.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{
    FeatureMatchConfig, FeatureMatchImage, ImageRef, PhotoOrientationConfig, PointCloudConfig,
    StageConfig, SurfaceModelConfig, TextureConfig, TexturedImage,
};
use crate::coords::{CoordinateSystem, LocalFrame};
use crate::core::{ResourceId, StageKind};
use crate::errors::ResolveError;
use crate::params::{
    load_extrinsics, load_intrinsics, load_similarity, IntrinsicParams, PosePrior,
};
use crate::pipeline::{
    FeatureMatchParams, PointCloudParams, StageEntry, StageParams, SurfaceModelParams,
    TextureParams,
};
use crate::store::{PhotoRecord, ResourceStore, StageRecord};

/// Photos discovered under a block, with the block's declared
/// coordinate system.
struct BlockScan {
    photos: Vec<PhotoRecord>,
    system: CoordinateSystem,
}

/// Materializes stage configurations from the resource store and
/// upstream artifacts.
///
/// Any store read failure aborts resolution; a stage never starts with a
/// partially populated configuration. The one exception is texture image
/// assembly, where an unreadable photogroup or photo skips that image
/// and assembly continues.
pub struct ConfigResolver {
    store: Arc<dyn ResourceStore>,
    worker_threads: usize,
}

impl ConfigResolver {
    /// Creates a resolver reading from `store`, injecting
    /// `worker_threads` into every configuration.
    #[must_use]
    pub fn new(store: Arc<dyn ResourceStore>, worker_threads: usize) -> Self {
        Self {
            store,
            worker_threads,
        }
    }

    /// Resolves one stage entry against the pipeline's intermediate
    /// directory.
    pub fn resolve(
        &self,
        entry: &StageEntry,
        intermediate_dir: &Path,
    ) -> Result<StageConfig, ResolveError> {
        match &entry.params {
            StageParams::FeatureMatch(params) => {
                self.resolve_feature_match(entry.resource_id, *params, intermediate_dir)
            }
            StageParams::PhotoOrientation(_) => self.resolve_photo_orientation(entry.resource_id),
            StageParams::PointCloud(params) => {
                self.resolve_point_cloud(entry.resource_id, *params, intermediate_dir)
            }
            StageParams::SurfaceModel(params) => {
                self.resolve_surface_model(entry.resource_id, *params, intermediate_dir)
            }
            StageParams::Texture(params) => self.resolve_texture(entry.resource_id, params),
        }
    }

    fn stage_record(
        &self,
        owner: (StageKind, ResourceId),
        kind: StageKind,
        id: ResourceId,
    ) -> Result<StageRecord, ResolveError> {
        self.store
            .stage(kind, id)
            .map_err(|err| ResolveError::store(owner.0, owner.1, err))
    }

    /// Walks every photogroup of a block, collecting photos in group
    /// order. The declared coordinate system is assumed uniform across
    /// the block; the last photogroup read wins.
    fn scan_block(
        &self,
        owner: (StageKind, ResourceId),
        block_id: ResourceId,
    ) -> Result<BlockScan, ResolveError> {
        let wrap = |err| ResolveError::store(owner.0, owner.1, err);

        let groups = self.store.photogroups_of_block(block_id).map_err(wrap)?;
        let mut photos = Vec::new();
        let mut system = CoordinateSystem::default();

        for group in groups {
            system = group.coordinate_system;
            photos.extend(self.store.photos_of_group(group.id).map_err(wrap)?);
        }

        Ok(BlockScan { photos, system })
    }

    /// Filters out unmeasured positions and, for geographic blocks,
    /// reprojects the remainder into a derived local Cartesian frame.
    fn pose_priors(scan: &BlockScan) -> Vec<PosePrior> {
        let mut priors: Vec<PosePrior> = scan
            .photos
            .iter()
            .filter(|photo| photo.position.is_valid())
            .map(|photo| PosePrior {
                photo_id: photo.id,
                position: photo.position,
            })
            .collect();

        if scan.system == CoordinateSystem::Geographic {
            let positions: Vec<_> = priors.iter().map(|prior| prior.position).collect();
            if let Some(frame) = LocalFrame::from_positions(&positions) {
                for prior in &mut priors {
                    prior.position = frame.project(&prior.position);
                }
            }
        }

        priors
    }

    fn resolve_feature_match(
        &self,
        id: ResourceId,
        params: FeatureMatchParams,
        intermediate_dir: &Path,
    ) -> Result<StageConfig, ResolveError> {
        let owner = (StageKind::FeatureMatch, id);
        let record = self.stage_record(owner, StageKind::FeatureMatch, id)?;
        let scan = self.scan_block(owner, record.parent_id)?;

        let images = scan
            .photos
            .iter()
            .map(|photo| FeatureMatchImage {
                photo_id: photo.id,
                image_path: photo.path.clone(),
                descriptor_path: intermediate_dir.join(format!("{}.desc", photo.id)),
            })
            .collect::<Vec<_>>();
        let pose_priors = Self::pose_priors(&scan);

        let layout = self.store.layout();
        debug!(resource_id = id, images = images.len(), priors = pose_priors.len(),
            "Resolved feature match configuration");

        Ok(StageConfig::FeatureMatch(FeatureMatchConfig {
            images,
            keysets_path: layout.keysets_path(id),
            matches_path: layout.matches_path(id),
            pose_priors,
            quality: params.quality,
            worker_threads: self.worker_threads,
        }))
    }

    fn resolve_photo_orientation(&self, id: ResourceId) -> Result<StageConfig, ResolveError> {
        let owner = (StageKind::PhotoOrientation, id);
        let record = self.stage_record(owner, StageKind::PhotoOrientation, id)?;
        let feature_match = self.stage_record(owner, StageKind::FeatureMatch, record.parent_id)?;
        let scan = self.scan_block(owner, feature_match.parent_id)?;

        // One calibration block per distinct photogroup; a group is
        // fetched once, on first sight, and keeps its discovery index.
        let mut intrinsic_ids: Vec<ResourceId> = Vec::new();
        let mut intrinsics: Vec<IntrinsicParams> = Vec::new();
        let mut intrinsic_index_by_photo = BTreeMap::new();

        for photo in &scan.photos {
            let index = match intrinsic_ids
                .iter()
                .position(|&group_id| group_id == photo.photogroup_id)
            {
                Some(index) => index,
                None => {
                    let group = self
                        .store
                        .photogroup(photo.photogroup_id)
                        .map_err(|err| ResolveError::store(owner.0, owner.1, err))?;
                    intrinsic_ids.push(group.id);
                    intrinsics.push(IntrinsicParams::from_photogroup(&group));
                    intrinsic_ids.len() - 1
                }
            };
            intrinsic_index_by_photo.insert(photo.id, index);
        }

        let images = scan
            .photos
            .iter()
            .map(|photo| ImageRef {
                photo_id: photo.id,
                path: photo.path.clone(),
            })
            .collect::<Vec<_>>();
        let pose_priors = Self::pose_priors(&scan);

        let layout = self.store.layout();
        debug!(resource_id = id, images = images.len(), intrinsics = intrinsics.len(),
            "Resolved photo orientation configuration");

        Ok(StageConfig::PhotoOrientation(PhotoOrientationConfig {
            images,
            keysets_path: layout.keysets_path(feature_match.id),
            matches_path: layout.matches_path(feature_match.id),
            intrinsics,
            intrinsic_ids,
            intrinsic_index_by_photo,
            pose_priors,
            intrinsic_path: layout.intrinsic_path(id),
            extrinsic_path: layout.extrinsic_path(id),
            similarity_path: layout.similarity_path(id),
            tracks_path: layout.tracks_path(id),
            sparse_cloud_path: layout.sparse_cloud_path(id),
            workspace_dir: layout.stage_dir(StageKind::PhotoOrientation, id),
            worker_threads: self.worker_threads,
        }))
    }

    fn resolve_point_cloud(
        &self,
        id: ResourceId,
        params: PointCloudParams,
        intermediate_dir: &Path,
    ) -> Result<StageConfig, ResolveError> {
        let owner = (StageKind::PointCloud, id);
        let record = self.stage_record(owner, StageKind::PointCloud, id)?;
        let orientation =
            self.stage_record(owner, StageKind::PhotoOrientation, record.parent_id)?;

        // Densification may pull from any photo, not just the owning
        // block's, so the whole photo table is mapped.
        let photo_paths: BTreeMap<ResourceId, _> = self
            .store
            .photos()
            .map_err(|err| ResolveError::store(owner.0, owner.1, err))?
            .into_iter()
            .map(|photo| (photo.id, photo.path))
            .collect();

        let layout = self.store.layout();
        debug!(resource_id = id, photos = photo_paths.len(),
            "Resolved point cloud configuration");

        Ok(StageConfig::PointCloud(PointCloudConfig {
            photo_paths,
            orientation_dir: layout.stage_dir(StageKind::PhotoOrientation, orientation.id),
            intrinsic_path: layout.intrinsic_path(orientation.id),
            extrinsic_path: layout.extrinsic_path(orientation.id),
            sparse_cloud_path: layout.sparse_cloud_path(orientation.id),
            dense_cloud_path: layout.dense_cloud_path(id),
            intermediate_dir: intermediate_dir.to_path_buf(),
            quality: params.quality,
            use_sparse_seed: params.use_sparse_seed,
            worker_threads: self.worker_threads,
        }))
    }

    fn resolve_surface_model(
        &self,
        id: ResourceId,
        _params: SurfaceModelParams,
        intermediate_dir: &Path,
    ) -> Result<StageConfig, ResolveError> {
        let owner = (StageKind::SurfaceModel, id);
        let record = self.stage_record(owner, StageKind::SurfaceModel, id)?;
        let point_cloud = self.stage_record(owner, StageKind::PointCloud, record.parent_id)?;

        let layout = self.store.layout();
        debug!(resource_id = id, "Resolved surface model configuration");

        Ok(StageConfig::SurfaceModel(SurfaceModelConfig {
            input_xml_path: intermediate_dir.join("surface_model_input.xml"),
            dense_cloud_path: layout.dense_cloud_path(point_cloud.id),
            output_dir: layout.stage_dir(StageKind::SurfaceModel, id),
            worker_threads: self.worker_threads,
        }))
    }

    fn resolve_texture(
        &self,
        id: ResourceId,
        params: &TextureParams,
    ) -> Result<StageConfig, ResolveError> {
        let owner = (StageKind::Texture, id);
        let record = self.stage_record(owner, StageKind::Texture, id)?;
        let surface_model = self.stage_record(owner, StageKind::SurfaceModel, record.parent_id)?;
        let point_cloud =
            self.stage_record(owner, StageKind::PointCloud, surface_model.parent_id)?;
        let orientation =
            self.stage_record(owner, StageKind::PhotoOrientation, point_cloud.parent_id)?;

        let layout = self.store.layout();
        let similarity = load_similarity(&layout.similarity_path(orientation.id))?;
        let intrinsics = load_intrinsics(&layout.intrinsic_path(orientation.id))?;
        let extrinsics = load_extrinsics(&layout.extrinsic_path(orientation.id))?;

        let mut images = Vec::with_capacity(extrinsics.len());
        for entry in extrinsics {
            // A pose adjusted under an unknown calibration means the
            // artifacts disagree with each other; nothing sensible can
            // be textured from that.
            let intrinsic = intrinsics.get(&entry.intrinsic_id).copied().ok_or(
                ResolveError::DanglingIntrinsic {
                    intrinsic_id: entry.intrinsic_id,
                },
            )?;

            let group = match self.store.photogroup(entry.intrinsic_id) {
                Ok(group) => group,
                Err(err) => {
                    warn!(photo_id = entry.photo_id, intrinsic_id = entry.intrinsic_id,
                        error = %err, "Skipping image: photogroup unavailable");
                    continue;
                }
            };
            let photo = match self.store.photo(entry.photo_id) {
                Ok(photo) => photo,
                Err(err) => {
                    warn!(photo_id = entry.photo_id, error = %err,
                        "Skipping image: photo unavailable");
                    continue;
                }
            };

            images.push(TexturedImage {
                photo_id: entry.photo_id,
                intrinsic_id: entry.intrinsic_id,
                path: photo.path,
                width: group.width,
                height: group.height,
                intrinsic,
                extrinsic: entry.params,
            });
        }

        debug!(resource_id = id, images = images.len(), "Resolved texture configuration");

        Ok(StageConfig::Texture(TextureConfig {
            mesh_path: layout.mesh_path(surface_model.id),
            similarity,
            images,
            dem_path: params.dem_path.clone(),
            dem_x_scale: params.dem_x_scale,
            dem_y_scale: params.dem_y_scale,
            tile_size_x: params.tile_size_x,
            tile_size_y: params.tile_size_y,
            output_dir: layout.texture_dir(id),
            worker_threads: self.worker_threads,
        }))
    }
}
