//! Store seeding helpers.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::coords::{CoordinateSystem, Position3};
use crate::core::{ResourceId, StageKind};
use crate::store::{MemoryStore, PhotoRecord, PhotogroupRecord, ResourceStore};

static PHOTO_SEQ: AtomicU32 = AtomicU32::new(1);

fn next_photo_path() -> PathBuf {
    let seq = PHOTO_SEQ.fetch_add(1, Ordering::Relaxed);
    PathBuf::from(format!("/data/photos/img_{seq:05}.jpg"))
}

/// A photogroup with a typical nadir camera, positions in a Cartesian
/// frame. The `id` field is a placeholder; [`MemoryStore::insert_photogroup`]
/// assigns the real one.
#[must_use]
pub fn nadir_photogroup(block_id: ResourceId) -> PhotogroupRecord {
    PhotogroupRecord {
        id: 0,
        block_id,
        name: "nadir".to_string(),
        focal_length: 50.0,
        pixel_size: 0.005,
        principal_x: 2000.0,
        principal_y: 1500.0,
        k1: 0.01,
        k2: -0.002,
        k3: 0.0003,
        p1: 0.0001,
        p2: -0.0002,
        width: 4000,
        height: 3000,
        coordinate_system: CoordinateSystem::Cartesian,
    }
}

/// Like [`nadir_photogroup`], but declaring geographic photo positions.
#[must_use]
pub fn geographic_photogroup(block_id: ResourceId) -> PhotogroupRecord {
    PhotogroupRecord {
        name: "oblique".to_string(),
        coordinate_system: CoordinateSystem::Geographic,
        ..nadir_photogroup(block_id)
    }
}

/// A photo positioned at the given coordinates, with a unique image
/// path.
#[must_use]
pub fn photo_at(photogroup_id: ResourceId, x: f64, y: f64, z: f64) -> PhotoRecord {
    PhotoRecord {
        id: 0,
        photogroup_id,
        path: next_photo_path(),
        position: Position3::new(x, y, z),
        pitch: 0.0,
        roll: 0.0,
        heading: 0.0,
    }
}

/// A photo whose position was never measured.
#[must_use]
pub fn unpositioned_photo(photogroup_id: ResourceId) -> PhotoRecord {
    PhotoRecord {
        position: Position3::invalid(),
        ..photo_at(photogroup_id, 0.0, 0.0, 0.0)
    }
}

/// Registers one stage record per kind in `FeatureMatch..=end`, threading
/// parents, and returns the assigned ids in kind order.
///
/// # Panics
///
/// Panics if the store rejects a registration; fixtures assume a store
/// without scripted faults.
#[must_use]
pub fn register_chain(
    store: &MemoryStore,
    block_id: ResourceId,
    end: StageKind,
) -> Vec<ResourceId> {
    let mut ids = Vec::new();
    let mut parent = block_id;
    for kind in StageKind::span(StageKind::FeatureMatch, end) {
        let new = store
            .add_stage(kind, parent)
            .unwrap_or_else(|err| panic!("fixture registration failed for {kind}: {err}"));
        ids.push(new.id);
        parent = new.id;
    }
    ids
}

/// Ids of a freshly seeded two-photogroup survey block.
#[derive(Debug, Clone)]
pub struct SurveySeed {
    /// The block record.
    pub block_id: ResourceId,
    /// First photogroup, holding two photos.
    pub group_a: ResourceId,
    /// Second photogroup, holding one photo.
    pub group_b: ResourceId,
    /// All photo ids: two from `group_a`, then one from `group_b`.
    pub photo_ids: Vec<ResourceId>,
}

/// Seeds the standard survey block: one block, two photogroups sharing
/// the same camera, two photos in the first group and one in the second,
/// all with valid Cartesian positions.
#[must_use]
pub fn seed_survey(store: &MemoryStore) -> SurveySeed {
    let block_id = store.insert_block("survey");
    let group_a = store.insert_photogroup(nadir_photogroup(block_id));
    let group_b = store.insert_photogroup(nadir_photogroup(block_id));

    let photo_ids = vec![
        store.insert_photo(photo_at(group_a, 10.0, 20.0, 100.0)),
        store.insert_photo(photo_at(group_a, 12.0, 20.0, 100.0)),
        store.insert_photo(photo_at(group_b, 11.0, 22.0, 101.0)),
    ];

    SurveySeed {
        block_id,
        group_a,
        group_b,
        photo_ids,
    }
}
