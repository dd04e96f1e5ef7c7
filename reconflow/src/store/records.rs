//! Record types held by the resource store.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::coords::{CoordinateSystem, Position3};
use crate::core::{RecordFlags, ResourceId, StageKind};

/// A capture block: the root grouping photos are organized under and the
/// parent of every feature-match record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Store-assigned identifier.
    pub id: ResourceId,
    /// Human-readable name.
    pub name: String,
}

/// A photogroup: a set of photos sharing one camera calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotogroupRecord {
    /// Store-assigned identifier.
    pub id: ResourceId,
    /// Owning block.
    pub block_id: ResourceId,
    /// Human-readable name.
    pub name: String,
    /// Focal length in millimeters.
    pub focal_length: f64,
    /// Sensor pixel size in millimeters.
    pub pixel_size: f64,
    /// Principal point x in pixels.
    pub principal_x: f64,
    /// Principal point y in pixels.
    pub principal_y: f64,
    /// Radial distortion coefficients.
    pub k1: f64,
    /// Radial distortion coefficients.
    pub k2: f64,
    /// Radial distortion coefficients.
    pub k3: f64,
    /// Decentering distortion coefficients.
    pub p1: f64,
    /// Decentering distortion coefficients.
    pub p2: f64,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// How this group's photo positions are expressed.
    pub coordinate_system: CoordinateSystem,
}

/// A single photo within a photogroup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Store-assigned identifier.
    pub id: ResourceId,
    /// Owning photogroup.
    pub photogroup_id: ResourceId,
    /// Image file location.
    pub path: PathBuf,
    /// Surveyed camera position, or all-sentinel when unmeasured.
    pub position: Position3,
    /// Capture pitch angle in degrees.
    pub pitch: f64,
    /// Capture roll angle in degrees.
    pub roll: f64,
    /// Capture heading angle in degrees.
    pub heading: f64,
}

/// One stage instance's persisted row: identity, lineage, and completion
/// flags. Artifact paths are not stored; the workspace layout derives
/// them from kind and id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Store-assigned identifier, unique per stage kind.
    pub id: ResourceId,
    /// Human-readable name, defaulted at registration.
    pub name: String,
    /// The record of the previous kind this stage consumes, or a block
    /// for feature matching.
    pub parent_id: ResourceId,
    /// Which stage kind this record belongs to.
    pub kind: StageKind,
    /// Completion state.
    pub flags: RecordFlags,
}

/// Response of a stage registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStageRecord {
    /// The freshly assigned identifier.
    pub id: ResourceId,
    /// The defaulted name, e.g. "Feature Match 3".
    pub name: String,
}

/// Response of a stage duplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopiedStage {
    /// Identifier of the duplicate.
    pub id: ResourceId,
    /// Derived name of the duplicate.
    pub name: String,
    /// Parent shared with the source record.
    pub parent_id: ResourceId,
}

/// The name a stage record receives at registration.
#[must_use]
pub fn default_name(kind: StageKind, id: ResourceId) -> String {
    format!("{} {}", kind.title(), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name() {
        assert_eq!(default_name(StageKind::FeatureMatch, 3), "Feature Match 3");
        assert_eq!(default_name(StageKind::PointCloud, 12), "Point Cloud 12");
    }

    #[test]
    fn test_stage_record_serde_round_trip() {
        let record = StageRecord {
            id: 4,
            name: "Texture 4".to_string(),
            parent_id: 2,
            kind: StageKind::Texture,
            flags: RecordFlags::COMPLETED,
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: StageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_photo_record_defaults_to_invalid_position() {
        let record = PhotoRecord {
            id: 1,
            photogroup_id: 1,
            path: PathBuf::from("/data/img_0001.jpg"),
            position: Position3::default(),
            pitch: 0.0,
            roll: 0.0,
            heading: 0.0,
        };
        assert!(!record.position.is_valid());
    }
}
