//! Stage parameter types and their persisted JSON form.
//!
//! Photo orientation writes its adjusted camera model to disk as three
//! JSON artifacts (intrinsic map, extrinsic list, similarity transform);
//! texturing reads them back. The load/save helpers here are the only
//! code that touches those files.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::coords::Position3;
use crate::core::ResourceId;
use crate::errors::ParamError;
use crate::store::PhotogroupRecord;

/// Shared camera calibration for one photogroup.
///
/// Lengths are expressed in pixels; the focal length is normalized from
/// the photogroup's millimeter focal length by its pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicParams {
    /// Focal length in pixels.
    pub focal: f64,
    /// Axis skew.
    pub skew: f64,
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
}

impl IntrinsicParams {
    /// Builds the calibration block for a photogroup.
    #[must_use]
    pub fn from_photogroup(record: &PhotogroupRecord) -> Self {
        Self {
            focal: record.focal_length / record.pixel_size,
            skew: 0.0,
            principal_x: record.principal_x,
            principal_y: record.principal_y,
            k1: record.k1,
            k2: record.k2,
            k3: record.k3,
            p1: record.p1,
            p2: record.p2,
        }
    }
}

/// Adjusted pose of one photo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtrinsicParams {
    /// Rotation angles in radians.
    pub rotation: [f64; 3],
    /// Camera center in model space.
    pub position: [f64; 3],
}

/// One photo's entry in the persisted extrinsic list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtrinsicEntry {
    /// The photo the pose belongs to.
    pub photo_id: ResourceId,
    /// The intrinsic block (photogroup) the photo was adjusted under.
    pub intrinsic_id: ResourceId,
    /// The adjusted pose.
    pub params: ExtrinsicParams,
}

/// Scale, rotation, and translation mapping adjusted model space to the
/// georeferenced frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTransform {
    /// Uniform scale factor.
    pub scale: f64,
    /// Rotation angles in radians.
    pub rotation: [f64; 3],
    /// Translation vector.
    pub translate: [f64; 3],
}

/// A photo's surveyed position handed to matching or orientation as an
/// initial estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PosePrior {
    /// The photo the position belongs to.
    pub photo_id: ResourceId,
    /// Surveyed position, already in a Cartesian frame.
    pub position: Position3,
}

/// The persisted intrinsic artifact: calibration keyed by photogroup id.
pub type IntrinsicMap = BTreeMap<ResourceId, IntrinsicParams>;

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ParamError> {
    let file = File::open(path).map_err(|err| ParamError::io(path, err))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|err| ParamError::parse(path, err))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ParamError> {
    let file = File::create(path).map_err(|err| ParamError::io(path, err))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .map_err(|err| ParamError::parse(path, err))
}

/// Loads an intrinsic map artifact.
pub fn load_intrinsics(path: &Path) -> Result<IntrinsicMap, ParamError> {
    read_json(path)
}

/// Writes an intrinsic map artifact.
pub fn save_intrinsics(path: &Path, intrinsics: &IntrinsicMap) -> Result<(), ParamError> {
    write_json(path, intrinsics)
}

/// Loads an extrinsic list artifact.
pub fn load_extrinsics(path: &Path) -> Result<Vec<ExtrinsicEntry>, ParamError> {
    read_json(path)
}

/// Writes an extrinsic list artifact.
pub fn save_extrinsics(path: &Path, extrinsics: &[ExtrinsicEntry]) -> Result<(), ParamError> {
    write_json(path, &extrinsics)
}

/// Loads a similarity-transform artifact.
pub fn load_similarity(path: &Path) -> Result<SimilarityTransform, ParamError> {
    read_json(path)
}

/// Writes a similarity-transform artifact.
pub fn save_similarity(path: &Path, transform: &SimilarityTransform) -> Result<(), ParamError> {
    write_json(path, transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::CoordinateSystem;
    use pretty_assertions::assert_eq;

    fn photogroup() -> PhotogroupRecord {
        PhotogroupRecord {
            id: 7,
            block_id: 1,
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

    #[test]
    fn test_intrinsics_from_photogroup() {
        let params = IntrinsicParams::from_photogroup(&photogroup());

        assert!((params.focal - 10_000.0).abs() < 1e-9);
        assert_eq!(params.skew, 0.0);
        assert_eq!(params.principal_x, 2000.0);
        assert_eq!(params.p2, -0.0002);
    }

    #[test]
    fn test_intrinsic_map_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intrinsics.json");

        let mut intrinsics = IntrinsicMap::new();
        intrinsics.insert(7, IntrinsicParams::from_photogroup(&photogroup()));

        save_intrinsics(&path, &intrinsics).unwrap();
        let loaded = load_intrinsics(&path).unwrap();
        assert_eq!(loaded, intrinsics);
    }

    #[test]
    fn test_extrinsics_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extrinsics.json");

        let extrinsics = vec![ExtrinsicEntry {
            photo_id: 3,
            intrinsic_id: 7,
            params: ExtrinsicParams {
                rotation: [0.1, -0.2, 3.0],
                position: [10.0, 20.0, 30.0],
            },
        }];

        save_extrinsics(&path, &extrinsics).unwrap();
        let loaded = load_extrinsics(&path).unwrap();
        assert_eq!(loaded, extrinsics);
    }

    #[test]
    fn test_similarity_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("similarity.json");

        let transform = SimilarityTransform {
            scale: 1.25,
            rotation: [0.0, 0.0, 0.5],
            translate: [100.0, -50.0, 2.0],
        };

        save_similarity(&path, &transform).unwrap();
        let loaded = load_similarity(&path).unwrap();
        assert_eq!(loaded, transform);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_similarity(Path::new("/nonexistent/similarity.json")).unwrap_err();
        assert!(matches!(err, ParamError::Io { .. }));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("similarity.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = load_similarity(&path).unwrap_err();
        assert!(matches!(err, ParamError::Parse { .. }));
    }
}
