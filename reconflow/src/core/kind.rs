//! Stage and entity kind enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five ordered reconstruction phases.
///
/// The declaration order is the dependency order: each kind consumes the
/// artifacts of the kind immediately before it, so `Ord` on this enum is
/// the only valid execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Keypoint detection and pairwise matching across photos.
    FeatureMatch,
    /// Camera pose estimation and bundle adjustment.
    PhotoOrientation,
    /// Dense point-cloud generation.
    PointCloud,
    /// Surface meshing from the dense cloud.
    SurfaceModel,
    /// Texture baking onto the mesh.
    Texture,
}

impl StageKind {
    /// All kinds in dependency order.
    pub const ALL: [Self; 5] = [
        Self::FeatureMatch,
        Self::PhotoOrientation,
        Self::PointCloud,
        Self::SurfaceModel,
        Self::Texture,
    ];

    /// Returns the kind that depends on this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::FeatureMatch => Some(Self::PhotoOrientation),
            Self::PhotoOrientation => Some(Self::PointCloud),
            Self::PointCloud => Some(Self::SurfaceModel),
            Self::SurfaceModel => Some(Self::Texture),
            Self::Texture => None,
        }
    }

    /// Returns the kind this one depends on, if any.
    #[must_use]
    pub fn prev(self) -> Option<Self> {
        match self {
            Self::FeatureMatch => None,
            Self::PhotoOrientation => Some(Self::FeatureMatch),
            Self::PointCloud => Some(Self::PhotoOrientation),
            Self::SurfaceModel => Some(Self::PointCloud),
            Self::Texture => Some(Self::SurfaceModel),
        }
    }

    /// Iterates the kinds in `[start, end]` in dependency order.
    ///
    /// Empty when `start > end`.
    pub fn span(start: Self, end: Self) -> impl Iterator<Item = Self> {
        Self::ALL
            .into_iter()
            .filter(move |kind| *kind >= start && *kind <= end)
    }

    /// Human-readable title, used for default record names.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::FeatureMatch => "Feature Match",
            Self::PhotoOrientation => "Photo Orientation",
            Self::PointCloud => "Point Cloud",
            Self::SurfaceModel => "Surface Model",
            Self::Texture => "Texture",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FeatureMatch => write!(f, "feature_match"),
            Self::PhotoOrientation => write!(f, "photo_orientation"),
            Self::PointCloud => write!(f, "point_cloud"),
            Self::SurfaceModel => write!(f, "surface_model"),
            Self::Texture => write!(f, "texture"),
        }
    }
}

/// The record families held by the resource store.
///
/// The five stage kinds are chained through parent references; blocks,
/// photogroups and photos describe the survey input the chain hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A survey block, parent of feature-match records.
    Block,
    /// A set of photos sharing one camera calibration.
    Photogroup,
    /// A single captured photo.
    Photo,
    /// A feature-match record.
    FeatureMatch,
    /// A photo-orientation record.
    PhotoOrientation,
    /// A point-cloud record.
    PointCloud,
    /// A surface-model record.
    SurfaceModel,
    /// A texture record.
    Texture,
}

impl From<StageKind> for EntityKind {
    fn from(kind: StageKind) -> Self {
        match kind {
            StageKind::FeatureMatch => Self::FeatureMatch,
            StageKind::PhotoOrientation => Self::PhotoOrientation,
            StageKind::PointCloud => Self::PointCloud,
            StageKind::SurfaceModel => Self::SurfaceModel,
            StageKind::Texture => Self::Texture,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block => write!(f, "block"),
            Self::Photogroup => write!(f, "photogroup"),
            Self::Photo => write!(f, "photo"),
            Self::FeatureMatch => write!(f, "feature_match"),
            Self::PhotoOrientation => write!(f, "photo_orientation"),
            Self::PointCloud => write!(f, "point_cloud"),
            Self::SurfaceModel => write!(f, "surface_model"),
            Self::Texture => write!(f, "texture"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kind_ordering() {
        assert!(StageKind::FeatureMatch < StageKind::PhotoOrientation);
        assert!(StageKind::PhotoOrientation < StageKind::PointCloud);
        assert!(StageKind::PointCloud < StageKind::SurfaceModel);
        assert!(StageKind::SurfaceModel < StageKind::Texture);
    }

    #[test]
    fn test_stage_kind_next_chain() {
        let mut kind = StageKind::FeatureMatch;
        let mut visited = vec![kind];
        while let Some(next) = kind.next() {
            visited.push(next);
            kind = next;
        }
        assert_eq!(visited, StageKind::ALL.to_vec());
        assert_eq!(StageKind::Texture.next(), None);
        assert_eq!(StageKind::FeatureMatch.prev(), None);
        assert_eq!(StageKind::Texture.prev(), Some(StageKind::SurfaceModel));
    }

    #[test]
    fn test_stage_kind_span() {
        let kinds: Vec<_> =
            StageKind::span(StageKind::PhotoOrientation, StageKind::SurfaceModel).collect();
        assert_eq!(
            kinds,
            vec![
                StageKind::PhotoOrientation,
                StageKind::PointCloud,
                StageKind::SurfaceModel
            ]
        );

        let full: Vec<_> = StageKind::span(StageKind::FeatureMatch, StageKind::Texture).collect();
        assert_eq!(full.len(), 5);

        let empty: Vec<_> =
            StageKind::span(StageKind::Texture, StageKind::FeatureMatch).collect();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_stage_kind_display() {
        assert_eq!(StageKind::FeatureMatch.to_string(), "feature_match");
        assert_eq!(StageKind::PhotoOrientation.to_string(), "photo_orientation");
        assert_eq!(StageKind::Texture.to_string(), "texture");
    }

    #[test]
    fn test_stage_kind_serialize() {
        let json = serde_json::to_string(&StageKind::PointCloud).unwrap();
        assert_eq!(json, r#""point_cloud""#);

        let deserialized: StageKind = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, StageKind::PointCloud);
    }

    #[test]
    fn test_entity_kind_from_stage_kind() {
        assert_eq!(
            EntityKind::from(StageKind::SurfaceModel),
            EntityKind::SurfaceModel
        );
        assert_eq!(EntityKind::Photogroup.to_string(), "photogroup");
    }

    #[test]
    fn test_stage_kind_title() {
        assert_eq!(StageKind::FeatureMatch.title(), "Feature Match");
        assert_eq!(StageKind::SurfaceModel.title(), "Surface Model");
    }
}
