//! In-memory resource store.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use parking_lot::Mutex;

use super::{
    default_name, BlockRecord, CopiedStage, NewStageRecord, PhotoRecord, PhotogroupRecord,
    ResourceStore, StageRecord, StoreResult, WorkspaceLayout,
};
use crate::core::{EntityKind, RecordFlags, ResourceId, StageKind};
use crate::errors::StoreError;

/// Scripted failure state for tests.
#[derive(Debug, Default)]
struct Faults {
    fail_flag_updates: bool,
    fail_reads: HashSet<EntityKind>,
    add_budget: Option<usize>,
}

/// An in-memory [`ResourceStore`].
///
/// Backs the test suite and embedders running without a database. Beyond
/// the trait it offers seeding helpers for blocks, photogroups and
/// photos, a log of attempted flag updates, and scripted fault injection
/// for exercising store-failure paths.
pub struct MemoryStore {
    layout: WorkspaceLayout,
    next_ids: Mutex<HashMap<EntityKind, ResourceId>>,
    blocks: DashMap<ResourceId, BlockRecord>,
    photogroups: DashMap<ResourceId, PhotogroupRecord>,
    photos: DashMap<ResourceId, PhotoRecord>,
    stages: DashMap<(StageKind, ResourceId), StageRecord>,
    flag_updates: Mutex<Vec<(StageKind, ResourceId, RecordFlags)>>,
    faults: Mutex<Faults>,
}

impl MemoryStore {
    /// Creates an empty store deriving artifact paths from `layout`.
    #[must_use]
    pub fn new(layout: WorkspaceLayout) -> Self {
        Self {
            layout,
            next_ids: Mutex::new(HashMap::new()),
            blocks: DashMap::new(),
            photogroups: DashMap::new(),
            photos: DashMap::new(),
            stages: DashMap::new(),
            flag_updates: Mutex::new(Vec::new()),
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Creates an empty store with a workspace rooted at `root`.
    #[must_use]
    pub fn with_root(root: impl Into<std::path::PathBuf>) -> Self {
        Self::new(WorkspaceLayout::new(root))
    }

    fn next_id(&self, entity: EntityKind) -> ResourceId {
        let mut ids = self.next_ids.lock();
        let counter = ids.entry(entity).or_insert(1);
        let id = *counter;
        *counter += 1;
        id
    }

    fn check_read(&self, entity: EntityKind) -> StoreResult<()> {
        if self.faults.lock().fail_reads.contains(&entity) {
            return Err(StoreError::backend(format!(
                "scripted read failure for {entity}"
            )));
        }
        Ok(())
    }

    /// Seeds a block, returning its assigned id.
    pub fn insert_block(&self, name: impl Into<String>) -> ResourceId {
        let id = self.next_id(EntityKind::Block);
        self.blocks.insert(
            id,
            BlockRecord {
                id,
                name: name.into(),
            },
        );
        id
    }

    /// Seeds a photogroup, returning its assigned id. The record's `id`
    /// field is replaced by a store-assigned one.
    pub fn insert_photogroup(&self, mut record: PhotogroupRecord) -> ResourceId {
        let id = self.next_id(EntityKind::Photogroup);
        record.id = id;
        self.photogroups.insert(id, record);
        id
    }

    /// Seeds a photo, returning its assigned id. The record's `id` field
    /// is replaced by a store-assigned one.
    pub fn insert_photo(&self, mut record: PhotoRecord) -> ResourceId {
        let id = self.next_id(EntityKind::Photo);
        record.id = id;
        self.photos.insert(id, record);
        id
    }

    /// Every flag update attempted, in call order, including rejected
    /// ones.
    #[must_use]
    pub fn flag_updates(&self) -> Vec<(StageKind, ResourceId, RecordFlags)> {
        self.flag_updates.lock().clone()
    }

    /// Makes every subsequent flag update fail.
    pub fn fail_flag_updates(&self, enabled: bool) {
        self.faults.lock().fail_flag_updates = enabled;
    }

    /// Makes every subsequent read of `entity` records fail.
    pub fn fail_reads_of(&self, entity: EntityKind) {
        self.faults.lock().fail_reads.insert(entity);
    }

    /// Allows only `count` further registrations before they fail.
    pub fn limit_adds(&self, count: usize) {
        self.faults.lock().add_budget = Some(count);
    }

    /// Clears all scripted faults.
    pub fn clear_faults(&self) {
        *self.faults.lock() = Faults::default();
    }
}

impl ResourceStore for MemoryStore {
    fn add_stage(&self, kind: StageKind, parent_id: ResourceId) -> StoreResult<NewStageRecord> {
        {
            let mut faults = self.faults.lock();
            if let Some(budget) = faults.add_budget.as_mut() {
                if *budget == 0 {
                    return Err(StoreError::backend("registration budget exhausted"));
                }
                *budget -= 1;
            }
        }

        let id = self.next_id(kind.into());
        let name = default_name(kind, id);
        self.stages.insert(
            (kind, id),
            StageRecord {
                id,
                name: name.clone(),
                parent_id,
                kind,
                flags: RecordFlags::NOT_COMPLETED,
            },
        );
        Ok(NewStageRecord { id, name })
    }

    fn stage(&self, kind: StageKind, id: ResourceId) -> StoreResult<StageRecord> {
        self.check_read(kind.into())?;
        self.stages
            .get(&(kind, id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(kind.into(), id))
    }

    fn stages(&self, kind: StageKind) -> StoreResult<Vec<StageRecord>> {
        self.check_read(kind.into())?;
        let mut records: Vec<StageRecord> = self
            .stages
            .iter()
            .filter(|entry| entry.key().0 == kind)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }

    fn stages_of_parent(
        &self,
        kind: StageKind,
        parent_id: ResourceId,
    ) -> StoreResult<Vec<StageRecord>> {
        let mut records = self.stages(kind)?;
        records.retain(|record| record.parent_id == parent_id);
        Ok(records)
    }

    fn update_stage_flags(
        &self,
        kind: StageKind,
        id: ResourceId,
        flags: RecordFlags,
    ) -> StoreResult<()> {
        self.flag_updates.lock().push((kind, id, flags));

        if self.faults.lock().fail_flag_updates {
            return Err(StoreError::backend("scripted flag update failure"));
        }

        match self.stages.get_mut(&(kind, id)) {
            Some(mut entry) => {
                entry.value_mut().flags = flags;
                Ok(())
            }
            None => Err(StoreError::not_found(kind.into(), id)),
        }
    }

    fn remove_stage(&self, kind: StageKind, id: ResourceId) -> StoreResult<()> {
        self.stages
            .remove(&(kind, id))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(kind.into(), id))
    }

    fn copy_stage(&self, kind: StageKind, id: ResourceId) -> StoreResult<CopiedStage> {
        let source = self.stage(kind, id)?;
        let new_id = self.next_id(kind.into());
        let name = format!("{} (copy)", source.name);
        self.stages.insert(
            (kind, new_id),
            StageRecord {
                id: new_id,
                name: name.clone(),
                parent_id: source.parent_id,
                kind,
                flags: RecordFlags::NOT_COMPLETED,
            },
        );
        Ok(CopiedStage {
            id: new_id,
            name,
            parent_id: source.parent_id,
        })
    }

    fn block(&self, id: ResourceId) -> StoreResult<BlockRecord> {
        self.check_read(EntityKind::Block)?;
        self.blocks
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(EntityKind::Block, id))
    }

    fn photogroup(&self, id: ResourceId) -> StoreResult<PhotogroupRecord> {
        self.check_read(EntityKind::Photogroup)?;
        self.photogroups
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(EntityKind::Photogroup, id))
    }

    fn photogroups_of_block(&self, block_id: ResourceId) -> StoreResult<Vec<PhotogroupRecord>> {
        self.check_read(EntityKind::Photogroup)?;
        let mut records: Vec<PhotogroupRecord> = self
            .photogroups
            .iter()
            .filter(|entry| entry.value().block_id == block_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }

    fn photo(&self, id: ResourceId) -> StoreResult<PhotoRecord> {
        self.check_read(EntityKind::Photo)?;
        self.photos
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(EntityKind::Photo, id))
    }

    fn photos_of_group(&self, photogroup_id: ResourceId) -> StoreResult<Vec<PhotoRecord>> {
        self.check_read(EntityKind::Photo)?;
        let mut records: Vec<PhotoRecord> = self
            .photos
            .iter()
            .filter(|entry| entry.value().photogroup_id == photogroup_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }

    fn photos(&self) -> StoreResult<Vec<PhotoRecord>> {
        self.check_read(EntityKind::Photo)?;
        let mut records: Vec<PhotoRecord> = self
            .photos
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }

    fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }
}
