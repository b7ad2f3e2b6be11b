//! SaveSystem: entry point for saving and loading a scene
//!
//! Owns the type registry and settings, and guards against overlapping
//! operations: while a save or load is in flight (including the
//! `post_deserialize` hooks a load leaves pending until the scene has
//! inserted its entities), any further save or load fails with
//! `SaveError::Busy`.

use std::time::Instant;

use super::config::SaveConfig;
use super::reconstructor::{GraphReconstructor, LoadReport, PendingHook, Reconstruction};
use super::registry::TypeRegistry;
use super::storage::SaveStorage;
use super::tree::SceneTree;
use super::types::{SaveError, Snapshot};
use super::walker::GraphWalker;

pub struct SaveSystem {
    registry: TypeRegistry,
    config: SaveConfig,
    currently_processing: bool,
    pending: Vec<PendingHook>,
    last_save: Option<Instant>,
}

impl SaveSystem {
    pub fn new(registry: TypeRegistry, config: SaveConfig) -> Self {
        SaveSystem {
            registry,
            config,
            currently_processing: false,
            pending: Vec::new(),
            last_save: None,
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    /// True while a save/load, or the tail of a load, is outstanding
    pub fn is_processing(&self) -> bool {
        self.currently_processing
    }

    /// `post_deserialize` hooks still waiting on the scene
    pub fn pending_hooks(&self) -> usize {
        self.pending.len()
    }

    fn begin(&mut self) -> Result<(), SaveError> {
        if self.currently_processing {
            return Err(SaveError::Busy);
        }
        self.currently_processing = true;
        Ok(())
    }

    /// Builds a snapshot of everything reachable from the scene's top level
    pub fn save<T: SceneTree>(&mut self, tree: &mut T) -> Result<Snapshot, SaveError> {
        self.begin()?;
        let result = GraphWalker::new(&self.registry).save(tree);
        self.currently_processing = false;
        result
    }

    /// Saves and writes the snapshot to storage
    ///
    /// Storage is written once, only after the whole snapshot is built.
    pub fn save_to_storage<T: SceneTree, S: SaveStorage + ?Sized>(
        &mut self,
        tree: &mut T,
        storage: &mut S,
    ) -> Result<Snapshot, SaveError> {
        self.begin()?;
        let result = GraphWalker::new(&self.registry).save(tree).and_then(|snapshot| {
            let text = snapshot.to_json(self.config.pretty)?;
            storage.write(&self.config.storage_key, &text)?;
            Ok(snapshot)
        });
        self.currently_processing = false;

        if let Ok(snapshot) = &result {
            self.last_save = Some(Instant::now());
            log::info!(
                "Saved {} nodes under '{}'",
                snapshot.len(),
                self.config.storage_key
            );
        }
        result
    }

    /// Loads snapshot text into the scene
    ///
    /// On failure the scene may be partially populated and should not be
    /// used further.
    pub fn load<T: SceneTree>(&mut self, tree: &mut T, text: &str) -> Result<LoadReport, SaveError> {
        self.begin()?;
        let result = GraphReconstructor::new(&self.registry).load_text(tree, text);
        self.finish_load(result)
    }

    pub fn load_snapshot<T: SceneTree>(
        &mut self,
        tree: &mut T,
        snapshot: Snapshot,
    ) -> Result<LoadReport, SaveError> {
        self.begin()?;
        let result = GraphReconstructor::new(&self.registry).load(tree, snapshot);
        self.finish_load(result)
    }

    /// Loads from storage; Ok(None) if nothing has been saved yet
    pub fn load_from_storage<T: SceneTree, S: SaveStorage + ?Sized>(
        &mut self,
        tree: &mut T,
        storage: &S,
    ) -> Result<Option<LoadReport>, SaveError> {
        if self.currently_processing {
            return Err(SaveError::Busy);
        }
        let Some(text) = storage.read(&self.config.storage_key)? else {
            log::info!("No save found under '{}'", self.config.storage_key);
            return Ok(None);
        };
        self.load(tree, &text).map(Some)
    }

    fn finish_load(
        &mut self,
        result: Result<Reconstruction, SaveError>,
    ) -> Result<LoadReport, SaveError> {
        match result {
            Ok(reconstruction) => {
                let report = reconstruction.report;
                self.pending = reconstruction.pending;
                self.currently_processing = !self.pending.is_empty();
                log::info!(
                    "Loaded {} nodes in {} passes ({} dropped)",
                    report.attached.len(),
                    report.passes,
                    report.dropped.len()
                );
                Ok(report)
            }
            Err(e) => {
                self.pending.clear();
                self.currently_processing = false;
                log::error!("Load failed: {}", e);
                Err(e)
            }
        }
    }

    /// Runs pending `post_deserialize` hooks for entities the scene has inserted
    ///
    /// Call once per frame after the scene's own update. Returns how many
    /// hooks ran.
    pub fn update<T: SceneTree>(&mut self, tree: &mut T) -> usize {
        if self.pending.is_empty() {
            return 0;
        }

        let mut ran = 0;
        for hook in std::mem::take(&mut self.pending) {
            if tree.is_removed(hook.handle) {
                log::warn!("'{}' removed before it was added", hook.record.id);
                continue;
            }
            if !tree.is_in_scene(hook.handle) {
                self.pending.push(hook);
                continue;
            }
            if let Some(object) = tree.object_mut(hook.handle) {
                object.post_deserialize(&hook.record);
                ran += 1;
            }
        }

        if self.pending.is_empty() {
            self.currently_processing = false;
        }
        ran
    }

    /// Drops outstanding `post_deserialize` hooks and releases the guard
    pub fn cancel_pending(&mut self) {
        if !self.pending.is_empty() {
            log::warn!("Cancelled {} pending hooks", self.pending.len());
        }
        self.pending.clear();
        self.currently_processing = false;
    }

    /// Check if autosave is needed
    pub fn should_autosave(&self, now: Instant) -> bool {
        match self.last_save {
            Some(last_save) => {
                now.saturating_duration_since(last_save) >= self.config.autosave_interval()
            }
            None => true, // Save if we've never saved
        }
    }

    /// Saves to storage if the autosave interval has elapsed
    ///
    /// Failures are logged, never returned: a lost autosave must not take
    /// the session down. Returns true if a save was written.
    pub fn autosave<T: SceneTree, S: SaveStorage + ?Sized>(
        &mut self,
        tree: &mut T,
        storage: &mut S,
        now: Instant,
    ) -> bool {
        if !self.should_autosave(now) {
            return false;
        }
        if self.currently_processing {
            log::debug!("Autosave skipped, save system busy");
            return false;
        }

        match self.save_to_storage(tree, storage) {
            Ok(_) => {
                self.last_save = Some(now);
                true
            }
            Err(e) => {
                log::error!("Autosave failed: {}", e);
                false
            }
        }
    }
}
