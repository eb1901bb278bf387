//! Named transfer functions
//!
//! Shaders and renderers look transfer functions up by name and hold a
//! `ResourceHandle` for as long as they draw with one. Redefining a name
//! with the same sample count updates the existing table in place, so every
//! holder sees the new colors on its next frame.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::transfer_function::TransferFunction;
use crate::error::EngineResult;
use crate::gpu::{GpuBackend, ResourceHandle};

pub type SharedTransferFunction<B> = ResourceHandle<RwLock<TransferFunction<B>>>;

pub struct TransferFunctionRegistry<B: GpuBackend> {
    functions: HashMap<String, SharedTransferFunction<B>>,
}

impl<B: GpuBackend> TransferFunctionRegistry<B> {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Create `name`, or update it in place when it already exists with the
    /// same sample count. A different sample count replaces the definition;
    /// holders of the old one keep it until they release it.
    pub fn define(
        &mut self,
        device: &B,
        name: &str,
        sample_count: usize,
        rgba: &[f32],
    ) -> EngineResult<SharedTransferFunction<B>> {
        if let Some(existing) = self.functions.get(name) {
            let same_size = existing.read().sample_count() == sample_count;
            if same_size {
                existing.write().update(device, rgba)?;
                return Ok(existing.acquire());
            }
            log::info!(
                "[TransferFunctionRegistry::define] Replacing '{}' ({} -> {} samples)",
                name,
                existing.read().sample_count(),
                sample_count
            );
        }

        let function = TransferFunction::new(device, name, sample_count, rgba)?;
        let handle = ResourceHandle::new(RwLock::new(function));
        let returned = handle.acquire();
        if let Some(previous) = self.functions.insert(name.to_string(), handle) {
            let remaining = previous.release();
            log::debug!(
                "[TransferFunctionRegistry::define] Previous '{}' still has {} holders",
                name,
                remaining
            );
        }
        Ok(returned)
    }

    /// New holder of `name`, if defined
    pub fn get(&self, name: &str) -> Option<SharedTransferFunction<B>> {
        self.functions.get(name).map(ResourceHandle::acquire)
    }

    /// Drop the registry's holder of `name`
    pub fn remove(&mut self, name: &str) -> bool {
        match self.functions.remove(name) {
            Some(handle) => {
                handle.release();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Defined names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl<B: GpuBackend> Default for TransferFunctionRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}
