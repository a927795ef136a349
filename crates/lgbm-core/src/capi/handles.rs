//! Generational handle arenas.
//!
//! A handle packs `[generation:28][kind:4][index + 1:32]` into a pointer
//! sized integer. Releasing a handle bumps its slot's generation, so stale
//! copies, handles of the other kind and null all fail lookup with
//! `InvalidHandle` instead of touching freed memory. The packing needs
//! 64-bit pointers, so other targets are rejected at compile time.

#[cfg(not(target_pointer_width = "64"))]
compile_error!("handle packing requires a 64-bit target");

use std::ffi::c_void;

use crate::{Error, Result};

const INDEX_BITS: u32 = 32;
const KIND_BITS: u32 = 4;
const GENERATION_MASK: u64 = (1 << (64 - INDEX_BITS - KIND_BITS)) - 1;

/// Opaque handle as seen by C callers.
pub type RawHandle = *mut c_void;

/// What a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandleKind {
    Dataset = 1,
    Booster = 2,
}

impl HandleKind {
    fn name(self) -> &'static str {
        match self {
            HandleKind::Dataset => "Dataset",
            HandleKind::Booster => "Booster",
        }
    }
}

struct Slot<T> {
    generation: u64,
    value: Option<T>,
}

/// Slots of one handle kind; freed slots are reused with a new generation.
pub struct HandleArena<T> {
    kind: HandleKind,
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
}

impl<T> HandleArena<T> {
    pub const fn new(kind: HandleKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Store `value` and return its handle. Never returns null.
    pub fn insert(&mut self, value: T) -> RawHandle {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index].value = Some(value);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(value),
                });
                self.slots.len() - 1
            }
        };
        self.encode(index, self.slots[index].generation)
    }

    pub fn get(&self, handle: RawHandle) -> Result<&T> {
        let index = self.decode(handle)?;
        self.slots[index]
            .value
            .as_ref()
            .ok_or_else(|| self.stale(handle))
    }

    pub fn get_mut(&mut self, handle: RawHandle) -> Result<&mut T> {
        let index = self.decode(handle)?;
        let stale = self.stale(handle);
        self.slots[index].value.as_mut().ok_or(stale)
    }

    /// Take the value out and invalidate the handle.
    pub fn remove(&mut self, handle: RawHandle) -> Result<T> {
        let index = self.decode(handle)?;
        let stale = self.stale(handle);
        let slot = &mut self.slots[index];
        let value = slot.value.take().ok_or(stale)?;
        slot.generation = (slot.generation + 1) & GENERATION_MASK;
        self.free.push(index);
        Ok(value)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn encode(&self, index: usize, generation: u64) -> RawHandle {
        let packed = (generation << (INDEX_BITS + KIND_BITS))
            | ((self.kind as u64) << INDEX_BITS)
            | (index as u64 + 1);
        packed as usize as RawHandle
    }

    /// Slot index of a live-looking handle: right kind, in range, current
    /// generation.
    fn decode(&self, handle: RawHandle) -> Result<usize> {
        let packed = handle as usize as u64;
        if packed == 0 {
            return Err(Error::InvalidHandle(format!("null {} handle", self.kind.name())));
        }
        let kind = (packed >> INDEX_BITS) & ((1 << KIND_BITS) - 1);
        let generation = packed >> (INDEX_BITS + KIND_BITS);
        let index = (packed & ((1 << INDEX_BITS) - 1)) as usize;
        if kind != self.kind as u64 || index == 0 {
            return Err(Error::InvalidHandle(format!(
                "{handle:p} is not a {} handle",
                self.kind.name()
            )));
        }
        let index = index - 1;
        match self.slots.get(index) {
            Some(slot) if slot.generation == generation => Ok(index),
            _ => Err(self.stale(handle)),
        }
    }

    fn stale(&self, handle: RawHandle) -> Error {
        Error::InvalidHandle(format!(
            "{} handle {handle:p} was released",
            self.kind.name()
        ))
    }
}
