use std::{
    collections::VecDeque,
    sync::{Arc, Condvar, Mutex, MutexGuard},
};

use serde_derive::Serialize;

use crate::error::JudgeCoreError;

struct PoolInner {
    free: Mutex<VecDeque<u32>>,
    released: Condvar,
    capacity: usize,
}

impl PoolInner {
    fn queue(&self) -> MutexGuard<'_, VecDeque<u32>> {
        // The queue stays consistent even if a holder panicked.
        self.free.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A fixed set of box ids, each held by at most one judging operation.
#[derive(Clone)]
pub struct BoxPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolState {
    pub capacity: usize,
    pub available: usize,
}

impl BoxPool {
    /// Ids `first_id .. first_id + count`.
    pub fn new(first_id: u32, count: u32) -> Result<Self, JudgeCoreError> {
        if count == 0 {
            return Err(JudgeCoreError::SandboxError(
                "box pool needs at least one box".to_string(),
            ));
        }
        let end = first_id.checked_add(count).ok_or_else(|| {
            JudgeCoreError::SandboxError(format!(
                "box ids {} + {} overflow the id range",
                first_id, count
            ))
        })?;
        Ok(Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new((first_id..end).collect()),
                released: Condvar::new(),
                capacity: count as usize,
            }),
        })
    }

    /// Blocks until a box id is free.
    pub fn lease(&self) -> BoxLease {
        let mut free = self.inner.queue();
        loop {
            if let Some(box_id) = free.pop_front() {
                log::debug!("Leased box {}", box_id);
                return BoxLease {
                    pool: self.inner.clone(),
                    box_id,
                };
            }
            free = self
                .inner
                .released
                .wait(free)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    pub fn try_lease(&self) -> Option<BoxLease> {
        let box_id = self.inner.queue().pop_front()?;
        log::debug!("Leased box {}", box_id);
        Some(BoxLease {
            pool: self.inner.clone(),
            box_id,
        })
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn available(&self) -> usize {
        self.inner.queue().len()
    }

    pub fn state(&self) -> PoolState {
        PoolState {
            capacity: self.capacity(),
            available: self.available(),
        }
    }
}

/// Exclusive hold on one box id, given back to the pool on drop.
pub struct BoxLease {
    pool: Arc<PoolInner>,
    box_id: u32,
}

impl BoxLease {
    pub fn box_id(&self) -> u32 {
        self.box_id
    }
}

impl Drop for BoxLease {
    fn drop(&mut self) {
        log::debug!("Released box {}", self.box_id);
        self.pool.queue().push_back(self.box_id);
        self.pool.released.notify_one();
    }
}
