//! State publication: a "current" slot plus a bounded recent history.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use plc_core::ParamMap;
use serde::{Deserialize, Serialize};

use crate::StoreResult;

/// Parameter map published after one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFrame {
    pub cycle: u64,
    pub timestamp: DateTime<Utc>,
    /// Virtual time in seconds since the engine started.
    pub sim_time: f64,
    pub params: ParamMap,
}

/// Where per-cycle state goes. Implementations must not block the cycle
/// thread for long; errors are logged by the caller and otherwise ignored.
pub trait Publisher: Send {
    fn publish(&mut self, frame: &StateFrame) -> StoreResult<()>;
}

#[derive(Debug, Default)]
struct Published {
    current: Option<StateFrame>,
    history: VecDeque<StateFrame>,
}

/// In-process publisher. Clones share the same state, so a consumer keeps
/// one handle while the engine owns another.
#[derive(Debug, Clone)]
pub struct MemoryPublisher {
    state: Arc<Mutex<Published>>,
    capacity: usize,
}

impl MemoryPublisher {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(Published::default())),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Published> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Latest published frame.
    pub fn current(&self) -> Option<StateFrame> {
        self.lock().current.clone()
    }

    /// Recent frames, newest first.
    pub fn history(&self) -> Vec<StateFrame> {
        self.lock().history.iter().cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Publisher for MemoryPublisher {
    fn publish(&mut self, frame: &StateFrame) -> StoreResult<()> {
        let capacity = self.capacity;
        let mut state = self.lock();
        state.current = Some(frame.clone());
        if capacity > 0 {
            state.history.push_front(frame.clone());
            state.history.truncate(capacity);
        }
        Ok(())
    }
}
