use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

type Registry = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Per-doctor write serialization for bookings in this process.
///
/// `create` and `reschedule` hold the doctor's guard from validation until the
/// write returns, so two requests for the same doctor never interleave.
#[derive(Clone, Default)]
pub struct SlotLocks {
    registry: Registry,
}

/// Held while a doctor's agenda is being written; releases and prunes on drop.
pub struct DoctorGuard {
    doctor_id: String,
    registry: Registry,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SlotLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, doctor_id: &str) -> DoctorGuard {
        let lock = {
            let mut registry = self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            registry
                .entry(doctor_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        debug!("Waiting for agenda lock of doctor {}", doctor_id);
        let guard = lock.lock_owned().await;

        DoctorGuard {
            doctor_id: doctor_id.to_string(),
            registry: self.registry.clone(),
            guard: Some(guard),
        }
    }

    /// Doctors with a live lock entry.
    pub fn tracked(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Drop for DoctorGuard {
    fn drop(&mut self) {
        let mut registry = self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.guard.take();

        // Only the registry still references the mutex: nobody is waiting.
        let idle = registry
            .get(&self.doctor_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            registry.remove(&self.doctor_id);
        }
    }
}
