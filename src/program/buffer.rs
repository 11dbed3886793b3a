//! Shared upload buffer between the network task and the control task.
//!
//! Both sides take the lock with a bounded wait.  The control task copies
//! the bytes out and releases the lock straight away, so the critical
//! section never spans parsing or motion.

use std::sync::Arc;
use std::time::Duration;

use log::warn;
use parking_lot::Mutex;

use crate::config::ProgramConfig;
use crate::error::ProgramError;

/// Cloneable handle; every clone refers to the same buffer.
#[derive(Debug, Clone)]
pub struct ProgramBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
    timeout: Duration,
    max_bytes: usize,
}

impl ProgramBuffer {
    pub fn new(config: &ProgramConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
            timeout: Duration::from_millis(u64::from(config.lock_timeout_ms)),
            max_bytes: config.max_program_bytes,
        }
    }

    /// Replace the stored program.
    pub fn store(&self, program: &[u8]) -> Result<(), ProgramError> {
        if program.len() > self.max_bytes {
            warn!(
                "PROGRAM: upload of {} bytes exceeds {} byte limit",
                program.len(),
                self.max_bytes
            );
            return Err(ProgramError::TooLarge);
        }
        let mut guard = self.inner.try_lock_for(self.timeout).ok_or_else(|| {
            warn!("PROGRAM: store timed out waiting for buffer lock");
            ProgramError::LockTimeout
        })?;
        guard.clear();
        guard.extend_from_slice(program);
        Ok(())
    }

    /// Copy the stored program out.  An empty buffer is an error.
    pub fn snapshot(&self) -> Result<Vec<u8>, ProgramError> {
        let copy = {
            let guard = self.inner.try_lock_for(self.timeout).ok_or_else(|| {
                warn!("PROGRAM: snapshot timed out waiting for buffer lock");
                ProgramError::LockTimeout
            })?;
            guard.clone()
        };
        if copy.is_empty() {
            return Err(ProgramError::Empty);
        }
        Ok(copy)
    }

    /// Hold the lock to simulate a stuck producer.
    #[cfg(test)]
    fn lock(&self) -> parking_lot::MutexGuard<'_, Vec<u8>> {
        self.inner.lock()
    }
}
