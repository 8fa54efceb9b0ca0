use std::any::Any;
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::core::{CleanupError, CleanupResult, CleanupType};
use crate::registry::Registry;

/// Source of free-space samples. Implementations may fluctuate; the engine
/// floors apparent growth at zero. `None` means the sample could not be taken.
pub trait DiskProbe: Send + Sync {
    fn free_bytes(&self) -> Option<u64>;
}

/// Samples the filesystem mounted at `path` (`/` by default).
#[derive(Debug, Clone)]
pub struct FsProbe {
    path: PathBuf,
}

impl FsProbe {
    pub fn root() -> Self {
        Self {
            path: PathBuf::from("/"),
        }
    }
}

impl DiskProbe for FsProbe {
    fn free_bytes(&self) -> Option<u64> {
        crate::platform::free_disk_space(&self.path)
    }
}

#[derive(Clone)]
pub struct Engine {
    registry: Arc<Registry>,
    probe: Arc<dyn DiskProbe>,
    last_free: Arc<AtomicU64>,
}

impl Engine {
    pub fn new(registry: Arc<Registry>, probe: Arc<dyn DiskProbe>) -> Self {
        Self {
            registry,
            probe,
            last_free: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current free space. A failed sample repeats the last good one, so a
    /// baseline delta across a failure reads as nothing freed.
    pub fn free_bytes(&self) -> u64 {
        match self.sample() {
            Some(bytes) => bytes,
            None => self.last_free.load(Ordering::Relaxed),
        }
    }

    fn sample(&self) -> Option<u64> {
        let bytes = self.probe.free_bytes()?;
        self.last_free.store(bytes, Ordering::Relaxed);
        Some(bytes)
    }

    /// Runs the action registered as `name` once and returns the bytes it
    /// freed. Failed or panicking actions come back as errors and the
    /// post-run sample is skipped for them. If either sample cannot be taken
    /// the action still counts as a success that freed 0 bytes.
    pub fn perform_cleanup(&self, name: &str) -> Result<u64, CleanupError> {
        let before = self.sample();

        let ty = self
            .registry
            .lookup(name)
            .ok_or_else(|| CleanupError::UnknownType(name.to_string()))?;

        invoke_guarded(&ty)?;

        let after = self.sample();
        Ok(match (before, after) {
            (Some(before), Some(after)) => freed_bytes(before, after),
            _ => 0,
        })
    }

    /// `perform_cleanup` with timing, folded into a `CleanupResult`.
    pub fn run(&self, name: &str) -> CleanupResult {
        let started = Instant::now();
        let outcome = self.perform_cleanup(name);
        CleanupResult::from_outcome(name, outcome, started.elapsed())
    }
}

pub fn freed_bytes(before: u64, after: u64) -> u64 {
    before.saturating_sub(after)
}

fn invoke_guarded(ty: &CleanupType) -> Result<(), CleanupError> {
    match panic::catch_unwind(AssertUnwindSafe(|| (ty.action)())) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(CleanupError::ActionFailed {
            name: ty.name.clone(),
            source,
        }),
        Err(payload) => Err(CleanupError::ActionFault {
            name: ty.name.clone(),
            cause: panic_message(payload.as_ref()),
        }),
    }
}

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Replaces the process panic hook with one that records the message instead
/// of printing it, so a faulting action cannot write over the alternate screen
/// or interleave with batch output. The previous hook is put back on drop.
pub struct QuietPanics {
    previous: Option<PanicHook>,
    last: Arc<Mutex<Option<String>>>,
}

impl QuietPanics {
    pub fn install() -> Self {
        let previous = panic::take_hook();
        let last = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&last);
        panic::set_hook(Box::new(move |info| {
            if let Ok(mut slot) = sink.lock() {
                *slot = Some(info.to_string());
            }
        }));
        Self {
            previous: Some(previous),
            last,
        }
    }

    /// The most recent panic seen while installed.
    pub fn last_message(&self) -> Option<String> {
        self.last.lock().ok().and_then(|slot| slot.clone())
    }
}

impl Drop for QuietPanics {
    fn drop(&mut self) {
        // set_hook panics on a panicking thread.
        if thread::panicking() {
            return;
        }
        if let Some(previous) = self.previous.take() {
            panic::set_hook(previous);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "unknown panic payload".to_string()
}
