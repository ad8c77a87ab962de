use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of monotonic wall-clock time in milliseconds
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_millis(&self) -> f64;
}

/// Clock shared between the viewport, drawers and viewer
pub type SharedClock = Arc<dyn Clock>;

/// Monotonic clock counting from its creation
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: instant::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: instant::Instant::now(),
        }
    }

    pub fn shared() -> SharedClock {
        Arc::new(Self::new())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_millis: f64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(start_millis.to_bits())),
        }
    }

    pub fn set(&self, millis: f64) {
        self.millis.store(millis.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, millis: f64) {
        self.set(self.now_millis() + millis);
    }

    /// A shared handle driven by this clock
    pub fn shared(&self) -> SharedClock {
        Arc::new(self.clone())
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> f64 {
        f64::from_bits(self.millis.load(Ordering::SeqCst))
    }
}
