use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub physical: u64,  // Milliseconds since epoch
    pub logical: u64,   // Monotonic counter
}

impl Timestamp {
    pub fn now() -> Self {
        HLC.now()
    }

    pub fn from_millis(millis: u64) -> Self {
        Timestamp {
            physical: millis,
            logical: 0,
        }
    }

    pub fn as_millis(&self) -> u64 {
        self.physical
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.physical as i64).unwrap_or_default()
    }
}

impl std::ops::Add<std::time::Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, duration: std::time::Duration) -> Timestamp {
        Timestamp {
            physical: self.physical + duration.as_millis() as u64,
            logical: self.logical,
        }
    }
}

impl std::ops::Sub for Timestamp {
    type Output = std::time::Duration;

    fn sub(self, other: Timestamp) -> std::time::Duration {
        std::time::Duration::from_millis(self.physical.saturating_sub(other.physical))
    }
}

/// Source of `createdAt` / `executedAt` stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by the process-wide hybrid logical clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock that only moves when told to. Reads within the same millisecond
/// still come out strictly ordered through the logical counter.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
    logical: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        ManualClock {
            millis: AtomicU64::new(start_millis),
            logical: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, duration: std::time::Duration) {
        self.millis.fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp {
            physical: self.millis.load(Ordering::SeqCst),
            logical: self.logical.fetch_add(1, Ordering::SeqCst),
        }
    }
}

const LOGICAL_BITS: u32 = 20;
const LOGICAL_MASK: u64 = (1 << LOGICAL_BITS) - 1;

/// Physical millis in the high bits, logical counter in the low
/// `LOGICAL_BITS`, so one compare-and-swap advances both. A full logical
/// counter carries into the next millisecond.
pub struct HybridLogicalClock {
    state: AtomicU64,
}

impl HybridLogicalClock {
    pub fn new() -> Self {
        HybridLogicalClock {
            state: AtomicU64::new(0),
        }
    }

    pub fn now(&self) -> Timestamp {
        let wall_clock = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let mut last = self.state.load(Ordering::SeqCst);
        loop {
            let next = if wall_clock > last >> LOGICAL_BITS {
                wall_clock << LOGICAL_BITS
            } else {
                // Wall clock same or went backward
                last + 1
            };

            match self.state.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => {
                    return Timestamp {
                        physical: next >> LOGICAL_BITS,
                        logical: next & LOGICAL_MASK,
                    };
                }
                Err(current) => last = current,
            }
        }
    }
}

impl Default for HybridLogicalClock {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static::lazy_static! {
    static ref HLC: HybridLogicalClock = HybridLogicalClock::new();
}
