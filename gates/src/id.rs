//! Identifier generation.
//!
//! Ids are 24 lowercase hex characters encoding 12 bytes:
//! a 4-byte big-endian Unix timestamp, 5 random bytes fixed per generator, and
//! a 3-byte counter that starts at a random value and wraps at 2^24.
//!
//! There is no process-wide state. Callers that need ids to be unique across a
//! process share one `IdGenerator`; tests inject a seeded rng and a fixed clock.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Length of a generated id in characters
pub const ID_LEN: usize = 24;

const COUNTER_MASK: u32 = 0x00FF_FFFF;

/// Source of the timestamp embedded in ids
pub trait Clock: Send {
    fn unix_seconds(&self) -> u32;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_seconds(&self) -> u32 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0)
    }
}

/// A clock that always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u32);

impl Clock for FixedClock {
    fn unix_seconds(&self) -> u32 {
        self.0
    }
}

pub struct IdGenerator {
    clock: Box<dyn Clock>,
    random: [u8; 5],
    counter: u32,
}

impl IdGenerator {
    /// Draw the per-generator random bytes and the counter start from `rng`
    pub fn new(mut rng: StdRng, clock: Box<dyn Clock>) -> Self {
        let mut random = [0u8; 5];
        rng.fill_bytes(&mut random);
        let counter = rng.random::<u32>() & COUNTER_MASK;
        Self {
            clock,
            random,
            counter,
        }
    }

    /// Deterministic generator with the system clock
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed), Box::new(SystemClock))
    }

    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng(), Box::new(SystemClock))
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Mint the next id
    pub fn next_id(&mut self) -> Arc<str> {
        self.counter = (self.counter + 1) & COUNTER_MASK;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&self.clock.unix_seconds().to_be_bytes());
        bytes[4..9].copy_from_slice(&self.random);
        bytes[9..].copy_from_slice(&self.counter.to_be_bytes()[1..]);

        let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        Arc::from(hex)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::from_os_rng()
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator")
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

/// Whether `id` has the generated-id shape
pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
