//! Proof-of-work sealing search
//!
//! The search walks nonce candidates from 1 upwards and hashes the complete
//! header for each one until the hex digest starts with `difficulty` zeros.
//! [`seal_sequential`] is the plain uncancellable loop. [`Miner`] drives the
//! same search with a cancellation token, an optional timeout, and an
//! optional rayon fan-out over disjoint nonce chunks.

use crate::blockchain::BlockHeader;
use crate::config::MinerConfig;
use crate::crypto::Sha256Hash;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Largest meaningful difficulty: a SHA-256 digest has 64 hex characters.
pub const MAX_DIFFICULTY: u32 = 64;

/// Nonces each parallel worker claims at a time.
const CHUNK_SIZE: u64 = 4096;

/// How often a worker polls the stop conditions.
const POLL_INTERVAL: u64 = 1024;

/// True when the first `difficulty` hex characters of `hash` are `'0'`.
pub fn meets_difficulty(hash: &Sha256Hash, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    if difficulty > 2 * hash.len() {
        return false;
    }
    let full_bytes = difficulty / 2;
    if hash[..full_bytes].iter().any(|b| *b != 0) {
        return false;
    }
    difficulty % 2 == 0 || hash[full_bytes] >> 4 == 0
}

/// Candidate nonces `start, start + 1, ...` up to an inclusive end.
#[derive(Debug, Clone)]
pub struct Nonces {
    next: Option<u64>,
    end: u64,
}

impl Nonces {
    pub fn new(start: u64) -> Self {
        Self::range(start, u64::MAX)
    }

    /// Inclusive range `start..=end`.
    pub fn range(start: u64, end: u64) -> Self {
        Nonces {
            next: (start <= end).then_some(start),
            end,
        }
    }
}

impl Iterator for Nonces {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let current = self.next?;
        self.next = current.checked_add(1).filter(|candidate| *candidate <= self.end);
        Some(current)
    }
}

/// Cloneable flag that aborts a running search.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A found nonce and the header hash it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seal {
    pub nonce: u64,
    pub hash: Sha256Hash,
}

/// Result of a cancellable search. Cancellation is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SealOutcome<T> {
    Sealed(T),
    Cancelled,
}

impl<T> SealOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SealOutcome<U> {
        match self {
            SealOutcome::Sealed(value) => SealOutcome::Sealed(f(value)),
            SealOutcome::Cancelled => SealOutcome::Cancelled,
        }
    }

    pub fn sealed(self) -> Option<T> {
        match self {
            SealOutcome::Sealed(value) => Some(value),
            SealOutcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SealOutcome::Cancelled)
    }
}

fn try_nonce(header: &BlockHeader, nonce: u64) -> Option<Seal> {
    let hash = header.hash_with_nonce(nonce);
    meets_difficulty(&hash, header.difficulty).then_some(Seal { nonce, hash })
}

/// Unbounded search from nonce 1. Only returns once a seal is found.
pub fn seal_sequential(header: &BlockHeader) -> Seal {
    let mut nonce: u64 = 1;
    loop {
        if let Some(seal) = try_nonce(header, nonce) {
            return seal;
        }
        nonce = nonce.wrapping_add(1).max(1);
    }
}

#[derive(Debug, Clone)]
pub struct Miner {
    threads: usize,
    timeout: Option<Duration>,
    cancel: CancelToken,
}

impl Default for Miner {
    fn default() -> Self {
        Miner {
            threads: 1,
            timeout: None,
            cancel: CancelToken::new(),
        }
    }
}

impl Miner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &MinerConfig) -> Self {
        Miner::new()
            .with_threads(config.threads)
            .with_timeout(config.timeout_secs.map(Duration::from_secs))
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Handle for aborting searches started by this miner.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn seal(&self, header: &BlockHeader) -> SealOutcome<Seal> {
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let started = Instant::now();

        let outcome = if self.threads == 1 {
            self.seal_on_current_thread(header, deadline)
        } else {
            self.seal_parallel(header, deadline)
        };

        match &outcome {
            SealOutcome::Sealed(seal) => debug!(
                nonce = seal.nonce,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Seal found"
            ),
            SealOutcome::Cancelled => info!(
                difficulty = header.difficulty,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Sealing search cancelled"
            ),
        }
        outcome
    }

    fn should_stop(&self, deadline: Option<Instant>) -> bool {
        self.cancel.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn seal_on_current_thread(
        &self,
        header: &BlockHeader,
        deadline: Option<Instant>,
    ) -> SealOutcome<Seal> {
        for nonce in Nonces::new(1) {
            if nonce % POLL_INTERVAL == 1 && self.should_stop(deadline) {
                return SealOutcome::Cancelled;
            }
            if let Some(seal) = try_nonce(header, nonce) {
                return SealOutcome::Sealed(seal);
            }
        }
        SealOutcome::Cancelled
    }

    /// Workers repeatedly claim the next unsearched chunk so no part of the
    /// nonce space depends on a particular worker being scheduled.
    fn seal_parallel(&self, header: &BlockHeader, deadline: Option<Instant>) -> SealOutcome<Seal> {
        let next_chunk = AtomicU64::new(0);
        let found = AtomicBool::new(false);
        let best: Mutex<Option<Seal>> = Mutex::new(None);

        rayon::scope(|scope| {
            for _ in 0..self.threads {
                scope.spawn(|_| loop {
                    if found.load(Ordering::Relaxed) || self.should_stop(deadline) {
                        return;
                    }
                    let chunk = next_chunk.fetch_add(1, Ordering::Relaxed);
                    let Some(start) = chunk.checked_mul(CHUNK_SIZE).and_then(|s| s.checked_add(1))
                    else {
                        return;
                    };
                    let end = start.saturating_add(CHUNK_SIZE - 1);

                    match self.scan(header, Nonces::range(start, end), &found, deadline) {
                        Scan::Exhausted => {}
                        Scan::Stopped => return,
                        Scan::Found(seal) => {
                            let mut best = best.lock();
                            if best.map_or(true, |b| seal.nonce < b.nonce) {
                                *best = Some(seal);
                            }
                            found.store(true, Ordering::SeqCst);
                            return;
                        }
                    }
                });
            }
        });

        match best.into_inner() {
            Some(seal) => SealOutcome::Sealed(seal),
            None => SealOutcome::Cancelled,
        }
    }

    /// One worker's pass over a claimed chunk. Another worker's seal, the
    /// cancel token and the deadline are polled every `POLL_INTERVAL` nonces.
    fn scan(
        &self,
        header: &BlockHeader,
        nonces: Nonces,
        found: &AtomicBool,
        deadline: Option<Instant>,
    ) -> Scan {
        for nonce in nonces {
            if nonce % POLL_INTERVAL == 0
                && (found.load(Ordering::Relaxed) || self.should_stop(deadline))
            {
                return Scan::Stopped;
            }
            if let Some(seal) = try_nonce(header, nonce) {
                return Scan::Found(seal);
            }
        }
        Scan::Exhausted
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Scan {
    Found(Seal),
    Stopped,
    Exhausted,
}
