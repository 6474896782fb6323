//! Visit id generation.

use rand::rngs::ThreadRng;
use rand::Rng;

const VISIT_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of generated visit ids.
pub const VISIT_ID_LEN: usize = 6;

/// Source of ids for visits created interactively.
pub trait VisitIdGenerator {
    fn next_visit_id(&mut self) -> String;
}

/// Random 6-character `A-Z0-9` tokens.
pub struct RandomVisitIds<R: Rng = ThreadRng> {
    rng: R,
}

impl RandomVisitIds<ThreadRng> {
    pub fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }
}

impl Default for RandomVisitIds<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RandomVisitIds<R> {
    /// Draw from a caller-supplied RNG (seeded RNGs give reproducible ids).
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> VisitIdGenerator for RandomVisitIds<R> {
    fn next_visit_id(&mut self) -> String {
        (0..VISIT_ID_LEN)
            .map(|_| VISIT_ID_ALPHABET[self.rng.gen_range(0..VISIT_ID_ALPHABET.len())] as char)
            .collect()
    }
}

/// Deterministic ids (`{prefix}1`, `{prefix}2`, ...).
#[derive(Debug, Clone)]
pub struct SequentialVisitIds {
    prefix: String,
    next: u64,
}

impl SequentialVisitIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl VisitIdGenerator for SequentialVisitIds {
    fn next_visit_id(&mut self) -> String {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}
