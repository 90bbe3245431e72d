//! Reproducible stimulus ordering.
//!
//! A participant id and mode token are hashed into a seed, the seed drives a small linear
//! congruential generator, and the generator drives a Fisher-Yates shuffle of `1..=total`.
//! The arithmetic is fixed so that orders produced by earlier versions of the experiment
//! can be regenerated exactly from the ids stored in their CSV files.

use std::ops::Index;

use crate::error::{Error, Result};
use crate::session::{Cell, Mode, SessionConfig, MAX_GRID_SIDE};

const LCG_MULTIPLIER: u64 = 9301;
const LCG_INCREMENT: u64 = 49297;
const LCG_MODULUS: u64 = 233_280;

/// Hash of `"{participant_id}_{mode}"` over UTF-16 code units with 32-bit wraparound.
pub fn derive_seed(participant_id: u32, mode: &str) -> u64 {
    let seed_string = format!("{}_{}", participant_id, mode);
    let hash = seed_string
        .encode_utf16()
        .fold(0_i32, |seed, unit| seed.wrapping_mul(31).wrapping_add(unit as i32));
    (hash as i64).unsigned_abs()
}

/// The legacy `state * 9301 + 49297 mod 233280` generator.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    state: u64,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = (self.state * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS;
        self.state as f64 / LCG_MODULUS as f64
    }
}

/// A permutation of `1..=total_cells`, fixed for the life of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialOrder(Vec<Cell>);

impl TrialOrder {
    pub fn for_session(config: &SessionConfig) -> Self {
        generate(config.participant_id(), config.mode(), config.total_cells())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Cell> {
        self.0.get(index).copied()
    }

    pub fn as_slice(&self) -> &[Cell] {
        &self.0
    }
}

impl Index<usize> for TrialOrder {
    type Output = Cell;

    fn index(&self, index: usize) -> &Cell {
        &self.0[index]
    }
}

/// Generate the order for a validated participant and mode.
pub fn generate(participant_id: u32, mode: Mode, total_cells: u32) -> TrialOrder {
    shuffle(derive_seed(participant_id, &mode.to_string()), total_cells)
}

/// Same as [`generate`] but for raw inputs, rejecting the ones a session would never accept.
pub fn try_generate(participant_id: i64, mode: &str, total_cells: u32) -> Result<TrialOrder> {
    let participant_id = u32::try_from(participant_id)
        .ok()
        .filter(|id| *id > 0)
        .ok_or(Error::InvalidParticipantId(participant_id))?;
    let mode: Mode = mode.parse()?;
    if total_cells == 0 || total_cells > MAX_GRID_SIDE * MAX_GRID_SIDE {
        return Err(Error::InvalidGrid {
            rows: 1,
            cols: total_cells,
        });
    }
    Ok(generate(participant_id, mode, total_cells))
}

fn shuffle(seed: u64, total_cells: u32) -> TrialOrder {
    let mut rng = SeededRandom::new(seed);
    let mut order: Vec<Cell> = (1..=total_cells).collect();

    for i in (1..order.len()).rev() {
        let j = (rng.next_f64() * (i + 1) as f64).floor() as usize;
        order.swap(i, j);
    }

    tracing::debug!(seed, total_cells, "generated trial order");
    TrialOrder(order)
}
