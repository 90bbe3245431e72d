use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A grid cell, numbered row-major from 1.
pub type Cell = u32;

pub const DEFAULT_GRID_ROWS: u32 = 5;
pub const DEFAULT_GRID_COLS: u32 = 7;
/// Largest accepted row or column count. Every cell is drawn each frame.
pub const MAX_GRID_SIDE: u32 = 32;

/// How a session runs and how its results are labelled.
///
/// `Display` yields the token that feeds seed derivation, so these strings are part of the
/// reproducibility contract and must not change.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// Unbounded familiarization loop, never exported.
    Practice,
    /// Timed session with the existing pointing method.
    Existing,
    /// Timed session with the proposed pointing method.
    Proposed,
}

impl Mode {
    pub fn is_practice(self) -> bool {
        matches!(self, Mode::Practice)
    }

    /// Label used as the first segment of exported file names.
    pub fn file_label(self) -> &'static str {
        match self {
            Mode::Practice => "練習",
            Mode::Existing => "本番-既存",
            Mode::Proposed => "本番-提案",
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "practice" => Ok(Mode::Practice),
            "existing" => Ok(Mode::Existing),
            "proposed" => Ok(Mode::Proposed),
            other => Err(Error::UnknownMode(other.to_string())),
        }
    }
}

/// Grid geometry. Cells are laid out row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub rows: u32,
    pub cols: u32,
}

impl Grid {
    pub fn new(rows: u32, cols: u32) -> Result<Self> {
        let side = 1..=MAX_GRID_SIDE;
        if !side.contains(&rows) || !side.contains(&cols) {
            return Err(Error::InvalidGrid { rows, cols });
        }
        Ok(Self { rows, cols })
    }

    /// Saturates for unvalidated literals; grids from [`Grid::new`] never get near `u32::MAX`.
    pub fn total_cells(&self) -> u32 {
        self.rows.saturating_mul(self.cols)
    }

    pub fn contains(&self, cell: Cell) -> bool {
        (1..=self.total_cells()).contains(&cell)
    }

    pub fn check(&self, cell: Cell) -> Result<Cell> {
        if self.contains(cell) {
            Ok(cell)
        } else {
            Err(Error::CellOutOfRange {
                cell,
                total: self.total_cells(),
            })
        }
    }

    /// Zero-based (row, col) of a cell.
    pub fn position(&self, cell: Cell) -> (u32, u32) {
        let offset = cell.saturating_sub(1);
        (offset / self.cols, offset % self.cols)
    }

    pub fn cell_at(&self, row: u32, col: u32) -> Cell {
        row * self.cols + col + 1
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            rows: DEFAULT_GRID_ROWS,
            cols: DEFAULT_GRID_COLS,
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Immutable parameters of one session. Construction validates every field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    participant_id: u32,
    mode: Mode,
    grid: Grid,
}

impl SessionConfig {
    pub fn new(participant_id: i64, mode: Mode, grid: Grid) -> Result<Self> {
        let participant_id = u32::try_from(participant_id)
            .ok()
            .filter(|id| *id > 0)
            .ok_or(Error::InvalidParticipantId(participant_id))?;
        Ok(Self {
            participant_id,
            mode,
            grid: Grid::new(grid.rows, grid.cols)?,
        })
    }

    pub fn participant_id(&self) -> u32 {
        self.participant_id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn total_cells(&self) -> u32 {
        self.grid.total_cells()
    }
}
