use crate::error::{Error, Result};
use crate::session::{Cell, Grid};
use crate::util::{mean, round_to};

/// One accepted response. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialRecord {
    pub sequence_number: u32,
    pub response_time_ms: u64,
    pub target_cell: Cell,
    pub responded_cell: Cell,
    pub manhattan_error: u32,
}

impl TrialRecord {
    pub fn is_correct(&self) -> bool {
        self.target_cell == self.responded_cell
    }
}

/// End-of-session statistics derived from the full record list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    pub average_response_time_ms: u64,
    pub accuracy_rate_percent: f64,
    pub average_manhattan_error: f64,
}

pub fn manhattan_error(grid: &Grid, target: Cell, response: Cell) -> u32 {
    let (target_row, target_col) = grid.position(target);
    let (response_row, response_col) = grid.position(response);
    target_row.abs_diff(response_row) + target_col.abs_diff(response_col)
}

pub fn score(
    grid: &Grid,
    sequence_number: u32,
    response_time_ms: u64,
    target_cell: Cell,
    responded_cell: Cell,
) -> TrialRecord {
    TrialRecord {
        sequence_number,
        response_time_ms,
        target_cell,
        responded_cell,
        manhattan_error: manhattan_error(grid, target_cell, responded_cell),
    }
}

/// Summarize a non-empty record list.
pub fn summarize(records: &[TrialRecord]) -> Result<SessionSummary> {
    let response_times: Vec<f64> = records.iter().map(|r| r.response_time_ms as f64).collect();
    let correct: Vec<f64> = records
        .iter()
        .map(|r| if r.is_correct() { 1.0 } else { 0.0 })
        .collect();
    let errors: Vec<f64> = records.iter().map(|r| r.manhattan_error as f64).collect();

    let average_response_time = mean(&response_times).ok_or(Error::EmptyRecords)?;
    let accuracy = mean(&correct).ok_or(Error::EmptyRecords)?;
    let average_error = mean(&errors).ok_or(Error::EmptyRecords)?;

    Ok(SessionSummary {
        average_response_time_ms: average_response_time.round() as u64,
        accuracy_rate_percent: round_to(accuracy * 100.0, 2),
        average_manhattan_error: round_to(average_error, 2),
    })
}

/// Append-only record list for one session.
#[derive(Debug, Clone)]
pub struct Scorer {
    grid: Grid,
    records: Vec<TrialRecord>,
}

impl Scorer {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            records: Vec::new(),
        }
    }

    /// Score a response and append the record.
    pub fn record(
        &mut self,
        sequence_number: u32,
        response_time_ms: u64,
        target_cell: Cell,
        responded_cell: Cell,
    ) -> TrialRecord {
        let record = score(
            &self.grid,
            sequence_number,
            response_time_ms,
            target_cell,
            responded_cell,
        );
        self.records.push(record);
        record
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn summarize(&self) -> Result<SessionSummary> {
        summarize(&self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn record(rt: u64, target: Cell, responded: Cell) -> TrialRecord {
        score(&Grid::default(), 1, rt, target, responded)
    }

    #[test]
    fn manhattan_error_on_default_grid() {
        let grid = Grid::default();
        assert_eq!(manhattan_error(&grid, 1, 1), 0);
        assert_eq!(manhattan_error(&grid, 1, 2), 1);
        assert_eq!(manhattan_error(&grid, 1, 8), 1);
        assert_eq!(manhattan_error(&grid, 1, 35), 10);
        assert_eq!(manhattan_error(&grid, 35, 1), 10);
    }

    #[test]
    fn row_wrap_is_not_adjacent() {
        // 7 ends row 0, 8 starts row 1
        assert_eq!(manhattan_error(&Grid::default(), 7, 8), 7);
    }

    #[test]
    fn score_fills_every_field() {
        let r = score(&Grid::default(), 4, 812, 10, 18);
        assert_eq!(
            r,
            TrialRecord {
                sequence_number: 4,
                response_time_ms: 812,
                target_cell: 10,
                responded_cell: 18,
                manhattan_error: 2,
            }
        );
        assert!(!r.is_correct());
    }

    #[test]
    fn summary_of_all_correct_records() {
        let records = [record(100, 3, 3), record(200, 9, 9), record(300, 20, 20)];
        let summary = summarize(&records).unwrap();
        assert_eq!(summary.average_response_time_ms, 200);
        assert_eq!(summary.accuracy_rate_percent, 100.0);
        assert_eq!(summary.average_manhattan_error, 0.0);
    }

    #[test]
    fn summary_rounds_partial_accuracy_and_error() {
        let records = [record(101, 1, 1), record(100, 1, 2), record(100, 1, 35)];
        let summary = summarize(&records).unwrap();
        assert_eq!(summary.average_response_time_ms, 100);
        assert_eq!(summary.accuracy_rate_percent, 33.33);
        assert_eq!(summary.average_manhattan_error, 3.67);
    }

    #[test]
    fn summary_rounds_half_up_response_time() {
        let records = [record(100, 1, 1), record(101, 1, 1)];
        assert_eq!(summarize(&records).unwrap().average_response_time_ms, 101);
    }

    #[test]
    fn empty_records_are_rejected() {
        assert_matches!(summarize(&[]), Err(Error::EmptyRecords));
        assert_matches!(Scorer::new(Grid::default()).summarize(), Err(Error::EmptyRecords));
    }

    #[test]
    fn scorer_appends_in_order() {
        let mut scorer = Scorer::new(Grid::default());
        scorer.record(1, 500, 5, 5);
        scorer.record(2, 700, 6, 13);
        let seqs: Vec<u32> = scorer.records().iter().map(|r| r.sequence_number).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert_eq!(scorer.records()[1].manhattan_error, 1);
    }
}
