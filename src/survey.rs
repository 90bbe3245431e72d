//! Post-session questionnaire: three Likert items and a NASA-TLX workload assessment
//! (six subscale ratings plus fifteen pairwise comparisons that weight the subscales).

use crate::error::{Error, Result};
use crate::export::{key_value_row, RowSet};

pub const SCALE: std::ops::RangeInclusive<u8> = 1..=7;

/// Likert items as (export key, prompt).
pub const LIKERT_ITEMS: [(&str, &str); 3] = [
    (
        "対象の分かりやすさ",
        "I could tell intuitively which target was being indicated",
    ),
    (
        "回答への確信度",
        "I was confident that my answers were correct",
    ),
    (
        "視認性",
        "The pointing cue was easy to see regardless of background or distance",
    ),
];

/// NASA-TLX subscales as (export key, prompt).
pub const TLX_FACTORS: [(&str, &str); 6] = [
    ("精神的負荷", "Mental demand"),
    ("身体的負荷", "Physical demand"),
    ("時間的切迫感", "Temporal demand"),
    ("パフォーマンス", "Performance"),
    ("努力", "Effort"),
    ("フラストレーション", "Frustration"),
];

/// Every unordered pair of subscales, in presentation order.
pub const PAIRWISE_COMBINATIONS: [(usize, usize); 15] = [
    (0, 1),
    (0, 2),
    (0, 3),
    (0, 4),
    (0, 5),
    (1, 2),
    (1, 3),
    (1, 4),
    (1, 5),
    (2, 3),
    (2, 4),
    (2, 5),
    (3, 4),
    (3, 5),
    (4, 5),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Likert,
    Ratings,
    Pairwise,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairChoice {
    First,
    Second,
}

#[derive(Debug, Clone)]
pub struct SurveyForm {
    section: Section,
    likert: [Option<u8>; 3],
    ratings: [Option<u8>; 6],
    pairwise: [Option<PairChoice>; 15],
    pair_index: usize,
}

impl Default for SurveyForm {
    fn default() -> Self {
        Self::new()
    }
}

impl SurveyForm {
    pub fn new() -> Self {
        Self {
            section: Section::Likert,
            likert: [None; 3],
            ratings: [None; 6],
            pairwise: [None; 15],
            pair_index: 0,
        }
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn likert(&self) -> &[Option<u8>; 3] {
        &self.likert
    }

    pub fn ratings(&self) -> &[Option<u8>; 6] {
        &self.ratings
    }

    pub fn pair_index(&self) -> usize {
        self.pair_index
    }

    /// The two subscales being compared and the current pick, if any.
    pub fn current_pair(&self) -> (usize, usize, Option<PairChoice>) {
        let (a, b) = PAIRWISE_COMBINATIONS[self.pair_index];
        (a, b, self.pairwise[self.pair_index])
    }

    pub fn set_likert(&mut self, item: usize, value: u8) -> Result<()> {
        *answer_slot(&mut self.likert, item)? = Some(check_scale(value)?);
        Ok(())
    }

    pub fn set_rating(&mut self, factor: usize, value: u8) -> Result<()> {
        *answer_slot(&mut self.ratings, factor)? = Some(check_scale(value)?);
        Ok(())
    }

    pub fn choose(&mut self, choice: PairChoice) {
        self.pairwise[self.pair_index] = Some(choice);
    }

    /// Leave the Likert or ratings section once every item is answered.
    pub fn next_section(&mut self) -> Result<Section> {
        self.section = match self.section {
            Section::Likert => {
                require_all(&self.likert, "likert items")?;
                Section::Ratings
            }
            Section::Ratings => {
                require_all(&self.ratings, "workload ratings")?;
                Section::Pairwise
            }
            other => other,
        };
        Ok(self.section)
    }

    /// Advance to the next comparison; the last one completes the form.
    pub fn next_pair(&mut self) -> Result<Section> {
        if self.section != Section::Pairwise {
            return Ok(self.section);
        }
        if self.pairwise[self.pair_index].is_none() {
            return Err(Error::IncompleteSurvey(format!(
                "comparison {} has no choice",
                self.pair_index + 1
            )));
        }
        if self.pair_index + 1 < PAIRWISE_COMBINATIONS.len() {
            self.pair_index += 1;
        } else {
            self.section = Section::Complete;
        }
        Ok(self.section)
    }

    pub fn previous_pair(&mut self) {
        if self.section == Section::Pairwise && self.pair_index > 0 {
            self.pair_index -= 1;
        }
    }

    /// How many times each subscale won its comparisons.
    pub fn weights(&self) -> [u8; 6] {
        let mut weights = [0; 6];
        for (choice, (a, b)) in self.pairwise.iter().zip(PAIRWISE_COMBINATIONS) {
            match choice {
                Some(PairChoice::First) => weights[a] += 1,
                Some(PairChoice::Second) => weights[b] += 1,
                None => {}
            }
        }
        weights
    }

    /// Flatten a completed form into one export row.
    pub fn to_row(&self) -> Result<RowSet> {
        if self.section != Section::Complete {
            return Err(Error::IncompleteSurvey(format!(
                "form is still in the {:?} section",
                self.section
            )));
        }

        let answers = LIKERT_ITEMS
            .iter()
            .zip(self.likert)
            .chain(TLX_FACTORS.iter().zip(self.ratings))
            .map(|((key, _), value)| {
                (
                    key.to_string(),
                    value.map(|v| v.to_string()).unwrap_or_default(),
                )
            });
        let weights = TLX_FACTORS
            .iter()
            .zip(self.weights())
            .map(|((key, _), weight)| (format!("{}_重み", key), weight.to_string()));

        Ok(key_value_row(answers.chain(weights)))
    }
}

fn answer_slot(answers: &mut [Option<u8>], index: usize) -> Result<&mut Option<u8>> {
    let count = answers.len();
    answers
        .get_mut(index)
        .ok_or(Error::NoSuchSurveyItem { index, count })
}

fn check_scale(value: u8) -> Result<u8> {
    if SCALE.contains(&value) {
        Ok(value)
    } else {
        Err(Error::RatingOutOfRange { value })
    }
}

fn require_all<T>(answers: &[Option<T>], what: &str) -> Result<()> {
    let missing = answers.iter().filter(|a| a.is_none()).count();
    if missing > 0 {
        return Err(Error::IncompleteSurvey(format!(
            "{} of the {} are unanswered",
            missing, what
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn filled_until_pairwise() -> SurveyForm {
        let mut form = SurveyForm::new();
        for i in 0..3 {
            form.set_likert(i, 5).unwrap();
        }
        form.next_section().unwrap();
        for i in 0..6 {
            form.set_rating(i, i as u8 + 1).unwrap();
        }
        form.next_section().unwrap();
        form
    }

    #[test]
    fn sections_require_every_answer() {
        let mut form = SurveyForm::new();
        form.set_likert(0, 4).unwrap();
        assert_matches!(form.next_section(), Err(Error::IncompleteSurvey(_)));
        assert_eq!(form.section(), Section::Likert);

        form.set_likert(1, 4).unwrap();
        form.set_likert(2, 4).unwrap();
        assert_eq!(form.next_section().unwrap(), Section::Ratings);
        assert_matches!(form.next_section(), Err(Error::IncompleteSurvey(_)));
    }

    #[test]
    fn ratings_outside_scale_are_rejected() {
        let mut form = SurveyForm::new();
        assert_matches!(form.set_likert(0, 0), Err(Error::RatingOutOfRange { value: 0 }));
        assert_matches!(form.set_rating(2, 8), Err(Error::RatingOutOfRange { value: 8 }));
    }

    #[test]
    fn unknown_items_are_rejected_without_touching_answers() {
        let mut form = SurveyForm::new();
        assert_matches!(
            form.set_likert(3, 4),
            Err(Error::NoSuchSurveyItem { index: 3, count: 3 })
        );
        assert_matches!(
            form.set_rating(usize::MAX, 4),
            Err(Error::NoSuchSurveyItem { count: 6, .. })
        );
        assert_eq!(form.likert(), &[None; 3]);
        assert_eq!(form.ratings(), &[None; 6]);
    }

    #[test]
    fn pairwise_needs_a_choice_before_advancing() {
        let mut form = filled_until_pairwise();
        assert_eq!(form.section(), Section::Pairwise);
        assert_matches!(form.next_pair(), Err(Error::IncompleteSurvey(_)));

        form.choose(PairChoice::Second);
        form.next_pair().unwrap();
        assert_eq!(form.pair_index(), 1);
        form.previous_pair();
        assert_eq!(form.current_pair(), (0, 1, Some(PairChoice::Second)));
    }

    #[test]
    fn weights_count_wins_across_fifteen_pairs() {
        let mut form = filled_until_pairwise();
        for _ in 0..15 {
            form.choose(PairChoice::First);
            form.next_pair().unwrap();
        }
        assert_eq!(form.section(), Section::Complete);
        assert_eq!(form.weights(), [5, 4, 3, 2, 1, 0]);
        assert_eq!(form.weights().iter().map(|w| *w as u32).sum::<u32>(), 15);
    }

    #[test]
    fn completed_form_flattens_to_one_row() {
        let mut form = filled_until_pairwise();
        for _ in 0..15 {
            form.choose(PairChoice::Second);
            form.next_pair().unwrap();
        }
        let rows = form.to_row().unwrap();
        assert_eq!(rows.headers().len(), 15);
        assert_eq!(rows.headers()[0], "対象の分かりやすさ");
        assert_eq!(rows.headers()[9], "精神的負荷_重み");
        assert_eq!(rows.rows().len(), 1);
        assert_eq!(rows.rows()[0][3], "1");
        assert_eq!(rows.rows()[0][14], "5");
    }

    #[test]
    fn incomplete_form_cannot_be_exported() {
        assert_matches!(SurveyForm::new().to_row(), Err(Error::IncompleteSurvey(_)));
    }
}
