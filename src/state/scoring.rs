//! Pure scoring helpers: per-round errors, diff colour bands, response histograms,
//! standings and winner selection.

use crate::state::{game::Participant, state_machine::QuizPhase};

/// Outcome of scoring a single prediction against the correct answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundScore {
    /// Prediction that was scored (possibly the default midpoint).
    pub prediction: u8,
    /// True when the participant did not answer and the midpoint was used.
    pub defaulted: bool,
    /// Absolute error, lower is better.
    pub score: u32,
    /// Signed error, positive means overestimate.
    pub diff: i32,
}

/// Score `prediction` against `correct`.
pub fn score_prediction(prediction: u8, correct: u8, defaulted: bool) -> RoundScore {
    let diff = i32::from(prediction) - i32::from(correct);
    RoundScore {
        prediction,
        defaulted,
        score: diff.unsigned_abs(),
        diff,
    }
}

/// Colour band used to display a signed prediction error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffBand {
    /// Underestimated by more than 10 points.
    StrongNegative,
    /// Underestimated by 6 to 10 points.
    MediumNegative,
    /// Underestimated by 1 to 5 points.
    LightNegative,
    /// Exact prediction.
    Exact,
    /// Overestimated by 1 to 5 points.
    LightPositive,
    /// Overestimated by 6 to 10 points.
    MediumPositive,
    /// Overestimated by more than 10 points.
    StrongPositive,
}

impl DiffBand {
    /// Classify a signed error.
    pub fn of(diff: i32) -> Self {
        match diff {
            d if d < -10 => DiffBand::StrongNegative,
            d if d < -5 => DiffBand::MediumNegative,
            d if d < 0 => DiffBand::LightNegative,
            0 => DiffBand::Exact,
            d if d <= 5 => DiffBand::LightPositive,
            d if d <= 10 => DiffBand::MediumPositive,
            _ => DiffBand::StrongPositive,
        }
    }

    /// CSS colour associated with the band.
    pub fn color(&self) -> &'static str {
        match self {
            DiffBand::StrongNegative => "rgb(220, 38, 38)",
            DiffBand::MediumNegative => "rgb(239, 68, 68)",
            DiffBand::LightNegative => "rgb(252, 165, 165)",
            DiffBand::Exact => "rgb(0, 0, 0)",
            DiffBand::LightPositive => "rgb(134, 239, 172)",
            DiffBand::MediumPositive => "rgb(34, 197, 94)",
            DiffBand::StrongPositive => "rgb(22, 163, 74)",
        }
    }
}

/// Signed percentage label, e.g. `+15%` or `-15%`.
pub fn format_diff(diff: i32) -> String {
    if diff > 0 {
        format!("+{diff}%")
    } else {
        format!("{diff}%")
    }
}

/// Number of buckets in a response histogram.
pub const HISTOGRAM_BINS: usize = 10;

/// One bucket of the response distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramBin {
    /// Label such as `"40-49"` or `"90-100"`.
    pub label: String,
    /// Number of predictions falling in the bucket.
    pub count: usize,
    /// True for the bucket holding the correct answer.
    pub contains_answer: bool,
}

fn bin_index(value: u8) -> Option<usize> {
    match value {
        100 => Some(HISTOGRAM_BINS - 1),
        v if v < 100 => Some(usize::from(v / 10)),
        _ => None,
    }
}

/// Bucket predictions into ten-point bins; 100 lands in the last bin.
pub fn histogram(predictions: impl IntoIterator<Item = u8>, correct: u8) -> Vec<HistogramBin> {
    let mut bins: Vec<HistogramBin> = (0..HISTOGRAM_BINS)
        .map(|index| {
            let low = index * 10;
            let high = if index == HISTOGRAM_BINS - 1 { 100 } else { low + 9 };
            HistogramBin {
                label: format!("{low}-{high}"),
                count: 0,
                contains_answer: false,
            }
        })
        .collect();

    for prediction in predictions {
        if let Some(index) = bin_index(prediction) {
            bins[index].count += 1;
        }
    }

    if let Some(index) = bin_index(correct) {
        bins[index].contains_answer = true;
    }

    bins
}

/// Sort participants for display, lower is better.
///
/// During results the current round decides the order, otherwise the running total.
/// The sort is stable so ties keep registration order.
pub fn standings<'a>(
    participants: impl IntoIterator<Item = &'a Participant>,
    phase: QuizPhase,
) -> Vec<&'a Participant> {
    let mut sorted: Vec<&Participant> = participants.into_iter().collect();
    match phase {
        QuizPhase::Results { .. } => sorted.sort_by_key(|participant| participant.current_score),
        _ => sorted.sort_by_key(|participant| participant.total_score),
    }
    sorted
}

/// Winner of the quiz along with anyone sharing the same total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner<'a> {
    /// First registered participant holding the lowest total.
    pub participant: &'a Participant,
    /// Other participants with the same total, in registration order.
    pub tied_with: Vec<&'a Participant>,
}

/// Select the participant with the lowest total score, first registered on ties.
pub fn winner<'a>(participants: impl IntoIterator<Item = &'a Participant>) -> Option<Winner<'a>> {
    let participants: Vec<&Participant> = participants.into_iter().collect();
    let best = participants
        .iter()
        .copied()
        .reduce(|best, candidate| {
            if candidate.total_score < best.total_score {
                candidate
            } else {
                best
            }
        })?;

    let tied_with = participants
        .into_iter()
        .filter(|participant| {
            participant.id != best.id && participant.total_score == best.total_score
        })
        .collect();

    Some(Winner {
        participant: best,
        tied_with,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(name: &str, current: u32, total: u32) -> Participant {
        let mut participant = Participant::new(name.into());
        participant.current_score = current;
        participant.total_score = total;
        participant
    }

    #[test]
    fn over_and_under_estimates_score_equally_but_band_differently() {
        let under = score_prediction(65, 80, false);
        let over = score_prediction(95, 80, false);

        assert_eq!(under.score, over.score);
        assert_eq!(DiffBand::of(under.diff), DiffBand::StrongNegative);
        assert_eq!(DiffBand::of(over.diff), DiffBand::StrongPositive);
        assert_eq!(format_diff(under.diff), "-15%");
        assert_eq!(format_diff(over.diff), "+15%");
    }

    #[test]
    fn band_edges() {
        assert_eq!(DiffBand::of(-11), DiffBand::StrongNegative);
        assert_eq!(DiffBand::of(-10), DiffBand::MediumNegative);
        assert_eq!(DiffBand::of(-6), DiffBand::MediumNegative);
        assert_eq!(DiffBand::of(-5), DiffBand::LightNegative);
        assert_eq!(DiffBand::of(-1), DiffBand::LightNegative);
        assert_eq!(DiffBand::of(0), DiffBand::Exact);
        assert_eq!(DiffBand::of(5), DiffBand::LightPositive);
        assert_eq!(DiffBand::of(6), DiffBand::MediumPositive);
        assert_eq!(DiffBand::of(10), DiffBand::MediumPositive);
        assert_eq!(DiffBand::of(11), DiffBand::StrongPositive);
        assert_eq!(format_diff(0), "0%");
    }

    #[test]
    fn histogram_buckets_and_flags_answer() {
        let bins = histogram([0, 9, 10, 55, 99, 100], 43);

        assert_eq!(bins.len(), HISTOGRAM_BINS);
        assert_eq!(bins[0].label, "0-9");
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[1].count, 1);
        assert_eq!(bins[5].count, 1);
        assert_eq!(bins[9].label, "90-100");
        assert_eq!(bins[9].count, 2);
        assert!(bins[4].contains_answer);
        assert_eq!(bins.iter().filter(|bin| bin.contains_answer).count(), 1);
    }

    #[test]
    fn histogram_of_perfect_answer_flags_last_bin() {
        let bins = histogram(std::iter::empty(), 100);
        assert!(bins[9].contains_answer);
        assert!(bins.iter().all(|bin| bin.count == 0));
    }

    #[test]
    fn standings_follow_phase() {
        let a = participant("a", 20, 5);
        let b = participant("b", 3, 40);
        let c = participant("c", 3, 5);

        let by_round = standings([&a, &b, &c], QuizPhase::Results { number: 1 });
        let names: Vec<_> = by_round.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);

        let by_total = standings([&a, &b, &c], QuizPhase::Final);
        let names: Vec<_> = by_total.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "b"]);
    }

    #[test]
    fn winner_is_lowest_total_first_registered_on_ties() {
        let a = participant("a", 0, 30);
        let b = participant("b", 0, 12);
        let c = participant("c", 0, 12);

        let result = winner([&a, &b, &c]).unwrap();
        assert_eq!(result.participant.name, "b");
        assert_eq!(result.tied_with.len(), 1);
        assert_eq!(result.tied_with[0].name, "c");
    }

    #[test]
    fn no_winner_without_participants() {
        assert!(winner(std::iter::empty()).is_none());
    }
}
