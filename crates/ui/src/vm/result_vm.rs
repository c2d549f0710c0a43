use services::VoteOutcome;
use split_core::model::{Question, VoteOption};

/// One side of the results card.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionResultVm {
    pub text: String,
    pub percent: f64,
    pub percent_str: String,
    pub votes: u64,
    pub selected: bool,
}

/// Results card shown after a vote.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultVm {
    pub question_text: String,
    pub option_a: OptionResultVm,
    pub option_b: OptionResultVm,
    pub total_str: String,
    pub streak: u32,
    pub streak_str: Option<String>,
}

impl ResultVm {
    #[must_use]
    pub fn new(question: &Question, outcome: &VoteOutcome) -> Self {
        let side = |option: VoteOption| {
            let percent = outcome.result.percentage_for(option);
            OptionResultVm {
                text: question.option_text(option).to_string(),
                percent,
                percent_str: format!("{percent:.0}%"),
                votes: outcome.result.votes_for(option),
                selected: outcome.selected == option,
            }
        };

        Self {
            question_text: question.question_text.clone(),
            option_a: side(VoteOption::A),
            option_b: side(VoteOption::B),
            total_str: votes_label(outcome.result.total_votes),
            streak: outcome.streak,
            streak_str: streak_label(outcome.streak),
        }
    }

    /// Share of voters who picked the same option as this device.
    #[must_use]
    pub fn agreement(&self) -> f64 {
        if self.option_a.selected {
            self.option_a.percent
        } else {
            self.option_b.percent
        }
    }
}

/// Columns a percentage fills in a bar `width` columns wide.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn bar_width(percent: f64, width: usize) -> usize {
    if !percent.is_finite() {
        return 0;
    }
    let share = percent.clamp(0.0, 100.0) / 100.0;
    ((share * width as f64).round() as usize).min(width)
}

fn votes_label(total: u64) -> String {
    match total {
        1 => "1 vote".to_string(),
        n => format!("{n} votes"),
    }
}

fn streak_label(streak: u32) -> Option<String> {
    (streak >= 2).then(|| format!("{streak} in a row"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use split_core::model::{QuestionId, VoteResult};

    fn outcome(a: u64, b: u64, selected: VoteOption, streak: u32) -> VoteOutcome {
        VoteOutcome {
            result: VoteResult::from_counts(QuestionId::new("q1").unwrap(), a, b),
            selected,
            streak,
        }
    }

    fn question() -> Question {
        Question::new(QuestionId::new("q1").unwrap(), "Fly or swim?", "Fly", "Swim")
    }

    #[test]
    fn maps_counts_to_labels() {
        let vm = ResultVm::new(&question(), &outcome(2, 1, VoteOption::B, 1));

        assert_eq!(vm.option_a.text, "Fly");
        assert_eq!(vm.option_a.percent_str, "67%");
        assert_eq!(vm.option_b.percent_str, "33%");
        assert!(vm.option_b.selected);
        assert!(!vm.option_a.selected);
        assert_eq!(vm.total_str, "3 votes");
        assert_eq!(vm.agreement(), 33.0);
        assert_eq!(vm.streak_str, None);
    }

    #[test]
    fn first_vote_reads_singular() {
        let vm = ResultVm::new(&question(), &outcome(1, 0, VoteOption::A, 4));
        assert_eq!(vm.total_str, "1 vote");
        assert_eq!(vm.option_a.percent_str, "100%");
        assert_eq!(vm.streak_str.as_deref(), Some("4 in a row"));
    }

    #[test]
    fn bar_width_is_bounded() {
        assert_eq!(bar_width(50.0, 20), 10);
        assert_eq!(bar_width(0.0, 20), 0);
        assert_eq!(bar_width(140.0, 20), 20);
        assert_eq!(bar_width(-3.0, 20), 0);
        assert_eq!(bar_width(f64::NAN, 20), 0);
    }
}
