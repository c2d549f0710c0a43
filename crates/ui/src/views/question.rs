use crate::vm::{QuestionCardVm, QuestionScreen};

#[must_use]
pub fn render_question(screen: &QuestionScreen) -> String {
    match screen {
        QuestionScreen::Loading => "Loading...".to_string(),
        QuestionScreen::Error(message) => format!("Error: {message}\n[r] retry  [q] quit"),
        QuestionScreen::Empty => "You've answered every question. Check back soon!".to_string(),
        QuestionScreen::Ready(card) => render_card(card),
    }
}

fn render_card(card: &QuestionCardVm) -> String {
    format!(
        "#{number}  {prompt}\n  [a] {a}\n  [b] {b}",
        number = card.number,
        prompt = card.prompt,
        a = card.option_a,
        b = card.option_b,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use split_core::model::QuestionId;

    #[test]
    fn ready_card_lists_both_options() {
        let screen = QuestionScreen::Ready(QuestionCardVm {
            question_id: QuestionId::new("q1").unwrap(),
            prompt: "Would you rather fly or swim?".into(),
            option_a: "Fly".into(),
            option_b: "Swim".into(),
            number: 3,
            opacity: 1.0,
        });

        assert_eq!(
            render_question(&screen),
            "#3  Would you rather fly or swim?\n  [a] Fly\n  [b] Swim"
        );
    }

    #[test]
    fn error_screen_offers_retry() {
        let text = render_question(&QuestionScreen::Error("failed to load question".into()));
        assert!(text.starts_with("Error: failed to load question"));
        assert!(text.contains("[r] retry"));
    }
}
