//! Interactive question loop on stdin/stdout.

use std::io::Write as _;

use services::AppServices;
use split_core::model::VoteOption;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use ui::views::{DEFAULT_WIDTH, render_question, render_result};
use ui::{NextOutcome, QuestionScreen, QuestionVm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Vote(VoteOption),
    Next,
    Skip,
    Retry,
    Quit,
    Unknown,
}

impl Input {
    fn parse(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "a" | "1" => Input::Vote(VoteOption::A),
            "b" | "2" => Input::Vote(VoteOption::B),
            "n" | "" => Input::Next,
            "s" => Input::Skip,
            "r" => Input::Retry,
            "q" | "quit" | "exit" => Input::Quit,
            _ => Input::Unknown,
        }
    }
}

/// # Errors
///
/// Returns an error if registration fails or stdin cannot be read.
pub async fn run(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let vm = QuestionVm::open(services).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let screen = vm.screen();
        println!("\n{}", render_question(&screen));
        if screen == QuestionScreen::Empty {
            return Ok(());
        }

        let Some(input) = prompt(&mut lines).await? else {
            vm.leave();
            return Ok(());
        };

        match (input, &screen) {
            (Input::Quit, _) => {
                vm.leave();
                return Ok(());
            }
            (Input::Retry, QuestionScreen::Error(_)) => vm.retry().await,
            (Input::Vote(option), QuestionScreen::Ready(_)) => match vm.vote(option).await {
                Ok(result) => {
                    println!("\n{}", render_result(&result, DEFAULT_WIDTH));
                    if !step(&vm).await {
                        return Ok(());
                    }
                }
                Err(err) => println!("{}", err.message()),
            },
            (Input::Skip | Input::Next, QuestionScreen::Ready(_)) => {
                if !step(&vm).await {
                    return Ok(());
                }
            }
            _ => println!("[a]/[b] vote  [s] skip  [n] next  [r] retry  [q] quit"),
        }
    }
}

/// Move on to the next question. Returns `false` when the session is over.
async fn step(vm: &QuestionVm) -> bool {
    match vm.next().await {
        NextOutcome::Continue => true,
        NextOutcome::OutOfQuestions => {
            println!("\nThat's every question for now. Check back soon!");
            false
        }
        NextOutcome::TryLater => {
            println!("Couldn't load the next question. Press [n] to try again.");
            true
        }
    }
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>) -> std::io::Result<Option<Input>> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?.map(|line| Input::parse(&line)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_loosely() {
        assert_eq!(Input::parse(" A \n"), Input::Vote(VoteOption::A));
        assert_eq!(Input::parse("2"), Input::Vote(VoteOption::B));
        assert_eq!(Input::parse(""), Input::Next);
        assert_eq!(Input::parse("QUIT"), Input::Quit);
        assert_eq!(Input::parse("maybe"), Input::Unknown);
    }
}
