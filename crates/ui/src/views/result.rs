use std::fmt::Write as _;

use crate::vm::{OptionResultVm, ResultVm, bar_width};

#[must_use]
pub fn render_result(result: &ResultVm, width: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", result.question_text);
    render_side(&mut out, &result.option_a, width);
    render_side(&mut out, &result.option_b, width);
    out.push_str(&result.total_str);
    if let Some(streak) = &result.streak_str {
        let _ = write!(out, "  ({streak})");
    }
    out
}

fn render_side(out: &mut String, side: &OptionResultVm, width: usize) {
    let filled = bar_width(side.percent, width);
    let marker = if side.selected { '>' } else { ' ' };
    let _ = writeln!(
        out,
        "{marker} {bar}{pad} {pct:>4}  {text}",
        bar = "#".repeat(filled),
        pad = ".".repeat(width - filled),
        pct = side.percent_str,
        text = side.text,
    );
}
