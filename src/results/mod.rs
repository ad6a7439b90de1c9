use crate::models::Poll;

/// Display share for one option, derived from the current counts.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionShare {
    pub label: String,
    pub votes: u64,
    pub percent: f64,
}

/// Derives a percentage per option from the poll's current counts, rounded
/// to one decimal place. With no votes at all every option is 0.0, never
/// NaN, so the renderer stays well-defined.
///
/// Pure; recomputed from the latest view on every refresh and never
/// accumulated separately, so the displayed shares cannot drift from the
/// counts.
pub fn percentages(poll: &Poll) -> Vec<OptionShare> {
    let total = poll.total_votes();

    poll.options
        .iter()
        .map(|option| {
            let percent = if total == 0 {
                0.0
            } else {
                round_tenth(option.votes as f64 * 100.0 / total as f64)
            };
            OptionShare {
                label: option.label.clone(),
                votes: option.votes,
                percent,
            }
        })
        .collect()
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Formats the current results as text for the terminal renderer.
pub fn format_results(poll: &Poll) -> String {
    let shares = percentages(poll);

    let mut summary = format!("{}\n", poll.question);
    for share in &shares {
        let label = if share.label.chars().count() > 24 {
            let truncated: String = share.label.chars().take(21).collect();
            format!("{}...", truncated)
        } else {
            share.label.clone()
        };
        // 40-column bar, one step per 2.5%
        let bar = "#".repeat((share.percent / 2.5).round() as usize);
        summary.push_str(&format!(
            "  {:<24} {:>4} votes ({:>5.1}%) {}\n",
            label, share.votes, share.percent, bar
        ));
    }
    summary.push_str(&format!("{} votes total.", poll.total_votes()));
    summary
}
