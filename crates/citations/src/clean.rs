use std::sync::OnceLock;

use regex::Regex;

fn blank_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("valid blank-run pattern"))
}

/// Collapse runs of three or more newlines to a single blank line and trim
/// the ends, leaving markdown structure otherwise intact.
pub fn clean_message(text: &str) -> String {
    blank_runs().replace_all(text, "\n\n").trim().to_owned()
}
