use crate::plan::plan_model::{FillValue, OptionMatch, OptionMatchMode};

/// Values that mean "checked" for a checkbox, compared case-insensitively.
const TRUTHY: [&str; 4] = ["1", "true", "yes", "on"];

/// The matchable texts of one choice (option or group member).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Choice {
    pub text: String,
    pub label: Option<String>,
    pub value: Option<String>,
}

impl Choice {
    fn texts(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.text.as_str())
            .chain(self.label.as_deref())
            .chain(self.value.as_deref())
    }

    fn matches_exact(&self, needle: &str) -> bool {
        self.texts().any(|t| fold(t) == needle)
    }

    fn matches_contains(&self, needle: &str) -> bool {
        !needle.is_empty() && self.texts().any(|t| fold(t).contains(needle))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rung {
    Exact,
    Contains,
    Index,
}

fn ladder(mode: OptionMatchMode) -> &'static [Rung] {
    match mode {
        OptionMatchMode::Exact => &[Rung::Exact, Rung::Contains, Rung::Index],
        OptionMatchMode::Contains => &[Rung::Contains, Rung::Index],
        OptionMatchMode::Index => &[Rung::Index],
    }
}

fn fold(text: &str) -> String {
    text.trim().to_lowercase()
}

fn needles(option_match: &OptionMatch, value: &FillValue) -> Vec<String> {
    match option_match.expect_text.as_deref() {
        Some(expect) if !expect.trim().is_empty() => vec![fold(expect)],
        _ => raw_needles(value),
    }
}

fn raw_needles(value: &FillValue) -> Vec<String> {
    value
        .items()
        .into_iter()
        .map(fold)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Pick the choice an entry refers to.
///
/// With an `optionMatch`, matching starts at the declared mode and
/// descends exact, contains, index. If that yields nothing (or there is
/// no `optionMatch`), the raw value is matched exactly, then by substring.
pub fn resolve_choice(
    choices: &[Choice],
    option_match: Option<&OptionMatch>,
    value: &FillValue,
) -> Option<usize> {
    if let Some(om) = option_match {
        let wanted = needles(om, value);
        for rung in ladder(om.mode) {
            let hit = match rung {
                Rung::Exact => find(choices, &wanted, Choice::matches_exact),
                Rung::Contains => find(choices, &wanted, Choice::matches_contains),
                Rung::Index => om
                    .index
                    .and_then(|i| usize::try_from(i).ok())
                    .filter(|i| *i < choices.len()),
            };
            if hit.is_some() {
                return hit;
            }
        }
    }

    let raw = raw_needles(value);
    find(choices, &raw, Choice::matches_exact).or_else(|| find(choices, &raw, Choice::matches_contains))
}

fn find(choices: &[Choice], needles: &[String], pred: fn(&Choice, &str) -> bool) -> Option<usize> {
    needles
        .iter()
        .find_map(|n| choices.iter().position(|c| pred(c, n)))
}

/// Desired checked state of a single checkbox.
pub fn checkbox_state(own: &Choice, option_match: Option<&OptionMatch>, value: &FillValue) -> bool {
    if let Some(om) = option_match {
        match om.mode {
            OptionMatchMode::Index => return om.index == Some(0),
            OptionMatchMode::Exact | OptionMatchMode::Contains => {
                if let Some(expect) = om.expect_text.as_deref().map(fold).filter(|e| !e.is_empty()) {
                    return if om.mode == OptionMatchMode::Exact {
                        own.matches_exact(&expect)
                    } else {
                        own.matches_contains(&expect)
                    };
                }
            }
        }
    }

    raw_needles(value)
        .iter()
        .any(|item| TRUTHY.contains(&item.as_str()) || own.matches_exact(item))
}
