const ORDINALS: &[&str] = &[
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth", "tenth",
];
const SEPARATORS: &[&str] = &["then", "and also"];

/// Result of attempting to split one inbound message into several
/// candidate tasks. Splitting is
/// always deterministic string matching, never the LLM.
#[derive(Debug, Clone)]
pub struct BatchSplit {
    pub shared_assignee: Option<String>,
    /// A "no questions" / "just do" modifier in the preamble overrides auto-confirm for every task in the batch.
    pub skip_confirmation: bool,
    pub task_titles: Vec<String>,
}

/// Detects a `"Tasks for <name>"` (or `"Task for <name>"`) preamble and
/// strips it, returning the assignee name, whether a skip-confirmation
/// modifier was present, and the remainder of the message.
fn strip_assignee_preamble(message: &str) -> (Option<String>, bool, String) {
    let lower = message.to_lowercase();
    for marker in ["tasks for ", "task for "] {
        if let Some(idx) = lower.find(marker) {
            if idx == 0 {
                let rest = &message[marker.len()..];
                if let Some(colon_idx) = rest.find([':', '.']) {
                    let mut name = rest[..colon_idx].trim().to_string();
                    let remainder = rest[colon_idx + 1..].trim().to_string();
                    let mut skip_confirmation = false;
                    for skip in SKIP_KEYWORDS_IN_PREAMBLE {
                        let lower_name = name.to_lowercase();
                        if let Some(skip_idx) = lower_name.find(skip) {
                            skip_confirmation = true;
                            name = name[..skip_idx].trim().to_string();
                        }
                    }
                    if !name.is_empty() {
                        return (Some(name), skip_confirmation, remainder);
                    }
                }
            }
        }
    }
    (None, false, message.to_string())
}

const SKIP_KEYWORDS_IN_PREAMBLE: &[&str] = &["no questions", "just do"];

/// Attempts to split `message` into ordered candidate task titles. Returns
/// `None` if no ordinal or separator markers are present (single-task
/// message).
pub fn try_split(message: &str) -> Option<BatchSplit> {
    let (shared_assignee, skip_confirmation, remainder) = strip_assignee_preamble(message);
    let lower = remainder.to_lowercase();

    let has_ordinals = ORDINALS.iter().filter(|o| lower.contains(*o)).count() >= 2;
    let has_separator = SEPARATORS.iter().any(|s| lower.contains(s));
    let looks_numbered = remainder
        .lines()
        .filter(|l| {
            let t = l.trim_start();
            t.starts_with(|c: char| c.is_ascii_digit()) && t.contains('.')
        })
        .count()
        >= 2;

    if !has_ordinals && !has_separator && !looks_numbered {
        return None;
    }

    let titles = split_on_markers(&remainder);
    if titles.len() < 2 {
        return None;
    }

    Some(BatchSplit {
        shared_assignee,
        skip_confirmation,
        task_titles: titles,
    })
}

/// Walks `remainder` word by word, starting a new segment at each ordinal
/// or separator marker, then trims stray leading digits/punctuation and
/// trailing periods off each resulting segment.
fn split_on_markers(remainder: &str) -> Vec<String> {
    let words: Vec<&str> = remainder.split_whitespace().collect();
    let mut segments: Vec<Vec<&str>> = vec![Vec::new()];

    let mut i = 0;
    while i < words.len() {
        let bare = words[i].trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();

        if ORDINALS.contains(&bare.as_str()) {
            if !segments.last().unwrap().is_empty() {
                segments.push(Vec::new());
            }
            i += 1;
            continue;
        }
        if bare == "then" {
            segments.push(Vec::new());
            i += 1;
            continue;
        }
        if bare == "and" && i + 1 < words.len() {
            let next = words[i + 1].trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if next == "also" {
                segments.push(Vec::new());
                i += 2;
                continue;
            }
        }
        segments.last_mut().unwrap().push(words[i]);
        i += 1;
    }

    segments
        .into_iter()
        .map(|words| words.join(" "))
        .map(|s| {
            s.trim()
                .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
                .trim()
                .trim_end_matches('.')
                .to_string()
        })
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_ordinal_enumerated_tasks_with_shared_assignee() {
        let msg = "Tasks for Mayank no questions: First add referral code. Second fix the error sequence. Third run Stripe testing. Fourth fix email and deploy";
        let split = try_split(msg).expect("should split");
        assert_eq!(split.shared_assignee.as_deref(), Some("Mayank"));
        assert!(split.skip_confirmation);
        assert_eq!(split.task_titles.len(), 4);
        assert!(split.task_titles[0].to_lowercase().contains("referral"));
        assert!(split.task_titles[3].to_lowercase().contains("deploy"));
    }

    #[test]
    fn single_task_message_does_not_split() {
        assert!(try_split("fix the login bug").is_none());
    }

    #[test]
    fn then_separator_splits_two_tasks() {
        let split = try_split("deploy the app then notify the team").expect("should split");
        assert_eq!(split.task_titles.len(), 2);
    }
}
