const SIMPLE_KEYWORDS: &[&str] = &["fix", "typo", "quick"];
const SKIP_KEYWORDS: &[&str] = &["no questions", "just do"];
const COMPLEX_KEYWORDS: &[&str] = &["system", "architecture", "integration"];
const SCOPE_KEYWORDS: &[&str] = &["multiple", "comprehensive"];
const TECHNICAL_KEYWORDS: &[&str] = &["api", "database", "payment"];

/// Deterministic 1-10 complexity score from message keywords.
/// Never touches the LLM — the whole point is reproducibility.
pub fn score_message(message: &str) -> i64 {
    let lower = message.to_lowercase();
    let mut score: i64 = 5;

    for kw in SIMPLE_KEYWORDS {
        if lower.contains(kw) {
            score -= 2;
        }
    }
    for kw in SKIP_KEYWORDS {
        if lower.contains(kw) {
            score -= 3;
        }
    }
    for kw in COMPLEX_KEYWORDS {
        if lower.contains(kw) {
            score += 2;
        }
    }
    for kw in SCOPE_KEYWORDS {
        if lower.contains(kw) {
            score += 2;
        }
    }
    for kw in TECHNICAL_KEYWORDS {
        if lower.contains(kw) {
            score += 1;
        }
    }

    score.clamp(1, 10)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClarificationDepth {
    SkipAll,
    TwoCriticalQuestions,
    FullClarification,
}

pub fn depth_for_score(score: i64) -> ClarificationDepth {
    match score {
        s if s <= 3 => ClarificationDepth::SkipAll,
        4..=6 => ClarificationDepth::TwoCriticalQuestions,
        _ => ClarificationDepth::FullClarification,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_typo_scores_low_and_skips_all_questions() {
        let score = score_message("fix a typo in the login page");
        assert!(score <= 3, "expected low score, got {score}");
        assert_eq!(depth_for_score(score), ClarificationDepth::SkipAll);
    }

    #[test]
    fn system_integration_scores_high_and_runs_full_clarification() {
        let score = score_message("rebuild the payment system integration with the new api");
        assert!(score >= 7, "expected high score, got {score}");
        assert_eq!(depth_for_score(score), ClarificationDepth::FullClarification);
    }

    #[test]
    fn skip_indicator_overrides_toward_skip_all() {
        let score = score_message("add a new feature, no questions just do it");
        assert_eq!(depth_for_score(score), ClarificationDepth::SkipAll);
    }
}
