use crate::types::RoutingDecision;

/// Pure confidence-routing table: `≥0.8` or an exact
/// slash-command match executes directly, `0.6..0.8` asks for confirmation,
/// below `0.6` asks a clarifying question.
pub fn route(confidence: f64, exact_slash_match: bool) -> RoutingDecision {
    if exact_slash_match || confidence >= 0.8 {
        RoutingDecision::ExecuteDirectly
    } else if confidence >= 0.6 {
        RoutingDecision::ConfirmWithUser
    } else {
        RoutingDecision::AskClarifyingQuestion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_confidence_executes_directly() {
        assert_eq!(route(0.8, false), RoutingDecision::ExecuteDirectly);
        assert_eq!(route(0.95, false), RoutingDecision::ExecuteDirectly);
    }

    #[test]
    fn slash_command_always_executes_directly_regardless_of_confidence() {
        assert_eq!(route(0.1, true), RoutingDecision::ExecuteDirectly);
    }

    #[test]
    fn mid_confidence_confirms_with_user() {
        assert_eq!(route(0.6, false), RoutingDecision::ConfirmWithUser);
        assert_eq!(route(0.79, false), RoutingDecision::ConfirmWithUser);
    }

    #[test]
    fn low_confidence_asks_clarifying_question() {
        assert_eq!(route(0.0, false), RoutingDecision::AskClarifyingQuestion);
        assert_eq!(route(0.59, false), RoutingDecision::AskClarifyingQuestion);
    }
}
