//! Content predicates for conditional refresh.

use tabrefresh_protocol::{CheckResult, ConditionType};

/// A validated content condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub kind: ConditionType,
    pub value: String,
    /// `None` reads the whole page text.
    pub selector: Option<String>,
}

impl Condition {
    /// Evaluate against freshly read content.
    ///
    /// `content` is `None` when the selector matched nothing. `snapshot` holds
    /// the normalized text seen by the previous `text_changed` check and is
    /// updated in place.
    pub fn evaluate(&self, content: Option<&str>, snapshot: &mut Option<String>) -> CheckResult {
        let Some(content) = content else {
            return CheckResult::skip("Target element not found");
        };

        let normalized = content.to_lowercase();
        let needle = self.value.to_lowercase();

        match self.kind {
            ConditionType::ContainsText => {
                if normalized.contains(&needle) {
                    CheckResult::refresh(format!("Text \"{}\" was found", self.value))
                } else {
                    CheckResult::skip(format!("Text \"{}\" not found yet", self.value))
                }
            }
            ConditionType::NotContainsText => {
                if normalized.contains(&needle) {
                    CheckResult::skip(format!("Text \"{}\" is still present", self.value))
                } else {
                    CheckResult::refresh(format!("Text \"{}\" is not present", self.value))
                }
            }
            ConditionType::TextChanged => {
                let result = match snapshot.as_deref() {
                    None => CheckResult::skip("Initial content snapshot taken"),
                    Some(previous) if previous != normalized => {
                        CheckResult::refresh("Content has changed since last check")
                    }
                    Some(_) => return CheckResult::skip("No content changes detected"),
                };
                *snapshot = Some(normalized);
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(kind: ConditionType, value: &str) -> Condition {
        Condition {
            kind,
            value: value.to_string(),
            selector: None,
        }
    }

    #[test]
    fn test_contains_text_is_case_insensitive() {
        let cond = condition(ConditionType::ContainsText, "done");
        let mut snap = None;

        let result = cond.evaluate(Some("Status: DONE"), &mut snap);
        assert!(result.should_refresh);
        assert_eq!(result.reason, "Text \"done\" was found");

        let result = cond.evaluate(Some("Status: pending"), &mut snap);
        assert!(!result.should_refresh);
        assert_eq!(result.reason, "Text \"done\" not found yet");
    }

    #[test]
    fn test_not_contains_text() {
        let cond = condition(ConditionType::NotContainsText, "Sold Out");
        let mut snap = None;

        let result = cond.evaluate(Some("item is sold out"), &mut snap);
        assert!(!result.should_refresh);
        assert_eq!(result.reason, "Text \"Sold Out\" is still present");

        let result = cond.evaluate(Some("in stock"), &mut snap);
        assert!(result.should_refresh);
        assert_eq!(result.reason, "Text \"Sold Out\" is not present");
    }

    #[test]
    fn test_text_changed_takes_snapshot_first() {
        let cond = condition(ConditionType::TextChanged, "ignored");
        let mut snap = None;

        let first = cond.evaluate(Some("Price: 10"), &mut snap);
        assert!(!first.should_refresh);
        assert_eq!(first.reason, "Initial content snapshot taken");
        assert_eq!(snap.as_deref(), Some("price: 10"));

        let same = cond.evaluate(Some("PRICE: 10"), &mut snap);
        assert!(!same.should_refresh);
        assert_eq!(same.reason, "No content changes detected");

        let changed = cond.evaluate(Some("Price: 12"), &mut snap);
        assert!(changed.should_refresh);
        assert_eq!(changed.reason, "Content has changed since last check");
        assert_eq!(snap.as_deref(), Some("price: 12"));
    }

    #[test]
    fn test_missing_target_never_refreshes() {
        let cond = condition(ConditionType::NotContainsText, "x");
        let mut snap = Some("old".to_string());
        let result = cond.evaluate(None, &mut snap);
        assert!(!result.should_refresh);
        assert_eq!(result.reason, "Target element not found");
        assert_eq!(snap.as_deref(), Some("old"));
    }
}
