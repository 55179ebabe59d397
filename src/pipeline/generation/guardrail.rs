//! Output guardrail: flags generated text that carries personal identifiers
//! or credentials. Pure pattern matching; never fails.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::GuardrailStatus;

struct GuardrailPattern {
    regex: Regex,
    label: &'static str,
}

static PATTERNS: LazyLock<Vec<GuardrailPattern>> = LazyLock::new(|| {
    vec![
        pattern(r"(?i)passw(?:or)?d", "password"),
        pattern(r"(?i)\bpass\s*phrase\b", "passphrase"),
        pattern(r"(?i)\bssn\b", "ssn"),
        pattern(r"(?i)\bsocial\s+security\s+(?:number|no\.?|#)", "social_security_number"),
        pattern(r"\b\d{3}-\d{2}-\d{4}\b", "ssn_format"),
        pattern(
            r"(?i)\bnational\s+(?:id|identity|identification|insurance)\s*(?:number|no\.?|#|card)?\b",
            "national_id",
        ),
        pattern(r"(?i)\bpassport\s+(?:number|no\.?|#)", "passport_number"),
        pattern(r"(?i)\bapi[\s_-]?key\b", "api_key"),
        pattern(r"(?i)\b(?:access|auth|bearer|secret)[\s_-]?token\b", "access_token"),
        pattern(r"(?i)\bprivate[\s_-]?key\b", "private_key"),
        pattern(r"(?i)\bcredit\s+card\s+(?:number|no\.?|#)", "credit_card"),
    ]
});

fn pattern(regex_str: &str, label: &'static str) -> GuardrailPattern {
    GuardrailPattern {
        regex: Regex::new(regex_str).expect("Invalid guardrail regex pattern"),
        label,
    }
}

/// Guardrail decision plus the labels of every pattern that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardrailVerdict {
    pub status: GuardrailStatus,
    pub matched: Vec<&'static str>,
}

impl GuardrailVerdict {
    pub fn is_blocked(&self) -> bool {
        self.status == GuardrailStatus::Blocked
    }
}

pub fn evaluate_guardrail(text: &str) -> GuardrailVerdict {
    let matched: Vec<&'static str> = PATTERNS
        .iter()
        .filter(|p| p.regex.is_match(text))
        .map(|p| p.label)
        .collect();

    let status = if matched.is_empty() {
        GuardrailStatus::Ok
    } else {
        GuardrailStatus::Blocked
    };
    GuardrailVerdict { status, matched }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_anywhere_blocks() {
        for text in [
            "password",
            "Your PASSWORD is hunter2",
            "login:admin passwd=abc",
            "resetPassword link",
        ] {
            assert!(evaluate_guardrail(text).is_blocked(), "{text}");
        }
    }

    #[test]
    fn clinical_plan_passes() {
        let plan = "Phase 1 (weeks 0-2): pain control, isometric quadriceps sets. \
                    Progress when pain < 3/10 and full extension achieved. \
                    Phase 2: closed-chain strengthening, passive range of motion.";
        let verdict = evaluate_guardrail(plan);
        assert_eq!(verdict.status, GuardrailStatus::Ok);
        assert!(verdict.matched.is_empty());
    }

    #[test]
    fn identifiers_block() {
        assert!(evaluate_guardrail("SSN 123-45-6789").is_blocked());
        assert!(evaluate_guardrail("Social Security Number on file").is_blocked());
        assert!(evaluate_guardrail("national ID number: X1").is_blocked());
        assert!(evaluate_guardrail("use this api_key").is_blocked());
    }

    #[test]
    fn matched_labels_reported() {
        let verdict = evaluate_guardrail("password and 123-45-6789");
        assert!(verdict.matched.contains(&"password"));
        assert!(verdict.matched.contains(&"ssn_format"));
    }

    #[test]
    fn dates_and_doses_do_not_match_ssn_format() {
        assert!(!evaluate_guardrail("2024-03-15, 500 mg twice daily, 3x10 reps").is_blocked());
    }
}
