//! LaTeX markup to canonical expression text.
//!
//! Covers what a math input field typically emits: `\frac{a}{b}`,
//! `\sqrt{a}`, `x^{n}`, `\cdot`, `\times`, `\left(`/`\right)`, named
//! functions (`\sin`, `\ln`, ...) and `\pi`. The result is fed to the
//! regular expression parser.

use regex::Regex;
use std::sync::LazyLock;

static FRAC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\[dt]?frac\s*\{([^{}]*)\}\s*\{([^{}]*)\}").unwrap());
static SQRT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\sqrt\s*\{([^{}]*)\}").unwrap());
static BRACED_POWER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\^\s*\{([^{}]*)\}").unwrap());
static FUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\(sin|cos|tan|exp|ln|log|sqrt)\b").unwrap());
static MULTIPLY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\(cdot|times)").unwrap());
static DELIMITER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\(left|right)\b").unwrap());
static SPACING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\[,;:! ]").unwrap());

/// Convert LaTeX markup into a canonical expression string.
///
/// Unknown commands are left in place so the parser reports them with a
/// position instead of silently dropping them.
pub fn latex_to_expression(latex: &str) -> String {
    let mut s = latex.trim().to_string();

    s = DELIMITER.replace_all(&s, "").into_owned();
    s = SPACING.replace_all(&s, " ").into_owned();
    s = MULTIPLY.replace_all(&s, "*").into_owned();

    // Innermost groups first; repeat until no brace-only group remains.
    loop {
        let next = FRAC.replace_all(&s, "(($1)/($2))").into_owned();
        let next = SQRT.replace_all(&next, "sqrt($1)").into_owned();
        let next = BRACED_POWER.replace_all(&next, "^($1)").into_owned();
        if next == s {
            break;
        }
        s = next;
    }

    s = s.replace('{', "(").replace('}', ")");
    s = FUNCTION.replace_all(&s, "$1").into_owned();
    s.replace("\\pi", "pi")
}
