//! Spoken rendering of LaTeX expressions embedded in lesson markup.
//!
//! The goal is narration, not typesetting round-trips: the output must be
//! plain words a synthesizer can read aloud, with no leftover markup.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static DELIMITER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$+|\\\(|\\\)|\\\[|\\\]").unwrap());
// Innermost-first: the bodies exclude braces, so nested structures resolve
// over repeated passes.
static FRAC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\[td]?frac\{([^{}]*)\}\{([^{}]*)\}").unwrap());
static ROOT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\sqrt\[([^\[\]]*)\]\{([^{}]*)\}").unwrap());
static SQRT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\sqrt\{([^{}]*)\}").unwrap());
static POWER_BRACED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\^\{([^{}]+)\}").unwrap());
static POWER_SIMPLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\^([A-Za-z0-9])").unwrap());
static SUBSCRIPT_BRACED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_\{([^{}]+)\}").unwrap());
static SUBSCRIPT_SIMPLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_([A-Za-z0-9])").unwrap());
static COMMAND_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\([A-Za-z]+)").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Spoken words for the LaTeX commands that commonly appear in lesson
/// content. Unlisted commands are dropped (their arguments survive as
/// plain text).
const COMMAND_WORDS: &[(&str, &str)] = &[
    ("times", " times "),
    ("cdot", " times "),
    ("div", " divided by "),
    ("pm", " plus or minus "),
    ("leq", " is less than or equal to "),
    ("le", " is less than or equal to "),
    ("geq", " is greater than or equal to "),
    ("ge", " is greater than or equal to "),
    ("neq", " is not equal to "),
    ("ne", " is not equal to "),
    ("approx", " is approximately equal to "),
    ("infty", " infinity "),
    ("sum", " the sum of "),
    ("int", " the integral of "),
    ("sin", " sine "),
    ("cos", " cosine "),
    ("tan", " tangent "),
    ("log", " log "),
    ("ln", " natural log "),
    ("alpha", " alpha "),
    ("beta", " beta "),
    ("gamma", " gamma "),
    ("delta", " delta "),
    ("epsilon", " epsilon "),
    ("theta", " theta "),
    ("lambda", " lambda "),
    ("mu", " mu "),
    ("pi", " pi "),
    ("sigma", " sigma "),
    ("phi", " phi "),
    ("omega", " omega "),
];

/// Render a raw LaTeX expression to its spoken English form.
pub fn latex_to_spoken(raw_latex: &str) -> String {
    let mut text = DELIMITER_RE.replace_all(raw_latex, " ").into_owned();

    // Structural forms first, repeating until nesting is exhausted. The
    // outer loop lets mixed nesting (a fraction whose body is a root, and
    // vice versa) resolve no matter which rule fires first.
    loop {
        let before = text.clone();
        text = rewrite_until_stable(&FRAC_RE, text, |caps| {
            format!("{} over {}", &caps[1], &caps[2])
        });
        text = rewrite_until_stable(&ROOT_RE, text, |caps| match caps[1].trim() {
            "2" => format!("square root of {}", &caps[2]),
            "3" => format!("cube root of {}", &caps[2]),
            index => format!("{}th root of {}", index, &caps[2]),
        });
        text = rewrite_until_stable(&SQRT_RE, text, |caps| {
            format!("square root of {}", &caps[1])
        });
        if text == before {
            break;
        }
    }

    text = POWER_BRACED_RE
        .replace_all(&text, |caps: &Captures| spoken_power(&caps[1]))
        .into_owned();
    text = POWER_SIMPLE_RE
        .replace_all(&text, |caps: &Captures| spoken_power(&caps[1]))
        .into_owned();
    text = SUBSCRIPT_BRACED_RE
        .replace_all(&text, |caps: &Captures| format!(" sub {}", &caps[1]))
        .into_owned();
    text = SUBSCRIPT_SIMPLE_RE
        .replace_all(&text, |caps: &Captures| format!(" sub {}", &caps[1]))
        .into_owned();

    text = COMMAND_RE
        .replace_all(&text, |caps: &Captures| {
            COMMAND_WORDS
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, word)| (*word).to_string())
                .unwrap_or_else(|| " ".to_string())
        })
        .into_owned();

    // Remaining single-character operators and grouping symbols.
    let mut spoken = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '=' => spoken.push_str(" equals "),
            '+' => spoken.push_str(" plus "),
            '-' => spoken.push_str(" minus "),
            '*' => spoken.push_str(" times "),
            '/' => spoken.push_str(" over "),
            '<' => spoken.push_str(" is less than "),
            '>' => spoken.push_str(" is greater than "),
            '{' | '}' | '(' | ')' | '[' | ']' | '\\' | '&' | '~' => spoken.push(' '),
            _ => spoken.push(c),
        }
    }

    WHITESPACE_RE.replace_all(&spoken, " ").trim().to_string()
}

fn rewrite_until_stable<F>(pattern: &Regex, mut text: String, rewrite: F) -> String
where
    F: Fn(&Captures) -> String,
{
    while pattern.is_match(&text) {
        text = pattern.replace_all(&text, &rewrite).into_owned();
    }
    text
}

fn spoken_power(exponent: &str) -> String {
    match exponent.trim() {
        "2" => " squared".to_string(),
        "3" => " cubed".to_string(),
        exp => format!(" to the power of {}", exp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_power() {
        assert_eq!(latex_to_spoken("x^2"), "x squared");
        assert_eq!(latex_to_spoken("x^3"), "x cubed");
        assert_eq!(latex_to_spoken("x^{10}"), "x to the power of 10");
    }

    #[test]
    fn test_fraction() {
        assert_eq!(latex_to_spoken(r"\frac{1}{2}"), "1 over 2");
        assert_eq!(latex_to_spoken(r"\dfrac{a}{b}"), "a over b");
    }

    #[test]
    fn test_nested_fraction() {
        // Inner fraction resolves first, then the outer one.
        let spoken = latex_to_spoken(r"\frac{1}{\frac{2}{3}}");
        assert_eq!(spoken, "1 over 2 over 3");
    }

    #[test]
    fn test_square_root() {
        assert_eq!(latex_to_spoken(r"\sqrt{16}"), "square root of 16");
        assert_eq!(latex_to_spoken(r"\sqrt[3]{8}"), "cube root of 8");
    }

    #[test]
    fn test_equation_with_operators() {
        assert_eq!(latex_to_spoken("a + b = c"), "a plus b equals c");
        assert_eq!(latex_to_spoken(r"2 \times 3"), "2 times 3");
    }

    #[test]
    fn test_greek_and_constants() {
        assert_eq!(latex_to_spoken(r"\pi r^2"), "pi r squared");
        assert_eq!(latex_to_spoken(r"\alpha < \beta"), "alpha is less than beta");
    }

    #[test]
    fn test_subscript() {
        assert_eq!(latex_to_spoken("x_1"), "x sub 1");
        assert_eq!(latex_to_spoken("x_{n+1}"), "x sub n plus 1");
    }

    #[test]
    fn test_output_contains_no_markup() {
        for expr in [r"\frac{x^2}{\sqrt{y}}", r"$e^{i\pi} + 1 = 0$", r"\left(a\right)"] {
            let spoken = latex_to_spoken(expr);
            assert!(!spoken.is_empty(), "empty rendering for {expr}");
            for forbidden in ['\\', '{', '}', '^', '$'] {
                assert!(
                    !spoken.contains(forbidden),
                    "{spoken:?} still contains {forbidden:?}"
                );
            }
        }
    }

    #[test]
    fn test_unknown_command_drops_to_arguments() {
        assert_eq!(latex_to_spoken(r"\mathbf{x}"), "x");
    }
}
