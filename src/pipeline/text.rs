//! Text pattern matching: decide whether a text block looks like a formula.
//!
//! Eight independent pattern families are checked against the raw text.
//! Acceptance is a logical OR across families, so a single `=` is enough to
//! accept a block (a known source of false positives; the low bar is
//! intentional and filtering happens downstream).
//!
//! Confidence is computed separately from acceptance: each family's match
//! count is divided by that family's saturation constant and clamped to 1,
//! and the eight sub-scores are averaged. A block that matches no family
//! scores exactly 0.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One signal group of the text matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternFamily {
    /// Greek letters and Unicode operators (∑ ∫ ∏ √ ∞ ± × ÷ ≠ ≤ ≥ ∈ ∉ ⊂ ⊃ ∪ ∩).
    MathSymbol,
    /// Any `\command` token.
    LatexCommand,
    /// ASCII `+ - * / = < >`.
    Operator,
    /// Named functions and big operators (`\sin`, `\log`, `\sum`, `\int`, …).
    MathFunction,
    /// `_…` subscripts and `^…` superscripts.
    Script,
    /// Sized delimiters (`\left`, `\right`, `\bigl`, …).
    Delimiter,
    /// Arrow macros (`\rightarrow`, `\Leftarrow`, …).
    Arrow,
    /// A `\begin{…}…\end{…}` environment.
    Environment,
}

impl PatternFamily {
    /// All families, in scoring order.
    pub const ALL: [PatternFamily; 8] = [
        PatternFamily::MathSymbol,
        PatternFamily::LatexCommand,
        PatternFamily::Operator,
        PatternFamily::MathFunction,
        PatternFamily::Script,
        PatternFamily::Delimiter,
        PatternFamily::Arrow,
        PatternFamily::Environment,
    ];

    /// Match count at which the family's sub-score reaches 1.0.
    ///
    /// `None` marks the environment family, which scores 1.0 on any match.
    pub fn saturation(self) -> Option<f64> {
        match self {
            PatternFamily::MathSymbol => Some(1.2),
            PatternFamily::LatexCommand => Some(1.0),
            PatternFamily::Operator => Some(1.0),
            PatternFamily::MathFunction => Some(1.2),
            PatternFamily::Script => Some(1.5),
            PatternFamily::Delimiter => Some(1.5),
            PatternFamily::Arrow => Some(1.5),
            PatternFamily::Environment => None,
        }
    }

    fn patterns(self) -> &'static [&'static str] {
        match self {
            PatternFamily::MathSymbol => &[r"[α-ωΑ-Ω∑∫∏√∞±×÷≠≤≥∈∉⊂⊃∪∩]"],
            PatternFamily::LatexCommand => &[r"\\[a-zA-Z]+"],
            PatternFamily::Operator => &[r"[+\-*/=<>]"],
            PatternFamily::MathFunction => &[
                r"\\sin|\\cos|\\tan|\\log|\\ln|\\exp|\\lim|\\sum|\\int|\\prod|\\oint|\\iint|\\iiint|\\iiiint|\\idotsint",
            ],
            // Subscripts and superscripts are counted separately and summed.
            PatternFamily::Script => &[r"_[^}]+", r"\^[^}]+"],
            PatternFamily::Delimiter => &[
                r"\\left|\\right|\\bigl|\\bigr|\\Bigl|\\Bigr|\\biggl|\\biggr|\\Biggl|\\Biggr",
            ],
            PatternFamily::Arrow => &[
                r"\\rightarrow|\\leftarrow|\\leftrightarrow|\\Rightarrow|\\Leftarrow|\\Leftrightarrow",
            ],
            PatternFamily::Environment => &[r"\\begin\{.*?\}.*?\\end\{.*?\}"],
        }
    }
}

/// Compiled pattern families, built once and shared by reference.
#[derive(Debug)]
pub struct PatternCatalogue {
    families: Vec<(PatternFamily, Vec<Regex>)>,
}

static STANDARD: Lazy<PatternCatalogue> = Lazy::new(|| {
    PatternCatalogue::compile().expect("built-in formula patterns are valid regexes")
});

impl PatternCatalogue {
    /// The process-wide catalogue of the eight standard families.
    pub fn standard() -> &'static PatternCatalogue {
        &STANDARD
    }

    fn compile() -> Result<Self, regex::Error> {
        let families = PatternFamily::ALL
            .iter()
            .map(|&family| {
                let regexes = family
                    .patterns()
                    .iter()
                    .map(|p| Regex::new(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((family, regexes))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { families })
    }

    /// Classify one text fragment.
    pub fn classify(&self, text: &str) -> TextClassification {
        let mut family_scores = [0.0; 8];
        let mut matched = Vec::new();

        for (slot, (family, regexes)) in family_scores.iter_mut().zip(&self.families) {
            let count: usize = regexes.iter().map(|re| re.find_iter(text).count()).sum();
            if count == 0 {
                continue;
            }
            matched.push(*family);
            *slot = match family.saturation() {
                Some(sat) => (count as f64 / sat).min(1.0),
                None => 1.0,
            };
        }

        let confidence =
            (family_scores.iter().sum::<f64>() / family_scores.len() as f64).clamp(0.0, 1.0);
        debug!(
            "Text classification: {} families matched, confidence {:.2}",
            matched.len(),
            confidence
        );

        TextClassification {
            is_formula: !matched.is_empty(),
            confidence,
            matched,
            family_scores,
        }
    }
}

/// Outcome of [`classify_text`].
#[derive(Debug, Clone, PartialEq)]
pub struct TextClassification {
    /// True when any family matched.
    pub is_formula: bool,
    /// Mean of the eight family sub-scores, in `[0, 1]`.
    pub confidence: f64,
    /// Families with at least one match, in scoring order.
    pub matched: Vec<PatternFamily>,
    /// Per-family sub-scores in [`PatternFamily::ALL`] order.
    pub family_scores: [f64; 8],
}

/// Classify `text` against the standard catalogue.
pub fn classify_text(text: &str) -> TextClassification {
    PatternCatalogue::standard().classify(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn plain_prose_scores_exactly_zero() {
        let c = classify_text("hello world");
        assert!(!c.is_formula);
        assert_eq!(c.confidence, 0.0);
        assert!(c.matched.is_empty());
    }

    #[test]
    fn empty_text_is_rejected() {
        let c = classify_text("");
        assert!(!c.is_formula);
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn single_equals_sign_is_accepted() {
        // Known false positive: any ASCII operator accepts the block.
        let c = classify_text("Chapter 3 = Results");
        assert!(c.is_formula);
        assert_eq!(c.matched, vec![PatternFamily::Operator]);
        assert_close(c.confidence, 1.0 / 8.0);
    }

    #[test]
    fn hyphenated_prose_is_a_false_positive() {
        assert!(classify_text("state-of-the-art").is_formula);
    }

    #[test]
    fn einstein_matches_operator_and_script() {
        let c = classify_text("E = mc^2");
        assert!(c.is_formula);
        assert_eq!(c.matched, vec![PatternFamily::Operator, PatternFamily::Script]);
        // operator: 1/1 → 1.0; script: 1/1.5
        assert_close(c.confidence, (1.0 + 1.0 / 1.5) / 8.0);
    }

    #[test]
    fn each_family_alone_is_sufficient() {
        let cases = [
            ("α", PatternFamily::MathSymbol),
            ("∑", PatternFamily::MathSymbol),
            ("x_i", PatternFamily::Script),
            ("x^2", PatternFamily::Script),
        ];
        for (text, family) in cases {
            let c = classify_text(text);
            assert!(c.is_formula, "{text:?} should be accepted");
            assert!(c.matched.contains(&family), "{text:?} should match {family:?}");
        }
        assert!(classify_text(r"\alpha").matched.contains(&PatternFamily::LatexCommand));
        assert!(classify_text(r"\sin").matched.contains(&PatternFamily::MathFunction));
        assert!(classify_text(r"\left(").matched.contains(&PatternFamily::Delimiter));
        assert!(classify_text(r"\Rightarrow").matched.contains(&PatternFamily::Arrow));
        assert!(classify_text(r"\begin{cases}x\end{cases}")
            .matched
            .contains(&PatternFamily::Environment));
    }

    #[test]
    fn environment_sub_score_is_binary() {
        let one = classify_text(r"\begin{align}a\end{align}");
        let two = classify_text(r"\begin{align}a\end{align} \begin{align}b\end{align}");
        assert_eq!(one.family_scores[7], 1.0);
        assert_eq!(two.family_scores[7], 1.0);
    }

    #[test]
    fn unmatched_environment_contributes_nothing() {
        let c = classify_text(r"\begin{align} never closed");
        assert_eq!(c.family_scores[7], 0.0);
        // the \begin command token still counts
        assert!(c.matched.contains(&PatternFamily::LatexCommand));
    }

    #[test]
    fn sub_scores_saturate_at_one() {
        let c = classify_text("a+b+c+d+e+f+g");
        assert_eq!(c.family_scores[2], 1.0);
        assert_close(c.confidence, 1.0 / 8.0);
    }

    #[test]
    fn symbol_family_saturates_at_one_point_two() {
        let c = classify_text("α");
        assert_close(c.family_scores[0], 1.0 / 1.2);
        let c = classify_text("αβ");
        assert_eq!(c.family_scores[0], 1.0);
    }

    #[test]
    fn dense_latex_approaches_full_confidence() {
        let c = classify_text(
            r"\begin{equation}\left( \sum_{i=1}^{n} \alpha_i \right) \rightarrow \int x = 0\end{equation}",
        );
        assert!(c.is_formula);
        assert_eq!(c.matched.len(), 7, "all but the Unicode symbol family: {:?}", c.matched);
        assert!(c.confidence > 0.8, "got {}", c.confidence);
        assert!(c.confidence <= 1.0);
    }

    #[test]
    fn confidence_stays_in_unit_interval_for_awkward_inputs() {
        let long = "x^2 + ".repeat(10_000);
        let inputs = [
            "\u{0}\u{FFFF}",
            "}}}}____^^^^",
            "\\\\\\\\",
            "∫∫∫∫∫∫∫∫∫∫∫∫",
            "\n\n\t",
            long.as_str(),
        ];
        for input in inputs {
            let c = classify_text(input);
            assert!(c.confidence.is_finite());
            assert!((0.0..=1.0).contains(&c.confidence), "{input:?} → {}", c.confidence);
            if !c.is_formula {
                assert_eq!(c.confidence, 0.0);
            }
        }
    }

    #[test]
    fn standard_catalogue_is_shared() {
        assert!(std::ptr::eq(PatternCatalogue::standard(), PatternCatalogue::standard()));
    }
}
