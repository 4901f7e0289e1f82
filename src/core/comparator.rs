/// Compares program output with the expected answer.
///
/// With `ignore_whitespace` only the leading and trailing whitespace of both
/// sides is trimmed; whitespace inside the text (including `\r\n` vs `\n`) must
/// still match exactly. Equality is ordinal, optionally ignoring case.
pub fn outputs_match(actual: &str, expected: &str, ignore_case: bool, ignore_whitespace: bool) -> bool {
    let (actual, expected) = if ignore_whitespace {
        (actual.trim(), expected.trim())
    } else {
        (actual, expected)
    };

    if ignore_case {
        actual
            .chars()
            .map(simple_uppercase)
            .eq(expected.chars().map(simple_uppercase))
    } else {
        actual == expected
    }
}

/// One-to-one uppercase mapping. Characters whose uppercase form is longer
/// than a single char (`ß`, `ﬁ`) are kept as they are.
fn simple_uppercase(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "x",
        " x\n",
        "Hello, World!",
        "hello, world!",
        "计算开始\n最终结果: 50",
        "  padded  ",
        "line1\r\nline2",
        "line1\nline2",
        "STRASSE",
        "straße",
    ];

    #[test]
    fn test_reflexive() {
        for sample in SAMPLES {
            for ic in [false, true] {
                for iw in [false, true] {
                    assert!(outputs_match(sample, sample, ic, iw), "{:?}", sample);
                }
            }
        }
    }

    #[test]
    fn test_symmetric() {
        for a in SAMPLES {
            for b in SAMPLES {
                for ic in [false, true] {
                    for iw in [false, true] {
                        assert_eq!(
                            outputs_match(a, b, ic, iw),
                            outputs_match(b, a, ic, iw),
                            "{:?} vs {:?} (ignore_case={}, ignore_whitespace={})",
                            a,
                            b,
                            ic,
                            iw
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_whitespace_policy() {
        assert!(outputs_match(" x\n", "x", false, true));
        assert!(!outputs_match(" x\n", "x", false, false));
    }

    #[test]
    fn test_internal_whitespace_is_significant() {
        assert!(!outputs_match("a  b", "a b", false, true));
        assert!(!outputs_match("line1\r\nline2", "line1\nline2", true, true));
        assert!(outputs_match("line1\nline2\r\n", "line1\nline2", false, true));
    }

    #[test]
    fn test_case_policy() {
        assert!(outputs_match("Hello, World!", "hello, world!", true, false));
        assert!(!outputs_match("Hello, World!", "hello, world!", false, false));
        assert!(outputs_match("Ärger über Öl", "ÄRGER ÜBER ÖL", true, false));
        assert!(outputs_match("Straße", "STRAßE", true, false));
    }

    #[test]
    fn test_case_folding_is_char_by_char() {
        assert!(!outputs_match("straße", "STRASSE", true, false));
        assert!(!outputs_match("ﬁ", "FI", true, false));
        assert!(!outputs_match("ß", "SS", true, true));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(outputs_match("", "", false, false));
        assert!(outputs_match("\n\t ", "", false, true));
        assert!(!outputs_match("\n", "", false, false));
    }
}
