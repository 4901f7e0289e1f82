use std::sync::LazyLock;

use regex::Regex;

// Matches single-line diagnostics of rustc (--error-format short), g++ and mcs:
//   main.rs:3:5: error[E0425]: cannot find value `x` in this scope
//   main.cpp:5:5: error: expected ';' before 'return'
//   main.cs(5,9): error CS1525: Unexpected symbol `return'
static DIAGNOSTIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\S.*?:\s+)?(error|warning)(?:\[[A-Za-z0-9]+\]|\s+[A-Z]+\d+)?:\s*(.+)$")
        .expect("diagnostic pattern is valid")
});

static SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(aborting due to|could not compile|\d+ warnings? emitted|\d+ errors? generated)")
        .expect("summary pattern is valid")
});

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Splits compiler output into errors and warnings, dropping notes, source
/// excerpts and toolchain summary lines.
pub fn parse(output: &str) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();

    for line in output.lines().map(str::trim_end) {
        let Some(captures) = DIAGNOSTIC.captures(line) else {
            continue;
        };
        if SUMMARY.is_match(&captures[2]) {
            continue;
        }

        let entry = line.trim().to_string();
        match &captures[1] {
            "error" => diagnostics.errors.push(entry),
            _ => diagnostics.warnings.push(entry),
        }
    }

    diagnostics
}
