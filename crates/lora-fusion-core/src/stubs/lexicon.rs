//! Keyword lexicon shared by the stub oracle and predictor.

/// Known domains with strong (weight 2) and weak (weight 1) keywords.
///
/// Order matters for ties: earlier domains win.
pub const DOMAINS: &[(&str, &[&str], &[&str])] = &[
    (
        "math",
        &[
            "solve", "calculate", "compute", "equation", "percent", "integral", "derivative",
            "algebra", "arithmetic", "multiply", "divide", "divided", "sum", "product",
            "average", "fraction", "math",
        ],
        &["plus", "minus", "times", "number", "square", "root", "total"],
    ),
    (
        "code",
        &[
            "code", "function", "program", "compile", "compiler", "debug", "algorithm",
            "python", "rust", "script", "refactor", "struct", "api",
        ],
        &["implement", "bug", "class", "loop"],
    ),
    (
        "creative",
        &[
            "poem", "poetry", "story", "haiku", "verse", "lyrics", "song", "sonnet",
            "limerick", "rhyme", "narrative", "creative",
        ],
        &["write", "compose", "imagine", "short"],
    ),
];

/// Lowercase words, splitting on anything but alphanumerics and '%'.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '%'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Keyword score per known domain, in [`DOMAINS`] order.
///
/// Numeric tokens and percentages count as strong math evidence.
#[must_use]
pub fn domain_scores(text: &str) -> Vec<(&'static str, u32)> {
    let tokens = tokenize(text);
    DOMAINS
        .iter()
        .map(|(domain, strong, weak)| {
            let score = tokens
                .iter()
                .map(|t| {
                    if strong.contains(&t.as_str()) {
                        2
                    } else if weak.contains(&t.as_str()) {
                        1
                    } else if *domain == "math" && t.chars().any(|c| c.is_ascii_digit()) {
                        2
                    } else {
                        0
                    }
                })
                .sum::<u32>();
            (*domain, score)
        })
        .collect()
}

/// Highest scoring domain, or `None` if no keyword matched.
#[must_use]
pub fn classify(text: &str) -> Option<&'static str> {
    let mut best: Option<(&'static str, u32)> = None;
    for (domain, score) in domain_scores(text) {
        if score > 0 && best.map_or(true, |(_, s)| score > s) {
            best = Some((domain, score));
        }
    }
    best.map(|(domain, _)| domain)
}
