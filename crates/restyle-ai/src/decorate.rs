//! Output post-processing for the local deployment.

use rand::RngExt;
use restyle_core::Style;

/// Symbols appended to decorative-style output.
pub const DECORATIVE_PALETTE: [&str; 8] = ["💕", "✨", "🥺", "😊", "💝", "🌸", "💗", "💖"];

/// Trim the decoded text; for decorative styles append a space and one or two
/// distinct palette symbols.
pub fn finish(style: Style, decoded: &str) -> String {
    let text = decoded.trim();
    if !style.is_decorative() {
        return text.to_string();
    }

    let mut rng = rand::rng();
    let count = rng.random_range(1..=2);
    let symbols: String = rand::seq::index::sample(&mut rng, DECORATIVE_PALETTE.len(), count)
        .into_iter()
        .map(|i| DECORATIVE_PALETTE[i])
        .collect();
    format!("{text} {symbols}")
}

/// Number of palette symbols at the very end of `text`.
pub fn trailing_palette_symbols(text: &str) -> usize {
    let mut rest = text;
    let mut count = 0;
    while let Some(symbol) = DECORATIVE_PALETTE.iter().find(|s| rest.ends_with(**s)) {
        rest = &rest[..rest.len() - symbol.len()];
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_styles_are_only_trimmed() {
        for style in [Style::Formal, Style::Casual, Style::Polite] {
            assert_eq!(finish(style, "  식사하셨습니까?\n"), "식사하셨습니까?");
        }
    }

    fn split_symbols(suffix: &str) -> Vec<&'static str> {
        let mut rest = suffix;
        let mut symbols = Vec::new();
        while !rest.is_empty() {
            let symbol = DECORATIVE_PALETTE
                .iter()
                .find(|s| rest.starts_with(**s))
                .unwrap_or_else(|| panic!("unexpected suffix {suffix:?}"));
            symbols.push(*symbol);
            rest = &rest[symbol.len()..];
        }
        symbols
    }

    #[test]
    fn decorative_style_appends_one_or_two_distinct_symbols() {
        for _ in 0..200 {
            let out = finish(Style::Cute, " 밥 먹었냥? ");
            let suffix = out
                .strip_prefix("밥 먹었냥? ")
                .expect("trimmed text and separator come first");
            let symbols = split_symbols(suffix);
            assert!((1..=2).contains(&symbols.len()), "got {out:?}");
            if symbols.len() == 2 {
                assert_ne!(symbols[0], symbols[1]);
            }
            assert_eq!(trailing_palette_symbols(&out), symbols.len());
        }
    }

    #[test]
    fn counts_trailing_symbols() {
        assert_eq!(trailing_palette_symbols("hi"), 0);
        assert_eq!(trailing_palette_symbols("hi ✨"), 1);
        assert_eq!(trailing_palette_symbols("hi 🌸💖"), 2);
    }
}
