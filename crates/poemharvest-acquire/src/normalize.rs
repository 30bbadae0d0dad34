use unicode_normalization::UnicodeNormalization;

/// Normalize fetched markup before parsing.
///
/// Converts to NFC so umlauts and ligatures have one representation
/// (ü, not u + combining diaeresis), turns CRLF into LF, and drops
/// trailing whitespace on every line.
pub fn normalize_markup(input: &str) -> String {
    let nfc: String = input.nfc().collect();

    nfc.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_nfc() {
        // u + combining diaeresis -> ü (precomposed)
        let decomposed = "gru\u{0308}n";
        assert_eq!(normalize_markup(decomposed), "grün");
    }

    #[test]
    fn test_crlf_and_trailing_whitespace() {
        let input = "Zeile eins   \r\nZeile zwei\t\r\n\r\nStrophe";
        assert_eq!(normalize_markup(input), "Zeile eins\nZeile zwei\n\nStrophe");
    }

    #[test]
    fn test_leading_indent_kept() {
        assert_eq!(normalize_markup("  eingerückt"), "  eingerückt");
    }
}
