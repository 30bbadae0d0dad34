// Footnote markers as they appear in rendered poem text.
//
// A marker for footnote `n` is the decimal digits of `n` written as Unicode
// superscript digits, so footnote 12 renders as "¹²". A marker written
// directly after another superscript digit is preceded by `MARKER_SEPARATOR`,
// so back-to-back footnotes 1 and 2 render as "¹˒²" rather than "¹²".

const SUPERSCRIPT_DIGITS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];

/// Separates a marker from a superscript digit right before it.
pub const MARKER_SEPARATOR: char = '˒';

/// Render a footnote number as superscript digits.
pub fn superscript(number: u32) -> String {
    number
        .to_string()
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| SUPERSCRIPT_DIGITS[d as usize])
        .collect()
}

fn superscript_value(c: char) -> Option<u32> {
    SUPERSCRIPT_DIGITS
        .iter()
        .position(|&s| s == c)
        .map(|p| p as u32)
}

/// Append the marker for footnote `number` to rendered text.
pub fn push_marker(out: &mut String, number: u32) {
    if out.chars().next_back().and_then(superscript_value).is_some() {
        out.push(MARKER_SEPARATOR);
    }
    out.push_str(&superscript(number));
}

/// Collect every run of superscript digits in `text`, in order of appearance.
///
/// A run ends at any other character; `MARKER_SEPARATOR` splits adjacent
/// markers. Runs are candidates only: a poem may contain superscripts of its
/// own ("m²"), see `footnote_markers`.
pub fn markers_in(text: &str) -> Vec<u32> {
    let mut markers = Vec::new();
    let mut current: Option<u32> = None;

    for c in text.chars() {
        match superscript_value(c) {
            Some(d) => {
                current = Some(current.unwrap_or(0).saturating_mul(10).saturating_add(d));
            }
            None => {
                if let Some(n) = current.take() {
                    markers.push(n);
                }
            }
        }
    }
    if let Some(n) = current {
        markers.push(n);
    }

    markers
}

/// The footnote markers of a text with `count` footnotes.
///
/// Scans the superscript runs in order and takes each run that is the next
/// expected number (1, 2, ...). Any other run is read as a literal
/// superscript in the poem. A run numbered ahead of its turn but within
/// `count` is reported in `misplaced` as `(position, found, expected)`.
pub fn footnote_markers(text: &str, count: usize) -> FootnoteMarkers {
    let mut found = FootnoteMarkers::default();
    let mut expected: u32 = 1;

    for run in markers_in(text) {
        if run == expected {
            found.markers.push(run);
            expected += 1;
        } else if run > expected && run as usize <= count {
            found
                .misplaced
                .push((found.markers.len() + 1, run, expected));
        }
    }

    found
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FootnoteMarkers {
    pub markers: Vec<u32>,
    pub misplaced: Vec<(usize, u32, u32)>,
}
