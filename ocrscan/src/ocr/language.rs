use serde::Serialize;

pub const LABEL_ARABIC_AND_LATIN: &str = "Arabic & Latin";
pub const LABEL_ARABIC: &str = "Arabic";
pub const LABEL_LATIN: &str = "Latin";
pub const LABEL_UNKNOWN: &str = "Unknown";
pub const LABEL_OTHER: &str = "Other";

/// Arabic, Arabic Supplement, Arabic Extended-A, Presentation Forms-A and -B.
const ARABIC_RANGES: &[(u32, u32)] = &[
    (0x0600, 0x06FF),
    (0x0750, 0x077F),
    (0x08A0, 0x08FF),
    (0xFB50, 0xFDFF),
    (0xFE70, 0xFEFF),
];

/// Script membership of a piece of recognized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScriptInfo {
    pub has_arabic: bool,
    pub has_latin: bool,
    pub label: &'static str,
}

impl Default for ScriptInfo {
    fn default() -> Self {
        Self {
            has_arabic: false,
            has_latin: false,
            label: LABEL_UNKNOWN,
        }
    }
}

impl ScriptInfo {
    /// Whether the text should be laid out right-to-left.
    pub fn is_rtl(&self) -> bool {
        self.has_arabic
    }
}

pub fn is_arabic_char(c: char) -> bool {
    let cp = c as u32;
    ARABIC_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&cp))
}

pub fn contains_arabic(text: &str) -> bool {
    text.chars().any(is_arabic_char)
}

/// Basic Latin letters only; accented Latin is not counted.
pub fn contains_latin(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_alphabetic())
}

pub fn classify(text: &str) -> ScriptInfo {
    let has_arabic = contains_arabic(text);
    let has_latin = contains_latin(text);

    let label = match (has_arabic, has_latin) {
        (true, true) => LABEL_ARABIC_AND_LATIN,
        (true, false) => LABEL_ARABIC,
        (false, true) => LABEL_LATIN,
        (false, false) if text.trim().is_empty() => LABEL_UNKNOWN,
        (false, false) => LABEL_OTHER,
    };

    ScriptInfo {
        has_arabic,
        has_latin,
        label,
    }
}
