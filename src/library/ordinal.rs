use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

use super::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};

/// Ordinal for names without any digits, so they sort last
pub const NO_ORDINAL: u64 = 9999;

// ASCII only: other Unicode decimal digits do not count as numbering
static RE_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

/// First run of ASCII digits in `text`, or [`NO_ORDINAL`]
///
/// A trailing video or image extension is ignored, so the "4" of ".mp4"
/// never numbers an episode.
///
/// "S01E05 - Piloto.mp4" -> 1, "Temporada 02" -> 2, "extras.mp4" -> 9999.
/// Runs too long for a u64 saturate instead of failing.
pub fn extract_ordinal(text: &str) -> u64 {
    RE_DIGITS
        .find(strip_media_extension(text))
        .map(|m| m.as_str().parse().unwrap_or(u64::MAX))
        .unwrap_or(NO_ORDINAL)
}

fn strip_media_extension(text: &str) -> &str {
    VIDEO_EXTENSIONS
        .iter()
        .chain(IMAGE_EXTENSIONS)
        .find_map(|ext| {
            let split = text.len().checked_sub(ext.len())?;
            let suffix = text.get(split..)?;
            suffix
                .eq_ignore_ascii_case(ext)
                .then(|| &text[..split])
        })
        .unwrap_or(text)
}

/// Sort order for seasons and episodes: ordinal first, then the name itself
pub fn ordinal_cmp(a: &str, b: &str) -> Ordering {
    extract_ordinal(a)
        .cmp(&extract_ordinal(b))
        .then_with(|| a.cmp(b))
}
