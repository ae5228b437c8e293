/// Characters between the key and the end of a survey file stem.
const KEY_OFFSET_FROM_END: usize = 13;
const KEY_LEN: usize = 2;

/// Extracts the two-character section number from a survey file name.
///
/// `Befahrung_2023_01_Abschnitt.kml` style names carry the number 13
/// characters before the end of the stem. For stems shorter than that the
/// start and end of the slice are clamped to the beginning of the string, so a
/// 12-character stem yields its first character and anything shorter yields
/// an empty key.
///
/// Only a trailing `.kml` is removed; a `.kml` elsewhere in the name is kept
/// as part of the stem.
pub fn extract_key(filename: &str) -> String {
    let stem = filename.strip_suffix(".kml").unwrap_or(filename);
    let chars: Vec<char> = stem.chars().collect();
    let len = chars.len() as isize;

    let start = len - KEY_OFFSET_FROM_END as isize;
    let end = start + KEY_LEN as isize;
    let clamp = |i: isize| i.clamp(0, len) as usize;

    chars[clamp(start)..clamp(end)].iter().collect()
}
