/// Reads a price out of free-form listing text such as `"12,900원"`.
///
/// All non-digit characters are discarded and the remaining digits are
/// parsed as one number. Returns `None` when no digits remain or the
/// number does not fit in a `u64`.
pub fn extract_price(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
