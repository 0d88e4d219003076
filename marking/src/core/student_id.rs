//! Student number extraction from exam text.

use std::sync::LazyLock;

use regex::Regex;

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?)(\d+)").expect("valid student number pattern"));

/// Return the student number from the first line that starts with an integer.
///
/// Leading whitespace is skipped and anything after the digits is ignored,
/// so `"  0042 Jane"` yields `42`. Lines that do not start with an integer
/// are skipped. The first integer line decides: a negative number, or one
/// that does not fit in `u32`, yields `None` rather than a later line.
pub fn parse_student_id(text: &str) -> Option<u32> {
    let caps = text.lines().find_map(|line| LEADING_NUMBER.captures(line))?;
    if &caps[1] == "-" {
        return None;
    }
    caps[2].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_numeric_line_wins() {
        let text = "\n   \nName: Jane\n  0042 Jane Doe\n7\n";
        assert_eq!(parse_student_id(text), Some(42));
    }

    #[test]
    fn missing_number_is_none() {
        assert_eq!(parse_student_id("no numbers here\nQ1.\n"), None);
        assert_eq!(parse_student_id(""), None);
    }

    #[test]
    fn negative_first_number_is_none() {
        assert_eq!(parse_student_id("-12\n42\n"), None);
        assert_eq!(parse_student_id("Name: Jane\n  -7\n42\n"), None);
    }

    #[test]
    fn explicit_plus_sign_is_accepted() {
        assert_eq!(parse_student_id("+0042\n"), Some(42));
    }

    #[test]
    fn overflowing_first_number_is_none() {
        assert_eq!(parse_student_id("99999999999\n15\n"), None);
    }
}
