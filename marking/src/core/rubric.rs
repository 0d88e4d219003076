//! Rubric grades and their text format.
//!
//! A rubric holds one grade symbol per exercise slot. The on-disk format is
//! one `<slot-number>, <grade>` line per slot, 1-indexed.

use std::fmt;

/// Fixed-size ordered sequence of grade symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rubric {
    grades: Vec<char>,
}

/// A single applied "advance one letter" correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RubricEdit {
    pub slot: usize,
    pub from: char,
    pub to: char,
}

impl Rubric {
    pub fn new(grades: Vec<char>) -> Self {
        Self { grades }
    }

    /// Deterministic default: slot `i` gets `'A' + i`, wrapping after `Z`.
    pub fn default_for(slots: usize) -> Self {
        Self {
            grades: (0..slots).map(default_grade).collect(),
        }
    }

    /// Parse rubric text, filling missing or empty grades with defaults.
    ///
    /// The grade of a line is the first non-whitespace character after its
    /// first comma, or of the whole line when there is no comma. Lines past
    /// `slots` are ignored.
    pub fn parse(text: &str, slots: usize) -> Self {
        let mut lines = text.lines();
        let grades = (0..slots)
            .map(|slot| {
                lines
                    .next()
                    .and_then(parse_grade)
                    .unwrap_or_else(|| default_grade(slot))
            })
            .collect();
        Self { grades }
    }

    /// Render as `"{slot}, {grade}\n"` lines.
    pub fn render(&self) -> String {
        self.grades
            .iter()
            .enumerate()
            .map(|(slot, grade)| format!("{}, {}\n", slot + 1, grade))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.grades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }

    pub fn grade(&self, slot: usize) -> Option<char> {
        self.grades.get(slot).copied()
    }

    pub fn grades(&self) -> &[char] {
        &self.grades
    }

    /// Advance the grade at `slot` by one letter. Returns `None` when out of range.
    pub fn advance(&mut self, slot: usize) -> Option<RubricEdit> {
        let grade = self.grades.get_mut(slot)?;
        let from = *grade;
        let to = next_letter(from);
        *grade = to;
        Some(RubricEdit { slot, from, to })
    }

    /// Apply a recorded edit, checking that it starts from the current grade.
    pub fn replay(&mut self, edit: &RubricEdit) -> bool {
        match self.grades.get_mut(edit.slot) {
            Some(grade) if *grade == edit.from => {
                *grade = edit.to;
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for Rubric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.grades.iter().map(char::to_string).collect();
        write!(f, "{}", joined.join(","))
    }
}

/// Next letter in the same case, wrapping `Z -> A` and `z -> a`.
///
/// Symbols that are not ASCII letters restart at `A`.
pub fn next_letter(grade: char) -> char {
    match grade {
        'Z' => 'A',
        'z' => 'a',
        'A'..='Y' | 'a'..='y' => (grade as u8 + 1) as char,
        _ => 'A',
    }
}

fn default_grade(slot: usize) -> char {
    (b'A' + (slot % 26) as u8) as char
}

fn parse_grade(line: &str) -> Option<char> {
    let value = match line.split_once(',') {
        Some((_, rest)) => rest,
        None => line,
    };
    value.chars().find(|c| !c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_offset_from_a_by_slot() {
        let rubric = Rubric::default_for(5);
        assert_eq!(rubric.grades(), &['A', 'B', 'C', 'D', 'E']);
        assert_eq!(rubric.to_string(), "A,B,C,D,E");
    }

    #[test]
    fn defaults_wrap_after_z() {
        let rubric = Rubric::default_for(28);
        assert_eq!(rubric.grade(25), Some('Z'));
        assert_eq!(rubric.grade(26), Some('A'));
        assert_eq!(rubric.grade(27), Some('B'));
    }

    #[test]
    fn parse_fills_short_and_empty_lines_with_defaults() {
        let rubric = Rubric::parse("1, Q\n2,   \n3,R\n", 5);
        assert_eq!(rubric.grades(), &['Q', 'B', 'R', 'D', 'E']);
    }

    #[test]
    fn parse_uses_whole_line_without_comma_and_ignores_extra_lines() {
        let rubric = Rubric::parse("  X\n2, Y\n3, Z\n", 2);
        assert_eq!(rubric.grades(), &['X', 'Y']);
    }

    #[test]
    fn render_matches_file_format() {
        let rubric = Rubric::new(vec!['A', 'C']);
        assert_eq!(rubric.render(), "1, A\n2, C\n");
        assert_eq!(Rubric::parse(&rubric.render(), 2), rubric);
    }

    #[test]
    fn advance_wraps_and_reports_edit() {
        let mut rubric = Rubric::new(vec!['Z', 'b', '?']);
        assert_eq!(
            rubric.advance(0),
            Some(RubricEdit {
                slot: 0,
                from: 'Z',
                to: 'A'
            })
        );
        assert_eq!(rubric.advance(1).map(|edit| edit.to), Some('c'));
        assert_eq!(rubric.advance(2).map(|edit| edit.to), Some('A'));
        assert_eq!(rubric.advance(3), None);
    }

    #[test]
    fn replay_rejects_edit_from_stale_grade() {
        let mut rubric = Rubric::new(vec!['A']);
        let stale = RubricEdit {
            slot: 0,
            from: 'B',
            to: 'C',
        };
        assert!(!rubric.replay(&stale));
        assert!(rubric.replay(&RubricEdit {
            slot: 0,
            from: 'A',
            to: 'B'
        }));
        assert_eq!(rubric.grade(0), Some('B'));
    }
}
