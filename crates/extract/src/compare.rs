//! Natural (numeric-aware) ordering of file and entry names.
//!
//! `page2` sorts before `page10`, and case only breaks ties.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Compares two names the way a person would order them.
///
/// Runs of ASCII digits compare by numeric value, so leading zeros are
/// ignored and arbitrarily long runs never overflow. Everything else compares
/// case-insensitively. Names that are equal under those rules fall back to a
/// plain byte comparison so the ordering stays total.
///
/// ```
/// use tankobon_extract::natural_cmp;
///
/// let mut pages = vec!["page10.png", "Page2.png", "page1.png"];
/// pages.sort_by(|a, b| natural_cmp(a, b));
/// assert_eq!(pages, vec!["page1.png", "Page2.png", "page10.png"]);
/// ```
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_digits = take_digits(&mut left);
                let r_digits = take_digits(&mut right);
                match compare_numbers(&l_digits, &r_digits) {
                    Ordering::Equal => {},
                    other => return other,
                }
            },
            (Some(l), Some(r)) => {
                left.next();
                right.next();
                match l.to_lowercase().cmp(r.to_lowercase()) {
                    Ordering::Equal => {},
                    other => return other,
                }
            },
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        digits.push(c);
    }
    digits
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sorted(mut names: Vec<&str>) -> Vec<&str> {
        names.sort_by(|a, b| natural_cmp(a, b));
        names
    }

    #[test]
    fn test_numeric_runs() {
        assert_eq!(
            sorted(vec!["page10", "page2", "page1"]),
            vec!["page1", "page2", "page10"]
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(sorted(vec!["b.png", "A.png", "c.png"]), vec!["A.png", "b.png", "c.png"]);
    }

    #[test]
    fn test_leading_zeros_and_long_runs() {
        assert_eq!(
            sorted(vec!["99999999999999999999999.png", "010.png", "9.png"]),
            vec!["9.png", "010.png", "99999999999999999999999.png"]
        );
    }

    #[test]
    fn test_nested_entries() {
        assert_eq!(
            sorted(vec!["ch2/p10.jpg", "ch10/p1.jpg", "ch2/p9.jpg"]),
            vec!["ch2/p9.jpg", "ch2/p10.jpg", "ch10/p1.jpg"]
        );
    }

    #[rstest]
    #[case("a", "a", Ordering::Equal)]
    #[case("a", "A", Ordering::Greater)]
    #[case("01", "1", Ordering::Less)]
    #[case("page", "page1", Ordering::Less)]
    #[case("x2y", "x2z", Ordering::Less)]
    fn test_ties_are_total(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(natural_cmp(a, b), expected);
        assert_eq!(natural_cmp(b, a), expected.reverse());
    }
}
