// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared nom combinators for the text formats
//!
//! Numbers go through fast-float; nom handles the surrounding structure.

use std::borrow::Cow;

use nom::{
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1},
    combinator::{map_res, opt, recognize},
    error::{Error as NomError, ErrorKind},
    sequence::pair,
    IResult,
};

/// Skip horizontal whitespace (spaces and tabs, never newlines)
pub fn ws(input: &str) -> IResult<&str, ()> {
    let (rest, _) = take_while(|c: char| c == ' ' || c == '\t')(input)?;
    Ok((rest, ()))
}

/// Skip at least one horizontal whitespace character
pub fn ws1(input: &str) -> IResult<&str, ()> {
    let (rest, _) = take_while1(|c: char| c == ' ' || c == '\t')(input)?;
    Ok((rest, ()))
}

/// Parse a float: 3.14, -3, 1.5e-10, .5, 2.
pub fn float(input: &str) -> IResult<&str, f64> {
    match fast_float::parse_partial::<f64, _>(input) {
        Ok((value, consumed)) if consumed > 0 => Ok((&input[consumed..], value)),
        _ => Err(nom::Err::Error(NomError::new(input, ErrorKind::Float))),
    }
}

/// Parse a signed integer: 42, -42, +7
pub fn integer(input: &str) -> IResult<&str, i64> {
    map_res(
        recognize(pair(opt(nom::branch::alt((char('-'), char('+')))), digit1)),
        |s: &str| s.parse::<i64>(),
    )(input)
}

/// Parse a whitespace-separated run of floats, rejecting any other token
pub fn float_list(text: &str) -> Option<Vec<f64>> {
    text.split_ascii_whitespace()
        .map(|token| match float(token) {
            Ok(("", value)) if value.is_finite() => Some(value),
            _ => None,
        })
        .collect()
}

/// Parse a whitespace-separated run of integers, rejecting any other token
pub fn integer_list(text: &str) -> Option<Vec<i64>> {
    text.split_ascii_whitespace()
        .map(|token| match integer(token) {
            Ok(("", value)) => Some(value),
            _ => None,
        })
        .collect()
}

/// Iterate logical lines as `(1-based line number, text)`.
///
/// A trailing backslash joins the next physical line. The reported number
/// is the line where the logical line starts.
pub fn logical_lines(text: &str) -> LogicalLines<'_> {
    LogicalLines {
        lines: text.lines().enumerate(),
    }
}

pub struct LogicalLines<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Iterator for LogicalLines<'a> {
    type Item = (usize, Cow<'a, str>);

    fn next(&mut self) -> Option<Self::Item> {
        let (index, first) = self.lines.next()?;
        let first = first.trim_end();
        let Some(stripped) = first.strip_suffix('\\') else {
            return Some((index + 1, Cow::Borrowed(first)));
        };

        let mut joined = String::from(stripped);
        for (_, line) in self.lines.by_ref() {
            let line = line.trim_end();
            joined.push(' ');
            match line.strip_suffix('\\') {
                Some(more) => joined.push_str(more),
                None => {
                    joined.push_str(line);
                    break;
                }
            }
        }
        Some((index + 1, Cow::Owned(joined)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float() {
        assert_eq!(float("3.14 rest"), Ok((" rest", 3.14)));
        assert_eq!(float("-1.5e-3"), Ok(("", -1.5e-3)));
        assert_eq!(float("2"), Ok(("", 2.0)));
        assert!(float("abc").is_err());
    }

    #[test]
    fn test_integer() {
        assert_eq!(integer("-12/3"), Ok(("/3", -12)));
        assert_eq!(integer("+7"), Ok(("", 7)));
        assert!(integer("x").is_err());
    }

    #[test]
    fn test_lists() {
        assert_eq!(float_list(" 1 2.5\n-3 "), Some(vec![1.0, 2.5, -3.0]));
        assert_eq!(float_list("1 nope 3"), None);
        assert_eq!(integer_list("0 1 2"), Some(vec![0, 1, 2]));
        assert_eq!(integer_list("0 1.5"), None);
        assert_eq!(float_list(""), Some(vec![]));
    }

    #[test]
    fn test_logical_lines_join_continuations() {
        let text = "v 0 0 0\nf 1 2 \\\n  3\n# end";
        let lines: Vec<_> = logical_lines(text).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].0, 2);
        assert_eq!(lines[1].1.split_whitespace().collect::<Vec<_>>(), ["f", "1", "2", "3"]);
        assert_eq!(lines[2].0, 4);
    }
}
