//! List row windows
//!
//! Expression form `{selector}!{startRow}-[{endRow}]`: when the selector
//! matches the current list path, iteration fast-forwards to `startRow`
//! and halts at `endRow` (inclusive start, exclusive end, `-1` or absent
//! end means unbounded).

use crate::constraints::{rel_idents, Constraint};
use crate::errors::{Result, TrellisError};
use crate::node::ListRequest;

const USAGE: &str = "range expression format {selector}!{startRow}-[{endRow}]";

pub struct ListRange {
    base: usize,
    selector: Vec<String>,
    start: i64,
    end: i64,
}

impl ListRange {
    pub fn parse(base: usize, expression: &str) -> Result<Self> {
        let syntax = || TrellisError::PathSyntax {
            reason: USAGE.to_string(),
        };
        let (selector_str, rows) = expression.split_once('!').ok_or_else(syntax)?;
        let selector: Vec<String> = selector_str
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        let (start_str, end_str) = match rows.split_once('-') {
            Some((s, e)) => (s, Some(e)),
            None => (rows, None),
        };
        let start: i64 = start_str.parse().map_err(|_| syntax())?;
        let end: i64 = match end_str {
            Some(e) if !e.is_empty() => e.parse().map_err(|_| syntax())?,
            _ => -1,
        };
        Ok(ListRange {
            base,
            selector,
            start,
            end,
        })
    }
}

impl Constraint for ListRange {
    fn check_list_pre(&self, r: &mut ListRequest) -> Result<bool> {
        let rel = rel_idents(r.sel.path(), self.base);
        if rel != self.selector {
            return Ok(true);
        }
        if r.first {
            r.set_start_row(self.start);
        } else if self.end >= 0 && r.row >= self.end {
            return Ok(false);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        let lr = ListRange::parse(0, "p!2-5").unwrap();
        assert_eq!(lr.selector, vec!["p"]);
        assert_eq!((lr.start, lr.end), (2, 5));

        let lr = ListRange::parse(0, "p/q!10-").unwrap();
        assert_eq!(lr.selector, vec!["p", "q"]);
        assert_eq!((lr.start, lr.end), (10, -1));

        assert!(ListRange::parse(0, "p").is_err());
        assert!(ListRange::parse(0, "p!x-2").is_err());
    }
}
