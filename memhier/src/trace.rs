use lazy_static::lazy_static;
use regex::Regex;
use crate::error::{Error, Result};

lazy_static! {
    static ref ACCESS_PATTERN: Regex = Regex::new(
        r"^(?i:(?P<read>r)|(?P<write>w))\s+(?P<address>0[xX][0-9a-fA-F]+|[0-9]+)(?:\s+(?P<word>0[xX][0-9a-fA-F]+|[0-9]+))?$"
    ).unwrap();
}

/// A single access from a trace
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Access {
    Read { address: u64 },
    Write { address: u64, word: u64 },
}

/// Parses a decimal or 0x prefixed hexadecimal number
fn parse_number(text: &str) -> Option<u64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// Parses one trace line. Blank lines and `#` comments give None
///
/// # Examples
///
/// ```
/// use memhier::trace::{parse_line, Access};
/// assert_eq!(parse_line("W 0x10 170", 1).unwrap(), Some(Access::Write { address: 16, word: 170 }));
/// assert_eq!(parse_line("# comment", 2).unwrap(), None);
/// ```
pub fn parse_line(text: &str, line: usize) -> Result<Option<Access>> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }
    let trace_error = |reason: &str| Error::Trace { line, reason: reason.to_string() };
    let captures = ACCESS_PATTERN
        .captures(text)
        .ok_or_else(|| trace_error("expected `R <address>` or `W <address> <word>`"))?;
    // The pattern guarantees the address group is present
    let address = parse_number(&captures["address"]).ok_or_else(|| trace_error("address doesn't fit in 64 bits"))?;
    let word = captures.name("word").map(|m| parse_number(m.as_str()));
    match (captures.name("write").is_some(), word) {
        (false, None) => Ok(Some(Access::Read { address })),
        (false, Some(_)) => Err(trace_error("reads don't take a word")),
        (true, Some(Some(word))) => Ok(Some(Access::Write { address, word })),
        (true, Some(None)) => Err(trace_error("word doesn't fit in 64 bits")),
        (true, None) => Err(trace_error("writes need a word")),
    }
}

/// Parses a whole trace, stopping at the first malformed line
pub fn parse_trace(text: &str) -> Result<Vec<Access>> {
    let mut out = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if let Some(access) = parse_line(line, i + 1)? {
            out.push(access);
        }
    }
    Ok(out)
}
