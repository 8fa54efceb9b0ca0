use std::io::{self, BufRead, Write};

use anyhow::Result;

/// Asks on stderr and reads one line from stdin. End of input counts as no.
pub(crate) fn prompt_proceed(name: &str) -> Result<bool> {
    let mut stderr = io::stderr().lock();
    write!(stderr, "Proceed with {name} cleanup? [y/N]: ")?;
    stderr.flush()?;

    let mut input = String::new();
    let mut stdin = io::stdin().lock();
    let n = stdin.read_line(&mut input)?;
    if n == 0 {
        return Ok(false);
    }
    Ok(parse_answer(&input))
}

pub(crate) fn parse_answer(input: &str) -> bool {
    let s = input.trim().to_ascii_lowercase();
    matches!(s.as_str(), "y" | "yes")
}
