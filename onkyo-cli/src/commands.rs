//! Host commands typed on stdin.

use anyhow::{anyhow, Context, Result};
use onkyo_engine::UnitId;

/// One line of input: `<unit> <On|Off|Set Level> [level]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub unit: UnitId,
    pub command: String,
    pub level: u32,
}

impl CommandLine {
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let unit = words
            .next()
            .ok_or_else(|| anyhow!("Empty command"))?
            .parse()
            .context("Unit must be a number between 0 and 255")?;

        let rest: Vec<&str> = words.collect();
        let (command, level) = match rest.as_slice() {
            [word] => (word.to_string(), 0),
            ["Set", "Level", level] => (
                "Set Level".to_string(),
                level.parse().context("Level must be a non-negative number")?,
            ),
            _ => return Err(anyhow!("Expected <unit> <On|Off|Set Level> [level]")),
        };

        Ok(Self { unit, command, level })
    }
}
