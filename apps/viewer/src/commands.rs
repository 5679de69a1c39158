//! Line commands standing in for browser input events.

use anyhow::{anyhow, bail, Context, Result};
use shared::domain::FormField;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Key(char),
    /// Pointer position relative to the surface origin, in pixels.
    Click { x: f64, y: f64 },
    /// Edits the form without submitting it.
    Set(Vec<(FormField, String)>),
    /// Applies the edits, then submits the whole form.
    Submit(Vec<(FormField, String)>),
    Wait,
    Status,
    Quit,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Key(_) => "key",
            Command::Click { .. } => "click",
            Command::Set(_) => "set",
            Command::Submit(_) => "submit",
            Command::Wait => "wait",
            Command::Status => "status",
            Command::Quit => "quit",
        }
    }
}

/// Blank lines and `#` comments parse to `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    if let Some(key) = single_char(line) {
        return Ok(Some(Command::Key(key)));
    }

    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_ascii_lowercase();
    let rest: Vec<&str> = words.collect();

    let command = match verb.as_str() {
        "key" => match rest.as_slice() {
            [key] => Command::Key(single_char(key).ok_or_else(|| anyhow!("usage: key <char>"))?),
            _ => bail!("usage: key <char>"),
        },
        "click" => match rest.as_slice() {
            [x, y] => Command::Click {
                x: parse_coordinate(x)?,
                y: parse_coordinate(y)?,
            },
            _ => bail!("usage: click <x> <y>"),
        },
        "set" => {
            if rest.is_empty() {
                bail!("usage: set <field>=<value> ...");
            }
            Command::Set(parse_assignments(&rest)?)
        }
        "submit" => Command::Submit(parse_assignments(&rest)?),
        "wait" => Command::Wait,
        "status" => Command::Status,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command '{other}'"),
    };
    Ok(Some(command))
}

fn single_char(word: &str) -> Option<char> {
    let mut chars = word.chars();
    match (chars.next(), chars.next()) {
        (Some(key), None) => Some(key),
        _ => None,
    }
}

fn parse_coordinate(raw: &str) -> Result<f64> {
    let value: f64 = raw
        .parse()
        .with_context(|| format!("invalid coordinate '{raw}'"))?;
    if !value.is_finite() {
        bail!("invalid coordinate '{raw}'");
    }
    Ok(value)
}

fn parse_assignments(words: &[&str]) -> Result<Vec<(FormField, String)>> {
    words
        .iter()
        .map(|word| -> Result<(FormField, String)> {
            let (name, value) = word
                .split_once('=')
                .ok_or_else(|| anyhow!("expected <field>=<value>, got '{word}'"))?;
            let field: FormField = name.parse()?;
            Ok((field, value.to_string()))
        })
        .collect()
}
