use std::sync::OnceLock;

use anyhow::bail;
use regex::{Captures, Regex};

/// `{{ env.VAR }}` or `{{ env.VAR | default("fallback") }}`
fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([A-Za-z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#).expect("must be valid regex")
    })
}

/// Substitute environment placeholders in raw config text
///
/// Runs before TOML parsing so config structs hold plain values. Comment
/// lines are copied untouched, so a commented-out key never requires its
/// variable to be set.
pub(crate) fn expand(input: &str) -> anyhow::Result<String> {
    let mut output = String::with_capacity(input.len());

    for line in input.split_inclusive('\n') {
        if line.trim_start().starts_with('#') {
            output.push_str(line);
            continue;
        }

        let mut last = 0;
        for captures in placeholder().captures_iter(line) {
            let Some(whole) = captures.get(0) else {
                continue;
            };

            output.push_str(&line[last..whole.start()]);
            output.push_str(&Placeholder::from_captures(&captures).resolve()?);
            last = whole.end();
        }
        output.push_str(&line[last..]);
    }

    Ok(output)
}

struct Placeholder<'a> {
    key: &'a str,
    default: Option<&'a str>,
}

impl<'a> Placeholder<'a> {
    fn from_captures(captures: &Captures<'a>) -> Self {
        Self {
            key: captures.get(1).map_or("", |m| m.as_str()),
            default: captures.get(2).map(|m| m.as_str()),
        }
    }

    fn resolve(&self) -> anyhow::Result<String> {
        let Some(var) = self.key.strip_prefix("env.").filter(|var| !var.contains('.')) else {
            bail!("only variables scoped with 'env.' are supported: `{}`", self.key);
        };

        match (std::env::var(var), self.default) {
            (Ok(value), _) => Ok(value),
            (Err(_), Some(default)) => Ok(default.to_string()),
            (Err(_), None) => bail!("environment variable not found: `{var}`"),
        }
    }
}
