//! Opening a match in the user's editor through the configured command template.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone)]
pub struct EditorCommand {
    template: String,
}

impl EditorCommand {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Expand `{line}`, `{file}` and `{pattern}`. Bare `%s`/`%d` are filled
    /// positionally (line, file, pattern) for printf-style templates; `%%` is a `%`.
    /// File and pattern are shell-quoted.
    pub fn render(&self, file: &Path, line: usize, pattern: &str) -> String {
        let values = [
            line.to_string(),
            shell_quote(&file.to_string_lossy()),
            shell_quote(pattern),
        ];
        let mut out = String::with_capacity(self.template.len() + 32);
        let mut positional = 0;
        let mut rest = self.template.as_str();

        while let Some(c) = rest.chars().next() {
            let named = [("{line}", 0), ("{file}", 1), ("{pattern}", 2)]
                .into_iter()
                .find(|(token, _)| rest.starts_with(token));
            if let Some((token, slot)) = named {
                out.push_str(&values[slot]);
                rest = &rest[token.len()..];
                continue;
            }
            if rest.starts_with("%%") {
                out.push('%');
                rest = &rest[2..];
                continue;
            }
            if (rest.starts_with("%s") || rest.starts_with("%d")) && positional < values.len() {
                out.push_str(&values[positional]);
                positional += 1;
                rest = &rest[2..];
                continue;
            }
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
        out
    }

    /// Run the expanded command through the shell and wait for it.
    pub fn launch(&self, file: &Path, line: usize, pattern: &str) -> Result<()> {
        let command = self.render(file, line, pattern);
        let status = shell(&command)
            .status()
            .with_context(|| format!("cannot run editor: {command}"))?;
        if !status.success() {
            bail!("editor exited with {status}: {command}");
        }
        Ok(())
    }
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// Single-quote for a POSIX shell.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
