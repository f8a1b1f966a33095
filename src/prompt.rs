//! Line-oriented terminal prompts
//!
//! Input is any `AsyncBufRead` so the wizard can be driven by a script in
//! tests. End of input is reported as `None` and treated as "quit".

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub struct Prompt<R, W> {
    input: R,
    out: W,
}

impl<R, W> Prompt<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    pub fn out(&mut self) -> &mut W {
        &mut self.out
    }

    /// Consume the prompt, returning the output sink
    pub fn into_output(self) -> W {
        self.out
    }

    /// Print `question` and read one trimmed line. `None` at end of input.
    pub async fn line(&mut self, question: &str) -> Result<Option<String>> {
        write!(self.out, "{question} ")?;
        self.out.flush()?;

        let mut buf = String::new();
        if self.input.read_line(&mut buf).await? == 0 {
            writeln!(self.out)?;
            return Ok(None);
        }
        Ok(Some(buf.trim().to_string()))
    }

    /// Like [`line`](Self::line), but an empty answer yields `default`.
    pub async fn with_default(&mut self, question: &str, default: &str) -> Result<Option<String>> {
        let answer = self.line(&format!("{question} [{default}]")).await?;
        Ok(answer.map(|a| if a.is_empty() { default.to_string() } else { a }))
    }

    /// Show a one-letter menu and read until a listed key is chosen.
    pub async fn choose(&mut self, options: &[(char, &str)]) -> Result<Option<char>> {
        loop {
            writeln!(self.out)?;
            for (key, label) in options {
                writeln!(self.out, "  [{key}] {label}")?;
            }
            let Some(answer) = self.line(">").await? else {
                return Ok(None);
            };
            let picked = answer.chars().next().map(|c| c.to_ascii_lowercase());
            match picked {
                Some(c) if options.iter().any(|(key, _)| *key == c) => return Ok(Some(c)),
                _ => writeln!(self.out, "Please choose one of the listed keys.")?,
            }
        }
    }
}
