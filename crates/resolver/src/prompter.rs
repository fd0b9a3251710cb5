//! Interactive value prompting.

use clibars_core::vars::{display_value, parse_literal};
use clibars_core::{AppError, AppResult};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};

/// Source of interactively supplied values.
pub trait Prompter {
    /// Ask for the value of `name`, offering `default`.
    ///
    /// The answer is coerced with the literal parser. Accepting the default
    /// returns it unchanged.
    fn ask(&mut self, name: &str, default: Option<&Value>) -> AppResult<Value>;

    /// Ask for a non-empty line of text, taken verbatim.
    fn ask_text(&mut self, label: &str) -> AppResult<String>;

    /// Ask a yes/no question. Anything but an explicit yes is a no.
    fn confirm(&mut self, message: &str) -> AppResult<bool>;
}

/// Line-oriented prompter over any reader/writer pair.
///
/// Questions go to `output`, answers are read one line at a time from
/// `input`:
/// - An empty line accepts the default; without a default the question is
///   asked again.
/// - End of input accepts the default, or fails with `AppError::Prompt`
///   when there is none.
#[derive(Debug)]
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

/// Prompter wired to the process console.
pub type ConsolePrompter = LinePrompter<Box<dyn BufRead>, Box<dyn Write>>;

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Consume the prompter and return its output sink.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Read one line without its terminator; `None` at end of input.
    fn read_line(&mut self) -> AppResult<Option<String>> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| AppError::Prompt(format!("failed to read input: {}", e)))?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }

    fn write_question(&mut self, question: &str) -> AppResult<()> {
        write!(self.output, "{}", question)
            .and_then(|_| self.output.flush())
            .map_err(|e| AppError::Prompt(format!("failed to write prompt: {}", e)))
    }
}

impl ConsolePrompter {
    /// Prompter for the current console.
    ///
    /// Questions are written to stderr so stdout stays reserved for
    /// rendered output. With `prefer_tty`, answers are read from the
    /// controlling terminal when one can be opened, which keeps prompting
    /// usable while stdin carries the template.
    pub fn console(prefer_tty: bool) -> Self {
        if prefer_tty {
            match open_tty() {
                Ok((input, output)) => {
                    tracing::debug!("Prompting on the controlling terminal");
                    let input: Box<dyn BufRead> = Box::new(BufReader::new(input));
                    let output: Box<dyn Write> = Box::new(output);
                    return LinePrompter::new(input, output);
                }
                Err(e) => tracing::debug!("No controlling terminal: {}", e),
            }
        }
        let input: Box<dyn BufRead> = Box::new(io::stdin().lock());
        let output: Box<dyn Write> = Box::new(io::stderr());
        LinePrompter::new(input, output)
    }
}

fn open_tty() -> io::Result<(File, File)> {
    let input = File::open("/dev/tty")?;
    let output = OpenOptions::new().write(true).open("/dev/tty")?;
    Ok((input, output))
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn ask(&mut self, name: &str, default: Option<&Value>) -> AppResult<Value> {
        let question = match default {
            Some(value) => format!("{} [{}]: ", name, display_value(value)),
            None => format!("{}: ", name),
        };

        loop {
            self.write_question(&question)?;
            match (self.read_line()?, default) {
                (None, Some(value)) => return Ok(value.clone()),
                (None, None) => {
                    return Err(AppError::Prompt(format!(
                        "no value for \"{}\" before end of input",
                        name
                    )))
                }
                (Some(line), Some(value)) if line.trim().is_empty() => return Ok(value.clone()),
                (Some(line), None) if line.trim().is_empty() => continue,
                (Some(line), _) => return Ok(parse_literal(&line)),
            }
        }
    }

    fn ask_text(&mut self, label: &str) -> AppResult<String> {
        let question = format!("{}: ", label);
        loop {
            self.write_question(&question)?;
            match self.read_line()? {
                None => {
                    return Err(AppError::Prompt(format!(
                        "no {} before end of input",
                        label
                    )))
                }
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => return Ok(line),
            }
        }
    }

    fn confirm(&mut self, message: &str) -> AppResult<bool> {
        self.write_question(&format!("{} [y/N]: ", message))?;
        let answer = self.read_line()?.unwrap_or_default();
        Ok(matches!(
            answer.trim().to_lowercase().as_str(),
            "y" | "yes"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    fn prompter(input: &str) -> LinePrompter<Cursor<Vec<u8>>, Vec<u8>> {
        LinePrompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_ask_parses_literals() {
        let mut p = prompter("123\n[\"a\"]\nLoic Coyle\n");
        assert_eq!(p.ask("n", None).unwrap(), json!(123));
        assert_eq!(p.ask("l", None).unwrap(), json!(["a"]));
        assert_eq!(p.ask("s", None).unwrap(), json!("Loic Coyle"));

        let shown = String::from_utf8(p.into_output()).unwrap();
        assert_eq!(shown, "n: l: s: ");
    }

    #[test]
    fn test_empty_line_accepts_default() {
        let mut p = prompter("\n");
        assert_eq!(p.ask("a", Some(&json!(1))).unwrap(), json!(1));
        assert_eq!(String::from_utf8(p.into_output()).unwrap(), "a [1]: ");
    }

    #[test]
    fn test_end_of_input() {
        let mut p = prompter("");
        assert_eq!(p.ask("a", Some(&json!("x"))).unwrap(), json!("x"));
        assert!(matches!(p.ask("b", None), Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_empty_line_without_default_asks_again() {
        let mut p = prompter("\n\nvalue\n");
        assert_eq!(p.ask("c", None).unwrap(), json!("value"));
        assert_eq!(String::from_utf8(p.into_output()).unwrap(), "c: c: c: ");
    }

    #[test]
    fn test_crlf_is_stripped() {
        let mut p = prompter("true\r\n");
        assert_eq!(p.ask("flag", None).unwrap(), json!(true));
    }

    #[test]
    fn test_ask_text_is_verbatim() {
        let mut p = prompter("\n\"x\"\nnull\n");
        assert_eq!(p.ask_text("variable_name").unwrap(), "\"x\"");
        assert_eq!(p.ask_text("variable_name").unwrap(), "null");
        assert!(matches!(p.ask_text("variable_name"), Err(AppError::Prompt(_))));
        assert_eq!(
            String::from_utf8(p.into_output()).unwrap(),
            "variable_name: ".repeat(4)
        );
    }

    #[test]
    fn test_confirm() {
        let mut p = prompter("y\nYES\nn\n\n");
        assert!(p.confirm("Overwrite?").unwrap());
        assert!(p.confirm("Overwrite?").unwrap());
        assert!(!p.confirm("Overwrite?").unwrap());
        assert!(!p.confirm("Overwrite?").unwrap());
        assert!(!p.confirm("Overwrite?").unwrap());
    }
}
