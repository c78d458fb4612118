//! Generated shell scripts

use std::fmt;

/// Interpreter directive every generated script starts with
pub const INTERPRETER: &str = "#!/bin/bash";

/// An ordered list of shell command lines
///
/// Scripts carry no error trapping: a failing line does not stop the ones
/// after it, which is the plain bash default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    lines: Vec<String>,
}

impl Script {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Appends one command line
    pub fn push(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    /// Command lines, without the interpreter directive
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Full script text: interpreter line, then one newline-terminated command per line
    pub fn render(&self) -> String {
        let mut text = String::with_capacity(
            INTERPRETER.len() + 1 + self.lines.iter().map(|l| l.len() + 1).sum::<usize>(),
        );
        text.push_str(INTERPRETER);
        text.push('\n');
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}

impl<S: Into<String>> FromIterator<S> for Script {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let script: Script = ["echo one", "echo two"].into_iter().collect();
        assert_eq!(script.render(), "#!/bin/bash\necho one\necho two\n");
    }

    #[test]
    fn test_empty_script_is_just_interpreter() {
        assert_eq!(Script::new().render(), "#!/bin/bash\n");
    }
}
