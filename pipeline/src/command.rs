use std::borrow::Cow;
use std::fmt;
use std::path::Path;

/// Quote `s` for a POSIX shell, unless it only contains characters that need no quoting.
pub fn quote(s: &str) -> Cow<'_, str> {
    let is_safe = |c: char| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c);
    if !s.is_empty() && s.chars().all(is_safe) {
        return Cow::Borrowed(s);
    }
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for c in s.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    Cow::Owned(quoted)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Word {
    /// Trusted text from the run config (tool binaries, parameter strings),
    /// written verbatim so that multi-word values split the way the user wrote them.
    Raw(String),
    /// Any value derived from sample names or paths; always quoted.
    Quoted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joiner {
    Pipe,
    And,
}

/// A tool invocation, possibly piped into or chained with further invocations,
/// that renders to a single shell command string for `sbatch --wrap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    first: Vec<Word>,
    rest: Vec<(Joiner, Vec<Word>)>,
}

impl ShellCommand {
    /// Start a command with `program`, taken verbatim from the run config.
    pub fn new(program: &str) -> Self {
        Self {
            first: vec![Word::Raw(program.trim().to_owned())],
            rest: Vec::with_capacity(0),
        }
    }

    fn current(&mut self) -> &mut Vec<Word> {
        match self.rest.last_mut() {
            Some((_, words)) => words,
            None => &mut self.first,
        }
    }

    /// Append trusted config text verbatim. Empty text is skipped.
    pub fn raw(mut self, text: &str) -> Self {
        let text = text.trim();
        if !text.is_empty() {
            self.current().push(Word::Raw(text.to_owned()));
        }
        self
    }

    /// Append a single argument, quoted as needed.
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.current().push(Word::Quoted(arg.into()));
        self
    }

    /// Append a path argument, quoted as needed.
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        let path = path.as_ref().to_string_lossy().into_owned();
        self.arg(path)
    }

    /// Pipe the output of everything so far into `program`.
    pub fn pipe(mut self, program: &str) -> Self {
        self.rest
            .push((Joiner::Pipe, vec![Word::Raw(program.trim().to_owned())]));
        self
    }

    /// Run `program` only if everything so far succeeded.
    pub fn and_then(mut self, program: &str) -> Self {
        self.rest
            .push((Joiner::And, vec![Word::Raw(program.trim().to_owned())]));
        self
    }

    /// Render into `buf`, replacing its contents.
    pub fn render(&self, buf: &mut String) {
        buf.clear();
        write_words(&self.first, buf);
        for (joiner, words) in &self.rest {
            buf.push_str(match joiner {
                Joiner::Pipe => " | ",
                Joiner::And => " && ",
            });
            write_words(words, buf);
        }
    }
}

fn write_words(words: &[Word], buf: &mut String) {
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            buf.push(' ');
        }
        match word {
            Word::Raw(text) => buf.push_str(text),
            Word::Quoted(arg) => buf.push_str(&quote(arg)),
        }
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = String::with_capacity(128);
        self.render(&mut buf);
        f.write_str(&buf)
    }
}
