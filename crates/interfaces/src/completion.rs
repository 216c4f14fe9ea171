//! Tab completion for the line editor: command names in the first word,
//! file paths everywhere else.

use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

pub struct ShellHelper {
    commands: Vec<String>,
    files: FilenameCompleter,
}

impl ShellHelper {
    pub fn new(commands: &[&str]) -> Self {
        let mut commands: Vec<String> = commands.iter().map(|c| c.to_string()).collect();
        commands.sort();
        commands.dedup();
        Self {
            commands,
            files: FilenameCompleter::new(),
        }
    }

    /// Candidates for the command word, or `None` once the cursor is past it.
    pub fn complete_command(&self, line: &str, pos: usize) -> Option<(usize, Vec<Pair>)> {
        let head = &line[..pos];
        let start = head.len() - head.trim_start().len();
        let word = &head[start..];
        if word.contains(char::is_whitespace) {
            return None;
        }

        let candidates = self
            .commands
            .iter()
            .filter(|c| c.starts_with(word))
            .map(|c| Pair {
                display: c.clone(),
                replacement: format!("{} ", c),
            })
            .collect();
        Some((start, candidates))
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        match self.complete_command(line, pos) {
            Some(found) => Ok(found),
            None => self.files.complete_path(line, pos),
        }
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}
