//! Interactive yes/no and free-text prompts.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};

/// Source of answers to interactive questions.
pub trait Prompter {
    /// Ask a yes/no question. An empty answer picks `default`.
    fn confirm(&mut self, question: &str, default: bool) -> bool;

    /// Ask for a line of text. `None` when no answer can be obtained.
    fn ask(&mut self, question: &str) -> Option<String>;

    /// Ask for a line of text that must not be echoed, such as a password.
    fn ask_secret(&mut self, question: &str) -> Option<String> {
        self.ask(question)
    }
}

/// Prompts on stderr, answers from stdin.
///
/// End of input answers "no" to every confirmation so an unattended run can
/// never spin in a retry loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    fn read_line(&self, prompt: &str) -> Option<String> {
        let mut stderr = io::stderr();
        let _ = write!(stderr, "{}", prompt);
        let _ = stderr.flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, question: &str, default: bool) -> bool {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let Some(answer) = self.read_line(&format!("{} {} ", question, hint)) else {
                return false;
            };
            match parse_yes_no(&answer) {
                Some(YesNo::Empty) => return default,
                Some(YesNo::Yes) => return true,
                Some(YesNo::No) => return false,
                None => eprintln!("Please answer yes or no"),
            }
        }
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        self.read_line(&format!("{}: ", question))
    }

    /// Reads with echo off when stdin is a terminal. Piped input is read as
    /// a plain line.
    fn ask_secret(&mut self, question: &str) -> Option<String> {
        let prompt = format!("{}: ", question);
        if !io::stdin().is_terminal() {
            return self.read_line(&prompt);
        }

        let mut stderr = io::stderr();
        let _ = write!(stderr, "{}", prompt);
        let _ = stderr.flush();
        let secret = read_secret_keys().unwrap_or_else(|e| {
            tracing::warn!("Failed to read from terminal: {}", e);
            None
        });
        let _ = writeln!(stderr);
        secret
    }
}

/// Puts the terminal back into cooked mode when dropped.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SecretKey {
    Continue,
    Submit,
    Cancel,
}

/// Apply one key press to the secret being typed.
fn apply_secret_key(secret: &mut String, key: KeyEvent) -> SecretKey {
    if key.kind != KeyEventKind::Press {
        return SecretKey::Continue;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => SecretKey::Submit,
        KeyCode::Esc => SecretKey::Cancel,
        KeyCode::Char('c' | 'd') if ctrl => SecretKey::Cancel,
        KeyCode::Char('u') if ctrl => {
            secret.clear();
            SecretKey::Continue
        }
        KeyCode::Backspace => {
            secret.pop();
            SecretKey::Continue
        }
        KeyCode::Char(c) => {
            secret.push(c);
            SecretKey::Continue
        }
        _ => SecretKey::Continue,
    }
}

fn read_secret_keys() -> io::Result<Option<String>> {
    let _raw = RawModeGuard::enable()?;
    let mut secret = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            match apply_secret_key(&mut secret, key) {
                SecretKey::Continue => {}
                SecretKey::Submit => return Ok(Some(secret)),
                SecretKey::Cancel => return Ok(None),
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum YesNo {
    Yes,
    No,
    Empty,
}

fn parse_yes_no(answer: &str) -> Option<YesNo> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" => Some(YesNo::Empty),
        "y" | "yes" => Some(YesNo::Yes),
        "n" | "no" => Some(YesNo::No),
        _ => None,
    }
}

/// Prompter with canned answers, for tests and non-interactive callers.
///
/// Confirmations beyond the scripted ones answer "no".
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    confirms: VecDeque<bool>,
    answers: VecDeque<String>,
    /// Every question asked, in order.
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(confirms: impl IntoIterator<Item = bool>) -> Self {
        Self {
            confirms: confirms.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answers.push_back(answer.into());
        self
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str, _default: bool) -> bool {
        self.asked.push(question.to_string());
        self.confirms.pop_front().unwrap_or(false)
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        self.asked.push(question.to_string());
        self.answers.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yes_no() {
        assert_eq!(parse_yes_no(""), Some(YesNo::Empty));
        assert_eq!(parse_yes_no("  Y "), Some(YesNo::Yes));
        assert_eq!(parse_yes_no("yes"), Some(YesNo::Yes));
        assert_eq!(parse_yes_no("NO"), Some(YesNo::No));
        assert_eq!(parse_yes_no("maybe"), None);
    }

    #[test]
    fn test_secret_keys_edit_and_submit() {
        let press = |code| KeyEvent::new(code, KeyModifiers::NONE);
        let mut secret = String::new();

        for c in "hunterX".chars() {
            let outcome = apply_secret_key(&mut secret, press(KeyCode::Char(c)));
            assert_eq!(outcome, SecretKey::Continue);
        }
        apply_secret_key(&mut secret, press(KeyCode::Backspace));
        apply_secret_key(&mut secret, press(KeyCode::Char('2')));

        let outcome = apply_secret_key(&mut secret, press(KeyCode::Enter));
        assert_eq!(outcome, SecretKey::Submit);
        assert_eq!(secret, "hunter2");
    }

    #[test]
    fn test_secret_keys_cancel_and_clear() {
        let ctrl = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
        let mut secret = "typo".to_string();

        assert_eq!(apply_secret_key(&mut secret, ctrl('u')), SecretKey::Continue);
        assert!(secret.is_empty());
        assert_eq!(apply_secret_key(&mut secret, ctrl('c')), SecretKey::Cancel);
        assert_eq!(
            apply_secret_key(&mut secret, KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
            SecretKey::Cancel
        );
    }

    #[test]
    fn test_scripted_prompter_runs_out_to_no() {
        let mut prompter = ScriptedPrompter::new([true]);
        assert!(prompter.confirm("edit again?", true));
        assert!(!prompter.confirm("edit again?", true));
        assert_eq!(prompter.asked.len(), 2);
    }
}
