//! Interactive failure browser
//!
//! Shows one failure at a time. Up and Down move between failures, moving
//! past the last one or pressing Esc leaves the browser.

use crate::reporter::failure_heading;
use anyhow::Result;
use colored::*;
use crossterm::{
    cursor::MoveTo,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use std::io::{self, Write};

/// Browser state over a list of failure messages
#[derive(Debug)]
pub struct FailureBrowser<'a> {
    failures: &'a [String],
    current: usize,
    done: bool,
}

impl<'a> FailureBrowser<'a> {
    pub fn new(failures: &'a [String]) -> Self {
        Self {
            failures,
            current: 0,
            done: failures.is_empty(),
        }
    }

    /// Index of the failure on screen
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Apply one key press
    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        match key {
            KeyCode::Esc => self.done = true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => self.done = true,
            KeyCode::Up => self.current = self.current.saturating_sub(1),
            KeyCode::Down => {
                self.current += 1;
                if self.current >= self.failures.len() {
                    self.done = true;
                }
            }
            _ => {}
        }
    }

    /// Heading and message of the current failure
    pub fn page(&self) -> Option<(String, &str)> {
        let message = self.failures.get(self.current)?;
        Some((
            failure_heading(self.current, self.failures.len()),
            message.as_str(),
        ))
    }
}

/// Browse `failures` on the terminal until the user leaves
pub fn browse(failures: &[String]) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    let res = browse_loop(&mut FailureBrowser::new(failures), &mut stdout);
    disable_raw_mode()?;
    writeln!(stdout)?;

    res
}

fn browse_loop(browser: &mut FailureBrowser<'_>, stdout: &mut io::Stdout) -> Result<()> {
    while !browser.is_done() {
        if let Some((heading, message)) = browser.page() {
            execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
            // Raw mode does not translate newlines
            write!(stdout, "{}\r\n", heading.red().bold())?;
            for line in message.lines() {
                write!(stdout, "{}\r\n", line)?;
            }
            write!(stdout, "\r\n{}\r\n", "Up/Down to move, Esc to quit".dimmed())?;
            stdout.flush()?;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                browser.handle_key(key.code, key.modifiers);
            }
        }
    }

    Ok(())
}
