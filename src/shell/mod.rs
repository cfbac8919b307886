//! Numbered-menu front end.
//!
//! Each menu is a static table mapping a choice to a command. The loop reads a
//! choice, looks it up, and hands the command to a handler; an unknown choice
//! reprints the menu. Handlers talk to the user only through a [`Console`], so a
//! whole session can be driven from an in-memory buffer.

pub mod heights;
pub mod students;

use std::fmt;
use std::io::{self, BufRead, Write};

use crate::Error;

/// Line-oriented input and output for a shell session.
pub struct Console<I, O> {
    input: I,
    output: O,
}

impl<I: BufRead, O: Write> Console<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }

    /// Prints `label` and reads one trimmed line. End of input is reported as
    /// [`io::ErrorKind::UnexpectedEof`].
    pub fn prompt(&mut self, label: &str) -> io::Result<String> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim().to_string())
    }

    pub fn say<D: fmt::Display>(&mut self, text: D) -> io::Result<()> {
        writeln!(self.output, "{}", text)
    }

    pub fn into_output(self) -> O {
        self.output
    }
}

/// One line of a menu.
pub struct MenuEntry<C> {
    pub choice: &'static str,
    pub command: C,
    pub label: &'static str,
}

pub fn lookup<C: Copy>(entries: &[MenuEntry<C>], choice: &str) -> Option<C> {
    entries.iter().find(|e| e.choice == choice.trim()).map(|e| e.command)
}

pub fn render_menu<C>(title: &str, entries: &[MenuEntry<C>]) -> String {
    let rule = "=".repeat(60);
    let mut out = format!("\n{}\n{}\n{}\n", rule, title, rule);
    for entry in entries {
        out.push_str(&format!("{}. {}\n", entry.choice, entry.label));
    }
    out.push_str(&rule);
    out
}

/// What the loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Runs a menu until the exit command or end of input.
///
/// Store and validation errors from a handler are printed and the loop goes on;
/// only console I/O errors end the session with an error.
pub fn run_menu<C, I, O, H>(
    console: &mut Console<I, O>,
    title: &str,
    entries: &[MenuEntry<C>],
    mut handle: H,
) -> io::Result<()>
where
    C: Copy,
    I: BufRead,
    O: Write,
    H: FnMut(&mut Console<I, O>, C) -> crate::Result<Flow>,
{
    let last = entries.last().map(|e| e.choice).unwrap_or("1");
    loop {
        console.say(render_menu(title, entries))?;
        let choice = match console.prompt(&format!("Enter your choice (1-{}): ", last)) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        };

        let Some(command) = lookup(entries, &choice) else {
            console.say(format!("Invalid choice. Please enter a number between 1 and {}.", last))?;
            continue;
        };

        match handle(console, command) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => return Ok(()),
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(Error::Io(e)) => return Err(e),
            Err(e) => console.say(format!("Error: {}", e))?,
        }
    }
}

/// Parses a prompted number, printing a message and returning `None` when the
/// input is not a number.
pub(crate) fn read_number<T, I, O>(console: &mut Console<I, O>, label: &str) -> io::Result<Option<T>>
where
    T: std::str::FromStr,
    I: BufRead,
    O: Write,
{
    let raw = console.prompt(label)?;
    match raw.parse::<T>() {
        Ok(n) => Ok(Some(n)),
        Err(_) => {
            console.say("Error: Invalid input.")?;
            Ok(None)
        }
    }
}
