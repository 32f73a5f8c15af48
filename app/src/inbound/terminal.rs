//! Line-oriented terminal front end.
//!
//! Each stdin line becomes one or more [`InputEvent`]s:
//!
//! - `:signin`, `:signout`, and `:quit` activate the matching control and
//!   discard any continued note text.
//! - A line ending in `\` is continued: its text and a line break join the
//!   note input and Shift+Enter is pressed.
//! - Any other line completes the note input and presses Enter.
//!
//! End of input quits. Views are drawn as plain text.

use std::io::{self, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::domain::{InputEvent, KeyPress, NotesPage, View};

const CONTINUATION: char = '\\';

/// Turns input lines into input events, remembering continued lines.
#[derive(Debug, Default)]
pub struct LineInterpreter {
    pending: String,
}

impl LineInterpreter {
    /// Interpret one line, without its terminator.
    ///
    /// # Examples
    /// ```
    /// use notes::domain::{InputEvent, KeyPress};
    /// use notes::inbound::terminal::LineInterpreter;
    ///
    /// let mut lines = LineInterpreter::default();
    /// assert_eq!(lines.interpret(":quit"), [InputEvent::Quit]);
    /// assert_eq!(
    ///     lines.interpret("Hello"),
    ///     [InputEvent::Edit("Hello".into()), InputEvent::Key(KeyPress::enter())]
    /// );
    /// ```
    pub fn interpret(&mut self, line: &str) -> Vec<InputEvent> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let command = match line.trim() {
            ":signin" => Some(InputEvent::SignIn),
            ":signout" => Some(InputEvent::SignOut),
            ":quit" => Some(InputEvent::Quit),
            _ => None,
        };
        if let Some(command) = command {
            // Continued text never outlives a control.
            self.pending.clear();
            return vec![command];
        }

        if let Some(continued) = line.strip_suffix(CONTINUATION) {
            self.pending.push_str(continued);
            self.pending.push('\n');
            return vec![
                InputEvent::Edit(self.pending.clone()),
                InputEvent::Key(KeyPress::shift_enter()),
            ];
        }

        self.pending.push_str(line);
        vec![
            InputEvent::Edit(std::mem::take(&mut self.pending)),
            InputEvent::Key(KeyPress::enter()),
        ]
    }
}

/// Forward every line of `reader` into `events` until input ends, then quit.
pub async fn forward_input<R>(reader: R, events: UnboundedSender<InputEvent>) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut interpreter = LineInterpreter::default();
    while let Some(line) = lines.next_line().await? {
        for event in interpreter.interpret(&line) {
            if events.send(event).is_err() {
                debug!("event loop stopped; no longer reading input");
                return Ok(());
            }
        }
    }
    if events.send(InputEvent::Quit).is_err() {
        debug!("event loop stopped before end of input");
    }
    Ok(())
}

/// Draw `view` as plain text.
pub fn draw<W: Write>(out: &mut W, view: &View) -> io::Result<()> {
    match view {
        View::Resolving { message } => writeln!(out, "{message}")?,
        View::SignIn { label } => writeln!(out, "[ {label} ]  (:signin)")?,
        View::Notes(page) => draw_notes(out, page)?,
    }
    writeln!(out)?;
    out.flush()
}

fn draw_notes<W: Write>(out: &mut W, page: &NotesPage) -> io::Result<()> {
    writeln!(out, "== {} ==", page.heading)?;
    writeln!(out, "{}  [ {} ]  (:signout)", page.email, page.sign_out_label)?;

    let cursor = if page.composer.focused { '>' } else { ' ' };
    if page.composer.text.is_empty() {
        writeln!(out, "{cursor} ({})", page.composer.placeholder)?;
    } else {
        for line in page.composer.text.lines() {
            writeln!(out, "{cursor} {line}")?;
        }
    }

    for card in &page.notes {
        writeln!(out, "* {}", card.timestamp)?;
        for line in card.text.lines() {
            writeln!(out, "    {line}")?;
        }
    }
    Ok(())
}
