//! Note input buffer and its submit trigger.

use crate::domain::NoteText;

/// Keys the composer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// The commit key.
    Enter,
    /// Any printable character.
    Character(char),
    /// Anything else.
    Other,
}

/// A key press with the modifier that turns a commit into a line break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    /// Key that went down.
    pub key: Key,
    /// Shift (the "extend" modifier) was held.
    pub shift: bool,
}

impl KeyPress {
    /// Plain Enter.
    pub const fn enter() -> Self {
        Self {
            key: Key::Enter,
            shift: false,
        }
    }

    /// Shift+Enter.
    pub const fn shift_enter() -> Self {
        Self {
            key: Key::Enter,
            shift: true,
        }
    }

    fn commits(self) -> bool {
        self.key == Key::Enter && !self.shift
    }
}

/// Mutable text buffer backing the note input.
///
/// The buffer has no length cap. [`Composer::handle_key`] is the only way a
/// note leaves the composer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composer {
    buffer: String,
    focused: bool,
}

impl Composer {
    /// Current buffer contents.
    pub fn text(&self) -> &str {
        self.buffer.as_str()
    }

    /// Replace the buffer with the input's current contents.
    pub fn edit(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
    }

    /// Whether the input holds focus.
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Give the input focus.
    pub fn focus(&mut self) {
        self.focused = true;
    }

    /// React to a key press.
    ///
    /// Enter without Shift and with non-blank content clears the buffer and
    /// returns the trimmed text to submit. Every other press leaves the
    /// buffer untouched.
    ///
    /// # Examples
    /// ```
    /// use notes::domain::{Composer, KeyPress};
    ///
    /// let mut composer = Composer::default();
    /// composer.edit("Hello");
    /// assert!(composer.handle_key(KeyPress::shift_enter()).is_none());
    /// assert_eq!(composer.handle_key(KeyPress::enter()).unwrap().as_ref(), "Hello");
    /// assert_eq!(composer.text(), "");
    /// ```
    pub fn handle_key(&mut self, key: KeyPress) -> Option<NoteText> {
        if !key.commits() {
            return None;
        }
        let text = NoteText::new(&self.buffer).ok()?;
        self.buffer.clear();
        Some(text)
    }
}
