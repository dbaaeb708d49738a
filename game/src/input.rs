use serde::{Deserialize, Serialize};

/// One normalized keystroke from the input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Letter(char),
    Backspace,
}

impl Key {
    /// ASCII letters map to `Letter` (uppercased); everything else is dropped.
    pub fn from_char(ch: char) -> Option<Key> {
        match ch {
            '\u{8}' => Some(Key::Backspace),
            c if c.is_ascii_alphabetic() => Some(Key::Letter(c.to_ascii_uppercase())),
            _ => None,
        }
    }

    pub fn from_text(text: &str) -> impl Iterator<Item = Key> + '_ {
        text.chars().filter_map(Key::from_char)
    }
}

/// Typed letters for the current attempt.
///
/// The buffer holds no policy of its own: whoever owns it flips
/// `set_accepting` and `append` silently ignores letters while closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    typed: Vec<char>,
    accepting: bool,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    pub fn set_accepting(&mut self, accepting: bool) {
        self.accepting = accepting;
    }

    pub fn append(&mut self, letter: char) -> bool {
        if !self.accepting || !letter.is_ascii_alphabetic() {
            return false;
        }
        self.typed.push(letter.to_ascii_uppercase());
        true
    }

    pub fn backspace(&mut self) -> bool {
        self.typed.pop().is_some()
    }

    pub fn apply(&mut self, key: Key) -> bool {
        match key {
            Key::Letter(letter) => self.append(letter),
            Key::Backspace => self.backspace(),
        }
    }

    pub fn clear(&mut self) {
        self.typed.clear();
    }

    pub fn len(&self) -> usize {
        self.typed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.typed.is_empty()
    }

    pub fn letters(&self) -> &[char] {
        &self.typed
    }

    pub fn text(&self) -> String {
        self.typed.iter().collect()
    }

    /// Case-insensitive containment; vacuously true for no requirements.
    pub fn contains_all(&self, required: &[char]) -> bool {
        required.iter().all(|key| {
            let key = key.to_ascii_uppercase();
            self.typed.contains(&key)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_buffer() -> InputBuffer {
        let mut buf = InputBuffer::new();
        buf.set_accepting(true);
        buf
    }

    #[test]
    fn append_is_ignored_while_closed() {
        let mut buf = InputBuffer::new();
        assert!(!buf.append('a'));
        assert!(buf.is_empty());

        buf.set_accepting(true);
        assert!(buf.append('a'));
        assert_eq!(buf.letters(), &['A']);
    }

    #[test]
    fn backspace_removes_last_letter_and_tolerates_empty() {
        let mut buf = open_buffer();
        for key in Key::from_text("ab") {
            buf.apply(key);
        }
        assert!(buf.apply(Key::Backspace));
        assert_eq!(buf.text(), "A");
        assert!(buf.backspace());
        assert!(!buf.backspace());
    }

    #[test]
    fn contains_all_is_case_insensitive_and_vacuous_for_empty() {
        let mut buf = open_buffer();
        for key in Key::from_text("xaYk") {
            buf.apply(key);
        }
        assert!(buf.contains_all(&[]));
        assert!(buf.contains_all(&['a', 'K']));
        assert!(!buf.contains_all(&['A', 'Q']));
    }

    #[test]
    fn from_text_drops_non_letters() {
        let keys: Vec<Key> = Key::from_text("a1 b!\n").collect();
        assert_eq!(keys, vec![Key::Letter('A'), Key::Letter('B')]);
    }
}
