use super::recording::DecodedAction;
use std::cell::RefCell;
use std::rc::Rc;

const MASK_CHAR: char = '*';

/// A surface that shows the text typed so far
pub trait RenderTarget {
    fn render(&mut self, text: &str);
}

/// Shared in-memory surface; clones observe the same text
#[derive(Debug, Clone, Default)]
pub struct SharedText(Rc<RefCell<String>>);

impl SharedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.0.borrow().clone()
    }
}

impl RenderTarget for SharedText {
    fn render(&mut self, text: &str) {
        let mut inner = self.0.borrow_mut();
        inner.clear();
        inner.push_str(text);
    }
}

/// Committed text built by applying decoded actions in order. Edits always
/// happen at the end of the text.
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    text: String,
    masked: bool,
}

impl TextBuffer {
    pub fn new(masked: bool) -> Self {
        Self {
            text: String::new(),
            masked,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn apply(&mut self, action: &DecodedAction) {
        match action.input_type.as_str() {
            "insertText" | "insertReplacementText" | "insertFromPaste" | "insertCompositionText" => {
                if let Some(data) = action.data.as_deref() {
                    self.insert(data);
                }
            }
            "insertLineBreak" | "insertParagraph" => self.text.push('\n'),
            "deleteContentBackward" => {
                self.text.pop();
            }
            "deleteWordBackward" => self.delete_word_backward(),
            // the cursor never sits before committed text
            "deleteContentForward" | "deleteWordForward" => {}
            _ => self.apply_key(&action.key),
        }
    }

    fn apply_key(&mut self, key: &str) {
        match key {
            "Backspace" => {
                self.text.pop();
            }
            "Enter" => self.text.push('\n'),
            _ if key.chars().count() == 1 => self.insert(key),
            _ => {}
        }
    }

    fn insert(&mut self, data: &str) {
        if self.masked {
            self.text.extend(
                data.chars()
                    .map(|c| if c.is_alphanumeric() { MASK_CHAR } else { c }),
            );
        } else {
            self.text.push_str(data);
        }
    }

    fn delete_word_backward(&mut self) {
        let trimmed = self.text.trim_end_matches(char::is_whitespace).len();
        self.text.truncate(trimmed);
        let word_start = self
            .text
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map_or(0, |(i, c)| i + c.len_utf8());
        self.text.truncate(word_start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::recording::PlaybackEvent;

    fn render_text(events: &[PlaybackEvent], until_ms: f64, masked: bool) -> String {
        let mut buffer = TextBuffer::new(masked);
        for event in events.iter().take_while(|e| e.timestamp_ms as f64 <= until_ms) {
            buffer.apply(&event.action);
        }
        buffer.text
    }

    fn ev(ts: u64, action: DecodedAction) -> PlaybackEvent {
        PlaybackEvent {
            id: ts.to_string(),
            timestamp_ms: ts,
            action,
        }
    }

    fn typing(text: &str) -> Vec<PlaybackEvent> {
        text.chars()
            .enumerate()
            .map(|(i, c)| ev(i as u64 * 100, DecodedAction::insert_text(c.to_string())))
            .collect()
    }

    #[test]
    fn renders_up_to_time() {
        let events = typing("hello");
        assert_eq!(render_text(&events, -1.0, false), "");
        assert_eq!(render_text(&events, 0.0, false), "h");
        assert_eq!(render_text(&events, 250.0, false), "hel");
        assert_eq!(render_text(&events, 10_000.0, false), "hello");
    }

    #[test]
    fn backspace_and_line_breaks() {
        let mut events = typing("hi");
        events.push(ev(300, DecodedAction::from_key("Backspace", None)));
        events.push(ev(400, DecodedAction::from_key("Enter", None)));
        events.push(ev(500, DecodedAction::insert_text("o")));
        assert_eq!(render_text(&events, 1_000.0, false), "h\no");
    }

    #[test]
    fn key_fallback_for_unknown_input_types() {
        let mut buffer = TextBuffer::new(false);
        let action = |key: &str| DecodedAction {
            key: key.to_string(),
            input_type: "keydown".to_string(),
            data: None,
        };
        buffer.apply(&action("a"));
        buffer.apply(&action("b"));
        buffer.apply(&action("Shift"));
        buffer.apply(&action("Backspace"));
        assert_eq!(buffer.text(), "a");
    }

    #[test]
    fn delete_word_backward() {
        let mut buffer = TextBuffer::new(false);
        buffer.apply(&DecodedAction::insert_text("one two  "));
        buffer.apply(&DecodedAction {
            key: "Backspace".to_string(),
            input_type: "deleteWordBackward".to_string(),
            data: None,
        });
        assert_eq!(buffer.text(), "one ");
    }

    #[test]
    fn masked_buffer_hides_alphanumerics() {
        let mut buffer = TextBuffer::new(true);
        buffer.apply(&DecodedAction::insert_text("Hi 2u!"));
        assert_eq!(buffer.text(), "** **!");
    }

    #[test]
    fn shared_text_sees_renders() {
        let shared = SharedText::new();
        let mut target: Box<dyn RenderTarget> = Box::new(shared.clone());
        target.render("abc");
        target.render("ab");
        assert_eq!(shared.text(), "ab");
    }
}
