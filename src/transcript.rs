//! Append-only chat transcript and status line
//!
//! Messages are display-only records: once appended they are never edited,
//! removed, or persisted. Each append renders one line to stdout, so the
//! terminal scrollback is the chat view. The status line is a single mutable
//! text field overwritten on every phase transition, rendered to stderr to
//! keep the transcript clean.

/// Who produced a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    /// The local user (transcribed speech)
    User,
    /// The remote agent
    Bot,
}

impl Sender {
    /// Short label used when rendering
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "you",
            Self::Bot => "bot",
        }
    }
}

/// One entry in the chat transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Message text
    pub text: String,
    /// Message originator
    pub sender: Sender,
}

/// Append-only chat log
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    /// Create an empty transcript
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and render it
    pub fn append(&mut self, text: impl Into<String>, sender: Sender) {
        let message = ChatMessage {
            text: text.into(),
            sender,
        };
        println!("{}", render_line(&message));
        self.messages.push(message);
    }

    /// All messages appended so far, oldest first
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

/// Render one transcript line
#[must_use]
pub fn render_line(message: &ChatMessage) -> String {
    format!("{} > {}", message.sender.label(), message.text)
}

/// Single-line widget status indicator
#[derive(Debug, Default)]
pub struct StatusLine {
    text: String,
}

impl StatusLine {
    /// Create an empty status line
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the status text and render it
    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        eprintln!("-- {}", self.text);
    }

    /// Current status text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order_and_sender() {
        let mut transcript = Transcript::new();
        transcript.append("hello", Sender::User);
        transcript.append("hi there", Sender::Bot);

        let messages = transcript.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[1].text, "hi there");
        assert_eq!(messages[1].sender, Sender::Bot);
    }

    #[test]
    fn render_tags_by_sender() {
        let user = ChatMessage {
            text: "hello".to_string(),
            sender: Sender::User,
        };
        let bot = ChatMessage {
            text: "hi".to_string(),
            sender: Sender::Bot,
        };
        assert_eq!(render_line(&user), "you > hello");
        assert_eq!(render_line(&bot), "bot > hi");
    }

    #[test]
    fn status_overwrites_without_history() {
        let mut status = StatusLine::new();
        status.set("Recording...");
        status.set("Processing audio...");
        assert_eq!(status.text(), "Processing audio...");
    }
}
