//! Results queued by the front end until the engine prints them.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Output,
    Comment,
    Profile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub kind: MessageKind,
    /// Shown even while the display is switched off.
    pub forced: bool,
}

impl Message {
    pub fn output(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::Output,
            forced: false,
        }
    }

    pub fn forced(text: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            text: text.into(),
            kind,
            forced: true,
        }
    }

    pub fn can_display(&self, display_state: bool) -> bool {
        self.forced || display_state
    }
}

#[derive(Debug, Default)]
pub struct OutputQueue {
    messages: Vec<Message>,
}

impl OutputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Take every pending message in arrival order.
    pub fn drain(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.messages)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
