use tracing::{debug, info, warn};

use crate::genai::conversation::{Conversation, Turn};
use crate::genai::payload::{self, ImageFormat};
use crate::genai::response;
use crate::genai::transport::Transport;

const CANCELLED_REPLY: &str = "Error: request was cancelled before a reply arrived";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    AwaitingInput,
    ProcessingText,
    ProcessingImage,
}

/// One chat: the conversation plus the transport it talks through.
///
/// `submit` borrows the session mutably for the whole call, so at most one
/// request is ever in flight.
#[derive(Debug)]
pub struct ChatSession {
    transport: Transport,
    image_format: ImageFormat,
    conversation: Conversation,
    state: SessionState,
}

impl ChatSession {
    pub fn new(transport: Transport, image_format: ImageFormat) -> Self {
        Self {
            transport,
            image_format,
            conversation: Conversation::new(),
            state: SessionState::Empty,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn model(&self) -> &str {
        self.transport.model()
    }

    pub fn clear(&mut self) {
        self.conversation.clear();
        self.state = SessionState::Empty;
    }

    /// Records the user turn(s), calls the provider, records the reply and
    /// returns it. Provider failures are recorded as the reply text.
    pub async fn submit(&mut self, prompt: &str, image: Option<&[u8]>) -> &str {
        if matches!(
            self.state,
            SessionState::ProcessingText | SessionState::ProcessingImage
        ) {
            warn!("previous request never completed; closing its turn");
            self.conversation.append(Turn::assistant_text(CANCELLED_REPLY));
        }

        self.conversation.append(Turn::user_text(prompt));
        if let Some(bytes) = image {
            self.conversation.append(Turn::user_image(bytes));
            self.state = SessionState::ProcessingImage;
        } else {
            self.state = SessionState::ProcessingText;
        }
        info!(model = self.transport.model(), with_image = image.is_some(), "submitting turn");

        let result = match payload::build(prompt, image, self.image_format) {
            Ok(request) => self.transport.send(&request).await,
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            debug!(error = %err, "provider call failed");
        }

        let reply = response::extract(result);
        self.conversation.append(Turn::assistant_text(reply));
        self.state = SessionState::AwaitingInput;
        self.conversation
            .last()
            .and_then(Turn::text)
            .unwrap_or_default()
    }
}
