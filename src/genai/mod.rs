//! Client for the Gemini `generateContent` API.
//!
//! A user turn flows through [`payload::build`], [`transport::Transport::send`]
//! and [`response::extract`] before [`session::ChatSession`] records it in the
//! [`conversation::Conversation`].

/// Append-only turn history.
pub mod conversation;
/// Request construction and image re-encoding.
pub mod payload;
/// Endpoints, credentials and the error taxonomy.
pub mod provider;
/// Response envelope and reply extraction.
pub mod response;
/// Conversation plus transport, one call at a time.
pub mod session;
/// HTTP calls with optional timeout and retries.
pub mod transport;
