//! Chat endpoints: one-shot JSON and server-sent event streaming.

pub mod handlers;
pub mod stream;
