//! Conversation state and the controller that drives it
//!
//! The client owns the conversation state and sends it back with every
//! request. This module applies the request's commands, reconciles stored
//! history with the model-API message form and records each streamed event.

mod bridge;
mod command;
mod controller;
mod message;

#[cfg(test)]
mod proptests;

pub use command::ChatRequest;
pub use controller::{Controller, OutboundEvent};
