//! Core types for the requester: `Event`, `Action`, and the `StateMachine` trait.
//!
//! The protocol engine never touches the transport or the clock directly.
//! A runner feeds it [`Event`]s and carries out the [`Action`]s it returns.

mod action;
mod event;
mod message;
mod ticket;
mod timer;
mod traits;

pub use action::Action;
pub use event::Event;
pub use message::OutboundMessage;
pub use ticket::Ticket;
pub use timer::TimerId;
pub use traits::StateMachine;
