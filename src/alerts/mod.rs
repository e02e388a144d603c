//! Alert delivery to staff devices
//!
//! The dispatcher resolves staff targets per call and fans each alert out
//! to a push channel and an email channel. A transport that is not
//! configured is represented by a [`DisabledChannel`].

pub mod channel;
pub mod dispatcher;
pub mod email;
pub mod push;

pub use channel::{AlertChannel, AlertMessage, ChannelError, Delivery, DisabledChannel};
pub use dispatcher::{AlertDispatcher, ChannelOutcome, DispatchReport, DEFAULT_CHANNEL_TIMEOUT};
pub use email::EmailChannel;
pub use push::PushChannel;
