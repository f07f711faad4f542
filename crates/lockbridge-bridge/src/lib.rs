//! Bridge layer: publishes lock state to the protocol layers, parses
//! administrative commands, and drives the registry from a single async task.
//!
//! - [`protocol`]: the [`StatePublisher`](protocol::StatePublisher) interface
//!   and its logging and recording implementations.
//! - [`command`]: text command parsing.
//! - [`dispatcher`]: [`CommandDispatcher`], the single owner of the registry.
//! - [`service`]: [`BridgeService`], the tokio task that ticks the dispatcher
//!   and serializes every request against the tick.

pub mod command;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod service;

pub use command::{BridgeCommand, HELP_TEXT};
pub use dispatcher::{CommandDispatcher, CommandReply};
pub use error::{Result, ServiceError};
pub use protocol::{LockAddress, RecordingPublisher, StatePublisher, TracingPublisher};
pub use service::{
    BridgeClient, BridgeHandle, BridgeRequest, BridgeService, ServiceSchedule, TokioClock,
};
