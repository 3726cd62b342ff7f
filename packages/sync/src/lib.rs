#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Live state of the hazard map.
//!
//! A [`Session`] owns the [`ViewState`] behind a [`ViewStateHandle`] and
//! keeps it current from three directions: the initial REST load, the
//! push channel ([`RealtimeChannel`]) and the periodic official-alert
//! poll ([`AlertPoller`]). Map interaction goes through
//! [`ViewportRefresher`] and the focus helpers on [`Session`].
//!
//! Every full report fetch takes a [`ReportTicket`]; a response is
//! applied only if no newer fetch has been applied already.

pub mod channel;
pub mod config;
pub mod fallback;
pub mod poller;
pub mod session;
pub mod shutdown;
pub mod view_state;
pub mod viewport;
pub mod websocket;

#[cfg(test)]
mod fakes;

pub use channel::{
    ChannelError, ChannelOptions, ChannelState, Dispatch, MessageStream, PushTransport,
    RealtimeChannel, dispatch,
};
pub use config::{ClientConfig, ConfigError};
pub use poller::AlertPoller;
pub use session::{
    Collaborators, InitialLoad, Session, SessionError, SessionHandle, SessionOptions,
};
pub use view_state::{ReportOrigin, ReportTicket, ViewState, ViewStateHandle};
pub use viewport::{RefreshOutcome, ViewportRefresher};
pub use websocket::WebSocketTransport;
