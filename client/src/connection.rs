use std::time::Duration;

use crate::config::BackoffConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The board mounted and wants a connection.
    Start,
    Open,
    Close,
    Error,
    /// The reconnect timer fired.
    RetryDue,
    /// The board unmounted.
    Shutdown,
}

/// What the transport owner has to do after an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionAction {
    None,
    Dial,
    ScheduleRetry(Duration),
    Close,
    GiveUp,
}

/// Connection lifecycle with exponential reconnect backoff.
#[derive(Clone, Debug)]
pub struct Connection {
    state: ConnectionState,
    backoff: BackoffConfig,
    dialing: bool,
}

impl Connection {
    pub fn new(backoff: BackoffConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            backoff,
            dialing: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn handle(&mut self, event: ConnectionEvent) -> ConnectionAction {
        use ConnectionEvent as E;
        use ConnectionState as S;

        let previous = self.state;
        let action = match (self.state, event) {
            (S::Disconnected, E::Start) => {
                self.state = S::Connecting;
                self.dial()
            }
            (S::Connecting | S::Reconnecting { .. }, E::Open) if self.dialing => {
                self.state = S::Connected;
                self.dialing = false;
                ConnectionAction::None
            }
            (S::Connecting, E::Close | E::Error) => self.retry(1),
            (S::Connected, E::Close | E::Error) => self.retry(1),
            (S::Reconnecting { attempt }, E::Close | E::Error) if self.dialing => {
                self.retry(attempt + 1)
            }
            (S::Reconnecting { .. }, E::RetryDue) if !self.dialing => self.dial(),
            (S::Disconnected, _) => ConnectionAction::None,
            (_, E::Shutdown) => {
                self.state = S::Disconnected;
                self.dialing = false;
                ConnectionAction::Close
            }
            _ => ConnectionAction::None,
        };
        if previous != self.state {
            log::info!("connection {previous:?} -> {:?}", self.state);
        }
        action
    }

    /// Badge state and text for the UI.
    pub fn status(&self) -> (&'static str, &'static str) {
        match self.state {
            ConnectionState::Disconnected => ("closed", "Offline"),
            ConnectionState::Connecting => ("connecting", "Connecting..."),
            ConnectionState::Connected => ("open", "Live connection"),
            ConnectionState::Reconnecting { .. } => ("connecting", "Reconnecting..."),
        }
    }

    fn dial(&mut self) -> ConnectionAction {
        self.dialing = true;
        ConnectionAction::Dial
    }

    fn retry(&mut self, attempt: u32) -> ConnectionAction {
        self.dialing = false;
        if self.backoff.exhausted(attempt) {
            self.state = ConnectionState::Disconnected;
            log::warn!("giving up after {} reconnect attempts", attempt - 1);
            return ConnectionAction::GiveUp;
        }
        self.state = ConnectionState::Reconnecting { attempt };
        ConnectionAction::ScheduleRetry(self.backoff.delay(attempt))
    }
}
