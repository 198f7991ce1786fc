/// Notifications delivered to the caller while the receive loop runs
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Chat line, still carrying its colour escapes
    Chat {
        message: String,
    },

    /// Plugin channel payload
    PluginMessage {
        channel: String,
        data: Vec<u8>,
    },

    /// Server moved the player
    PositionCorrected {
        x: f64,
        y: f64,
        z: f64,
    },

    /// Health changed
    HealthUpdated {
        health: i16,
        food: i16,
    },

    Respawned {
        dimension: i32,
    },

    /// Server ended the session
    Disconnected {
        reason: DisconnectReason,
    },
}

/// Why the session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    UserRequested,
    Kicked(String),
    Error(String),
}

impl DisconnectReason {
    pub fn message(&self) -> &str {
        match self {
            Self::UserRequested => "disconnected",
            Self::Kicked(reason) | Self::Error(reason) => reason,
        }
    }
}

/// Event handler trait
pub trait EventHandler: Send {
    fn on_event(&mut self, event: GameEvent);
}

impl<F> EventHandler for F
where
    F: FnMut(GameEvent) + Send,
{
    fn on_event(&mut self, event: GameEvent) {
        self(event)
    }
}

/// Simple event collector
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<GameEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventHandler for EventCollector {
    fn on_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}
