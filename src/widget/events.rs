//! Turn events and the task that produces them.

use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::conversation::MessageId;
use crate::error::FolioError;
use crate::session::{Session, TurnRequest};

/// Identifies one submitted turn within a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub(crate) u64);

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

/// Progress of a turn, delivered to the widget in emission order.
#[derive(Debug)]
pub enum TurnEvent {
    Fragment { turn: TurnId, text: String },
    Finished { turn: TurnId },
    Failed { turn: TurnId, error: FolioError },
}

impl TurnEvent {
    pub fn turn(&self) -> TurnId {
        match self {
            Self::Fragment { turn, .. } | Self::Finished { turn } | Self::Failed { turn, .. } => {
                *turn
            }
        }
    }
}

/// What applying an event changed, for views that draw incrementally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetUpdate {
    Appended { message: MessageId, fragment: String },
    Completed { message: MessageId },
    /// The placeholder now holds the fallback text.
    Failed { message: MessageId },
}

/// Send one turn and forward its fragments. Stops early once the receiving
/// widget is gone.
pub(crate) async fn drive_turn(
    session: Session,
    request: TurnRequest,
    turn: TurnId,
    events: UnboundedSender<TurnEvent>,
) {
    let mut fragments = match session.send(request).await {
        Ok(stream) => stream,
        Err(error) => {
            let _ = events.send(TurnEvent::Failed { turn, error });
            return;
        }
    };

    while let Some(item) = fragments.next().await {
        let event = match item {
            Ok(text) => TurnEvent::Fragment { turn, text },
            Err(error) => {
                let _ = events.send(TurnEvent::Failed { turn, error });
                return;
            }
        };
        if events.send(event).is_err() {
            debug!(%turn, "widget dropped; abandoning turn");
            return;
        }
    }

    let _ = events.send(TurnEvent::Finished { turn });
}
