//! Per-connection ephemeral state shared with everyone on the board.
//!
//! Presence is never persisted and never part of history. Each connection
//! publishes its own [`Presence`] and observes the others through a
//! [`PresenceChannel`].

mod room;

pub use room::{PresenceRoom, RoomConnection, SubscriptionId};

use crate::geometry::connection_color;
use crate::layers::{LayerId, Rgb, StrokePoint};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of one connection within a room.
pub type ConnectionId = u32;

/// Interaction state a connection broadcasts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    /// Pointer position in canvas coordinates; `None` when outside the canvas.
    pub cursor: Option<Point>,
    /// Selected layer ids.
    pub selection: Vec<LayerId>,
    /// In-progress freehand stroke.
    pub pencil_draft: Option<Vec<StrokePoint>>,
    pub pen_color: Option<Rgb>,
}

/// Read-only identity attached to a connection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub name: Option<String>,
    /// Avatar reference.
    pub picture: Option<String>,
}

/// Another connection as seen by this one.
#[derive(Debug, Clone, PartialEq)]
pub struct Peer {
    pub connection_id: ConnectionId,
    pub info: UserInfo,
    pub presence: Presence,
}

/// Broadcast capability used by the canvas.
pub trait PresenceChannel {
    /// This connection's id.
    fn connection_id(&self) -> ConnectionId;

    /// This connection's identity.
    fn user(&self) -> UserInfo;

    /// Replace this connection's presence for everyone else.
    fn publish(&mut self, presence: &Presence);

    /// Current presence of every other connection.
    fn others(&self) -> Vec<Peer>;

    /// Detach from the room.
    fn leave(&mut self) {}
}

/// Equality-gated view of a mapped field of the other connections.
///
/// [`OthersMapped::poll`] reports only connections whose mapped value
/// changed since the previous poll, and `None` once for connections that
/// disappeared.
pub struct OthersMapped<T> {
    selector: Box<dyn Fn(&Presence) -> T>,
    last: HashMap<ConnectionId, T>,
}

impl<T: PartialEq + Clone> OthersMapped<T> {
    pub fn new(selector: impl Fn(&Presence) -> T + 'static) -> Self {
        Self {
            selector: Box::new(selector),
            last: HashMap::new(),
        }
    }

    pub fn poll(&mut self, others: &[Peer]) -> Vec<(ConnectionId, Option<T>)> {
        let mut updates = Vec::new();

        for peer in others {
            let mapped = (self.selector)(&peer.presence);
            if self.last.get(&peer.connection_id) != Some(&mapped) {
                self.last.insert(peer.connection_id, mapped.clone());
                updates.push((peer.connection_id, Some(mapped)));
            }
        }

        let gone: Vec<ConnectionId> = self
            .last
            .keys()
            .filter(|id| !others.iter().any(|peer| peer.connection_id == **id))
            .copied()
            .collect();
        for id in gone {
            self.last.remove(&id);
            updates.push((id, None));
        }

        updates
    }

    /// Last delivered value for a connection.
    pub fn get(&self, connection_id: ConnectionId) -> Option<&T> {
        self.last.get(&connection_id)
    }
}

/// Layer id to the color of a connection that has it selected.
pub fn selection_colors<T: Clone>(others: &[Peer], palette: &[T]) -> HashMap<LayerId, T> {
    let mut colors = HashMap::new();
    for peer in others {
        let Some(color) = connection_color(peer.connection_id, palette) else {
            continue;
        };
        for id in &peer.presence.selection {
            colors.insert(*id, color.clone());
        }
    }
    colors
}

/// A participant shown in the board header.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub info: UserInfo,
    pub color: Option<String>,
}

/// Who is on the board, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Participants {
    /// The first few other participants.
    pub shown: Vec<Participant>,
    /// The local user.
    pub current: Participant,
    /// Number of others not in `shown`.
    pub more: usize,
}

pub fn participants(
    current: Participant,
    others: &[Peer],
    palette: &[String],
    max_shown: usize,
) -> Participants {
    let shown = others
        .iter()
        .take(max_shown)
        .map(|peer| Participant {
            connection_id: peer.connection_id,
            info: peer.info.clone(),
            color: connection_color(peer.connection_id, palette).cloned(),
        })
        .collect();
    Participants {
        shown,
        current,
        more: others.len().saturating_sub(max_shown),
    }
}
