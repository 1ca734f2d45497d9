//! In-process presence room.
//!
//! All connections of a room share one state cell. Publishing notifies every
//! subscriber synchronously; subscribers are taken out of the cell while
//! they run, so callbacks may publish or subscribe themselves.

use super::{ConnectionId, OthersMapped, Peer, Presence, PresenceChannel, UserInfo};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

/// Handle returned by [`RoomConnection::subscribe_mapped`].
pub type SubscriptionId = u64;

type Listener = Box<dyn FnMut(&[Peer])>;

struct Subscriber {
    id: SubscriptionId,
    watcher: ConnectionId,
    listener: Listener,
}

struct Member {
    info: UserInfo,
    presence: Presence,
}

#[derive(Default)]
struct RoomState {
    next_connection: ConnectionId,
    next_subscription: SubscriptionId,
    members: BTreeMap<ConnectionId, Member>,
    subscribers: Vec<Subscriber>,
    dispatching: bool,
    dirty: bool,
    cancelled: HashSet<SubscriptionId>,
}

impl RoomState {
    fn peers(&self) -> Vec<Peer> {
        self.members
            .iter()
            .map(|(id, member)| Peer {
                connection_id: *id,
                info: member.info.clone(),
                presence: member.presence.clone(),
            })
            .collect()
    }
}

/// Notify every subscriber of the current room state.
///
/// Re-entrant calls only mark the state dirty; the outer call loops until
/// nothing changed during a pass.
fn dispatch(state: &Rc<RefCell<RoomState>>) {
    {
        let mut s = state.borrow_mut();
        if s.dispatching {
            s.dirty = true;
            return;
        }
        s.dispatching = true;
    }

    loop {
        let (mut subscribers, peers) = {
            let mut s = state.borrow_mut();
            s.dirty = false;
            (std::mem::take(&mut s.subscribers), s.peers())
        };

        for sub in subscribers.iter_mut() {
            let others: Vec<Peer> = peers
                .iter()
                .filter(|peer| peer.connection_id != sub.watcher)
                .cloned()
                .collect();
            (sub.listener)(&others);
        }

        let mut s = state.borrow_mut();
        let cancelled = std::mem::take(&mut s.cancelled);
        subscribers.retain(|sub| !cancelled.contains(&sub.id));
        subscribers.append(&mut s.subscribers);
        s.subscribers = subscribers;
        if !s.dirty {
            s.dispatching = false;
            break;
        }
    }
}

/// The presence room of one board.
#[derive(Clone)]
pub struct PresenceRoom {
    board_id: String,
    state: Rc<RefCell<RoomState>>,
}

impl PresenceRoom {
    pub fn new(board_id: impl Into<String>) -> Self {
        Self {
            board_id: board_id.into(),
            state: Rc::new(RefCell::new(RoomState::default())),
        }
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    /// Attach a new connection. Ids are assigned in join order.
    pub fn join(&self, info: UserInfo) -> RoomConnection {
        let id = {
            let mut s = self.state.borrow_mut();
            let id = s.next_connection;
            s.next_connection += 1;
            s.members.insert(
                id,
                Member {
                    info: info.clone(),
                    presence: Presence::default(),
                },
            );
            id
        };
        log::info!("Connection {id} joined board {}", self.board_id);
        dispatch(&self.state);

        RoomConnection {
            id,
            info,
            board_id: self.board_id.clone(),
            state: Rc::clone(&self.state),
            joined: true,
        }
    }

    pub fn connection_count(&self) -> usize {
        self.state.borrow().members.len()
    }
}

/// One connection's handle on a [`PresenceRoom`]. Leaves the room on drop.
pub struct RoomConnection {
    id: ConnectionId,
    info: UserInfo,
    board_id: String,
    state: Rc<RefCell<RoomState>>,
    joined: bool,
}

impl RoomConnection {
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Watch a mapped field of the other connections.
    ///
    /// `callback` runs right away for every current connection, then again
    /// only when a connection's mapped value changes, and with `None` once
    /// when a connection leaves.
    pub fn subscribe_mapped<T, F, C>(&self, selector: F, mut callback: C) -> SubscriptionId
    where
        T: PartialEq + Clone + 'static,
        F: Fn(&Presence) -> T + 'static,
        C: FnMut(ConnectionId, Option<&T>) + 'static,
    {
        let mut mapped = OthersMapped::new(selector);
        let mut listener: Listener = Box::new(move |others: &[Peer]| {
            for (connection_id, value) in mapped.poll(others) {
                callback(connection_id, value.as_ref());
            }
        });

        let others = self.others();
        listener(&others);

        let mut s = self.state.borrow_mut();
        let id = s.next_subscription;
        s.next_subscription += 1;
        s.subscribers.push(Subscriber {
            id,
            watcher: self.id,
            listener,
        });
        id
    }

    pub fn unsubscribe(&self, subscription: SubscriptionId) {
        let mut s = self.state.borrow_mut();
        let before = s.subscribers.len();
        s.subscribers.retain(|sub| sub.id != subscription);
        if s.subscribers.len() == before && s.dispatching {
            s.cancelled.insert(subscription);
        }
    }
}

impl PresenceChannel for RoomConnection {
    fn connection_id(&self) -> ConnectionId {
        self.id
    }

    fn user(&self) -> UserInfo {
        self.info.clone()
    }

    fn publish(&mut self, presence: &Presence) {
        if !self.joined {
            return;
        }
        {
            let mut s = self.state.borrow_mut();
            match s.members.get_mut(&self.id) {
                Some(member) if member.presence == *presence => return,
                Some(member) => member.presence = presence.clone(),
                None => return,
            }
        }
        dispatch(&self.state);
    }

    fn others(&self) -> Vec<Peer> {
        self.state
            .borrow()
            .peers()
            .into_iter()
            .filter(|peer| peer.connection_id != self.id)
            .collect()
    }

    fn leave(&mut self) {
        if !self.joined {
            return;
        }
        self.joined = false;
        {
            let mut s = self.state.borrow_mut();
            s.members.remove(&self.id);
            let id = self.id;
            let owned: Vec<SubscriptionId> = s
                .subscribers
                .iter()
                .filter(|sub| sub.watcher == id)
                .map(|sub| sub.id)
                .collect();
            s.subscribers.retain(|sub| sub.watcher != id);
            if s.dispatching {
                s.cancelled.extend(owned);
            }
        }
        log::info!("Connection {} left board {}", self.id, self.board_id);
        dispatch(&self.state);
    }
}

impl Drop for RoomConnection {
    fn drop(&mut self) {
        self.leave();
    }
}
