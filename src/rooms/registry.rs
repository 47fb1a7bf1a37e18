use std::{collections::HashMap, num::NonZeroUsize, sync::Arc};

use rand::Rng;
use tokio::sync::{Mutex, MutexGuard};

use super::{
    RelayError, RoomCode,
    conn::{ConnId, Outbox},
    msg::Peer,
};

/// A connection as seen from inside a room.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: ConnId,
    pub username: String,
    pub outbox: Outbox,
}

impl Member {
    pub fn peer(&self) -> Peer {
        Peer {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

#[derive(Debug)]
struct Room {
    members: Vec<Member>,
}

/// A member taken out of a room. The room was deleted iff `remaining` is empty.
#[derive(Debug)]
pub struct Departure {
    pub code: RoomCode,
    pub member: Member,
    pub remaining: Vec<Member>,
}

#[derive(Debug)]
pub struct Created {
    pub code: RoomCode,
    pub previous: Option<Departure>,
}

#[derive(Debug)]
pub struct Joined {
    /// Members already in the room, in join order, excluding the joiner.
    pub peers: Vec<Member>,
    pub previous: Option<Departure>,
}

/// Shared handle on the live rooms. Every mutation goes through [`Rooms`]
/// while the lock is held, so callers can fan out notifications before
/// anyone else sees the new membership.
#[derive(Debug, Clone)]
pub struct Registry(Arc<Mutex<Rooms>>);

impl Registry {
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        Self(Arc::new(Mutex::new(Rooms::new(capacity))))
    }

    pub async fn lock(&self) -> MutexGuard<'_, Rooms> {
        self.0.lock().await
    }
}

#[derive(Debug, Default)]
pub struct Rooms {
    rooms: HashMap<RoomCode, Room>,
    // conn -> room it sits in; kept in lockstep with `Room::members`
    seats: HashMap<ConnId, RoomCode>,
    capacity: Option<NonZeroUsize>,
}

impl Rooms {
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn room_members(&self, code: &RoomCode) -> Option<&[Member]> {
        self.rooms.get(code).map(|room| room.members.as_slice())
    }

    pub fn room_of(&self, id: ConnId) -> Option<&RoomCode> {
        self.seats.get(&id)
    }

    pub fn create_room(&mut self, member: Member) -> Result<Created, RelayError> {
        self.create_room_with(&mut rand::rng(), member)
    }

    pub fn create_room_with<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        member: Member,
    ) -> Result<Created, RelayError> {
        let code = RoomCode::unique(rng, |c| self.rooms.contains_key(c))?;
        let previous = self.leave_room(member.id);

        self.seats.insert(member.id, code.clone());
        self.rooms.insert(
            code.clone(),
            Room {
                members: vec![member],
            },
        );
        tracing::info!(%code, rooms = self.rooms.len(), "room created");

        Ok(Created { code, previous })
    }

    pub fn join_room(&mut self, code: &RoomCode, member: Member) -> Result<Joined, RelayError> {
        let room = self.rooms.get(code).ok_or(RelayError::RoomNotFound)?;

        if self.seats.get(&member.id) == Some(code) {
            let peers = room
                .members
                .iter()
                .filter(|m| m.id != member.id)
                .cloned()
                .collect();
            return Ok(Joined {
                peers,
                previous: None,
            });
        }

        if let Some(cap) = self.capacity {
            if room.members.len() >= cap.get() {
                return Err(RelayError::RoomFull);
            }
        }

        // the target room is not ours, so leaving cannot delete it
        let previous = self.leave_room(member.id);

        let room = self.rooms.get_mut(code).ok_or(RelayError::RoomNotFound)?;
        let peers = room.members.clone();
        self.seats.insert(member.id, code.clone());
        room.members.push(member);

        Ok(Joined { peers, previous })
    }

    /// Removes `id` from its room, deleting the room once empty. Calling it
    /// for a connection that is in no room does nothing.
    pub fn leave_room(&mut self, id: ConnId) -> Option<Departure> {
        let code = self.seats.remove(&id)?;
        let room = self.rooms.get_mut(&code)?;
        let pos = room.members.iter().position(|m| m.id == id)?;
        let member = room.members.remove(pos);
        let remaining = room.members.clone();

        if remaining.is_empty() {
            self.rooms.remove(&code);
            tracing::info!(%code, rooms = self.rooms.len(), "room deleted");
        }

        Some(Departure {
            code,
            member,
            remaining,
        })
    }

    /// Resolves a directed message: `target` must share `from`'s room.
    pub fn co_member(&self, from: ConnId, target: ConnId) -> Result<&Member, RelayError> {
        let code = self.seats.get(&from).ok_or(RelayError::NotInRoom)?;
        if from == target {
            return Err(RelayError::InvalidTarget);
        }

        self.rooms
            .get(code)
            .and_then(|room| room.members.iter().find(|m| m.id == target))
            .ok_or(RelayError::InvalidTarget)
    }
}
