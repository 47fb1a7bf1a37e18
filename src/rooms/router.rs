use serde_json::Value;

use super::{
    RelayError, RoomCode,
    conn::{ConnId, ConnState, Connection},
    msg::{ClientMsg, ServerMsg, SignalKind},
    registry::{Departure, Member, Registry},
};

/// Turns inbound frames from one connection into outbound frames for others.
#[derive(Debug, Clone)]
pub struct SignalRouter {
    registry: Registry,
}

impl SignalRouter {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Handles one raw frame. Protocol errors are answered on the sender's
    /// own outbox and never end the connection.
    pub async fn handle_frame(&self, conn: &mut Connection, frame: &[u8]) {
        if conn.is_closed() {
            return;
        }

        let result = match ClientMsg::decode(frame) {
            Ok(msg) => self.route(conn, msg).await,
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            tracing::debug!(conn = %conn.id(), reason = err.reason(), "{err}");
            conn.reply(ServerMsg::from(&err));
        }
    }

    pub async fn route(&self, conn: &mut Connection, msg: ClientMsg) -> Result<(), RelayError> {
        match msg {
            ClientMsg::Create { username } => self.create(conn, username).await,
            ClientMsg::Join { username, code } => {
                self.join(conn, username, RoomCode::normalize(&code)).await
            }
            ClientMsg::Signal {
                target_id,
                kind,
                payload,
            } => self.signal(conn, target_id, kind, payload).await,
            ClientMsg::Leave => self.leave(conn).await,
        }
    }

    /// Teardown for a connection whose transport is gone. Runs once; later
    /// calls on the same connection do nothing.
    pub async fn disconnect(&self, conn: &mut Connection) {
        if conn.is_closed() {
            return;
        }

        let mut rooms = self.registry.lock().await;
        if let Some(departure) = rooms.leave_room(conn.id()) {
            announce_departure(&departure);
        }
        conn.set_state(ConnState::Closed);
        tracing::info!(conn = %conn.id(), "disconnected");
    }

    async fn create(&self, conn: &mut Connection, username: String) -> Result<(), RelayError> {
        let member = member_for(conn, username)?;

        let mut rooms = self.registry.lock().await;
        let created = rooms.create_room(member.clone())?;
        if let Some(previous) = &created.previous {
            announce_departure(previous);
        }

        conn.set_username(member.username);
        conn.set_state(ConnState::InRoom(created.code.clone()));
        conn.reply(ServerMsg::Created { code: created.code });
        Ok(())
    }

    async fn join(
        &self,
        conn: &mut Connection,
        username: String,
        code: RoomCode,
    ) -> Result<(), RelayError> {
        let member = member_for(conn, username)?;
        let rejoin = conn.room() == Some(&code);

        let mut rooms = self.registry.lock().await;
        let joined = rooms.join_room(&code, member.clone())?;
        if let Some(previous) = &joined.previous {
            announce_departure(previous);
        }

        if !rejoin {
            for peer in &joined.peers {
                peer.outbox.send(ServerMsg::PeerJoined {
                    id: member.id,
                    username: member.username.clone(),
                });
            }
            tracing::info!(conn = %member.id, %code, "joined room");
            // a rejoin keeps the name the room already knows
            conn.set_username(member.username);
        }

        conn.set_state(ConnState::InRoom(code.clone()));
        conn.reply(ServerMsg::Joined {
            code,
            members: joined.peers.iter().map(Member::peer).collect(),
        });
        Ok(())
    }

    async fn signal(
        &self,
        conn: &Connection,
        target_id: ConnId,
        kind: SignalKind,
        payload: Value,
    ) -> Result<(), RelayError> {
        let rooms = self.registry.lock().await;
        let target = rooms.co_member(conn.id(), target_id)?;

        tracing::debug!(from = %conn.id(), to = %target_id, ?kind, "relaying signal");
        target.outbox.send(ServerMsg::Signal {
            from_id: conn.id(),
            from_username: conn.username().unwrap_or_default().to_owned(),
            kind,
            payload,
        });
        Ok(())
    }

    async fn leave(&self, conn: &mut Connection) -> Result<(), RelayError> {
        let mut rooms = self.registry.lock().await;
        let departure = rooms.leave_room(conn.id()).ok_or(RelayError::NotInRoom)?;
        announce_departure(&departure);

        conn.set_state(ConnState::Connected);
        conn.reply(ServerMsg::Left {
            code: departure.code,
        });
        Ok(())
    }
}

fn member_for(conn: &Connection, username: String) -> Result<Member, RelayError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(RelayError::MalformedMessage("username must not be empty".to_owned()));
    }

    Ok(Member {
        id: conn.id(),
        username: username.to_owned(),
        outbox: conn.outbox().clone(),
    })
}

fn announce_departure(departure: &Departure) {
    tracing::info!(conn = %departure.member.id, code = %departure.code, "left room");
    for peer in &departure.remaining {
        peer.outbox.send(ServerMsg::PeerLeft {
            id: departure.member.id,
            username: departure.member.username.clone(),
        });
    }
}
