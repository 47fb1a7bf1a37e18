mod code;
mod conn;
mod error;
mod msg;
mod registry;
mod router;
mod ws;

use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    routing::get,
};
use serde::Serialize;

use crate::{AppResult, AppState};

pub use code::RoomCode;
pub use conn::{ConnId, ConnState, Connection, Outbox};
pub use error::RelayError;
pub use msg::{ClientMsg, Peer, ServerMsg, SignalKind};
pub use registry::{Member, Registry, Rooms};
pub use router::SignalRouter;
pub use ws::serve;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::room_ws))
        .route("/rooms/{code}", get(room_info))
}

#[derive(Debug, Serialize)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub members: Vec<Peer>,
}

#[debug_handler(state = crate::AppState)]
async fn room_info(
    Path(code): Path<String>,
    State(router): State<SignalRouter>,
) -> AppResult<Json<RoomInfo>> {
    let code = RoomCode::normalize(&code);
    let rooms = router.registry().lock().await;
    let members = rooms.room_members(&code).ok_or(RelayError::RoomNotFound)?;

    Ok(Json(RoomInfo {
        members: members.iter().map(Member::peer).collect(),
        code,
    }))
}
