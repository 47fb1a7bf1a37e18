use std::{net::SocketAddr, time::Duration};

use futures_util::{SinkExt, StreamExt};
use ripchat::{AppState, Config, app};
use serde_json::{Value, json};
use tokio::{
    net::{TcpListener, TcpStream},
    time,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> SocketAddr {
    spawn_server_with(Config::default()).await
}

async fn spawn_server_with(config: Config) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(AppState::new(config)))
            .await
            .unwrap();
    });
    addr
}

struct Client {
    socket: Socket,
    id: String,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let (mut socket, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        let welcome = recv(&mut socket).await;
        assert_eq!(welcome["type"], "welcome");
        let id = welcome["id"].as_str().unwrap().to_owned();
        Self { socket, id }
    }

    async fn send(&mut self, msg: Value) {
        self.socket.send(Message::Text(msg.to_string())).await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        recv(&mut self.socket).await
    }
}

async fn recv(socket: &mut Socket) -> Value {
    loop {
        let msg = time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn room_status(addr: SocketAddr, code: &str) -> reqwest::Response {
    reqwest::get(format!("http://{addr}/rooms/{code}")).await.unwrap()
}

#[tokio::test]
async fn two_clients_negotiate_through_a_room() {
    let addr = spawn_server().await;
    let mut alice = Client::connect(addr).await;
    let mut bob = Client::connect(addr).await;

    alice.send(json!({"type": "create", "username": "alice"})).await;
    let created = alice.recv().await;
    assert_eq!(created["type"], "created");
    let code = created["code"].as_str().unwrap().to_owned();
    assert_eq!(code.len(), 6);

    bob.send(json!({"type": "join", "username": "bob", "code": code.to_lowercase()}))
        .await;
    let joined = bob.recv().await;
    assert_eq!(joined["type"], "joined");
    assert_eq!(joined["members"], json!([{"id": alice.id, "username": "alice"}]));
    assert_eq!(
        alice.recv().await,
        json!({"type": "peer_joined", "id": bob.id, "username": "bob"})
    );

    let offer = json!({"type": "offer", "sdp": "v=0\r\n"});
    bob.send(json!({"type": "signal", "target_id": alice.id, "kind": "offer", "payload": offer}))
        .await;
    assert_eq!(
        alice.recv().await,
        json!({
            "type": "signal",
            "from_id": bob.id,
            "from_username": "bob",
            "kind": "offer",
            "payload": offer,
        })
    );

    alice
        .send(json!({"type": "signal", "target_id": bob.id, "kind": "answer", "payload": {"sdp": "v=0"}}))
        .await;
    let answer = bob.recv().await;
    assert_eq!(answer["kind"], "answer");
    assert_eq!(answer["from_id"], json!(alice.id));
}

#[tokio::test]
async fn abrupt_disconnect_is_announced_and_empty_rooms_vanish() {
    let addr = spawn_server().await;
    let mut alice = Client::connect(addr).await;
    let mut bob = Client::connect(addr).await;

    alice.send(json!({"type": "create", "username": "alice"})).await;
    let code = alice.recv().await["code"].as_str().unwrap().to_owned();
    bob.send(json!({"type": "join", "username": "bob", "code": code})).await;
    bob.recv().await;
    alice.recv().await;

    let bob_id = bob.id.clone();
    drop(bob);

    assert_eq!(
        alice.recv().await,
        json!({"type": "peer_left", "id": bob_id, "username": "bob"})
    );
    let info: Value = room_status(addr, &code).await.json().await.unwrap();
    assert_eq!(info["members"], json!([{"id": alice.id, "username": "alice"}]));

    alice.socket.close(None).await.unwrap();
    drop(alice);

    let mut status = room_status(addr, &code).await.status();
    for _ in 0..50 {
        if status == reqwest::StatusCode::NOT_FOUND {
            break;
        }
        time::sleep(Duration::from_millis(20)).await;
        status = room_status(addr, &code).await.status();
    }
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn silent_clients_time_out_and_empty_their_room() {
    let addr = spawn_server_with(Config {
        ping_interval: Duration::from_secs(1),
        client_timeout: Duration::from_secs(2),
        ..Config::default()
    })
    .await;
    let mut alice = Client::connect(addr).await;
    let mut bob = Client::connect(addr).await;

    alice.send(json!({"type": "create", "username": "alice"})).await;
    let code = alice.recv().await["code"].as_str().unwrap().to_owned();
    bob.send(json!({"type": "join", "username": "bob", "code": code})).await;
    bob.recv().await;
    alice.recv().await;

    // bob keeps his socket open but stops reading, so his pongs never go out;
    // alice keeps reading and answers every ping
    assert_eq!(
        alice.recv().await,
        json!({"type": "peer_left", "id": bob.id, "username": "bob"})
    );
    let info: Value = room_status(addr, &code).await.json().await.unwrap();
    assert_eq!(info["members"], json!([{"id": alice.id, "username": "alice"}]));

    // now alice goes quiet as well
    let mut status = room_status(addr, &code).await.status();
    for _ in 0..60 {
        if status == reqwest::StatusCode::NOT_FOUND {
            break;
        }
        time::sleep(Duration::from_millis(100)).await;
        status = room_status(addr, &code).await.status();
    }
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);

    drop((alice, bob));
}

#[tokio::test]
async fn errors_go_back_to_the_sender_only() {
    let addr = spawn_server().await;
    let mut carol = Client::connect(addr).await;

    carol
        .send(json!({"type": "join", "username": "carol", "code": "ZZZZZZ"}))
        .await;
    let reply = carol.recv().await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["reason"], "RoomNotFound");

    carol.socket.send(Message::Text("hello?".to_owned())).await.unwrap();
    assert_eq!(carol.recv().await["reason"], "MalformedMessage");

    // the connection survives protocol errors
    carol.send(json!({"type": "create", "username": "carol"})).await;
    assert_eq!(carol.recv().await["type"], "created");
}

#[tokio::test]
async fn index_page_is_served() {
    let addr = spawn_server().await;
    let body = reqwest::get(format!("http://{addr}/")).await.unwrap().text().await.unwrap();
    assert!(body.contains("<title>Rip Chat</title>"));
}
