use std::time::Duration;

use companion::constants::*;
use companion::{AppState, Config, Hub, HubSettings, create_router};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const A: &str = "aaaaaaaa-1111-4111-8111-111111111111";
const B: &str = "bbbbbbbb-2222-4222-8222-222222222222";

async fn spawn_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hub = Hub::spawn(HubSettings::default());
    let app = create_router(AppState::new(hub, Config::default()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{}", addr)
}

async fn connect(base: &str, user_id: &str) -> Socket {
    let (socket, _) = connect_async(format!("{}/start?userId={}", base, user_id))
        .await
        .unwrap();
    socket
}

async fn next_text(socket: &mut Socket) -> String {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("frame within timeout")
            .expect("socket open")
            .expect("frame ok");
        if let Message::Text(text) = frame {
            return text.as_str().to_string();
        }
    }
}

#[tokio::test]
async fn test_two_travellers_pair_and_chat() {
    let base = spawn_server().await;

    let mut a = connect(&base, A).await;
    assert_eq!(next_text(&mut a).await, MSG_SEARCHING);
    // let A's own search finish against an empty pool
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut b = connect(&base, B).await;
    assert_eq!(next_text(&mut b).await, MSG_SEARCHING);

    assert_eq!(next_text(&mut a).await, MSG_DEFAULT_GREETING);
    assert_eq!(next_text(&mut a).await, MSG_ACCEPT_PROMPT);

    a.send(Message::text("sure!")).await.unwrap();
    assert_eq!(next_text(&mut b).await, MSG_PARTNER_FOUND);
    assert_eq!(next_text(&mut b).await, "sure!");
    assert!(next_text(&mut b).await.starts_with("The trip begins"));

    b.send(Message::text("where to?")).await.unwrap();
    assert!(next_text(&mut a).await.starts_with("The trip begins"));
    assert_eq!(next_text(&mut a).await, "where to?");

    a.close(None).await.unwrap();
    assert_eq!(next_text(&mut b).await, MSG_PARTNER_OFFLINE);

    let mut a = connect(&base, A).await;
    assert_eq!(next_text(&mut b).await, MSG_PARTNER_ONLINE);
    b.send(Message::text("welcome back")).await.unwrap();
    assert_eq!(next_text(&mut a).await, "welcome back");
}

#[tokio::test]
async fn test_malformed_id_closed_with_policy_violation() {
    let base = spawn_server().await;
    let mut socket = connect(&base, "not-a-uuid").await;

    let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match frame {
        Message::Close(Some(close)) => assert_eq!(close.code, CloseCode::Policy),
        other => panic!("expected close frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_oversized_frame_terminates_connection() {
    let base = spawn_server().await;
    let mut socket = connect(&base, A).await;
    assert_eq!(next_text(&mut socket).await, MSG_SEARCHING);

    socket.send(Message::text("x".repeat(MAX_FRAME_SIZE + 1))).await.unwrap();

    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match socket.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(ended.is_ok());
}
