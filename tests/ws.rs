use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use model_browser::{app, AppState, ModelRegistry};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

async fn next_json<S>(socket: &mut S) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("no frame within 5s")
            .expect("socket closed")
            .expect("socket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

#[tokio::test]
async fn socket_subscribes_receives_and_cleans_up() {
    let state = AppState::with_registry(ModelRegistry::new());
    let hub = state.hub.clone();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state, 64 * 1024)).await.unwrap();
    });

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await.unwrap();
    wait_until(|| hub.connection_count() == 1).await;

    socket.send(Message::Text("not json".into())).await.unwrap();
    socket
        .send(Message::Text(json!({"type": "subscribe", "channel": "transactions"}).to_string()))
        .await
        .unwrap();
    socket.send(Message::Text(json!({"type": "ping"}).to_string())).await.unwrap();

    // Frames are handled in order, so the pong means the subscribe went through.
    assert_eq!(next_json(&mut socket).await["type"], "pong");
    assert_eq!(hub.subscriber_count("transactions"), 1);

    assert_eq!(hub.publish("transactions", json!({"amount": 250})), 1);
    assert_eq!(hub.publish("metrics", json!({"cpu": 3})), 0);

    let msg = next_json(&mut socket).await;
    assert_eq!(msg["type"], "data");
    assert_eq!(msg["channel"], "transactions");
    assert_eq!(msg["data"], json!({"amount": 250}));
    assert!(msg["timestamp"].is_string());

    socket.send(Message::Text(json!({"type": "ping"}).to_string())).await.unwrap();
    assert_eq!(next_json(&mut socket).await["type"], "pong");

    socket.close(None).await.unwrap();
    wait_until(|| hub.connection_count() == 0).await;
    assert_eq!(hub.subscriber_count("transactions"), 0);
}
