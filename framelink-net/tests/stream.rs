//! End-to-end tests for the framed stream transport.

use bytes::Bytes;
use framelink_net::{
    Dispatcher, ServerConfig, Session, SessionRegistry, StreamClient, StreamServer,
};
use framelink_wire::{Envelope, WireDecode, WireEncode};
use framelink_wire::{ByteBuf, WireError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

async fn start_server(server: StreamServer) -> (Arc<StreamServer>, std::net::SocketAddr) {
    let server = Arc::new(server);
    let runner = server.clone();
    tokio::spawn(async move {
        runner.run().await.unwrap();
    });
    let addr = server.bound_addr().await;
    (server, addr)
}

fn ephemeral_config() -> ServerConfig {
    ServerConfig::new("127.0.0.1:0".parse().unwrap())
}

#[tokio::test]
async fn test_echo_frame() {
    // Server registers a handler for type 7 that echoes the frame back.
    let observed = Arc::new(Mutex::new(Vec::new()));
    let mut dispatcher = Dispatcher::new();
    let seen = observed.clone();
    dispatcher.register(7, move |session: &Arc<Session>, frame: &Bytes| {
        seen.lock().unwrap().extend_from_slice(frame);
        session.write(frame.clone())
    });

    let (server, addr) = start_server(StreamServer::new(ephemeral_config(), dispatcher)).await;

    let mut client = StreamClient::connect("127.0.0.1", addr.port()).await.unwrap();
    let request = Envelope::new(7, "ping".to_string()).to_bytes().into_vec();
    client.send(request).unwrap();

    let reply = client.recv_frame().await.unwrap();
    let expected = [0x00, 0x07, 0x00, 0x00, 0x00, 0x04, 0x70, 0x69, 0x6e, 0x67];
    assert_eq!(reply.as_ref(), &expected);
    assert_eq!(observed.lock().unwrap().as_slice(), &expected);

    let decoded = Envelope::<String>::from_bytes(&reply).unwrap();
    assert_eq!(decoded.kind, 7);
    assert_eq!(decoded.payload, "ping");

    server.shutdown();
}

#[tokio::test]
async fn test_broadcast() {
    struct ChatMessage {
        username: String,
        message: String,
    }

    impl WireEncode for ChatMessage {
        fn encode(&self, buf: &mut ByteBuf) {
            self.username.encode(buf);
            self.message.encode(buf);
        }
    }

    impl WireDecode for ChatMessage {
        fn decode(data: &[u8], offset: &mut usize) -> Result<Self, WireError> {
            Ok(Self {
                username: String::decode(data, offset)?,
                message: String::decode(data, offset)?,
            })
        }
    }

    // Type 0 fans the frame out to every registered session.
    let registry = Arc::new(SessionRegistry::new());
    let mut dispatcher = Dispatcher::new();
    let fanout = registry.clone();
    dispatcher.register(0, move |_: &Arc<Session>, frame: &Bytes| {
        for session in fanout.snapshot() {
            if let Err(e) = session.write(frame.clone()) {
                tracing::warn!("broadcast to {} failed: {}", session.id(), e);
            }
        }
        Ok(())
    });

    let (server, addr) =
        start_server(StreamServer::with_registry(ephemeral_config(), dispatcher, registry)).await;

    let sender = StreamClient::connect("127.0.0.1", addr.port()).await.unwrap();
    let mut receiver_b = StreamClient::connect("127.0.0.1", addr.port()).await.unwrap();
    let mut receiver_c = StreamClient::connect("127.0.0.1", addr.port()).await.unwrap();

    // Let the server register all three sessions before sending.
    while server.registry().len() < 3 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let chat = Envelope::new(
        0,
        ChatMessage {
            username: "A".into(),
            message: "hi".into(),
        },
    );
    sender.send(chat.to_bytes().into_vec()).unwrap();

    for receiver in [&mut receiver_b, &mut receiver_c] {
        let frame = receiver.recv_frame().await.unwrap();
        let decoded = Envelope::<ChatMessage>::from_bytes(&frame).unwrap();
        assert_eq!(decoded.kind, 0);
        assert_eq!(decoded.payload.username, "A");
        assert_eq!(decoded.payload.message, "hi");
    }

    server.shutdown();
}

#[tokio::test]
async fn test_broadcast_order_per_receiver() {
    let registry = Arc::new(SessionRegistry::new());
    let mut dispatcher = Dispatcher::new();
    let fanout = registry.clone();
    dispatcher.register(1, move |_: &Arc<Session>, frame: &Bytes| {
        for session in fanout.snapshot() {
            let _ = session.write(frame.clone());
        }
        Ok(())
    });

    let (server, addr) =
        start_server(StreamServer::with_registry(ephemeral_config(), dispatcher, registry)).await;

    let sender = StreamClient::connect("127.0.0.1", addr.port()).await.unwrap();
    let mut receiver = StreamClient::connect("127.0.0.1", addr.port()).await.unwrap();
    while server.registry().len() < 2 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    for i in 0..20i32 {
        sender
            .send(Envelope::new(1, i).to_bytes().into_vec())
            .unwrap();
    }
    for i in 0..20i32 {
        let frame = receiver.recv_frame().await.unwrap();
        assert_eq!(Envelope::<i32>::from_bytes(&frame).unwrap().payload, i);
    }

    server.shutdown();
}

#[tokio::test]
async fn test_disconnect_hook_fires_exactly_once() {
    let disconnects = Arc::new(AtomicUsize::new(0));
    let counted = disconnects.clone();

    let server = StreamServer::new(ephemeral_config(), Dispatcher::new())
        .with_disconnect_hook(move |_id| {
            counted.fetch_add(1, Ordering::SeqCst);
        });
    let (server, addr) = start_server(server).await;

    let client = StreamClient::connect("127.0.0.1", addr.port()).await.unwrap();
    while server.registry().len() < 1 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Redundant closes collapse into one disconnect.
    client.close();
    client.close();

    while server.registry().len() > 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(disconnects.load(Ordering::SeqCst), 1);

    server.shutdown();
}

#[tokio::test]
async fn test_zero_length_payload_roundtrip() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(5, |session: &Arc<Session>, frame: &Bytes| {
        session.write(frame.clone())
    });
    let (server, addr) = start_server(StreamServer::new(ephemeral_config(), dispatcher)).await;

    let mut client = StreamClient::connect("127.0.0.1", addr.port()).await.unwrap();

    // Envelope with an empty payload: just the two type-code octets.
    client.send(Bytes::from_static(&[0x00, 0x05])).unwrap();
    let reply = client.recv_frame().await.unwrap();
    assert_eq!(reply.as_ref(), &[0x00, 0x05]);

    server.shutdown();
}

#[tokio::test]
async fn test_broadcast_after_shutdown_delivers_to_none() {
    let (server, addr) = start_server(StreamServer::new(ephemeral_config(), Dispatcher::new())).await;

    let mut client = StreamClient::connect("127.0.0.1", addr.port()).await.unwrap();
    while server.registry().len() < 1 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    server.shutdown();
    while server.is_running() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    server.broadcast(Bytes::from_static(&[0x00, 0x01]));

    // The client observes the close, not a frame.
    assert!(client.recv_frame().await.is_none());
}
