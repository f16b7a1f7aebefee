//! Integration tests for the client against real sockets
//!
//! These tests validate wire compatibility and a full UDP session against a
//! minimal scripted server.

use client::bot::ScriptedInput;
use client::config::SyncConfig;
use client::frame_loop::FrameLoop;
use client::network::{decode_datagram, Client, NetworkConditions};
use client::rendering::RecordingRenderer;
use client::SyncError;
use shared::protocol::{
    decode, encode, from_json, to_json, GameStateMessage, MatchStart, PlayerSnapshot,
};
use shared::{CharacterStats, ClientEvent, InputFlags, PlayerState, ServerEvent, MOVEMENT_SPEED};
use std::net::UdpSocket;
use std::time::Duration;
use tokio::time::timeout;

fn player(id: u32, x: f32) -> PlayerSnapshot {
    PlayerSnapshot::from_state(&PlayerState::new(id, x, CharacterStats::default()), None)
}

fn match_start() -> ServerEvent {
    ServerEvent::MatchStart(MatchStart {
        server_tick: 500,
        server_time_ms: 0,
        tick_rate: 60,
        match_start_tick: 500,
    })
}

/// NETWORK PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// An input batch crosses a real socket intact and the server's reply
    /// acknowledges it
    #[test]
    fn input_batch_round_trip_over_udp() {
        let server_socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind server socket");
        let server_addr = server_socket.local_addr().unwrap();
        let client_socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind client socket");
        for socket in [&server_socket, &client_socket] {
            socket
                .set_read_timeout(Some(Duration::from_millis(500)))
                .unwrap();
        }

        let mut frame_loop = FrameLoop::new(SyncConfig::default());
        let mut renderer = RecordingRenderer::default();
        frame_loop.start();
        frame_loop
            .dispatch(ServerEvent::Connected { player_id: 1 }, 0.0)
            .unwrap();
        frame_loop
            .dispatch(ServerEvent::PlayerJoined(player(1, 100.0)), 0.0)
            .unwrap();
        frame_loop.dispatch(match_start(), 0.0).unwrap();

        frame_loop.handle_key("ArrowRight", true, 0.0);
        for frame in 0..4u64 {
            frame_loop.step((frame as f64 + 0.5) * 1000.0 / 60.0, &mut renderer);
        }
        for event in frame_loop.drain_outbound() {
            client_socket
                .send_to(&encode(&event).unwrap(), server_addr)
                .unwrap();
        }

        let mut buf = [0; 4096];
        let batch = loop {
            let (size, from) = server_socket.recv_from(&mut buf).unwrap();
            assert_eq!(from, client_socket.local_addr().unwrap());
            if let ClientEvent::InputBatch(batch) = decode::<ClientEvent>(&buf[..size]).unwrap() {
                break batch;
            }
        };
        let ticks: Vec<u64> = batch.frames.iter().map(|frame| frame.t).collect();
        assert_eq!(ticks, vec![500, 501, 502]);
        assert!(batch
            .frames
            .iter()
            .all(|frame| InputFlags::from_bits(frame.k).unwrap().right));

        // The server consumed the first frame of the batch
        let mut acknowledged = PlayerState::new(1, 100.0, CharacterStats::default());
        acknowledged.x += MOVEMENT_SPEED;
        let reply = ServerEvent::GameState(GameStateMessage {
            tick: 500,
            players: vec![PlayerSnapshot::from_state(&acknowledged, Some(500))],
        });
        server_socket
            .send_to(&encode(&reply).unwrap(), client_socket.local_addr().unwrap())
            .unwrap();

        let (size, _) = client_socket.recv_from(&mut buf).unwrap();
        let now = 4.5 * 1000.0 / 60.0;
        frame_loop.dispatch(decode_datagram(&buf[..size]).unwrap(), now).unwrap();
        let report = frame_loop.step(now, &mut renderer).unwrap();
        let outcome = report.reconciliation.unwrap();
        assert_eq!(outcome.last_processed_tick, 500);
        assert_eq!(outcome.correction_error, 0.0);
        assert!(frame_loop.batcher().history().ticks().all(|tick| tick >= 500));
    }

    /// Batches produced by the frame loop read back as the server expects them
    #[test]
    fn frame_loop_batches_decode_as_json() {
        let mut frame_loop = FrameLoop::new(SyncConfig::default());
        let mut renderer = RecordingRenderer::default();
        frame_loop.start();
        frame_loop
            .dispatch(ServerEvent::Connected { player_id: 1 }, 0.0)
            .unwrap();
        frame_loop
            .dispatch(ServerEvent::PlayerJoined(player(1, 100.0)), 0.0)
            .unwrap();
        frame_loop.dispatch(match_start(), 0.0).unwrap();

        frame_loop.handle_key("KeyA", true, 0.0);
        for frame in 0..4u64 {
            frame_loop.step((frame as f64 + 0.5) * 1000.0 / 60.0, &mut renderer);
        }

        let batch = frame_loop
            .drain_outbound()
            .into_iter()
            .find(|event| matches!(event, ClientEvent::InputBatch(_)))
            .expect("a batch after three frames");
        let json = to_json(&batch).unwrap();
        assert!(json.starts_with("{\"ib\":{\"b\":["));

        match from_json::<ClientEvent>(&json).unwrap() {
            ClientEvent::InputBatch(batch) => {
                let ticks: Vec<u64> = batch.frames.iter().map(|frame| frame.t).collect();
                assert_eq!(ticks, vec![500, 501, 502]);
                for frame in &batch.frames {
                    let flags = InputFlags::from_bits(frame.k).unwrap();
                    assert!(flags.left && !flags.right);
                }
            }
            other => panic!("Expected an input batch, got {:?}", other),
        }
    }
}

/// CLIENT SESSION TESTS
mod session_tests {
    use super::*;
    use tokio::net::UdpSocket;

    /// Replies to the handshake and echoes pings; returns every event it received.
    async fn scripted_server(socket: UdpSocket, farewell: Option<String>) -> Vec<ClientEvent> {
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let Ok(Ok((len, from))) =
                timeout(Duration::from_secs(3), socket.recv_from(&mut buf)).await
            else {
                break;
            };
            let event: ClientEvent = decode(&buf[..len]).unwrap();

            let mut replies = Vec::new();
            match &event {
                ClientEvent::Connect { .. } => {
                    replies.push(ServerEvent::Connected { player_id: 1 });
                    replies.push(ServerEvent::PlayerJoined(player(1, 100.0)));
                    replies.push(ServerEvent::PlayerJoined(player(2, 800.0)));
                    replies.push(match_start());
                }
                ClientEvent::Ping {
                    seq,
                    client_sent_at,
                } => replies.push(ServerEvent::Pong {
                    seq: *seq,
                    client_sent_at: *client_sent_at,
                }),
                ClientEvent::InputBatch(_) => {
                    if let Some(reason) = &farewell {
                        replies.push(ServerEvent::Disconnected {
                            reason: reason.clone(),
                        });
                    }
                }
                _ => {}
            }
            for reply in replies {
                socket.send_to(&encode(&reply).unwrap(), from).await.unwrap();
            }

            let done = matches!(event, ClientEvent::Disconnect);
            received.push(event);
            if done || (farewell.is_some() && received.len() > 20) {
                break;
            }
        }
        received
    }

    /// A timed session connects, sends batches and probes, then says goodbye
    #[tokio::test]
    async fn timed_session_against_server() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let server = tokio::spawn(scripted_server(socket, None));

        let mut client = Client::new(
            &addr.to_string(),
            SyncConfig::default(),
            NetworkConditions::default(),
            Some(ScriptedInput::new(11)),
            11,
        )
        .await
        .unwrap();
        client.run(Some(Duration::from_millis(400))).await.unwrap();

        let received = server.await.unwrap();
        assert!(matches!(received.first(), Some(ClientEvent::Connect { .. })));
        assert!(matches!(received.last(), Some(ClientEvent::Disconnect)));
        assert!(received
            .iter()
            .any(|event| matches!(event, ClientEvent::InputBatch(_))));
        assert!(received
            .iter()
            .any(|event| matches!(event, ClientEvent::Ping { .. })));

        let frame_loop = client.frame_loop();
        assert!(!frame_loop.is_running());
        assert!(frame_loop.clock().is_anchored());
        assert!(frame_loop.latency().sample_count() >= 1);
        assert_eq!(frame_loop.registry().len(), 2);
    }

    /// A server-side disconnect ends the session with an error
    #[tokio::test]
    async fn server_disconnect_ends_session() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let server = tokio::spawn(scripted_server(socket, Some("room closed".to_string())));

        let mut client = Client::new(
            &addr.to_string(),
            SyncConfig::default(),
            NetworkConditions::default(),
            Some(ScriptedInput::new(3)),
            3,
        )
        .await
        .unwrap();
        let result = client.run(Some(Duration::from_secs(2))).await;

        match result {
            Err(SyncError::Disconnected(reason)) => assert_eq!(reason, "room closed"),
            other => panic!("Expected a disconnect, got {:?}", other),
        }
        assert!(!client.frame_loop().is_running());
        server.abort();
    }

    /// Simulated latency delays delivery without stalling frames
    #[tokio::test]
    async fn simulated_latency_still_connects() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let server = tokio::spawn(scripted_server(socket, None));

        let conditions = NetworkConditions {
            fake_ping_ms: 60,
            packet_loss: 0.0,
        };
        let mut client =
            Client::new(&addr.to_string(), SyncConfig::default(), conditions, None, 5)
                .await
                .unwrap();
        client.run(Some(Duration::from_millis(500))).await.unwrap();

        let received = server.await.unwrap();
        assert!(received
            .iter()
            .any(|event| matches!(event, ClientEvent::InputBatch(_))));

        let latency = client.frame_loop().latency().latency_ms().unwrap();
        assert!(latency >= 55.0, "measured {}ms", latency);
        assert!(client.frame_loop().frame() > 15);
    }
}
