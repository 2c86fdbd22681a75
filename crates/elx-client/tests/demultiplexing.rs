//! Demultiplexing tests: one stream, concurrent callers, interleaved
//! pushes. A scripted server on the far side of a `tokio::io::duplex`
//! pair stands in for the TLS socket.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};

use elx_client::Client;
use elx_protocol::Error;

type ServerLines = tokio::io::Lines<BufReader<ReadHalf<DuplexStream>>>;

fn client_and_server() -> (Client<DuplexStream>, ServerLines, WriteHalf<DuplexStream>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let client = Client::from_stream(client_io);
    let (read, write) = tokio::io::split(server_io);
    (client, BufReader::new(read).lines(), write)
}

async fn read_request(lines: &mut ServerLines) -> Value {
    let line = lines
        .next_line()
        .await
        .unwrap()
        .expect("client closed the stream");
    serde_json::from_str(&line).unwrap()
}

async fn send_line(write: &mut WriteHalf<DuplexStream>, doc: Value) {
    write
        .write_all(format!("{doc}\n").as_bytes())
        .await
        .unwrap();
}

#[tokio::test]
async fn ping_resolves_with_a_null_result() {
    let (mut client, mut lines, mut write) = client_and_server();
    client.set_call_timeout(Some(Duration::from_secs(1)));

    let server = tokio::spawn(async move {
        let request = read_request(&mut lines).await;
        assert_eq!(request["method"], "server.ping");
        assert!(request["id"].is_u64());
        let id = request["id"].clone();
        send_line(&mut write, json!({"id": id, "result": null})).await;
        (lines, write)
    });

    client.ping().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn out_of_order_responses_reach_their_callers() {
    let (client, mut lines, mut write) = client_and_server();
    let client = Arc::new(client);

    let server = tokio::spawn(async move {
        let mut requests = Vec::new();
        for _ in 0..2 {
            let request = read_request(&mut lines).await;
            assert_eq!(request["method"], "blockchain.block.header");
            requests.push(request);
        }
        // Answer in reverse arrival order.
        for request in requests.iter().rev() {
            let height = request["params"]["height"].as_u64().unwrap();
            send_line(
                &mut write,
                json!({"id": request["id"], "result": format!("header-{height}")}),
            )
            .await;
        }
        (lines, write)
    });

    let first = {
        let client = client.clone();
        tokio::spawn(async move { client.block_header(101).await })
    };
    let second = {
        let client = client.clone();
        tokio::spawn(async move { client.block_header(202).await })
    };

    assert_eq!(first.await.unwrap().unwrap(), "header-101");
    assert_eq!(second.await.unwrap().unwrap(), "header-202");
    server.await.unwrap();
}

#[tokio::test]
async fn many_concurrent_callers_each_get_their_own_response() {
    const CALLERS: u64 = 16;

    let (client, mut lines, mut write) = client_and_server();
    let client = Arc::new(client);

    let server = tokio::spawn(async move {
        let mut requests = Vec::new();
        for _ in 0..CALLERS {
            requests.push(read_request(&mut lines).await);
        }
        // Scramble the reply order: evens first, then odds reversed.
        requests.sort_by_key(|request| {
            let id = request["id"].as_u64().unwrap();
            (id % 2, std::cmp::Reverse(id))
        });
        for request in requests {
            let height = request["params"]["height"].as_u64().unwrap();
            send_line(
                &mut write,
                json!({"id": request["id"], "result": format!("header-{height}")}),
            )
            .await;
        }
        (lines, write)
    });

    let calls: Vec<_> = (0..CALLERS)
        .map(|height| {
            let client = client.clone();
            tokio::spawn(async move { (height, client.block_header(height).await) })
        })
        .collect();

    for call in calls {
        let (height, result) = call.await.unwrap();
        assert_eq!(result.unwrap(), format!("header-{height}"));
    }
    server.await.unwrap();
}

#[tokio::test]
async fn interleaved_notification_routes_to_the_listener() {
    let (client, mut lines, mut write) = client_and_server();
    let (header_tx, mut header_rx) = tokio::sync::mpsc::unbounded_channel();
    client.on_headers(move |header| {
        header_tx.send(header).unwrap();
    });

    let server = tokio::spawn(async move {
        let request = read_request(&mut lines).await;
        assert_eq!(request["method"], "blockchain.headers.subscribe");
        // Push a notification between the request and its response.
        send_line(
            &mut write,
            json!({
                "method": "blockchain.headers.subscribe",
                "params": [{"height": 680001, "hex": "beef"}]
            }),
        )
        .await;
        send_line(
            &mut write,
            json!({"id": request["id"], "result": {"height": 680000, "hex": "dead"}}),
        )
        .await;
        (lines, write)
    });

    // The response still reaches the caller, uncorrupted by the push.
    let tip = client.headers_subscribe().await.unwrap();
    assert_eq!(tip.height, 680000);
    assert_eq!(tip.hex, "dead");

    let pushed = header_rx.recv().await.unwrap();
    assert_eq!(pushed.height, 680001);
    assert_eq!(pushed.hex, "beef");
    server.await.unwrap();
}

#[tokio::test]
async fn scripthash_notification_routes_to_its_own_listener() {
    let (client, mut lines, mut write) = client_and_server();
    let (status_tx, mut status_rx) = tokio::sync::mpsc::unbounded_channel();
    client.on_scripthash(move |status| {
        status_tx.send(status).unwrap();
    });

    let server = tokio::spawn(async move {
        let request = read_request(&mut lines).await;
        send_line(
            &mut write,
            json!({
                "method": "blockchain.scripthash.subscribe",
                "params": ["ab12", "feed"]
            }),
        )
        .await;
        send_line(&mut write, json!({"id": request["id"], "result": "cafe"})).await;
        (lines, write)
    });

    let current = client.scripthash_subscribe("ab12").await.unwrap();
    assert_eq!(current.as_deref(), Some("cafe"));

    let pushed = status_rx.recv().await.unwrap();
    assert_eq!(pushed.scripthash, "ab12");
    assert_eq!(pushed.status.as_deref(), Some("feed"));
    server.await.unwrap();
}

#[tokio::test]
async fn notification_without_a_listener_does_not_disturb_pending_calls() {
    let (client, mut lines, mut write) = client_and_server();

    let server = tokio::spawn(async move {
        let request = read_request(&mut lines).await;
        // Well-formed push with no listener registered: warn and move on.
        send_line(
            &mut write,
            json!({
                "method": "blockchain.headers.subscribe",
                "params": [{"height": 680000, "hex": "00"}]
            }),
        )
        .await;
        send_line(&mut write, json!({"id": request["id"], "result": null})).await;
        (lines, write)
    });

    client.ping().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn unknown_id_response_does_not_disturb_pending_calls() {
    let (client, mut lines, mut write) = client_and_server();

    let server = tokio::spawn(async move {
        let request = read_request(&mut lines).await;
        send_line(&mut write, json!({"id": 999_999, "result": "stray"})).await;
        send_line(&mut write, json!({"id": request["id"], "result": null})).await;
        (lines, write)
    });

    client.ping().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn malformed_line_is_skipped_and_the_loop_continues() {
    let (client, mut lines, mut write) = client_and_server();

    let server = tokio::spawn(async move {
        let request = read_request(&mut lines).await;
        write.write_all(b"this is not json\n").await.unwrap();
        send_line(&mut write, json!({"id": request["id"], "result": null})).await;
        (lines, write)
    });

    // Neither corruption nor a hang: the bad line is reported, the next
    // one answers the call.
    client.ping().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn rpc_error_envelope_fails_only_the_call_that_caused_it() {
    let (client, mut lines, mut write) = client_and_server();

    let server = tokio::spawn(async move {
        let request = read_request(&mut lines).await;
        send_line(
            &mut write,
            json!({
                "id": request["id"],
                "error": {"code": 1, "message": "the transaction was rejected"}
            }),
        )
        .await;
        let request = read_request(&mut lines).await;
        send_line(&mut write, json!({"id": request["id"], "result": null})).await;
        (lines, write)
    });

    match client.transaction_broadcast("00").await {
        Err(Error::Rpc(error)) => {
            assert_eq!(error.code, 1);
            assert_eq!(error.message, "the transaction was rejected");
        }
        other => panic!("expected an rpc error, got {other:?}"),
    }
    // The connection survives a server-side error.
    client.ping().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn result_shape_mismatch_is_a_protocol_error() {
    let (client, mut lines, mut write) = client_and_server();

    let server = tokio::spawn(async move {
        let request = read_request(&mut lines).await;
        send_line(
            &mut write,
            json!({"id": request["id"], "result": "not a number"}),
        )
        .await;
        (lines, write)
    });

    let result: Result<u64, _> = client.call("blockchain.estimatefee", json!({})).await;
    assert!(matches!(result, Err(Error::Protocol(_))));
    server.await.unwrap();
}
