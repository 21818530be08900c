use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::*;

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, message: &Value) {
    let json_bytes = serde_json::to_vec(message).unwrap();
    let length = json_bytes.len() as u32;
    writer.write_all(&length.to_le_bytes()).await.unwrap();
    writer.write_all(&json_bytes).await.unwrap();
}

async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Value {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.unwrap();
    let mut msg_buf = vec![0u8; u32::from_le_bytes(len_buf) as usize];
    reader.read_exact(&mut msg_buf).await.unwrap();
    serde_json::from_slice(&msg_buf).unwrap()
}

#[tokio::test]
async fn test_send_message_is_length_prefixed() {
    // server → client pipe: transport writes, test reads
    let (mut client_read, server_write) = tokio::io::duplex(1024);
    let (server_read, _client_write) = tokio::io::duplex(1024);

    let (transport, _rx) = PipeTransport::new(server_write, server_read);
    let (mut sender, _receiver) = transport.into_parts();

    let response = serde_json::json!({"id": 1, "result": {"value": "css=div"}});
    sender.send(response.clone()).await.unwrap();

    let mut len_buf = [0u8; 4];
    client_read.read_exact(&mut len_buf).await.unwrap();
    let length = u32::from_le_bytes(len_buf) as usize;
    assert_eq!(length, serde_json::to_vec(&response).unwrap().len());

    let mut msg_buf = vec![0u8; length];
    client_read.read_exact(&mut msg_buf).await.unwrap();
    let received: Value = serde_json::from_slice(&msg_buf).unwrap();
    assert_eq!(received, response);
}

#[tokio::test]
async fn test_multiple_requests_in_sequence() {
    let (_client_read, server_write) = tokio::io::duplex(4096);
    let (server_read, mut client_write) = tokio::io::duplex(4096);

    let (mut transport, mut rx) = PipeTransport::new(server_write, server_read);
    let read_task = tokio::spawn(async move { transport.run().await });

    let requests = vec![
        serde_json::json!({"id": 1, "guid": "", "method": "first"}),
        serde_json::json!({"id": 2, "guid": "", "method": "second"}),
        serde_json::json!({"id": 3, "guid": "", "method": "third"}),
    ];
    for request in &requests {
        write_frame(&mut client_write, request).await;
    }
    client_write.flush().await.unwrap();

    for expected in &requests {
        let received = rx.recv().await.unwrap();
        assert_eq!(&received, expected);
    }

    drop(client_write);
    let result = read_task.await.unwrap();
    assert!(result.is_ok(), "clean close should not error: {result:?}");
}

#[tokio::test]
async fn test_large_message() {
    let (_client_read, server_write) = tokio::io::duplex(1024 * 1024);
    let (server_read, mut client_write) = tokio::io::duplex(1024 * 1024);

    let (mut transport, mut rx) = PipeTransport::new(server_write, server_read);
    let read_task = tokio::spawn(async move { transport.run().await });

    let large_message = serde_json::json!({
        "id": 1,
        "guid": "",
        "method": "register",
        "params": {"source": "x".repeat(100_000)}
    });
    write_frame(&mut client_write, &large_message).await;
    client_write.flush().await.unwrap();

    let received = rx.recv().await.unwrap();
    assert_eq!(received, large_message);

    drop(client_write);
    let _ = read_task.await;
}

#[tokio::test]
async fn test_truncated_length_prefix_is_an_error() {
    let (_client_read, server_write) = tokio::io::duplex(1024);
    let (server_read, mut client_write) = tokio::io::duplex(1024);

    let (mut transport, _rx) = PipeTransport::new(server_write, server_read);

    client_write.write_all(&[0x01, 0x02]).await.unwrap();
    client_write.flush().await.unwrap();
    drop(client_write);

    let result = transport.run().await;
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("Failed to read length prefix")
    );
}

#[tokio::test]
async fn test_truncated_body_is_an_error() {
    let (_client_read, server_write) = tokio::io::duplex(1024);
    let (server_read, mut client_write) = tokio::io::duplex(1024);

    let (mut transport, _rx) = PipeTransport::new(server_write, server_read);

    client_write.write_all(&100u32.to_le_bytes()).await.unwrap();
    client_write.write_all(b"{\"id\":").await.unwrap();
    drop(client_write);

    let err = transport.run().await.unwrap_err();
    assert!(err.to_string().contains("Failed to read message body"), "{err}");
}

#[tokio::test]
async fn test_end_of_stream_closes_cleanly() {
    let (_client_read, server_write) = tokio::io::duplex(1024);
    let (server_read, client_write) = tokio::io::duplex(1024);

    let (mut transport, mut rx) = PipeTransport::new(server_write, server_read);
    drop(client_write);

    let read_task = tokio::spawn(async move { transport.run().await });
    assert!(read_task.await.unwrap().is_ok());
    assert!(rx.recv().await.is_none(), "inbound channel closes with the transport");
}

#[tokio::test]
async fn test_invalid_json_is_skipped() {
    let (_client_read, server_write) = tokio::io::duplex(1024);
    let (server_read, mut client_write) = tokio::io::duplex(1024);

    let (mut transport, mut rx) = PipeTransport::new(server_write, server_read);
    let read_task = tokio::spawn(async move { transport.run().await });

    let garbage = b"not json";
    client_write
        .write_all(&(garbage.len() as u32).to_le_bytes())
        .await
        .unwrap();
    client_write.write_all(garbage).await.unwrap();
    let valid = serde_json::json!({"id": 2, "guid": "", "method": "debugScopeState"});
    write_frame(&mut client_write, &valid).await;
    client_write.flush().await.unwrap();

    assert_eq!(rx.recv().await.unwrap(), valid);

    drop(client_write);
    let _ = read_task.await;
}

#[tokio::test]
async fn test_transport_parts_round_trip_through_trait_objects() {
    let (mut client_read, server_write) = tokio::io::duplex(4096);
    let (server_read, mut client_write) = tokio::io::duplex(4096);

    let (transport, message_rx) = PipeTransport::new(server_write, server_read);
    let TransportParts {
        mut sender,
        receiver,
        mut message_rx,
    } = transport.into_transport_parts(message_rx);
    let read_task = tokio::spawn(receiver.run());

    let request = serde_json::json!({"id": 5, "guid": "", "method": "debugScopeState"});
    write_frame(&mut client_write, &request).await;
    assert_eq!(message_rx.recv().await.unwrap(), request);

    let event = serde_json::json!({"guid": "", "method": "__create__", "params": {}});
    sender.send(event.clone()).await.unwrap();
    assert_eq!(read_frame(&mut client_read).await, event);

    drop(client_write);
    assert!(read_task.await.unwrap().is_ok());
}
