use std::sync::Arc;

use http::{Response, StatusCode, header};
use micro_http_stream::connection::{IoTransport, ResponseBodyStream, StreamConfig};
use micro_http_stream::protocol::{EncodingMode, ErrorPolicy, HeaderCoordinator, PayloadSize, ResponseState};
use tokio::io::{AsyncReadExt, DuplexStream, duplex};
use tracing::Level;

const PIPE_CAPACITY: usize = 4 * 1024 * 1024;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(Level::TRACE).try_init();
}

fn response(payload_size: PayloadSize) -> Arc<ResponseState> {
    let head = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(())
        .unwrap();
    Arc::new(ResponseState::new(head, payload_size))
}

/// Reads everything the stream wrote, the stream has to be dropped first
async fn read_all(mut reader: DuplexStream) -> Vec<u8> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await.unwrap();
    buf
}

/// Splits the header block from the body
fn split_head(wire: &[u8]) -> (&[u8], &[u8]) {
    let end = wire.windows(4).position(|w| w == b"\r\n\r\n").expect("header block terminator") + 4;
    wire.split_at(end)
}

fn payloads() -> Vec<Vec<u8>> {
    vec![
        b"a".to_vec(),
        b"hello world".to_vec(),
        vec![b'x'; 15],
        vec![b'y'; 16],
        vec![b'z'; 20 * 1024],
        vec![b'w'; 70 * 1024 + 3],
        b"tail".to_vec(),
    ]
}

#[tokio::test]
async fn chunked_body_is_framed_per_write() {
    init_tracing();
    let (writer, reader) = duplex(PIPE_CAPACITY);
    let response = response(PayloadSize::Chunked);

    {
        let mut body = response.body_stream(IoTransport::new(writer), ErrorPolicy::Propagate);
        for payload in payloads() {
            body.write(&payload).await.unwrap();
        }
        body.close().await.unwrap();
    }

    let wire = read_all(reader).await;
    let (head, body) = split_head(&wire);
    let head = std::str::from_utf8(head).unwrap();
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("transfer-encoding: chunked\r\n"));
    assert!(head.contains("content-type: text/plain\r\n"));

    let mut expected = Vec::new();
    for payload in payloads() {
        expected.extend_from_slice(format!("{:x}\r\n", payload.len()).as_bytes());
        expected.extend_from_slice(&payload);
        expected.extend_from_slice(b"\r\n");
    }
    expected.extend_from_slice(b"0\r\n\r\n");
    assert_eq!(body, &expected[..]);
    assert!(response.is_body_complete());
}

#[tokio::test]
async fn identity_body_is_the_concatenated_payload() {
    init_tracing();
    let (writer, reader) = duplex(PIPE_CAPACITY);
    let total = payloads().iter().map(Vec::len).sum::<usize>() as u64;
    let response = response(PayloadSize::Length(total));

    {
        let mut body = response.body_stream(IoTransport::new(writer), ErrorPolicy::Propagate);
        assert_eq!(body.encoding_mode(), EncodingMode::Identity);
        for payload in payloads() {
            body.write(&payload).await.unwrap();
        }
        body.close().await.unwrap();
    }

    let wire = read_all(reader).await;
    let (head, body) = split_head(&wire);
    assert!(std::str::from_utf8(head).unwrap().contains(&format!("content-length: {total}\r\n")));
    assert_eq!(body, &payloads().concat()[..]);
}

#[tokio::test]
async fn started_writes_keep_the_framing() {
    init_tracing();
    let (writer, reader) = duplex(PIPE_CAPACITY);
    let response = response(PayloadSize::Chunked);

    {
        let mut body = response.body_stream(IoTransport::new(writer), ErrorPolicy::Propagate);

        let pending = body.start_write(b"abc").await.unwrap();
        body.finish_write(pending).await.unwrap();

        body.write(b"de").await.unwrap();

        let pending = body.start_write(&[b'f'; 17]).await.unwrap();
        body.finish_write(pending).await.unwrap();

        body.close().await.unwrap();
    }

    let wire = read_all(reader).await;
    let (_head, body) = split_head(&wire);

    let mut expected = b"3\r\nabc\r\n2\r\nde\r\n11\r\n".to_vec();
    expected.extend_from_slice(&[b'f'; 17]);
    expected.extend_from_slice(b"\r\n0\r\n\r\n");
    assert_eq!(body, &expected[..]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn header_block_is_sent_once_under_races() {
    init_tracing();

    for _ in 0..32 {
        let (writer, reader) = duplex(PIPE_CAPACITY);
        let response = response(PayloadSize::Chunked);

        let racers: Vec<_> = (0..4)
            .map(|i| {
                let response = Arc::clone(&response);
                tokio::spawn(async move { response.try_take_header_block(i % 2 == 1) })
            })
            .collect();

        {
            let mut body = response.body_stream(IoTransport::new(writer), ErrorPolicy::Propagate);
            body.write(b"abc").await.unwrap();
            body.close().await.unwrap();
        }

        let mut taken_by_racers = 0;
        for racer in racers {
            if racer.await.unwrap().is_some() {
                taken_by_racers += 1;
            }
        }

        let wire = read_all(reader).await;
        let sent_by_stream = usize::from(wire.starts_with(b"HTTP/1.1"));
        assert_eq!(taken_by_racers + sent_by_stream, 1);

        if sent_by_stream == 1 {
            assert!(wire.ends_with(b"\r\n\r\n3\r\nabc\r\n0\r\n\r\n"));
        } else {
            assert_eq!(wire, b"3\r\nabc\r\n0\r\n\r\n");
        }
    }
}

#[tokio::test]
async fn suppressed_failures_complete_silently() {
    init_tracing();
    let (writer, reader) = duplex(64);
    drop(reader);

    let response = response(PayloadSize::Chunked);
    let mut body = response.body_stream(IoTransport::new(writer), ErrorPolicy::Suppress);

    assert!(body.write(b"abc").await.unwrap().is_suppressed());
    assert!(body.close().await.unwrap().is_suppressed());
    assert!(body.is_closed());
    assert!(response.is_body_complete());
}

#[tokio::test]
async fn propagated_failures_surface() {
    init_tracing();
    let (writer, reader) = duplex(64);
    drop(reader);

    let response = response(PayloadSize::Length(3));
    let mut body = response.body_stream(IoTransport::new(writer), ErrorPolicy::Propagate);

    let err = body.write(b"abc").await.unwrap_err();
    assert!(err.is_io());

    // identity body with headers already taken, close has nothing left to send
    assert!(body.close().await.unwrap().is_written());
    assert!(body.write(b"abc").await.unwrap_err().is_invalid_state());
    assert!(response.is_body_complete());
}

#[tokio::test]
async fn custom_coordinator_and_config() {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use bytes::Bytes;

    #[derive(Default)]
    struct StaticHeaders {
        sent: Mutex<bool>,
        complete: AtomicBool,
    }

    impl HeaderCoordinator for StaticHeaders {
        fn try_take_header_block(&self, _for_close: bool) -> Option<Bytes> {
            let mut sent = self.sent.lock().unwrap();
            if *sent {
                return None;
            }
            *sent = true;
            Some(Bytes::from_static(b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n"))
        }

        fn notify_body_complete(&self) {
            self.complete.store(true, Ordering::SeqCst);
        }
    }

    init_tracing();
    let (writer, reader) = duplex(PIPE_CAPACITY);
    let headers = Arc::new(StaticHeaders::default());
    let config = StreamConfig::default().with_encoding_mode(EncodingMode::Chunked).with_coalesce_limit(0);

    {
        let mut body = ResponseBodyStream::with_config(IoTransport::new(writer), Arc::clone(&headers), config);
        body.write(b"abc").await.unwrap();
        body.close().await.unwrap();
    }

    let wire = read_all(reader).await;
    assert_eq!(wire, b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\n");
    assert!(headers.complete.load(Ordering::SeqCst));
}
