use bytes::BytesMut;
use snapkv::protocol::{RespEncoder, RespParser, RespValue};
use snapkv::server::Server;
use snapkv::{KvClient, KvService, KvStore, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const TIMEOUT: Duration = Duration::from_secs(5);

struct Running {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl Running {
    async fn stop(self) {
        self.shutdown.cancel();
        self.handle.await.unwrap().unwrap();
    }
}

async fn start(service: KvService) -> Running {
    let server = Server::bind("127.0.0.1:0", service).await.unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(server.run(shutdown.clone()));

    Running {
        addr,
        shutdown,
        handle,
    }
}

fn memory_service() -> KvService {
    KvService::new(Arc::new(KvStore::new()), Duration::from_secs(1))
}

async fn read_frame(stream: &mut TcpStream, buf: &mut BytesMut) -> RespValue {
    loop {
        if let Some(frame) = RespParser::parse(buf).unwrap() {
            return frame;
        }
        let n = stream.read_buf(buf).await.unwrap();
        assert!(n > 0, "server closed the connection");
    }
}

#[tokio::test]
async fn set_then_get_over_tcp() {
    let running = start(memory_service()).await;
    let mut client = KvClient::connect(running.addr, TIMEOUT).await.unwrap();

    let set = client.set("example", "Hello!").await.unwrap();
    assert!(set.success);

    let get = client.get("example").await.unwrap();
    assert_eq!(get.value, "Hello!");
    assert!(get.found);

    let missing = client.get("missing").await.unwrap();
    assert_eq!(missing.value, "");
    assert!(!missing.found);

    client.ping().await.unwrap();
    running.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_clients_see_their_own_keys() {
    let running = start(memory_service()).await;
    let addr = running.addr;

    let handles: Vec<_> = (0..100)
        .map(|i| {
            tokio::spawn(async move {
                let mut client = KvClient::connect(addr, TIMEOUT).await.unwrap();
                let key = format!("key{}", i);
                let value = format!("value{}", i);
                client.set(&key, &value).await.unwrap();
                client.get(&key).await.unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let get = handle.await.unwrap();
        assert!(get.found);
        assert_eq!(get.value, format!("value{}", i));
    }

    // Another connection observes every write
    let mut reader = KvClient::connect(addr, TIMEOUT).await.unwrap();
    for i in 0..100 {
        let get = reader.get(&format!("key{}", i)).await.unwrap();
        assert_eq!(get.value, format!("value{}", i));
    }

    running.stop().await;
}

#[tokio::test]
async fn snapshot_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        snapshot: dir.path().join("kvstore.json"),
        ..ServerConfig::default()
    };

    let service = KvService::open(&config).await.unwrap();
    let running = start(service.clone()).await;
    {
        let mut client = KvClient::connect(running.addr, TIMEOUT).await.unwrap();
        client.set("example", "Hello!").await.unwrap();
        client.set("", "empty key").await.unwrap();
    }
    running.stop().await;
    assert_eq!(service.persist().await.unwrap(), Some(2));

    let restored = KvService::open(&config).await.unwrap();
    let running = start(restored).await;
    let mut client = KvClient::connect(running.addr, TIMEOUT).await.unwrap();

    assert_eq!(client.get("example").await.unwrap().value, "Hello!");
    assert_eq!(client.get("").await.unwrap().value, "empty key");
    assert!(!client.get("missing").await.unwrap().found);

    running.stop().await;
}

#[tokio::test]
async fn pipelined_commands_get_ordered_replies() {
    let running = start(memory_service()).await;
    let mut stream = TcpStream::connect(running.addr).await.unwrap();

    let mut out = BytesMut::new();
    RespEncoder::encode_to(&mut out, &RespValue::command(["SET", "k", "v1"]));
    RespEncoder::encode_to(&mut out, &RespValue::command(["SET", "k", "v2"]));
    RespEncoder::encode_to(&mut out, &RespValue::command(["GET", "k"]));
    stream.write_all(&out).await.unwrap();

    let mut buf = BytesMut::new();
    assert_eq!(read_frame(&mut stream, &mut buf).await, RespValue::simple_string("OK"));
    assert_eq!(read_frame(&mut stream, &mut buf).await, RespValue::simple_string("OK"));
    assert_eq!(read_frame(&mut stream, &mut buf).await, RespValue::bulk_string("v2"));

    drop(stream);
    running.stop().await;
}

#[tokio::test]
async fn protocol_error_keeps_connection_open() {
    let running = start(memory_service()).await;
    let mut stream = TcpStream::connect(running.addr).await.unwrap();
    let mut buf = BytesMut::new();

    stream.write_all(b"garbage\r\n").await.unwrap();
    let reply = read_frame(&mut stream, &mut buf).await;
    assert!(matches!(reply, RespValue::Error(msg) if msg.starts_with("ERR protocol error")));

    stream
        .write_all(&RespEncoder::encode(&RespValue::command(["PING"])))
        .await
        .unwrap();
    assert_eq!(read_frame(&mut stream, &mut buf).await, RespValue::simple_string("PONG"));

    drop(stream);
    running.stop().await;
}

#[tokio::test]
async fn shutdown_closes_idle_connections() {
    let running = start(memory_service()).await;
    let mut stream = TcpStream::connect(running.addr).await.unwrap();

    // Make sure the connection has been accepted before stopping
    stream
        .write_all(&RespEncoder::encode(&RespValue::command(["PING"])))
        .await
        .unwrap();
    let mut buf = BytesMut::new();
    assert_eq!(read_frame(&mut stream, &mut buf).await, RespValue::simple_string("PONG"));

    tokio::time::timeout(TIMEOUT, running.stop())
        .await
        .expect("server did not stop with an idle client connected");

    let n = stream.read_buf(&mut buf).await.unwrap_or(0);
    assert_eq!(n, 0);
}

#[tokio::test]
async fn shutdown_with_client_not_reading_replies() {
    let running = start(memory_service()).await;

    let mut client = KvClient::connect(running.addr, TIMEOUT).await.unwrap();
    client.set("big", &"x".repeat(1024 * 1024)).await.unwrap();

    // Far more reply bytes than the socket buffers hold
    let mut stream = TcpStream::connect(running.addr).await.unwrap();
    let mut out = BytesMut::new();
    for _ in 0..64 {
        RespEncoder::encode_to(&mut out, &RespValue::command(["GET", "big"]));
    }
    stream.write_all(&out).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    tokio::time::timeout(TIMEOUT, running.stop())
        .await
        .expect("server did not stop while a client ignored its replies");
}
