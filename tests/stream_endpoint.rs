//! End-to-end tests over loopback TCP

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use mjpeg_rs::control::{CropRect, LoggingScalerCrop, ZoomConfig, ZoomController};
use mjpeg_rs::{FrameSlot, MjpegServer, ServerConfig};

type TestServer = MjpegServer<ZoomController<LoggingScalerCrop>>;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server() -> (Arc<TestServer>, SocketAddr) {
    let config = ServerConfig::with_addr("127.0.0.1:0".parse().unwrap());
    let zoom = ZoomController::new(&ZoomConfig::default(), LoggingScalerCrop::new()).unwrap();
    let server = Arc::new(MjpegServer::new(config, Arc::new(FrameSlot::new()), zoom));

    let listener = server.bind().unwrap();
    let addr = listener.local_addr().unwrap();

    let serving = Arc::clone(&server);
    tokio::spawn(async move { serving.serve(listener).await });

    (server, addr)
}

async fn send_request(addr: SocketAddr, method: &str, path: &str) -> BufReader<TcpStream> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(format!("{} {} HTTP/1.0\r\nHost: test\r\n\r\n", method, path).as_bytes())
        .await
        .unwrap();
    BufReader::new(stream)
}

/// Read header lines up to the blank line; returns status line and headers
async fn read_head(reader: &mut BufReader<TcpStream>) -> (String, Vec<String>) {
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        let n = tokio::time::timeout(TIMEOUT, reader.read_line(&mut line))
            .await
            .expect("timed out reading head")
            .unwrap();
        assert!(n > 0, "connection closed inside head");

        let line = line.trim_end_matches("\r\n").to_string();
        if line.is_empty() {
            break;
        }
        lines.push(line);
    }

    let status = lines.remove(0);
    (status, lines)
}

fn status_code(status_line: &str) -> u16 {
    assert!(status_line.starts_with("HTTP/1."), "{}", status_line);
    status_line.split(' ').nth(1).unwrap().parse().unwrap()
}

fn header<'a>(headers: &'a [String], name: &str) -> Option<&'a str> {
    headers.iter().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

/// Read one multipart part and return its payload
async fn read_part(reader: &mut BufReader<TcpStream>) -> Vec<u8> {
    let (boundary, headers) = read_head(reader).await;
    assert_eq!(boundary, "--FRAME");
    assert_eq!(header(&headers, "Content-Type"), Some("image/jpeg"));

    let len: usize = header(&headers, "Content-Length").unwrap().parse().unwrap();
    let mut data = vec![0u8; len + 2];
    tokio::time::timeout(TIMEOUT, reader.read_exact(&mut data))
        .await
        .expect("timed out reading part")
        .unwrap();

    assert_eq!(&data[len..], b"\r\n");
    data.truncate(len);
    data
}

async fn open_stream(addr: SocketAddr) -> BufReader<TcpStream> {
    let mut reader = send_request(addr, "GET", "/stream.mjpg").await;
    let (status, headers) = read_head(&mut reader).await;

    assert_eq!(status_code(&status), 200);
    assert_eq!(header(&headers, "Age"), Some("0"));
    assert_eq!(
        header(&headers, "Content-Type"),
        Some("multipart/x-mixed-replace; boundary=FRAME")
    );
    reader
}

#[tokio::test]
async fn test_stream_starts_with_current_frame() {
    let (server, addr) = start_server().await;
    server.slot().write(&b"\xFF\xD8first"[..]);

    let mut client = open_stream(addr).await;
    assert_eq!(read_part(&mut client).await, b"\xFF\xD8first");

    server.slot().write(&b"\xFF\xD8second"[..]);
    assert_eq!(read_part(&mut client).await, b"\xFF\xD8second");
}

#[tokio::test]
async fn test_clients_waiting_for_first_frame() {
    let (server, addr) = start_server().await;

    // Both heads are written after the clients subscribed
    let mut a = open_stream(addr).await;
    let mut b = open_stream(addr).await;
    assert_eq!(server.stats().active_streams(), 2);

    server.slot().write(&b"\xFF\xD8one"[..]);
    assert_eq!(read_part(&mut a).await, b"\xFF\xD8one");
    assert_eq!(read_part(&mut b).await, b"\xFF\xD8one");

    server.slot().write(&b"\xFF\xD8two"[..]);
    assert_eq!(read_part(&mut a).await, b"\xFF\xD8two");
    assert_eq!(read_part(&mut b).await, b"\xFF\xD8two");
}

#[tokio::test]
async fn test_disconnected_client_is_removed() {
    let (server, addr) = start_server().await;

    let gone = open_stream(addr).await;
    let mut staying = open_stream(addr).await;
    drop(gone);

    // Keep writing until the dead client's write fails
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    let mut n = 0u32;
    while server.stats().active_streams() > 1 {
        assert!(tokio::time::Instant::now() < deadline, "dead client never removed");
        server.slot().write(vec![0xFF, 0xD8, (n % 256) as u8]);
        n += 1;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // The remaining client still sees new frames
    server.slot().write(&b"\xFF\xD8last"[..]);
    loop {
        if read_part(&mut staying).await == b"\xFF\xD8last" {
            break;
        }
    }
}

#[tokio::test]
async fn test_root_redirects_to_index() {
    let (_server, addr) = start_server().await;

    let mut reader = send_request(addr, "GET", "/").await;
    let (status, headers) = read_head(&mut reader).await;

    assert_eq!(status_code(&status), 301);
    assert_eq!(header(&headers, "Location"), Some("/index.html"));
}

#[tokio::test]
async fn test_index_page() {
    let (_server, addr) = start_server().await;

    let mut reader = send_request(addr, "GET", "/index.html").await;
    let (status, headers) = read_head(&mut reader).await;
    assert_eq!(status_code(&status), 200);
    assert_eq!(
        header(&headers, "Content-Type"),
        Some("text/html; charset=utf-8")
    );

    let mut body = String::new();
    tokio::time::timeout(TIMEOUT, reader.read_to_string(&mut body))
        .await
        .unwrap()
        .unwrap();
    assert!(body.contains("stream.mjpg"));
    assert_eq!(
        header(&headers, "Content-Length").unwrap().parse::<usize>().unwrap(),
        body.len()
    );
}

#[tokio::test]
async fn test_zoom_widens_crop() {
    let (server, addr) = start_server().await;
    let before = server.zoom().crop();

    let mut reader = send_request(addr, "POST", "/zoom").await;
    let (status, _) = read_head(&mut reader).await;
    assert_eq!(status_code(&status), 204);

    let after = server.zoom().crop();
    assert!(after.width >= before.width);
    assert!(after.height >= before.height);
    assert_eq!(server.zoom().camera().applied_count(), 2);
    assert_eq!(server.zoom().camera().last_applied(), Some(after));
    assert_ne!(after, CropRect::new(0, 0, before.width, before.height));
    assert_eq!(server.stats().snapshot().zoom_requests, 1);
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let (server, addr) = start_server().await;

    for (method, path) in [("GET", "/missing"), ("GET", "/zoom"), ("POST", "/stream.mjpg")] {
        let mut reader = send_request(addr, method, path).await;
        let (status, _) = read_head(&mut reader).await;
        assert_eq!(status_code(&status), 404, "{} {}", method, path);
    }

    assert_eq!(server.stats().snapshot().not_found, 3);
}
