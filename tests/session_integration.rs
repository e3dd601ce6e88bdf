//! Session integration tests
//!
//! Each test drives a [`Session`] against an in-memory host built on
//! `tokio::io::duplex`, checking the exact bytes the client puts on the wire.

use std::time::{Duration, Instant};

use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

use tn3270r::lib3270::codes::*;
use tn3270r::lib3270::display::addressing::encode_12bit;
use tn3270r::protocol_common::ebcdic::encode_ebcdic;
use tn3270r::{ErrorKind, Session, SessionConfig};

const WAIT: Duration = Duration::from_secs(2);

fn start_session() -> (Session, DuplexStream) {
    let (client, host) = duplex(8192);
    let session = Session::from_stream(client, SessionConfig::new("mainframe.test", 23)).unwrap();
    (session, host)
}

async fn expect_bytes(host: &mut DuplexStream, expected: &[u8]) {
    let mut received = vec![0u8; expected.len()];
    tokio::time::timeout(WAIT, host.read_exact(&mut received))
        .await
        .expect("client did not answer in time")
        .unwrap();
    assert_eq!(received, expected);
}

/// EW (restore), SBA(row 2, col 4), SF unprotected, "Hello", IAC EOR
fn hello_screen() -> Vec<u8> {
    let mut data = vec![CMD_ERASE_WRITE, WCC_RESTORE, ORDER_SBA, 0xC1, 0xD3, ORDER_SF, 0x00];
    data.extend(encode_ebcdic("Hello"));
    data.extend([0xFF, 0xEF]);
    data
}

#[tokio::test]
async fn test_negotiation_replies() {
    let (session, mut host) = start_session();

    host.write_all(&[0xFF, 0xFD, 0x18]).await.unwrap();
    expect_bytes(&mut host, &[0xFF, 0xFB, 0x18]).await;

    host.write_all(&[0xFF, 0xFA, 0x18, 0x01, 0xFF, 0xF0]).await.unwrap();
    let mut expected = vec![0xFF, 0xFA, 0x18, 0x00];
    expected.extend(b"IBM-3278-2");
    expected.extend([0xFF, 0xF0]);
    expect_bytes(&mut host, &expected).await;

    host.write_all(&[0xFF, 0xFD, 0x19, 0xFF, 0xFB, 0x19]).await.unwrap();
    expect_bytes(&mut host, &[0xFF, 0xFB, 0x19, 0xFF, 0xFD, 0x19]).await;

    host.write_all(&[0xFF, 0xFD, 0x00, 0xFF, 0xFB, 0x00]).await.unwrap();
    expect_bytes(&mut host, &[0xFF, 0xFB, 0x00, 0xFF, 0xFD, 0x00]).await;
    assert!(session.is_3270_mode());

    host.write_all(&[0xFF, 0xFD, 0x28]).await.unwrap();
    expect_bytes(&mut host, &[0xFF, 0xFC, 0x28]).await;
}

#[tokio::test]
async fn test_negotiation_followed_by_record_in_one_chunk() {
    let (session, mut host) = start_session();

    let mut chunk = vec![0xFF, 0xFD, 0x19];
    chunk.extend(hello_screen());
    host.write_all(&chunk).await.unwrap();

    expect_bytes(&mut host, &[0xFF, 0xFB, 0x19]).await;
    session.wait_for_text("Hello", false, WAIT).await.unwrap();
}

#[tokio::test]
async fn test_basic_screen_paint() {
    let (session, mut host) = start_session();
    assert!(session.is_keyboard_locked());

    host.write_all(&hello_screen()).await.unwrap();
    session.wait_for_text("Hello", false, WAIT).await.unwrap();

    assert_eq!(session.get_text(2, 5, 5).unwrap(), "Hello");
    assert!(!session.is_keyboard_locked());
    assert_eq!(session.row_containing_text("hello", true), Some(2));
}

#[tokio::test]
async fn test_record_split_across_reads() {
    let (session, mut host) = start_session();
    let screen = hello_screen();
    let (first, second) = screen.split_at(6);

    host.write_all(first).await.unwrap();
    host.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!session.has_text("Hello", false));

    host.write_all(second).await.unwrap();
    session.wait_for_text("Hello", false, WAIT).await.unwrap();
}

#[tokio::test]
async fn test_attention_key_submission() {
    let (session, mut host) = start_session();
    host.write_all(&hello_screen()).await.unwrap();
    session.wait_for_text("Hello", false, WAIT).await.unwrap();

    session.set_text(2, 4, "Test").unwrap();
    session.send_key("[enter]", 2, 4).await.unwrap();
    assert!(!session.has_pending_writes());
    assert!(session.is_keyboard_locked());

    expect_bytes(
        &mut host,
        &[0x7D, 0xC1, 0xD3, 0x11, 0xC1, 0xD3, 0xE3, 0x85, 0xA2, 0xA3, 0xFF, 0xEF],
    )
    .await;
}

#[tokio::test]
async fn test_attention_key_at_host_cursor() {
    let (session, mut host) = start_session();
    host.write_all(&hello_screen()).await.unwrap();
    session.wait_for_text("Hello", false, WAIT).await.unwrap();

    // End of record leaves the display cursor at the screen origin
    let (row, col) = session.cursor_coordinates();
    assert_eq!((row, col), (1, 1));
    let [b1, b2] = encode_12bit((row - 1) * 80 + (col - 1)).unwrap();

    session.set_text(2, 5, "Hi").unwrap();
    session.send_key_at_cursor("[pf1]").await.unwrap();
    assert!(!session.has_pending_writes());
    assert!(session.is_keyboard_locked());

    expect_bytes(
        &mut host,
        &[AID_PF1, b1, b2, 0x11, 0xC1, 0xD4, 0xC8, 0x89, 0xFF, 0xEF],
    )
    .await;

    let err = session.send_key_at_cursor("[nope]").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownAttentionKey);
}

#[tokio::test]
async fn test_staged_writes_flush_in_order() {
    let (session, mut host) = start_session();
    let mut screen = vec![CMD_ERASE_WRITE, WCC_RESTORE, ORDER_SF, 0x00];
    screen.extend([ORDER_SBA, 0xC1, 0x50, ORDER_SF, 0x00, 0xFF, 0xEF]);
    host.write_all(&screen).await.unwrap();
    tokio::time::timeout(WAIT, async {
        while session.is_keyboard_locked() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    session.set_text(1, 2, "A").unwrap();
    session.set_text(2, 1, "B").unwrap();
    session.send_key("[pf3]", 1, 1).await.unwrap();

    expect_bytes(
        &mut host,
        &[AID_PF3, 0x40, 0x40, 0x11, 0x40, 0xC1, 0xC1, 0x11, 0xC1, 0x50, 0xC2, 0xFF, 0xEF],
    )
    .await;
}

#[tokio::test]
async fn test_send_key_waits_for_keyboard_unlock() {
    let (session, mut host) = start_session();
    let mut locked = vec![CMD_ERASE_WRITE, 0x00];
    locked.extend(encode_ebcdic("BUSY"));
    locked.extend([0xFF, 0xEF]);
    host.write_all(&locked).await.unwrap();
    session.wait_for_text("BUSY", false, WAIT).await.unwrap();
    assert!(session.is_keyboard_locked());

    let started = Instant::now();
    let (sent, _) = tokio::join!(session.send_key("[clear]", 1, 1), async {
        tokio::time::sleep(Duration::from_millis(40)).await;
        host.write_all(&[CMD_WRITE, WCC_RESTORE, 0xFF, 0xEF]).await.unwrap();
    });
    sent.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(40));

    expect_bytes(&mut host, &[AID_CLEAR, 0x40, 0x40, 0xFF, 0xEF]).await;
}

#[tokio::test]
async fn test_wait_for_text_timeout() {
    let (session, _host) = start_session();

    let started = Instant::now();
    let err = session
        .wait_for_text("X", false, Duration::from_millis(50))
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.to_string().contains('X'));
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(200));
}

#[tokio::test]
async fn test_read_buffer_answered() {
    let (session, mut host) = start_session();
    host.write_all(&hello_screen()).await.unwrap();
    session.wait_for_text("Hello", false, WAIT).await.unwrap();

    host.write_all(&[CMD_READ_BUFFER, 0xFF, 0xEF]).await.unwrap();

    let mut reply = vec![0u8; 3 + 1920 + 2];
    tokio::time::timeout(WAIT, host.read_exact(&mut reply)).await.unwrap().unwrap();
    assert_eq!(&reply[..3], &[AID_NO_AID, 0x40, 0x40]);
    assert_eq!(&reply[3 + 84..3 + 89], encode_ebcdic("Hello").as_slice());
    assert_eq!(&reply[reply.len() - 2..], &[0xFF, 0xEF]);
}

#[tokio::test]
async fn test_read_modified_answered() {
    let (_session, mut host) = start_session();
    host.write_all(&[CMD_READ_MODIFIED, 0xFF, 0xEF]).await.unwrap();
    expect_bytes(&mut host, &[AID_NO_AID, 0x40, 0x40, 0xFF, 0xEF]).await;
}

#[tokio::test]
async fn test_render_after_paint() {
    let (session, mut host) = start_session();
    host.write_all(&hello_screen()).await.unwrap();
    session.wait_for_text("Hello", false, WAIT).await.unwrap();

    let text = session.render_text(true).await.unwrap();
    let lines: Vec<&str> = text.split('\n').collect();
    assert_eq!(lines.len(), 24);
    assert!(lines[1].starts_with("|    Hello"));

    let html = session.render_html().await.unwrap();
    assert!(html.contains("<input type='text' name='field_83'"));
    assert!(html.contains("color: green"));
}
