//! Per-connection line framing: reads raw bytes off a socket and turns them
//! into newline-terminated command lines, enforcing a hard cap on line
//! length. Generic over `AsyncRead` so it can be driven by a real socket's
//! `OwnedReadHalf` in production or an in-memory duplex half in tests.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::UnboundedSender;

use crate::dispatch::{ConnId, Input, InputKind};

/// Hard cap on a single line's length, newline included.
pub const MAX_LINE_BYTES: usize = 100;

/// Reads `stream` until EOF, emitting an [`InputKind::Line`] for every
/// newline-framed command and a final [`InputKind::Close`]. An overlong
/// line — one with no newline within [`MAX_LINE_BYTES`] — closes the
/// connection early.
pub async fn frame_connection<R>(conn: ConnId, mut stream: R, events: UnboundedSender<Input>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; MAX_LINE_BYTES];
    let mut pos = 0usize;

    loop {
        if pos == buf.len() {
            eprintln!("received an overlong line from connection {conn}");
            break;
        }
        let n = match stream.read(&mut buf[pos..]).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                eprintln!("read error on connection {conn}: {e}");
                break;
            }
        };
        pos += n;
        while let Some(i) = buf[..pos].iter().position(|&b| b == b'\n') {
            let line = String::from_utf8_lossy(&buf[..=i]).trim().to_string();
            let _ = events.send(Input { conn, kind: InputKind::Line(line) });
            buf.copy_within(i + 1..pos, 0);
            pos -= i + 1;
        }
    }
    let _ = events.send(Input { conn, kind: InputKind::Close });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncWriteExt};
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn frames_multiple_lines_delivered_in_one_read() {
        let (mut client, server_half) = duplex(1024);
        let (tx, mut rx) = unbounded_channel();
        client.write_all(b"A1\nB1\n").await.unwrap();
        drop(client);

        frame_connection(7, server_half, tx).await;

        match rx.recv().await.unwrap().kind {
            InputKind::Line(l) => assert_eq!(l, "A1"),
            _ => panic!("expected a Line event"),
        }
        match rx.recv().await.unwrap().kind {
            InputKind::Line(l) => assert_eq!(l, "B1"),
            _ => panic!("expected a Line event"),
        }
        match rx.recv().await.unwrap().kind {
            InputKind::Close => {}
            _ => panic!("expected a Close event on EOF"),
        }
    }

    #[tokio::test]
    async fn overlong_line_closes_the_connection_without_a_line_event() {
        let (mut client, server_half) = duplex(4096);
        let (tx, mut rx) = unbounded_channel();
        client.write_all(&vec![b'x'; MAX_LINE_BYTES]).await.unwrap();
        drop(client);

        frame_connection(1, server_half, tx).await;

        match rx.recv().await.unwrap().kind {
            InputKind::Close => {}
            _ => panic!("expected a Close event for an overlong line"),
        }
        assert!(rx.try_recv().is_err());
    }
}
