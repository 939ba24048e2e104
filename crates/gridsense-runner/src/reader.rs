//! Byte stream reader and single-slot line handoff
//!
//! The reader task frames the input into lines and hands each one to the
//! control loop through a channel with room for exactly one line. When the
//! slot is occupied the reader waits, so lines are never dropped or
//! overwritten; the stall propagates back to the byte source.

use futures::StreamExt;
use gridsense_core::LineAssembler;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tracing::{debug, info};

/// Lines that may wait between the reader and the control loop
pub const LINE_SLOT_CAPACITY: usize = 1;

/// Boxed input stream
pub type Input = Box<dyn AsyncRead + Unpin + Send>;

/// Create the single-slot line handoff
pub fn line_channel() -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
    mpsc::channel(LINE_SLOT_CAPACITY)
}

/// Open `path` for reading, `-` meaning stdin
pub async fn open_input(path: &str) -> std::io::Result<Input> {
    if path == "-" {
        info!("Reading input from stdin");
        Ok(Box::new(tokio::io::stdin()))
    } else {
        info!(path, "Reading input");
        Ok(Box::new(tokio::fs::File::open(path).await?))
    }
}

/// Frame `reader` into lines and forward them until the input ends or the
/// consumer goes away. Returns the number of lines forwarded.
pub async fn forward_lines<R>(
    reader: R,
    max_line_len: usize,
    lines: mpsc::Sender<String>,
) -> gridsense_core::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut frames = FramedRead::new(reader, LineAssembler::with_max_len(max_line_len));
    let mut forwarded = 0;

    while let Some(line) = frames.next().await {
        let line = line?;
        debug!(len = line.len(), "line complete");
        if lines.send(line).await.is_err() {
            debug!("line consumer closed, stopping reader");
            break;
        }
        forwarded += 1;
    }

    Ok(forwarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_forwards_every_line_in_order() {
        let (tx, mut rx) = line_channel();
        let input: &[u8] = b"one\r\ntwo\nthree\npartial";

        let reader = tokio::spawn(forward_lines(input, 64, tx));

        let mut received = Vec::new();
        while let Some(line) = rx.recv().await {
            received.push(line);
        }
        assert_eq!(received, vec!["one", "two", "three"]);
        assert_eq!(reader.await.unwrap().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_reader_stalls_while_slot_full() {
        let (tx, mut rx) = line_channel();
        let input: &[u8] = b"a\nb\nc\n";

        let reader = tokio::spawn(forward_lines(input, 64, tx));
        tokio::time::sleep(Duration::from_millis(20)).await;

        // One line fills the slot; the reader is parked on the second
        assert!(!reader.is_finished());

        assert_eq!(rx.recv().await.as_deref(), Some("a"));
        assert_eq!(rx.recv().await.as_deref(), Some("b"));
        assert_eq!(rx.recv().await.as_deref(), Some("c"));
        assert_eq!(reader.await.unwrap().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_reader_stops_when_consumer_dropped() {
        let (tx, rx) = line_channel();
        drop(rx);

        let forwarded = forward_lines(&b"a\nb\n"[..], 64, tx).await.unwrap();
        assert_eq!(forwarded, 0);
    }
}
