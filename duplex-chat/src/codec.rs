use std::io;

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// Longest line accepted from a peer, line ending excluded.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Reads one text line, without its line ending. `Ok(None)` on end of stream.
///
/// Invalid UTF-8 and lines longer than [`MAX_LINE_BYTES`] surface as
/// `InvalidData` errors.
pub async fn read_text_line<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let mut limited = (&mut *reader).take(MAX_LINE_BYTES as u64 + 1);
    let bytes = limited.read_line(&mut line).await?;
    if bytes == 0 {
        return Ok(None);
    }
    if bytes > MAX_LINE_BYTES && !line.ends_with('\n') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line longer than {MAX_LINE_BYTES} bytes"),
        ));
    }
    let len = line.trim_end_matches(LINE_ENDINGS).len();
    line.truncate(len);
    Ok(Some(line))
}

/// Writes `line` followed by a newline and flushes.
pub async fn write_text_line<W>(writer: &mut W, line: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Reads the next JSON-encoded value, one per line, skipping blank lines.
pub async fn read_message<R, T>(reader: &mut R) -> io::Result<Option<T>>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    loop {
        let Some(line) = read_text_line(reader).await? else {
            return Ok(None);
        };
        if line.is_empty() {
            continue;
        }

        let parsed = serde_json::from_str(&line).map_err(to_io_error)?;
        return Ok(Some(parsed));
    }
}

pub async fn write_message<W, T>(writer: &mut W, message: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut encoded = serde_json::to_vec(message).map_err(to_io_error)?;
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}

fn to_io_error(err: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}
