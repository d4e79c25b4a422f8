use std::io;

use log::debug;
use services::{Session, SessionReply, SessionState};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::render;

/// Longest accepted input line in bytes, line ending excluded.
pub const MAX_LINE_LEN: usize = 4096;

/// Why a driven session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client typed `quit`.
    Quit,
    /// The input stream ended.
    Disconnected,
}

/// Run `session` over a line-oriented channel until the client quits or the
/// input ends.
///
/// Each line is handed to the session and everything it reports is written
/// back before the next line is read. When the input ends mid-command the
/// session's pending state is dropped with it.
///
/// # Errors
///
/// Returns the I/O error that ended the channel, e.g. a reset connection,
/// input that is not UTF-8, or a line longer than [`MAX_LINE_LEN`].
pub async fn drive<R, W>(mut session: Session, mut reader: R, mut writer: W) -> io::Result<SessionEnd>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_reply(&mut writer, &session.greeting()).await?;

    let mut buf = Vec::new();
    while let Some(line) = read_line(&mut reader, &mut buf).await? {
        let reply = session.handle_line(&line).await;
        write_reply(&mut writer, &reply).await?;
        if reply.close {
            return Ok(SessionEnd::Quit);
        }
    }

    if session.state() != SessionState::Idle {
        debug!("input ended during {:?}, discarding it", session.state());
    }
    Ok(SessionEnd::Disconnected)
}

/// Next line without its `\n` or `\r\n`, or `None` at end of input.
async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = MAX_LINE_LEN as u64 + 2;
    if (&mut *reader).take(limit).read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    if buf.len() > MAX_LINE_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("input line longer than {MAX_LINE_LEN} bytes"),
        ));
    }

    String::from_utf8(std::mem::take(buf))
        .map(Some)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

async fn write_reply<W>(writer: &mut W, reply: &SessionReply) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut out = String::new();
    for event in &reply.events {
        out.push_str(&render::event(event));
    }
    if !reply.close {
        out.push_str(&render::prompt(&reply.prompt));
    }
    writer.write_all(out.as_bytes()).await?;
    writer.flush().await
}
