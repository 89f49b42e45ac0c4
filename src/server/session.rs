// Per-connection request loop

use crate::dispatcher::Dispatcher;
use crate::protocol::Reply;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Error message sent for a request line over the length limit
pub const REQUEST_TOO_LONG: &str = "Request too long";

/// Why a session ended abnormally. Logged, never sent to the client.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection error: {0}")]
    Io(#[from] io::Error),

    #[error("no request within {0:?}")]
    IdleTimeout(Duration),

    #[error("reply not written within {0:?}")]
    WriteTimeout(Duration),

    #[error("command task failed: {0}")]
    Dispatch(#[from] tokio::task::JoinError),
}

/// Limits applied to every session
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub idle_timeout: Duration,
    pub write_timeout: Duration,
    pub max_line_length: usize,
}

/// One read from the client
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Request {
    Line(String),
    /// A line longer than the limit; its bytes have been discarded
    TooLong,
    Eof,
}

/// Serve one client until it sends `EXIT`, disconnects, times out, or the
/// server shuts down.
///
/// Generic over the stream so tests can drive it with an in-memory pipe.
pub async fn serve_session<S>(
    stream: S,
    dispatcher: Arc<Dispatcher>,
    settings: SessionSettings,
    shutdown: CancellationToken,
) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);

    loop {
        let request = tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("closing session for shutdown");
                return Ok(());
            }
            read = timeout(settings.idle_timeout, read_request(&mut reader, settings.max_line_length)) => {
                read.map_err(|_| SessionError::IdleTimeout(settings.idle_timeout))??
            }
        };

        let line = match request {
            Request::Eof => return Ok(()),
            Request::TooLong => {
                debug!(limit = settings.max_line_length, "request too long");
                let reply = Reply::error("", REQUEST_TOO_LONG);
                write_reply(&mut writer, &reply, settings.write_timeout).await?;
                continue;
            }
            Request::Line(line) => line,
        };

        // History save/load touch the file system, so commands run on the
        // blocking pool. A started command always runs to completion.
        let handler = Arc::clone(&dispatcher);
        let outcome = tokio::task::spawn_blocking(move || handler.handle_line(&line)).await?;
        let Some(outcome) = outcome else {
            continue;
        };

        write_reply(&mut writer, &outcome.reply, settings.write_timeout).await?;
        if outcome.close {
            return Ok(());
        }
    }
}

/// Read one newline-terminated line of at most `max_len` bytes.
///
/// Reads through `fill_buf`/`consume` so an over-long line is dropped as it
/// arrives instead of being buffered whole. A final line without a newline
/// is still returned before `Eof`.
pub(crate) async fn read_request<R>(reader: &mut R, max_len: usize) -> io::Result<Request>
where
    R: AsyncBufRead + Unpin,
{
    let mut line: Vec<u8> = Vec::new();
    let mut too_long = false;

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(if too_long {
                Request::TooLong
            } else if line.is_empty() {
                Request::Eof
            } else {
                Request::Line(decode_line(line))
            });
        }

        let newline = available.iter().position(|&b| b == b'\n');
        let content_end = newline.unwrap_or(available.len());

        if !too_long {
            if line.len() + content_end > max_len {
                too_long = true;
                line = Vec::new();
            } else {
                line.extend_from_slice(&available[..content_end]);
            }
        }

        let consumed = newline.map_or(available.len(), |pos| pos + 1);
        reader.consume(consumed);

        if newline.is_some() {
            return Ok(if too_long {
                Request::TooLong
            } else {
                Request::Line(decode_line(line))
            });
        }
    }
}

fn decode_line(mut line: Vec<u8>) -> String {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8_lossy(&line).into_owned()
}

async fn write_reply<W>(writer: &mut W, reply: &Reply, limit: Duration) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = reply.encode();
    line.push('\n');

    let write = async {
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await
    };
    timeout(limit, write)
        .await
        .map_err(|_| SessionError::WriteTimeout(limit))??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::CalculatorState;
    use crate::evaluator::Evaluator;
    use crate::history::HistoryLog;
    use tempfile::TempDir;

    async fn read_all(input: &[u8], max_len: usize) -> Vec<Request> {
        let mut reader = input;
        let mut requests = Vec::new();
        loop {
            let request = read_request(&mut reader, max_len).await.unwrap();
            if request == Request::Eof {
                return requests;
            }
            requests.push(request);
        }
    }

    fn line(text: &str) -> Request {
        Request::Line(text.to_string())
    }

    #[tokio::test]
    async fn test_read_lines() {
        let requests = read_all(b"EVAL 1+1\nMR\r\nEXIT", 64).await;
        assert_eq!(requests, vec![line("EVAL 1+1"), line("MR"), line("EXIT")]);
    }

    #[tokio::test]
    async fn test_too_long_line_is_skipped() {
        let requests = read_all(b"EVAL 123456789\nMR\n", 8).await;
        assert_eq!(requests, vec![Request::TooLong, line("MR")]);
    }

    #[tokio::test]
    async fn test_line_at_limit_accepted() {
        let requests = read_all(b"12345678\n", 8).await;
        assert_eq!(requests, vec![line("12345678")]);
    }

    fn settings() -> SessionSettings {
        SessionSettings {
            idle_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            max_line_length: 64,
        }
    }

    fn dispatcher(dir: &TempDir) -> Arc<Dispatcher> {
        let history = HistoryLog::new(dir.path().join("history.dat"), None);
        Arc::new(Dispatcher::new(
            Evaluator::default(),
            CalculatorState::new(history),
            false,
        ))
    }

    #[tokio::test]
    async fn test_session_over_pipe() {
        let dir = TempDir::new().unwrap();
        let (client, server) = tokio::io::duplex(1024);
        let session = tokio::spawn(serve_session(
            server,
            dispatcher(&dir),
            settings(),
            CancellationToken::new(),
        ));

        let (reader, mut writer) = tokio::io::split(client);
        let mut lines = BufReader::new(reader).lines();

        writer.write_all(b"EVAL 2+2\nBOGUS\n\nEXIT\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "SUCCESS|2+2|4|");
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            "ERROR|||Unknown command"
        );
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "SUCCESS|EXIT||");
        assert!(lines.next_line().await.unwrap().is_none());

        session.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_session_too_long_continues() {
        let dir = TempDir::new().unwrap();
        let (client, server) = tokio::io::duplex(1024);
        let session = tokio::spawn(serve_session(
            server,
            dispatcher(&dir),
            settings(),
            CancellationToken::new(),
        ));

        let (reader, mut writer) = tokio::io::split(client);
        let mut lines = BufReader::new(reader).lines();

        let long = format!("EVAL {}\n", "1+".repeat(100));
        writer.write_all(long.as_bytes()).await.unwrap();
        writer.write_all(b"EVAL 3*3\nEXIT\n").await.unwrap();

        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            "ERROR|||Request too long"
        );
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "SUCCESS|3*3|9|");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "SUCCESS|EXIT||");
        session.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_idle_timeout() {
        let dir = TempDir::new().unwrap();
        let (_client, server) = tokio::io::duplex(64);
        let settings = SessionSettings {
            idle_timeout: Duration::from_millis(50),
            ..settings()
        };

        let result = serve_session(server, dispatcher(&dir), settings, CancellationToken::new()).await;
        assert!(matches!(result, Err(SessionError::IdleTimeout(_))));
    }

    #[tokio::test]
    async fn test_shutdown_ends_idle_session() {
        let dir = TempDir::new().unwrap();
        let (_client, server) = tokio::io::duplex(64);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        serve_session(server, dispatcher(&dir), settings(), shutdown)
            .await
            .unwrap();
    }
}
