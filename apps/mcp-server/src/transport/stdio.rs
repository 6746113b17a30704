//! Standard I/O transport for MCP
//!
//! Messages are newline-delimited JSON; `Content-Length` framed messages
//! are accepted too and answered in the same framing. Requests run
//! concurrently, so responses may arrive out of order.
//!
//! IMPORTANT: All logging MUST go to stderr. stdout is reserved for
//! JSON-RPC protocol messages only.

use pptx_engine::{Result, ServerError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use super::decode_request;
use crate::mcp::protocol::JsonRpcResponse;
use crate::mcp::PptxMcpServer;

const CONTENT_LENGTH: &str = "content-length:";

/// How a message was framed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Line,
    ContentLength,
}

/// Run the MCP server using stdio transport
pub async fn run_stdio_server(server: PptxMcpServer) -> Result<()> {
    tracing::info!("Starting stdio transport");
    serve(server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    Ok(())
}

/// Serve requests from `reader` until EOF; returns `writer` once every
/// response has been written
pub async fn serve<R, W>(server: PptxMcpServer, mut reader: R, writer: W) -> Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(write_loop(writer, rx));

    loop {
        let (framing, body) = match read_message(&mut reader).await {
            Ok(Some(message)) => message,
            Ok(None) => {
                tracing::info!("EOF reached, shutting down");
                break;
            }
            Err(ServerError::IoError(e)) => {
                tracing::error!("Failed to read input: {}", e);
                break;
            }
            Err(e) => {
                tracing::error!("Failed to read message: {}", e);
                continue;
            }
        };

        let request = match decode_request(&body) {
            Ok(request) => request,
            Err(response) => {
                let _ = tx.send((framing, response));
                continue;
            }
        };

        let server = server.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Some(response) = server.handle_request(request).await {
                let _ = tx.send((framing, response));
            }
        });
    }

    drop(tx);
    writer_task
        .await
        .map_err(|e| ServerError::TaskError(e.to_string()))
}

async fn write_loop<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<(Framing, JsonRpcResponse)>,
) -> W {
    while let Some((framing, response)) = rx.recv().await {
        if let Err(e) = write_message(&mut writer, framing, &response).await {
            tracing::error!("Failed to write response: {}", e);
        }
    }
    writer
}

/// Read the next message body, skipping blank lines
async fn read_message<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<(Framing, Vec<u8>)>> {
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let lower = line.to_ascii_lowercase();
        let Some(length) = lower.strip_prefix(CONTENT_LENGTH) else {
            return Ok(Some((Framing::Line, line.as_bytes().to_vec())));
        };
        let length: usize = length
            .trim()
            .parse()
            .map_err(|_| ServerError::ProtocolError(format!("Invalid Content-Length: {}", line)))?;

        // Remaining headers end with an empty line
        loop {
            let mut header = String::new();
            if reader.read_line(&mut header).await? == 0 {
                return Err(ServerError::ProtocolError(
                    "Unexpected EOF in message headers".to_string(),
                ));
            }
            if header.trim().is_empty() {
                break;
            }
        }

        let mut body = vec![0u8; length];
        reader.read_exact(&mut body).await?;
        return Ok(Some((Framing::ContentLength, body)));
    }
}

async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    framing: Framing,
    response: &JsonRpcResponse,
) -> Result<()> {
    let body = serde_json::to_vec(response)?;
    match framing {
        Framing::Line => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
        Framing::ContentLength => {
            let header = format!("Content-Length: {}\r\n\r\n", body.len());
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
    }
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::server::tests::test_server;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_read_message_framings() {
        let input = "\n{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":1}\n\
                     Content-Length: 40\r\nContent-Type: application/json\r\n\r\n\
                     {\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":2}";
        let mut reader = input.as_bytes();

        let (framing, body) = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(framing, Framing::Line);
        assert_eq!(decode_request(&body).unwrap().id, Some(json!(1)));

        let (framing, body) = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(framing, Framing::ContentLength);
        assert_eq!(decode_request(&body).unwrap().id, Some(json!(2)));

        assert!(read_message(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bad_content_length() {
        let mut reader = "Content-Length: lots\r\n\r\n{}".as_bytes();
        assert!(matches!(
            read_message(&mut reader).await,
            Err(ServerError::ProtocolError(_))
        ));
    }

    #[tokio::test]
    async fn test_write_message_framings() {
        let response = JsonRpcResponse::success(Some(json!(1)), json!({"ok": true}));

        let mut output = Vec::new();
        write_message(&mut output, Framing::Line, &response).await.unwrap();
        let line = String::from_utf8(output).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        let mut output = Vec::new();
        write_message(&mut output, Framing::ContentLength, &response).await.unwrap();
        let framed = String::from_utf8(output).unwrap();
        let (header, body) = framed.split_once("\r\n\r\n").unwrap();
        assert_eq!(header, format!("Content-Length: {}", body.len()));
    }

    #[tokio::test]
    async fn test_serve_session() {
        let (_dir, server) = test_server();
        let input = [
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}).to_string(),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                   "params": {"name": "create_or_clear_presentation", "arguments": {"filename": "s"}}})
            .to_string(),
            "{broken".to_string(),
        ]
        .join("\n");

        let output = serve(server, input.as_bytes(), Vec::new()).await.unwrap();
        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);

        let by_id = |id: Value| responses.iter().find(|r| r["id"] == id).unwrap();
        assert_eq!(by_id(json!(1))["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(by_id(json!(2))["result"]["isError"], false);
        assert_eq!(by_id(Value::Null)["error"]["code"], -32700);
    }
}
