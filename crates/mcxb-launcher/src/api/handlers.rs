use super::context::ApiContext;
use super::dashboard::{render_dashboard, DashboardView};
use super::responses::{HealthResponse, CONFIG_PLACEHOLDER};
use mcxb_types::{LauncherError, LauncherResult};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

const MAX_HEADER_LINES: usize = 100;
const MAX_LINE_BYTES: u64 = 8 * 1024;

struct RequestHead {
    method: String,
    target: String,
}

enum HeadError {
    Closed,
    Timeout,
    Malformed(String),
}

/// Reads one line of at most `MAX_LINE_BYTES`. `Ok(0)` means the peer closed.
async fn read_line_capped<R>(
    reader: &mut R,
    line: &mut String,
    timeout: Duration,
) -> Result<usize, HeadError>
where
    R: AsyncBufRead + Unpin,
{
    let mut limited = reader.take(MAX_LINE_BYTES);
    match tokio::time::timeout(timeout, limited.read_line(line)).await {
        Ok(Ok(n)) if n as u64 >= MAX_LINE_BYTES && !line.ends_with('\n') => {
            Err(HeadError::Malformed("Request line too long".into()))
        }
        Ok(Ok(n)) => Ok(n),
        Ok(Err(e)) => Err(HeadError::Malformed(format!("Failed to read request: {}", e))),
        Err(_) => Err(HeadError::Timeout),
    }
}

async fn read_head(stream: &mut TcpStream, timeout: Duration) -> Result<RequestHead, HeadError> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();

    if read_line_capped(&mut reader, &mut request_line, timeout).await? == 0 {
        return Err(HeadError::Closed);
    }

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(HeadError::Malformed("Invalid request line".into()));
    }
    let head = RequestHead {
        method: parts[0].to_string(),
        target: parts[1].to_string(),
    };

    let mut header_lines = 0;
    loop {
        let mut line = String::new();
        if read_line_capped(&mut reader, &mut line, timeout).await? == 0 || line.trim().is_empty() {
            break;
        }
        header_lines += 1;
        if header_lines > MAX_HEADER_LINES {
            return Err(HeadError::Malformed("Too many header lines".into()));
        }
    }

    Ok(head)
}

pub async fn handle_request(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    ctx: Arc<ApiContext>,
) -> LauncherResult<()> {
    let head = match read_head(&mut stream, ctx.request_timeout).await {
        Ok(head) => head,
        Err(HeadError::Closed) => return Ok(()),
        Err(HeadError::Timeout) => {
            return send_error_response(&mut stream, 408, "TIMEOUT", "Request timeout").await
        }
        Err(HeadError::Malformed(message)) => {
            return send_error_response(&mut stream, 400, "BAD_REQUEST", &message).await
        }
    };

    let head_only = match head.method.as_str() {
        "GET" => false,
        "HEAD" => true,
        other => {
            return send_error_response(
                &mut stream,
                405,
                "METHOD_NOT_ALLOWED",
                &format!("Method not allowed: {}", other),
            )
            .await
        }
    };

    let path = head.target.split('?').next().unwrap_or("/");
    debug!("{} {} from {}", head.method, path, peer_addr);

    let (content_type, body) = match path {
        "/health" => serve_health(&ctx),
        "/logs" => serve_logs(&ctx),
        "/config" => serve_config(&ctx).await,
        _ => serve_dashboard(&ctx),
    };

    send_response(&mut stream, 200, content_type, &body, head_only).await
}

fn serve_health(ctx: &ApiContext) -> (&'static str, String) {
    let response = HealthResponse::ok(ctx.state.state().to_string());
    let json = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"status":"ok","jar":"unknown"}"#.to_string());
    ("application/json", json)
}

fn serve_logs(ctx: &ApiContext) -> (&'static str, String) {
    ("text/plain; charset=utf-8", ctx.state.logs.render())
}

async fn serve_config(ctx: &ApiContext) -> (&'static str, String) {
    let body = match tokio::fs::read_to_string(&ctx.config_path).await {
        Ok(contents) => contents,
        Err(e) => {
            debug!("Config file {:?} unreadable: {}", ctx.config_path, e);
            CONFIG_PLACEHOLDER.to_string()
        }
    };
    ("text/plain; charset=utf-8", body)
}

fn serve_dashboard(ctx: &ApiContext) -> (&'static str, String) {
    let view = DashboardView::collect(ctx);
    ("text/html; charset=utf-8", render_dashboard(&view))
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

pub async fn send_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &str,
    head_only: bool,
) -> LauncherResult<()> {
    let mut response = format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: {}\r\n\
         Content-Length: {}\r\n\
         Cache-Control: no-store\r\n\
         Connection: close\r\n\
         \r\n",
        status,
        status_text(status),
        content_type,
        body.len()
    );
    if !head_only {
        response.push_str(body);
    }

    stream
        .write_all(response.as_bytes())
        .await
        .map_err(|e| LauncherError::Network(format!("Failed to send response: {}", e)))?;
    let _ = stream.shutdown().await;

    Ok(())
}

pub async fn send_error_response(
    stream: &mut TcpStream,
    status: u16,
    code: &str,
    message: &str,
) -> LauncherResult<()> {
    let body = serde_json::json!({
        "error": {
            "code": code,
            "message": message,
            "status": status
        }
    });
    send_response(stream, status, "application/json", &body.to_string(), false).await
}
