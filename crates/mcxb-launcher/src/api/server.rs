use super::context::ApiContext;
use super::handlers::handle_request;
use crate::supervisor::CancellationToken;
use mcxb_types::{LauncherError, LauncherResult};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

pub struct ApiServer {
    addr: SocketAddr,
    context: Arc<ApiContext>,
}

impl ApiServer {
    pub fn new(addr: SocketAddr, context: ApiContext) -> Self {
        Self {
            addr,
            context: Arc::new(context),
        }
    }

    pub fn context(&self) -> Arc<ApiContext> {
        self.context.clone()
    }

    /// Binds, then serves in the background until `cancel` fires. Returns the
    /// bound address so callers can pass port 0.
    pub async fn start(&self, mut cancel: CancellationToken) -> LauncherResult<SocketAddr> {
        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            LauncherError::Network(format!(
                "Failed to bind status server on {}: {}",
                self.addr, e
            ))
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| LauncherError::Network(format!("Failed to read bound address: {}", e)))?;

        info!("Status server listening on http://{}", local_addr);

        let context = self.context.clone();
        tokio::spawn(async move {
            loop {
                let accepted = tokio::select! {
                    accepted = listener.accept() => accepted,
                    _ = cancel.cancelled() => break,
                };

                match accepted {
                    Ok((stream, addr)) => {
                        let context = context.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_request(stream, addr, context).await {
                                let message = e.to_string();
                                if !message.contains("reset") && !message.contains("Broken pipe") {
                                    warn!("Status request error from {}: {}", addr, message);
                                }
                            }
                        });
                    }
                    Err(e) => {
                        error!("Status server accept error: {}", e);
                    }
                }
            }
            debug!("Status server on {} stopped", local_addr);
        });

        Ok(local_addr)
    }
}
