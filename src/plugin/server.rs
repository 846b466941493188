//! # Plugin Stdio Server
//!
//! Reads line-delimited JSON-RPC requests and writes one response line per request.
//! Requests run concurrently (the lifecycle engine serializes what must be
//! serialized), so responses are written in completion order. A `$/cancelRequest`
//! notification fires the cancellation token of the named request.

use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::cancellation::CancellationRegistry;
use super::database::Database;
use super::handler::PluginHandler;
use super::protocol::{CancelParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse, CANCEL_METHOD};
use crate::lifecycle::OperationContext;

pub struct PluginServer<D> {
    handler: PluginHandler<D>,
    cancellations: Arc<CancellationRegistry>,
}

impl<D: Database + 'static> PluginServer<D> {
    pub fn new(database: Arc<D>) -> Self {
        Self {
            handler: PluginHandler::new(database),
            cancellations: Arc::new(CancellationRegistry::new()),
        }
    }

    /// Serve on the process's stdin and stdout until EOF.
    pub async fn serve_stdio(&self) -> anyhow::Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Serve requests from `reader` until EOF, writing responses to `writer`.
    ///
    /// In-flight requests are allowed to finish after EOF; the database is then closed.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        info!("Starting plugin server");

        let (responses, receiver) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer_task = tokio::spawn(write_responses(writer, receiver));
        let mut in_flight = JoinSet::new();
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(request) => request,
                Err(e) => {
                    // the line may contain passwords; never log it
                    warn!(error = %e, "Failed to parse JSON-RPC request");
                    let error = JsonRpcError::parse_error(format!("Parse error: {}", e));
                    let _ = responses.send(JsonRpcResponse::failure(None, error));
                    continue;
                }
            };

            if request.method == CANCEL_METHOD {
                match serde_json::from_value::<CancelParams>(request.params) {
                    Ok(params) => {
                        self.cancellations.cancel(&params.id);
                    }
                    Err(e) => warn!(error = %e, "Ignoring malformed cancel notification"),
                }
                continue;
            }

            let Some(id) = request.id.clone() else {
                debug!(method = %request.method, "Ignoring notification");
                continue;
            };

            let token = self.cancellations.register(id.clone());
            let handler = self.handler.clone();
            let cancellations = self.cancellations.clone();
            let responses = responses.clone();

            in_flight.spawn(async move {
                let response =
                    handler.handle_request(request, OperationContext::with_token(token)).await;
                cancellations.complete(&id);
                let _ = responses.send(response);
            });

            // reap finished tasks so the set does not grow without bound
            while let Some(joined) = in_flight.try_join_next() {
                if let Err(e) = joined {
                    warn!(error = %e, "Request task failed");
                }
            }
        }

        info!("Plugin server input closed, draining in-flight requests");
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Request task failed");
            }
        }

        if let Err(e) = self.handler.database().close(&OperationContext::new()).await {
            warn!(error = %e, "Close on shutdown failed");
        }

        drop(responses);
        writer_task.await??;

        info!("Plugin server shut down");
        Ok(())
    }
}

async fn write_responses<W>(
    mut writer: W,
    mut receiver: mpsc::UnboundedReceiver<JsonRpcResponse>,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = receiver.recv().await {
        let json = serde_json::to_string(&response)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
