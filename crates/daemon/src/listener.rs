// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Unix-socket side of the CLI↔daemon wire protocol (§6): one
//! connection per request, matching the teacher daemon's listener task
//! that runs independently of the engine loop.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{error, info, warn};
use triage_wire::{read_request, write_response, Request, Response, StatusSummary};

/// Shared state the listener reads from and signals into; the engine loop
/// owns the actual engines and refreshes the status snapshot after every
/// ingest cycle.
pub struct ListenerCtx {
    pub status: Arc<Mutex<StatusSummary>>,
    pub shutdown: Arc<Notify>,
    pub reload: Arc<Notify>,
}

/// Accept connections until the socket is removed out from under us
/// (shutdown tears down the listener task along with everything else).
pub async fn run(listener: UnixListener, ctx: Arc<ListenerCtx>) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, &ctx).await {
                        warn!(error = %e, "error serving wire connection");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "failed to accept connection, listener task exiting");
                return;
            }
        }
    }
}

async fn handle_connection(mut stream: UnixStream, ctx: &ListenerCtx) -> Result<(), triage_wire::ProtocolError> {
    let request = read_request(&mut stream).await?;
    let response = dispatch(request, ctx);
    write_response(&mut stream, &response).await
}

fn dispatch(request: Request, ctx: &ListenerCtx) -> Response {
    match request {
        Request::Start { .. } => Response::Ok,
        Request::Stop => {
            info!("stop requested over the wire protocol");
            ctx.shutdown.notify_one();
            Response::Ok
        }
        Request::Status => Response::Status(ctx.status.lock().clone()),
        Request::Reload => {
            info!("reload requested over the wire protocol");
            ctx.reload.notify_one();
            Response::Ok
        }
    }
}
