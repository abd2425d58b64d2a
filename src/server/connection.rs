use std::io;
use std::net::SocketAddr;

use futures::SinkExt;
use tokio::net::TcpStream;
use tokio_stream::StreamExt;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};

use crate::error::{DispatchError, Result};
use crate::order::Lookup;
use crate::protocol::{Drained, MenuBody, PendingList, Request, Response, Submitted};
use crate::server::service::OrderService;

/// Turn one decoded request into exactly one response.
pub async fn dispatch(service: &OrderService, request: Request) -> Response {
    match request {
        Request::GetMenu => Response::Menu(MenuBody {
            menu: service.get_menu(),
        }),
        Request::SubmitOrder { kind, quantity } => {
            match service.submit_order_value(&kind, &quantity) {
                Ok(id) => Response::Submitted(Submitted {
                    success: true,
                    id,
                    message: format!("Order {} queued", id),
                }),
                Err(e) => Response::from(e),
            }
        }
        Request::QueryOrder { id } => match service.query_order(&id) {
            Lookup::NotFound => Response::from(DispatchError::NotFound(id)),
            Lookup::Pending(record) => Response::pending(record.id),
            Lookup::Ready(record) => Response::from_record(&record),
        },
        Request::ListPending => {
            let pending = service.list_pending_orders();
            Response::PendingList(PendingList {
                count: pending.len(),
                pending,
            })
        }
        Request::AwaitAll => {
            let drained = service.await_all_orders().await;
            Response::Drained(Drained {
                success: true,
                message: format!("All {} pending orders are ready", drained),
                drained,
            })
        }
    }
}

/// Serve one client until it disconnects, the transport fails, or the
/// service shuts down.
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    service: OrderService,
    max_frame_len: usize,
) {
    let shutdown = service.shutdown_token();
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(max_frame_len));

    tracing::info!(peer = %peer, "Client connected");

    // After a decode error the framed stream yields a single `None` before it
    // resumes reading, which must not be mistaken for a disconnect.
    let mut resuming = false;

    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                tracing::debug!(peer = %peer, "Closing connection for shutdown");
                break;
            }
            frame = framed.next() => frame,
        };

        let response = match frame {
            None if resuming => {
                resuming = false;
                continue;
            }
            None => break,
            Some(Ok(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Request>(&line) {
                    Ok(request) => {
                        tracing::debug!(
                            peer = %peer,
                            action = request.action(),
                            "Request received"
                        );
                        dispatch(&service, request).await
                    }
                    Err(e) => {
                        tracing::debug!(peer = %peer, error = %e, "Malformed request");
                        Response::from(DispatchError::BadRequest(e.to_string()))
                    }
                }
            }
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                tracing::warn!(peer = %peer, max_frame_len, "Request line too long");
                resuming = true;
                Response::from(DispatchError::BadRequest(format!(
                    "request exceeds {} bytes",
                    max_frame_len
                )))
            }
            Some(Err(LinesCodecError::Io(e))) => {
                let err = DispatchError::CommunicationFailure(e);
                tracing::warn!(peer = %peer, error = %err, "Connection read failed");
                break;
            }
        };

        if let Err(e) = send_response(&mut framed, &response).await {
            tracing::warn!(peer = %peer, error = %e, "Connection write failed");
            break;
        }
    }

    tracing::info!(peer = %peer, "Client disconnected");
}

async fn send_response(
    framed: &mut Framed<TcpStream, LinesCodec>,
    response: &Response,
) -> Result<()> {
    let line = serde_json::to_string(response).map_err(io::Error::from)?;
    framed.send(line).await.map_err(|e| match e {
        LinesCodecError::Io(e) => DispatchError::CommunicationFailure(e),
        other => DispatchError::CommunicationFailure(io::Error::other(other)),
    })
}
