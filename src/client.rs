//! Async client for the order-dispatch wire protocol.

use std::io;

use futures::SinkExt;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_stream::StreamExt;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};

use crate::error::{DispatchError, Result};
use crate::protocol::{Drained, PendingList, Request, Response};

fn transport_error(e: LinesCodecError) -> DispatchError {
    match e {
        LinesCodecError::Io(e) => DispatchError::CommunicationFailure(e),
        other => DispatchError::CommunicationFailure(io::Error::other(other)),
    }
}

fn unexpected(response: Response) -> DispatchError {
    match response {
        Response::Error(body) => DispatchError::UnexpectedResponse(
            body.message.unwrap_or(body.error),
        ),
        other => DispatchError::UnexpectedResponse(format!("{:?}", other)),
    }
}

/// One connection to an order-dispatch server. Requests are answered in
/// order, one response per request.
pub struct OrderClient {
    framed: Framed<TcpStream, LinesCodec>,
}

impl OrderClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            framed: Framed::new(stream, LinesCodec::new()),
        })
    }

    pub async fn request(&mut self, request: &Request) -> Result<Response> {
        let line = serde_json::to_string(request).map_err(io::Error::from)?;
        self.send_raw(&line).await
    }

    /// Send an arbitrary line and read one response. Useful for exercising
    /// the server's handling of malformed input.
    pub async fn send_raw(&mut self, line: &str) -> Result<Response> {
        self.framed
            .send(line.to_string())
            .await
            .map_err(transport_error)?;
        self.read_response().await
    }

    async fn read_response(&mut self) -> Result<Response> {
        match self.framed.next().await {
            Some(Ok(line)) => serde_json::from_str(&line)
                .map_err(|e| DispatchError::UnexpectedResponse(format!("{}: {}", e, line))),
            Some(Err(e)) => Err(transport_error(e)),
            None => Err(DispatchError::CommunicationFailure(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            ))),
        }
    }

    pub async fn get_menu(&mut self) -> Result<Vec<String>> {
        match self.request(&Request::GetMenu).await? {
            Response::Menu(body) => Ok(body.menu),
            other => Err(unexpected(other)),
        }
    }

    /// Submit an order. Validation failures come back as
    /// [`Response::Error`], not as `Err`.
    pub async fn submit_order(&mut self, kind: &str, quantity: i64) -> Result<Response> {
        self.request(&Request::submit(kind, quantity)).await
    }

    pub async fn query_order(&mut self, id: &str) -> Result<Response> {
        self.request(&Request::query(id)).await
    }

    pub async fn list_pending(&mut self) -> Result<PendingList> {
        match self.request(&Request::ListPending).await? {
            Response::PendingList(list) => Ok(list),
            other => Err(unexpected(other)),
        }
    }

    pub async fn await_all(&mut self) -> Result<Drained> {
        match self.request(&Request::AwaitAll).await? {
            Response::Drained(drained) => Ok(drained),
            other => Err(unexpected(other)),
        }
    }
}
