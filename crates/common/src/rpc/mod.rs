//! The multiplexed RPC transport carried over the bus websocket.
//!
//! This is the WAMP-over-WebSocket bus from the system's point of view,
//! expressed as two `tarpc` service traits sharing one connection instead of
//! a dynamic WAMP procedure registry: [`bus::ConductorBusService`] (server
//! is the conductor, caller is the bus agent) and [`bus::BoardBusService`]
//! (server is the bus agent, caller is the conductor).

use std::mem::size_of;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Sink, Stream};
use serde::{Deserialize, Serialize};
use tarpc::transport::channel::ChannelError;
use tokio::sync::mpsc;

pub mod bus;
pub mod codec;
pub mod error;

/// One frame on the multiplexed bus connection: either a message belonging
/// to the parent-served service or one belonging to the child-served
/// service, disambiguated at the type level by `define_rpc_mux!`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MuxMessage<Parent, Child> {
    Parent(Parent),
    Child(Child),
}

/// Defines `MuxedMessageIncoming`/`MuxedMessageOutgoing` for one side of a
/// multiplexed bus connection.
///
/// The "parent" service is served by whichever side is listening for the
/// websocket connection (the conductor); the "child" service is served by
/// whichever side initiated it (the bus agent).
#[macro_export]
macro_rules! define_rpc_mux {
    ( parent ; $parent_req:ty => $parent_res:ty ; $child_req:ty => $child_res:ty $(;)? ) => {
        pub type MuxedMessageIncoming = ::iotronic_common::rpc::MuxMessage<
            ::tarpc::ClientMessage<$parent_req>,
            ::tarpc::Response<$child_res>,
        >;
        pub type MuxedMessageOutgoing = ::iotronic_common::rpc::MuxMessage<
            ::tarpc::Response<$parent_res>,
            ::tarpc::ClientMessage<$child_req>,
        >;
    };
    ( child ; $parent_req:ty => $parent_res:ty ; $child_req:ty => $child_res:ty $(;)? ) => {
        pub type MuxedMessageIncoming = ::iotronic_common::rpc::MuxMessage<
            ::tarpc::Response<$parent_res>,
            ::tarpc::ClientMessage<$child_req>,
        >;
        pub type MuxedMessageOutgoing = ::iotronic_common::rpc::MuxMessage<
            ::tarpc::ClientMessage<$parent_req>,
            ::tarpc::Response<$child_res>,
        >;
    };
}

/// Length in bytes of a ping frame: a sequence number plus a timestamp.
pub const PING_LENGTH: usize = size_of::<u32>() + size_of::<u128>();
pub const PING_INTERVAL_SEC: u64 = 10;

/// An in-process channel pair presented to `tarpc` as a transport. The
/// websocket read/write halves forward raw frames into/out of this type;
/// `tarpc`'s generated client/server talk to it as if it were the socket.
pub struct RpcTransport<In, Out> {
    tx: mpsc::UnboundedSender<Out>,
    rx: mpsc::UnboundedReceiver<In>,
}

impl<In, Out> RpcTransport<In, Out> {
    /// Builds a transport plus the two channel ends used to pump frames to
    /// and from the underlying websocket.
    pub fn new() -> (
        mpsc::UnboundedSender<In>,
        Self,
        mpsc::UnboundedReceiver<Out>,
    ) {
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        (tx1, Self { tx: tx2, rx: rx1 }, rx2)
    }
}

impl<In, Out> Stream for RpcTransport<In, Out> {
    type Item = Result<In, ChannelError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx
            .poll_recv(cx)
            .map(|o| o.map(Ok))
            .map_err(ChannelError::Receive)
    }
}

const CLOSED_MESSAGE: &str = "the channel is closed";

impl<In, Out> Sink<Out> for RpcTransport<In, Out> {
    type Error = ChannelError;

    fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(if self.tx.is_closed() {
            Err(ChannelError::Ready(CLOSED_MESSAGE.into()))
        } else {
            Ok(())
        })
    }

    fn start_send(self: Pin<&mut Self>, item: Out) -> Result<(), Self::Error> {
        self.tx
            .send(item)
            .map_err(|_| ChannelError::Send(CLOSED_MESSAGE.into()))
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
}
