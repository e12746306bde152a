//! tonic implementation of the channel ports.
//!
//! Requests go over the generic `tonic::client::Grpc` with a prost codec, so
//! no generated client stubs are needed. Channels connect lazily; the first
//! call drives the HTTP/2 handshake.

use crate::adapters::tls::{client_tls_config, ClientIdentity};
use crate::config::PoolConfig;
use crate::domain::{ConnState, PoolError};
use crate::ports::{NodeChannel, NodeConnector, SubscriptionStream};
use async_trait::async_trait;
use futures::StreamExt;
use http::uri::PathAndQuery;
use parking_lot::Mutex;
use shared_types::proto::{SubscribeResult, TxRequest, TxResponse};
use shared_types::{NodeDescriptor, RpcCode, RpcStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

pub const SEND_REQUEST_PATH: &str = "/api.RpcNode/SendRequest";
pub const SUBSCRIBE_PATH: &str = "/api.RpcNode/Subscribe";

/// How long a failed channel reports `TransientFailure` before the pool may
/// try it again; tonic reconnects underneath in the meantime.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Translate a tonic status into the transport-neutral form.
pub fn map_status(status: &tonic::Status) -> RpcStatus {
    use tonic::Code;
    let code = match status.code() {
        Code::Cancelled => RpcCode::Cancelled,
        Code::Unknown => RpcCode::Unknown,
        Code::InvalidArgument => RpcCode::InvalidArgument,
        Code::DeadlineExceeded => RpcCode::DeadlineExceeded,
        Code::NotFound => RpcCode::NotFound,
        Code::PermissionDenied => RpcCode::PermissionDenied,
        Code::ResourceExhausted => RpcCode::ResourceExhausted,
        Code::Unimplemented => RpcCode::Unimplemented,
        Code::Internal => RpcCode::Internal,
        Code::Unavailable => RpcCode::Unavailable,
        _ => RpcCode::Other,
    };
    RpcStatus::new(code, status.message())
}

/// Dials nodes over tonic.
#[derive(Debug, Clone)]
pub struct GrpcConnector {
    config: PoolConfig,
    identity: Option<ClientIdentity>,
}

impl GrpcConnector {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            identity: None,
        }
    }

    /// Present `identity` to nodes that require mutual TLS.
    pub fn with_identity(mut self, identity: ClientIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Endpoint for `node` with keepalive and TLS applied.
    pub fn endpoint(&self, node: &NodeDescriptor) -> Result<Endpoint, PoolError> {
        let scheme = if node.enable_tls { "https" } else { "http" };
        let invalid = |reason: String| PoolError::InvalidNode {
            address: node.address.clone(),
            reason,
        };

        let mut endpoint = Endpoint::from_shared(format!("{}://{}", scheme, node.address))
            .map_err(|e| invalid(e.to_string()))?
            .connect_timeout(self.config.connect_timeout())
            .http2_keep_alive_interval(self.config.keepalive_interval())
            .keep_alive_timeout(self.config.keepalive_timeout())
            .keep_alive_while_idle(true);

        if node.enable_tls {
            let tls = client_tls_config(node, self.identity.as_ref())?;
            endpoint = endpoint.tls_config(tls).map_err(|e| PoolError::Tls {
                address: node.address.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(endpoint)
    }
}

#[async_trait]
impl NodeConnector for GrpcConnector {
    async fn dial(&self, node: &NodeDescriptor) -> Result<Arc<dyn NodeChannel>, PoolError> {
        let endpoint = self.endpoint(node)?;
        debug!(
            "[lc-01] Dialing {} (tls={})",
            node.address, node.enable_tls
        );
        Ok(Arc::new(GrpcChannel::new(
            endpoint.connect_lazy(),
            &self.config,
        )))
    }
}

struct ChannelState {
    conn: ConnState,
    failed_at: Option<Instant>,
}

/// A lazily connected tonic channel with tracked connectivity.
pub struct GrpcChannel {
    channel: Channel,
    max_send: usize,
    max_recv: usize,
    state: Mutex<ChannelState>,
}

impl GrpcChannel {
    pub fn new(channel: Channel, config: &PoolConfig) -> Self {
        Self {
            channel,
            max_send: config.max_send_msg_size,
            max_recv: config.max_recv_msg_size,
            state: Mutex::new(ChannelState {
                conn: ConnState::Idle,
                failed_at: None,
            }),
        }
    }

    fn grpc(&self) -> Grpc<Channel> {
        Grpc::new(self.channel.clone())
            .max_encoding_message_size(self.max_send)
            .max_decoding_message_size(self.max_recv)
    }

    fn record<T>(&self, outcome: &Result<T, RpcStatus>) {
        let mut state = self.state.lock();
        if state.conn == ConnState::Shutdown {
            return;
        }
        match outcome {
            Ok(_) => {
                state.conn = ConnState::Ready;
                state.failed_at = None;
            }
            Err(status) if status.code == RpcCode::Unavailable => {
                state.conn = ConnState::TransientFailure;
                state.failed_at = Some(Instant::now());
            }
            Err(_) => {}
        }
    }

    fn ensure_open(&self) -> Result<(), RpcStatus> {
        if self.state() == ConnState::Shutdown {
            return Err(RpcStatus::unavailable("channel is shut down"));
        }
        Ok(())
    }
}

#[async_trait]
impl NodeChannel for GrpcChannel {
    async fn send_request(
        &self,
        request: TxRequest,
        timeout: Duration,
    ) -> Result<TxResponse, RpcStatus> {
        self.ensure_open()?;
        let mut grpc = self.grpc();
        let call = async move {
            grpc.ready()
                .await
                .map_err(|e| tonic::Status::unavailable(format!("service not ready: {}", e)))?;
            let mut req = tonic::Request::new(request);
            req.set_timeout(timeout);
            let codec = ProstCodec::<TxRequest, TxResponse>::default();
            grpc.unary(req, PathAndQuery::from_static(SEND_REQUEST_PATH), codec)
                .await
        };

        let outcome = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(response)) => Ok(response.into_inner()),
            Ok(Err(status)) => Err(map_status(&status)),
            Err(_) => Err(RpcStatus::deadline_exceeded(format!(
                "no response within {:?}",
                timeout
            ))),
        };
        self.record(&outcome);
        outcome
    }

    async fn subscribe(&self, request: TxRequest) -> Result<SubscriptionStream, RpcStatus> {
        self.ensure_open()?;
        let mut grpc = self.grpc();
        let opened = async move {
            grpc.ready()
                .await
                .map_err(|e| tonic::Status::unavailable(format!("service not ready: {}", e)))?;
            let codec = ProstCodec::<TxRequest, SubscribeResult>::default();
            grpc.server_streaming(
                tonic::Request::new(request),
                PathAndQuery::from_static(SUBSCRIBE_PATH),
                codec,
            )
            .await
        }
        .await
        .map_err(|status| map_status(&status));
        self.record(&opened);

        let stream = opened?.into_inner();
        Ok(stream
            .map(|frame| frame.map_err(|status| map_status(&status)))
            .boxed())
    }

    fn state(&self) -> ConnState {
        let state = self.state.lock();
        match (state.conn, state.failed_at) {
            (ConnState::TransientFailure, Some(at)) if at.elapsed() >= RECONNECT_BACKOFF => {
                ConnState::Idle
            }
            (conn, _) => conn,
        }
    }

    fn close(&self) {
        self.state.lock().conn = ConnState::Shutdown;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::proto::Payload;
    use std::convert::Infallible;
    use std::task::{Context, Poll};
    use tokio_stream::wrappers::TcpListenerStream;
    use tonic::body::BoxBody;
    use tonic::codegen::{BoxFuture, Service};
    use tonic::server::{NamedService, ServerStreamingService, UnaryService};

    /// In-process node: `SendRequest` echoes the tx id as the message,
    /// `Subscribe` streams `frames` one-byte frames.
    #[derive(Clone)]
    struct TestNode {
        frames: u8,
    }

    struct Echo;

    impl UnaryService<TxRequest> for Echo {
        type Response = TxResponse;
        type Future = BoxFuture<tonic::Response<TxResponse>, tonic::Status>;

        fn call(&mut self, request: tonic::Request<TxRequest>) -> Self::Future {
            let tx_id = request.into_inner().tx_id().to_string();
            Box::pin(async move {
                Ok(tonic::Response::new(TxResponse {
                    message: tx_id,
                    ..Default::default()
                }))
            })
        }
    }

    struct Frames(u8);

    impl ServerStreamingService<TxRequest> for Frames {
        type Response = SubscribeResult;
        type ResponseStream = futures::stream::BoxStream<'static, Result<SubscribeResult, tonic::Status>>;
        type Future = BoxFuture<tonic::Response<Self::ResponseStream>, tonic::Status>;

        fn call(&mut self, _request: tonic::Request<TxRequest>) -> Self::Future {
            let frames: Vec<_> = (0..self.0)
                .map(|i| Ok(SubscribeResult { data: vec![i] }))
                .collect();
            Box::pin(async move { Ok(tonic::Response::new(futures::stream::iter(frames).boxed())) })
        }
    }

    impl Service<http::Request<BoxBody>> for TestNode {
        type Response = http::Response<BoxBody>;
        type Error = Infallible;
        type Future = BoxFuture<Self::Response, Self::Error>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, request: http::Request<BoxBody>) -> Self::Future {
            let frames = self.frames;
            let path = request.uri().path().to_owned();
            Box::pin(async move {
                let response = match path.as_str() {
                    SEND_REQUEST_PATH => {
                        let codec = ProstCodec::<TxResponse, TxRequest>::default();
                        tonic::server::Grpc::new(codec).unary(Echo, request).await
                    }
                    SUBSCRIBE_PATH => {
                        let codec = ProstCodec::<SubscribeResult, TxRequest>::default();
                        tonic::server::Grpc::new(codec)
                            .server_streaming(Frames(frames), request)
                            .await
                    }
                    _ => {
                        let mut response = http::Response::new(tonic::codegen::empty_body());
                        response.headers_mut().insert(
                            "grpc-status",
                            http::HeaderValue::from(tonic::Code::Unimplemented as i32),
                        );
                        response
                    }
                };
                Ok(response)
            })
        }
    }

    impl NamedService for TestNode {
        const NAME: &'static str = "api.RpcNode";
    }

    /// Serve `node` on an ephemeral port and return its address.
    async fn serve(node: TestNode) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        tokio::spawn(
            tonic::transport::Server::builder()
                .add_service(node)
                .serve_with_incoming(TcpListenerStream::new(listener)),
        );
        address
    }

    async fn dial(address: String) -> Arc<dyn NodeChannel> {
        GrpcConnector::new(PoolConfig::default())
            .dial(&NodeDescriptor::plain(0, address))
            .await
            .unwrap()
    }

    fn request(tx_id: &str) -> TxRequest {
        TxRequest {
            payload: Some(Payload {
                tx_id: tx_id.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_map_status_codes() {
        let status = tonic::Status::unavailable("refused");
        assert_eq!(map_status(&status).code, RpcCode::Unavailable);

        let status = tonic::Status::unknown("malformed header: missing HTTP content-type");
        let mapped = map_status(&status);
        assert_eq!(mapped.code, RpcCode::Unknown);
        assert!(mapped.message.contains("content-type"));

        let status = tonic::Status::aborted("x");
        assert_eq!(map_status(&status).code, RpcCode::Other);
    }

    #[test]
    fn test_invalid_address_rejected() {
        let connector = GrpcConnector::new(PoolConfig::default());
        let node = NodeDescriptor::plain(0, "bad address with spaces");
        assert!(matches!(
            connector.endpoint(&node),
            Err(PoolError::InvalidNode { .. })
        ));
    }

    #[test]
    fn test_tls_without_roots_rejected() {
        let connector = GrpcConnector::new(PoolConfig::default());
        let mut node = NodeDescriptor::plain(0, "127.0.0.1:12301");
        node.enable_tls = true;
        assert!(matches!(
            connector.endpoint(&node),
            Err(PoolError::Tls { .. })
        ));
    }

    #[tokio::test]
    async fn test_lazy_dial_starts_idle_and_closes() {
        let connector = GrpcConnector::new(PoolConfig::default());
        let node = NodeDescriptor::plain(0, "127.0.0.1:1");
        let channel = connector.dial(&node).await.unwrap();
        assert_eq!(channel.state(), ConnState::Idle);

        channel.close();
        assert_eq!(channel.state(), ConnState::Shutdown);
        let err = channel
            .send_request(TxRequest::default(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err.code, RpcCode::Unavailable);
    }

    #[tokio::test]
    async fn test_send_request_round_trip() {
        let channel = dial(serve(TestNode { frames: 0 }).await).await;

        let response = channel
            .send_request(request("tx-1"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.message, "tx-1");
        assert_eq!(channel.state(), ConnState::Ready);

        let response = channel
            .send_request(request("tx-2"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.message, "tx-2");
    }

    #[tokio::test]
    async fn test_subscribe_streams_every_frame() {
        let channel = dial(serve(TestNode { frames: 3 }).await).await;

        let frames: Vec<Vec<u8>> = channel
            .subscribe(request("sub"))
            .await
            .unwrap()
            .map(|frame| frame.unwrap().data)
            .collect()
            .await;
        assert_eq!(frames, vec![vec![0], vec![1], vec![2]]);
        assert_eq!(channel.state(), ConnState::Ready);
    }
}
