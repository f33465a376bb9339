#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubmitEnvelopeRequest {
    #[prost(message, optional, tag = "1")]
    pub encrypted_envelope: ::core::option::Option<super::observation::EncryptedMessage>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubmitEnvelopeResponse {}
/// Generated client implementations.
pub mod shuffler_client {
    #![allow(unused_variables, dead_code, missing_docs, clippy::let_unit_value)]
    use tonic::codegen::*;
    use tonic::codegen::http::Uri;

    #[derive(Debug, Clone)]
    pub struct ShufflerClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl<T> ShufflerClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::Body>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }

        pub fn with_origin(inner: T, origin: Uri) -> Self {
            let inner = tonic::client::Grpc::with_origin(inner, origin);
            Self { inner }
        }

        pub async fn submit_envelope(
            &mut self,
            request: impl tonic::IntoRequest<super::SubmitEnvelopeRequest>,
        ) -> std::result::Result<tonic::Response<super::SubmitEnvelopeResponse>, tonic::Status>
        {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::unknown(format!("Service was not ready: {}", e.into()))
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/cobalt.shuffler.Shuffler/SubmitEnvelope");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("cobalt.shuffler.Shuffler", "SubmitEnvelope"));
            self.inner.unary(req, path, codec).await
        }
    }
}
