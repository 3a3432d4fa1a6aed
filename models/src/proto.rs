// Protobuf messages for package `brewtheory`.
//
// Field tags must stay in sync with the front-end's `rpc.proto`; the derive
// keeps the wire format without a protoc step at build time.

/// Metadata a client embeds in every request message.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct RequestHeader {
    #[prost(string, tag = "1")]
    pub method: String,
}

/// Structured status carried in every response message.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ResponseHeader {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(int32, tag = "2")]
    pub scope: i32,
    #[prost(string, tag = "3")]
    pub status: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct KeyExchangeRequest {
    #[prost(message, optional, tag = "1")]
    pub header: Option<RequestHeader>,
    /// Client's Ed25519 public key, used to verify its later requests.
    #[prost(bytes = "vec", tag = "2")]
    pub public_key: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct KeyExchangeResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
    /// Server's per-session Ed25519 public key, used to verify responses.
    #[prost(bytes = "vec", tag = "2")]
    pub public_key: Vec<u8>,
    #[prost(string, tag = "3")]
    pub token: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct EmptyRequest {
    #[prost(message, optional, tag = "1")]
    pub header: Option<RequestHeader>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct EmptyResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct IdRequest {
    #[prost(message, optional, tag = "1")]
    pub header: Option<RequestHeader>,
    #[prost(string, tag = "2")]
    pub id: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct IdResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
    #[prost(string, tag = "2")]
    pub id: String,
}
