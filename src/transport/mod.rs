//! Default underlying HTTP transports.
//!
//! The routing/retry core composes with a standard HTTP transport (the
//! upstream client implementation itself is out of scope). These adapters
//! bridge `http::Request<Bytes>` / `http::Response<Bytes>` to and from
//! `reqwest`, which is the ecosystem default used elsewhere in this corpus.

mod reqwest_async;
mod reqwest_blocking;

pub use reqwest_async::ReqwestTransport;
pub use reqwest_blocking::ReqwestBlockingTransport;
