//! [`crate::blocking::BlockingTransport`] adapter over
//! `reqwest::blocking::Client`.

use bytes::Bytes;
use http::{Request, Response};

use crate::blocking::BlockingTransport;

/// The default underlying transport for [`crate::BlockingLoadBalancer`]: a
/// thin wrapper around [`reqwest::blocking::Client`].
#[derive(Clone, Default)]
pub struct ReqwestBlockingTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestBlockingTransport {
    pub fn new(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl BlockingTransport for ReqwestBlockingTransport {
    type Error = reqwest::Error;

    fn call(&self, request: Request<Bytes>) -> Result<Response<Bytes>, Self::Error> {
        let (parts, body) = request.into_parts();
        let url =
            reqwest::Url::parse(&parts.uri.to_string()).expect("rewritten URI is a valid URL");

        let mut builder = self.client.request(parts.method, url).body(body);
        for (name, value) in parts.headers.iter() {
            builder = builder.header(name.clone(), value.clone());
        }

        let response = builder.send()?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes()?;

        let mut builder = Response::builder().status(status);
        for (name, value) in headers.iter() {
            builder = builder.header(name.clone(), value.clone());
        }
        Ok(builder
            .body(body)
            .expect("reqwest response maps to http::Response"))
    }
}
