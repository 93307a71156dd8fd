use std::pin::Pin;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use futures_core::Stream;
use hex::FromHex;
use hyper::{Body, Client, Request, StatusCode, Uri};
use hyper::client::HttpConnector;
use hyper::header::{AUTHORIZATION, USER_AGENT};
use hyper_tls::HttpsConnector;
use tracing::trace;

use crate::util::validating_http_body::{HttpBodyValidator, Md5HttpBodyValidator, Sha1HttpBodyValidator, ValidatingHttpBody};

/// A response body that is checked against all checksums the server sent while it is read. The
///  stream fails at its end if any of them does not match.
pub struct Download {
    pub data: Pin<Box<dyn Stream<Item = anyhow::Result<Bytes>> + Send + 'static>>,
    /// names of the checksums being checked, empty if the server sent none
    pub checksums: Vec<&'static str>,
}

/// Downloads files relative to a fixed base URI, checking the body's integrity against a hashcode
///  if one is returned in a header.
///
/// Instances do HTTP connection caching internally, so keeping them alive has performance benefits.
pub struct ValidatingHttpDownloader {
    client: Client<HttpsConnector<HttpConnector>>,
    base_uri: String, // with trailing '/'
    authorization: Option<String>,
}
impl ValidatingHttpDownloader {
    pub fn new(base_uri: String) -> anyhow::Result<ValidatingHttpDownloader> {
        let mut base_uri = base_uri;
        if !base_uri.ends_with('/') {
            base_uri.push('/');
        }

        // check that the base URI is valid
        Uri::try_from(base_uri.clone())?;

        Ok(ValidatingHttpDownloader {
            client: Client::builder()
                .build::<_, Body>(HttpsConnector::new()),
            base_uri,
            authorization: None,
        })
    }

    /// sends HTTP basic authentication with every request
    pub fn with_basic_auth(mut self, username: &str, password: &str) -> ValidatingHttpDownloader {
        let token = STANDARD.encode(format!("{}:{}", username, password));
        self.authorization = Some(format!("Basic {}", token));
        self
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Returns `None` if the server does not have the file (HTTP 404), and an error for all other
    ///  non-success responses.
    pub async fn get(&self, path: &str) -> anyhow::Result<Option<Download>> {
        let artifact_path = format!("{}{}", self.base_uri, path);
        let mut request = Request::builder()
            .method("GET")
            .uri(Uri::try_from(artifact_path.clone())?)
            .header(USER_AGENT, "curl/7.68.0" ); // Maven Central returns a 403 without a user agent
        if let Some(authorization) = &self.authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        let request = request.body(Body::empty())?;

        trace!("getting {}", artifact_path);

        let artifact_response = self.client.request(request)
            .await?;

        if artifact_response.status() == StatusCode::NOT_FOUND {
            trace!("{} not found", artifact_path);
            return Ok(None);
        }
        if !artifact_response.status().is_success() {
            return Err(anyhow::Error::msg(format!("request for {} failed: {}", artifact_path, artifact_response.status())));
        }

        let sha1_hash_header = artifact_response.headers().get("x-checksum-sha1")
            .or_else(|| artifact_response.headers().get("x-goog-meta-checksum-sha1"))
            ;
        let sha1_string = sha1_hash_header
            .map(|h| h.to_str().unwrap_or(""))
            .map(|s| if s.len() == 42 { &s[1..41] } else { s } );

        let md5_string = artifact_response.headers().get("x-checksum-md5")
            .or_else(|| artifact_response.headers().get("x-goog-meta-checksum-md5"))
            .map(|h| h.to_str().unwrap_or(""))
            ;

        let mut validators: Vec<Box<dyn HttpBodyValidator>> = vec![];
        if let Some(sha1) = sha1_string {
            validators.push(Box::new(Sha1HttpBodyValidator::new(<[u8;20]>::from_hex(sha1)?)));
        }
        if let Some(md5) = md5_string {
            validators.push(Box::new(Md5HttpBodyValidator::new(<[u8;16]>::from_hex(md5)?)));
        }
        let checksums = validators.iter()
            .map(|v| v.name())
            .collect();

        Ok(Some(Download {
            data: Box::pin(ValidatingHttpBody::new(artifact_response.into_body(), validators)),
            checksums,
        }))
    }
}
