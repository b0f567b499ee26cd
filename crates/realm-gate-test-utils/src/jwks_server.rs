//! Mock identity provider serving a realm's key set.

use crate::crypto_fixtures::{jwks_json, TestSigningKey};
use realm_gate::config::ProviderConfig;
use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Wiremock server answering `GET /realms/<realm>/protocol/openid-connect/certs`.
pub struct MockJwksServer {
    server: MockServer,
    realm: String,
}

impl MockJwksServer {
    /// Serve the given keys, in order.
    pub async fn start(realm: &str, keys: &[&TestSigningKey]) -> Self {
        Self::start_with_response(realm, ResponseTemplate::new(200).set_body_json(jwks_json(keys)))
            .await
    }

    /// Serve an arbitrary JSON body with status 200.
    pub async fn start_with_body(realm: &str, body: Value) -> Self {
        Self::start_with_response(realm, ResponseTemplate::new(200).set_body_json(body)).await
    }

    /// Answer every key-set request with `status` and an empty body.
    pub async fn start_failing(realm: &str, status: u16) -> Self {
        Self::start_with_response(realm, ResponseTemplate::new(status)).await
    }

    /// Serve the given keys after `delay`.
    pub async fn start_delayed(realm: &str, keys: &[&TestSigningKey], delay: Duration) -> Self {
        Self::start_with_response(
            realm,
            ResponseTemplate::new(200)
                .set_body_json(jwks_json(keys))
                .set_delay(delay),
        )
        .await
    }

    async fn start_with_response(realm: &str, response: ResponseTemplate) -> Self {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(certs_path(realm)))
            .respond_with(response)
            .mount(&server)
            .await;

        Self {
            server,
            realm: realm.to_string(),
        }
    }

    /// Base URL of the mock provider.
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Provider configuration pointing at this server.
    pub fn config(&self) -> ProviderConfig {
        ProviderConfig::new(&self.server.uri(), &self.realm)
            .expect("mock server URI and realm are valid")
    }

    /// Number of requests the server has received so far.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}

/// Path of a realm's key-set document.
pub fn certs_path(realm: &str) -> String {
    format!("/realms/{}/protocol/openid-connect/certs", realm)
}
