// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Authenticated client for the module-hub directory service: resolves
//! module metadata and registers this node.

mod error;
mod token;

pub use crate::error::Error;

use std::sync::{Arc, RwLock};

use node_types::{Module, ModuleKind, NodeRecord};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct Client {
    http: HttpClient,
    base_url: String,
    ns: String,
    db: String,
    token: Arc<RwLock<Option<String>>>,
}

#[derive(Debug, Deserialize)]
struct SigninResponse {
    token: String,
}

impl Client {
    pub fn new(base_url: impl Into<String>, ns: impl Into<String>, db: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.into(),
            ns: ns.into(),
            db: db.into(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Exchanges username/password for a session token, cached for every
    /// subsequent request on this client.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<(), Error> {
        let token = self.signin(username, password).await?;
        *self.token.write().unwrap() = Some(token);
        Ok(())
    }

    async fn signin(&self, username: &str, password: &str) -> Result<String, Error> {
        let response = self
            .http
            .post(format!("{}/signin", self.base_url))
            .json(&json!({ "ns": self.ns, "db": self.db, "user": username, "pass": password }))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            log::warn!("hub rejected credentials for user {username:?}");
            return Err(Error::Auth);
        }

        let body: SigninResponse = response.error_for_status()?.json().await?;
        Ok(body.token)
    }

    fn current_token(&self) -> Result<String, Error> {
        self.token.read().unwrap().clone().ok_or_else(|| {
            log::error!("no active hub session token; call authenticate() first");
            Error::Auth
        })
    }

    /// Subject (`node:<public_key>` or hub user id) encoded in the active
    /// session token.
    pub fn current_subject(&self) -> Result<String, Error> {
        token::decode(&self.current_token()?).map(|claims| claims.subject)
    }

    fn authed_request(&self, method: reqwest::Method, path: &str) -> Result<reqwest::RequestBuilder, Error> {
        let token = self.current_token()?;
        Ok(self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .header("surreal-ns", &self.ns)
            .header("surreal-db", &self.db))
    }

    /// Elevates to a privileged account for the duration of the returned
    /// guard; the prior token (if any) is restored when it drops, on every
    /// exit path including an early return or panic unwind.
    pub async fn root_session(&self, root_username: &str, root_password: &str) -> Result<RootSession<'_>, Error> {
        let previous = self.token.read().unwrap().clone();
        let root_token = self.signin(root_username, root_password).await?;
        *self.token.write().unwrap() = Some(root_token);
        Ok(RootSession {
            token: Arc::clone(&self.token),
            previous,
            _client: self,
        })
    }

    pub async fn list_modules(&self, kind: ModuleKind, name: Option<&str>) -> Result<Vec<Module>, Error> {
        let mut request = self.authed_request(reqwest::Method::GET, &format!("/modules/{kind}"))?;
        if let Some(name) = name {
            request = request.query(&[("name", name)]);
        }
        let modules: Vec<Module> = request.send().await?.error_for_status()?.json().await?;
        Ok(modules)
    }

    pub async fn create_node(&self, node: &NodeRecord) -> Result<NodeRecord, Error> {
        let created: NodeRecord = self
            .authed_request(reqwest::Method::POST, "/nodes")?
            .json(node)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(created)
    }

    pub async fn get_node(&self, id: &str) -> Result<NodeRecord, Error> {
        let response = self.authed_request(reqwest::Method::GET, &format!("/nodes/{id}"))?.send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            log::warn!("node {id} not found in hub directory");
            return Err(Error::NotFound(id.to_owned()));
        }
        Ok(response.error_for_status()?.json().await?)
    }

    pub async fn update_node(&self, id: &str, node: &NodeRecord) -> Result<NodeRecord, Error> {
        let updated: NodeRecord = self
            .authed_request(reqwest::Method::PUT, &format!("/nodes/{id}"))?
            .json(node)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(updated)
    }

    pub async fn delete_node(&self, id: &str) -> Result<(), Error> {
        let response = self.authed_request(reqwest::Method::DELETE, &format!("/nodes/{id}"))?.send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            log::warn!("node {id} not found when deleting");
            return Err(Error::NotFound(id.to_owned()));
        }
        response.error_for_status()?;
        Ok(())
    }

    pub async fn create_secret(&self, owner_id: &str, name: &str, value: &str) -> Result<(), Error> {
        self.authed_request(reqwest::Method::POST, "/secrets")?
            .json(&json!({ "owner": owner_id, "name": name, "value": value }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Scoped elevation returned by [`Client::root_session`]; restores the
/// previously active token when dropped, mirroring the lock/guard release
/// discipline the rest of this workspace uses for file locks.
#[must_use = "root session is released as soon as this guard is dropped"]
pub struct RootSession<'a> {
    token: Arc<RwLock<Option<String>>>,
    previous: Option<String>,
    _client: &'a Client,
}

impl Drop for RootSession<'_> {
    fn drop(&mut self) {
        *self.token.write().unwrap() = self.previous.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn authenticated_client(server: &MockServer) -> Client {
        Mock::given(method("POST"))
            .and(path("/signin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "header.eyJzdWIiOiJub2RlOmFiYyJ9.sig"})))
            .mount(server)
            .await;

        let client = Client::new(server.uri(), "naptha", "naptha");
        client.authenticate("alice", "secret").await.unwrap();
        client
    }

    #[tokio::test]
    async fn authenticate_caches_token_for_subsequent_calls() {
        let server = MockServer::start().await;
        let client = authenticated_client(&server).await;
        assert!(client.current_token().is_ok());
    }

    #[tokio::test]
    async fn unauthorized_signin_surfaces_as_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/signin"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = Client::new(server.uri(), "naptha", "naptha");
        let err = client.authenticate("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, Error::Auth));
    }

    #[tokio::test]
    async fn root_session_restores_previous_token_on_drop() {
        let server = MockServer::start().await;
        let client = authenticated_client(&server).await;
        let original = client.current_token().unwrap();

        Mock::given(method("POST"))
            .and(path("/signin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "root-token"})))
            .mount(&server)
            .await;

        {
            let _root = client.root_session("root", "root-pass").await.unwrap();
            assert_eq!(client.current_token().unwrap(), "root-token");
        }

        assert_eq!(client.current_token().unwrap(), original);
    }

    #[tokio::test]
    async fn node_not_found_maps_to_not_found_error() {
        let server = MockServer::start().await;
        let client = authenticated_client(&server).await;

        Mock::given(method("GET"))
            .and(path("/nodes/node:missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client.get_node("node:missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
