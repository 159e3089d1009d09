use std::sync::Arc;

use async_trait::async_trait;
use overtrakt_core::{ListItemsApi, TokenManager};
use overtrakt_domain::{ListItemsRequest, ListItemsResponse, OvertraktError, Result};
use reqwest::{Method, Response};

use super::transport::{decode_json, ensure_success, ApiTransport, RequestParameters};

/// Authenticated Trakt API calls.
///
/// Every call runs [`TokenManager::authenticate`] first, so an expired token
/// is refreshed (or re-granted) before the request is signed.
#[derive(Clone)]
pub struct TraktApiClient {
    transport: ApiTransport,
    tokens: Arc<TokenManager>,
}

impl TraktApiClient {
    pub fn new(transport: ApiTransport, tokens: Arc<TokenManager>) -> Self {
        Self { transport, tokens }
    }

    /// Authenticate, then send a signed request. The method defaults to POST.
    pub async fn query_api(&self, mut parameters: RequestParameters) -> Result<Response> {
        self.tokens.authenticate().await?;
        let bearer = self
            .tokens
            .bearer()
            .await
            .ok_or_else(|| OvertraktError::Auth("no access token after authentication".into()))?;

        parameters.method.get_or_insert(Method::POST);
        self.transport.execute(parameters, Some(&bearer)).await
    }
}

#[async_trait]
impl ListItemsApi for TraktApiClient {
    async fn add_list_items(
        &self,
        user_id: &str,
        list_id: &str,
        items: &ListItemsRequest,
    ) -> Result<ListItemsResponse> {
        let path = format!(
            "/users/{}/lists/{}/items",
            urlencoding::encode(user_id),
            urlencoding::encode(list_id)
        );
        let parameters = RequestParameters {
            method: None,
            path,
            body: Some(serde_json::to_value(items)?),
        };

        let response = self.query_api(parameters).await?;
        let response = ensure_success(response, "add list items").await?;
        decode_json(response, "add list items").await
    }
}
