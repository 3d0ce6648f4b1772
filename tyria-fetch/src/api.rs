//! Typed endpoint surface of the upstream API.

use std::sync::Arc;

use tracing::instrument;
use tyria_core::{
    Bank, Character, CharacterCore, CharacterCrafting, CharacterInventory, Item, ItemId,
};

use crate::batch::{BatchFetcher, dedup_preserving_order};
use crate::error::FetchError;
use crate::http::{ApiRequest, HttpClient};

/// One method per upstream endpoint, all sharing one [`HttpClient`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Arc<HttpClient>,
    fetcher: Arc<BatchFetcher>,
}

impl ApiClient {
    /// Creates a client over `client`, using `fetcher` for chunked lookups.
    pub fn new(client: Arc<HttpClient>, fetcher: Arc<BatchFetcher>) -> Self {
        Self { client, fetcher }
    }

    /// Returns the underlying HTTP client.
    pub fn http(&self) -> &Arc<HttpClient> {
        &self.client
    }

    /// `GET /v2/account/bank`. Needs an API key with the `inventories` scope.
    ///
    /// # Errors
    ///
    /// Returns the classified error of the request.
    #[instrument(skip(self))]
    pub async fn get_bank(&self) -> Result<Bank, FetchError> {
        self.client
            .get_json(ApiRequest::new(["account", "bank"]))
            .await
    }

    /// `GET /v2/characters`: names of the account's characters.
    ///
    /// # Errors
    ///
    /// Returns the classified error of the request.
    #[instrument(skip(self))]
    pub async fn get_characters(&self) -> Result<Vec<String>, FetchError> {
        self.client.get_json(ApiRequest::new(["characters"])).await
    }

    /// `GET /v2/characters/{name}`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidInput`] for a blank name, otherwise the
    /// classified error of the request.
    #[instrument(skip(self))]
    pub async fn get_character(&self, name: &str) -> Result<Character, FetchError> {
        let name = character_name(name)?;
        self.client
            .get_json(ApiRequest::new(["characters", name]))
            .await
    }

    /// `GET /v2/characters/{name}/core`.
    ///
    /// # Errors
    ///
    /// Same as [`get_character`](Self::get_character).
    #[instrument(skip(self))]
    pub async fn get_character_core(&self, name: &str) -> Result<CharacterCore, FetchError> {
        let name = character_name(name)?;
        self.client
            .get_json(ApiRequest::new(["characters", name, "core"]))
            .await
    }

    /// `GET /v2/characters/{name}/crafting`.
    ///
    /// # Errors
    ///
    /// Same as [`get_character`](Self::get_character).
    #[instrument(skip(self))]
    pub async fn get_character_crafting(
        &self,
        name: &str,
    ) -> Result<CharacterCrafting, FetchError> {
        let name = character_name(name)?;
        self.client
            .get_json(ApiRequest::new(["characters", name, "crafting"]))
            .await
    }

    /// `GET /v2/characters/{name}/inventory`.
    ///
    /// # Errors
    ///
    /// Same as [`get_character`](Self::get_character).
    #[instrument(skip(self))]
    pub async fn get_character_inventory(
        &self,
        name: &str,
    ) -> Result<CharacterInventory, FetchError> {
        let name = character_name(name)?;
        self.client
            .get_json(ApiRequest::new(["characters", name, "inventory"]))
            .await
    }

    /// `GET /v2/items?ids=...` as a single request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidInput`] if `ids` is empty, otherwise the
    /// classified error of the request.
    #[instrument(skip(self, ids), fields(ids = ids.len()))]
    pub async fn get_items(&self, ids: &[ItemId]) -> Result<Vec<Item>, FetchError> {
        let ids = dedup_preserving_order(ids);
        if ids.is_empty() {
            return Err(FetchError::InvalidInput("No item ids given".to_string()));
        }

        let joined = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.client
            .get_json(ApiRequest::new(["items"]).with_query("ids", joined))
            .await
    }

    /// `GET /v2/items?ids=...` in chunks of `chunk_size`.
    ///
    /// # Errors
    ///
    /// See [`BatchFetcher::fetch_batch`].
    pub async fn get_items_chunked(
        &self,
        ids: &[ItemId],
        chunk_size: usize,
    ) -> Result<Vec<Item>, FetchError> {
        self.fetcher.fetch_batch(ids, chunk_size).await
    }
}

fn character_name(name: &str) -> Result<&str, FetchError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidInput(
            "Character name is empty".to_string(),
        ));
    }
    Ok(trimmed)
}
