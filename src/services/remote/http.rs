use std::time::Duration;

use reqwest::{Client as HttpClient, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{
        MediaDraft, MediaItem, MovieId, MovieQuery, Review, ReviewId, ReviewRequest,
        WatchlistEntry,
    },
    services::remote::{
        request_id::{RequestId, REQUEST_ID_HEADER},
        RemoteApi,
    },
};

/// `RemoteApi` over HTTP with `reqwest`
#[derive(Clone)]
pub struct HttpRemoteClient {
    http_client: HttpClient,
    api_url: String,
    token: Option<String>,
}

impl HttpRemoteClient {
    /// Creates a client with default transport settings
    pub fn new(api_url: &str, token: Option<String>) -> AppResult<Self> {
        Self::with_http_client(HttpClient::new(), api_url, token)
    }

    /// Creates a client from configuration, applying its transport timeouts
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(format!("MediaHub/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(AppError::from)?;

        Self::with_http_client(http_client, &config.api_url, config.api_token.clone())
    }

    fn with_http_client(
        http_client: HttpClient,
        api_url: &str,
        token: Option<String>,
    ) -> AppResult<Self> {
        let api_url = api_url.trim().trim_end_matches('/').to_string();

        if api_url.is_empty() {
            return Err(AppError::Validation("API URL cannot be empty".to_string()));
        }
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(AppError::Validation(
                "API URL must start with http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            http_client,
            api_url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Builds a request with the bearer token and a fresh request id
    fn request(&self, method: Method, path: &str) -> (RequestBuilder, RequestId) {
        let request_id = RequestId::new();
        let url = format!("{}{}", self.api_url, path);

        let mut builder = self
            .http_client
            .request(method, url)
            .header(REQUEST_ID_HEADER, request_id.to_string());

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        (builder, request_id)
    }

    /// Sends a request and returns the successful response, mapping failures
    async fn execute(
        &self,
        builder: RequestBuilder,
        request_id: RequestId,
        operation: &'static str,
    ) -> AppResult<Response> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(
                operation,
                request_id = %request_id,
                error = %e,
                "API request could not be sent"
            );
            AppError::from(e)
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                operation,
                request_id = %request_id,
                status = %status,
                body = %body,
                "API request failed"
            );
            return Err(AppError::from_response(status, &body));
        }

        tracing::debug!(
            operation,
            request_id = %request_id,
            status = %response.status(),
            "API request completed"
        );

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        request_id: RequestId,
        operation: &'static str,
    ) -> AppResult<T> {
        let response = self.execute(builder, request_id, operation).await?;
        let text = response.text().await?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                operation,
                request_id = %request_id,
                error = %e,
                response = %text,
                "Failed to deserialize API response"
            );
            AppError::RequestFailed {
                status: None,
                message: Some(format!("Failed to parse response: {}", e)),
            }
        })
    }

    async fn send_empty(
        &self,
        builder: RequestBuilder,
        request_id: RequestId,
        operation: &'static str,
    ) -> AppResult<()> {
        self.execute(builder, request_id, operation).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RemoteApi for HttpRemoteClient {
    async fn list_movies(&self, query: MovieQuery) -> AppResult<Vec<MediaItem>> {
        let (builder, request_id) = self.request(Method::GET, "/movies");
        let builder = builder.query(&query.to_pairs());

        let movies: Vec<MediaItem> = self.send_json(builder, request_id, "list_movies").await?;

        tracing::info!(
            media_type = ?query.media_type,
            sort = %query.sort,
            results = movies.len(),
            "Movie list fetched"
        );

        Ok(movies)
    }

    async fn search_movies(&self, keyword: &str) -> AppResult<Vec<MediaItem>> {
        if keyword.trim().is_empty() {
            return Err(AppError::Validation(
                "Search keyword cannot be empty".to_string(),
            ));
        }

        let (builder, request_id) = self.request(Method::GET, "/movies/search");
        let builder = builder.query(&[("keyword", keyword.trim())]);

        let movies: Vec<MediaItem> = self
            .send_json(builder, request_id, "search_movies")
            .await?;

        tracing::info!(keyword = %keyword, results = movies.len(), "Movie search completed");

        Ok(movies)
    }

    async fn get_movie(&self, id: MovieId) -> AppResult<MediaItem> {
        let (builder, request_id) = self.request(Method::GET, &format!("/movies/{}", id));
        self.send_json(builder, request_id, "get_movie").await
    }

    async fn create_movie(&self, draft: &MediaDraft) -> AppResult<MediaItem> {
        draft.validate()?;

        let (builder, request_id) = self.request(Method::POST, "/movies");
        let movie: MediaItem = self
            .send_json(builder.json(draft), request_id, "create_movie")
            .await?;

        tracing::info!(movie_id = %movie.id, title = %movie.title, "Movie created");

        Ok(movie)
    }

    async fn update_movie(&self, id: MovieId, draft: &MediaDraft) -> AppResult<MediaItem> {
        draft.validate()?;

        let (builder, request_id) = self.request(Method::PUT, &format!("/movies/{}", id));
        let movie: MediaItem = self
            .send_json(builder.json(draft), request_id, "update_movie")
            .await?;

        tracing::info!(movie_id = %movie.id, "Movie updated");

        Ok(movie)
    }

    async fn delete_movie(&self, id: MovieId) -> AppResult<()> {
        let (builder, request_id) = self.request(Method::DELETE, &format!("/movies/{}", id));
        self.send_empty(builder, request_id, "delete_movie").await?;

        tracing::info!(movie_id = %id, "Movie deleted");

        Ok(())
    }

    async fn list_reviews(&self, movie_id: MovieId) -> AppResult<Vec<Review>> {
        let (builder, request_id) =
            self.request(Method::GET, &format!("/movies/{}/reviews", movie_id));
        self.send_json(builder, request_id, "list_reviews").await
    }

    async fn create_review(
        &self,
        movie_id: MovieId,
        request: &ReviewRequest,
    ) -> AppResult<Review> {
        let (builder, request_id) =
            self.request(Method::POST, &format!("/movies/{}/reviews", movie_id));
        let review: Review = self
            .send_json(builder.json(request), request_id, "create_review")
            .await?;

        tracing::info!(
            movie_id = %movie_id,
            review_id = %review.id,
            rating = review.rating.value(),
            "Review created"
        );

        Ok(review)
    }

    async fn update_review(
        &self,
        review_id: ReviewId,
        request: &ReviewRequest,
    ) -> AppResult<Review> {
        let (builder, request_id) =
            self.request(Method::PUT, &format!("/reviews/{}", review_id));
        let review: Review = self
            .send_json(builder.json(request), request_id, "update_review")
            .await?;

        tracing::info!(
            review_id = %review.id,
            rating = review.rating.value(),
            "Review updated"
        );

        Ok(review)
    }

    async fn delete_review(&self, review_id: ReviewId) -> AppResult<()> {
        let (builder, request_id) =
            self.request(Method::DELETE, &format!("/reviews/{}", review_id));
        self.send_empty(builder, request_id, "delete_review").await?;

        tracing::info!(review_id = %review_id, "Review deleted");

        Ok(())
    }

    async fn my_reviews(&self) -> AppResult<Vec<Review>> {
        let (builder, request_id) = self.request(Method::GET, "/users/me/reviews");
        self.send_json(builder, request_id, "my_reviews").await
    }

    async fn watchlist(&self) -> AppResult<Vec<WatchlistEntry>> {
        let (builder, request_id) = self.request(Method::GET, "/watchlist");
        self.send_json(builder, request_id, "watchlist").await
    }

    async fn add_to_watchlist(&self, movie_id: MovieId) -> AppResult<WatchlistEntry> {
        let (builder, request_id) =
            self.request(Method::POST, &format!("/watchlist/movies/{}", movie_id));
        let entry: WatchlistEntry = self
            .send_json(builder, request_id, "add_to_watchlist")
            .await?;

        tracing::info!(movie_id = %movie_id, "Added to watchlist");

        Ok(entry)
    }

    async fn remove_from_watchlist(&self, movie_id: MovieId) -> AppResult<()> {
        let (builder, request_id) =
            self.request(Method::DELETE, &format!("/watchlist/movies/{}", movie_id));
        self.send_empty(builder, request_id, "remove_from_watchlist")
            .await?;

        tracing::info!(movie_id = %movie_id, "Removed from watchlist");

        Ok(())
    }
}
