//! Search controller

use crate::error::{Error, Result};
use crate::response_parser::validate_search_payload;
use crate::session::Session;
use crate::transport::{ApiRequest, Transport};
use crate::types::{Event, SearchQuery, VideoResult};
use std::sync::Arc;
use tokio::sync::broadcast;

/// How a search call ended, when it did not fail
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The query was blank; nothing was sent
    Skipped,
    /// These results were stored in the session
    Stored(Vec<VideoResult>),
    /// A newer search started before this one resolved; its response was dropped
    Superseded,
}

/// Issues searches and stores their results in the session
#[derive(Clone)]
pub struct SearchController {
    transport: Arc<dyn Transport>,
    session: Session,
    event_tx: broadcast::Sender<Event>,
}

impl SearchController {
    /// Create a controller writing into `session`
    pub fn new(
        transport: Arc<dyn Transport>,
        session: Session,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            transport,
            session,
            event_tx,
        }
    }

    /// Whether the most recent search is still outstanding
    pub fn is_searching(&self) -> bool {
        self.session.read(|s| s.searching)
    }

    /// Search for `text`
    ///
    /// A blank query is a no-op. On success with at least one result the
    /// stored list is replaced. Every failure, an empty result set included,
    /// leaves the stored list alone and sets the session error.
    ///
    /// Overlapping calls are allowed; only the most recently started one
    /// gets to touch the session.
    pub async fn search(&self, text: &str) -> Result<SearchOutcome> {
        let Some(query) = SearchQuery::new(text) else {
            tracing::debug!("ignoring blank search query");
            return Ok(SearchOutcome::Skipped);
        };

        let generation = self.session.update(|s| s.on_search_started());
        tracing::info!(query = %query, generation, "searching");
        self.event_tx
            .send(Event::SearchStarted {
                query: query.to_string(),
            })
            .ok();

        match self.fetch(&query).await {
            Ok(results) => {
                if !self
                    .session
                    .update(|s| s.on_search_succeeded(generation, results.clone()))
                {
                    tracing::debug!(generation, "discarding superseded search results");
                    return Ok(SearchOutcome::Superseded);
                }

                tracing::info!(query = %query, count = results.len(), "search completed");
                self.event_tx
                    .send(Event::SearchCompleted {
                        query: query.to_string(),
                        count: results.len(),
                    })
                    .ok();
                Ok(SearchOutcome::Stored(results))
            }
            Err(e) => {
                if !self.session.update(|s| s.on_search_failed(generation, &e)) {
                    tracing::debug!(generation, error = %e, "discarding superseded search failure");
                    return Ok(SearchOutcome::Superseded);
                }

                if e.is_fault() {
                    tracing::warn!(query = %query, error = %e, "search failed");
                } else {
                    tracing::info!(query = %query, "search returned no results");
                }
                self.event_tx
                    .send(Event::SearchFailed {
                        query: query.to_string(),
                        error: e.to_string(),
                    })
                    .ok();
                Err(e)
            }
        }
    }

    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<VideoResult>> {
        let request = ApiRequest::Search {
            query: query.to_string(),
        };
        let response = self.transport.send(&request).await?;

        if !response.is_success() {
            return Err(Error::Http {
                status: response.status,
            });
        }

        let results = validate_search_payload(&response.body)?;
        if results.is_empty() {
            return Err(Error::NoResults);
        }
        Ok(results)
    }
}
