use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{DiscoverQuery, TmdbMovieSummary},
    services::{
        generative::{GenerativeModel, ModelReply, ToolSpec, Turn},
        providers::MovieProvider,
    },
};

pub const SEARCH_TOOL: &str = "search_movies";
const MAX_TOOL_ROUNDS: usize = 3;
const MAX_MESSAGES: usize = 40;

const SYSTEM_PROMPT: &str = "You are a friendly movie recommendation assistant. \
When the user describes what they feel like watching, call the search_movies tool \
with TMDb genre ids (Action 28, Adventure 12, Animation 16, Comedy 35, Crime 80, \
Documentary 99, Drama 18, Family 10751, Fantasy 14, History 36, Horror 27, Music 10402, \
Mystery 9648, Romance 10749, Science Fiction 878, Thriller 53, War 10752, Western 37) \
and any filters the request implies. Afterwards, briefly explain the picks.";

/// A message from the end user or a previous assistant reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub reply: Option<String>,
    /// Results of the last tool call, exactly as TMDb returned them
    pub movies: Vec<TmdbMovieSummary>,
    /// Arguments of the last tool call, after parsing
    pub query: Option<DiscoverQuery>,
}

/// Conversational search: the model picks discover filters, TMDb answers
pub struct ChatService {
    model: Arc<dyn GenerativeModel>,
    provider: Arc<dyn MovieProvider>,
}

impl ChatService {
    pub fn new(model: Arc<dyn GenerativeModel>, provider: Arc<dyn MovieProvider>) -> Self {
        Self { model, provider }
    }

    /// Declaration of the single tool offered to the model
    pub fn search_tool() -> ToolSpec {
        ToolSpec {
            name: SEARCH_TOOL.to_string(),
            description: "Search movies by genre ids, keywords and optional filters".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "with_genres": {"type": "string", "description": "Comma-separated TMDb genre ids"},
                    "without_genres": {"type": "string", "description": "Comma-separated TMDb genre ids to exclude"},
                    "with_keywords": {"type": "string", "description": "Keyword string"},
                    "vote_average_gte": {"type": "number", "description": "Minimum rating, 0-10"},
                    "vote_count_gte": {"type": "integer", "description": "Minimum number of votes"},
                    "sort_by": {"type": "string", "description": "e.g. popularity.desc or vote_average.desc"},
                    "with_original_language": {"type": "string", "description": "ISO 639-1 code"},
                    "primary_release_year": {"type": "integer"},
                    "with_runtime_gte": {"type": "integer", "description": "Minimum runtime in minutes"},
                    "with_runtime_lte": {"type": "integer", "description": "Maximum runtime in minutes"},
                    "include_adult": {"type": "boolean"}
                }
            }),
        }
    }

    #[tracing::instrument(skip(self, messages), fields(messages = messages.len(), model = self.model.name()))]
    pub async fn respond(&self, messages: &[ChatMessage]) -> AppResult<ChatResponse> {
        validate(messages)?;

        let mut history: Vec<Turn> = Vec::with_capacity(messages.len() + 1 + MAX_TOOL_ROUNDS * 2);
        history.push(Turn::System {
            text: SYSTEM_PROMPT.to_string(),
        });
        history.extend(messages.iter().map(|m| match m.role {
            ChatRole::User => Turn::User {
                text: m.content.clone(),
            },
            ChatRole::Assistant => Turn::Model {
                text: m.content.clone(),
            },
        }));

        let tools = [Self::search_tool()];
        let mut movies = Vec::new();
        let mut last_query = None;

        for round in 0..=MAX_TOOL_ROUNDS {
            // Out of tool rounds: ask for text only.
            let offered: &[ToolSpec] = if round < MAX_TOOL_ROUNDS { &tools } else { &[] };

            match self.model.converse(&history, offered).await? {
                ModelReply::Text(text) => {
                    return Ok(ChatResponse {
                        reply: Some(text),
                        movies,
                        query: last_query,
                    });
                }
                ModelReply::ToolCall { name, args } => {
                    if name != SEARCH_TOOL {
                        tracing::warn!(tool = %name, "Model requested an unknown tool");
                        return Err(AppError::ExternalApi(format!(
                            "Model requested unknown tool '{}'",
                            name
                        )));
                    }

                    let query: DiscoverQuery = serde_json::from_value(args.clone()).map_err(|e| {
                        AppError::ExternalApi(format!("Invalid {} arguments: {}", SEARCH_TOOL, e))
                    })?;

                    let page = self.provider.discover(&query).await?;
                    tracing::info!(round, results = page.results.len(), "Chat tool call served");

                    history.push(Turn::ToolCall {
                        name: name.clone(),
                        args,
                    });
                    history.push(Turn::ToolResult {
                        name,
                        response: serde_json::to_value(&page)?,
                    });

                    movies = page.results;
                    last_query = Some(query);
                }
            }
        }

        // The final round offers no tools, so a text reply is the only way out.
        Ok(ChatResponse {
            reply: None,
            movies,
            query: last_query,
        })
    }
}

fn validate(messages: &[ChatMessage]) -> AppResult<()> {
    if messages.is_empty() {
        return Err(AppError::InvalidInput("At least one message is required".to_string()));
    }
    if messages.len() > MAX_MESSAGES {
        return Err(AppError::InvalidInput(format!(
            "At most {} messages are accepted",
            MAX_MESSAGES
        )));
    }
    match messages.last() {
        Some(last) if last.role == ChatRole::User && !last.content.trim().is_empty() => Ok(()),
        _ => Err(AppError::InvalidInput(
            "The last message must be a non-empty user message".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MoviePage;
    use crate::services::generative::MockGenerativeModel;
    use crate::services::providers::MockMovieProvider;
    use mockall::Sequence;

    fn user(text: &str) -> ChatMessage {
        ChatMessage {
            role: ChatRole::User,
            content: text.to_string(),
        }
    }

    fn page() -> MoviePage {
        serde_json::from_value(json!({
            "page": 1, "total_pages": 1, "total_results": 1,
            "results": [{"id": 105, "title": "Back to the Future", "vote_average": 8.3, "genre_ids": [12, 35, 878]}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_tool_call_is_forwarded_verbatim() {
        let mut model = MockGenerativeModel::new();
        let mut seq = Sequence::new();
        model.expect_name().return_const("mock");
        model
            .expect_converse()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|history, tools| {
                history.len() == 2
                    && matches!(history[0], Turn::System { .. })
                    && matches!(history[1], Turn::User { .. })
                    && tools.len() == 1
            })
            .returning(|_, _| {
                Ok(ModelReply::ToolCall {
                    name: SEARCH_TOOL.to_string(),
                    args: json!({"with_genres": "35,878", "vote_average_gte": 7.5, "sort_by": "vote_average.desc"}),
                })
            });
        model
            .expect_converse()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|history, _| matches!(history.last(), Some(Turn::ToolResult { .. })))
            .returning(|_, _| Ok(ModelReply::Text("Try Back to the Future!".to_string())));

        let mut provider = MockMovieProvider::new();
        provider
            .expect_discover()
            .withf(|q| {
                q.with_genres.as_deref() == Some("35,878")
                    && q.vote_average_gte == Some(7.5)
                    && q.sort_by.as_deref() == Some("vote_average.desc")
            })
            .times(1)
            .returning(|_| Ok(page()));

        let service = ChatService::new(Arc::new(model), Arc::new(provider));
        let response = service.respond(&[user("a funny sci-fi classic")]).await.unwrap();

        assert_eq!(response.reply.as_deref(), Some("Try Back to the Future!"));
        assert_eq!(response.movies.len(), 1);
        assert_eq!(response.movies[0].id, 105);
        assert_eq!(response.query.unwrap().with_genres.as_deref(), Some("35,878"));
    }

    #[tokio::test]
    async fn test_plain_text_reply_skips_provider() {
        let mut model = MockGenerativeModel::new();
        model.expect_name().return_const("mock");
        model
            .expect_converse()
            .times(1)
            .returning(|_, _| Ok(ModelReply::Text("What mood are you in?".to_string())));

        let mut provider = MockMovieProvider::new();
        provider.expect_discover().never();

        let service = ChatService::new(Arc::new(model), Arc::new(provider));
        let response = service.respond(&[user("hi")]).await.unwrap();

        assert_eq!(response.reply.as_deref(), Some("What mood are you in?"));
        assert!(response.movies.is_empty());
        assert!(response.query.is_none());
    }

    #[tokio::test]
    async fn test_tool_rounds_are_bounded() {
        let mut model = MockGenerativeModel::new();
        model.expect_name().return_const("mock");
        model
            .expect_converse()
            .withf(|_, tools| !tools.is_empty())
            .times(MAX_TOOL_ROUNDS)
            .returning(|_, _| {
                Ok(ModelReply::ToolCall {
                    name: SEARCH_TOOL.to_string(),
                    args: json!({"with_genres": "27"}),
                })
            });
        model
            .expect_converse()
            .withf(|_, tools| tools.is_empty())
            .times(1)
            .returning(|_, _| Ok(ModelReply::Text("Here you go".to_string())));

        let mut provider = MockMovieProvider::new();
        provider
            .expect_discover()
            .times(MAX_TOOL_ROUNDS)
            .returning(|_| Ok(page()));

        let service = ChatService::new(Arc::new(model), Arc::new(provider));
        let response = service.respond(&[user("scare me")]).await.unwrap();
        assert_eq!(response.reply.as_deref(), Some("Here you go"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_rejected() {
        let mut model = MockGenerativeModel::new();
        model.expect_name().return_const("mock");
        model.expect_converse().returning(|_, _| {
            Ok(ModelReply::ToolCall {
                name: "book_tickets".to_string(),
                args: json!({}),
            })
        });

        let service = ChatService::new(Arc::new(model), Arc::new(MockMovieProvider::new()));
        let result = service.respond(&[user("tickets please")]).await;
        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }

    #[tokio::test]
    async fn test_message_validation() {
        let mut model = MockGenerativeModel::new();
        model.expect_name().return_const("mock");
        let service = ChatService::new(Arc::new(model), Arc::new(MockMovieProvider::new()));

        assert!(matches!(service.respond(&[]).await, Err(AppError::InvalidInput(_))));

        let assistant_last = [
            user("hello"),
            ChatMessage {
                role: ChatRole::Assistant,
                content: "hi".to_string(),
            },
        ];
        assert!(matches!(
            service.respond(&assistant_last).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(service.respond(&[user("   ")]).await, Err(AppError::InvalidInput(_))));
    }
}
