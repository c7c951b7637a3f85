use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::repository::Repository;
use super::subscription::Subscription;
use super::types::{BackendConfig, Talk, TalkId};
use super::{FeedEvent, ResultExt, TalkApi};

const LIST_TALKS: &str = r#"query ListTalks {
  listTalks {
    items { id clientId name description speakerName speakerBio }
  }
}"#;

const CREATE_TALK: &str = r#"mutation CreateTalk($input: CreateTalkInput!) {
  createTalk(input: $input) { id clientId name description speakerName speakerBio }
}"#;

const DELETE_TALK: &str = r#"mutation DeleteTalk($input: DeleteTalkInput!) {
  deleteTalk(input: $input) { id }
}"#;

const ON_CREATE_TALK: &str = r#"subscription OnCreateTalk {
  onCreateTalk { id clientId name description speakerName speakerBio }
}"#;

const WS_PROTOCOL: &str = "graphql-transport-ws";
const SUBSCRIPTION_ID: &str = "on-create-talk";

/// Talks to the GraphQL backend. Queries and mutations go over http,
/// subscriptions over a `graphql-transport-ws` websocket.
#[derive(Clone)]
pub struct GraphQlModel {
    endpoint: Url,
    realtime: Url,
    api_key: Option<String>,
    client: reqwest::Client,
    repository: Repository,
}

impl std::fmt::Debug for GraphQlModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQlModel")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

impl GraphQlModel {
    pub fn new(config: &BackendConfig, repository: Repository) -> Result<Self, String> {
        Ok(Self {
            endpoint: config.endpoint_url()?,
            realtime: config.realtime_url()?,
            api_key: config.api_key.clone(),
            client: reqwest::Client::new(),
            repository,
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        call: &'static str,
        query: &str,
        variables: Value,
    ) -> Result<T, String> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&GraphQlRequest { query, variables });
        if let Some(ref key) = self.api_key {
            request = request.header("x-api-key", key);
        }
        if let Some(token) = self.repository.id_token() {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }
        let response: GraphQlResponse<T> = request
            .send()
            .await
            .string_error(call)?
            .error_for_status()
            .string_error(call)?
            .json()
            .await
            .string_error(call)?;
        response.into_result().string_error(call)
    }

    /// Credentials sent along with `connection_init`
    fn connection_payload(&self) -> Value {
        let mut payload = serde_json::Map::new();
        if let Some(ref key) = self.api_key {
            payload.insert("x-api-key".to_string(), Value::String(key.clone()));
        }
        if let Some(token) = self.repository.id_token() {
            payload.insert("Authorization".to_string(), Value::String(token));
        }
        Value::Object(payload)
    }
}

#[async_trait]
impl TalkApi for GraphQlModel {
    async fn list_talks(&self) -> Result<Vec<Talk>, String> {
        log::trace!("List talks");
        let data: ListTalksData = self.execute("list_talks", LIST_TALKS, Value::Null).await?;
        Ok(data.list_talks.items)
    }

    async fn create_talk(&self, talk: &Talk) -> Result<Talk, String> {
        log::trace!("Create talk {}", talk.id);
        let data: CreateTalkData = self
            .execute("create_talk", CREATE_TALK, json!({ "input": talk }))
            .await?;
        Ok(data.create_talk)
    }

    async fn delete_talk(&self, id: &TalkId) -> Result<TalkId, String> {
        log::trace!("Delete talk {id}");
        let data: DeleteTalkData = self
            .execute("delete_talk", DELETE_TALK, json!({ "input": { "id": id } }))
            .await?;
        Ok(data.delete_talk.id)
    }

    async fn subscribe_created(
        &self,
        sender: Arc<dyn Fn(FeedEvent) + Send + Sync>,
    ) -> Result<Subscription, String> {
        log::trace!("Subscribe");
        let mut request = self
            .realtime
            .as_str()
            .into_client_request()
            .string_error("subscribe")?;
        request.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            HeaderValue::from_static(WS_PROTOCOL),
        );
        let (socket, _) = tokio_tungstenite::connect_async(request)
            .await
            .string_error("subscribe")?;
        let (mut write, mut read) = socket.split();

        let init = ClientMessage::ConnectionInit {
            payload: self.connection_payload(),
        };
        write.send(init.message()?).await.string_error("subscribe")?;

        // Nothing may be subscribed before the server acknowledged the connection
        loop {
            let Some(message) = read.next().await else {
                return Err("Connection closed before it was acknowledged".to_string());
            };
            let Message::Text(text) = message.string_error("subscribe")? else {
                continue;
            };
            match ServerMessage::parse(&text)? {
                ServerMessage::ConnectionAck => break,
                ServerMessage::Ping => {
                    write
                        .send(ClientMessage::Pong {}.message()?)
                        .await
                        .string_error("subscribe")?;
                }
                other => log::debug!("Ignoring {other:?} before connection_ack"),
            }
        }

        let subscribe = ClientMessage::Subscribe {
            id: SUBSCRIPTION_ID,
            payload: GraphQlRequest {
                query: ON_CREATE_TALK,
                variables: Value::Null,
            },
        };
        write.send(subscribe.message()?).await.string_error("subscribe")?;

        let (stop, mut stopped) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let ended = loop {
                tokio::select! {
                    _ = &mut stopped => {
                        if let Ok(complete) = (ClientMessage::Complete { id: SUBSCRIPTION_ID }).message() {
                            let _ = write.send(complete).await;
                        }
                        let _ = write.close().await;
                        log::debug!("Subscription stopped");
                        return;
                    }
                    message = read.next() => {
                        let text = match message {
                            Some(Ok(Message::Text(text))) => text,
                            Some(Ok(Message::Close(_))) | None => {
                                break "Subscription connection closed".to_string();
                            }
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => break format!("Subscription error: {e:?}"),
                        };
                        match ServerMessage::parse(&text) {
                            Ok(ServerMessage::Next { payload, .. }) => match payload.into_result() {
                                Ok(data) => sender(FeedEvent::Created(data.on_create_talk)),
                                Err(e) => log::error!("Subscription payload error: {e}"),
                            },
                            Ok(ServerMessage::Ping) => {
                                if let Ok(pong) = (ClientMessage::Pong {}).message() {
                                    let _ = write.send(pong).await;
                                }
                            }
                            Ok(ServerMessage::Error { payload, .. }) => {
                                break format!("Subscription rejected: {}", join_errors(&payload));
                            }
                            Ok(ServerMessage::Complete { .. }) => {
                                break "Subscription completed by the server".to_string();
                            }
                            Ok(other) => log::trace!("Ignoring {other:?}"),
                            Err(e) => log::error!("{e}"),
                        }
                    }
                }
            };
            sender(FeedEvent::Ended(ended));
        });

        Ok(Subscription::new("onCreateTalk", move || {
            let _ = stop.send(());
        })
        .with_task(task))
    }
}

#[derive(Serialize, Debug)]
struct GraphQlRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Value::is_null")]
    variables: Value,
}

#[derive(Deserialize, Debug)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

impl<T> GraphQlResponse<T> {
    fn into_result(self) -> Result<T, String> {
        if !self.errors.is_empty() {
            return Err(join_errors(&self.errors));
        }
        self.data.ok_or_else(|| "Response without data".to_string())
    }
}

#[derive(Deserialize, Debug, Clone)]
struct GraphQlError {
    message: String,
}

fn join_errors(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ListTalksData {
    list_talks: TalkConnection,
}

#[derive(Deserialize, Debug)]
struct TalkConnection {
    items: Vec<Talk>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateTalkData {
    create_talk: Talk,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct DeleteTalkData {
    delete_talk: DeletedTalk,
}

#[derive(Deserialize, Debug)]
struct DeletedTalk {
    id: TalkId,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct OnCreateTalkData {
    on_create_talk: Talk,
}

#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage<'a> {
    ConnectionInit { payload: Value },
    Subscribe {
        id: &'a str,
        payload: GraphQlRequest<'a>,
    },
    Complete { id: &'a str },
    Pong {},
}

impl ClientMessage<'_> {
    fn message(&self) -> Result<Message, String> {
        serde_json::to_string(self)
            .map(Message::Text)
            .map_err(|e| format!("Could not encode {self:?}: {e:?}"))
    }
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    ConnectionAck,
    Next {
        id: String,
        payload: GraphQlResponse<OnCreateTalkData>,
    },
    Error {
        id: String,
        payload: Vec<GraphQlError>,
    },
    Complete {
        id: String,
    },
    Ping,
    Pong,
}

impl ServerMessage {
    fn parse(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("Unexpected message {text}: {e:?}"))
    }
}
