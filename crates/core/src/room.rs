//! Client for the real-time audio room platform (LiveKit).
//!
//! The platform is consumed as a black box with four operations: connect to a
//! room, wait for a remote participant, and mint join tokens for callers.
//! Connectivity goes through LiveKit's server HTTP API (Twirp-style JSON
//! endpoints); authentication uses short-lived HS256 JWTs signed with the
//! project API key/secret. The media plane itself (audio publish/subscribe)
//! is never touched here.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Identity under which the agent itself appears in a room.
pub const AGENT_IDENTITY: &str = "govi-agent";

/// Validity window for the short-lived tokens used on server API calls.
const SERVER_TOKEN_TTL: Duration = Duration::from_secs(60);

/// How often the participant wait loop re-reads the room roster.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Errors from the room platform.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("room service API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("failed to mint access token: {0}")]
    TokenMint(#[from] jsonwebtoken::errors::Error),
}

/// Track subscription mode requested when connecting to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoSubscribe {
    /// Subscribe to audio tracks only. The assistant never consumes video.
    #[default]
    AudioOnly,
    /// Subscribe to every published track.
    All,
    /// Subscribe to nothing.
    None,
}

/// Options for [`RoomService::connect`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectOptions {
    pub auto_subscribe: AutoSubscribe,
}

/// Handle to a room the agent has connected to.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    pub name: String,
    pub sid: String,
    pub agent_identity: String,
    pub auto_subscribe: AutoSubscribe,
}

/// A remote participant observed in a room.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub name: String,
}

/// Request for a caller join token.
#[derive(Debug, Clone)]
pub struct JoinGrant {
    /// Room the token admits the caller into.
    pub room: String,
    /// Unique participant identity.
    pub identity: String,
    /// Display name shown to other participants.
    pub name: String,
    /// Token validity window.
    pub ttl: Duration,
}

/// The room platform, reduced to the operations this service needs.
#[async_trait]
pub trait RoomService: Send + Sync {
    /// The signaling URL callers should connect to.
    fn server_url(&self) -> &str;

    /// Ensures the room exists and registers the agent's subscription intent.
    async fn connect(
        &self,
        room_name: &str,
        options: ConnectOptions,
    ) -> Result<RoomHandle, RoomError>;

    /// Blocks until a remote participant (anyone but the agent) is present.
    ///
    /// No timeout is imposed here; callers needing bounded startup latency
    /// wrap this in their own deadline.
    async fn wait_for_participant(&self, room: &RoomHandle) -> Result<ParticipantInfo, RoomError>;

    /// Mints a short-lived join token for a caller.
    fn mint_join_token(&self, grant: &JoinGrant) -> Result<String, RoomError>;
}

/// Video grants embedded in a LiveKit access token.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoGrants {
    #[serde(default, skip_serializing_if = "is_false")]
    room_create: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    room_list: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    room_admin: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    room_join: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    room: String,
    #[serde(default, skip_serializing_if = "is_false")]
    can_publish: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    can_subscribe: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// JWT claim set LiveKit expects.
#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    iss: String,
    sub: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    nbf: u64,
    exp: u64,
    video: VideoGrants,
}

#[derive(Debug, Serialize)]
struct CreateRoomRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomInfo {
    #[serde(default)]
    sid: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Serialize)]
struct ListParticipantsRequest<'a> {
    room: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParticipantsResponse {
    #[serde(default)]
    participants: Vec<ParticipantInfo>,
}

/// [`RoomService`] implementation backed by a LiveKit deployment.
pub struct LiveKitRoomService {
    http: reqwest::Client,
    url: String,
    api_key: String,
    api_secret: String,
    poll_interval: Duration,
}

impl LiveKitRoomService {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the participant-wait polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The server API lives on the HTTP scheme counterpart of the signaling URL.
    fn api_base(&self) -> String {
        let base = if let Some(rest) = self.url.strip_prefix("wss://") {
            format!("https://{rest}")
        } else if let Some(rest) = self.url.strip_prefix("ws://") {
            format!("http://{rest}")
        } else {
            self.url.clone()
        };
        base.trim_end_matches('/').to_string()
    }

    fn sign(
        &self,
        identity: &str,
        name: &str,
        grants: VideoGrants,
        ttl: Duration,
    ) -> Result<String, RoomError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_secs();
        let claims = AccessClaims {
            iss: self.api_key.clone(),
            sub: identity.to_string(),
            name: name.to_string(),
            nbf: now,
            exp: now + ttl.as_secs(),
            video: grants,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )?;
        Ok(token)
    }

    fn server_token(&self, grants: VideoGrants) -> Result<String, RoomError> {
        self.sign(AGENT_IDENTITY, "", grants, SERVER_TOKEN_TTL)
    }

    /// One server API call; each call carries a token scoped to the grants
    /// that specific method requires.
    async fn twirp<Req, Resp>(
        &self,
        method: &str,
        grants: VideoGrants,
        body: &Req,
    ) -> Result<Resp, RoomError>
    where
        Req: Serialize + Sync,
        Resp: for<'de> Deserialize<'de>,
    {
        let token = self.server_token(grants)?;
        let url = format!("{}/twirp/livekit.RoomService/{}", self.api_base(), method);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable response body>".to_string());
            return Err(RoomError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl RoomService for LiveKitRoomService {
    fn server_url(&self) -> &str {
        &self.url
    }

    async fn connect(
        &self,
        room_name: &str,
        options: ConnectOptions,
    ) -> Result<RoomHandle, RoomError> {
        let room: RoomInfo = self
            .twirp(
                "CreateRoom",
                VideoGrants {
                    room_create: true,
                    room_list: true,
                    ..VideoGrants::default()
                },
                &CreateRoomRequest { name: room_name },
            )
            .await?;
        info!(room = %room_name, sid = %room.sid, "connected to room");
        Ok(RoomHandle {
            name: if room.name.is_empty() {
                room_name.to_string()
            } else {
                room.name
            },
            sid: room.sid,
            agent_identity: AGENT_IDENTITY.to_string(),
            auto_subscribe: options.auto_subscribe,
        })
    }

    async fn wait_for_participant(&self, room: &RoomHandle) -> Result<ParticipantInfo, RoomError> {
        loop {
            let roster = self
                .twirp::<_, ListParticipantsResponse>(
                    "ListParticipants",
                    VideoGrants {
                        room_admin: true,
                        room: room.name.clone(),
                        ..VideoGrants::default()
                    },
                    &ListParticipantsRequest { room: &room.name },
                )
                .await;
            match roster {
                Ok(response) => {
                    if let Some(participant) = response
                        .participants
                        .into_iter()
                        .find(|p| p.identity != room.agent_identity)
                    {
                        return Ok(participant);
                    }
                    debug!(room = %room.name, "no remote participant yet");
                }
                // An idle room can be reaped between polls; that just means
                // nobody has joined yet.
                Err(RoomError::Api { status: 404, .. }) => {
                    debug!(room = %room.name, "room not present yet");
                }
                Err(other) => return Err(other),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn mint_join_token(&self, grant: &JoinGrant) -> Result<String, RoomError> {
        self.sign(
            &grant.identity,
            &grant.name,
            VideoGrants {
                room_join: true,
                room: grant.room.clone(),
                can_publish: true,
                can_subscribe: true,
                ..VideoGrants::default()
            },
            grant.ttl,
        )
    }
}
