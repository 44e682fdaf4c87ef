//! Runs the realtime-model agent for one session.
//!
//! Connects to the OpenAI Realtime API over WebSocket, configures the
//! session from the immutable [`AgentConfig`], seeds the conversation with
//! a single opening turn, and then follows server events until the session
//! ends or the worker is cancelled. Audio frames between the room and the
//! model travel over the platform's media plane, not through this process.

use super::{
    WorkerError,
    session::{Session, WorkerContext},
};
use anyhow::{Context, anyhow};
use async_openai::types::realtime::{
    self as oai_realtime, ClientEvent as OAIClientEvent, ServerEvent as OAIServerEvent,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use govi_core::agent::AgentConfig;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{client::IntoClientRequest, protocol::Message as WsMessage},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const REALTIME_ENDPOINT: &str = "wss://api.openai.com/v1/realtime";

type ModelSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

fn voice_preset(name: &str) -> oai_realtime::RealtimeVoice {
    match name.to_lowercase().as_str() {
        "alloy" => oai_realtime::RealtimeVoice::Alloy,
        "ash" => oai_realtime::RealtimeVoice::Ash,
        "ballad" => oai_realtime::RealtimeVoice::Ballad,
        "coral" => oai_realtime::RealtimeVoice::Coral,
        "echo" => oai_realtime::RealtimeVoice::Echo,
        "sage" => oai_realtime::RealtimeVoice::Sage,
        "shimmer" => oai_realtime::RealtimeVoice::Shimmer,
        "verse" => oai_realtime::RealtimeVoice::Verse,
        other => {
            warn!(voice = %other, "unknown voice preset; falling back to sage");
            oai_realtime::RealtimeVoice::Sage
        }
    }
}

/// Builds the realtime session parameters from the agent configuration.
fn session_resource(config: &AgentConfig) -> oai_realtime::SessionResource {
    oai_realtime::SessionResource {
        model: Some(config.model.clone()),
        modalities: Some(vec!["text".to_string(), "audio".to_string()]),
        instructions: Some(config.instructions.clone()),
        voice: Some(voice_preset(&config.voice)),
        temperature: Some(config.temperature),
        input_audio_format: Some(oai_realtime::AudioFormat::PCM16),
        output_audio_format: Some(oai_realtime::AudioFormat::PCM16),
        input_audio_transcription: Some(oai_realtime::AudioTranscription {
            model: Some("whisper-1".to_string()),
            ..Default::default()
        }),
        turn_detection: Some(oai_realtime::TurnDetection::ServerVAD {
            threshold: config.turn_detection.threshold,
            prefix_padding_ms: config.turn_detection.prefix_padding_ms,
            silence_duration_ms: config.turn_detection.silence_duration_ms,
            interrupt_response: Some(true),
            create_response: Some(config.turn_detection.create_response),
        }),
        ..Default::default()
    }
}

/// Attaches the realtime model to the session and drives it until the
/// connection ends or the worker is cancelled.
///
/// Exactly one seed turn is issued: a system item instructing the model to
/// open the conversation per its instructions, followed by a response
/// request.
pub async fn run_agent(
    ctx: &WorkerContext,
    session: &Session,
    cancel: CancellationToken,
) -> Result<(), WorkerError> {
    info!(
        room = %session.room.name,
        participant = %session.participant.identity,
        model = %ctx.agent_config.model,
        "starting realtime agent"
    );

    let url = format!("{}?model={}", REALTIME_ENDPOINT, ctx.agent_config.model);
    let api_key = ctx.openai_api_key.clone();
    let connection = async move {
        let mut request = url.into_client_request()?;
        request
            .headers_mut()
            .insert("Authorization", format!("Bearer {}", api_key).parse()?);
        request
            .headers_mut()
            .insert("OpenAI-Beta", "realtime=v1".parse()?);
        let (ws_stream, _) = connect_async(request)
            .await
            .context("failed to connect to the realtime API")?;
        anyhow::Ok(ws_stream)
    };

    let ws_stream = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!("cancellation acknowledged before agent construction");
            return Ok(());
        }
        result = connection => result.map_err(WorkerError::Agent)?,
    };
    let (mut model_tx, mut model_rx) = ws_stream.split();
    info!("connected to the realtime API");

    // A failure mid-setup leaves a half-configured session behind; close
    // the socket before surfacing the error.
    if let Err(err) = configure_and_seed(&mut model_tx, ctx, session).await {
        let _ = model_tx.send(WsMessage::Close(None)).await;
        return Err(WorkerError::Agent(err));
    }

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("cancellation acknowledged; closing realtime session");
                let _ = model_tx.send(WsMessage::Close(None)).await;
                return Ok(());
            }
            message = model_rx.next() => {
                match message {
                    Some(Ok(WsMessage::Text(text))) => {
                        if let Ok(event) = serde_json::from_str::<OAIServerEvent>(&text) {
                            if let Err(err) = observe_server_event(event) {
                                let _ = model_tx.send(WsMessage::Close(None)).await;
                                return Err(WorkerError::Agent(err));
                            }
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        return Err(WorkerError::Agent(anyhow!(
                            "realtime connection closed unexpectedly"
                        )));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        return Err(WorkerError::Agent(
                            anyhow::Error::from(err).context("realtime connection error"),
                        ));
                    }
                }
            }
        }
    }
}

/// Sends the session configuration and the single seed turn.
async fn configure_and_seed(
    model_tx: &mut ModelSink,
    ctx: &WorkerContext,
    session: &Session,
) -> anyhow::Result<()> {
    let update = OAIClientEvent::SessionUpdate(oai_realtime::SessionUpdateEvent {
        session: session_resource(&ctx.agent_config),
        event_id: None,
    });
    send_event(model_tx, &update).await?;

    let item = oai_realtime::Item {
        r#type: Some(oai_realtime::ItemType::Message),
        role: Some(oai_realtime::ItemRole::System),
        content: Some(vec![oai_realtime::ItemContent {
            r#type: oai_realtime::ItemContentType::InputText,
            text: Some(ctx.agent_config.seed_message.clone()),
            audio: None,
            transcript: None,
        }]),
        id: None,
        status: None,
        call_id: None,
        name: None,
        arguments: None,
        output: None,
    };
    send_event(
        model_tx,
        &OAIClientEvent::ConversationItemCreate(oai_realtime::ConversationItemCreateEvent {
            item,
            event_id: None,
            previous_item_id: None,
        }),
    )
    .await?;
    send_event(
        model_tx,
        &OAIClientEvent::ResponseCreate(oai_realtime::ResponseCreateEvent {
            response: None,
            event_id: None,
        }),
    )
    .await?;

    info!(
        participant = %session.participant.identity,
        "session configured and conversation seeded"
    );
    Ok(())
}

async fn send_event(model_tx: &mut ModelSink, event: &OAIClientEvent) -> anyhow::Result<()> {
    model_tx
        .send(WsMessage::Text(serde_json::to_string(event)?.into()))
        .await?;
    Ok(())
}

/// Logs the interesting server events; a server error ends the session.
fn observe_server_event(event: OAIServerEvent) -> anyhow::Result<()> {
    match event {
        OAIServerEvent::SessionCreated(_) => info!("realtime session created"),
        OAIServerEvent::SessionUpdated(_) => info!("realtime session configuration acknowledged"),
        OAIServerEvent::InputAudioBufferSpeechStarted(_) => debug!("caller started speaking"),
        OAIServerEvent::InputAudioBufferSpeechStopped(_) => debug!("caller stopped speaking"),
        OAIServerEvent::ConversationItemInputAudioTranscriptionCompleted(e) => {
            info!(transcript = %e.transcript, "caller turn transcribed");
        }
        OAIServerEvent::ResponseDone(_) => debug!("assistant turn complete"),
        OAIServerEvent::Error(e) => {
            return Err(anyhow!("realtime API error: {}", e.error.message));
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_resource_reflects_agent_config() {
        let config = AgentConfig::default();
        let resource = session_resource(&config);

        assert_eq!(resource.model.as_deref(), Some("gpt-4o-mini-realtime-preview"));
        assert_eq!(resource.instructions.as_deref(), Some(config.instructions.as_str()));
        assert_eq!(resource.temperature, Some(0.6));
        assert!(matches!(
            resource.voice,
            Some(oai_realtime::RealtimeVoice::Sage)
        ));
        match resource.turn_detection {
            Some(oai_realtime::TurnDetection::ServerVAD {
                threshold,
                prefix_padding_ms,
                silence_duration_ms,
                create_response,
                ..
            }) => {
                assert_eq!(threshold, 0.6);
                assert_eq!(prefix_padding_ms, 200);
                assert_eq!(silence_duration_ms, 500);
                assert_eq!(create_response, Some(true));
            }
            other => panic!("expected server VAD turn detection, got {:?}", other),
        }
    }

    #[test]
    fn unknown_voice_falls_back_to_sage() {
        assert!(matches!(
            voice_preset("baritone"),
            oai_realtime::RealtimeVoice::Sage
        ));
        assert!(matches!(
            voice_preset("Alloy"),
            oai_realtime::RealtimeVoice::Alloy
        ));
    }
}
