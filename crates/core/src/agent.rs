//! Configuration for the realtime conversational agent.
//!
//! Every session uses the same immutable [`AgentConfig`], constructed once at
//! process startup and shared behind an `Arc`. The defaults mirror the
//! production deployment of the assistant.

/// Realtime model identifier used when `REALTIME_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini-realtime-preview";

/// Voice preset used for synthesized speech.
pub const DEFAULT_VOICE: &str = "sage";

/// Sampling temperature for the realtime model.
pub const DEFAULT_TEMPERATURE: f32 = 0.6;

/// Instructions used when no `system_prompt.md` is present in the prompts
/// directory. Intentionally generic; deployments ship their own prompt file.
pub const DEFAULT_INSTRUCTIONS: &str = "You are Govi, a real-time voice assistant \
for a public-sector innovation lab. Help callers understand the lab's services \
and capabilities. Keep answers short, conversational, and in the caller's language.";

/// The single turn issued to the model right after a session is attached.
///
/// This is the "instruction to begin" variant: rather than speaking a literal
/// greeting, the model is told to open the conversation according to its own
/// instructions.
pub const SEED_MESSAGE: &str = "Please begin the interaction with the user in a \
manner consistent with your instructions.";

/// Server-side voice-activity-detection thresholds.
///
/// Turn detection itself runs inside the model provider; these values only
/// parameterize it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnDetectionSettings {
    /// Activation threshold for speech detection (0.0–1.0).
    pub threshold: f32,
    /// Audio included before detected speech, in milliseconds.
    pub prefix_padding_ms: u32,
    /// Silence duration that ends a turn, in milliseconds.
    pub silence_duration_ms: u32,
    /// Whether the provider should respond automatically at end of turn.
    pub create_response: bool,
}

impl Default for TurnDetectionSettings {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            prefix_padding_ms: 200,
            silence_duration_ms: 500,
            create_response: true,
        }
    }
}

/// Immutable configuration bundle for one realtime model session.
///
/// Constructed once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// System instructions for the model.
    pub instructions: String,
    /// Voice preset name (e.g. "sage", "alloy").
    pub voice: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Realtime model identifier.
    pub model: String,
    /// Voice-activity-detection parameters.
    pub turn_detection: TurnDetectionSettings,
    /// The one conversation item created to start the interaction.
    pub seed_message: String,
}

impl AgentConfig {
    /// Creates a configuration with the given instructions and model, using
    /// the production defaults for everything else.
    pub fn new(instructions: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            voice: DEFAULT_VOICE.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            model: model.into(),
            turn_detection: TurnDetectionSettings::default(),
            seed_message: SEED_MESSAGE.to_string(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INSTRUCTIONS, DEFAULT_MODEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_values() {
        let config = AgentConfig::default();
        assert_eq!(config.voice, "sage");
        assert_eq!(config.model, "gpt-4o-mini-realtime-preview");
        assert_eq!(config.temperature, 0.6);
        assert_eq!(config.turn_detection.threshold, 0.6);
        assert_eq!(config.turn_detection.prefix_padding_ms, 200);
        assert_eq!(config.turn_detection.silence_duration_ms, 500);
        assert!(config.turn_detection.create_response);
        assert_eq!(config.seed_message, SEED_MESSAGE);
    }

    #[test]
    fn new_overrides_instructions_and_model() {
        let config = AgentConfig::new("answer in haiku", "gpt-4o-realtime-preview");
        assert_eq!(config.instructions, "answer in haiku");
        assert_eq!(config.model, "gpt-4o-realtime-preview");
        assert_eq!(config.voice, DEFAULT_VOICE);
    }
}
