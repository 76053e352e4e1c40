//! Client for the narrative persona collaborator.
//!
//! The collaborator is any OpenAI-compatible chat-completions API. Whatever
//! goes wrong on that side, callers get a usable [`Persona`]: see
//! [`resolve_persona`].

use std::fmt::Write;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::PersonaConfig;
use crate::models::{FeatureSummary, Persona, TopTrack};

pub const FALLBACK_PERSONA: &str = "Music Minimalist";
pub const FALLBACK_DESCRIPTION: &str = "Your taste defies simple categorization.";
pub const FALLBACK_COLOR: &str = "#1DB954";

impl Persona {
    pub fn fallback() -> Self {
        Self {
            persona: FALLBACK_PERSONA.to_string(),
            description: FALLBACK_DESCRIPTION.to_string(),
            hex_color: FALLBACK_COLOR.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("persona endpoint is not configured")]
    NotConfigured,

    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("collaborator returned status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("response is missing `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub fn build_prompt(tracks: &[TopTrack], stats: &FeatureSummary) -> String {
    let listed: Vec<String> = tracks
        .iter()
        .map(|t| match &t.artist {
            Some(artist) => format!("{} by {}", t.name, artist),
            None => t.name.clone(),
        })
        .collect();

    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are a music psychologist. Describe this listener's current sonic persona."
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Top tracks: {}", listed.join(", "));
    let _ = writeln!(prompt, "Audio stats (0-1 scale unless noted):");
    let _ = writeln!(prompt, "- Energy: {:.2}", stats.energy);
    let _ = writeln!(prompt, "- Valence: {:.2}", stats.valence);
    let _ = writeln!(prompt, "- Danceability: {:.2}", stats.danceability);
    let _ = writeln!(prompt, "- Acousticness: {:.2}", stats.acousticness);
    let _ = writeln!(prompt, "- Instrumentalness: {:.2}", stats.instrumentalness);
    let _ = writeln!(prompt, "- Tempo: {:.0} BPM", stats.tempo);
    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "Reply with JSON only: {{\"persona\": \"short title\", \"description\": \"two sentences\", \"hexColor\": \"#RRGGBB\"}}"
    );
    prompt
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

pub fn parse_persona(text: &str) -> Result<Persona, PersonaError> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let value: serde_json::Value = serde_json::from_str(cleaned.trim())
        .map_err(|e| PersonaError::Malformed(e.to_string()))?;

    let field = |key: &'static str| -> Result<String, PersonaError> {
        value
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(PersonaError::MissingField(key))
    };

    let persona = field("persona")?;
    let description = field("description")?;
    let hex_color = field("hexColor")?;
    if !is_hex_color(&hex_color) {
        return Err(PersonaError::Malformed(format!("bad hexColor {hex_color:?}")));
    }

    Ok(Persona {
        persona,
        description,
        hex_color,
    })
}

pub struct PersonaClient {
    client: Client,
    config: PersonaConfig,
}

impl PersonaClient {
    pub fn new(config: PersonaConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub async fn generate(
        &self,
        tracks: &[TopTrack],
        stats: &FeatureSummary,
    ) -> Result<Persona, PersonaError> {
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .ok_or(PersonaError::NotConfigured)?;
        let url = format!("{endpoint}/chat/completions");

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(tracks, stats),
            }],
            temperature: 0.7,
        };

        debug!(model = %self.config.model, tracks = tracks.len(), "requesting persona");

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PersonaError::Timeout
                } else {
                    PersonaError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PersonaError::Status(status.as_u16()));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| PersonaError::Malformed(e.to_string()))?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PersonaError::Malformed("no choices in response".to_string()))?;

        parse_persona(&choice.message.content)
    }
}

pub async fn resolve_persona(
    client: &PersonaClient,
    tracks: &[TopTrack],
    stats: &FeatureSummary,
) -> Persona {
    match client.generate(tracks, stats).await {
        Ok(persona) => persona,
        Err(PersonaError::NotConfigured) => {
            debug!("persona endpoint not configured, using fallback");
            Persona::fallback()
        }
        Err(e) => {
            warn!(error = %e, "persona generation failed, using fallback");
            Persona::fallback()
        }
    }
}
