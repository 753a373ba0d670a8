use super::{invalid_response, invoke_endpoint};
use crate::prelude::*;
use crate::utils::{optional, required};
use awskit_core::service::COMPREHEND;
use awskit_core::AwsClient;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum TtsInferType {
    /// Built-in voice (needs `voice`)
    PresetVoice,
    /// Clone a voice from a sample (needs `mock_voice_audio` and `mock_voice_text`)
    CloneVoice,
    /// Clone a voice across languages (needs `mock_voice_audio`)
    #[serde(rename = "CloneVoice_CrossLingual")]
    CloneVoiceCrossLingual,
    /// Built-in voice steered by an instruction (needs `voice` and `voice_instruct_prompt`)
    InstructVoice,
}

/// Input for text-to-speech synthesis
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SageMakerTtsInput {
    /// Name of the TTS endpoint
    pub sagemaker_endpoint: String,

    /// Text to synthesize
    pub tts_text: String,

    pub tts_infer_type: TtsInferType,

    /// Preset voice role
    #[serde(default)]
    pub voice: Option<String>,

    /// S3 URI of the voice sample to clone
    #[serde(default)]
    pub mock_voice_audio: Option<String>,

    /// Transcript of the voice sample
    #[serde(default)]
    pub mock_voice_text: Option<String>,

    /// Style instruction for InstructVoice
    #[serde(default)]
    pub voice_instruct_prompt: Option<String>,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Synthesize speech with a SageMaker-hosted TTS model
pub struct SageMakerTtsTool {
    config: Arc<ProviderConfig>,
}

impl SageMakerTtsTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

/// Model language tag for a Comprehend language code.
pub(crate) fn language_tag(code: &str) -> &'static str {
    match code {
        "en" => "<|en|>",
        "ja" => "<|jp|>",
        "zh-TW" => "<|yue|>",
        "ko" => "<|ko|>",
        _ => "<|zh|>",
    }
}

fn need<'a>(value: &'a Option<String>, field: &str, mode: &str) -> Result<&'a str, ToolError> {
    optional(value)
        .ok_or_else(|| ToolError::validation(format!("{} is required for {}", field, mode)))
}

async fn detect_language(client: &AwsClient, text: &str) -> Result<String, ToolError> {
    let response = client
        .json_rpc(&COMPREHEND, "DetectDominantLanguage", &json!({ "Text": text }))
        .await?;
    Ok(response["Languages"][0]["LanguageCode"]
        .as_str()
        .unwrap_or_default()
        .to_string())
}

impl Tool for SageMakerTtsTool {
    type Input = SageMakerTtsInput;

    fn name(&self) -> &str {
        "sagemaker_tts"
    }

    fn description(&self) -> &str {
        "Synthesize speech with a SageMaker TTS endpoint using preset, cloned, cross-lingual or instructed voices. Returns a presigned URL to the audio."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let endpoint = required(&input.sagemaker_endpoint, "sagemaker_endpoint")?;
        let text = required(&input.tts_text, "tts_text")?;

        let mut payload = match input.tts_infer_type {
            TtsInferType::PresetVoice => json!({
                "tts_text": text,
                "role": need(&input.voice, "voice", "PresetVoice")?,
            }),
            TtsInferType::CloneVoice => json!({
                "tts_text": text,
                "prompt_text": need(&input.mock_voice_text, "mock_voice_text", "CloneVoice")?,
                "prompt_audio": need(&input.mock_voice_audio, "mock_voice_audio", "CloneVoice")?,
            }),
            TtsInferType::CloneVoiceCrossLingual => json!({
                "tts_text": text,
                "prompt_audio": need(&input.mock_voice_audio, "mock_voice_audio", "CloneVoice_CrossLingual")?,
            }),
            TtsInferType::InstructVoice => json!({
                "tts_text": text,
                "role": need(&input.voice, "voice", "InstructVoice")?,
                "instruct_text": need(&input.voice_instruct_prompt, "voice_instruct_prompt", "InstructVoice")?,
            }),
        };

        let client = self.config.client(&input.credentials).await?;
        if input.tts_infer_type == TtsInferType::CloneVoiceCrossLingual {
            let code = detect_language(&client, text).await?;
            payload["lang_tag"] = json!(language_tag(&code));
        }

        let response = invoke_endpoint(&client, endpoint, &payload).await?;
        match response.get("s3_presign_url") {
            Some(Value::String(url)) => Ok(ToolResult::text(url.clone())),
            _ => Err(invalid_response("response has no `s3_presign_url`")),
        }
    }
}
