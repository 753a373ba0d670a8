use crate::prelude::*;
use crate::s3::put_object;
use crate::utils::{check_range, optional, required, MAX_WAIT_TIMEOUT_SECS};
use awskit_core::service::TRANSCRIBE;
use awskit_core::{poll_until, AwsClient, PollStatus, UpstreamError};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Language codes Transcribe batch jobs accept.
pub const SUPPORTED_LANGUAGE_CODES: &[&str] = &[
    "af-ZA", "ar-AE", "ar-SA", "da-DK", "de-CH", "de-DE", "en-AB", "en-AU", "en-GB", "en-IE",
    "en-IN", "en-US", "en-WL", "es-ES", "es-US", "fa-IR", "fr-CA", "fr-FR", "he-IL", "hi-IN",
    "id-ID", "it-IT", "ja-JP", "ko-KR", "ms-MY", "nl-NL", "pt-BR", "pt-PT", "ru-RU", "ta-IN",
    "te-IN", "tr-TR", "zh-CN", "zh-TW", "th-TH", "en-ZA", "en-NZ", "vi-VN", "sv-SE", "ab-GE",
    "ast-ES", "az-AZ", "ba-RU", "be-BY", "bg-BG", "bn-IN", "bs-BA", "ca-ES", "ckb-IQ", "ckb-IR",
    "cs-CZ", "cy-WL", "el-GR", "et-ET", "eu-ES", "fi-FI", "gl-ES", "gu-IN", "ha-NG", "hr-HR",
    "hu-HU", "hy-AM", "is-IS", "ka-GE", "kab-DZ", "kk-KZ", "kn-IN", "ky-KG", "lg-IN", "lt-LT",
    "lv-LV", "mhr-RU", "mi-NZ", "mk-MK", "ml-IN", "mn-MN", "mr-IN", "mt-MT", "no-NO", "or-IN",
    "pa-IN", "pl-PL", "ps-AF", "ro-RO", "rw-RW", "si-LK", "sk-SK", "sl-SI", "so-SO", "sr-RS",
    "su-ID", "sw-BI", "sw-KE", "sw-RW", "sw-TZ", "sw-UG", "tl-PH", "tt-RU", "ug-CN", "uk-UA",
    "uz-UZ", "wo-SN", "zu-ZA",
];

/// Key prefix the audio is staged under.
const UPLOAD_PREFIX: &str = "transcribe-files";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Mp3,
    Mp4,
    Wav,
    Flac,
    Ogg,
    Amr,
    Webm,
    M4a,
}

impl MediaFormat {
    fn as_str(self) -> &'static str {
        match self {
            MediaFormat::Mp3 => "mp3",
            MediaFormat::Mp4 => "mp4",
            MediaFormat::Wav => "wav",
            MediaFormat::Flac => "flac",
            MediaFormat::Ogg => "ogg",
            MediaFormat::Amr => "amr",
            MediaFormat::Webm => "webm",
            MediaFormat::M4a => "m4a",
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_speakers() -> u32 {
    2
}

fn default_wait_timeout() -> u64 {
    3600
}

/// Input for transcribing an audio or video file
#[derive(Debug, Deserialize, JsonSchema)]
pub struct TranscribeAsrInput {
    /// HTTP(S) URL of the media file
    pub file_url: String,

    pub file_type: MediaFormat,

    /// Spoken language, e.g. `en-US`. Omit to let Transcribe identify it.
    #[serde(default)]
    pub language_code: Option<String>,

    /// Identify a single language (defaults to true when neither `language_code` nor
    /// `identify_multiple_languages` is given)
    #[serde(default)]
    pub identify_language: Option<bool>,

    #[serde(default)]
    pub identify_multiple_languages: bool,

    /// Candidate languages for identification, `|`-separated (e.g. `en-US|ja-JP`)
    #[serde(default)]
    pub language_options: Option<String>,

    /// Bucket the media is staged in
    pub s3_bucket_name: String,

    #[serde(rename = "ShowSpeakerLabels", default = "default_true")]
    pub show_speaker_labels: bool,

    /// Maximum number of speakers (2-30)
    #[serde(rename = "MaxSpeakerLabels", default = "default_max_speakers")]
    pub max_speaker_labels: u32,

    /// How long to wait for the transcription job (1-86400)
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_seconds: u64,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Transcribe speech in a media file with Amazon Transcribe
pub struct TranscribeAsrTool {
    config: Arc<ProviderConfig>,
}

impl TranscribeAsrTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

fn check_language(code: &str, field: &str) -> Result<(), ToolError> {
    if SUPPORTED_LANGUAGE_CODES.contains(&code) {
        Ok(())
    } else {
        Err(ToolError::validation(format!(
            "{} '{}' is not supported, should be one of {}",
            field,
            code,
            SUPPORTED_LANGUAGE_CODES.join(", ")
        )))
    }
}

/// File name for the staged object: the last path segment of the URL.
fn staged_file_name(file_url: &str, format: MediaFormat) -> Result<String, ToolError> {
    let url = url::Url::parse(file_url)
        .map_err(|e| ToolError::validation(format!("Invalid file_url '{}': {}", file_url, e)))?;
    let path = url.path().split("/file-preview").next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    let name = urlencoding::decode(segment)
        .map_err(|e| ToolError::validation(format!("Invalid file_url '{}': {}", file_url, e)))?;
    Ok(if name.is_empty() {
        format!("audio.{}", format.as_str())
    } else {
        name.into_owned()
    })
}

/// Flatten a Transcribe result document into text.
///
/// With speaker labels each speaker turn becomes a `[spk_N]: ...` line; punctuation is
/// attached to the preceding word. Returns `None` when the document has no transcript.
pub fn format_transcript(doc: &Value) -> Option<String> {
    let results = &doc["results"];

    if let Some(segments) = results["speaker_labels"]["segments"].as_array() {
        let speaker_at: HashMap<&str, &str> = segments
            .iter()
            .flat_map(|segment| {
                let speaker = segment["speaker_label"].as_str().unwrap_or_default();
                segment["items"]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(move |item| Some((item["start_time"].as_str()?, speaker)))
            })
            .collect();

        let mut lines: Vec<String> = Vec::new();
        let mut current: Option<&str> = None;
        for item in results["items"].as_array().into_iter().flatten() {
            let content = item["alternatives"][0]["content"].as_str().unwrap_or_default();
            if item["type"] == "punctuation" {
                if let Some(line) = lines.last_mut() {
                    line.push_str(content);
                }
                continue;
            }
            let speaker = item["start_time"]
                .as_str()
                .and_then(|t| speaker_at.get(t).copied());
            match lines.last_mut() {
                Some(line) if speaker == current => {
                    line.push(' ');
                    line.push_str(content);
                }
                _ => {
                    current = speaker;
                    lines.push(format!("[{}]: {}", speaker.unwrap_or("unknown"), content));
                }
            }
        }
        if !lines.is_empty() {
            return Some(lines.join("\n"));
        }
    }

    let transcripts: Vec<&str> = results["transcripts"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|t| t["transcript"].as_str())
        .collect();
    if transcripts.is_empty() {
        None
    } else {
        Some(transcripts.join(" "))
    }
}

async fn check_job(client: &AwsClient, job_name: &str) -> Result<PollStatus<String>, ToolError> {
    let response = client
        .json_rpc(
            &TRANSCRIBE,
            "GetTranscriptionJob",
            &json!({ "TranscriptionJobName": job_name }),
        )
        .await?;
    let job = &response["TranscriptionJob"];
    match job["TranscriptionJobStatus"].as_str().unwrap_or_default() {
        "COMPLETED" => job["Transcript"]["TranscriptFileUri"]
            .as_str()
            .map(|uri| PollStatus::Done(uri.to_string()))
            .ok_or_else(|| ToolError::from("Completed job has no TranscriptFileUri")),
        "FAILED" => Err(UpstreamError::new(
            TRANSCRIBE.name,
            "GetTranscriptionJob",
            None,
            "TranscriptionJobFailed",
            job["FailureReason"]
                .as_str()
                .unwrap_or("Transcription job failed"),
        )
        .into()),
        other => Ok(PollStatus::Pending(other.to_string())),
    }
}

impl Tool for TranscribeAsrTool {
    type Input = TranscribeAsrInput;

    fn name(&self) -> &str {
        "transcribe_asr"
    }

    fn description(&self) -> &str {
        "Transcribe an audio or video file from a URL with Amazon Transcribe. The file is staged in S3 and the transcript is returned as text, with speaker labels when enabled."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let file_url = required(&input.file_url, "file_url")?;
        let bucket = required(&input.s3_bucket_name, "s3_bucket_name")?;

        let language_code = optional(&input.language_code);
        if let Some(code) = language_code {
            check_language(code, "language_code")?;
        }
        let language_options: Vec<&str> = optional(&input.language_options)
            .map(|s| s.split('|').map(str::trim).filter(|l| !l.is_empty()).collect())
            .unwrap_or_default();
        for option in &language_options {
            check_language(option, "language_options entry")?;
        }

        let identify_language = input
            .identify_language
            .unwrap_or(language_code.is_none() && !input.identify_multiple_languages);
        let chosen = [
            language_code.is_some(),
            identify_language,
            input.identify_multiple_languages,
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if chosen != 1 {
            return Err(ToolError::validation(format!(
                "Exactly one of language_code, identify_language or identify_multiple_languages \
                 must be set (language_code: {:?}, identify_language: {}, identify_multiple_languages: {})",
                language_code, identify_language, input.identify_multiple_languages
            )));
        }
        if input.show_speaker_labels {
            check_range(input.max_speaker_labels, 2, 30, "MaxSpeakerLabels")?;
        }
        check_range(input.wait_timeout_seconds, 1, MAX_WAIT_TIMEOUT_SECS, "wait_timeout_seconds")?;
        let file_name = staged_file_name(file_url, input.file_type)?;

        let client = self.config.client(&input.credentials).await?;

        let media = client.fetch(file_url).await?;
        let key = format!("{}/{}", UPLOAD_PREFIX, file_name);
        let content_type = media
            .content_type
            .unwrap_or_else(|| "application/octet-stream".to_string());
        put_object(&client, bucket, &key, &content_type, media.data).await?;
        log::debug!("Staged {} at s3://{}/{}", file_url, bucket, key);

        let job_name = format!("{}-{}", Utc::now().timestamp(), uuid::Uuid::new_v4());
        let mut request = json!({
            "TranscriptionJobName": job_name,
            "Media": { "MediaFileUri": format!("s3://{}/{}", bucket, key) },
            "MediaFormat": input.file_type.as_str(),
        });
        if let Some(code) = language_code {
            request["LanguageCode"] = json!(code);
        }
        if identify_language {
            request["IdentifyLanguage"] = json!(true);
        }
        if input.identify_multiple_languages {
            request["IdentifyMultipleLanguages"] = json!(true);
        }
        if !language_options.is_empty() {
            request["LanguageOptions"] = json!(language_options);
        }
        if input.show_speaker_labels {
            request["Settings"] = json!({
                "ShowSpeakerLabels": true,
                "MaxSpeakerLabels": input.max_speaker_labels,
            });
        }
        client
            .json_rpc(&TRANSCRIBE, "StartTranscriptionJob", &request)
            .await?;

        let transcript_uri = poll_until(
            &format!("Transcription job {}", job_name),
            self.config.poll_interval,
            Duration::from_secs(input.wait_timeout_seconds),
            || check_job(&client, &job_name),
        )
        .await?;

        let transcript = client.fetch(&transcript_uri).await?;
        let doc: Value = serde_json::from_slice(&transcript.data)?;
        format_transcript(&doc)
            .map(ToolResult::text)
            .ok_or_else(|| ToolError::from("No transcripts found in the response"))
    }
}
