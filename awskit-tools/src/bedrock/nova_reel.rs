use crate::prelude::*;
use crate::s3::{get_object, S3Uri};
use crate::utils::{check_range, optional, required, MAX_WAIT_TIMEOUT_SECS};
use awskit_core::service::BEDROCK_RUNTIME;
use awskit_core::{poll_until, AwsClient, PollStatus, UpstreamError};
use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use reqwest::Method;
use serde_json::{json, Value};
use std::io::Cursor;
use std::time::Duration;

pub const NOVA_REEL_MODEL_ID: &str = "amazon.nova-reel-v1:0";

const FRAME_WIDTH: u32 = 1280;
const FRAME_HEIGHT: u32 = 720;
const MAX_SEED: u32 = 2_147_483_646;
const FPS: u32 = 24;
const DURATION_SECONDS: u32 = 6;
const DIMENSION: &str = "1280x720";

fn default_dimension() -> String {
    DIMENSION.to_string()
}

fn default_fps() -> u32 {
    FPS
}

fn default_duration() -> u32 {
    DURATION_SECONDS
}

fn default_true() -> bool {
    true
}

fn default_wait_timeout() -> u64 {
    1800
}

/// Input for generating a video with Nova Reel
#[derive(Debug, Deserialize, JsonSchema)]
pub struct NovaReelInput {
    /// Description of the video
    pub prompt: String,

    /// Output prefix, `s3://bucket/path/`
    pub video_output_s3uri: String,

    /// First frame image (PNG or JPEG), `s3://bucket/key`
    #[serde(default)]
    pub image_input_s3uri: Option<String>,

    /// Width x height; the model only renders 1280x720
    #[serde(default = "default_dimension")]
    pub dimension: String,

    #[serde(default)]
    pub seed: u32,

    /// Frames per second; the model only renders 24
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Length in seconds; the model only renders 6
    #[serde(default = "default_duration")]
    pub duration: u32,

    /// Return right after starting the job instead of waiting for the video
    #[serde(default = "default_true", rename = "async")]
    pub async_mode: bool,

    /// How long synchronous mode waits for the job (1-86400)
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_seconds: u64,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Generate a video from text (and optionally a first frame) with Amazon Nova Reel
pub struct NovaReelTool {
    config: Arc<ProviderConfig>,
}

impl NovaReelTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

/// Normalise a PNG or JPEG into the 1280x720 RGB PNG the model expects, base64 encoded.
pub(crate) fn prepare_image(data: &[u8]) -> Result<String, ToolError> {
    let format = image::guess_format(data)
        .ok()
        .filter(|f| matches!(f, ImageFormat::Png | ImageFormat::Jpeg))
        .ok_or_else(|| ToolError::validation("Input image must be a PNG or JPEG file"))?;
    let img = image::load_from_memory_with_format(data, format)
        .map_err(|e| ToolError::validation(format!("Failed to decode input image: {}", e)))?;

    if img.color().has_alpha() && img.to_rgba8().pixels().any(|p| p[3] < 255) {
        return Err(ToolError::validation(
            "PNG image contains transparent or translucent pixels, which is not supported. \
             Please provide an image without transparency.",
        ));
    }

    let mut rgb = img.to_rgb8();
    if rgb.dimensions() != (FRAME_WIDTH, FRAME_HEIGHT) {
        log::warn!(
            "Input image is {}x{}; resizing to {}x{}",
            rgb.width(),
            rgb.height(),
            FRAME_WIDTH,
            FRAME_HEIGHT
        );
        rgb = image::imageops::resize(&rgb, FRAME_WIDTH, FRAME_HEIGHT, FilterType::Lanczos3);
    }

    let mut png = Vec::new();
    DynamicImage::ImageRgb8(rgb)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| ToolError::Custom(format!("Failed to encode image: {}", e)))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(png))
}

async fn get_async_invoke(client: &AwsClient, arn: &str) -> Result<Value, ToolError> {
    let url = client.url(&BEDROCK_RUNTIME, &["async-invoke", arn], &[])?;
    client
        .rest_json(&BEDROCK_RUNTIME, "GetAsyncInvoke", Method::GET, url, None)
        .await
}

async fn check_job(client: &AwsClient, arn: &str) -> Result<PollStatus<Value>, ToolError> {
    let job = get_async_invoke(client, arn).await?;
    match job["status"].as_str().unwrap_or_default() {
        "Completed" => Ok(PollStatus::Done(job)),
        "Failed" => Err(UpstreamError::new(
            BEDROCK_RUNTIME.name,
            "GetAsyncInvoke",
            None,
            "VideoGenerationFailed",
            job["failureMessage"].as_str().unwrap_or("Unknown error"),
        )
        .into()),
        other => Ok(PollStatus::Pending(other.to_string())),
    }
}

fn output_uri(job: &Value) -> String {
    job["outputDataConfig"]["s3OutputDataConfig"]["s3Uri"]
        .as_str()
        .unwrap_or_default()
        .trim_end_matches('/')
        .to_string()
}

impl Tool for NovaReelTool {
    type Input = NovaReelInput;

    fn name(&self) -> &str {
        "nova_reel"
    }

    fn description(&self) -> &str {
        "Generate a short video from a text prompt (and optional first-frame image) with Amazon Nova Reel, writing it to S3."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let prompt = required(&input.prompt, "prompt")?;
        let output = required(&input.video_output_s3uri, "video_output_s3uri")?;
        if !output.starts_with("s3://") {
            return Err(ToolError::validation(
                "Invalid S3 URI format. video_output_s3uri must start with 's3://'",
            ));
        }
        let output = if output.ends_with('/') {
            output.to_string()
        } else {
            format!("{}/", output)
        };
        check_range(input.seed, 0, MAX_SEED, "seed")?;
        if input.fps != FPS {
            return Err(ToolError::validation(format!("fps must be {}, got {}", FPS, input.fps)));
        }
        if input.duration != DURATION_SECONDS {
            return Err(ToolError::validation(format!(
                "duration must be {}, got {}",
                DURATION_SECONDS, input.duration
            )));
        }
        if input.dimension.trim() != DIMENSION {
            return Err(ToolError::validation(format!(
                "dimension must be {}, got {}",
                DIMENSION, input.dimension
            )));
        }
        check_range(input.wait_timeout_seconds, 1, MAX_WAIT_TIMEOUT_SECS, "wait_timeout_seconds")?;
        let image_uri = optional(&input.image_input_s3uri)
            .map(S3Uri::parse_object)
            .transpose()?;

        let client = self.config.client(&input.credentials).await?;

        let mut model_input = json!({
            "taskType": "TEXT_VIDEO",
            "textToVideoParams": { "text": prompt },
            "videoGenerationConfig": {
                "durationSeconds": input.duration,
                "fps": input.fps,
                "dimension": DIMENSION,
                "seed": input.seed,
            },
        });
        if let Some(uri) = image_uri {
            let object = get_object(&client, &uri.bucket, &uri.key).await?;
            model_input["textToVideoParams"]["images"] = json!([{
                "format": "png",
                "source": { "bytes": prepare_image(&object.body)? },
            }]);
        }

        let body = json!({
            "modelId": NOVA_REEL_MODEL_ID,
            "modelInput": model_input,
            "outputDataConfig": { "s3OutputDataConfig": { "s3Uri": output } },
        });
        let url = client.url(&BEDROCK_RUNTIME, &["async-invoke"], &[])?;
        let started = client
            .rest_json(&BEDROCK_RUNTIME, "StartAsyncInvoke", Method::POST, url, Some(&body))
            .await?;
        let arn = started["invocationArn"]
            .as_str()
            .ok_or_else(|| ToolError::from("StartAsyncInvoke returned no invocationArn"))?
            .to_string();
        log::debug!("Nova Reel job started: {}", arn);

        if input.async_mode {
            let job = get_async_invoke(&client, &arn).await?;
            return Ok(ToolResult::text(format!(
                "Video generation started.\nInvocation ARN: {}\nVideo will be available at: {}/output.mp4",
                arn,
                output_uri(&job)
            )));
        }

        let job = poll_until(
            "Nova Reel job",
            self.config.poll_interval,
            Duration::from_secs(input.wait_timeout_seconds),
            || check_job(&client, &arn),
        )
        .await?;

        let video_uri: S3Uri = format!("{}/output.mp4", output_uri(&job)).parse()?;
        let video = get_object(&client, &video_uri.bucket, &video_uri.key).await?;
        Ok(ToolResult::Many(vec![
            ToolResult::text(format!("Video is available at: {}", video_uri)),
            ToolResult::blob(video.body, "video/mp4", Some("output.mp4".to_string())),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awskit_core::test_utils::mock_config;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use wiremock::matchers::{body_partial_json, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
        out
    }

    #[test]
    fn test_prepare_image_resizes_to_frame() {
        let data = png_bytes(DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([10, 20, 30]))));
        let encoded = prepare_image(&data).unwrap();
        let decoded = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        let img = image::load_from_memory(&decoded).unwrap();
        assert_eq!((img.width(), img.height()), (1280, 720));
        assert!(!img.color().has_alpha());
    }

    #[test]
    fn test_prepare_image_rejects_transparency_and_other_formats() {
        let translucent =
            png_bytes(DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 128]))));
        let err = prepare_image(&translucent).unwrap_err();
        assert!(err.to_string().contains("transparent"));

        let opaque =
            png_bytes(DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]))));
        assert!(prepare_image(&opaque).is_ok());

        assert!(prepare_image(b"GIF89a....").is_err());
    }

    #[tokio::test]
    async fn test_async_mode_returns_arn_and_video_location() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/async-invoke"))
            .and(body_partial_json(json!({
                "modelId": "amazon.nova-reel-v1:0",
                "modelInput": {
                    "taskType": "TEXT_VIDEO",
                    "videoGenerationConfig": {"durationSeconds": 6, "fps": 24, "seed": 7}
                },
                "outputDataConfig": {"s3OutputDataConfig": {"s3Uri": "s3://videos/out/"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "invocationArn": "arn:aws:bedrock:us-east-1:123:async-invoke/abc"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/async-invoke/.+"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "InProgress",
                "outputDataConfig": {"s3OutputDataConfig": {"s3Uri": "s3://videos/out/abc"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tool = NovaReelTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(
                serde_json::from_value(json!({
                    "prompt": "a cat surfing",
                    "video_output_s3uri": "s3://videos/out",
                    "seed": 7
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            result.as_text(),
            "Video generation started.\nInvocation ARN: arn:aws:bedrock:us-east-1:123:async-invoke/abc\n\
             Video will be available at: s3://videos/out/abc/output.mp4"
        );
    }

    #[tokio::test]
    async fn test_sync_mode_downloads_video() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/async-invoke"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "invocationArn": "arn:aws:bedrock:us-east-1:123:async-invoke/abc"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/async-invoke/.+"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "Completed",
                "outputDataConfig": {"s3OutputDataConfig": {"s3Uri": "s3://videos/out/abc"}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/videos/out/abc/output.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4data".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let tool = NovaReelTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(
                serde_json::from_value(json!({
                    "prompt": "a cat surfing",
                    "video_output_s3uri": "s3://videos/out/",
                    "async": false
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        let blobs = result.blobs();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].mime_type, "video/mp4");
        assert_eq!(blobs[0].data, b"mp4data");
    }

    #[tokio::test]
    async fn test_failed_job_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/async-invoke"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "invocationArn": "arn:x"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/async-invoke/.+"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "Failed",
                "failureMessage": "content filtered"
            })))
            .mount(&server)
            .await;

        let tool = NovaReelTool::new(mock_config(&server.uri()));
        let err = tool
            .execute(
                serde_json::from_value(json!({
                    "prompt": "p", "video_output_s3uri": "s3://v/o", "async": false
                }))
                .unwrap(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.upstream().unwrap().message, "content filtered");
    }

    #[tokio::test]
    async fn test_output_uri_must_be_s3() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tool = NovaReelTool::new(mock_config(&server.uri()));
        let err = tool
            .execute(
                serde_json::from_value(json!({
                    "prompt": "p", "video_output_s3uri": "https://bucket/out"
                }))
                .unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unsupported_generation_settings_make_no_calls() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tool = NovaReelTool::new(mock_config(&server.uri()));
        for (extra, field) in [
            (json!({"fps": 30}), "fps"),
            (json!({"duration": 12}), "duration"),
            (json!({"dimension": "1920x1080"}), "dimension"),
            (json!({"wait_timeout_seconds": u64::MAX}), "wait_timeout_seconds"),
            (json!({"wait_timeout_seconds": 0}), "wait_timeout_seconds"),
        ] {
            let mut params = json!({"prompt": "p", "video_output_s3uri": "s3://v/o", "async": false});
            params.as_object_mut().unwrap().extend(extra.as_object().unwrap().clone());
            let err = tool
                .execute(serde_json::from_value(params).unwrap())
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::Validation(_)), "{}: {:?}", field, err);
            assert!(err.to_string().contains(field), "{}", err);
        }
    }
}
