use crate::prelude::*;
use crate::utils::{check_range, required};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat};
use std::io::Cursor;

fn default_frame_count() -> u32 {
    5
}

/// Input for sampling frames from an animated GIF
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractFrameInput {
    /// HTTP(S) URL of the GIF
    pub input_url: String,

    /// Number of frames to return, spread evenly from first to last (1-100)
    #[serde(default = "default_frame_count")]
    pub frame_count: u32,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Extract evenly spaced frames from a GIF as PNG images
pub struct ExtractFrameTool {
    config: Arc<ProviderConfig>,
}

impl ExtractFrameTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

/// Indices of `count` frames spread evenly over `total`, always including the first and last.
pub fn frame_indices(total: usize, count: usize) -> Vec<usize> {
    if total == 0 || count == 0 {
        return Vec::new();
    }
    match count {
        1 => vec![0],
        2 => vec![0, total - 1],
        n if n >= total => (0..total).collect(),
        n => {
            let mut indices: Vec<usize> = (0..n).map(|i| i * (total - 1) / (n - 1)).collect();
            if let Some(last) = indices.last_mut() {
                *last = total - 1;
            }
            indices
        }
    }
}

fn extract_frames(data: &[u8], count: usize) -> Result<Vec<ToolResult>, ToolError> {
    if image::guess_format(data).ok() != Some(ImageFormat::Gif) {
        return Err(ToolError::validation("Only GIF input is supported"));
    }
    let decoder = GifDecoder::new(Cursor::new(data))
        .map_err(|e| ToolError::validation(format!("Failed to read GIF: {}", e)))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| ToolError::validation(format!("Failed to decode GIF frames: {}", e)))?;
    log::debug!("GIF has {} frames", frames.len());

    frame_indices(frames.len(), count)
        .into_iter()
        .enumerate()
        .map(|(i, index)| {
            let mut png = Vec::new();
            DynamicImage::ImageRgba8(frames[index].buffer().clone())
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .map_err(|e| ToolError::Custom(format!("Failed to encode frame {}: {}", index, e)))?;
            Ok(ToolResult::blob(
                png,
                "image/png",
                Some(format!("frame_{:03}.png", i)),
            ))
        })
        .collect()
}

impl Tool for ExtractFrameTool {
    type Input = ExtractFrameInput;

    fn name(&self) -> &str {
        "extract_frame"
    }

    fn description(&self) -> &str {
        "Download a GIF from a URL and return evenly spaced frames (first and last included) as PNG images."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let url = required(&input.input_url, "input_url")?;
        let count = check_range(input.frame_count, 1, 100, "frame_count")?;

        let client = self.config.client(&input.credentials).await?;
        let gif = client.fetch(url).await?;
        Ok(ToolResult::Many(extract_frames(&gif.data, count as usize)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awskit_core::test_utils::mock_config;
    use image::codecs::gif::GifEncoder;
    use image::{Frame, Rgba, RgbaImage};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// GIF whose frame `k` is filled with red level `k * 25`.
    fn test_gif(frames: u8) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut out);
            let frames = (0..frames)
                .map(|k| Frame::new(RgbaImage::from_pixel(4, 4, Rgba([k * 25, 0, 0, 255]))));
            encoder.encode_frames(frames).unwrap();
        }
        out
    }

    fn red_level(png: &[u8]) -> u8 {
        image::load_from_memory(png).unwrap().to_rgba8().get_pixel(0, 0)[0]
    }

    #[test]
    fn test_frame_indices() {
        assert_eq!(frame_indices(10, 1), vec![0]);
        assert_eq!(frame_indices(10, 2), vec![0, 9]);
        assert_eq!(frame_indices(3, 5), vec![0, 1, 2]);
        assert_eq!(frame_indices(10, 4), vec![0, 3, 6, 9]);
        assert_eq!(frame_indices(7, 3), vec![0, 3, 6]);
        assert_eq!(frame_indices(0, 3), Vec::<usize>::new());
    }

    #[test]
    fn test_extract_frames_picks_expected_frames() {
        let results = extract_frames(&test_gif(10), 4).unwrap();
        assert_eq!(results.len(), 4);

        let blobs: Vec<_> = results.iter().flat_map(ToolResult::blobs).collect();
        assert_eq!(blobs[0].filename.as_deref(), Some("frame_000.png"));
        assert_eq!(blobs[3].filename.as_deref(), Some("frame_003.png"));
        assert!(blobs.iter().all(|b| b.mime_type == "image/png"));

        for (blob, frame) in blobs.iter().zip([0u8, 3, 6, 9]) {
            let expected = frame * 25;
            assert!(red_level(&blob.data).abs_diff(expected) <= 10, "frame {}", frame);
        }
    }

    #[test]
    fn test_non_gif_rejected() {
        let err = extract_frames(b"\x89PNG\r\n\x1a\nnot really", 3).unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[tokio::test]
    async fn test_tool_downloads_gif() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/anim.gif"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/gif")
                    .set_body_bytes(test_gif(3)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tool = ExtractFrameTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(
                serde_json::from_value(json!({"input_url": format!("{}/anim.gif", server.uri())}))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(result.blobs().len(), 3);
    }

    #[tokio::test]
    async fn test_frame_count_range() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tool = ExtractFrameTool::new(mock_config(&server.uri()));
        let err = tool
            .execute(
                serde_json::from_value(json!({"input_url": format!("{}/a.gif", server.uri()), "frame_count": 0}))
                    .unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }
}
