//! Amazon Transcribe speech-to-text.
//!
//! `transcribe_asr` stages the audio in S3, runs a transcription job to completion and
//! returns the transcript, with speaker turns when diarization is on.

mod asr;

pub use asr::{
    format_transcript, MediaFormat, TranscribeAsrInput, TranscribeAsrTool, SUPPORTED_LANGUAGE_CODES,
};

use awskit_core::{box_tool, DynTool, ProviderConfig};
use std::sync::Arc;

/// Returns all Transcribe tools
pub fn all_tools(config: Arc<ProviderConfig>) -> Vec<Box<dyn DynTool>> {
    vec![box_tool(TranscribeAsrTool::new(config))]
}
