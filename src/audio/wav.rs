//! Minimal RIFF/WAVE reader.

use super::types::{PcmLayout, PcmSpec, SampleFormat};
use crate::{Error, ErrorContext, Result};

const FORMAT_PCM: u16 = 0x0001;
const FORMAT_FLOAT: u16 = 0x0003;
const FORMAT_ALAW: u16 = 0x0006;
const FORMAT_MULAW: u16 = 0x0007;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

pub(crate) fn has_riff_header(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

fn decode_error(msg: impl Into<String>) -> Error {
    Error::audio_decode(msg, ErrorContext::new().with_source("wav"))
}

fn u16_at(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Locates the `fmt ` and `data` chunks.
///
/// A `data` length running past the end of the buffer (streamed WAVs write
/// a placeholder) is clamped to the bytes present, rounded down to whole frames.
pub(crate) fn parse(bytes: &[u8]) -> Result<PcmLayout> {
    if !has_riff_header(bytes) {
        return Err(decode_error("missing RIFF/WAVE header"));
    }

    let mut spec: Option<PcmSpec> = None;
    let mut data: Option<(usize, usize)> = None;
    let mut offset = 12;

    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = u32_at(bytes, offset + 4) as usize;
        let body = offset + 8;

        match id {
            b"fmt " => {
                if size < 16 || body + 16 > bytes.len() {
                    return Err(decode_error("fmt chunk is truncated"));
                }
                spec = Some(read_fmt(bytes, body)?);
            }
            b"data" => {
                let available = bytes.len() - body;
                data = Some((body, size.min(available)));
            }
            _ => {}
        }

        if spec.is_some() && data.is_some() {
            break;
        }
        // Chunks are padded to an even length.
        match body.checked_add(size + (size & 1)) {
            Some(next) => offset = next,
            None => break,
        }
    }

    let spec = spec.ok_or_else(|| decode_error("fmt chunk not found"))?;
    let (data_offset, data_len) = data.ok_or_else(|| decode_error("data chunk not found"))?;
    let block_align = spec.block_align();
    Ok(PcmLayout {
        spec,
        data_offset,
        data_len: data_len - data_len % block_align,
    })
}

fn read_fmt(bytes: &[u8], at: usize) -> Result<PcmSpec> {
    let tag = u16_at(bytes, at);
    let channels = u16_at(bytes, at + 2);
    let sample_rate = u32_at(bytes, at + 4);
    let bits_per_sample = u16_at(bytes, at + 14);

    let sample_format = match tag {
        FORMAT_PCM | FORMAT_EXTENSIBLE => SampleFormat::Pcm,
        FORMAT_FLOAT => SampleFormat::Float,
        FORMAT_ALAW => SampleFormat::ALaw,
        FORMAT_MULAW => SampleFormat::MuLaw,
        other => return Err(decode_error(format!("unsupported WAV format tag 0x{:04x}", other))),
    };
    if channels == 0 || sample_rate == 0 || bits_per_sample == 0 {
        return Err(decode_error(format!(
            "invalid fmt chunk: channels={}, sample_rate={}, bits_per_sample={}",
            channels, sample_rate, bits_per_sample
        )));
    }

    Ok(PcmSpec {
        sample_rate,
        channels,
        bits_per_sample,
        sample_format,
    })
}
