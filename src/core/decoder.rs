// src/core/decoder.rs
//
// Input adapters: container files via Symphonia, and raw interleaved PCM
// buffers with caller-supplied layout. Both resolve to per-channel 16-bit
// samples, the sample rate, and a content hash of the source bytes.

use log::{debug, warn};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Default extensions picked up when scanning directories
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac", "mp3", "ogg", "m4a", "aac"];

/// Decoded audio ready for fingerprinting
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// One sample vector per channel
    pub channels: Vec<Vec<i16>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Upper-case hex MD5 of the source bytes
    pub content_hash: String,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.channels.first().map_or(0, Vec::len) as f64 / self.sample_rate as f64
    }
}

/// Layout of a raw PCM buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPcmFormat {
    pub sample_rate: u32,
    /// Bytes per sample: 1 (unsigned), 2, 3 or 4 (signed little-endian)
    pub sample_width: u8,
    pub channels: u16,
}

/// Where recognition or registration audio comes from
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// A container file decoded with Symphonia
    File {
        path: PathBuf,
        limit_seconds: Option<f64>,
    },
    /// Interleaved little-endian PCM
    Buffer {
        bytes: Vec<u8>,
        format: RawPcmFormat,
        limit_seconds: Option<f64>,
    },
}

impl AudioSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        AudioSource::File {
            path: path.into(),
            limit_seconds: None,
        }
    }

    pub fn buffer(bytes: Vec<u8>, format: RawPcmFormat) -> Self {
        AudioSource::Buffer {
            bytes,
            format,
            limit_seconds: None,
        }
    }

    /// Only use the first `seconds` of audio
    pub fn with_limit(mut self, seconds: Option<f64>) -> Self {
        match &mut self {
            AudioSource::File { limit_seconds, .. } | AudioSource::Buffer { limit_seconds, .. } => {
                *limit_seconds = seconds;
            }
        }
        self
    }

    /// Display name used when registering without an explicit one
    pub fn default_name(&self) -> String {
        match self {
            AudioSource::File { path, .. } => audio_name_from_path(path),
            AudioSource::Buffer { bytes, .. } => format!("buffer-{}", &content_hash(bytes)[..8]),
        }
    }

    pub fn decode(&self) -> Result<DecodedAudio> {
        match self {
            AudioSource::File { path, limit_seconds } => decode_file(path, *limit_seconds),
            AudioSource::Buffer {
                bytes,
                format,
                limit_seconds,
            } => decode_buffer(bytes, *format, *limit_seconds),
        }
    }
}

/// Upper-case hex MD5 of a byte slice
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:X}", md5::compute(bytes))
}

/// File stem without directories or extension
pub fn audio_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Audio files under `path` (or `path` itself) whose extension is in `extensions`
pub fn find_audio_files(path: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect();
    let matches = |p: &Path| {
        p.extension()
            .and_then(|e| e.to_str())
            .map(|e| wanted.contains(&e.to_lowercase()))
            .unwrap_or(false)
    };

    if path.is_file() {
        return if matches(path) { vec![path.to_path_buf()] } else { Vec::new() };
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && matches(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Decode a container file into 16-bit channels
pub fn decode_file(path: &Path, limit_seconds: Option<f64>) -> Result<DecodedAudio> {
    let bytes = fs::read(path)?;
    let content_hash = content_hash(&bytes);

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let (channels, sample_rate) = decode_container(bytes, &hint, limit_seconds)?;
    debug!(
        "Decoded {}: {} channel(s) x {} samples @ {} Hz",
        path.display(),
        channels.len(),
        channels.first().map_or(0, Vec::len),
        sample_rate
    );

    Ok(DecodedAudio {
        channels,
        sample_rate,
        content_hash,
    })
}

fn decode_container(
    bytes: Vec<u8>,
    hint: &Hint,
    limit_seconds: Option<f64>,
) -> Result<(Vec<Vec<i16>>, u32)> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let mut probed = symphonia::default::get_probe().format(
        hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::DecodeUpstream("no supported audio track".to_string()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::DecodeUpstream("stream does not specify a sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())?;

    let max_frames = limit_seconds.map(|s| (s.max(0.0) * sample_rate as f64) as usize);
    let mut channels: Vec<Vec<i16>> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<i16>> = None;

    loop {
        if let Some(max) = max_frames {
            if channels.first().map_or(0, Vec::len) >= max {
                break;
            }
        }

        let packet = match probed.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(buf) => buf,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let num_channels = spec.channels.count();
        if num_channels == 0 {
            return Err(Error::DecodeUpstream("stream reports 0 channels".to_string()));
        }
        if channels.is_empty() {
            channels = vec![Vec::new(); num_channels];
        }

        let needed = decoded.capacity() * num_channels;
        if sample_buf.as_ref().map_or(true, |b| b.capacity() < needed) {
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }
        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            for frame in buf.samples().chunks_exact(num_channels) {
                for (channel, &sample) in channels.iter_mut().zip(frame) {
                    channel.push(sample);
                }
            }
        }
    }

    if let Some(max) = max_frames {
        for channel in &mut channels {
            channel.truncate(max);
        }
    }

    Ok((channels, sample_rate))
}

/// Split an interleaved little-endian PCM buffer into 16-bit channels.
///
/// A trailing partial frame is dropped.
pub fn decode_buffer(
    bytes: &[u8],
    format: RawPcmFormat,
    limit_seconds: Option<f64>,
) -> Result<DecodedAudio> {
    if format.sample_rate == 0 {
        return Err(Error::DecodeUpstream("sample rate must be non-zero".to_string()));
    }
    if format.channels == 0 {
        return Err(Error::DecodeUpstream("channel count must be non-zero".to_string()));
    }
    let width = format.sample_width as usize;
    if !(1..=4).contains(&width) {
        return Err(Error::DecodeUpstream(format!(
            "unsupported sample width: {} bytes",
            format.sample_width
        )));
    }

    let num_channels = format.channels as usize;
    let frame_bytes = width * num_channels;
    let mut num_frames = bytes.len() / frame_bytes;
    if bytes.len() % frame_bytes != 0 {
        debug!("Dropping {} trailing bytes", bytes.len() % frame_bytes);
    }
    if let Some(limit) = limit_seconds {
        num_frames = num_frames.min((limit.max(0.0) * format.sample_rate as f64) as usize);
    }

    let mut channels = vec![Vec::with_capacity(num_frames); num_channels];
    for frame in bytes[..num_frames * frame_bytes].chunks_exact(frame_bytes) {
        for (channel, sample) in channels.iter_mut().zip(frame.chunks_exact(width)) {
            channel.push(sample_to_i16(sample));
        }
    }

    Ok(DecodedAudio {
        channels,
        sample_rate: format.sample_rate,
        content_hash: content_hash(bytes),
    })
}

/// One little-endian sample of 1-4 bytes scaled to 16 bits
fn sample_to_i16(sample: &[u8]) -> i16 {
    match *sample {
        [b0] => ((b0 as i16) - 128) << 8,
        [b0, b1] => i16::from_le_bytes([b0, b1]),
        [_, b1, b2] => i16::from_le_bytes([b1, b2]),
        [_, _, b2, b3] => i16::from_le_bytes([b2, b3]),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(sample_rate: u32, sample_width: u8, channels: u16) -> RawPcmFormat {
        RawPcmFormat {
            sample_rate,
            sample_width,
            channels,
        }
    }

    #[test]
    fn test_deinterleave_16bit() {
        let samples: [i16; 6] = [1, -1, 2, -2, 3, -3];
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let audio = decode_buffer(&bytes, fmt(8000, 2, 2), None).unwrap();
        assert_eq!(audio.channels, vec![vec![1, 2, 3], vec![-1, -2, -3]]);
        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.content_hash, content_hash(&bytes));
    }

    #[test]
    fn test_sample_widths() {
        assert_eq!(sample_to_i16(&[128]), 0);
        assert_eq!(sample_to_i16(&[0]), i16::MIN);
        assert_eq!(sample_to_i16(&[255]), 127 << 8);
        assert_eq!(sample_to_i16(&[0x34, 0x12]), 0x1234);
        assert_eq!(sample_to_i16(&[0xFF, 0x34, 0x12]), 0x1234);
        assert_eq!(sample_to_i16(&[0, 0xFF, 0x00, 0x80]), i16::MIN);
    }

    #[test]
    fn test_partial_frame_dropped() {
        let bytes = vec![0u8; 9];
        let audio = decode_buffer(&bytes, fmt(8000, 2, 2), None).unwrap();
        assert_eq!(audio.channels[0].len(), 2);
        assert_eq!(audio.channels[1].len(), 2);
    }

    #[test]
    fn test_limit_seconds() {
        let bytes = vec![0u8; 2 * 1000];
        let audio = decode_buffer(&bytes, fmt(100, 2, 1), Some(2.5)).unwrap();
        assert_eq!(audio.channels[0].len(), 250);
        assert!((audio.duration_secs() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_layout() {
        assert!(matches!(decode_buffer(&[0; 4], fmt(0, 2, 1), None), Err(Error::DecodeUpstream(_))));
        assert!(matches!(decode_buffer(&[0; 4], fmt(8000, 2, 0), None), Err(Error::DecodeUpstream(_))));
        assert!(matches!(decode_buffer(&[0; 4], fmt(8000, 5, 1), None), Err(Error::DecodeUpstream(_))));
    }

    #[test]
    fn test_audio_name_from_path() {
        assert_eq!(audio_name_from_path(Path::new("/music/Artist - Song.flac")), "Artist - Song");
    }

    #[test]
    fn test_content_hash_is_upper_hex() {
        let h = content_hash(b"abc");
        assert_eq!(h, "900150983CD24FB0D6963F7D28E17F72");
    }
}
