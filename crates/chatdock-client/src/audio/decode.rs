use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use super::{AudioError, NotificationClip};

/// A clip decoded to mono `f32` samples at its native rate.
pub(crate) struct DecodedClip {
    source: &'static [u8],
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedClip {
    #[cfg(test)]
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            source: &[],
            samples,
            sample_rate,
        }
    }

    /// True if this was decoded from `clip`.
    pub fn is_from(&self, clip: &NotificationClip) -> bool {
        std::ptr::eq(self.source, clip.bytes())
    }
}

pub(crate) fn decode_clip(clip: &NotificationClip) -> Result<DecodedClip, AudioError> {
    let source = clip.bytes();
    let mss = MediaSourceStream::new(Box::new(Cursor::new(source)), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("wav");

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::DecodeError(format!("format detection: {e}")))?;
    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::DecodeError("no audio track".into()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioError::DecodeError("unknown sample rate".into()))?;
    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::DecodeError(format!("codec: {e}")))?;

    let mut samples = Vec::new();
    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(e) => return Err(AudioError::DecodeError(format!("packet: {e}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| AudioError::DecodeError(e.to_string()))?;
        let signal = *decoded.spec();
        let channels = signal.channels.count().max(1);

        let mut buf = SampleBuffer::<f32>::new(decoded.frames() as u64, signal);
        buf.copy_interleaved_ref(decoded);
        // Downmix to mono; the output stage fans it out to every channel.
        samples.extend(
            buf.samples()
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }

    if samples.is_empty() {
        return Err(AudioError::DecodeError("clip has no samples".into()));
    }

    Ok(DecodedClip {
        source,
        samples,
        sample_rate,
    })
}
