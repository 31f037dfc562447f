use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error, info};

use super::decode::{decode_clip, DecodedClip};
use super::{AudioError, AudioSink, NotificationClip};

/// Playback cursor shared with the output callback.
#[derive(Default)]
struct Voice {
    clip: Option<DecodedClip>,
    position: f64,
    playing: bool,
}

impl Voice {
    fn holds(&self, clip: &NotificationClip) -> bool {
        self.clip.as_ref().is_some_and(|c| c.is_from(clip))
    }

    fn load(&mut self, clip: DecodedClip) {
        self.clip = Some(clip);
        self.rewind();
    }

    fn rewind(&mut self) {
        self.playing = false;
        self.position = 0.0;
    }

    /// Next mono sample at `output_rate`, nearest-neighbour resampled.
    /// Playback stops and rewinds at the end of the clip.
    fn next_sample(&mut self, output_rate: u32) -> f32 {
        if !self.playing {
            return 0.0;
        }
        let Some(clip) = self.clip.as_ref() else {
            return 0.0;
        };

        let index = self.position as usize;
        let Some(&value) = clip.samples.get(index) else {
            self.rewind();
            return 0.0;
        };
        self.position += f64::from(clip.sample_rate) / f64::from(output_rate.max(1));
        value
    }
}

fn fill_output<T: cpal::Sample + cpal::FromSample<f32>>(
    output: &mut [T],
    channels: usize,
    output_rate: u32,
    voice: &Mutex<Voice>,
) {
    // Never block the audio thread; a contended buffer plays silence.
    let Ok(mut voice) = voice.try_lock() else {
        for sample in output.iter_mut() {
            *sample = T::from_sample(0.0f32);
        }
        return;
    };

    for frame in output.chunks_mut(channels.max(1)) {
        let value = voice.next_sample(output_rate);
        for sample in frame.iter_mut() {
            *sample = T::from_sample(value);
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    voice: Arc<Mutex<Voice>>,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = usize::from(config.channels);
    let rate = config.sample_rate.0;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
                fill_output(data, channels, rate, &voice)
            },
            move |err| {
                error!("Audio output error: {err}");
            },
            None,
        )
        .map_err(|e| AudioError::StreamError(e.to_string()))
}

fn open_stream(voice: Arc<Mutex<Voice>>) -> Result<cpal::Stream, AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::NoOutputDevice)?;
    let config = device
        .default_output_config()
        .map_err(|e| AudioError::DeviceError(e.to_string()))?;

    info!(
        device = ?device.name(),
        rate = config.sample_rate().0,
        channels = config.channels(),
        "Using output device"
    );

    let stream_config: cpal::StreamConfig = config.clone().into();
    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, voice)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, voice)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, voice)?,
        other => {
            return Err(AudioError::DeviceError(format!(
                "unsupported sample format {other:?}"
            )))
        }
    };

    stream
        .play()
        .map_err(|e| AudioError::StreamError(e.to_string()))?;
    Ok(stream)
}

/// Keeps the output stream alive on its own thread until dropped.
struct OutputThread {
    _shutdown: mpsc::Sender<()>,
}

impl OutputThread {
    fn spawn(voice: Arc<Mutex<Voice>>) -> Result<Self, AudioError> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        std::thread::Builder::new()
            .name("chatdock-audio".into())
            .spawn(move || match open_stream(voice) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    // Returns once the sender is dropped.
                    let _ = shutdown_rx.recv();
                    drop(stream);
                    debug!("Audio output closed");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| AudioError::DeviceError(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| AudioError::DeviceError("audio thread exited".into()))??;

        Ok(Self {
            _shutdown: shutdown_tx,
        })
    }
}

/// Plays clips on the default output device through `cpal`.
///
/// The device is opened on the first [`start`](AudioSink::start), so a
/// machine without audio output surfaces as a failed unlock rather than a
/// startup error.
#[derive(Default)]
pub struct CpalSink {
    voice: Arc<Mutex<Voice>>,
    output: Mutex<Option<OutputThread>>,
}

impl CpalSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn voice(&self) -> Result<MutexGuard<'_, Voice>, AudioError> {
        self.voice
            .lock()
            .map_err(|_| AudioError::DeviceError("playback state poisoned".into()))
    }

    fn ensure_output(&self) -> Result<(), AudioError> {
        let mut output = self
            .output
            .lock()
            .map_err(|_| AudioError::DeviceError("output state poisoned".into()))?;
        if output.is_none() {
            *output = Some(OutputThread::spawn(self.voice.clone())?);
        }
        Ok(())
    }
}

impl AudioSink for CpalSink {
    fn start(&self, clip: &NotificationClip) -> Result<(), AudioError> {
        self.ensure_output()?;

        if !self.voice()?.holds(clip) {
            let decoded = decode_clip(clip)?;
            self.voice()?.load(decoded);
        }
        self.voice()?.playing = true;
        Ok(())
    }

    fn stop(&self) {
        if let Ok(mut voice) = self.voice.lock() {
            voice.rewind();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(samples: Vec<f32>, rate: u32) -> Voice {
        let mut voice = Voice::default();
        voice.load(DecodedClip::from_samples(samples, rate));
        voice
    }

    #[test]
    fn test_idle_voice_is_silent() {
        let mut v = voice(vec![0.5, 0.5], 8000);
        assert_eq!(v.next_sample(8000), 0.0);
        assert_eq!(v.next_sample(8000), 0.0);
    }

    #[test]
    fn test_voice_plays_once_then_rewinds() {
        let mut v = voice(vec![0.5, -0.5, 0.25], 8000);
        v.playing = true;

        let played: Vec<f32> = (0..5).map(|_| v.next_sample(8000)).collect();
        assert_eq!(played, [0.5, -0.5, 0.25, 0.0, 0.0]);
        assert!(!v.playing);
        assert_eq!(v.position, 0.0);
    }

    #[test]
    fn test_voice_resamples_to_output_rate() {
        let mut v = voice(vec![0.1, 0.2], 8000);
        v.playing = true;

        let played: Vec<f32> = (0..4).map(|_| v.next_sample(16000)).collect();
        assert_eq!(played, [0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_rewind_restarts_from_the_top() {
        let mut v = voice(vec![0.1, 0.2, 0.3], 8000);
        v.playing = true;
        v.next_sample(8000);
        v.next_sample(8000);

        v.rewind();
        assert_eq!(v.next_sample(8000), 0.0);
        v.playing = true;
        assert_eq!(v.next_sample(8000), 0.1);
    }

    #[test]
    fn test_fill_output_fans_out_to_channels() {
        let shared = Mutex::new(voice(vec![0.5, -0.5], 8000));
        shared.lock().unwrap().playing = true;

        let mut out = [1.0f32; 6];
        fill_output(&mut out, 2, 8000, &shared);
        assert_eq!(out, [0.5, 0.5, -0.5, -0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_fill_output_is_silent_while_contended() {
        let shared = Mutex::new(voice(vec![0.5], 8000));
        let _held = shared.lock().unwrap();

        let mut out = [1.0f32; 4];
        fill_output(&mut out, 2, 8000, &shared);
        assert_eq!(out, [0.0; 4]);
    }

    #[test]
    fn test_stop_rewinds_loaded_clip() {
        let sink = CpalSink::new();
        let clip = NotificationClip::embedded().unwrap();
        sink.voice().unwrap().load(decode_clip(&clip).unwrap());
        sink.voice().unwrap().playing = true;
        sink.voice().unwrap().position = 12.0;

        sink.stop();
        let voice = sink.voice().unwrap();
        assert!(voice.holds(&clip));
        assert!(!voice.playing);
        assert_eq!(voice.position, 0.0);
    }
}
