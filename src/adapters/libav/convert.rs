//! Pixel and sample format conversion
//!
//! Video frames are brought to YUV420P at the encoder's size. Audio is
//! resampled to 48 kHz stereo planar float and re-chunked through a FIFO into
//! the fixed frame size AAC expects.

use ffmpeg_next::format::sample::Type as SampleType;
use ffmpeg_next::format::{Pixel, Sample};
use ffmpeg_next::software::{resampling, scaling};
use ffmpeg_next::{ffi, frame, ChannelLayout, Rational, Rescale};
use tracing::debug;

use super::ENCODER_PIXEL_FORMAT;
use crate::error::{BffResult, FfmpegResultExt};

/// Output audio sample rate
pub const AUDIO_RATE: u32 = 48_000;

/// Output audio sample format
pub const AUDIO_FORMAT: Sample = Sample::F32(SampleType::Planar);

/// Fallback when the encoder reports no fixed frame size
pub const DEFAULT_AUDIO_FRAME_SIZE: usize = 1024;

/// Extra room given to each resampler output frame on top of the rate-scaled input
const RESAMPLE_HEADROOM: usize = 256;

/// Converts decoded pictures to the encoder's pixel format and size
pub struct VideoConverter {
    width: u32,
    height: u32,
    scaler: Option<(Pixel, u32, u32, scaling::Context)>,
}

impl VideoConverter {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scaler: None,
        }
    }

    /// True when `frame` can go to the encoder as is
    pub fn is_passthrough(&self, frame: &frame::Video) -> bool {
        frame.format() == ENCODER_PIXEL_FORMAT && frame.width() == self.width && frame.height() == self.height
    }

    /// Return `frame` unchanged or a converted copy carrying its properties
    /// (pts, interlacing, aspect ratio, colour metadata)
    pub fn convert(&mut self, frame: frame::Video) -> BffResult<frame::Video> {
        if self.is_passthrough(&frame) {
            return Ok(frame);
        }

        let source = (frame.format(), frame.width(), frame.height());
        let scaler = match &mut self.scaler {
            Some((format, width, height, scaler)) if (*format, *width, *height) == source => scaler,
            slot => {
                debug!(
                    "Converting {:?} {}x{} to {:?} {}x{}",
                    source.0, source.1, source.2, ENCODER_PIXEL_FORMAT, self.width, self.height
                );
                let scaler = scaling::Context::get(
                    source.0,
                    source.1,
                    source.2,
                    ENCODER_PIXEL_FORMAT,
                    self.width,
                    self.height,
                    scaling::Flags::FAST_BILINEAR,
                )
                .during("sws_getContext", format!("{:?}", source.0))?;
                &mut slot.insert((source.0, source.1, source.2, scaler)).3
            }
        };

        let mut converted = frame::Video::empty();
        scaler.run(&frame, &mut converted).during("sws_scale", "video")?;
        let ret = unsafe { ffi::av_frame_copy_props(converted.as_mut_ptr(), frame.as_ptr()) };
        if ret < 0 {
            return Err(ffmpeg_next::Error::from(ret)).during("av_frame_copy_props", "sws");
        }
        Ok(converted)
    }
}

/// Stereo planar sample queue that hands out fixed-size chunks
#[derive(Debug, Default)]
pub struct SampleFifo {
    left: Vec<f32>,
    right: Vec<f32>,
}

impl SampleFifo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffered samples per channel
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Append one chunk; both channels must have the same length
    pub fn push(&mut self, left: &[f32], right: &[f32]) {
        debug_assert_eq!(left.len(), right.len());
        self.left.extend_from_slice(left);
        self.right.extend_from_slice(right);
    }

    /// Take up to `n` samples per channel, zero-padded to exactly `n`
    pub fn pop(&mut self, n: usize) -> (Vec<f32>, Vec<f32>) {
        let available = self.len().min(n);
        let mut left: Vec<f32> = self.left.drain(..available).collect();
        let mut right: Vec<f32> = self.right.drain(..available).collect();
        left.resize(n, 0.0);
        right.resize(n, 0.0);
        (left, right)
    }
}

/// Resampler input configuration a context was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResamplerInput {
    format: Sample,
    layout: ChannelLayout,
    rate: u32,
}

/// Resamples decoded audio and re-chunks it into encoder-sized frames
pub struct AudioConverter {
    frame_size: usize,
    input_time_base: Rational,
    resampler: Option<(ResamplerInput, resampling::Context)>,
    fifo: SampleFifo,
    /// Unset until the first decoded frame fixes the origin
    next_pts: Option<i64>,
}

impl AudioConverter {
    /// `frame_size` is the encoder's fixed frame size; zero selects the default.
    /// `input_time_base` is the time base of the decoded audio stream.
    pub fn new(frame_size: usize, input_time_base: Rational) -> Self {
        let frame_size = if frame_size == 0 {
            DEFAULT_AUDIO_FRAME_SIZE
        } else {
            frame_size
        };
        Self {
            frame_size,
            input_time_base,
            resampler: None,
            fifo: SampleFifo::new(),
            next_pts: None,
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Samples waiting for the next encoder frame
    pub fn buffered(&self) -> usize {
        self.fifo.len()
    }

    /// Pts of the next encoder frame in 1/48000, once known
    pub fn next_pts(&self) -> Option<i64> {
        self.next_pts
    }

    /// Queue one decoded frame, resampling it when its format differs from the output.
    ///
    /// The first frame's timestamp becomes the output origin so audio stays on
    /// the same clock as the video pts.
    pub fn push(&mut self, frame: &mut frame::Audio) -> BffResult<()> {
        if frame.samples() == 0 {
            return Ok(());
        }
        if self.next_pts.is_none() {
            let origin = frame
                .timestamp()
                .or_else(|| frame.pts())
                .map_or(0, |ts| ts.rescale(self.input_time_base, Rational::new(1, AUDIO_RATE as i32)));
            debug!("Audio output starts at pts {} (1/{})", origin, AUDIO_RATE);
            self.next_pts = Some(origin);
        }
        if frame.channel_layout().is_empty() {
            frame.set_channel_layout(ChannelLayout::default(i32::from(frame.channels())));
        }

        let input = ResamplerInput {
            format: frame.format(),
            layout: frame.channel_layout(),
            rate: frame.rate(),
        };
        if input.format == AUDIO_FORMAT && input.layout == ChannelLayout::STEREO && input.rate == AUDIO_RATE {
            self.queue(frame);
            return Ok(());
        }

        let capacity = resampled_capacity(frame.samples(), input.rate);
        let resampler = self.resampler_for(input)?;
        let mut resampled = frame::Audio::new(AUDIO_FORMAT, capacity, ChannelLayout::STEREO);
        resampled.set_rate(AUDIO_RATE);
        resampler.run(frame, &mut resampled).during("swr_convert_frame", "audio")?;
        self.queue(&resampled);
        Ok(())
    }

    /// Drain samples still buffered inside the resampler into the FIFO
    pub fn flush(&mut self) -> BffResult<()> {
        let Some((_, resampler)) = &mut self.resampler else {
            return Ok(());
        };
        let mut drained = Vec::new();
        loop {
            let mut tail = frame::Audio::new(AUDIO_FORMAT, self.frame_size, ChannelLayout::STEREO);
            tail.set_rate(AUDIO_RATE);
            resampler.flush(&mut tail).during("swr_convert_frame", "audio flush")?;
            if tail.samples() == 0 {
                break;
            }
            drained.push(tail);
        }
        for tail in &drained {
            self.queue(tail);
        }
        Ok(())
    }

    /// Next encoder-sized frame, or with `flush` the zero-padded remainder
    pub fn pop_frame(&mut self, flush: bool) -> Option<frame::Audio> {
        let ready = self.fifo.len() >= self.frame_size || (flush && !self.fifo.is_empty());
        if !ready {
            return None;
        }

        let pts = self.next_pts.unwrap_or(0);
        let (left, right) = self.fifo.pop(self.frame_size);
        let mut out = frame::Audio::new(AUDIO_FORMAT, self.frame_size, ChannelLayout::STEREO);
        out.set_rate(AUDIO_RATE);
        out.set_pts(Some(pts));
        out.plane_mut::<f32>(0).copy_from_slice(&left);
        out.plane_mut::<f32>(1).copy_from_slice(&right);
        self.next_pts = Some(pts + self.frame_size as i64);
        Some(out)
    }

    fn resampler_for(&mut self, input: ResamplerInput) -> BffResult<&mut resampling::Context> {
        let context = match &mut self.resampler {
            Some((current, context)) if *current == input => context,
            slot => {
                debug!(
                    "Resampling {:?} {} Hz ({} channel(s)) to {:?} {} Hz stereo",
                    input.format,
                    input.rate,
                    input.layout.channels(),
                    AUDIO_FORMAT,
                    AUDIO_RATE
                );
                let context = resampling::Context::get(
                    input.format,
                    input.layout,
                    input.rate,
                    AUDIO_FORMAT,
                    ChannelLayout::STEREO,
                    AUDIO_RATE,
                )
                .during("swr_alloc_set_opts", format!("{:?}", input.format))?;
                &mut slot.insert((input, context)).1
            }
        };
        Ok(context)
    }

    /// Append a stereo planar float frame; mono is duplicated to both channels
    fn queue(&mut self, frame: &frame::Audio) {
        let samples = frame.samples();
        if samples == 0 {
            return;
        }
        let left = &frame.plane::<f32>(0)[..samples];
        let right = if frame.planes() > 1 {
            &frame.plane::<f32>(1)[..samples]
        } else {
            left
        };
        self.fifo.push(left, right);
    }
}

/// Output samples needed for `samples` input samples at `rate`
fn resampled_capacity(samples: usize, rate: u32) -> usize {
    let rate = u64::from(rate.max(1));
    let scaled = (samples as u64 * u64::from(AUDIO_RATE)).div_ceil(rate);
    scaled as usize + RESAMPLE_HEADROOM
}
