//! The frame loop: read, decode, filter, classify and substitute, encode, write

use std::time::Instant;

use ffmpeg_next::frame;
use tracing::{info, warn};

use crate::adapters::libav::{
    make_writable, AudioConverter, Deinterlacer, FilterInput, MediaInput, MediaOutput, VideoConverter,
    VideoEncoderSettings,
};
use crate::engine::{FramePipeline, ProgressReporter, TranscodeJob, TranscodePhase, TranscodeStats};
use crate::error::BffResult;
use crate::utils::path::prepare_output_path;
use crate::utils::{format_duration, throughput};

/// Runs one [`TranscodeJob`]
pub struct Transcoder {
    job: TranscodeJob,
}

impl Transcoder {
    pub fn new(job: TranscodeJob) -> Self {
        Self { job }
    }

    pub fn job(&self) -> &TranscodeJob {
        &self.job
    }

    /// Transcode the input into a fresh MP4; any libav failure aborts the run
    pub fn run(&self) -> BffResult<TranscodeStats> {
        let started = Instant::now();
        info!(
            "Transcoding {} -> {}",
            self.job.input_path.display(),
            self.job.output_path.display()
        );

        match self.execute() {
            Ok(mut stats) => {
                stats.elapsed = started.elapsed();
                info!(
                    "Transcoding completed in {} ({:.1} fps)",
                    format_duration(stats.elapsed),
                    throughput(stats.video_frames, stats.elapsed)
                );
                Ok(stats)
            }
            Err(e) => {
                warn!("Transcoding failed: {}", e);
                Err(e)
            }
        }
    }

    fn execute(&self) -> BffResult<TranscodeStats> {
        let mut frames = FramePipeline::new(
            self.job.classifier,
            ProgressReporter::new(self.job.progress_interval),
        );
        frames.set_phase(TranscodePhase::Opening);
        info!("Black frame classifier: {}", frames.classifier_name());

        let input = MediaInput::open(&self.job.input_path)?;

        let decoder = input.video_decoder();
        let (width, height, aspect_ratio) = (decoder.width(), decoder.height(), decoder.aspect_ratio());
        let settings = VideoEncoderSettings {
            width,
            height,
            aspect_ratio,
            time_base: input.video_time_base(),
            frame_rate: input.frame_rate(),
        };

        // An existing output is only removed once the input has opened.
        prepare_output_path(&self.job.output_path)?;
        let output = MediaOutput::create(&self.job.output_path, settings, input.has_audio())?;

        let deinterlacer = match &self.job.deinterlace_filter {
            Some(description) => {
                let filter_input = FilterInput {
                    width,
                    height,
                    time_base: input.video_time_base(),
                    aspect_ratio,
                };
                Some(Deinterlacer::new(filter_input, description)?)
            }
            None => None,
        };
        let audio = output
            .audio_frame_size()
            .zip(input.audio_time_base())
            .map(|(frame_size, time_base)| AudioConverter::new(frame_size, time_base));

        let mut session = Session {
            input,
            output,
            converter: VideoConverter::new(width, height),
            deinterlacer,
            audio,
            frames,
        };
        session.transcode()?;
        Ok(session.finish())
    }
}

/// Everything open during one run
struct Session {
    input: MediaInput,
    output: MediaOutput,
    converter: VideoConverter,
    deinterlacer: Option<Deinterlacer>,
    audio: Option<AudioConverter>,
    frames: FramePipeline,
}

impl Session {
    fn transcode(&mut self) -> BffResult<()> {
        self.frames.set_phase(TranscodePhase::Transcoding);
        let video_index = self.input.video_stream_index();
        let audio_index = self.input.audio_stream_index();

        while let Some(packet) = self.input.read_packet()? {
            if packet.stream() == video_index {
                self.input.send_video_packet(&packet)?;
                self.drain_video_decoder()?;
            } else if Some(packet.stream()) == audio_index {
                self.input.send_audio_packet(&packet)?;
                self.drain_audio_decoder()?;
            }
        }

        self.frames.set_phase(TranscodePhase::Flushing);
        self.input.send_eof()?;
        self.drain_video_decoder()?;
        self.drain_audio_decoder()?;

        if let Some(filter) = &mut self.deinterlacer {
            filter.flush()?;
        }
        self.drain_filter()?;

        if let Some(converter) = &mut self.audio {
            converter.flush()?;
        }
        self.drain_audio_fifo(true)?;

        self.output.finish()
    }

    fn drain_video_decoder(&mut self) -> BffResult<()> {
        let mut decoded = frame::Video::empty();
        while self.input.receive_video_frame(&mut decoded)? {
            let picture = std::mem::replace(&mut decoded, frame::Video::empty());
            let converted = self.converter.convert(picture)?;
            match &mut self.deinterlacer {
                Some(filter) => {
                    filter.push(&converted)?;
                    self.drain_filter()?;
                }
                None => self.encode_video(converted)?,
            }
        }
        Ok(())
    }

    fn drain_filter(&mut self) -> BffResult<()> {
        loop {
            let mut filtered = frame::Video::empty();
            let pulled = match &mut self.deinterlacer {
                Some(filter) => filter.pull(&mut filtered)?,
                None => false,
            };
            if !pulled {
                return Ok(());
            }
            self.encode_video(filtered)?;
        }
    }

    fn encode_video(&mut self, mut picture: frame::Video) -> BffResult<()> {
        self.frames.process_with(&mut picture, make_writable)?;
        self.output.send_video_frame(&mut picture)
    }

    fn drain_audio_decoder(&mut self) -> BffResult<()> {
        let mut decoded = frame::Audio::empty();
        while self.input.receive_audio_frame(&mut decoded)? {
            self.frames.record_audio_frame();
            if let Some(converter) = &mut self.audio {
                converter.push(&mut decoded)?;
            }
            self.drain_audio_fifo(false)?;
        }
        Ok(())
    }

    fn drain_audio_fifo(&mut self, flush: bool) -> BffResult<()> {
        let Some(converter) = &mut self.audio else {
            return Ok(());
        };
        while let Some(chunk) = converter.pop_frame(flush) {
            self.output.send_audio_frame(&chunk)?;
        }
        Ok(())
    }

    fn finish(mut self) -> TranscodeStats {
        let stats = self.frames.stats_mut();
        stats.video_packets = self.output.video_packets();
        stats.audio_packets = self.output.audio_packets();
        stats.adjusted_timestamps = self.output.adjusted_timestamps();
        if stats.adjusted_timestamps > 0 {
            info!("Adjusted {} non-increasing packet timestamps", stats.adjusted_timestamps);
        }
        self.frames.complete()
    }
}
