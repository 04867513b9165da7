//! Deinterlacing filter graph: `buffer -> <filter> -> buffersink`

use ffmpeg_next::{ffi, filter, frame, Rational};
use tracing::debug;

use super::{drain_step, ENCODER_PIXEL_FORMAT};
use crate::error::{BffResult, FfmpegResultExt};

/// Stream parameters announced to the buffer source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterInput {
    pub width: u32,
    pub height: u32,
    pub time_base: Rational,
    pub aspect_ratio: Rational,
}

impl FilterInput {
    /// Argument string of the `buffer` filter; an unknown aspect ratio is sent as square pixels
    pub fn buffer_args(&self) -> String {
        let aspect = if self.aspect_ratio.numerator() > 0 && self.aspect_ratio.denominator() > 0 {
            self.aspect_ratio
        } else {
            Rational::new(1, 1)
        };
        format!(
            "video_size={}x{}:pix_fmt={}:time_base={}/{}:pixel_aspect={}/{}",
            self.width,
            self.height,
            ffi::AVPixelFormat::from(ENCODER_PIXEL_FORMAT) as i32,
            self.time_base.numerator(),
            self.time_base.denominator(),
            aspect.numerator(),
            aspect.denominator()
        )
    }
}

/// Configured filter graph fed with YUV420P frames
pub struct Deinterlacer {
    graph: filter::Graph,
    description: String,
}

impl Deinterlacer {
    pub fn new(input: FilterInput, description: &str) -> BffResult<Self> {
        let mut graph = filter::Graph::new();
        let args = input.buffer_args();

        let buffer = filter::find("buffer")
            .ok_or(ffmpeg_next::Error::FilterNotFound)
            .during("avfilter_get_by_name", "buffer")?;
        let buffersink = filter::find("buffersink")
            .ok_or(ffmpeg_next::Error::FilterNotFound)
            .during("avfilter_get_by_name", "buffersink")?;

        graph
            .add(&buffer, "in", &args)
            .during("avfilter_graph_create_filter", args.as_str())?;
        graph
            .add(&buffersink, "out", "")
            .during("avfilter_graph_create_filter", "out")?;

        graph
            .output("in", 0)
            .and_then(|parser| parser.input("out", 0))
            .and_then(|parser| parser.parse(description))
            .during("avfilter_graph_parse_ptr", description)?;
        graph.validate().during("avfilter_graph_config", description)?;

        debug!("Filter graph configured: {} ({})", description, args);
        Ok(Self {
            graph,
            description: description.to_string(),
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Feed one frame into the graph
    pub fn push(&mut self, frame: &frame::Video) -> BffResult<()> {
        endpoint(&mut self.graph, "in")?
            .source()
            .add(frame)
            .during("av_buffersrc_add_frame", self.description.as_str())
    }

    /// Signal end of input so the filter releases frames it still holds
    pub fn flush(&mut self) -> BffResult<()> {
        endpoint(&mut self.graph, "in")?
            .source()
            .flush()
            .during("av_buffersrc_add_frame", "flush")
    }

    /// Next filtered frame, if one is ready
    pub fn pull(&mut self, frame: &mut frame::Video) -> BffResult<bool> {
        let result = endpoint(&mut self.graph, "out")?.sink().frame(frame);
        drain_step(result, "av_buffersink_get_frame", self.description.as_str())
    }
}

fn endpoint<'a>(graph: &'a mut filter::Graph, name: &'static str) -> BffResult<filter::Context<'a>> {
    graph
        .get(name)
        .ok_or(ffmpeg_next::Error::FilterNotFound)
        .during("avfilter_graph_get_filter", name)
}
