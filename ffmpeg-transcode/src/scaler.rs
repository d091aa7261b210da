use ffmpeg_next::{
    format::Pixel,
    frame,
    software::scaling::{self, flag::Flags},
};

/// Converts decoded pictures into the layout the encoder was opened with.
pub struct Scaler {
    context: scaling::Context,
    output: frame::Video,
}

impl Scaler {
    pub fn new(
        source: &frame::Video,
        format: Pixel,
        width: u32,
        height: u32,
    ) -> Result<Self, ffmpeg_next::Error> {
        let context = scaling::Context::get(
            source.format(),
            source.width(),
            source.height(),
            format,
            width,
            height,
            Flags::BILINEAR,
        )?;
        log::info!(
            "converting frames {:?} {}x{} -> {:?} {}x{}",
            source.format(),
            source.width(),
            source.height(),
            format,
            width,
            height
        );
        Ok(Self {
            context,
            output: frame::Video::empty(),
        })
    }

    /// Whether `frame` has the layout this scaler was built for.
    pub fn accepts(&self, frame: &frame::Video) -> bool {
        let input = self.context.input();
        input.format == frame.format() && input.width == frame.width() && input.height == frame.height()
    }

    /// Converts `frame`, carrying its pts and duration over to the result.
    pub fn run(&mut self, frame: &frame::Video) -> Result<&frame::Video, ffmpeg_next::Error> {
        self.context.run(frame, &mut self.output)?;
        self.output.set_pts(frame.pts());
        unsafe { (*self.output.as_mut_ptr()).duration = (*frame.as_ptr()).duration };
        Ok(&self.output)
    }
}
