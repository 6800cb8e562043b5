use std::thread::sleep;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use log::info;

use reel::cli::Args;
use reel::{Frame, FrameChunk, FrameSource, Status, StreamEngine, StreamInfo, frame_index};

/// Procedural gradient source: frame N is a solid color derived from N,
/// so dropped or repeated frames are visible in the printed index
struct GradientSource {
    info: StreamInfo,
    cursor: u64,
}

impl GradientSource {
    fn new(info: StreamInfo) -> Self {
        Self { info, cursor: 0 }
    }

    fn render(&self, index: u64) -> Frame {
        let (w, h) = self.info.size();
        let shade = (index % 256) as u8;
        let mut pixels = vec![0u8; (w * h * 4) as usize];
        for px in pixels.chunks_mut(4) {
            px.copy_from_slice(&[shade, 255 - shade, 128, 255]);
        }
        Frame::from_rgba(pixels, w, h)
    }
}

impl FrameSource for GradientSource {
    fn fetch(&mut self, requested: usize) -> FrameChunk {
        let remaining = self.info.frame_count.saturating_sub(self.cursor);
        let n = (requested as u64).min(remaining);
        let frames = (self.cursor..self.cursor + n)
            .map(|i| self.render(i))
            .collect();
        self.cursor += n;
        FrameChunk::frames(frames, self.cursor >= self.info.frame_count)
    }

    fn seek(&mut self, offset: Duration) {
        self.cursor = frame_index(offset, self.info.frame_rate).min(self.info.frame_count);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(args.log_filter()),
    )
    .init();

    let (width, height) = args.parsed_size()?;
    let info = StreamInfo {
        width,
        height,
        frame_rate: args.frame_rate,
        frame_count: args.frame_rate as u64 * args.seconds as u64,
    };
    info!(
        "Synthetic source: {}x{} @ {} fps, {:?} total",
        width,
        height,
        info.frame_rate,
        info.duration()
    );

    let mut engine = StreamEngine::new(info, Box::new(GradientSource::new(info)));
    engine.set_looping(args.loop_playback != 0);

    match args.start_offset {
        Some(secs) => engine.set_playing_offset(Duration::from_secs_f64(secs))?,
        None => engine.play()?,
    }

    let run_for = args
        .run_for
        .map(Duration::from_secs_f64)
        .unwrap_or(if engine.is_looping() {
            Duration::from_secs(args.seconds as u64)
        } else {
            // Give a non-looping run room to finish on its own.
            info.duration() + Duration::from_secs(2)
        });
    let started = Instant::now();

    // Presenter stand-in: poll the engine the way a render loop would.
    while engine.status() == Status::Playing && started.elapsed() < run_for {
        let offset = engine.playing_offset();
        let index = frame_index(offset, engine.frame_rate());
        let shade = engine
            .current_frame()
            .map(|f| f.pixels()[0])
            .unwrap_or_default();
        println!(
            "offset {:>7.3}s  frame {:>5}  shade {:>3}  pending {}  processed {}",
            offset.as_secs_f64(),
            index,
            shade,
            engine.pending_buffer_count(),
            engine.frames_processed(),
        );
        sleep(Duration::from_millis(100));
    }

    engine.stop()?;
    println!("done: status {:?}", engine.status());
    Ok(())
}
