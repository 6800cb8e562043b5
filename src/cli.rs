use clap::Parser;

/// Streaming playback engine demo - plays a synthetic gradient source
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Frame rate of the synthetic source
    #[arg(long = "fps", value_name = "N", default_value = "24")]
    pub frame_rate: u32,

    /// Length of the synthetic source in seconds
    #[arg(short = 's', long = "seconds", value_name = "N", default_value = "3")]
    pub seconds: u32,

    /// Frame size as WIDTHxHEIGHT
    #[arg(long = "size", value_name = "WxH", default_value = "320x240")]
    pub size: String,

    /// Enable looping (0|1)
    #[arg(short = 'o', long = "loop", value_name = "0|1", default_value = "0")]
    pub loop_playback: u8,

    /// Start playback at this offset, in seconds
    #[arg(long = "offset", value_name = "SECS")]
    pub start_offset: Option<f64>,

    /// Stop the demo after this many seconds of playback (default: play to
    /// the end, or --seconds when looping)
    #[arg(long = "run-for", value_name = "SECS")]
    pub run_for: Option<f64>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Args {
    /// Parse "WxH" into a (width, height) pair
    pub fn parsed_size(&self) -> anyhow::Result<(u32, u32)> {
        let (w, h) = self
            .size
            .split_once('x')
            .ok_or_else(|| anyhow::anyhow!("Invalid --size '{}', expected WxH", self.size))?;
        Ok((w.trim().parse()?, h.trim().parse()?))
    }

    /// Log level filter string from the -v count
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
