use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Drives the Illusions thread scheduler through a scripted scenario",
    version
)]
pub struct Args {
    /// Scenario JSON describing scenes, code blocks, talk entries and input
    #[arg(long)]
    pub scenario: PathBuf,

    /// Optional engine config JSON (scene ids, talk timing)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of frames to run (default: the scenario's own frame count)
    #[arg(long)]
    pub frames: Option<u32>,

    /// Milliseconds the manual clock advances per frame
    #[arg(long, default_value_t = 16)]
    pub frame_ms: u32,

    /// Path to write the engine and host event logs as JSON
    #[arg(long)]
    pub event_log_json: Option<PathBuf>,

    /// Path to write the final scheduler snapshot as JSON
    #[arg(long)]
    pub snapshot_json: Option<PathBuf>,

    /// Print every event as it happens instead of a summary
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug)]
pub struct RunArgs {
    pub scenario: PathBuf,
    pub config: Option<PathBuf>,
    pub frames: Option<u32>,
    pub frame_ms: u32,
    pub event_log_json: Option<PathBuf>,
    pub snapshot_json: Option<PathBuf>,
    pub verbose: bool,
}

pub fn parse() -> Result<RunArgs> {
    let args = Args::parse();
    args.into_run_args()
}

impl Args {
    fn into_run_args(self) -> Result<RunArgs> {
        if self.frame_ms == 0 {
            bail!("--frame-ms must be at least 1");
        }
        if self.frames == Some(0) {
            bail!("--frames must be at least 1");
        }
        Ok(RunArgs {
            scenario: self.scenario,
            config: self.config,
            frames: self.frames,
            frame_ms: self.frame_ms,
            event_log_json: self.event_log_json,
            snapshot_json: self.snapshot_json,
            verbose: self.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_frame_step_is_rejected() {
        let args = Args::parse_from(["illusions_engine", "--scenario", "s.json", "--frame-ms", "0"]);
        assert!(args.into_run_args().is_err());
    }

    #[test]
    fn defaults_follow_the_scenario() {
        let args = Args::parse_from(["illusions_engine", "--scenario", "s.json"]);
        let run = args.into_run_args().unwrap();
        assert_eq!(run.frames, None);
        assert_eq!(run.frame_ms, 16);
    }
}
