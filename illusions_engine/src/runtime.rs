use std::{fs, path::Path, rc::Rc};

use anyhow::{Context, Result};
use serde::Serialize;

use illusions_core::{
    Engine, EngineConfig, EngineSnapshot, HostEvent, ManualClock, RecordingHost, ScriptArgs,
};

use crate::cli::RunArgs;
use crate::scenario::Scenario;

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub sequence: u32,
    pub frame: u32,
    pub label: String,
}

#[derive(Debug, Serialize)]
struct EventLog<'a> {
    scenario: &'a str,
    frames: u32,
    frame_ms: u32,
    events: &'a [EventLogEntry],
    host_events: &'a [HostEvent],
}

/// Couples the engine with the per-frame event capture.
struct ScenarioRun {
    engine: Engine,
    clock: ManualClock,
    host: RecordingHost,
    log: Vec<EventLogEntry>,
    verbose: bool,
}

impl ScenarioRun {
    fn collect(&mut self, frame: u32) {
        for label in self.engine.take_events() {
            if self.verbose {
                println!("[{frame:>5}] {label}");
            }
            let sequence = self.log.len() as u32;
            self.log.push(EventLogEntry {
                sequence,
                frame,
                label,
            });
        }
    }
}

pub fn execute(args: RunArgs) -> Result<()> {
    let RunArgs {
        scenario: scenario_path,
        config: config_path,
        frames,
        frame_ms,
        event_log_json,
        snapshot_json,
        verbose,
    } = args;

    let scenario = Scenario::from_json_file(&scenario_path)?;
    let config = match config_path.as_deref() {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config.validate().context("validating engine config")?;
    let frames = frames.unwrap_or_else(|| scenario.frames());
    let immediate_after_boot = config.immediate_script_init;

    let clock = ManualClock::new(0);
    let host = RecordingHost::new()
        .with_voice_timing(scenario.voice.cue_polls, scenario.voice.length_polls);
    let services = host.services(Rc::new(clock.clone()));
    let engine = Engine::new(config, services, Rc::new(scenario.build_catalog()));
    let mut run = ScenarioRun {
        engine,
        clock,
        host,
        log: Vec::new(),
        verbose,
    };

    log::info!(
        "scenario '{}': booting thread {} for {frames} frames",
        scenario.name,
        scenario.boot_thread()
    );
    run.engine.set_immediate_script_init(true);
    if run
        .engine
        .start_script_thread(
            scenario.boot_thread(),
            scenario.boot.code,
            None,
            ScriptArgs::default(),
        )
        .is_none()
    {
        log::warn!("boot code {:#X} could not be loaded", scenario.boot.code);
    }
    run.engine.set_immediate_script_init(immediate_after_boot);
    run.collect(0);

    for frame in 1..=frames {
        for event in scenario.inputs_at(frame) {
            log::debug!("frame {frame}: input {event:?}");
            run.host.press(event);
        }
        run.clock.advance(frame_ms);
        run.engine.tick();
        run.collect(frame);
    }

    let snapshot = run.engine.snapshot();
    if !verbose {
        print_summary(&scenario.name, frames, &run.log, &snapshot);
    }

    if let Some(path) = event_log_json.as_deref() {
        let host_events = run.host.events();
        let log = EventLog {
            scenario: &scenario.name,
            frames,
            frame_ms,
            events: &run.log,
            host_events: &host_events,
        };
        write_json(path, &log, "event log")?;
    }

    if let Some(path) = snapshot_json.as_deref() {
        write_json(path, &snapshot, "scheduler snapshot")?;
    }

    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value).with_context(|| format!("serializing {what}"))?;
    fs::write(path, json).with_context(|| format!("writing {what} to {}", path.display()))?;
    println!("Saved {what} to {}", path.display());
    Ok(())
}

fn print_summary(name: &str, frames: u32, log: &[EventLogEntry], snapshot: &EngineSnapshot) {
    println!("Scenario '{name}' ran {frames} frames ({} ms)", snapshot.now);
    let count = |prefix: &str| {
        log.iter()
            .filter(|entry| entry.label.starts_with(prefix))
            .count()
    };
    println!(
        "  threads started: {}, terminated: {}, killed: {}",
        count("thread.start"),
        count("thread.terminate"),
        count("thread.kill")
    );
    println!(
        "  scenes entered: {}, exited: {}",
        count("scene.enter"),
        count("scene.exit")
    );
    let stack: Vec<String> = snapshot
        .active_scenes
        .iter()
        .map(|scene| format!("{:08X}", scene.scene_id))
        .collect();
    println!("  active scenes: [{}]", stack.join(", "));
    if snapshot.threads.is_empty() {
        println!("  no live threads");
    } else {
        println!("  live threads:");
        for thread in &snapshot.threads {
            println!(
                "    {} {:<9} scene {:08X} pause {}",
                thread.id,
                thread.kind.as_str(),
                thread.scene_id,
                thread.pause_ctr
            );
        }
    }
}
