mod common;

use common::{talk_then_log, yield_forever, Harness};
use illusions_core::{
    EngineConfig, HostEvent, InputEvent, RecordingHost, SceneInfo, StaticCatalog, TalkEntry,
    TalkRequest, TalkStage,
};

const ACTOR_A: u32 = 0x0004_0001;
const ACTOR_B: u32 = 0x0004_0002;

fn request(object_id: u32, talk_id: u32, sequence_base: u32) -> TalkRequest {
    TalkRequest {
        object_id,
        talk_id,
        sequence_id1: sequence_base + 1,
        sequence_id2: sequence_base + 2,
        duration: 0,
    }
}

fn talk_catalog() -> StaticCatalog {
    let mut catalog = StaticCatalog::new(4);
    catalog.add_code(0x10, || yield_forever);
    catalog.add_scene(SceneInfo::new(1000));
    catalog.add_talk(TalkEntry {
        talk_id: 1,
        lines: vec!["Line A".to_string()],
        voice: None,
    });
    catalog.add_talk(TalkEntry {
        talk_id: 2,
        lines: vec!["Line B".to_string()],
        voice: None,
    });
    catalog.add_talk(TalkEntry {
        talk_id: 5,
        lines: vec!["First page".to_string(), "Second page".to_string()],
        voice: None,
    });
    catalog.add_talk(TalkEntry {
        talk_id: 6,
        lines: vec!["Hold that thought".to_string()],
        voice: Some("v006".to_string()),
    });
    catalog
}

#[test]
fn only_one_talk_thread_exists_at_a_time() {
    let mut h = Harness::new(talk_catalog());
    for talk_id in [1, 2, 5] {
        h.engine.start_talk_thread(request(ACTOR_A, talk_id, 0x60000), None);
        assert_eq!(h.talk_threads().len(), 1);
        h.frame(16);
        assert_eq!(h.talk_threads().len(), 1);
        assert!(h.engine.is_talk_thread_active());
    }
}

#[test]
fn a_new_talk_preempts_the_current_one_silently() {
    let mut catalog = talk_catalog();
    catalog.add_code_factory(0x20, talk_then_log(request(ACTOR_A, 1, 0x60000), "a.done"));
    catalog.add_code_factory(0x30, talk_then_log(request(ACTOR_B, 2, 0x60010), "b.done"));
    let mut h = Harness::new(catalog);

    let caller_a = h.spawn(0x20);
    h.frame(16);
    let talk_a = h.talk_threads()[0];
    h.frame(16);
    assert!(h.engine.is_talk_thread_active());

    let caller_b = h.spawn(0x30);
    h.frame(16);
    assert!(!h.live(talk_a));
    assert_eq!(h.talk_threads().len(), 1);
    assert_eq!(h.pause_ctr(caller_a), 1);
    let host_events = h.host.events();
    assert!(host_events.contains(&HostEvent::RemoveText));
    assert!(host_events.contains(&HostEvent::StartSequenceActor {
        object_id: ACTOR_A,
        sequence_id: 0x60002,
    }));

    h.frame(16);
    h.frame(1_000);
    h.frame(16);

    assert!(h.has_event(&format!("script.log {caller_b} b.done")));
    assert!(!h.live(caller_b));
    assert!(h.live(caller_a));
    assert!(h.events_with_prefix(&format!("script.log {caller_a}")).is_empty());
    assert!(h.host.events().contains(&HostEvent::StartSequenceActor {
        object_id: ACTOR_B,
        sequence_id: 0x60012,
    }));
}

#[test]
fn skip_flips_pages_then_ends_the_line() {
    let mut h = Harness::new(talk_catalog());
    let talk = h
        .engine
        .start_talk_thread(request(ACTOR_A, 5, 0x60000), None);

    h.frame(16);
    h.host.press(InputEvent::Skip);
    h.frame(16);
    h.host.press(InputEvent::Skip);
    h.frame(16);

    assert!(!h.live(talk));
    assert_eq!(
        h.host.events(),
        vec![
            HostEvent::ShowText {
                object_id: ACTOR_A,
                text: "First page".to_string(),
            },
            HostEvent::StartTalkActor {
                object_id: ACTOR_A,
                sequence_id: 0x60001,
                thread_id: talk,
            },
            HostEvent::RemoveText,
            HostEvent::ShowText {
                object_id: ACTOR_A,
                text: "Second page".to_string(),
            },
            HostEvent::RemoveText,
            HostEvent::StartSequenceActor {
                object_id: ACTOR_A,
                sequence_id: 0x60002,
            },
            HostEvent::ClearNotifyThreadId { object_id: ACTOR_A },
        ]
    );
}

#[test]
fn narration_ignores_skip() {
    let mut h = Harness::new(talk_catalog());
    let talk = h.engine.start_talk_thread(request(0, 1, 0x60000), None);

    h.frame(16);
    h.host.press(InputEvent::Skip);
    h.frame(16);
    assert!(h.live(talk));

    h.frame(1_000);
    assert!(!h.live(talk));
}

#[test]
fn pausing_hides_the_line_and_resuming_restores_it() {
    let host = RecordingHost::new().with_voice_timing(1, 100);
    let mut h = Harness::with_host(talk_catalog(), EngineConfig::default(), host);
    h.engine.enter_scene(1000, None);
    let talk = h
        .engine
        .start_talk_thread(request(ACTOR_A, 6, 0x60000), None);

    h.frame(16);
    h.frame(16);
    assert!(h.host.events().contains(&HostEvent::StartVoice));
    h.host.clear_events();

    h.engine.enter_pause(None);
    h.frame(5_000);
    h.engine.leave_pause(None);

    let events = h.host.events();
    assert!(events.contains(&HostEvent::StopVoice));
    let hidden = events.iter().position(|event| *event == HostEvent::RemoveText);
    let shown = events.iter().position(|event| {
        *event
            == HostEvent::ShowText {
                object_id: ACTOR_A,
                text: "Hold that thought".to_string(),
            }
    });
    assert!(hidden.is_some() && shown.is_some() && hidden < shown);
    assert!(h.live(talk));
    assert_eq!(h.engine.talk_stage(talk), Some(TalkStage::Speaking));
}

#[test]
fn killing_a_talk_keeps_its_caller_parked_and_skips_the_idle_sequence() {
    let mut h = Harness::new(talk_catalog());
    let waiter = h.spawn(0x10);
    h.engine.suspend_thread(waiter);
    let talk = h
        .engine
        .start_talk_thread(request(ACTOR_A, 1, 0x60000), Some(waiter));
    h.frame(16);

    h.engine.kill_thread(talk);

    assert!(!h.live(talk));
    assert_eq!(h.pause_ctr(waiter), 1);
    assert!(!h
        .host
        .events()
        .iter()
        .any(|event| matches!(event, HostEvent::StartSequenceActor { .. })));
}

#[test]
fn ending_talk_threads_wakes_their_callers() {
    let mut h = Harness::new(talk_catalog());
    let waiter = h.spawn(0x10);
    h.engine.suspend_thread(waiter);
    h.engine
        .start_talk_thread(request(ACTOR_A, 1, 0x60000), Some(waiter));
    h.frame(16);

    h.engine.end_talk_threads();

    assert!(h.talk_threads().is_empty());
    assert_eq!(h.pause_ctr(waiter), 0);
}

#[test]
fn preempting_a_talk_during_its_voice_cue_stops_the_voice() {
    let host = RecordingHost::new().with_voice_timing(10, 10);
    let mut h = Harness::with_host(talk_catalog(), EngineConfig::default(), host);
    let talk_a = h
        .engine
        .start_talk_thread(request(ACTOR_A, 6, 0x60000), None);

    h.frame(16);
    assert_eq!(h.engine.talk_stage(talk_a), Some(TalkStage::WaitForVoiceCue));

    h.engine.start_talk_thread(request(ACTOR_B, 1, 0x60010), None);

    assert!(!h.live(talk_a));
    assert_eq!(
        h.host.events(),
        vec![
            HostEvent::CueVoice {
                name: "v006".to_string(),
            },
            HostEvent::StopVoice,
        ]
    );
}

#[test]
fn a_talk_ended_before_its_cue_leaves_the_voice_alone() {
    let mut h = Harness::new(talk_catalog());
    let talk = h
        .engine
        .start_talk_thread(request(ACTOR_A, 6, 0x60000), None);

    h.engine.end_talk_threads();

    assert!(!h.live(talk));
    assert!(h.host.events().is_empty());
}
