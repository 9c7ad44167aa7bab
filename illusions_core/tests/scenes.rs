mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{log_and_finish, yield_forever, Harness};
use illusions_core::{
    Engine, EngineConfig, HostEvent, SceneInfo, StaticCatalog, ThreadId, TriggerCallback,
    TriggerKey, UpdateStatus,
};

const GLOBAL: u32 = 0x0001_0003;
const ERROR_SCENE: u32 = 0x0001_0010;

fn catalog_with_scenes(scenes: &[u32]) -> StaticCatalog {
    let mut catalog = StaticCatalog::new(4);
    catalog.add_code(0x10, || yield_forever);
    for &scene_id in scenes {
        catalog.add_scene(SceneInfo::new(scene_id));
    }
    catalog
}

#[test]
fn exiting_a_scene_tears_down_everything_it_owns() {
    let mut h = Harness::new(catalog_with_scenes(&[1000]));
    let global = h.spawn(0x10);
    h.engine
        .add_update_function(0, 0, Box::new(|_| UpdateStatus::Next));
    assert!(h.engine.enter_scene(1000, None));
    let scene_thread = h.spawn(0x10);
    let caller = h.spawn(0x10);
    let timer = h
        .engine
        .start_timer_thread(5_000, None, false)
        .expect("timer starts");
    h.engine
        .cause_declare(1, 0, 7, |_: &mut Engine, _: &TriggerKey, _: Option<ThreadId>| {});
    h.engine
        .add_update_function(10, 1000, Box::new(|_| UpdateStatus::Next));
    h.engine.load_resource(0x000D_0001, 1000, Some(caller));

    h.engine.exit_scene(Some(caller));

    assert!(h.live(global));
    assert!(h.live(caller));
    assert!(!h.live(scene_thread));
    assert!(!h.live(timer));
    assert!(h.engine.triggers().is_empty());
    assert_eq!(h.engine.update_function_count(), 1);
    assert!(h.engine.active_scenes().is_empty());
    assert!(h.host.loaded_resources().is_empty());
    let host_events = h.host.events();
    assert!(host_events.contains(&HostEvent::DestroyControls { scene_id: 1000 }));
    assert!(host_events.contains(&HostEvent::UnloadScene { scene_id: 1000 }));
}

#[test]
fn dumping_to_the_base_scene_exits_each_level_once() {
    let mut h = Harness::new(catalog_with_scenes(&[1000, 2000, 3000]));
    for scene_id in [1000, 2000, 3000] {
        assert!(h.engine.enter_scene(scene_id, None));
    }

    h.engine.dump_active_scenes(1000, None);

    assert_eq!(
        h.events_with_prefix("scene.exit"),
        vec!["scene.exit 3000".to_string(), "scene.exit 2000".to_string()]
    );
    assert_eq!(h.engine.active_scenes().len(), 1);
    assert_eq!(h.engine.current_scene(), 1000);
    assert_eq!(h.host.events().last(), Some(&HostEvent::ClearCameraModeStack));
}

#[test]
fn dumping_to_an_absent_scene_empties_the_stack() {
    let mut h = Harness::new(catalog_with_scenes(&[1000, 2000]));
    h.engine.enter_scene(1000, None);
    h.engine.enter_scene(2000, None);

    h.engine.dump_active_scenes(42, None);

    assert!(h.engine.active_scenes().is_empty());
    assert_eq!(h.events_with_prefix("scene.exit").len(), 2);
}

#[test]
fn missing_scene_falls_back_to_the_error_scene() {
    let mut h = Harness::new(catalog_with_scenes(&[GLOBAL, 1000]));
    h.engine.enter_scene(GLOBAL, None);
    h.engine.enter_scene(1000, None);

    assert!(!h.engine.enter_scene(0x0001_DEAD, None));

    let stack: Vec<u32> = h
        .engine
        .active_scenes()
        .iter()
        .map(|entry| entry.scene_id)
        .collect();
    assert_eq!(stack, vec![GLOBAL, ERROR_SCENE]);
    assert_eq!(h.events_with_prefix("scene.exit"), vec!["scene.exit 1000".to_string()]);
}

#[test]
fn configured_fallback_scenes_are_honoured() {
    let config = EngineConfig {
        global_scene_id: 1,
        error_scene_id: 2,
        ..EngineConfig::default()
    };
    let mut h = Harness::with_config(catalog_with_scenes(&[1]), config);
    h.engine.enter_scene(1, None);

    assert!(!h.engine.enter_scene(77, None));
    assert_eq!(h.engine.current_scene(), 2);
    assert_eq!(h.engine.active_scenes().len(), 2);
}

#[test]
fn pause_and_leave_pause_mirror_each_other() {
    let mut h = Harness::new(catalog_with_scenes(&[1000]));
    h.engine.enter_scene(1000, None);
    let worker = h.spawn(0x10);
    let pauser = h.spawn(0x10);

    h.engine.enter_pause(Some(pauser));
    assert_eq!(h.host.camera_depth(), 1);
    assert_eq!(h.pause_ctr(worker), 1);
    assert_eq!(h.pause_ctr(pauser), 0);
    assert_eq!(
        h.engine.active_scenes().active_scene_info(1).map(|scene| scene.pause_ctr),
        Ok(1)
    );

    h.engine.leave_pause(Some(pauser));
    assert_eq!(h.host.camera_depth(), 0);
    assert_eq!(h.pause_ctr(worker), 0);
    assert!(h.engine.is_scene_active(1000));
    let host_events = h.host.events();
    assert!(host_events.contains(&HostEvent::PauseControls { scene_id: 1000 }));
    assert!(host_events.contains(&HostEvent::UnpauseControls { scene_id: 1000 }));
}

#[test]
fn scene_entry_code_runs_as_a_scene_thread() {
    let mut catalog = catalog_with_scenes(&[]);
    catalog.add_scene(SceneInfo::new(2000).with_entry_code(0x60));
    catalog.add_code_factory(0x60, log_and_finish("entered"));
    let mut h = Harness::new(catalog);

    assert!(h.engine.enter_scene(2000, None));
    let entry = h.engine.threads().thread_ids()[0];
    assert_eq!(h.engine.thread_scene_id(entry), Some(2000));

    h.frame(16);
    assert!(h.has_event(&format!("script.log {entry} entered")));
}

#[test]
fn scene_info_positions_count_from_the_bottom() {
    let mut h = Harness::new(catalog_with_scenes(&[1000, 2000]));
    h.engine.enter_scene(1000, None);
    h.engine.enter_scene(2000, None);
    let scenes = h.engine.active_scenes();

    assert_eq!(scenes.active_scene_info(1).map(|s| s.scene_id), Ok(1000));
    assert_eq!(scenes.active_scene_info(2).map(|s| s.scene_id), Ok(2000));
    assert!(scenes.active_scene_info(0).is_err());
    assert!(scenes.active_scene_info(3).is_err());
}

struct Counted {
    runs: Rc<Cell<u32>>,
    drops: Rc<Cell<u32>>,
}

impl TriggerCallback for Counted {
    fn run(&mut self, _: &mut Engine, _: &TriggerKey, _: Option<ThreadId>) {
        self.runs.set(self.runs.get() + 1);
    }
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

#[test]
fn redeclaring_a_cause_drops_the_first_callback() {
    let mut h = Harness::new(catalog_with_scenes(&[1000]));
    h.engine.enter_scene(1000, None);
    let (first_runs, first_drops) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
    let (second_runs, second_drops) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));

    let replaced = h.engine.cause_declare(
        4,
        0,
        0x40010,
        Counted {
            runs: Rc::clone(&first_runs),
            drops: Rc::clone(&first_drops),
        },
    );
    assert!(!replaced);
    let replaced = h.engine.cause_declare(
        4,
        0,
        0x40010,
        Counted {
            runs: Rc::clone(&second_runs),
            drops: Rc::clone(&second_drops),
        },
    );
    assert!(replaced);
    assert_eq!(first_drops.get(), 1);

    assert_eq!(h.engine.cause_trigger(1000, 4, 0, 0x40010, None), None);
    assert_eq!(first_runs.get(), 0);
    assert_eq!(second_runs.get(), 1);

    h.engine.exit_scene(None);
    assert_eq!(second_drops.get(), 1);
}

#[test]
fn native_cause_wins_over_the_scripted_one() {
    let mut catalog = catalog_with_scenes(&[]);
    catalog.add_scene(SceneInfo::new(1000).with_cause(1, 2, 3, 0x50));
    catalog.add_code_factory(0x50, log_and_finish("scripted"));
    let mut h = Harness::new(catalog);
    h.engine.enter_scene(1000, None);
    let waiter = h.spawn(0x10);
    h.engine.suspend_thread(waiter);

    assert!(h.engine.cause_is_declared(1000, 1, 2, 3));
    let spawned = h.engine.cause_trigger(1000, 1, 2, 3, Some(waiter));
    assert!(spawned.is_some());
    h.frame(16);
    assert_eq!(h.events_with_prefix("script.log").len(), 1);
    assert_eq!(h.pause_ctr(waiter), 0);

    h.engine.suspend_thread(waiter);
    h.engine.cause_declare(
        1,
        2,
        3,
        |engine: &mut Engine, _: &TriggerKey, caller: Option<ThreadId>| {
            let mut caller = caller;
            engine.notify_thread_id(&mut caller);
        },
    );
    assert_eq!(h.engine.cause_trigger(1000, 1, 2, 3, Some(waiter)), None);
    assert_eq!(h.pause_ctr(waiter), 0);
    assert_eq!(h.engine.threads().len(), 1);
}

#[test]
fn undeclared_cause_starts_nothing() {
    let mut h = Harness::new(catalog_with_scenes(&[1000]));
    h.engine.enter_scene(1000, None);
    assert!(!h.engine.cause_is_declared(1000, 9, 9, 9));
    assert_eq!(h.engine.cause_trigger(1000, 9, 9, 9, None), None);
    assert!(h.engine.threads().is_empty());
}
