//! Scripts driving host actions, events and entities.

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use glam::Vec2;
use tokio::task::LocalSet;

use luaflow::{CameraRig, Entity, FlowError, PlaybackState, ScriptValue};

use common::{recorder, register_record, Stage, WAVE_LENGTH};

#[tokio::test]
async fn test_greet_coerces_parameters() {
    let stage = Stage::new();
    let greetings = recorder();
    let sink = Rc::clone(&greetings);
    stage
        .app
        .actions()
        .register_with("greet", move |name: String| {
            sink.borrow_mut().push(format!("hello {}", name));
            Ok(())
        })
        .unwrap();
    stage.script(
        "greet",
        r#"
        function playCutscene()
            local actions = get("Player"):action()
            actions:exec("greet", "hi")
            actions:exec("greet", 42)
        end
        "#,
    );

    assert!(stage.app.play(1, "greet").await);
    assert_eq!(*greetings.borrow(), vec!["hello hi", "hello 42"]);
}

#[tokio::test]
async fn test_action_failures_stay_in_script() {
    let stage = Stage::new();
    let log = recorder();
    register_record(&stage, &log);
    stage
        .app
        .actions()
        .register("explode", || {
            Err(FlowError::Validation("kaboom".to_string()))
        })
        .unwrap();
    stage
        .app
        .actions()
        .register_with("count", |_: i64| Ok(()))
        .unwrap();
    stage.script(
        "failures",
        r#"
        function playCutscene()
            local actions = get("Player"):action()
            actions:exec("record", tostring(actions:exec("missing")))
            actions:exec("record", tostring(actions:exec("explode")))
            actions:exec("record", tostring(actions:exec("count", "many")))
            actions:exec("record", tostring(actions:exec("count", "7")))
        end
        "#,
    );

    assert!(stage.app.play(1, "failures").await);
    assert_eq!(*log.borrow(), vec!["false", "false", "false", "true"]);
}

#[tokio::test(start_paused = true)]
async fn test_unrepresentable_arguments_are_skipped() {
    let stage = Stage::new();
    let log = recorder();
    register_record(&stage, &log);
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    stage
        .app
        .actions()
        .register_with("count", move |_: i64| {
            counter.set(counter.get() + 1);
            Ok(())
        })
        .unwrap();
    let delivered = Rc::new(Cell::new(0));
    let sink = Rc::clone(&delivered);
    stage
        .app
        .events()
        .subscribe_with("marker", move |_: &ScriptValue| {
            sink.set(sink.get() + 1);
            Ok(())
        });
    stage.script(
        "tables",
        r#"
        function playCutscene()
            local player = get("Player")
            local actions = player:action()
            actions:exec("record", tostring(actions:exec("count", {1, 2})))
            actions:exec("record", tostring(actions:execAsync("count", function() end)))
            actions:exec("record", tostring(player:event():execP("marker", {})))
            actions:exec("record", tostring(actions:exec("count", 3)))
        end
        "#,
    );

    assert!(stage.app.play(1, "tables").await);
    assert_eq!(*log.borrow(), vec!["false", "false", "0", "true"]);
    assert_eq!(calls.get(), 1);
    assert_eq!(delivered.get(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_async_action_is_awaited() {
    let stage = Stage::new();
    let log = recorder();
    register_record(&stage, &log);
    let sink = Rc::clone(&log);
    stage
        .app
        .actions()
        .register_async_with("delay", move |seconds: f64| {
            let sink = Rc::clone(&sink);
            async move {
                tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
                sink.borrow_mut().push(format!("slept {}", seconds));
                Ok(())
            }
        })
        .unwrap();
    stage.script(
        "delay",
        r#"
        function playCutscene()
            local actions = get("Player"):action()
            actions:execAsync("delay", 1.5)
            actions:exec("record", "after")
            actions:exec("record", tostring(actions:exec("delay", 1)))
        end
        "#,
    );

    let started = tokio::time::Instant::now();
    assert!(stage.app.play(1, "delay").await);
    assert!(started.elapsed() >= Duration::from_millis(1500));
    assert_eq!(*log.borrow(), vec!["slept 1.5", "after", "false"]);
}

#[tokio::test]
async fn test_events_reach_subscribers() {
    let stage = Stage::new();
    let pings = Rc::new(Cell::new(0));
    let markers = Rc::new(RefCell::new(Vec::new()));

    let counter = Rc::clone(&pings);
    stage.app.events().subscribe("ping", move || {
        counter.set(counter.get() + 1);
        Ok(())
    });
    let sink = Rc::clone(&markers);
    stage
        .app
        .events()
        .subscribe_with("marker", move |value: &ScriptValue| {
            sink.borrow_mut().push(value.clone());
            Ok(())
        });
    stage
        .app
        .events()
        .subscribe_with("marker", |_: &i64| panic!("scripts publish ScriptValue payloads"));

    let log = recorder();
    register_record(&stage, &log);
    stage.script(
        "events",
        r#"
        function playCutscene()
            local player = get("Player")
            player:event():exec("ping")
            player:event():exec("ping")
            local notified = player:event():execP("marker", 3)
            player:event():execP("marker", "done")
            player:action():exec("record", tostring(notified))
            player:action():exec("record", tostring(player:event():exec("silence")))
        end
        "#,
    );

    assert!(stage.app.play(1, "events").await);
    assert_eq!(pings.get(), 2);
    assert_eq!(
        *markers.borrow(),
        vec![ScriptValue::Integer(3), ScriptValue::from("done")]
    );
    assert_eq!(*log.borrow(), vec!["1", "0"]);
}

#[tokio::test]
async fn test_capabilities_are_identical_per_handle() {
    let stage = Stage::new();
    let log = recorder();
    register_record(&stage, &log);
    stage.script(
        "identity",
        r#"
        function playCutscene()
            local player = get("Player")
            local same = player:move() == player:move()
            local mixed = player:move() == player:transform()
            player:action():exec("record", tostring(same))
            player:action():exec("record", tostring(mixed))
            player:action():exec("record", tostring(player:camera()))
            player:action():exec("record", tostring(get("Nobody") == nil))
        end
        "#,
    );

    assert!(stage.app.play(1, "identity").await);
    assert_eq!(
        *log.borrow(),
        vec!["true", "false", "Camera(Player)", "true"]
    );
}

#[tokio::test]
async fn test_transform_and_visibility() {
    let stage = Stage::new();
    stage.script(
        "place",
        r#"
        function playCutscene()
            local guide = get("Guide")
            local transform = guide:transform()
            transform:setPosition(2, 3)
            transform:setRotation(0, 180)
            transform:setScale(2, 2)
            guide:setActive(false)
            local x, y = transform:position()
            if x ~= 2 or y ~= 3 then error("position not applied") end
        end
        "#,
    );

    assert!(stage.app.play(1, "place").await);
    assert_eq!(stage.guide.position(), Vec2::new(2.0, 3.0));
    assert_eq!(stage.guide.rotation(), Vec2::new(0.0, 180.0));
    assert_eq!(stage.guide.scale(), Vec2::new(2.0, 2.0));
    assert!(!stage.guide.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_move_snaps_to_target() {
    let stage = Stage::new();
    stage.script(
        "walk",
        r#"
        function playCutscene()
            get("Player"):move():to(1, 0)
        end
        "#,
    );

    assert!(stage.app.play(1, "walk").await);
    assert_eq!(stage.player.position(), Vec2::new(1.0, 0.0));
}

#[tokio::test(start_paused = true)]
async fn test_move_speed_override_is_temporary() {
    let stage = Stage::new();
    let log = recorder();
    register_record(&stage, &log);
    stage.script(
        "dash",
        r#"
        function playCutscene()
            local move = get("Player"):move()
            move:speed(2)
            move:to(1, 0, 50)
            get("Player"):action():exec("record", tostring(move:getSpeed()))
        end
        "#,
    );

    let started = tokio::time::Instant::now();
    assert!(stage.app.play(1, "dash").await);
    assert!(started.elapsed() < Duration::from_millis(200));
    assert_eq!(*log.borrow(), vec!["2.0"]);
}

#[tokio::test]
async fn test_non_positive_speed_fails_script() {
    let stage = Stage::new();
    stage.script(
        "stall",
        r#"function playCutscene() get("Player"):move():speed(0) end"#,
    );

    assert!(!stage.app.play(1, "stall").await);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_movement_in_place() {
    let stage = Stage::new();
    stage.script(
        "trek",
        r#"function playCutscene() get("Player"):move():to(100, 0) end"#,
    );

    let canceller = async {
        tokio::time::sleep(Duration::from_secs(2)).await;
        stage.app.cancel();
    };
    let (played, ()) = tokio::join!(stage.app.play(1, "trek"), canceller);

    assert!(!played);
    let stopped_at = stage.player.position();
    assert!(stopped_at.x > 0.0 && stopped_at.x < 100.0);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(stage.player.position(), stopped_at);
}

#[tokio::test(start_paused = true)]
async fn test_detached_move_runs_alongside_script() {
    let stage = Stage::new();
    let log = recorder();
    register_record(&stage, &log);
    stage.script(
        "stroll",
        r#"
        function playCutscene()
            local player = get("Player")
            player:move():toSync(2, 0)
            local x = player:transform():position()
            player:action():exec("record", tostring(x))
        end
        "#,
    );

    assert!(stage.app.play(1, "stroll").await);
    assert_eq!(*log.borrow(), vec!["0.0"]);
    assert_eq!(stage.player.position(), Vec2::new(2.0, 0.0));
    assert_eq!(
        stage.app.orchestrator().last_outcome(),
        Some(PlaybackState::Completed)
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_detached_move() {
    let stage = Stage::new();
    stage.script(
        "wander",
        r#"function playCutscene() get("Player"):move():toSync(100, 0) end"#,
    );

    let canceller = async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(stage.app.cancel());
    };
    let (played, ()) = tokio::join!(stage.app.play(1, "wander"), canceller);

    assert!(!played);
    assert_eq!(
        stage.app.orchestrator().last_outcome(),
        Some(PlaybackState::Cancelled)
    );
    let stopped_at = stage.player.position();
    assert!(stopped_at.x > 0.0 && stopped_at.x < 100.0);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(stage.player.position(), stopped_at);
}

#[tokio::test(start_paused = true)]
async fn test_animation_play_and_flip() {
    let stage = Stage::new();
    stage.script(
        "emote",
        r#"
        function playCutscene()
            local animation = get("Player"):animation()
            animation:play("wave", true)
            animation:play("idle")
            animation:flip(false)
        end
        "#,
    );

    let started = tokio::time::Instant::now();
    assert!(stage.app.play(1, "emote").await);
    assert!(started.elapsed() >= WAVE_LENGTH);
    assert_eq!(stage.animator.played(), vec!["wave", "idle"]);
    assert_eq!(stage.animator.current().as_deref(), Some("idle"));
    assert!(!stage.animator.is_facing_right());
}

#[tokio::test]
async fn test_animation_without_animator_fails_script() {
    let stage = Stage::new();
    stage.script(
        "guide_wave",
        r#"function playCutscene() get("Guide"):animation():play("wave") end"#,
    );

    assert!(!stage.app.play(1, "guide_wave").await);
}

#[tokio::test(start_paused = true)]
async fn test_camera_follow_waits_for_arrival() {
    LocalSet::new()
        .run_until(async {
            let stage = Stage::new();
            let tick = stage.app.config().playback.tick_interval();
            let token = tokio_util::sync::CancellationToken::new();
            let camera = Rc::clone(&stage.camera);
            let loop_token = token.clone();
            let camera_loop =
                tokio::task::spawn_local(async move { camera.run(tick, loop_token).await });

            stage.script(
                "pan",
                r#"function playCutscene() get("Guide"):camera():follow(0.5, true) end"#,
            );
            assert!(stage.app.play(1, "pan").await);

            let target = stage.guide.position() + stage.camera.position_offset();
            assert!(stage.camera.position().distance(target) < 0.1);
            assert_eq!(stage.camera.target_name().as_deref(), Some("Guide"));

            token.cancel();
            camera_loop.await.unwrap();
        })
        .await;
}

#[tokio::test]
async fn test_handle_dies_with_session() {
    let stage = Stage::new();
    stage.script("intro", "function playCutscene() end");
    assert!(stage.app.play(1, "intro").await);

    let session = stage.app.orchestrator().session().unwrap();
    let handle = stage
        .app
        .facade()
        .resolve_in("Player", session.scope())
        .unwrap();
    handle.transform().set_position(3.0, 0.0).unwrap();

    stage.app.shutdown();

    assert!(matches!(
        handle.transform().set_position(9.0, 9.0),
        Err(FlowError::SessionClosed)
    ));
    assert_eq!(stage.player.position(), Vec2::new(3.0, 0.0));
}

#[tokio::test(start_paused = true)]
async fn test_log_and_wait_primitives() {
    let stage = Stage::new();
    stage.script(
        "pause",
        r#"
        function playCutscene()
            log("pausing")
            wait(0.25)
            log({})
        end
        "#,
    );

    let started = tokio::time::Instant::now();
    assert!(stage.app.play(1, "pause").await);
    assert!(started.elapsed() >= Duration::from_millis(250));
}
