use std::env;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;

use glam::Vec2;
use tokio::task::LocalSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use luaflow::{
    Application, Config, EntityRegistry, FollowCamera, ScriptValue, SceneObject, TimedAnimator,
};

const USAGE: &str = "usage: luaflow [--config <path>] <chapter> <name>";

struct Args {
    config_path: String,
    chapter: u32,
    name: String,
}

fn parse_args() -> Result<Args, String> {
    let mut config_path = "config.toml".to_string();
    let mut positional = Vec::new();
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        if arg == "--config" {
            config_path = args.next().ok_or("--config needs a path")?;
        } else {
            positional.push(arg);
        }
    }

    let [chapter, name] = <[String; 2]>::try_from(positional).map_err(|_| USAGE.to_string())?;
    let chapter = chapter
        .parse()
        .map_err(|_| format!("invalid chapter '{}'", chapter))?;
    Ok(Args {
        config_path,
        chapter,
        name,
    })
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Load configuration
    let config = match Config::load_with_env(&args.config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", args.config_path);
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    if let Err(e) = luaflow::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        luaflow::logging::init_console_only(&config.logging.level);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let local = LocalSet::new();
    let completed = local.block_on(&runtime, run(config, args.chapter, &args.name));
    if completed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Build a small demo scene and play one cutscene in it.
async fn run(config: Config, chapter: u32, name: &str) -> bool {
    let scene = Rc::new(EntityRegistry::new());
    let animator = Rc::new(
        TimedAnimator::new()
            .with_clip("wave", Duration::from_millis(800))
            .with_clip("bow", Duration::from_millis(1200)),
    );
    scene.register_all([
        SceneObject::new("Player").with_animator(animator).into_ref(),
        SceneObject::new("Guide")
            .at(6.0, 0.0)
            .with_animator(Rc::new(TimedAnimator::new()))
            .into_ref(),
    ]);
    let camera = Rc::new(FollowCamera::new(Vec2::new(0.0, 1.5)));

    let tick = config.playback.tick_interval();
    let app = match Application::builder(config)
        .with_resolver(scene)
        .with_camera(camera.clone())
        .build()
    {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to build application: {}", e);
            return false;
        }
    };

    let registered = app
        .actions()
        .register_with("say", |line: String| {
            info!("say: {}", line);
            Ok(())
        })
        .and_then(|()| {
            app.actions().register_async_with("pause", |seconds: f64| async move {
                let pause = Duration::try_from_secs_f64(seconds.clamp(0.0, 60.0));
                tokio::time::sleep(pause.unwrap_or_default()).await;
                Ok(())
            })
        });
    if let Err(e) = registered {
        error!("Failed to register demo actions: {}", e);
        return false;
    }
    app.events().subscribe_with("chapter_marker", |value: &ScriptValue| {
        info!("Reached marker {}", value);
        Ok(())
    });

    let camera_token = CancellationToken::new();
    let camera_loop = {
        let token = camera_token.clone();
        let camera = Rc::clone(&camera);
        tokio::task::spawn_local(async move { camera.run(tick, token).await })
    };

    let completed = app.play(chapter, name).await;
    if completed {
        info!("Cutscene Chap{}/{} finished", chapter, name);
    }

    camera_token.cancel();
    let _ = camera_loop.await;
    app.shutdown();
    completed
}
