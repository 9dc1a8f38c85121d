use std::path::PathBuf;

use anyhow::Context;
use rig_engine::sim::demo_model;
use rig_engine::Controller;
use rig_shared::{
    ControllerConfig, PARAM_BREATH, PARAM_CHEEK, PARAM_EYE_L_OPEN, PARAM_MOUTH_OPEN_Y, SequenceStep,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const FRAME_MS: f64 = 1000.0 / 60.0;

const SCRIPT: &str = r#"[
    {"motionIndex": 2, "faceIndex": 1, "cheek": 1, "timeMs": 1200},
    {"eyeOpen": 0, "timeMs": 400},
    {"eyeOpen": 1, "faceIndex": 0, "timeMs": 800}
]"#;

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config =
        ControllerConfig::load(config_path.as_deref()).context("loading controller config")?;
    info!(?config_path, "[Headless] starting");

    let model = demo_model();
    let settings = model.settings(&["f_01.exp3.json", "f_02.exp3.json", "f_03.exp3.json"]);
    let mut controller = Controller::new(model, settings, config);
    let choices = controller.subscribe_random_choices();

    info!("[Headless] gesture");
    controller.start_motion("", 1);
    run(&mut controller, 3000.0);

    info!("[Headless] random personality");
    controller.click_play_random();
    for choice in choices.try_iter() {
        info!(choice = %serde_json::to_string(&choice)?, "random choice");
    }
    run(&mut controller, 4500.0);

    info!("[Headless] scripted sequence");
    let steps = SequenceStep::list_from_json(SCRIPT).context("parsing sequence script")?;
    controller.play_steps(&steps);
    run(&mut controller, 3000.0);

    controller.stop_sequence();
    info!("[Headless] done");
    Ok(())
}

/// Step the controller and log a parameter snapshot every half second.
fn run(controller: &mut Controller<rig_engine::sim::HeadlessModel>, total_ms: f64) {
    let mut elapsed = 0.0;
    let mut next_log = 0.0;
    while elapsed < total_ms {
        controller.update_frame(FRAME_MS);
        elapsed += FRAME_MS;
        if elapsed >= next_log {
            next_log += 500.0;
            let m = controller.engine();
            info!(
                t = m.time_secs(),
                motion = m.active_motion().unwrap_or("-"),
                angle_x = m.parameter("ParamAngleX").unwrap_or_default(),
                eye = m.parameter(PARAM_EYE_L_OPEN).unwrap_or_default(),
                cheek = m.parameter(PARAM_CHEEK).unwrap_or_default(),
                mouth = m.parameter(PARAM_MOUTH_OPEN_Y).unwrap_or_default(),
                breath = m.parameter(PARAM_BREATH).unwrap_or_default(),
                playing = controller.is_playing(),
                "frame"
            );
        }
    }
}
