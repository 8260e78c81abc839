use std::process::ExitCode;

use postfx::{AppConfig, PostProcessDemo, SceneAssets};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let assets = SceneAssets::from_env();
    log::info!("scene assets: {assets:?}");

    match postfx::run::<PostProcessDemo>(AppConfig::new(), assets) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error}");
            ExitCode::FAILURE
        }
    }
}
