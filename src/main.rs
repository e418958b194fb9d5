use particle_flow::{app, FlowConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => match FlowConfig::load(&path) {
            Ok(config) => {
                log::info!("loaded config from {path}");
                config
            }
            Err(e) => {
                log::error!("{path}: {e}");
                std::process::exit(1);
            }
        },
        None => FlowConfig::default(),
    };

    if let Err(e) = app::run(config) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
