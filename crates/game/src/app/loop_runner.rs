use std::process::ExitCode;

use isoworld_engine::run_app;
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    if let Err(err) = run_app(&app.config, app.paths.asset_dir) {
        error!(error = %err, "run_failed");
        return ExitCode::FAILURE;
    }

    info!("exit_clean");
    ExitCode::SUCCESS
}
