mod config;
mod error;
mod logging;
mod runtime;
pub mod services;

pub use error::AppError;

pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let config = config::AppConfig::from_env()?;

    tracing::info!(
        data_path = %config.data_path,
        http_bind = %config.http_bind,
        "application bootstrap initialized"
    );

    runtime::run(config)
}
