use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};

use crate::adapters::api::{ApiState, configure_routes};
use crate::adapters::store::CsvUsageStore;
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::services::{ServiceError, UsageCommandHandler, UsageSessionService};
use crate::domain::grouping::BackfillOutcome;

pub fn run(config: AppConfig) -> Result<(), AppError> {
    let store = CsvUsageStore::new(config.data_path.as_str());
    let usage = UsageSessionService::new(Arc::new(Mutex::new(store)));

    // Session ids missing from an imported store are rebuilt once at
    // startup. A partially grouped store is left untouched and reported
    // instead of being regrouped.
    match usage.backfill() {
        Ok(BackfillOutcome::Applied { sessions_created }) => {
            tracing::info!(sessions_created, "startup backfill applied");
        }
        Ok(BackfillOutcome::AlreadyGrouped) => {}
        Err(ServiceError::Backfill(error)) => {
            tracing::warn!(error = %error, "startup backfill skipped");
        }
        Err(error) => return Err(AppError::runtime(error)),
    }

    let api_state = ApiState { usage };

    tracing::info!(bind = %config.http_bind, "http server starting");

    actix_web::rt::System::new()
        .block_on(async move {
            HttpServer::new(move || {
                App::new()
                    .wrap(Cors::permissive())
                    .app_data(web::Data::new(api_state.clone()))
                    .configure(configure_routes)
            })
            .bind(&config.http_bind)?
            .run()
            .await
        })
        .map_err(AppError::runtime)
}
