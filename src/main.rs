use std::{error::Error as StdError, future::IntoFuture, num::NonZeroUsize, process, sync::Arc};

use konut::{
    application::{
        admin::{AdminAmenityService, AdminConfigService, AdminListingService},
        distances::{DistanceSelection, NearestDistanceService},
        error::AppError,
        listings::ListingFeedService,
        nearby::NearbyService,
        proximity::ProximityCacheService,
        repos::{
            AmenitiesWriteRepo, ConfigRepo, HealthRepo, ListingsRepo, ListingsWriteRepo,
            NearestDistanceRepo, ProximityCacheRepo, SpatialRepo,
        },
    },
    cache::ProximityTrigger,
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, HttpState},
        telemetry,
    },
};
use tokio::{select, sync::watch, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let mut causes = Vec::new();
    let mut current = StdError::source(error);
    while let Some(cause) = current {
        causes.push(cause.to_string());
        current = cause.source();
    }

    if dispatcher::has_been_set() {
        error!(error = %error, causes = ?causes, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, causes = ?causes, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Proximity(args) => run_proximity(settings, args).await,
        config::Command::Distances(args) => run_distances(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(&repositories);
    serve_http(&settings, app.http_state, app.admin_state).await
}

async fn run_proximity(
    settings: config::Settings,
    args: config::ProximityArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let proximity = build_proximity_service(&repositories);

    let limits = proximity.load_limits().await?;
    println!("Configuration loaded:");
    print!("{limits}");

    if args.invalidate || args.invalidate_only {
        let removed = proximity.invalidate_all().await?;
        println!("Removed {removed} cached proximity rows.");
    }

    if args.invalidate_only {
        return Ok(());
    }

    let concurrency = NonZeroUsize::new(args.concurrency).unwrap_or(NonZeroUsize::MIN);

    info!(
        target = "konut::proximity",
        concurrency = concurrency.get(),
        invalidate = args.invalidate,
        "Starting proximity recompute"
    );

    let report = proximity.compute_all(concurrency).await?;
    print!("{report}");

    if report.has_failures() {
        return Err(AppError::BatchFailed {
            task: "proximity recompute",
            failed: report.failed,
            total: report.total,
        });
    }

    Ok(())
}

async fn run_distances(
    settings: config::Settings,
    args: config::DistancesArgs,
) -> Result<(), AppError> {
    let selection = DistanceSelection::from_parts(args.listing_id, args.all, Some(args.limit))?;
    let repositories = init_repositories(&settings).await?;
    let distances = build_distance_service(&repositories);

    info!(
        target = "konut::distances",
        selection = ?selection,
        "Starting nearest distance update"
    );

    let report = distances.update(selection).await?;
    print!("{report}");

    if report.has_failures() {
        return Err(AppError::BatchFailed {
            task: "nearest distance update",
            failed: report.failed,
            total: report.selected,
        });
    }

    Ok(())
}

struct ApplicationContext {
    http_state: HttpState,
    admin_state: AdminState,
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or(InfraError::MissingDatabaseUrl)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::Connect)?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_proximity_service(repositories: &Arc<PostgresRepositories>) -> Arc<ProximityCacheService> {
    let listings_repo: Arc<dyn ListingsRepo> = repositories.clone();
    let spatial_repo: Arc<dyn SpatialRepo> = repositories.clone();
    let config_repo: Arc<dyn ConfigRepo> = repositories.clone();
    let cache_repo: Arc<dyn ProximityCacheRepo> = repositories.clone();

    Arc::new(ProximityCacheService::new(
        listings_repo,
        spatial_repo,
        config_repo,
        cache_repo,
    ))
}

fn build_distance_service(
    repositories: &Arc<PostgresRepositories>,
) -> Arc<NearestDistanceService> {
    let listings_repo: Arc<dyn ListingsRepo> = repositories.clone();
    let spatial_repo: Arc<dyn SpatialRepo> = repositories.clone();
    let config_repo: Arc<dyn ConfigRepo> = repositories.clone();
    let distance_repo: Arc<dyn NearestDistanceRepo> = repositories.clone();

    Arc::new(NearestDistanceService::new(
        listings_repo,
        spatial_repo,
        config_repo,
        distance_repo,
    ))
}

fn build_application_context(repositories: &Arc<PostgresRepositories>) -> ApplicationContext {
    let listings_repo: Arc<dyn ListingsRepo> = repositories.clone();
    let listings_write_repo: Arc<dyn ListingsWriteRepo> = repositories.clone();
    let amenities_write_repo: Arc<dyn AmenitiesWriteRepo> = repositories.clone();
    let spatial_repo: Arc<dyn SpatialRepo> = repositories.clone();
    let config_repo: Arc<dyn ConfigRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories.clone();

    let proximity = build_proximity_service(repositories);
    let distances = build_distance_service(repositories);
    let trigger = Arc::new(ProximityTrigger::new(proximity.clone()));

    let feed = Arc::new(ListingFeedService::new(
        listings_repo.clone(),
        spatial_repo.clone(),
        config_repo.clone(),
        proximity.clone(),
    ));
    let nearby = Arc::new(NearbyService::new(spatial_repo, config_repo.clone()));

    let admin_listings = Arc::new(
        AdminListingService::new(listings_repo.clone(), listings_write_repo)
            .with_trigger(trigger.clone()),
    );
    let admin_amenities =
        Arc::new(AdminAmenityService::new(amenities_write_repo).with_trigger(trigger));
    let admin_config = Arc::new(AdminConfigService::new(config_repo));

    let http_state = HttpState {
        feed,
        nearby,
        proximity: proximity.clone(),
        distances: distances.clone(),
        listings: listings_repo,
        health: health_repo.clone(),
    };

    let admin_state = AdminState {
        listings: admin_listings,
        amenities: admin_amenities,
        config: admin_config,
        proximity,
        distances,
        health: health_repo,
    };

    ApplicationContext {
        http_state,
        admin_state,
    }
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(InfraError::bind(settings.server.public_addr))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(InfraError::bind(settings.server.admin_addr))?;

    info!(
        target = "konut::serve",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "Listening"
    );

    let (stop_tx, stop_rx) = watch::channel(false);

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(wait_for_stop(stop_rx.clone()))
        .into_future();
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(wait_for_stop(stop_rx))
        .into_future();

    let servers = async { try_join!(public_server, admin_server) };
    tokio::pin!(servers);

    let result = select! {
        result = &mut servers => result,
        _ = tokio::signal::ctrl_c() => {
            info!(target = "konut::serve", "Shutdown requested, draining connections");
            let _ = stop_tx.send(true);
            match tokio::time::timeout(settings.server.graceful_shutdown, &mut servers).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        target = "konut::serve",
                        timeout_secs = settings.server.graceful_shutdown.as_secs(),
                        "Graceful shutdown timed out"
                    );
                    Ok(((), ()))
                }
            }
        }
    };

    result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
    Ok(())
}

async fn wait_for_stop(mut stop: watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}
