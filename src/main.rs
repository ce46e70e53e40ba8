use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = clinic_cms::config::Config::from_env()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_type = %cfg.database_type.as_deref().unwrap_or("<default>"),
        database_url = %cfg.database_url,
        supabase_url = %cfg.supabase_url.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        listen_addr = %cfg.listen_addr,
        upload_dir = %cfg.upload_dir,
        loglevel = %cfg.loglevel,
    );

    // One store for the whole process; a construction failure ends startup.
    let store = match clinic_cms::db::open_store(&cfg).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "failed to open content store");
            return Err(e.into());
        }
    };

    match (cfg.admin_username.as_deref(), cfg.admin_password.as_deref()) {
        (Some(username), Some(password)) => {
            if let Err(e) =
                clinic_cms::service::admin::ensure_admin(store.as_ref(), username, password).await
            {
                warn!(username = %username, error = %e, "failed to seed admin user");
            }
        }
        (Some(_), None) | (None, Some(_)) => {
            warn!("ADMIN_USERNAME and ADMIN_PASSWORD must be set together; skipping admin seed");
        }
        (None, None) => {}
    }

    let images = clinic_cms::storage::open_image_store(&cfg)?;

    let cookie_key = clinic_cms::router::cookie_key(cfg.cookie_secret.as_deref());
    let state = clinic_cms::router::CmsState::new(store, images, cookie_key, cfg.insecure_cookie);
    let app = clinic_cms::router::cms_router(state);

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
