use anyhow::{Context, Result};
use marketing_cms::{
    config::{self, StorageBackend},
    db, routes,
    services::{
        auth_service::AuthService,
        contact_service::ContactService,
        content_service::ContentService,
        image_manager::ImageManager,
        local_store::LocalObjectStore,
        mailer::{MailConfig, Mailer, SmtpMailer},
        object_store::ObjectStore,
        records::RecordService,
        supabase_store::SupabaseObjectStore,
    },
    state::AppState,
};
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config + mode flags ---
    let (cfg, args) = config::AppConfig::from_env_and_args()?;

    tracing::info!(
        addr = %cfg.addr(),
        database = %cfg.database_url,
        backend = ?cfg.storage_backend,
        public_base_url = %cfg.public_base_url,
        "starting marketing-cms"
    );

    // --- Initialize SQLite connection ---
    let db = Arc::new(db::connect(&cfg.database_url).await?);
    let statements = db::apply_schema(&db).await.context("applying schema")?;
    tracing::debug!("Applied {} schema statements", statements);

    // --- Handle migration mode ---
    if args.migrate {
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Image store ---
    let (store, local_store): (Arc<dyn ObjectStore>, Option<Arc<LocalObjectStore>>) =
        match (cfg.storage_backend, &cfg.supabase) {
            (StorageBackend::Supabase, Some(supabase)) => (
                Arc::new(SupabaseObjectStore::new(supabase, cfg.store_timeout)?) as Arc<dyn ObjectStore>,
                None,
            ),
            _ => {
                if !Path::new(&cfg.storage_dir).exists() {
                    fs::create_dir_all(&cfg.storage_dir)?;
                    tracing::info!("Created storage directory at {}", cfg.storage_dir);
                }
                let local = Arc::new(LocalObjectStore::new(
                    cfg.storage_dir.clone(),
                    cfg.public_base_url.clone(),
                ));
                (local.clone() as Arc<dyn ObjectStore>, Some(local))
            }
        };

    let images = ImageManager::new(db.clone(), store).with_sweep_min_age(cfg.sweep_min_age);

    // --- Handle sweep mode ---
    if args.sweep {
        let report = images.sweep_unused().await?;
        tracing::info!(
            scanned = report.scanned,
            referenced = report.referenced,
            skipped_recent = report.skipped_recent,
            deleted = report.deleted.len(),
            failed = report.failed,
            "Storage sweep complete."
        );
        return Ok(());
    }

    // --- Initialize services ---
    let mailer: Option<Arc<dyn Mailer>> = match MailConfig::from_env() {
        Some(mail) => Some(Arc::new(SmtpMailer::new(mail).context("configuring SMTP")?) as Arc<dyn Mailer>),
        None => {
            tracing::warn!("SMTP_HOST is not set; outbound mail is disabled");
            None
        }
    };
    let jwt = Arc::new(cfg.jwt.clone());
    let auth = AuthService::new(
        db.clone(),
        jwt.clone(),
        mailer.clone(),
        cfg.reset_url_base.clone(),
    );
    if let Some((email, password)) = &cfg.bootstrap_admin {
        if auth.ensure_admin(email, password).await? {
            tracing::info!("Bootstrapped admin account {}", email);
        }
    }

    let state = AppState {
        db: db.clone(),
        images,
        records: RecordService::new(db.clone()),
        content: ContentService::new(db.clone()),
        contact: ContactService::new(db.clone(), mailer, cfg.contact_inbox.clone()),
        auth,
        jwt,
        local_store,
    };

    // --- Build router ---
    let app = routes::routes::app(state, cfg.max_upload_bytes, &cfg.cors_origins);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
