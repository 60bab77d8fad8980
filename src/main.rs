use std::sync::Arc;

use anyhow::Context;
use fleet_api::{
    build_api_route_filter,
    clock::SystemClock,
    config::Settings,
    handle_api_errors,
    memory::{InMemoryCredentialStore, InMemoryVehicleStore},
    Auth, AuthConfig, Fleet, Identifier, Role,
};
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warp::Filter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleet_api=info,warp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // a missing .env file is fine, the variables may come from the environment
    let _ = dotenvy::dotenv();

    let settings = Settings::from_env().context("failed to load configuration")?;
    tracing::info!(?settings, "configuration loaded");

    let auth = Auth::new(AuthConfig {
        signing_key: settings.signing_key.clone(),
        token_lifetime: settings.token_lifetime,
        clock: Arc::new(SystemClock),
        credential_store: Arc::new(Mutex::new(InMemoryCredentialStore::new())),
    })
    .context("failed to set up authentication")?;

    let fleet = Fleet::new(Arc::new(Mutex::new(InMemoryVehicleStore::new())));

    if let Some(seed) = &settings.seed_admin {
        auth.create_credential(Identifier(seed.email.clone()), &seed.password, Role::Adm)
            .await
            .context("failed to create the initial administrator")?;
    } else {
        tracing::warn!("no SEED_ADMIN_EMAIL/SEED_ADMIN_PASSWORD set, nobody will be able to log in");
    }

    let routes = build_api_route_filter(&auth, &fleet)
        .recover(handle_api_errors)
        .with(warp::trace::request());

    tracing::info!(addr = %settings.bind_addr, "listening");
    warp::serve(routes).run(settings.bind_addr).await;

    Ok(())
}
