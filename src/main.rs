use std::sync::Arc;
use std::time::Duration;
use together::api;
use together::logger::*;
use together::server::*;
use together::settings::*;
use tokio::signal;
use warp::Filter;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

fn check_tls_file(path: &str, what: &str) -> anyhow::Result<()> {
    let meta = std::fs::metadata(path)
        .map_err(|e| anyhow::anyhow!("cannot read TLS {} at {:?}: {}", what, path, e))?;
    if !meta.is_file() {
        return Err(anyhow::anyhow!("TLS {} is not a regular file: {:?}", what, path));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let settings = parse_settings(cli.settings.as_deref())?;
    info!(?settings);
    logger.reload_from_config(&LogConfig {
        filter: settings.log.filter.clone(),
    })?;

    let address: std::net::SocketAddr = settings.http.address.parse()?;
    check_tls_file(&settings.http.cert_path, "certificate")?;
    check_tls_file(&settings.http.key_path, "key")?;

    let server = Arc::new(Server::try_new(&settings).await?);

    let api_v1 = warp::path("api")
        .and(warp::path("v1"))
        .and(api::v1::routes(server.clone()))
        .recover(api::v1::recover_error);

    info!(%address, "listening");
    warp::serve(api_v1)
        .tls()
        .cert_path(&settings.http.cert_path)
        .key_path(&settings.http.key_path)
        .bind_with_graceful_shutdown(address, async {
            signal::ctrl_c().await.expect("Could not register SIGINT");
        })
        .1
        .await;

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server.shutdown()).await {
        Ok(_) => info!("shutdown complete"),
        Err(_) => error!("shutdown timed out after {:?}", SHUTDOWN_TIMEOUT),
    }

    Ok(())
}
