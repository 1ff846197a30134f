use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use wallet_users::api;
use wallet_users::logger::*;
use wallet_users::server::*;
use wallet_users::settings::*;
use warp::Filter;

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "could not register SIGINT handler");
        std::future::pending::<()>().await;
    }
    info!("SIGINT received");
}

fn ensure_file(kind: &str, path: &str) -> anyhow::Result<()> {
    if !fs::metadata(path)?.is_file() {
        return Err(anyhow::anyhow!("TLS {kind} is not a regular file: {path:?}"));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    let logger = Logger::new_bootstrap(format);

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let address: SocketAddr = project_settings.http.address.parse()?;

    let server = Arc::new(Server::try_new(&project_settings).await?);

    let routes = api::v1::routes(server.clone())
        .recover(api::v1::recover_error)
        .with(warp::trace::request());

    match (&project_settings.http.cert_path, &project_settings.http.key_path) {
        (Some(cert_path), Some(key_path)) => {
            ensure_file("cert", cert_path)?;
            ensure_file("key", key_path)?;
            let (bound, serving) = warp::serve(routes)
                .tls()
                .cert_path(cert_path)
                .key_path(key_path)
                .bind_with_graceful_shutdown(address, shutdown_signal());
            info!(%bound, "listening with TLS");
            serving.await;
        }
        (None, None) => {
            let (bound, serving) =
                warp::serve(routes).try_bind_with_graceful_shutdown(address, shutdown_signal())?;
            info!(%bound, "listening");
            serving.await;
        }
        _ => {
            return Err(anyhow::anyhow!(
                "http.cert_path and http.key_path must be set together"
            ));
        }
    }

    let shutdown_timeout = std::time::Duration::from_secs(30);
    match tokio::time::timeout(shutdown_timeout, server.shutdown()).await {
        Ok(_) => info!("server shutdown successfully"),
        Err(_) => error!("server shutdown timed out"),
    }

    Ok(())
}
