use std::net::SocketAddr;

use crate::{
    Res,
    config::Config,
    error, info,
    server::{self, AppState},
    success, warning,
};

pub async fn serve(addr: Option<String>, open: bool) {
    if let Err(e) = run(addr, open).await {
        error!("Server stopped: {}", e);
    }
}

async fn run(addr: Option<String>, open: bool) -> Res<()> {
    let config = Config::from_env()?;
    let addr = addr.unwrap_or_else(|| config.server_addr.clone());
    info!(
        "Using Salesforce login {} (API v{})",
        config.login_url, config.api_version
    );

    let state = AppState::new(config)?;
    let listener = server::bind(&addr).await?;
    let local = listener.local_addr()?;
    success!("Listening on http://{}", local);

    if open {
        let url = browser_url(local);
        if webbrowser::open(&url).is_err() {
            warning!(
                "Failed to open browser. Please navigate to the following URL manually:\n{}",
                url
            )
        }
    }

    server::start_api_server(state, listener).await?;
    Ok(())
}

/// URL a local browser can reach the server on.
fn browser_url(addr: SocketAddr) -> String {
    if addr.ip().is_unspecified() {
        format!("http://localhost:{}/", addr.port())
    } else {
        format!("http://{}/", addr)
    }
}
