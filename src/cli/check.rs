use tabled::Table;

use crate::{
    config::Config, error, info, salesforce::build_authorize_url, success, types::ConfigTableRow,
};

pub fn check() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("{}", e),
    };

    let limit = config.rate_limit;
    let rows = vec![
        row("Client ID", &config.client_id),
        row("Client secret", "[REDACTED]"),
        row("Login URL", &config.login_url),
        row("Redirect URI", &config.redirect_uri),
        row("Server address", &config.server_addr),
        row("API version", &config.api_version),
        row(
            "Request timeout",
            &format!("{}s", config.request_timeout.as_secs()),
        ),
        row("Session TTL", &format!("{}s", config.session_ttl.as_secs())),
        row("Cache TTL", &format!("{}s", config.cache_ttl.as_secs())),
        row(
            "Rate limit",
            &format!(
                "{} per {}s",
                limit.max_requests,
                limit.window.as_secs()
            ),
        ),
        row("PKCE", if config.use_pkce { "on" } else { "off" }),
    ];
    println!("{}", Table::new(rows));

    match build_authorize_url(&config.client_id, &config.redirect_uri, &config.login_url) {
        Ok(url) => info!("Authorize URL: {}", url),
        Err(e) => error!("{}", e),
    }

    if !config.secure_cookies() {
        info!("Redirect URI is not https; session cookies are sent without the Secure flag");
    }

    success!("Configuration is valid");
}

fn row(setting: &str, value: &str) -> ConfigTableRow {
    ConfigTableRow {
        setting: setting.to_string(),
        value: value.to_string(),
    }
}
