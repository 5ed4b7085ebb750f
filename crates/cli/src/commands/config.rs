use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value as JsonValue};
use storefront_core::config::{AppConfig, LoadOptions};
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

/// Config keys with the environment variables that can set them, highest precedence first.
const FIELDS: &[(&str, &[&str])] = &[
    ("database.url", &["STOREFRONT_DATABASE_URL"]),
    ("database.max_connections", &["STOREFRONT_DATABASE_MAX_CONNECTIONS"]),
    ("database.timeout_secs", &["STOREFRONT_DATABASE_TIMEOUT_SECS"]),
    ("server.bind_address", &["STOREFRONT_SERVER_BIND_ADDRESS"]),
    ("server.port", &["STOREFRONT_SERVER_PORT", "PORT"]),
    ("server.graceful_shutdown_secs", &["STOREFRONT_SERVER_GRACEFUL_SHUTDOWN_SECS"]),
    ("server.allowed_origins", &["STOREFRONT_SERVER_ALLOWED_ORIGINS"]),
    ("auth.jwt_secret", &["STOREFRONT_AUTH_JWT_SECRET", "JWT_SECRET"]),
    ("catalog.best_sellers_default_limit", &["STOREFRONT_CATALOG_BEST_SELLERS_DEFAULT_LIMIT"]),
    ("invoice.company_name", &["STOREFRONT_INVOICE_COMPANY_NAME"]),
    ("invoice.currency", &["STOREFRONT_INVOICE_CURRENCY"]),
    ("invoice.wkhtmltopdf_enabled", &["STOREFRONT_INVOICE_WKHTMLTOPDF_ENABLED"]),
    ("invoice.template_dir", &["STOREFRONT_INVOICE_TEMPLATE_DIR"]),
    ("logging.level", &["STOREFRONT_LOGGING_LEVEL", "STOREFRONT_LOG_LEVEL"]),
    ("logging.format", &["STOREFRONT_LOGGING_FORMAT", "STOREFRONT_LOG_FORMAT"]),
];

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let sources: Map<String, JsonValue> = FIELDS
        .iter()
        .map(|(key, env_keys)| {
            let source =
                field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
            (key.to_string(), JsonValue::String(source))
        })
        .collect();

    CommandResult::success_with_data(
        "config",
        "effective config (source precedence: env > file > default)",
        Some(json!({ "config": config.redacted(), "sources": sources })),
    )
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("storefront.toml"), PathBuf::from("config/storefront.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use toml::Value;

    use super::{contains_path, field_source};

    #[test]
    fn file_source_is_reported_for_keys_present_in_the_document() {
        let doc: Value = "[invoice]\ncurrency = \"EUR\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "invoice.currency"));
        assert!(!contains_path(&doc, "invoice.company_name"));
        assert_eq!(
            field_source(
                "invoice.currency",
                &["STOREFRONT_TEST_UNSET_CURRENCY"],
                Some(&doc),
                Some(Path::new("storefront.toml")),
            ),
            "file (storefront.toml)"
        );
        assert_eq!(
            field_source("invoice.company_name", &[], Some(&doc), None),
            "default"
        );
    }
}
