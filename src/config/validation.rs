use super::schema::{Config, StoreKind};
use crate::store::SheetRange;

/// Validate a loaded configuration.
///
/// Returns all problems at once so they can be fixed in one pass.
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.ranking.tiers == 0 {
        errors.push("ranking.tiers: must be at least 1".to_string());
    }

    for (field, value) in [
        ("initial_delay", &config.retry.initial_delay),
        ("max_delay", &config.retry.max_delay),
    ] {
        if let Err(e) = humantime::parse_duration(value) {
            errors.push(format!("retry.{}: invalid duration '{}' - {}", field, value, e));
        }
    }

    if let Err(e) = SheetRange::parse(&config.roster_range) {
        errors.push(format!("roster_range: invalid '{}' - {}", config.roster_range, e));
    }

    if config.summary_sheet.trim().is_empty() {
        errors.push("summary_sheet: must not be empty".to_string());
    }
    if config.score_sheet.trim().is_empty() {
        errors.push("score_sheet: must not be empty".to_string());
    }

    for name in config.classes.keys() {
        if name.trim().is_empty() {
            errors.push("classes: class names must not be empty".to_string());
        }
    }

    match config.store.kind {
        StoreKind::File if config.store.path.is_none() => {
            errors.push("store.path: required when store.kind is file".to_string());
        }
        StoreKind::Sheets => {
            if let Some(ref endpoint) = config.store.endpoint {
                if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                    errors.push(format!("store.endpoint: '{}' is not an http(s) URL", endpoint));
                }
            }
        }
        _ => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
