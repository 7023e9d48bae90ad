//! URL paths of the v2 REST protocol.

/// Normalise a base URL by dropping trailing slashes.
pub fn normalize_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// `GET` target of the server readiness probe.
pub fn ready_url(base_url: &str) -> String {
    format!("{}/v2/health/ready", normalize_base(base_url))
}

/// `GET` target of the version-scoped model metadata.
pub fn model_url(base_url: &str, model_name: &str, model_version: &str) -> String {
    format!(
        "{}/v2/models/{}/versions/{}",
        normalize_base(base_url),
        model_name,
        model_version
    )
}

/// `POST` target of an inference call.
pub fn infer_url(base_url: &str, model_name: &str, model_version: &str) -> String {
    format!("{}/infer", model_url(base_url, model_name, model_version))
}
