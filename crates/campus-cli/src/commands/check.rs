//! `campus check` - validate the configuration and print what it resolves to.
//!
//! Secrets are never printed; only where they come from and whether they are
//! present.

use campus_core::{CampusConfig, PolicyMode, UpstreamConfig};

/// Where the database URL will come from.
pub fn database_source(upstream: &UpstreamConfig) -> String {
    if let Some(var) = &upstream.database_url_env
        && std::env::var(var).is_ok_and(|v| !v.is_empty())
    {
        return format!("${}", var);
    }
    if upstream.database_url.is_some() {
        return "database_url (inline)".to_string();
    }
    format!(
        "{}@{}:{}/{}",
        upstream.username, upstream.host, upstream.port, upstream.database
    )
}

/// Summary lines plus warnings for settings `serve` would trip over.
pub fn summarize(config: &CampusConfig) -> (Vec<String>, Vec<String>) {
    let mut lines = Vec::new();
    let mut warnings = Vec::new();

    lines.push(format!(
        "project:   {}",
        config.project.as_deref().unwrap_or("(unnamed)")
    ));
    lines.push(format!("database:  {}", database_source(&config.upstream)));
    lines.push(format!(
        "pool:      {} connections, {}s acquire timeout",
        config.upstream.pool.max_connections, config.upstream.pool.acquire_timeout_seconds
    ));

    let has_key = config.identity.resolve_secret_key().is_some();
    lines.push(format!(
        "identity:  {} (secret key {})",
        config.identity.base_url,
        if has_key { "set" } else { "missing" }
    ));
    if !has_key {
        warnings.push(format!(
            "no identity secret key; set ${} or run `campus serve --in-memory`",
            config.identity.secret_key_env
        ));
    }

    lines.push(format!("listen:    {}", config.dashboard.bind_address()));

    let policy = match config.policy.mode {
        PolicyMode::AllowAll => "allow_all".to_string(),
        PolicyMode::LessonOwner => {
            let scoped: Vec<&str> = config
                .policy
                .scoped_resources
                .iter()
                .map(|k| k.as_str())
                .collect();
            if scoped.is_empty() {
                warnings.push("lesson_owner policy has no scoped_resources".to_string());
            }
            format!("lesson_owner [{}]", scoped.join(", "))
        }
    };
    lines.push(format!("policy:    {}", policy));
    lines.push(format!("log level: {}", config.observability.log_level));

    (lines, warnings)
}

pub fn run(config: &CampusConfig) {
    let (lines, warnings) = summarize(config);
    println!("Configuration is valid.");
    println!();
    for line in lines {
        println!("  {}", line);
    }
    if !warnings.is_empty() {
        println!();
        for warning in &warnings {
            tracing::warn!("{}", warning);
            println!("  warning: {}", warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_never_prints_password() {
        let config = CampusConfig::from_yaml(
            "upstream:\n  database_url_env: CAMPUS_CHECK_UNSET_VAR\n  password: hunter22\n",
        )
        .unwrap();
        let (lines, _) = summarize(&config);
        assert!(lines.iter().all(|l| !l.contains("hunter22")));
        assert!(lines.iter().any(|l| l.contains("postgres@localhost:5432/campus")));
    }

    #[test]
    fn test_lesson_owner_lists_scoped_kinds() {
        let config = CampusConfig::from_yaml(
            "policy:\n  mode: lesson_owner\n  scoped_resources: [exam, assignment]\n",
        )
        .unwrap();
        let (lines, _) = summarize(&config);
        assert!(lines.contains(&"policy:    lesson_owner [exam, assignment]".to_string()));
    }

    #[test]
    fn test_missing_secret_key_warns() {
        let config = CampusConfig::from_yaml(
            "identity:\n  secret_key_env: CAMPUS_CHECK_UNSET_KEY\n",
        )
        .unwrap();
        let (_, warnings) = summarize(&config);
        assert!(warnings.iter().any(|w| w.contains("CAMPUS_CHECK_UNSET_KEY")));
    }
}
