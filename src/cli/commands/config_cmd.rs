//! config command - Print the effective configuration

use anyhow::Result;

use super::load_config;
use crate::auth::TOKEN_ENV_VARS;
use crate::cli::Context;
use crate::core::config::Config;

/// Print every effective setting and the files it came from.
///
/// Settings that are not configured print as `<unset>`; no network call
/// is made and no token value is shown.
pub fn show(ctx: &Context) -> Result<()> {
    let config = load_config(ctx)?;
    for (key, value) in entries(&config) {
        println!("{} = {}", key, value);
    }

    let token = TOKEN_ENV_VARS
        .iter()
        .find(|name| std::env::var(name).map(|v| !v.trim().is_empty()).unwrap_or(false));
    println!("token = {}", token.map(|n| format!("${}", n)).unwrap_or_else(|| "<unset>".into()));

    if config.sources().is_empty() {
        println!("# no configuration files found");
    }
    for source in config.sources() {
        println!("# from {}", source.display());
    }
    Ok(())
}

fn entries(config: &Config) -> Vec<(&'static str, String)> {
    let unset = || "<unset>".to_string();
    let (owner, name) = match config.repo() {
        Ok(repo) => (repo.owner().to_string(), repo.name().to_string()),
        Err(_) => (unset(), unset()),
    };
    vec![
        ("repository.owner", owner),
        ("repository.name", name),
        (
            "repository.branch",
            config.branch().map(|b| b.to_string()).unwrap_or_else(|_| unset()),
        ),
        ("content.path", config.content_path().to_string()),
        (
            "content.monorepo_path",
            config.monorepo_path().map(str::to_string).unwrap_or_else(unset),
        ),
        ("api.graphql_url", config.graphql_url().to_string()),
        ("api.timeout_secs", config.timeout().as_secs().to_string()),
        ("api.max_file_bytes", config.max_file_bytes().to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn entries_report_defaults_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gitcms.toml");
        fs::write(
            &path,
            "[repository]\nowner = \"acme\"\nname = \"site\"\n\n[content]\nmonorepo_path = \"apps/web\"\n",
        )
        .unwrap();
        let config = Config::load_files(None, Some(&path)).unwrap();
        let entries = entries(&config);

        let get = |key: &str| {
            entries
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("repository.owner"), "acme");
        assert_eq!(get("repository.branch"), "main");
        assert_eq!(get("content.monorepo_path"), "apps/web");
        assert_eq!(get("api.timeout_secs"), "30");
    }

    #[test]
    fn missing_repository_prints_unset() {
        let config = Config::load_files(None, None).unwrap();
        let entries = entries(&config);
        assert!(entries.contains(&("repository.owner", "<unset>".to_string())));
    }
}
