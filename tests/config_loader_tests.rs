use catalog_sync::config::{ConfigError, ConfigLoader};
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    unsafe {
        env::remove_var("CATALOG_PROFILE");
        env::remove_var("CATALOG_LOG_LEVEL");
        env::remove_var("CATALOG_LOG_FORMAT");
        env::remove_var("CATALOG_DATABASE_URL");
        env::remove_var("CATALOG_DB_MAX_CONNECTIONS");
        env::remove_var("OPENAI_API_ENDPOINT");
        env::remove_var("CATALOG_AI_API_ENDPOINT");
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

#[test]
fn loads_defaults_when_only_database_url_is_set() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("CATALOG_DATABASE_URL", "sqlite::memory:");
    }

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.log_format, "json");
    assert_eq!(cfg.db_max_connections, 5);
    assert_eq!(cfg.db_acquire_timeout_ms, 5000);
    clear_env();
}

#[test]
fn missing_database_url_is_rejected() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let err = loader.load().expect_err("database url is required");
    assert!(matches!(err, ConfigError::MissingDatabaseUrl));
    assert!(err.to_string().contains("CATALOG_DATABASE_URL"));
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "CATALOG_DATABASE_URL=postgres://base/catalog\nCATALOG_LOG_LEVEL=warn\n",
    );
    write_env_file(
        &temp_dir,
        ".env.production",
        "CATALOG_DATABASE_URL=postgres://prod/catalog\n",
    );
    write_env_file(
        &temp_dir,
        ".env.production.local",
        "CATALOG_DATABASE_URL=postgres://prod-local/catalog\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "CATALOG_PROFILE=production\nCATALOG_LOG_LEVEL=debug\n",
    );

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with layered env files");

    assert_eq!(cfg.profile, "production");
    assert_eq!(cfg.log_level, "debug");
    assert_eq!(cfg.database_url, "postgres://prod-local/catalog");
    clear_env();
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "CATALOG_DATABASE_URL=postgres://file/catalog\nOPENAI_API_ENDPOINT=https://file.example/v1\n",
    );

    unsafe {
        env::set_var("CATALOG_DATABASE_URL", "postgres://env/catalog");
        env::set_var("OPENAI_API_ENDPOINT", "https://api.openai.com/v1");
    }

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with env override");
    assert_eq!(cfg.database_url, "postgres://env/catalog");
    assert_eq!(
        cfg.provider_endpoints.resolve("openai"),
        "https://api.openai.com/v1"
    );

    clear_env();
}

#[test]
fn endpoints_are_read_from_env_files() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "CATALOG_DATABASE_URL=sqlite::memory:\nANTHROPIC_API_ENDPOINT=https://api.anthropic.com\n",
    );

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads");
    assert_eq!(
        cfg.provider_endpoints.resolve("anthropic"),
        "https://api.anthropic.com"
    );
    assert_eq!(cfg.provider_endpoints.resolve("mistral"), "");
    clear_env();
}

#[test]
fn endpoint_of_provider_sharing_the_settings_prefix_is_kept() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "CATALOG_DATABASE_URL=sqlite::memory:\nCATALOG_AI_API_ENDPOINT=https://catalog.example/v1\n",
    );

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads");
    assert_eq!(
        cfg.provider_endpoints.resolve("catalog_ai"),
        "https://catalog.example/v1"
    );
    assert_eq!(cfg.database_url, "sqlite::memory:");
    clear_env();
}

#[test]
fn invalid_pool_size_returns_error() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("CATALOG_DATABASE_URL", "sqlite::memory:");
        env::set_var("CATALOG_DB_MAX_CONNECTIONS", "lots");
    }
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let err = loader.load().expect_err("non-numeric pool size should fail");
    assert!(format!("{}", err).contains("CATALOG_DB_MAX_CONNECTIONS"));

    clear_env();
}
