// ABOUTME: Tests for configuration file parsing, merging and environment overrides
// ABOUTME: Covers TOML deserialization, precedence between files and validation errors

use preview_cli::config::Config;
use preview_cli::constants::env;
use serial_test::serial;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_config_deserialize_complete() {
    let toml_content = r#"
        show_image_preview_on_gutter = false
        source_folder = "src/assets"
        workspace_folders = ["/proj", "/proj/web"]

        [languages]
        mdx = "markdown"
        astro = "html"
    "#;

    let config: Config = toml::from_str(toml_content).expect("Should parse valid TOML");

    assert_eq!(config.show_image_preview_on_gutter, Some(false));
    assert_eq!(config.source_folder, Some("src/assets".to_string()));
    assert_eq!(
        config.workspace_folders,
        Some(vec![PathBuf::from("/proj"), PathBuf::from("/proj/web")])
    );
    let languages = config.languages.expect("Should have languages");
    assert_eq!(languages.get("astro"), Some(&"html".to_string()));
}

#[test]
fn test_config_deserialize_empty() {
    let config: Config = toml::from_str("").expect("Should parse empty TOML");
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_load_hierarchy() {
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let config_dir = temp_dir.path().join(".config").join("gutter-preview");
    std::fs::create_dir_all(&config_dir).expect("Should create config dir");

    let user_config_path = config_dir.join("config.toml");
    std::fs::write(
        &user_config_path,
        r#"
        show_image_preview_on_gutter = false
        source_folder = "public"
    "#,
    )
    .expect("Should write user config");

    let project_config_path = temp_dir.path().join("gutter-preview.toml");
    std::fs::write(
        &project_config_path,
        r#"
        source_folder = "static"
    "#,
    )
    .expect("Should write project config");

    // Highest precedence first, as get_config_paths orders them
    let config = Config::load_from_paths(&[
        project_config_path.to_str().unwrap(),
        user_config_path.to_str().unwrap(),
    ])
    .expect("Should load config hierarchy");

    assert_eq!(config.source_folder, Some("static".to_string()));
    assert_eq!(config.show_image_preview_on_gutter, Some(false));
}

#[test]
fn test_missing_and_broken_files_are_skipped() {
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let broken = temp_dir.path().join("broken.toml");
    std::fs::write(&broken, "source_folder = [unterminated").unwrap();
    let good = temp_dir.path().join("good.toml");
    std::fs::write(&good, r#"source_folder = "assets""#).unwrap();

    let config = Config::load_from_paths(&[
        temp_dir.path().join("absent.toml").to_str().unwrap(),
        broken.to_str().unwrap(),
        good.to_str().unwrap(),
    ])
    .expect("Should load what it can");

    assert_eq!(config.source_folder, Some("assets".to_string()));
}

#[test]
fn test_config_error_messages() {
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "show_image_preview_on_gutter = \"yes\"").unwrap();

    let error = Config::load_from_file(&path).unwrap_err();
    assert!(format!("{:#}", error).contains("Failed to parse TOML config file"));

    std::fs::write(&path, r#"source_folder = "/abs/path""#).unwrap();
    let error = Config::load_from_file(&path).unwrap_err();
    assert!(error.to_string().contains("must be relative"));
}

#[test]
fn test_config_xdg_paths() {
    let paths = Config::get_config_paths();

    assert!(paths.iter().any(|p| p.ends_with("gutter-preview.toml")));
    assert!(paths
        .iter()
        .any(|p| p.contains("gutter-preview") && p.ends_with("config.toml")));
}

#[test]
#[serial]
fn test_environment_overrides() {
    let config = Config {
        show_image_preview_on_gutter: Some(true),
        source_folder: Some("public".to_string()),
        ..Default::default()
    };

    unsafe {
        std::env::remove_var(env::HIDE_GUTTER);
        std::env::remove_var(env::SOURCE_FOLDER);
    }
    let settings = config.to_settings();
    assert!(settings.show_image_preview_on_gutter);
    assert_eq!(settings.source_folder, "public");

    unsafe {
        std::env::set_var(env::HIDE_GUTTER, "1");
        std::env::set_var(env::SOURCE_FOLDER, "static");
    }
    let settings = config.to_settings();
    assert!(!settings.show_image_preview_on_gutter);
    assert_eq!(settings.source_folder, "static");

    unsafe {
        std::env::remove_var(env::HIDE_GUTTER);
        std::env::remove_var(env::SOURCE_FOLDER);
    }
}

#[test]
#[serial]
fn test_defaults_without_config() {
    unsafe {
        std::env::remove_var(env::HIDE_GUTTER);
        std::env::remove_var(env::SOURCE_FOLDER);
    }
    let settings = Config::default().to_settings();
    assert!(settings.show_image_preview_on_gutter);
    assert!(settings.source_folder.is_empty());
}
