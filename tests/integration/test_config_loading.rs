//! Integration tests for configuration files feeding the viewer

#[path = "../test_utils/mod.rs"]
mod test_utils;

use lazylog::config::loader::LoadOptions;
use lazylog::config::utils::{create_default_config_content, get_config_format};
use lazylog::config::ConfigFormat;
use lazylog::{ConfigLoader, Error, LogView, ViewerConfig};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use test_utils::create_plain_output;

const SAMPLE_TOML: &str = r#"
[display]
wrap_lines = true
max_line_length = 40
start_line_number = 10

[search]
min_characters = 2
case_insensitive = true

[websocket]
reconnect = true
reconnect_wait_secs = 2.5

[eventsource]
reconnect = false
max_events = 500
event_delay_ms = 25
"#;

#[cfg(test)]
mod file_loading {
    use super::*;

    #[test]
    fn test_load_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("viewer.toml");
        fs::write(&path, SAMPLE_TOML).unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();

        assert!(config.display.wrap_lines);
        assert_eq!(config.display.max_line_length, 40);
        assert_eq!(config.display.start_line_number, 10);
        assert!(config.search.case_insensitive);
        assert_eq!(config.eventsource.reconnect, Some(false));
        assert_eq!(config.eventsource.max_events, Some(500));
        // Untouched fields keep their defaults
        assert_eq!(config.eventsource.max_empty_events, 100);
    }

    #[test]
    fn test_load_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("viewer.json");
        fs::write(&path, r#"{ "search": { "min_characters": 5 } }"#).unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.search.min_characters, 5);
        assert_eq!(config.display, ViewerConfig::default().display);
    }

    #[test]
    fn test_file_without_extension_read_as_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lazylogrc");
        fs::write(&path, "[display]\nmax_line_length = 64\n").unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.display.max_line_length, 64);
    }

    #[test]
    fn test_missing_file_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");

        match ConfigLoader::load_from_file(&path) {
            Err(Error::ConfigLoadFailed { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected ConfigLoadFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_reported_with_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        match ConfigLoader::load_from_file(&path) {
            Err(Error::ConfigParseFailed { format, .. }) => assert_eq!(format, "JSON"),
            other => panic!("expected ConfigParseFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("invalid.toml");
        fs::write(&path, "[display]\nmax_line_length = 2\n").unwrap();

        match ConfigLoader::load_from_file(&path) {
            Err(Error::ConfigValidationFailed { field, .. }) => {
                assert_eq!(field, "display.max_line_length")
            }
            other => panic!("expected ConfigValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_init_with_config_returns_errors() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.toml");
        fs::write(&good, SAMPLE_TOML).unwrap();

        assert_eq!(
            lazylog::init_with_config(&good).unwrap().display.max_line_length,
            40
        );

        let err = lazylog::init_with_config(&dir.path().join("missing.toml")).unwrap_err();
        assert!(lazylog::handle_startup_error(&err).contains("missing.toml"));
    }
}

#[cfg(test)]
mod search_paths {
    use super::*;

    #[test]
    fn test_first_existing_candidate_wins() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first").join("config");
        let second = dir.path().join("second").join("config");
        fs::create_dir_all(second.parent().unwrap()).unwrap();
        fs::write(second.with_extension("json"), r#"{ "display": { "wrap_lines": true } }"#).unwrap();

        let mut loader = ConfigLoader::new();
        loader.set_search_path(first);
        loader.add_search_path(second.clone());

        let config = loader.load_from_search_paths(&LoadOptions::default()).unwrap();
        assert!(config.display.wrap_lines);
        assert_eq!(loader.current_path(), Some(second.with_extension("json").as_path()));
    }

    #[test]
    fn test_broken_candidate_skipped() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("config");
        fs::write(base.with_extension("toml"), "display = [").unwrap();
        fs::write(base.with_extension("json"), r#"{ "search": { "min_characters": 4 } }"#).unwrap();

        let mut loader = ConfigLoader::new();
        loader.set_search_path(base);

        let config = loader.load_from_search_paths(&LoadOptions::default()).unwrap();
        assert_eq!(config.search.min_characters, 4);
    }

    #[test]
    fn test_nothing_found() {
        let dir = TempDir::new().unwrap();
        let mut loader = ConfigLoader::new();
        loader.set_search_path(dir.path().join("nowhere"));

        let config = loader.load_from_search_paths(&LoadOptions::default()).unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert!(loader.current_path().is_none());

        let strict = LoadOptions {
            create_default: false,
            validate: true,
        };
        assert!(matches!(
            loader.load_from_search_paths(&strict),
            Err(Error::ConfigNotFound)
        ));
    }

    #[test]
    fn test_save_goes_back_to_loaded_file() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("config");
        fs::write(base.with_extension("toml"), SAMPLE_TOML).unwrap();

        let mut loader = ConfigLoader::new();
        loader.set_search_path(base.clone());
        let mut config = loader.load_from_search_paths(&LoadOptions::default()).unwrap();
        config.search.min_characters = 7;

        let saved_to = loader.save(&config).unwrap();
        assert_eq!(saved_to, base.with_extension("toml"));
        assert_eq!(ConfigLoader::load_from_file(&saved_to).unwrap(), config);
    }
}

#[cfg(test)]
mod persistence {
    use super::*;

    #[test]
    fn test_save_and_reload_both_formats() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::from_toml_str(SAMPLE_TOML).unwrap();
        let loader = ConfigLoader::new();

        for name in ["nested/out.toml", "nested/out.json"] {
            let path = dir.path().join(name);
            loader.save_to_path(&config, &path).unwrap();
            assert_eq!(ConfigLoader::load_from_file(&path).unwrap(), config);
        }

        let json = fs::read_to_string(dir.path().join("nested/out.json")).unwrap();
        assert!(json.trim_start().starts_with('{'));
    }

    #[test]
    fn test_default_content_parses_back() {
        for format in [ConfigFormat::Toml, ConfigFormat::Json] {
            let content = create_default_config_content(format).unwrap();
            let parsed = match format {
                ConfigFormat::Toml => ConfigLoader::from_toml_str(&content),
                ConfigFormat::Json => ConfigLoader::from_json_str(&content),
            };
            assert_eq!(parsed.unwrap(), ViewerConfig::default());
        }
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(get_config_format("a/config.toml".as_ref()), Some(ConfigFormat::Toml));
        assert_eq!(get_config_format("a/config.json".as_ref()), Some(ConfigFormat::Json));
        assert_eq!(get_config_format("a/config.yaml".as_ref()), None);
        assert_eq!(get_config_format("a/config".as_ref()), None);
    }
}

#[cfg(test)]
mod config_to_viewer {
    use super::*;

    #[test]
    fn test_config_drives_view() {
        let config = ConfigLoader::from_toml_str(SAMPLE_TOML).unwrap();
        let mut view = LogView::from_config(&config);
        view.append_text(&create_plain_output().join("\n"));

        assert_eq!(view.lines()[0].number, 10);
        // "INFO" twice plus "retrying"
        assert_eq!(view.search("in").len(), 3);
    }

    #[test]
    fn test_config_drives_clients() {
        let config = ConfigLoader::from_toml_str(SAMPLE_TOML).unwrap();

        let socket = config.socket_options();
        assert!(socket.reconnect);
        assert_eq!(socket.reconnect_wait, Duration::from_millis(2500));

        let events = config.event_stream_options();
        assert_eq!(events.reconnect, Some(false));
        assert_eq!(events.max_events, Some(500));
        assert_eq!(events.event_delay, Some(Duration::from_millis(25)));
    }
}
