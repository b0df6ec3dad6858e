//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::{is_valid_namespace, ConfigFile, MAX_NAMESPACE_LEN};
use super::size::parse_size;
use crate::executor::default_workers;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [layer] section
    if let Some(section) = ini.section(Some("layer")) {
        if let Some(v) = section.get("namespace") {
            let v = v.trim();
            if !is_valid_namespace(v) {
                return Err(invalid(
                    "layer",
                    "namespace",
                    v,
                    &format!("must be 1 to {} letters, digits, '-' or '_'", MAX_NAMESPACE_LEN),
                ));
            }
            config.layer.namespace = v.to_string();
        }
        if let Some(v) = parse_number::<u32>(section, "layer", "tile_size")? {
            if v == 0 {
                return Err(invalid("layer", "tile_size", "0", "must be greater than zero"));
            }
            config.layer.tile_size = v;
        }
        if let Some(v) = parse_number::<u32>(section, "layer", "bytes_per_pixel")? {
            if v == 0 {
                return Err(invalid(
                    "layer",
                    "bytes_per_pixel",
                    "0",
                    "must be greater than zero",
                ));
            }
            config.layer.bytes_per_pixel = v;
        }
        if let Some(v) = parse_number(section, "layer", "staleness_tolerance")? {
            config.layer.staleness_tolerance = v;
        }
    }

    // [redraw] section
    if let Some(section) = ini.section(Some("redraw")) {
        if let Some(ms) = parse_number::<u64>(section, "redraw", "interval_ms")? {
            if ms == 0 {
                return Err(invalid("redraw", "interval_ms", "0", "must be greater than zero"));
            }
            config.layer.redraw_interval = Duration::from_millis(ms);
        }
    }

    // [workers] section
    if let Some(section) = ini.section(Some("workers")) {
        if let Some(v) = section.get("count") {
            let v = v.trim();
            config.workers.workers = if v.eq_ignore_ascii_case("auto") {
                default_workers()
            } else {
                match v.parse::<usize>() {
                    Ok(n) if n > 0 => n,
                    _ => {
                        return Err(invalid(
                            "workers",
                            "count",
                            v,
                            "expected 'auto' or a positive integer",
                        ))
                    }
                }
            };
        }
        if let Some(v) = section.get("thread_name") {
            let v = v.trim();
            if !v.is_empty() {
                config.workers.thread_name = v.to_string();
            }
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("memory_size") {
            config.cache.memory_size = parse_size(v).map_err(|_| {
                invalid(
                    "cache",
                    "memory_size",
                    v,
                    "expected format like '2GB', '256MB', or '1024KB'",
                )
            })?;
        }
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.directory = Some(expand_tilde(v));
            }
        }
        if let Some(v) = section.get("disk_size") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.disk_size = Some(parse_size(v).map_err(|_| {
                    invalid(
                        "cache",
                        "disk_size",
                        v,
                        "expected format like '20GB', '500MB', or '1024KB'",
                    )
                })?);
            }
        }
    }

    // [grid] section
    if let Some(section) = ini.section(Some("grid")) {
        if let Some(v) = parse_number::<usize>(section, "grid", "zoom_levels")? {
            if v == 0 || v > 32 {
                return Err(invalid(
                    "grid",
                    "zoom_levels",
                    &v.to_string(),
                    "must be between 1 and 32",
                ));
            }
            config.grid.zoom_levels = v;
        }
        if let Some(v) = section.get("base_extent") {
            match v.trim().parse::<f64>() {
                Ok(extent) if extent.is_finite() && extent > 0.0 => {
                    config.grid.base_extent = extent;
                }
                _ => return Err(invalid("grid", "base_extent", v, "must be a positive number")),
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigFileError> {
    match section.get(key) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(section_name, key, v, "expected a non-negative integer")),
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<ConfigFile, ConfigFileError> {
        ConfigFile::from_ini_str(text)
    }

    #[test]
    fn test_empty_ini_gives_defaults() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
[layer]
namespace = waterfall
tile_size = 128
bytes_per_pixel = 1
staleness_tolerance = 8

[redraw]
interval_ms = 100

[workers]
count = 3
thread_name = tiles

[cache]
memory_size = 64MB
directory = /var/cache/sonar
disk_size = 2GB

[grid]
zoom_levels = 6
base_extent = 12.5
"#,
        )
        .unwrap();

        assert_eq!(config.layer.namespace, "waterfall");
        assert_eq!(config.layer.tile_size, 128);
        assert_eq!(config.layer.bytes_per_pixel, 1);
        assert_eq!(config.layer.staleness_tolerance, 8);
        assert_eq!(config.layer.redraw_interval, Duration::from_millis(100));
        assert_eq!(config.workers.workers, 3);
        assert_eq!(config.workers.thread_name, "tiles");
        assert_eq!(config.cache.memory_size, 64 * 1024 * 1024);
        assert_eq!(config.cache.directory, Some(PathBuf::from("/var/cache/sonar")));
        assert_eq!(config.cache.disk_size, Some(2 * 1024 * 1024 * 1024));
        assert_eq!(config.grid.zoom_levels, 6);
        assert_eq!(config.grid.base_extent, 12.5);
    }

    #[test]
    fn test_partial_config() {
        let config = parse("[layer]\nstaleness_tolerance = 2\n").unwrap();
        assert_eq!(config.layer.staleness_tolerance, 2);
        assert_eq!(config.layer.tile_size, 256);
        assert_eq!(config.cache, Default::default());
    }

    #[test]
    fn test_workers_auto() {
        let config = parse("[workers]\ncount = auto\n").unwrap();
        assert_eq!(config.workers.workers, default_workers());
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            ("[layer]\ntile_size = big\n", "tile_size"),
            ("[layer]\ntile_size = 0\n", "tile_size"),
            ("[layer]\nnamespace = a.b\n", "namespace"),
            ("[redraw]\ninterval_ms = 0\n", "interval_ms"),
            ("[workers]\ncount = 0\n", "count"),
            ("[cache]\nmemory_size = 2TB\n", "memory_size"),
            ("[grid]\nbase_extent = -1\n", "base_extent"),
            ("[grid]\nzoom_levels = 0\n", "zoom_levels"),
        ];
        for (text, key) in cases {
            match parse(text) {
                Err(ConfigFileError::InvalidValue { key: k, .. }) => {
                    assert_eq!(k, key, "wrong key for {:?}", text)
                }
                other => panic!("expected invalid {} for {:?}, got {:?}", key, text, other),
            }
        }
    }

    #[test]
    fn test_overlong_namespace_rejected() {
        let text = format!("[layer]\nnamespace = {}\n", "a".repeat(MAX_NAMESPACE_LEN + 1));
        assert!(matches!(
            parse(&text),
            Err(ConfigFileError::InvalidValue { key, .. }) if key == "namespace"
        ));

        let text = format!("[layer]\nnamespace = {}\n", "a".repeat(MAX_NAMESPACE_LEN));
        assert_eq!(parse(&text).unwrap().layer.namespace.len(), MAX_NAMESPACE_LEN);
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/cache");
        if dirs::home_dir().is_some() {
            assert!(!path.starts_with("~"));
        }
        assert_eq!(expand_tilde("/abs"), PathBuf::from("/abs"));
    }
}
