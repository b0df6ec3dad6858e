//! INI serialization logic for converting `ConfigFile` → INI string.

use super::settings::ConfigFile;
use super::size::format_size;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let directory = config
        .cache
        .directory
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let disk_size = config.cache.disk_size.map(format_size).unwrap_or_default();

    format!(
        r#"[layer]
; Cache key prefix, unique per layer instance (letters, digits, '-' and '_')
namespace = {}
; Tile edge length in pixels
tile_size = {}
; Bytes per pixel of the tile payload (4 = RGBA8)
bytes_per_pixel = {}
; Generations a cached tile may lag behind the data and still be shown
staleness_tolerance = {}

[redraw]
; Interval between repaint checks in milliseconds
interval_ms = {}

[workers]
; Concurrent tile fills shared by all layers ('auto' = one per CPU)
count = {}
thread_name = {}

[cache]
; Memory cache budget (e.g. 256MB, 2GB)
memory_size = {}
; Disk cache directory (empty = memory only)
directory = {}
; Disk budget enforced by garbage collection (empty = unbounded)
disk_size = {}

[grid]
; Number of zoom levels
zoom_levels = {}
; World extent of one tile at zoom 0, doubling per level
base_extent = {}
"#,
        config.layer.namespace,
        config.layer.tile_size,
        config.layer.bytes_per_pixel,
        config.layer.staleness_tolerance,
        config.layer.redraw_interval.as_millis(),
        config.workers.workers,
        config.workers.thread_name,
        format_size(config.cache.memory_size),
        directory,
        disk_size,
        config.grid.zoom_levels,
        config.grid.base_extent,
    )
}
