//! Coastline basemap for the world map, fetched once and cached on disk.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::debug;

use crate::backend::http_agent;

pub const COASTLINE_FILE: &str = "ne_110m_coastline.geojson";
pub const COASTLINE_URL: &str =
    "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson/ne_110m_coastline.geojson";

pub enum GeoLoadState {
    NotLoaded,
    Loading,
    Loaded,
    Failed,
}

pub fn parse_geojson_lines(json: &str) -> Result<Vec<Vec<[f64; 2]>>> {
    let v: serde_json::Value = serde_json::from_str(json).context("basemap is not JSON")?;
    let features = v["features"].as_array().ok_or_else(|| anyhow!("no features"))?;
    let mut polylines = Vec::new();
    for feat in features {
        let geom = &feat["geometry"];
        match geom["type"].as_str() {
            Some("LineString") => {
                if let Some(line) = extract_coord_line(&geom["coordinates"]) {
                    polylines.push(line);
                }
            }
            Some("MultiLineString") => {
                if let Some(arrs) = geom["coordinates"].as_array() {
                    for arr in arrs {
                        if let Some(line) = extract_coord_line(arr) {
                            polylines.push(line);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(polylines)
}

fn extract_coord_line(arr: &serde_json::Value) -> Option<Vec<[f64; 2]>> {
    let points = arr.as_array()?;
    let coords: Vec<[f64; 2]> = points
        .iter()
        .filter_map(|p| {
            let a = p.as_array()?;
            Some([a.first()?.as_f64()?, a.get(1)?.as_f64()?])
        })
        .collect();
    if coords.is_empty() { None } else { Some(coords) }
}

pub fn default_cache_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(|h| PathBuf::from(h).join(".cache"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("iss-tracker")
}

fn fetch_or_cache(cache_dir: &Path, filename: &str, url: &str) -> Result<String> {
    let dir = cache_dir.join("geodata");
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(filename);
    if path.exists() {
        return std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()));
    }
    debug!("Fetching basemap from {url}");
    let data = http_agent()
        .get(url)
        .call()
        .with_context(|| format!("GET {url}"))?
        .into_string()
        .context("reading basemap")?;
    let _ = std::fs::write(&path, &data);
    Ok(data)
}

pub fn load_coastlines(cache_dir: &Path) -> Result<Vec<Vec<[f64; 2]>>> {
    let json = fetch_or_cache(cache_dir, COASTLINE_FILE, COASTLINE_URL)?;
    parse_geojson_lines(&json)
}
