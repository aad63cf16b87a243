//! Launch site listing

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::config::Config;
use crate::output::{print_table, OutputFormat};

/// Row for sites table
#[derive(Tabled, Serialize)]
struct SiteRow {
    #[tabled(rename = "Site")]
    name: String,
    #[tabled(rename = "Latitude")]
    latitude: f64,
    #[tabled(rename = "Longitude")]
    longitude: f64,
}

pub fn list_sites(config: &Config, format: OutputFormat) -> Result<()> {
    let rows: Vec<SiteRow> = config
        .site_registry()
        .sites()
        .into_iter()
        .map(|site| SiteRow {
            name: site.name,
            latitude: site.coordinates.latitude,
            longitude: site.coordinates.longitude,
        })
        .collect();

    print_table(&rows, format);
    Ok(())
}
