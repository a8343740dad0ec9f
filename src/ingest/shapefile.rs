//! Zipped-shapefile bundle checks.
//!
//! The archive itself is unpacked and decoded by the external codec; the
//! engine receives the member listing plus the `.prj` contents and decides
//! whether the upload is acceptable. Bundles not in EPSG:4326 are rejected
//! outright, before validation ever sees the data.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{IngestError, IngestResult};

static EPSG_4326: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)EPSG["']?\s*,\s*["']?4326"#).expect("valid EPSG pattern")
});

static WGS84_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)WGS[\s_]?(19)?84").expect("valid WGS84 pattern"));

/// Manifest of a zipped shapefile upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapefileBundle {
    /// File names inside the archive.
    pub members: Vec<String>,
    /// Contents of the `.prj` member, when present.
    pub prj_wkt: Option<String>,
}

impl ShapefileBundle {
    fn has_member(&self, extension: &str) -> bool {
        self.members
            .iter()
            .any(|m| m.to_ascii_lowercase().ends_with(extension))
    }
}

/// Accept or reject a shapefile bundle.
///
/// Requires `.shp`, `.shx` and `.dbf` members and a `.prj` whose WKT
/// asserts EPSG:4326 / geographic WGS 84. A projected CRS is rejected even
/// when it is derived from WGS 84 (UTM zones mention "WGS 1984" in their
/// names but are not EPSG:4326).
pub fn check_bundle(bundle: &ShapefileBundle) -> IngestResult<()> {
    for extension in [".shp", ".shx", ".dbf"] {
        if !bundle.has_member(extension) {
            return Err(IngestError::MissingBundleMember(match extension {
                ".shp" => ".shp",
                ".shx" => ".shx",
                _ => ".dbf",
            }));
        }
    }

    if !bundle.has_member(".prj") {
        return Err(IngestError::MissingProjection);
    }

    let wkt = bundle.prj_wkt.as_deref().unwrap_or("");
    if !asserts_wgs84(wkt) {
        let summary: String = wkt.chars().take(80).collect();
        return Err(IngestError::Projection(summary));
    }

    Ok(())
}

fn asserts_wgs84(wkt: &str) -> bool {
    let projected = wkt.trim_start().to_ascii_uppercase().starts_with("PROJCS");
    if projected {
        return EPSG_4326.is_match(wkt);
    }
    EPSG_4326.is_match(wkt) || WGS84_NAME.is_match(wkt)
}
