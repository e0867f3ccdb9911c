//! Export des points de bâtiments en GeoJSON avec geozero

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geo::Geometry;
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;
use serde_json::{json, Map, Value};
use tracing::warn;

use buildings::{Attributes, HeightedPoint};

/// Propriétés calculées par l'export, interdites comme nom d'extension
pub const RESERVED_PROPERTIES: [&str; 8] = [
    "gid",
    "source",
    "height",
    "height_available",
    "codice",
    "topon",
    "osm_id",
    "name",
];

/// Exporte des points vers un fichier GeoJSON
pub fn export_to_geojson<'a, I>(
    points: I,
    srid: u32,
    default_height: f64,
    output_path: &Path,
) -> Result<()>
where
    I: IntoIterator<Item = &'a HeightedPoint>,
{
    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);
    write_collection(&mut writer, points, srid, default_height)?;
    writer.flush()?;
    Ok(())
}

/// Écrit une FeatureCollection de points
///
/// Un bâtiment sans hauteur reçoit `default_height` et
/// `height_available: false`.
pub fn write_collection<'a, W, I>(
    writer: &mut W,
    points: I,
    srid: u32,
    default_height: f64,
) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a HeightedPoint>,
{
    // Header FeatureCollection avec CRS
    write!(
        writer,
        r#"{{"type":"FeatureCollection","crs":{{"type":"name","properties":{{"name":"urn:ogc:def:crs:EPSG::{}"}}}},"features":["#,
        srid
    )?;

    for (i, point) in points.into_iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_feature(writer, point, default_height)?;
    }

    write!(writer, "]}}")?;
    Ok(())
}

/// Écrit un point en GeoJSON
fn write_feature<W: Write>(writer: &mut W, point: &HeightedPoint, default_height: f64) -> Result<()> {
    write!(writer, r#"{{"type":"Feature","id":{},"#, point.building.id())?;

    write!(writer, r#""geometry":"#)?;
    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    Geometry::Point(point.location).process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;

    write!(writer, r#","properties":"#)?;
    serde_json::to_writer(&mut *writer, &properties(point, default_height))?;
    write!(writer, "}}")?;

    Ok(())
}

/// Propriétés d'un point: identité, hauteur et attributs de la source
fn properties(point: &HeightedPoint, default_height: f64) -> Value {
    let building = &point.building;
    let mut props = Map::new();
    props.insert("gid".into(), json!(building.id()));
    props.insert("source".into(), json!(building.source().as_str()));
    props.insert("height".into(), json!(point.height_or(default_height)));
    props.insert("height_available".into(), json!(point.has_height()));

    match building.attributes() {
        Attributes::Ctr(ctr) => {
            props.insert("codice".into(), json!(ctr.codice));
            if let Some(topon) = &ctr.topon {
                props.insert("topon".into(), json!(topon));
            }
        }
        Attributes::Osm(osm) => {
            if let Some(osm_id) = osm.osm_id {
                props.insert("osm_id".into(), json!(osm_id));
            }
            if let Some(name) = &osm.name {
                props.insert("name".into(), json!(name));
            }
        }
    }

    for (property, value) in building.extensions() {
        if RESERVED_PROPERTIES.contains(&property.as_str()) {
            warn!(
                gid = building.id(),
                property = %property,
                "Extension shadows a reserved property, skipped"
            );
            continue;
        }
        props.insert(property.clone(), value.clone());
    }

    Value::Object(props)
}
