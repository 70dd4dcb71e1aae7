//! Integration tests for the fetch-and-normalize routine.
//!
//! Sources are served via file:// URLs, so no network access is needed. Each
//! test uses its own tempdir as both source and destination area.

mod common;

use geo_sampledata::{download_samplefile, Error};
use rusqlite::Connection;
use std::fs;
use tempfile::tempdir;

#[test]
fn direct_download_when_suffixes_match() {
    common::init_logging();
    let dir = tempdir().unwrap();
    let source = dir.path().join("served.gpkg");
    fs::write(&source, b"gpkg payload").unwrap();

    let dst_dir = dir.path().join("samples");
    let path = download_samplefile(
        &common::file_url(&source),
        ".gpkg",
        "direct.gpkg",
        Some(&dst_dir),
    )
    .unwrap();

    assert_eq!(path, dst_dir.join("direct.gpkg"));
    assert_eq!(fs::read(&path).unwrap(), b"gpkg payload");
    // No normalization needed, so no scratch dir may ever have been created.
    assert!(!dst_dir.join("tmp").exists());
}

#[test]
fn second_call_is_a_cache_hit() {
    common::init_logging();
    let dir = tempdir().unwrap();
    let source = dir.path().join("served.gpkg");
    fs::write(&source, b"first body").unwrap();

    let dst_dir = dir.path().join("samples");
    let url = common::file_url(&source);
    let first = download_samplefile(&url, ".gpkg", "cached.gpkg", Some(&dst_dir)).unwrap();

    // If the second call hit the network it would pick up the new body.
    fs::write(&source, b"second body").unwrap();
    let second = download_samplefile(&url, ".gpkg", "cached.gpkg", Some(&dst_dir)).unwrap();

    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"first body");
}

#[test]
fn zipped_raster_is_moved_not_converted() {
    common::init_logging();
    let dir = tempdir().unwrap();
    let raster: &[u8] = b"pretend this is a GeoTIFF";
    let archive = dir.path().join("served.zip");
    common::write_zip(&archive, &[("nested/dir/s2_composite.tif", raster)]);

    let dst_dir = dir.path().join("samples");
    let path = download_samplefile(
        &common::file_url(&archive),
        ".zip",
        "s2_ndvi_2020.tif",
        Some(&dst_dir),
    )
    .unwrap();

    assert_eq!(path, dst_dir.join("s2_ndvi_2020.tif"));
    assert_eq!(fs::read(&path).unwrap(), raster);
    assert!(!dst_dir.join("tmp").exists(), "scratch dir must be cleaned up");
}

#[test]
fn zipped_shapefile_is_converted_to_geopackage() {
    common::init_logging();
    let dir = tempdir().unwrap();
    let shp_dir = dir.path().join("shp");
    fs::create_dir_all(&shp_dir).unwrap();
    common::write_polygon_shapefile(&shp_dir.join("parcels.shp"), 7);

    let archive = dir.path().join("served.zip");
    common::zip_dir(&shp_dir, &archive, "Shapefile");

    let dst_dir = dir.path().join("samples");
    let path = download_samplefile(
        &common::file_url(&archive),
        ".zip",
        "agriprc_2018.gpkg",
        Some(&dst_dir),
    )
    .unwrap();

    assert_eq!(path, dst_dir.join("agriprc_2018.gpkg"));
    assert!(!dst_dir.join("tmp").exists(), "scratch dir must be cleaned up");

    // The destination must be a readable geopackage with all source features.
    assert_eq!(geo_sampledata::geoops::feature_count(&path).unwrap(), Some(7));

    let conn = Connection::open(&path).unwrap();
    let (table, geom_type): (String, String) = conn
        .query_row(
            "SELECT c.table_name, g.geometry_type_name
             FROM gpkg_contents c JOIN gpkg_geometry_columns g USING (table_name)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(table, "agriprc_2018");
    assert_eq!(geom_type, "MULTIPOLYGON");

    let (blob, name): (Vec<u8>, String) = conn
        .query_row(
            "SELECT geom, name FROM agriprc_2018 ORDER BY fid LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(&blob[0..2], b"GP");
    assert_eq!(name, "parcel 0");
}

#[test]
fn shapefile_wins_over_stray_raster_in_archive() {
    common::init_logging();
    let dir = tempdir().unwrap();
    let shp_dir = dir.path().join("shp");
    fs::create_dir_all(&shp_dir).unwrap();
    common::write_polygon_shapefile(&shp_dir.join("parcels.shp"), 2);
    // A second recognized geofile: two matches are accepted, first one wins.
    fs::write(shp_dir.join("preview.tif"), b"stray raster").unwrap();

    let archive = dir.path().join("served.zip");
    common::zip_dir(&shp_dir, &archive, "");

    let dst_dir = dir.path().join("samples");
    let path = download_samplefile(
        &common::file_url(&archive),
        ".zip",
        "agriprc.gpkg",
        Some(&dst_dir),
    )
    .unwrap();

    assert_eq!(geo_sampledata::geoops::feature_count(&path).unwrap(), Some(2));
}

#[test]
fn archive_without_geofiles_is_fatal_and_cleaned_up() {
    common::init_logging();
    let dir = tempdir().unwrap();
    let archive = dir.path().join("served.zip");
    common::write_zip(&archive, &[("readme.txt", b"nothing spatial here".as_slice())]);

    let dst_dir = dir.path().join("samples");
    let err = download_samplefile(
        &common::file_url(&archive),
        ".zip",
        "missing.gpkg",
        Some(&dst_dir),
    )
    .unwrap_err();

    match err {
        Error::ArchiveContents { found, .. } => assert!(found.is_empty()),
        other => panic!("expected ArchiveContents, got {other}"),
    }
    assert!(!dst_dir.join("missing.gpkg").exists());
    assert!(!dst_dir.join("tmp").exists(), "scratch dir must be cleaned up after failure");
}

#[test]
fn archive_with_three_geofiles_is_fatal() {
    common::init_logging();
    let dir = tempdir().unwrap();
    let archive = dir.path().join("served.zip");
    common::write_zip(
        &archive,
        &[
            ("a.shp", b"x".as_slice()),
            ("b.gpkg", b"y".as_slice()),
            ("c.tif", b"z".as_slice()),
        ],
    );

    let dst_dir = dir.path().join("samples");
    let err = download_samplefile(
        &common::file_url(&archive),
        ".zip",
        "ambiguous.gpkg",
        Some(&dst_dir),
    )
    .unwrap_err();

    match &err {
        Error::ArchiveContents { found, .. } => {
            assert_eq!(found.len(), 3);
            assert!(err.to_string().contains("found 3"));
        }
        other => panic!("expected ArchiveContents, got {other}"),
    }
    assert!(!dst_dir.join("tmp").exists());
}

#[test]
fn failed_download_leaves_no_destination_or_scratch() {
    common::init_logging();
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does_not_exist.zip");

    let dst_dir = dir.path().join("samples");
    let result = download_samplefile(
        &common::file_url(&missing),
        ".zip",
        "never.gpkg",
        Some(&dst_dir),
    );

    assert!(result.is_err());
    assert!(!dst_dir.join("never.gpkg").exists());
    assert!(!dst_dir.join("tmp").exists());
}
