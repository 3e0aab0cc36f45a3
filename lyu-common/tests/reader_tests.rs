//! Integration tests for reading and writing lyrics files on disk

use lyu_common::reader::{self, LyricsFileReader};
use lyu_common::{writer, Error, LyricsDocument};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn simple_song() -> PathBuf {
    fixture("Simple Artist/SimpleSong.xml")
}

#[test]
fn test_read_all_simple_song() {
    let doc = reader::read_all(simple_song()).unwrap();

    let expected: LyricsDocument = [
        ("title", "A Simple Song"),
        ("artist", "Simple Artist"),
        ("capo", "0"),
        ("favourite", "true"),
    ]
    .into_iter()
    .collect();
    assert_eq!(doc, expected);
}

#[test]
fn test_read_value_bool() {
    let favourite: bool = reader::read_value(simple_song(), "favourite").unwrap();
    assert!(favourite);
}

#[test]
fn test_read_value_conversion_error_is_typed() {
    match reader::read_value::<bool>(simple_song(), "capo") {
        Err(Error::Conversion { field, raw, target }) => {
            assert_eq!(field, "capo");
            assert_eq!(raw, "0");
            assert_eq!(target, "bool");
        }
        other => panic!("Expected Conversion, got {:?}", other),
    }
}

#[test]
fn test_read_value_int_and_string() {
    let capo: i32 = reader::read_value(simple_song(), "capo").unwrap();
    assert_eq!(capo, 0);
    let title: String = reader::read_value(simple_song(), "title").unwrap();
    assert_eq!(title, "A Simple Song");
}

#[test]
fn test_missing_key_is_key_not_found() {
    match reader::read_value::<String>(simple_song(), "tags") {
        Err(Error::KeyNotFound { key, .. }) => assert_eq!(key, "tags"),
        other => panic!("Expected KeyNotFound, got {:?}", other),
    }
    assert_eq!(
        reader::try_read_value::<String>(simple_song(), "tags").unwrap(),
        None
    );
}

#[test]
fn test_missing_file_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.xml");

    assert!(matches!(reader::read_all(&missing), Err(Error::Io { .. })));
    assert!(matches!(
        reader::read_value::<bool>(&missing, "favourite"),
        Err(Error::Io { .. })
    ));
}

#[test]
fn test_early_stop_ignores_malformed_tail() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("song.xml");
    fs::write(
        &path,
        "<document><favourite>true</favourite><lyrics>Rock & Roll</lyrics></document>",
    )
    .unwrap();

    assert!(reader::read_value::<bool>(&path, "favourite").unwrap());
    assert!(matches!(
        reader::read_all(&path),
        Err(Error::MalformedDocument { .. })
    ));
}

#[test]
fn test_early_stop_ignores_invalid_byte_in_tail() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("song.xml");
    fs::write(
        &path,
        b"<document><favourite>true</favourite><lyrics>Caf\xE9</lyrics></document>",
    )
    .unwrap();

    assert!(reader::read_value::<bool>(&path, "favourite").unwrap());
    match reader::read_all(&path) {
        Err(Error::MalformedDocument { message, .. }) => {
            assert!(message.contains("invalid character"), "{}", message)
        }
        other => panic!("Expected MalformedDocument, got {:?}", other),
    }
}

#[test]
fn test_read_until_includes_prefix() {
    let doc = reader::read_until(simple_song(), "artist").unwrap();
    assert_eq!(doc.len(), 2);
    assert_eq!(doc.get("title"), Some("A Simple Song"));
    assert_eq!(doc.get("artist"), Some("Simple Artist"));
}

#[test]
fn test_reader_caches_full_read() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("song.xml");
    fs::copy(simple_song(), &path).unwrap();

    let mut reader = LyricsFileReader::new(&path).unwrap();
    assert_eq!(reader.read_all().unwrap().len(), 4);

    fs::write(&path, "<document><title>Changed</title></document>").unwrap();
    assert_eq!(
        reader.read_value::<String>("title").unwrap(),
        "A Simple Song"
    );

    reader.invalidate();
    assert_eq!(reader.read_value::<String>("title").unwrap(), "Changed");
}

#[test]
fn test_round_trip_through_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("song.xml");

    let doc: LyricsDocument = [
        ("title", "Caf\u{e9} & Bar"),
        ("tempo", "slow"),
        ("lyrics", "Line one\r\nLine <two>\r\n\r\n"),
    ]
    .into_iter()
    .collect();

    writer::write_to_file(&path, &doc).unwrap();
    assert_eq!(reader::read_all(&path).unwrap(), doc);
}

#[test]
fn test_written_file_is_utf16_with_bom() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("song.xml");
    let doc = reader::read_all(simple_song()).unwrap();

    writer::write_to_file(&path, &doc).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xFE]);
    assert_eq!(bytes.len() % 2, 0);
}

#[test]
fn test_shorter_write_truncates() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("song.xml");

    let body = "la ".repeat(500);
    let long: LyricsDocument = [("title", "Long"), ("lyrics", body.as_str())]
        .into_iter()
        .collect();
    let short: LyricsDocument = [("title", "Short")].into_iter().collect();

    writer::write_to_file(&path, &long).unwrap();
    let long_len = fs::metadata(&path).unwrap().len();
    writer::write_to_file(&path, &short).unwrap();

    assert!(fs::metadata(&path).unwrap().len() < long_len);
    assert_eq!(reader::read_all(&path).unwrap(), short);
}

#[test]
fn test_failed_write_leaves_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("song.xml");
    fs::copy(simple_song(), &path).unwrap();
    let before = fs::read(&path).unwrap();

    let bad: LyricsDocument = [("title", "bell\u{7}")].into_iter().collect();
    assert!(matches!(
        writer::write_to_file(&path, &bad),
        Err(Error::FieldWrite { .. })
    ));
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_write_to_missing_folder_is_write_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("no/such/folder/song.xml");
    let doc: LyricsDocument = [("title", "x")].into_iter().collect();

    assert!(matches!(
        writer::write_to_file(&path, &doc),
        Err(Error::Write { .. })
    ));
}
