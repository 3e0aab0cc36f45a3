//! Integration tests for the editing facade

use lyu_common::{reader, Error, LyricsFileReader, LyricsPresenter};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn song_with_lyrics(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("song.xml");
    fs::write(
        &path,
        "<document><title>A Simple Song</title><capo>2</capo>\
         <lyrics>Verse one&#13;&#10;Verse two</lyrics><tags>folk</tags></document>",
    )
    .unwrap();
    path
}

#[test]
fn test_presenter_requires_lyrics() {
    let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/Simple Artist/SimpleSong.xml");

    let mut reader = LyricsFileReader::new(&fixture).unwrap();
    match LyricsPresenter::new(&mut reader) {
        Err(Error::KeyNotFound { key, .. }) => assert_eq!(key, "lyrics"),
        other => panic!("Expected KeyNotFound, got {:?}", other),
    }
}

#[test]
fn test_presenter_splits_document() {
    let temp_dir = TempDir::new().unwrap();
    let path = song_with_lyrics(&temp_dir);

    let presenter = LyricsPresenter::open(&path).unwrap();
    assert_eq!(presenter.file_path(), path.as_path());
    assert_eq!(presenter.lyrics(), "Verse one\r\nVerse two");

    let metadata: Vec<(&str, &str)> = presenter.metadata().collect();
    assert_eq!(
        metadata,
        vec![("title", "A Simple Song"), ("capo", "2"), ("tags", "folk")]
    );
    assert!(!presenter.is_modified());
}

#[test]
fn test_save_writes_changes_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let path = song_with_lyrics(&temp_dir);

    let mut presenter = LyricsPresenter::open(&path).unwrap();
    presenter.set_lyrics("New verse");
    presenter.set_metadata("favourite", "true").unwrap();
    assert!(presenter.is_modified());

    presenter.save().unwrap();
    assert!(!presenter.is_modified());

    let saved = reader::read_all(&path).unwrap();
    assert_eq!(saved, presenter.to_document());
    let names: Vec<&str> = saved.iter().map(|(k, _)| k).collect();
    assert_eq!(names, vec!["title", "capo", "lyrics", "tags", "favourite"]);
    assert!(reader::read_value::<bool>(&path, "favourite").unwrap());
}

#[test]
fn test_presenter_on_malformed_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("song.xml");
    fs::write(&path, "<document><lyrics>Rock & Roll</lyrics></document>").unwrap();

    assert!(matches!(
        LyricsPresenter::open(&path),
        Err(Error::MalformedDocument { .. })
    ));
}
