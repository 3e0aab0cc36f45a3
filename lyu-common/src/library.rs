//! Lyrics library tree
//!
//! A lyrics library is a folder tree: artist folders holding one file per
//! song, possibly grouped under further folders. The tree is scanned once
//! into an arena; per-node states such as the favourite highlight are then
//! computed as a single bottom-up pass over the arena.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::schema::{FAVOURITE, SINGABLE};
use crate::tidy::{self, TidyOutcome, SCRATCH_SUFFIX};
use crate::{reader, Error as LyricsError};

/// Library scan errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Index of a node in [`LyricsLibrary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// A file
    Song,
    /// A folder directly containing at least one file
    Artist,
    /// Any other folder
    Folder,
}

#[derive(Debug, Clone)]
pub struct LibraryNode {
    pub path: PathBuf,
    /// File or folder name as shown in the tree
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub node_type: NodeType,
}

/// Boolean field used to highlight songs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightFilter {
    Favourite,
    Singable,
}

impl HighlightFilter {
    pub fn field_name(self) -> &'static str {
        match self {
            HighlightFilter::Favourite => FAVOURITE,
            HighlightFilter::Singable => SINGABLE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Highlight {
    #[default]
    Plain,
    /// Song whose field is true, or folder containing one
    Highlighted,
    /// Song file that could not be read
    Unreadable,
}

/// Highlight state of every node, indexed by [`NodeId`]
#[derive(Debug, Clone)]
pub struct Highlights {
    states: Vec<Highlight>,
}

impl Highlights {
    pub fn get(&self, id: NodeId) -> Highlight {
        self.states.get(id.0).copied().unwrap_or_default()
    }

    pub fn is_highlighted(&self, id: NodeId) -> bool {
        self.get(id) == Highlight::Highlighted
    }

    pub fn unreadable(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| **state == Highlight::Unreadable)
            .map(|(index, _)| NodeId(index))
    }
}

/// Outcome of tidying every song under a folder
#[derive(Debug, Default)]
pub struct TidyReport {
    /// Files that already parsed
    pub clean: usize,
    pub repaired: Vec<PathBuf>,
    /// Files left untouched because they could not be repaired
    pub failed: Vec<(PathBuf, LyricsError)>,
}

impl TidyReport {
    pub fn total(&self) -> usize {
        self.clean + self.repaired.len() + self.failed.len()
    }
}

/// Scanned library folder tree
#[derive(Debug, Clone)]
pub struct LyricsLibrary {
    nodes: Vec<LibraryNode>,
}

const IGNORE_PATTERNS: [&str; 3] = [".git", "Thumbs.db", ".DS_Store"];

impl LyricsLibrary {
    /// Scan the folder tree under `root`, children sorted by file name
    pub fn scan(root: impl AsRef<Path>) -> Result<Self, ScanError> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let mut nodes: Vec<LibraryNode> = Vec::new();
        let mut by_path: HashMap<PathBuf, NodeId> = HashMap::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || should_process_entry(e));

        // Pre-order walk: a parent is always recorded before its children
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error accessing entry: {}", e);
                    continue;
                }
            };

            let is_dir = entry.file_type().is_dir();
            if !is_dir && !entry.file_type().is_file() {
                continue;
            }

            let parent = entry
                .path()
                .parent()
                .and_then(|p| by_path.get(p).copied())
                .filter(|_| entry.depth() > 0);

            let id = NodeId(nodes.len());
            nodes.push(LibraryNode {
                path: entry.path().to_path_buf(),
                name: display_name(&entry),
                parent,
                children: Vec::new(),
                node_type: if is_dir { NodeType::Folder } else { NodeType::Song },
            });

            if let Some(parent) = parent {
                nodes[parent.0].children.push(id);
                if !is_dir {
                    nodes[parent.0].node_type = NodeType::Artist;
                }
            }
            if is_dir {
                by_path.insert(entry.path().to_path_buf(), id);
            }
        }

        debug!(
            "Scanned {} node(s) under {}",
            nodes.len(),
            root.display()
        );
        Ok(Self { nodes })
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The node behind `id`
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this library. Use [`Self::get`]
    /// for ids of unknown origin.
    pub fn node(&self, id: NodeId) -> &LibraryNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&LibraryNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node in pre-order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &LibraryNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn songs(&self) -> impl Iterator<Item = (NodeId, &LibraryNode)> {
        self.iter().filter(|(_, n)| n.node_type == NodeType::Song)
    }

    pub fn find(&self, path: &Path) -> Option<NodeId> {
        self.iter().find(|(_, n)| n.path == path).map(|(id, _)| id)
    }

    /// Depth below the root; 0 for an id this library does not know
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.get(parent).and_then(|n| n.parent);
        }
        depth
    }

    /// The artist a node belongs to: itself for an artist, its folder for a
    /// song, nothing for a plain folder
    pub fn artist_of(&self, id: NodeId) -> Option<NodeId> {
        let node = self.get(id)?;
        match node.node_type {
            NodeType::Artist => Some(id),
            NodeType::Song => node.parent,
            NodeType::Folder => None,
        }
    }

    /// Highlight songs whose `filter` field is true, and every folder above them
    pub fn highlight(&self, filter: HighlightFilter) -> Highlights {
        let mut states = vec![Highlight::Plain; self.nodes.len()];

        // Reverse pre-order visits children before their parent
        for index in (0..self.nodes.len()).rev() {
            let node = &self.nodes[index];
            states[index] = match node.node_type {
                NodeType::Song => song_highlight(&node.path, filter),
                NodeType::Artist | NodeType::Folder => {
                    if node
                        .children
                        .iter()
                        .any(|child| states[child.0] == Highlight::Highlighted)
                    {
                        Highlight::Highlighted
                    } else {
                        Highlight::Plain
                    }
                }
            };
        }

        Highlights { states }
    }

    /// Tidy every lyrics file in the library
    pub fn tidy_all(&self) -> TidyReport {
        let mut report = TidyReport::default();

        for (_, song) in self.songs().filter(|(_, n)| is_lyrics_file(&n.path)) {
            match tidy::tidy_file(&song.path) {
                Ok(TidyOutcome::AlreadyClean) => report.clean += 1,
                Ok(TidyOutcome::Repaired) => report.repaired.push(song.path.clone()),
                Err(e) => {
                    warn!("Skipping {}: {}", song.path.display(), e);
                    report.failed.push((song.path.clone(), e));
                }
            }
        }

        report
    }
}

/// Scan `root` and tidy every lyrics file under it
pub fn tidy_tree(root: impl AsRef<Path>) -> Result<TidyReport, ScanError> {
    Ok(LyricsLibrary::scan(root)?.tidy_all())
}

/// Lyrics files are `.xml`, compared case-insensitively
pub fn is_lyrics_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("xml"))
        .unwrap_or(false)
}

fn song_highlight(path: &Path, filter: HighlightFilter) -> Highlight {
    if !is_lyrics_file(path) {
        return Highlight::Plain;
    }

    match reader::read_value::<bool>(path, filter.field_name()) {
        Ok(true) => Highlight::Highlighted,
        Ok(false) => Highlight::Plain,
        Err(e) if e.is_missing_value() => Highlight::Plain,
        Err(e) => {
            warn!("Cannot read {}: {}", path.display(), e);
            Highlight::Unreadable
        }
    }
}

fn should_process_entry(entry: &DirEntry) -> bool {
    let file_name = entry.file_name().to_string_lossy();

    if IGNORE_PATTERNS.iter().any(|pattern| file_name == *pattern) {
        return false;
    }

    // Staged copies left behind by an interrupted tidy
    !(entry.file_type().is_file() && file_name.ends_with(SCRATCH_SUFFIX))
}

fn display_name(entry: &DirEntry) -> String {
    match entry.path().file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => entry.path().display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<document><title>x</title></document>").unwrap();
    }

    #[test]
    fn test_scan_nonexistent_path() {
        match LyricsLibrary::scan("/nonexistent/lyrics/path") {
            Err(ScanError::PathNotFound(_)) => {}
            other => panic!("Expected PathNotFound, got {:?}", other.map(|l| l.len())),
        }
    }

    #[test]
    fn test_scan_file_is_not_a_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("song.xml");
        touch(&file);
        assert!(matches!(
            LyricsLibrary::scan(&file),
            Err(ScanError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_node_types() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("Rock/Band/Song.xml"));
        fs::create_dir_all(temp.path().join("Empty")).unwrap();

        let library = LyricsLibrary::scan(temp.path()).unwrap();
        let rock = library.find(&temp.path().join("Rock")).unwrap();
        let band = library.find(&temp.path().join("Rock/Band")).unwrap();
        let song = library.find(&temp.path().join("Rock/Band/Song.xml")).unwrap();
        let empty = library.find(&temp.path().join("Empty")).unwrap();

        assert_eq!(library.node(library.root()).node_type, NodeType::Folder);
        assert_eq!(library.node(rock).node_type, NodeType::Folder);
        assert_eq!(library.node(band).node_type, NodeType::Artist);
        assert_eq!(library.node(song).node_type, NodeType::Song);
        assert_eq!(library.node(empty).node_type, NodeType::Folder);
        assert_eq!(library.depth(song), 3);
    }

    #[test]
    fn test_artist_of() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("Band/Song.xml"));

        let library = LyricsLibrary::scan(temp.path()).unwrap();
        let band = library.find(&temp.path().join("Band")).unwrap();
        let song = library.find(&temp.path().join("Band/Song.xml")).unwrap();

        assert_eq!(library.artist_of(song), Some(band));
        assert_eq!(library.artist_of(band), Some(band));
        assert_eq!(library.artist_of(library.root()), None);
    }

    #[test]
    fn test_foreign_node_id_does_not_panic() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("Band/Song.xml"));

        let library = LyricsLibrary::scan(temp.path()).unwrap();
        let foreign = NodeId(library.len() + 10);

        assert!(library.get(foreign).is_none());
        assert!(library.get(library.root()).is_some());
        assert_eq!(library.depth(foreign), 0);
        assert_eq!(library.artist_of(foreign), None);
    }

    #[test]
    fn test_children_sorted_by_name() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("Band/b.xml"));
        touch(&temp.path().join("Band/a.xml"));
        touch(&temp.path().join("Band/c.xml"));

        let library = LyricsLibrary::scan(temp.path()).unwrap();
        let band = library.find(&temp.path().join("Band")).unwrap();
        let names: Vec<&str> = library
            .node(band)
            .children
            .iter()
            .map(|c| library.node(*c).name.as_str())
            .collect();
        assert_eq!(names, vec!["a.xml", "b.xml", "c.xml"]);
    }

    #[test]
    fn test_ignored_entries_skipped() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("Band/Song.xml"));
        touch(&temp.path().join("Band/Song.xml.correct.xml"));
        touch(&temp.path().join("Band/Thumbs.db"));
        touch(&temp.path().join(".git/config"));

        let library = LyricsLibrary::scan(temp.path()).unwrap();
        let songs: Vec<&str> = library.songs().map(|(_, n)| n.name.as_str()).collect();
        assert_eq!(songs, vec!["Song.xml"]);
    }

    #[test]
    fn test_lyrics_file_extension() {
        assert!(is_lyrics_file(Path::new("a/Song.xml")));
        assert!(is_lyrics_file(Path::new("a/Song.XML")));
        assert!(!is_lyrics_file(Path::new("a/Song.txt")));
        assert!(!is_lyrics_file(Path::new("a/Song")));
    }
}
