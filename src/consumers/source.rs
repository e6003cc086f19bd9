use std::ffi::OsStr;
use std::fs::{read_dir, read_to_string};
use std::io::{stdin, Read};
use std::path::{Path, PathBuf};

use crate::producers::blif::{parse_blif_texts, ParseOptions};
use crate::producers::json::parse_json_with;
use crate::structs::graph::ModuleGraph;
use crate::structs::wire::{Domain, WireAllocator};
use crate::Result;

/// The input formats of netlists.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NetlistFormat {
    Blif,
    Json,
}

impl NetlistFormat {
    pub fn from_path(path: &Path) -> Option<NetlistFormat> {
        match path.extension().and_then(OsStr::to_str) {
            Some("blif") => Some(NetlistFormat::Blif),
            Some("json") => Some(NetlistFormat::Json),
            _ => None,
        }
    }

    /// Guess the format of a text without a file name: Yosys JSON is an object.
    pub fn sniff(text: &str) -> NetlistFormat {
        if text.trim_start().starts_with('{') {
            NetlistFormat::Json
        } else {
            NetlistFormat::Blif
        }
    }
}

/// Source finds and reads netlists.
/// It reads every .blif or .json file of the given directories, or the given files.
/// It supports reading from stdin using dash (-) as a special filename.
///
/// # Example
/// ```
/// use bristolify::Source;
/// use bristolify::producers::blif::ParseOptions;
/// use bristolify::producers::examples::example_hierarchy_blif;
/// use bristolify::structs::wire::Domain;
///
/// let source = Source::from_buffers(vec![example_hierarchy_blif().to_string()]);
/// let graph = source.read_graph(Domain::Boolean, &ParseOptions::default()).unwrap();
/// assert_eq!(graph.top_name(), Some("top"));
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Source {
    /// Set to true to print the paths of files as they are read.
    pub print_filenames: bool,

    buffer_source: BufferSource,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum BufferSource {
    Stdin,
    Files(Vec<PathBuf>),
    Memory(Vec<String>),
}

impl Source {
    pub fn from_dirs_and_files(paths: &[PathBuf]) -> Result<Self> {
        let all_files = list_workspace_files(paths)?;
        if all_files.is_empty() {
            return Err("No netlist found (.blif or .json).".into());
        }
        Ok(Self::from_filenames(all_files))
    }

    pub fn from_filenames(mut paths: Vec<PathBuf>) -> Self {
        let source = if paths == vec![PathBuf::from("-")] {
            BufferSource::Stdin
        } else {
            paths.sort();
            BufferSource::Files(paths)
        };
        Source {
            buffer_source: source,
            print_filenames: false,
        }
    }

    pub fn from_buffers(buffers: Vec<String>) -> Self {
        Source {
            buffer_source: BufferSource::Memory(buffers),
            print_filenames: false,
        }
    }

    /// Read every text with its format.
    pub fn read_texts(&self) -> Result<Vec<(NetlistFormat, String)>> {
        let mut texts = vec![];
        match &self.buffer_source {
            BufferSource::Stdin => {
                let mut text = String::new();
                stdin().read_to_string(&mut text)?;
                texts.push((NetlistFormat::sniff(&text), text));
            }
            BufferSource::Files(paths) => {
                for path in paths {
                    if self.print_filenames {
                        eprintln!("Reading {}", path.display());
                    }
                    let text = read_to_string(path)?;
                    let format = NetlistFormat::from_path(path).unwrap_or_else(|| NetlistFormat::sniff(&text));
                    texts.push((format, text));
                }
            }
            BufferSource::Memory(buffers) => {
                for text in buffers {
                    texts.push((NetlistFormat::sniff(text), text.clone()));
                }
            }
        }
        Ok(texts)
    }

    /// Parse all texts as one netlist and resolve its instances.
    /// Several BLIF files are merged; a JSON netlist must come alone.
    pub fn read_graph(&self, domain: Domain, options: &ParseOptions) -> Result<ModuleGraph> {
        let texts = self.read_texts()?;
        let allocator = WireAllocator::new(domain);

        let graph = match &texts[..] {
            [(NetlistFormat::Json, text)] => parse_json_with(text, allocator, options)?,
            _ if texts.iter().all(|(format, _)| *format == NetlistFormat::Blif) => {
                parse_blif_texts(texts.iter().map(|(_, text)| text.as_str()), allocator, options)?
            }
            _ => return Err("A JSON netlist cannot be combined with other files.".into()),
        };
        tracing::debug!(
            "Read {} modules with {} named wires, top is {:?}",
            graph.len(),
            graph.allocator.len(),
            graph.top_name()
        );
        Ok(graph)
    }
}

pub fn has_netlist_extension(path: &Path) -> bool {
    NetlistFormat::from_path(path).is_some()
}

pub fn list_workspace_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut all_paths = vec![];

    for path in paths {
        if has_netlist_extension(path) {
            all_paths.push(path.clone());
        } else if path == Path::new("-") {
            if paths.len() > 1 {
                return Err("Cannot combine files and stdin".into());
            }
            all_paths.push(path.clone());
        } else {
            for file in read_dir(path)? {
                match file {
                    Ok(file) => {
                        if has_netlist_extension(&file.path()) {
                            all_paths.push(file.path());
                        }
                    }
                    Err(err) => {
                        tracing::warn!("{}", err);
                        continue;
                    }
                }
            }
        }
    }
    Ok(all_paths)
}

#[test]
fn test_source() -> Result<()> {
    use crate::producers::examples::*;
    use std::fs::{create_dir_all, write};

    let dir = PathBuf::from("local/test_source");
    create_dir_all(&dir)?;
    write(dir.join("hierarchy.blif"), example_hierarchy_blif())?;
    write(dir.join("notes.txt"), "not a netlist")?;

    let files = list_workspace_files(&[dir.clone()])?;
    assert_eq!(files, vec![dir.join("hierarchy.blif")]);

    let graph = Source::from_dirs_and_files(&[dir])?.read_graph(Domain::Boolean, &ParseOptions::default())?;
    assert_eq!(graph.len(), 2);

    // Models may be split across buffers.
    let (top, leaf) = example_hierarchy_blif().split_at(example_hierarchy_blif().find(".model and_inv").unwrap());
    let source = Source::from_buffers(vec![leaf.to_string(), top.to_string()]);
    let graph = source.read_graph(Domain::Boolean, &ParseOptions::default())?;
    assert_eq!(graph.top_name(), Some("and_inv"));

    let mixed = Source::from_buffers(vec![example_hierarchy_json().to_string(), example_and_blif().to_string()]);
    assert!(mixed.read_graph(Domain::Boolean, &ParseOptions::default()).is_err());

    Ok(())
}
