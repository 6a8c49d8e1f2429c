//! Collection of declaration documents ([Body] and path to source file)
//!
//! [HclDocuments] tracks
//! - the source path
//! - the root blocks
//! - the root attributes
//! and defines a numeric index for each. Once added those indices are stable (removal is not possible).
//!
//! Directories are read in file name order so that declaration order, and with it the synthesized output, does not
//! depend on the file system.
use hcl_edit::structure::{Attribute, Block, Body, Structure};
use std::path::{Path, PathBuf};

/// File name suffix of declaration files
pub const FILE_SUFFIX: &str = ".infra.hcl";

#[derive(Default, Debug)]
pub struct HclDocuments {
    sources: Vec<Source>,
    root_attributes: Vec<(usize, Attribute)>,
    root_blocks: Vec<(usize, Block)>,
}

impl HclDocuments {
    /// Inserts and indexes an hcl document
    pub fn insert(&mut self, document: Body, path: impl Into<Option<PathBuf>>) {
        let source_index = self.sources.len();
        self.sources.push(path.into());

        for structure in document.into_iter() {
            match structure {
                Structure::Block(block) => self.root_blocks.push((source_index, block)),
                Structure::Attribute(attribute) => {
                    self.root_attributes.push((source_index, attribute))
                }
            }
        }
    }

    pub fn get_attribute(&self, index: usize) -> SourceAttribute {
        let (source_index, attribute) = &self.root_attributes[index];
        (index, &self.sources[*source_index], attribute)
    }

    pub fn attributes(&self) -> impl Iterator<Item = SourceAttribute> {
        self.root_attributes
            .iter()
            .enumerate()
            .map(|(index, (source_index, attribute))| {
                (index, &self.sources[*source_index], attribute)
            })
    }

    pub fn blocks(&self) -> impl Iterator<Item = SourceBlock> {
        self.root_blocks
            .iter()
            .enumerate()
            .map(|(index, (source_index, block))| (index, &self.sources[*source_index], block))
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }
}

impl HclDocuments {
    /// Parses `contents` as one document, `path` is only used for reporting
    pub fn load_str(&mut self, contents: &str, path: Option<PathBuf>) -> Result<(), LoadError> {
        let body = hcl_edit::parser::parse_body(contents).map_err(|source| LoadError::HclParseFailed {
            path: path.clone(),
            source,
        })?;

        self.insert(body, path);
        Ok(())
    }

    pub fn load_file(&mut self, file_path: &Path) -> Result<(), LoadError> {
        let file_path = file_path.canonicalize().map_err(|source| LoadError::Io {
            path: file_path.to_path_buf(),
            source,
        })?;
        tracing::info!(path=%file_path.display(), "loading file");

        let file_contents = std::fs::read_to_string(&file_path).map_err(|source| LoadError::Io {
            path: file_path.clone(),
            source,
        })?;
        self.load_str(&file_contents, Some(file_path))
    }

    /// Loads every declaration file (see [FILE_SUFFIX]) of `dir_path`, in file name order
    pub fn load_directory(&mut self, dir_path: &Path) -> Result<(), LoadError> {
        let io_error = |source| LoadError::Io {
            path: dir_path.to_path_buf(),
            source,
        };

        let mut file_paths = vec![];
        for dir_entry in std::fs::read_dir(dir_path).map_err(io_error)? {
            let dir_entry = dir_entry.map_err(io_error)?;
            if !dir_entry.file_type().map_err(io_error)?.is_file() {
                continue;
            }

            let is_declaration_file = dir_entry
                .file_name()
                .to_string_lossy()
                .ends_with(FILE_SUFFIX);
            if is_declaration_file {
                file_paths.push(dir_entry.path());
            }
        }

        if file_paths.is_empty() {
            return Err(LoadError::NoFilesFound(dir_path.to_path_buf()));
        }

        file_paths.sort();
        for file_path in &file_paths {
            self.load_file(file_path)?;
        }

        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("No `*.infra.hcl` files found in {}", .0.display())]
    NoFilesFound(PathBuf),
    #[error("Unable to read {}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unable to parse {}", display_source(.path))]
    HclParseFailed {
        path: Source,
        source: hcl_edit::parser::Error,
    },
}

fn display_source(source: &Source) -> String {
    match source {
        Some(path) => path.display().to_string(),
        None => "<stdin>".to_string(),
    }
}

impl From<Body> for HclDocuments {
    fn from(value: Body) -> Self {
        let mut documents = HclDocuments::default();
        documents.insert(value, None);
        documents
    }
}

/// Utility macro to create [HclDocuments]
///
/// Create from a single document
/// ```
/// # use azsynth::hcl_documents;
/// hcl_documents!(r#"resource_group "core" {}"#);
/// ```
///
/// Create from multiple documents (path required)
/// ```
/// # use azsynth::hcl_documents;
/// hcl_documents! {
///   "network.infra.hcl" => r#"resource_group "network" {}"#,
///   "apps.infra.hcl" => r#"resource_group "apps" {}"#
/// };
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use azsynth::hcl_documents;
/// hcl_documents!("not = valid = hcl");
/// ```
#[macro_export]
macro_rules! hcl_documents {
    // single document without source
    { $expr:expr } => {
        $crate::hcl_documents::HclDocuments::from(hcl_edit::parser::parse_body($expr).expect("body must parse"))
    };
    // multi document with sources
    { $($source:expr => $expr:expr),+ } => {
        let mut docs = $crate::hcl_documents::HclDocuments::default();
        $(
            docs.insert(hcl_edit::parser::parse_body($expr).expect("body must parse"), Some($source.into()));
        )+

        docs
    };
}

pub type Source = Option<PathBuf>;
pub type SourceAttribute<'a> = (usize, &'a Source, &'a Attribute);
pub type SourceBlock<'a> = (usize, &'a Source, &'a Block);

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    #[test]
    fn iterators() {
        let hcl_documents = hcl_documents! {r#"
        attr_1 = 1
        resource_group "core" {}
        group "shared" "extra" {}
        attr_2 = 2
        attr_3 = 3
        "#};

        assert_eq!(hcl_documents.attributes().count(), 3);
        assert_eq!(hcl_documents.blocks().count(), 2);
        assert_eq!(
            hcl_documents.get_attribute(1).2.key.value().as_str(),
            "attr_2"
        );
    }

    #[test]
    fn directories_load_in_file_name_order() {
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
        let mut documents = HclDocuments::default();
        documents.load_directory(&fixtures).unwrap();

        let names: Vec<String> = documents
            .sources()
            .flatten()
            .map(|path| path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["groups.infra.hcl", "network.infra.hcl"]);
    }

    #[test]
    fn parse_errors_name_their_source() {
        let mut documents = HclDocuments::default();
        let error = documents
            .load_str("not = valid = hcl", Some("broken.infra.hcl".into()))
            .unwrap_err();
        assert_eq!(error.to_string(), "Unable to parse broken.infra.hcl");

        let error = documents.load_str("not = valid = hcl", None).unwrap_err();
        assert_eq!(error.to_string(), "Unable to parse <stdin>");
        assert_eq!(documents.source_count(), 0);
    }

    #[test]
    fn empty_directories_are_rejected() {
        let empty = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/bin");
        let error = HclDocuments::default().load_directory(&empty).unwrap_err();
        assert!(matches!(error, LoadError::NoFilesFound(_)));
    }
}
