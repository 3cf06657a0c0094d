//! TOML descriptor fixtures: describe a device's element tree in a file
//! and serve it through [`HidProvider`].
//!
//! ```toml
//! name = "Two finger touch screen"
//!
//! [[element]]
//! kind = "collection"
//! collection = "application"
//! usage_page = 0x0d
//! usage = 0x04
//!
//!   [[element.children]]
//!   kind = "collection"
//!   collection = "logical"
//!   usage_page = 0x0d
//!   usage = 0x22
//!   repeat = 2
//!   stride = 48
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::driver::HidProvider;
use crate::element::{CollectionType, Element, ElementDirectory, ElementId, ElementKind};
use crate::error::DigitizerError;

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid descriptor TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid element {usage_page:#04x}/{usage:#04x}: {reason}")]
    Invalid {
        usage_page: u16,
        usage: u16,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecKind {
    Collection,
    Input,
    Output,
    Feature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecCollection {
    Application,
    Logical,
    Physical,
}

impl From<SpecCollection> for CollectionType {
    fn from(value: SpecCollection) -> Self {
        match value {
            SpecCollection::Application => CollectionType::Application,
            SpecCollection::Logical => CollectionType::Logical,
            SpecCollection::Physical => CollectionType::Physical,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescriptorFile {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default, rename = "element")]
    pub elements: Vec<ElementSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementSpec {
    pub kind: SpecKind,
    pub collection: Option<SpecCollection>,
    pub usage_page: u16,
    #[serde(default)]
    pub usage: u16,
    #[serde(default)]
    pub report_id: u8,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub logical_min: i32,
    #[serde(default)]
    pub logical_max: i32,
    #[serde(default)]
    pub physical_min: i32,
    #[serde(default)]
    pub physical_max: i32,
    pub value: Option<i32>,
    #[serde(default)]
    pub children: Vec<ElementSpec>,
    /// Number of copies of this subtree.
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    /// Bits added to every field offset in each further copy.
    #[serde(default)]
    pub stride: u32,
}

fn default_name() -> String {
    "fixture".into()
}

fn default_repeat() -> u32 {
    1
}

impl DescriptorFile {
    pub fn parse(content: &str) -> Result<Self, DescriptorError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let content = std::fs::read_to_string(path).map_err(|source| DescriptorError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file = Self::parse(&content)?;
        log::debug!("Loaded descriptor '{}' from {}", file.name, path.display());
        Ok(file)
    }

    /// Build the element directory, expanding repeated subtrees.
    pub fn to_directory(&self) -> Result<ElementDirectory, DescriptorError> {
        let mut directory = ElementDirectory::new();
        for spec in &self.elements {
            add_spec(&mut directory, None, spec, 0)?;
        }
        Ok(directory)
    }
}

fn add_spec(
    directory: &mut ElementDirectory,
    parent: Option<ElementId>,
    spec: &ElementSpec,
    shift: u32,
) -> Result<(), DescriptorError> {
    let invalid = |reason: &str| DescriptorError::Invalid {
        usage_page: spec.usage_page,
        usage: spec.usage,
        reason: reason.into(),
    };
    if spec.repeat == 0 {
        return Err(invalid("repeat must be at least 1"));
    }

    for copy in 0..spec.repeat {
        let shift = shift + copy * spec.stride;
        let element = match spec.kind {
            SpecKind::Collection => {
                let collection = spec.collection.ok_or_else(|| invalid("collection without a collection type"))?;
                Element::collection(collection.into(), spec.usage_page, spec.usage)
            }
            kind => {
                if spec.size == 0 || spec.size > 32 {
                    return Err(invalid("field size must be 1..=32 bits"));
                }
                if !spec.children.is_empty() {
                    return Err(invalid("only collections have children"));
                }
                let kind = match kind {
                    SpecKind::Input => ElementKind::Input,
                    SpecKind::Output => ElementKind::Output,
                    _ => ElementKind::Feature,
                };
                let element = Element::input(spec.usage_page, spec.usage)
                    .with_kind(kind)
                    .with_report(spec.report_id, spec.offset + shift, spec.size)
                    .with_logical(spec.logical_min, spec.logical_max)
                    .with_physical(spec.physical_min, spec.physical_max);
                match spec.value {
                    Some(value) => element.with_value(value),
                    None => element,
                }
            }
        };

        let id = directory.add(parent, element);
        for child in &spec.children {
            add_spec(directory, Some(id), child, shift)?;
        }
    }
    Ok(())
}

/// A [`HidProvider`] backed by a descriptor fixture. Feature writes are
/// recorded instead of sent anywhere.
#[derive(Debug)]
pub struct FixtureProvider {
    name: String,
    directory: ElementDirectory,
    writes: Vec<(ElementId, i32)>,
}

impl FixtureProvider {
    pub fn new(file: &DescriptorFile) -> Result<Self, DescriptorError> {
        Ok(Self {
            name: file.name.clone(),
            directory: file.to_directory()?,
            writes: Vec::new(),
        })
    }

    pub fn uses_report_ids(&self) -> bool {
        self.directory.uses_report_ids()
    }

    pub fn writes(&self) -> &[(ElementId, i32)] {
        &self.writes
    }
}

impl HidProvider for FixtureProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn elements(&mut self) -> Result<ElementDirectory, DigitizerError> {
        if self.directory.is_empty() {
            return Err(DigitizerError::NotFound);
        }
        Ok(self.directory.clone())
    }

    fn set_element_value(&mut self, element: ElementId, value: i32) -> Result<(), DigitizerError> {
        if !self.directory.set_value(element, value) {
            return Err(DigitizerError::Device(format!("element {} cannot be written", element)));
        }
        log::debug!("{}: element {} set to {}", self.name, element, value);
        self.writes.push((element, value));
        Ok(())
    }

    fn close(&mut self) {
        log::debug!("{}: closed", self.name);
    }
}
