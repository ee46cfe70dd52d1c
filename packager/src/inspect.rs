//! Reading the descriptor back out of a packaged archive.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use vdb_core::{
    DDL_DESCRIPTOR_ENTRY, DESCRIPTOR_ENTRY, VdbDescriptor, parse_descriptor, serialize_descriptor,
};
use zip::result::ZipError;

use crate::error::{IoContext, PackageError, Result};

/// Descriptor embedded in a `.vdb` archive.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddedDescriptor {
    Standard(VdbDescriptor),
    /// Raw DDL text from `META-INF/vdb.ddl`.
    FlatDeclarative(String),
}

impl EmbeddedDescriptor {
    /// Pretty JSON view. DDL is wrapped as `{"ddl": "..."}`.
    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            Self::Standard(descriptor) => serde_json::to_string_pretty(descriptor)?,
            Self::FlatDeclarative(ddl) => {
                serde_json::to_string_pretty(&serde_json::json!({ "ddl": ddl }))?
            }
        };
        Ok(json)
    }

    /// The descriptor in its native format: XML or DDL text.
    pub fn to_text(&self) -> Result<String> {
        match self {
            Self::Standard(descriptor) => {
                let bytes = serialize_descriptor(descriptor)?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Self::FlatDeclarative(ddl) => Ok(ddl.clone()),
        }
    }
}

/// Reads the descriptor stored in `archive`.
///
/// # Errors
///
/// Returns [`PackageError::DescriptorNotFound`] if the archive holds neither
/// `META-INF/vdb.xml` nor `META-INF/vdb.ddl`, [`PackageError::Parse`] if
/// the XML descriptor is malformed, or [`PackageError::Zip`] /
/// [`PackageError::Io`] if the archive cannot be read.
pub fn read_embedded_descriptor(archive: &Path) -> Result<EmbeddedDescriptor> {
    let file =
        File::open(archive).context_with(|| format!("failed to open {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)?;

    if let Some(bytes) = read_entry(&mut zip, DESCRIPTOR_ENTRY, archive)? {
        let descriptor = parse_descriptor(&bytes).map_err(|source| {
            PackageError::parse(&archive.join(DESCRIPTOR_ENTRY), source)
        })?;
        return Ok(EmbeddedDescriptor::Standard(descriptor));
    }
    if let Some(bytes) = read_entry(&mut zip, DDL_DESCRIPTOR_ENTRY, archive)? {
        return Ok(EmbeddedDescriptor::FlatDeclarative(
            String::from_utf8_lossy(&bytes).into_owned(),
        ));
    }

    Err(PackageError::DescriptorNotFound(format!(
        "{DESCRIPTOR_ENTRY} or {DDL_DESCRIPTOR_ENTRY} in {}",
        archive.display()
    )))
}

fn read_entry(
    zip: &mut zip::ZipArchive<File>,
    name: &str,
    archive: &Path,
) -> Result<Option<Vec<u8>>> {
    let mut entry = match zip.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .context_with(|| format!("failed to read {name} from {}", archive.display()))?;
    Ok(Some(bytes))
}
