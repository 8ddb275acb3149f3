//! Saving and loading computed matrix profiles.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::annotation::AnnotationVector;
use crate::core::matrix_profile::{MatrixProfile, Neighbor};
use crate::error::{Error, Result};

/// On-disk encoding of a matrix profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            other => Err(Error::InvalidParameter(format!(
                "unsupported format {other:?}"
            ))),
        }
    }
}

/// Persisted layout. Field names are part of the file format.
#[derive(Serialize, Deserialize)]
struct Persisted {
    a: Vec<f64>,
    b: Option<Vec<f64>>,
    m: usize,
    profile: Vec<f64>,
    profile_index: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    right_profile: Option<Vec<Option<Neighbor>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotation: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotation_kind: Option<AnnotationVector>,
}

impl MatrixProfile {
    /// Write a computed profile to `writer`.
    ///
    /// The same invariants [`from_reader`](Self::from_reader) enforces are
    /// checked first, so nothing is written that could not be read back.
    pub fn to_writer<W: Write>(&self, writer: W, format: Format) -> Result<()> {
        self.require_computed()?;
        self.check_invariants()?;
        let doc = Persisted {
            a: self.a.clone(),
            b: self.b.clone(),
            m: self.m,
            profile: self.profile.clone(),
            profile_index: self.profile_index.clone(),
            right_profile: self.right_profile.clone(),
            annotation: self.annotation.clone(),
            annotation_kind: self.annotation_kind,
        };
        match format {
            Format::Json => serde_json::to_writer(writer, &doc)?,
        }
        Ok(())
    }

    /// Read a profile written by [`to_writer`](Self::to_writer), checking
    /// every invariant before returning it.
    pub fn from_reader<R: Read>(reader: R, format: Format) -> Result<Self> {
        let doc: Persisted = match format {
            Format::Json => serde_json::from_reader(reader)?,
        };
        let mp = Self {
            a: doc.a,
            b: doc.b,
            m: doc.m,
            profile: doc.profile,
            profile_index: doc.profile_index,
            right_profile: doc.right_profile,
            annotation: doc.annotation,
            annotation_kind: doc.annotation_kind,
            computed: true,
            stats: None,
            parallelism: num_cpus::get(),
        };
        mp.check_invariants()?;
        Ok(mp)
    }

    pub fn save(&self, path: impl AsRef<Path>, format: Format) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer, format)?;
        writer.flush()?;
        debug!(path = %path.display(), n_subs = self.len(), "saved matrix profile");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>, format: Format) -> Result<Self> {
        let path = path.as_ref();
        let mp = Self::from_reader(BufReader::new(File::open(path)?), format)?;
        debug!(path = %path.display(), n_subs = mp.len(), "loaded matrix profile");
        Ok(mp)
    }
}
