//! JSON report for scripting.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "groups": [
//!     {
//!       "fingerprint": "a.txt-2",
//!       "size": 2,
//!       "files": ["/data/a.txt", "/data/copy/a.txt"]
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 3,
//!     "groups": 2,
//!     "duplicate_groups": 1,
//!     "duplicate_files": 1,
//!     "reclaimable_bytes": 2
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use super::{report_groups, OutputError, ReportGroup};
use crate::duplicates::{GroupSummary, ResultMap};

/// A single group in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonGroup {
    /// Shared fingerprint
    pub fingerprint: String,
    /// Size of the first file in bytes
    pub size: u64,
    /// Paths sorted lexically
    pub files: Vec<String>,
}

impl From<&ReportGroup<'_>> for JsonGroup {
    fn from(group: &ReportGroup<'_>) -> Self {
        Self {
            fingerprint: group.fingerprint.to_string(),
            size: group.files.first().map_or(0, |f| f.stats.size),
            files: group
                .files
                .iter()
                .map(|f| f.path.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Complete JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Reported groups
    pub groups: Vec<JsonGroup>,
    /// Counts over the whole map, including unreported unique files
    pub summary: GroupSummary,
}

impl JsonOutput {
    /// Prepare a document. Unique files are listed only with `include_unique`.
    #[must_use]
    pub fn new(map: &ResultMap, include_unique: bool) -> Self {
        Self {
            groups: report_groups(map, include_unique)
                .iter()
                .map(JsonGroup::from)
                .collect(),
            summary: map.summary(),
        }
    }

    /// Serialize to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), OutputError> {
        let json = self.to_json(pretty)?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}
