//! Human-readable report.
//!
//! ```text
//! 1f3a...e9 ---> 2 files, 12 B each
//!   /data/a.txt
//!   /data/copy/a.txt
//!
//! 3 files in 2 groups: 1 duplicate group, 1 extra copy, 12 B reclaimable
//! ```

use std::io::{self, Write};

use bytesize::ByteSize;

use super::{report_groups, ReportGroup};
use crate::duplicates::{GroupSummary, ResultMap};

/// Text formatter over a [`ResultMap`].
#[derive(Debug)]
pub struct TextOutput<'a> {
    groups: Vec<ReportGroup<'a>>,
    summary: GroupSummary,
}

impl<'a> TextOutput<'a> {
    /// Prepare a report. Unique files are listed only with `include_unique`.
    #[must_use]
    pub fn new(map: &'a ResultMap, include_unique: bool) -> Self {
        Self {
            groups: report_groups(map, include_unique),
            summary: map.summary(),
        }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for group in &self.groups {
            let size = group.files.first().map_or(0, |f| f.stats.size);
            let count = group.files.len();
            writeln!(
                writer,
                "{} ---> {} {}, {} each",
                group.fingerprint,
                count,
                if count == 1 { "file" } else { "files" },
                ByteSize::b(size)
            )?;
            for file in &group.files {
                writeln!(writer, "  {}", file.path.display())?;
            }
            writeln!(writer)?;
        }

        let s = &self.summary;
        writeln!(
            writer,
            "{} files in {} groups: {} duplicate {}, {} extra {}, {} reclaimable",
            s.total_files,
            s.groups,
            s.duplicate_groups,
            if s.duplicate_groups == 1 { "group" } else { "groups" },
            s.duplicate_files,
            if s.duplicate_files == 1 { "copy" } else { "copies" },
            ByteSize::b(s.reclaimable_bytes)
        )
    }
}
