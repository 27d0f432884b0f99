/// Ordered mapping from expected file name to target table. Fixed at
/// construction; it defines the complete and exact set of files a source
/// directory must contain.
#[derive(Debug, Clone)]
pub struct TableMapping {
    entries: Vec<MappingEntry>,
}

#[derive(Debug, Clone)]
pub struct MappingEntry {
    pub file_name: String,
    pub table: String,
}

impl TableMapping {
    pub fn new<F, T>(pairs: impl IntoIterator<Item = (F, T)>) -> Self
    where
        F: Into<String>,
        T: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(file_name, table)| MappingEntry {
                    file_name: file_name.into(),
                    table: table.into(),
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.file_name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
