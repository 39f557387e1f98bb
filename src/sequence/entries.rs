//! Flattened view over every section of a route's file list.

use crate::routing::{Frontmatter, ParsedFile};

/// One renderable section plus the options of the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionEntry {
    pub body: String,
    pub options: Frontmatter,
    /// Index of the owning file in the route's list. Consecutive entries
    /// sharing a value form one loop group.
    pub owner_file_index: usize,
}

/// Flatten files into sections, file order first, then in-file order.
///
/// A file without sections still contributes one empty section, so a
/// selected route always has at least one entry.
pub fn flatten(files: &[ParsedFile]) -> Vec<SectionEntry> {
    let mut entries = Vec::new();
    for (owner_file_index, file) in files.iter().enumerate() {
        if file.sections.is_empty() {
            entries.push(SectionEntry {
                body: String::new(),
                options: file.options,
                owner_file_index,
            });
            continue;
        }
        for body in &file.sections {
            entries.push(SectionEntry {
                body: body.clone(),
                options: file.options,
                owner_file_index,
            });
        }
    }
    entries
}

/// A contiguous run of entries owned by one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Group {
    pub start: usize,
    pub len: usize,
}

impl Group {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// The group containing `position`.
pub fn group_at(entries: &[SectionEntry], position: usize) -> Option<Group> {
    let owner = entries.get(position)?.owner_file_index;
    let start = entries[..position]
        .iter()
        .rposition(|e| e.owner_file_index != owner)
        .map(|i| i + 1)
        .unwrap_or(0);
    let len = entries[start..]
        .iter()
        .take_while(|e| e.owner_file_index == owner)
        .count();
    Some(Group { start, len })
}

/// The group following `group`, if any.
pub fn next_group(entries: &[SectionEntry], group: Group) -> Option<Group> {
    group_at(entries, group.end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file(sections: &[&str], options: Frontmatter) -> ParsedFile {
        ParsedFile {
            options,
            sections: sections.iter().map(|s| s.to_string()).collect(),
            source_path: PathBuf::from("test.html"),
            seq_index: -1,
        }
    }

    #[test]
    fn test_flatten_preserves_order_and_owners() {
        let files = vec![
            file(&["a", "b"], Frontmatter::default()),
            file(&["c"], Frontmatter { status: 201, ..Default::default() }),
        ];
        let entries = flatten(&files);
        let bodies: Vec<_> = entries.iter().map(|e| e.body.as_str()).collect();
        assert_eq!(bodies, ["a", "b", "c"]);
        assert_eq!(entries[1].owner_file_index, 0);
        assert_eq!(entries[2].owner_file_index, 1);
        assert_eq!(entries[2].options.status, 201);
    }

    #[test]
    fn test_empty_file_yields_one_section() {
        let entries = flatten(&[file(&[], Frontmatter::default())]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].body, "");
    }

    #[test]
    fn test_groups() {
        let files = vec![
            file(&["a"], Frontmatter::default()),
            file(&["b", "c", "d"], Frontmatter::default()),
            file(&["e", "f"], Frontmatter::default()),
        ];
        let entries = flatten(&files);

        assert_eq!(group_at(&entries, 0), Some(Group { start: 0, len: 1 }));
        assert_eq!(group_at(&entries, 2), Some(Group { start: 1, len: 3 }));
        assert_eq!(group_at(&entries, 5), Some(Group { start: 4, len: 2 }));
        assert_eq!(group_at(&entries, 6), None);

        let middle = Group { start: 1, len: 3 };
        assert_eq!(next_group(&entries, middle), Some(Group { start: 4, len: 2 }));
        assert_eq!(next_group(&entries, Group { start: 4, len: 2 }), None);
    }
}
