use super::Collator;

/// Bucket label for names that match no configured group.
pub const OTHER_BUCKET: &str = "#";

#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexGroup {
    label: String,
    prefixes: Vec<String>,
}

/// Alphabetical buckets parsed from an index string such as
/// `"A B C X-Z(XYZ)"`. A token with parentheses names a group whose
/// members are the characters inside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicIndex {
    groups: Vec<IndexGroup>,
}

impl MusicIndex {
    /// Parse an index string such as `A B C X-Z(XYZ)`.
    pub fn parse(index_string: &str) -> Self {
        let groups = index_string
            .split_whitespace()
            .filter_map(|token| {
                if let Some((label, rest)) = token.split_once('(') {
                    let members = rest.trim_end_matches(')');
                    let prefixes: Vec<String> = members
                        .chars()
                        .map(|c| c.to_uppercase().collect())
                        .collect();
                    if label.is_empty() || prefixes.is_empty() {
                        return None;
                    }
                    Some(IndexGroup {
                        label: label.to_string(),
                        prefixes,
                    })
                } else {
                    Some(IndexGroup {
                        label: token.to_string(),
                        prefixes: vec![token.to_uppercase()],
                    })
                }
            })
            .collect();
        Self { groups }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|group| group.label.as_str())
    }

    /// Label of the group `name` sorts under, or [`OTHER_BUCKET`].
    pub fn bucket(&self, collator: &Collator, name: &str) -> String {
        let reading = collator.reading(name).to_uppercase();
        self.groups
            .iter()
            .find(|group| group.prefixes.iter().any(|p| reading.starts_with(p.as_str())))
            .map(|group| group.label.clone())
            .unwrap_or_else(|| OTHER_BUCKET.to_string())
    }
}
