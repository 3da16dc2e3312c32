use similar::TextDiff;

use super::model::Revision;

/// Unified line diff between two revisions' content.
pub fn unified_diff(from: &Revision, to: &Revision) -> String {
    TextDiff::from_lines(&from.content, &to.content)
        .unified_diff()
        .context_radius(3)
        .header(
            &format!("revision {}", from.id),
            &format!("revision {}", to.id),
        )
        .to_string()
}
