use crate::model::node::TreeNode;

/// Why a proposed note or folder name was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("name cannot be empty")]
    Empty,
    #[error("name cannot contain {0:?}")]
    InvalidChar(char),
    #[error("'{0}' is a reserved name")]
    Reserved(String),
    #[error("names starting with '.' are hidden")]
    Hidden,
    #[error("'{0}' already exists in this folder")]
    Taken(String),
}

/// Validate `name` as the title of an entry among `siblings`.
///
/// `renaming` is the entry being renamed, if any; it may keep its own name.
/// Collisions are case-insensitive.
pub fn validate_name(
    siblings: &[TreeNode],
    renaming: Option<&TreeNode>,
    name: &str,
) -> Result<(), NameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }
    if let Some(c) = name.chars().find(|c| matches!(c, '/' | '\\' | '\0')) {
        return Err(NameError::InvalidChar(c));
    }
    if trimmed == "." || trimmed == ".." {
        return Err(NameError::Reserved(trimmed.to_string()));
    }
    if trimmed.starts_with('.') {
        return Err(NameError::Hidden);
    }

    let lower = trimmed.to_lowercase();
    let clash = siblings.iter().find(|s| {
        let is_self = renaming.is_some_and(|r| r.key == s.key);
        !is_self && s.title.to_lowercase() == lower
    });
    match clash {
        Some(s) => Err(NameError::Taken(s.title.clone())),
        None => Ok(()),
    }
}

/// File name on disk for a title: notes get the configured extension.
pub fn file_name_for(title: &str, is_note: bool, extension: &str) -> String {
    let title = title.trim();
    if is_note && !extension.is_empty() {
        let suffix = format!(".{}", extension);
        if title.ends_with(&suffix) {
            title.to_string()
        } else {
            format!("{}{}", title, suffix)
        }
    } else {
        title.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn siblings() -> Vec<TreeNode> {
        vec![
            TreeNode::leaf("ideas.md", "ideas"),
            TreeNode::folder("Work", "Work", vec![]),
        ]
    }

    #[test]
    fn accepts_fresh_names() {
        assert!(validate_name(&siblings(), None, "journal").is_ok());
        assert!(validate_name(&siblings(), None, "  spaced out ").is_ok());
    }

    #[test]
    fn rejects_bad_shapes() {
        let s = siblings();
        assert_eq!(validate_name(&s, None, ""), Err(NameError::Empty));
        assert_eq!(validate_name(&s, None, "   "), Err(NameError::Empty));
        assert_eq!(validate_name(&s, None, "a/b"), Err(NameError::InvalidChar('/')));
        assert_eq!(validate_name(&s, None, "a\\b"), Err(NameError::InvalidChar('\\')));
        assert_eq!(validate_name(&s, None, ".."), Err(NameError::Reserved("..".into())));
        assert_eq!(validate_name(&s, None, ".secret"), Err(NameError::Hidden));
    }

    #[test]
    fn rejects_sibling_collision_case_insensitively() {
        let s = siblings();
        assert_eq!(validate_name(&s, None, "IDEAS"), Err(NameError::Taken("ideas".into())));
        assert_eq!(validate_name(&s, None, "work"), Err(NameError::Taken("Work".into())));
    }

    #[test]
    fn renaming_may_keep_own_name() {
        let s = siblings();
        assert!(validate_name(&s, Some(&s[0]), "Ideas").is_ok());
        assert!(validate_name(&s, Some(&s[0]), "work").is_err());
    }

    #[test]
    fn file_names() {
        assert_eq!(file_name_for("ideas", true, "md"), "ideas.md");
        assert_eq!(file_name_for("ideas.md", true, "md"), "ideas.md");
        assert_eq!(file_name_for("Work", false, "md"), "Work");
    }
}
