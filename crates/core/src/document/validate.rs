//! Document invariant checks.
//!
//! Pure functions over already-loaded documents; the service calls them
//! before every write and commits only if all of them pass.
use tracing::debug;

use super::model::Document;
use crate::config::KbConfig;
use crate::error::{KbError, KbResult};

const FORBIDDEN_SLUG_CHARS: &[char] = &['/', '?', '#', '%'];
const FORBIDDEN_TITLE_CHARS: &[char] = &['[', ']', '|'];

/// Validate that a document has usable title, slug and locale values.
pub fn validate_document_fields(title: &str, slug: &str, locale: &str) -> KbResult<()> {
    if title.trim().is_empty() {
        return Err(KbError::invariant("document title cannot be empty"));
    }
    if title.trim() != title {
        return Err(KbError::invariant(format!(
            "document title {title:?} has leading or trailing whitespace"
        )));
    }
    // Titles are written into `REDIRECT [[...]]` markers and must read back unchanged.
    if title
        .chars()
        .any(|c| c.is_control() || FORBIDDEN_TITLE_CHARS.contains(&c))
    {
        return Err(KbError::invariant(format!(
            "document title {title:?} contains a control character or one of [ ] |"
        )));
    }
    if slug.is_empty() {
        return Err(KbError::invariant("document slug cannot be empty"));
    }
    if slug
        .chars()
        .any(|c| c.is_whitespace() || FORBIDDEN_SLUG_CHARS.contains(&c))
    {
        return Err(KbError::invariant(format!(
            "document slug {slug:?} contains whitespace or one of / ? # %"
        )));
    }
    if locale.is_empty() {
        return Err(KbError::invariant("document locale cannot be empty"));
    }
    Ok(())
}

pub fn is_template_title(title: &str, config: &KbConfig) -> bool {
    title.starts_with(&config.template_title_prefix)
}

/// Decide `is_localizable` for a document in `locale`.
///
/// Only default-locale documents may be localizable; asking for it anywhere
/// else is an error, leaving it unspecified yields false.
pub fn resolve_localizable(
    locale: &str,
    requested: Option<bool>,
    config: &KbConfig,
) -> KbResult<bool> {
    let is_default = locale == config.default_locale;
    match requested {
        Some(true) if !is_default => Err(KbError::invariant(format!(
            "only {} documents can be localizable, not {locale}",
            config.default_locale
        ))),
        Some(value) => Ok(value),
        None => Ok(is_default),
    }
}

/// A document with translations must stay localizable.
pub fn check_localizable_with_translations(
    doc: &Document,
    is_localizable: bool,
    translation_count: usize,
) -> KbResult<()> {
    if !is_localizable && translation_count > 0 {
        return Err(KbError::invariant(format!(
            "document {:?} has {translation_count} translations but is not localizable",
            doc.title
        )));
    }
    Ok(())
}

/// Check that `parent` can take a translation into `locale`.
pub fn check_parent(parent: &Document, locale: &str) -> KbResult<()> {
    if parent.is_translation() {
        return Err(KbError::invariant(format!(
            "document {:?} is itself a translation and cannot be a parent",
            parent.title
        )));
    }
    if !parent.is_localizable {
        return Err(KbError::invariant(format!(
            "parent {:?} is not localizable",
            parent.title
        )));
    }
    if parent.locale == locale {
        return Err(KbError::invariant(format!(
            "a translation must not share its parent's locale {locale}"
        )));
    }
    Ok(())
}

/// Copy category and archival state from the parent ("parent wins").
///
/// Returns true when a differing value on the translation was overridden.
pub fn inherit_from_parent(doc: &mut Document, parent: &Document) -> bool {
    let overridden = doc.category != parent.category || doc.is_archived != parent.is_archived;
    if overridden {
        debug!(
            document_id = %doc.id,
            parent_id = %parent.id,
            "translation category/archival overridden by parent"
        );
    }
    doc.category = parent.category;
    doc.is_archived = parent.is_archived;
    overridden
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Category, DocumentId};
    use chrono::Utc;

    fn doc(id: i64, locale: &str) -> Document {
        Document {
            id: DocumentId(id),
            title: format!("Doc {id}"),
            slug: format!("doc-{id}"),
            locale: locale.into(),
            category: Category::HowTo,
            is_archived: false,
            is_template: false,
            is_localizable: locale == "en-US",
            parent_id: None,
            current_revision_id: None,
            latest_localizable_revision_id: None,
            html: String::new(),
            contributors: Default::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn rejects_bad_fields() {
        assert!(validate_document_fields("", "foo", "en-US").is_err());
        assert!(validate_document_fields("Foo", "", "en-US").is_err());
        assert!(validate_document_fields("Foo", "a/b", "en-US").is_err());
        assert!(validate_document_fields("Foo", "a b", "en-US").is_err());
        assert!(validate_document_fields("Foo", "foo", "").is_err());
        assert!(validate_document_fields("Foo", "foo", "en-US").is_ok());
    }

    #[test]
    fn rejects_titles_a_redirect_cannot_hold() {
        let unusable = ["Tabs | Windows", "[[Foo]]", "Foo]", "a [b] c", "Bar ", " Bar", "Two\nlines"];
        for title in unusable {
            assert!(
                matches!(
                    validate_document_fields(title, "foo", "en-US"),
                    Err(KbError::InvariantViolation(_))
                ),
                "{title:?} should be rejected"
            );
        }
        assert!(validate_document_fields("x = y (Firefox 3.6)", "foo", "en-US").is_ok());
    }

    #[test]
    fn localizable_only_in_default_locale() {
        let config = KbConfig::default();
        assert!(resolve_localizable("en-US", None, &config).unwrap());
        assert!(!resolve_localizable("de", None, &config).unwrap());
        assert!(!resolve_localizable("de", Some(false), &config).unwrap());
        assert!(matches!(
            resolve_localizable("de", Some(true), &config),
            Err(KbError::InvariantViolation(_))
        ));
    }

    #[test]
    fn translated_document_stays_localizable() {
        let d = doc(1, "en-US");
        assert!(check_localizable_with_translations(&d, false, 2).is_err());
        assert!(check_localizable_with_translations(&d, false, 0).is_ok());
        assert!(check_localizable_with_translations(&d, true, 2).is_ok());
    }

    #[test]
    fn parent_must_be_localizable_origin() {
        let mut parent = doc(1, "en-US");
        assert!(check_parent(&parent, "de").is_ok());
        assert!(check_parent(&parent, "en-US").is_err());

        parent.is_localizable = false;
        assert!(check_parent(&parent, "de").is_err());

        let mut translation = doc(2, "fr");
        translation.parent_id = Some(DocumentId(1));
        assert!(check_parent(&translation, "de").is_err());
    }

    #[test]
    fn parent_wins_on_category_and_archival() {
        let mut parent = doc(1, "en-US");
        parent.category = Category::Troubleshooting;
        parent.is_archived = true;
        let mut translation = doc(2, "de");

        assert!(inherit_from_parent(&mut translation, &parent));
        assert_eq!(translation.category, Category::Troubleshooting);
        assert!(translation.is_archived);
        assert!(!inherit_from_parent(&mut translation, &parent));
    }
}
