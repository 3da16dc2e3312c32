//! Redirect marker helpers.
//!
//! A redirect stub's content is exactly `REDIRECT [[Target title]]`,
//! optionally surrounded by whitespace.
use crate::lexer::{tokenize, Token};

const REDIRECT_KEYWORD: &str = "REDIRECT";

/// Build the canned content of a redirect stub pointing at `title`.
pub fn redirect_content(title: &str) -> String {
    format!("{REDIRECT_KEYWORD} [[{title}]]")
}

/// Return the target title if `content` is a redirect marker.
pub fn parse_redirect(content: &str) -> Option<String> {
    let rest = content.trim().strip_prefix(REDIRECT_KEYWORD)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let tokens: Vec<Token> = tokenize(rest.trim_start())
        .ok()?
        .into_iter()
        .map(|t| t.token)
        .collect();
    match tokens.as_slice() {
        [Token::LinkOpen, inner @ .., Token::LinkClose, Token::Eof]
            if !inner.contains(&Token::Pipe) =>
        {
            let title: String = inner.iter().map(Token::to_string).collect();
            let title = title.trim();
            (!title.is_empty()).then(|| title.to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_round_trips_through_parser() {
        let content = redirect_content("Clear your cache");
        assert_eq!(content, "REDIRECT [[Clear your cache]]");
        assert_eq!(parse_redirect(&content).as_deref(), Some("Clear your cache"));
    }

    #[test]
    fn titles_with_equals_signs_survive() {
        let content = redirect_content("x = y");
        assert_eq!(parse_redirect(&content).as_deref(), Some("x = y"));
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        assert_eq!(
            parse_redirect("  REDIRECT   [[Foo]]\n").as_deref(),
            Some("Foo")
        );
    }

    #[test]
    fn ordinary_content_is_not_a_redirect() {
        assert_eq!(parse_redirect("Open the menu."), None);
        assert_eq!(parse_redirect("REDIRECTED [[Foo]]"), None);
        assert_eq!(parse_redirect("REDIRECT [[Foo]] and more"), None);
        assert_eq!(parse_redirect("REDIRECT [[Foo|label]]"), None);
        assert_eq!(parse_redirect("REDIRECT [[  ]]"), None);
    }
}
