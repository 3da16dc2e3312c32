use crate::lexer::{tokenize, LexError, Token};

/// Largest heading level; longer `=` runs render as text.
const MAX_HEADING_LEVEL: usize = 6;

/// Render wiki markup to an HTML fragment.
///
/// Supported syntax: paragraphs separated by blank lines, `== heading ==`
/// lines and `[[Title]]` / `[[Title|label]]` links. Links are emitted with a
/// `data-title` attribute; resolving them to URLs is left to the caller.
pub fn render_html(input: &str) -> Result<String, LexError> {
    let tokens: Vec<Token> = tokenize(input)?
        .into_iter()
        .map(|t| t.token)
        .filter(|t| *t != Token::Eof)
        .collect();

    let mut out = String::new();
    let mut paragraph: Vec<String> = Vec::new();

    for line in tokens.split(|t| *t == Token::Newline) {
        if is_blank(line) {
            flush_paragraph(&mut out, &mut paragraph);
            continue;
        }
        if let Some((level, inner)) = heading(line) {
            flush_paragraph(&mut out, &mut paragraph);
            out.push_str(&format!(
                "<h{level}>{}</h{level}>\n",
                render_inline(inner).trim()
            ));
            continue;
        }
        paragraph.push(render_inline(line).trim().to_string());
    }
    flush_paragraph(&mut out, &mut paragraph);

    Ok(out)
}

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn flush_paragraph(out: &mut String, paragraph: &mut Vec<String>) {
    if paragraph.is_empty() {
        return;
    }
    out.push_str("<p>");
    out.push_str(&paragraph.join(" "));
    out.push_str("</p>\n");
    paragraph.clear();
}

fn is_blank(line: &[Token]) -> bool {
    line.iter()
        .all(|t| matches!(t, Token::Text(s) if s.trim().is_empty()))
}

fn heading(line: &[Token]) -> Option<(usize, &[Token])> {
    match line {
        [Token::Equals(open), inner @ .., Token::Equals(close)]
            if open == close && *open <= MAX_HEADING_LEVEL && !is_blank(inner) =>
        {
            Some((*open, inner))
        }
        _ => None,
    }
}

fn render_inline(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut iter = tokens.iter();

    while let Some(token) = iter.next() {
        match token {
            Token::Text(s) => out.push_str(&escape_html(s)),
            Token::Equals(n) => out.push_str(&"=".repeat(*n)),
            Token::LinkOpen => {
                let mut target = String::new();
                let mut label: Option<String> = None;
                for inner in iter.by_ref() {
                    match inner {
                        Token::LinkClose => break,
                        Token::Pipe => label = Some(String::new()),
                        other => match label.as_mut() {
                            Some(l) => l.push_str(&other.to_string()),
                            None => target.push_str(&other.to_string()),
                        },
                    }
                }
                let target = target.trim();
                let label = label
                    .as_deref()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .unwrap_or(target);
                out.push_str(&format!(
                    "<a class=\"wiki-link\" data-title=\"{}\">{}</a>",
                    escape_html(target),
                    escape_html(label)
                ));
            }
            Token::LinkClose | Token::Pipe | Token::Newline | Token::Eof => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_paragraphs() {
        let html = render_html("First line\nstill first\n\nSecond").unwrap();
        assert_eq!(html, "<p>First line still first</p>\n<p>Second</p>\n");
    }

    #[test]
    fn renders_headings() {
        let html = render_html("== Steps ==\nDo this").unwrap();
        assert_eq!(html, "<h2>Steps</h2>\n<p>Do this</p>\n");
    }

    #[test]
    fn unbalanced_heading_is_text() {
        let html = render_html("== Steps =").unwrap();
        assert_eq!(html, "<p>== Steps =</p>\n");
    }

    #[test]
    fn renders_links() {
        let html = render_html("See [[Clear cache]] or [[Cookies|this one]]").unwrap();
        assert_eq!(
            html,
            "<p>See <a class=\"wiki-link\" data-title=\"Clear cache\">Clear cache</a> or \
             <a class=\"wiki-link\" data-title=\"Cookies\">this one</a></p>\n"
        );
    }

    #[test]
    fn escapes_markup() {
        let html = render_html("<script>alert('x')</script> & more").unwrap();
        assert_eq!(
            html,
            "<p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more</p>\n"
        );
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert_eq!(render_html("").unwrap(), "");
        assert_eq!(render_html("\n  \n").unwrap(), "");
    }
}
