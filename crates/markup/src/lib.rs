//! Wiki markup for knowledge-base articles.
//!
//! Only what the content engine itself needs lives here: a lexer, a small
//! HTML renderer used as the default `Renderer`, and the redirect marker.

pub mod lexer;
pub mod redirect;
pub mod render;

pub use lexer::{tokenize, LexError, Token};
pub use redirect::{parse_redirect, redirect_content};
pub use render::{escape_html, render_html};
