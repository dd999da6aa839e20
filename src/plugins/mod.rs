//! Rendering of ANSI-colored terminal sessions, exposed as named plugins.
//!
//! # Structure
//!
//! - `lexer` - Session lexers splitting prompts, commands and output
//! - `ansi` - SGR parsing and the filter styling colored output
//! - `formatter` - HTML output
//! - `style` - CSS for the formatter's classes

pub mod ansi;
pub mod formatter;
pub mod lexer;
pub mod style;

use anyhow::Result;

use crate::error::ExtraError;
pub use ansi::{AnsiColor, AnsiFilter, SgrState};
pub use formatter::AnsiHtmlFormatter;
pub use lexer::SessionLexer;
pub use style::AnsiStyle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Prompt,
    /// Command typed after a prompt
    Input,
    Output,
    /// Output with ANSI attributes
    Styled(SgrState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

pub const LEXERS_GROUP: &str = "pygments.lexers";
pub const FILTERS_GROUP: &str = "pygments.filters";
pub const FORMATTERS_GROUP: &str = "pygments.formatters";
pub const STYLES_GROUP: &str = "pygments.styles";

/// A plugin registration: `name` in `group` is implemented by `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoint {
    pub group: &'static str,
    pub name: &'static str,
    pub target: &'static str,
}

pub const ENTRY_POINTS: &[EntryPoint] = &[
    EntryPoint {
        group: LEXERS_GROUP,
        name: "ansi-shell-session",
        target: "clap_extra::plugins::SessionLexer::shell_session",
    },
    EntryPoint {
        group: LEXERS_GROUP,
        name: "ansi-console",
        target: "clap_extra::plugins::SessionLexer::console",
    },
    EntryPoint {
        group: LEXERS_GROUP,
        name: "ansi-pwsh-session",
        target: "clap_extra::plugins::SessionLexer::pwsh_session",
    },
    EntryPoint {
        group: LEXERS_GROUP,
        name: "ansi-pycon",
        target: "clap_extra::plugins::SessionLexer::pycon",
    },
    EntryPoint {
        group: FILTERS_GROUP,
        name: AnsiFilter::NAME,
        target: "clap_extra::plugins::AnsiFilter",
    },
    EntryPoint {
        group: FORMATTERS_GROUP,
        name: AnsiHtmlFormatter::NAME,
        target: "clap_extra::plugins::AnsiHtmlFormatter",
    },
    EntryPoint {
        group: STYLES_GROUP,
        name: AnsiStyle::NAME,
        target: "clap_extra::plugins::AnsiStyle",
    },
];

#[derive(Debug, Clone)]
pub enum Plugin {
    Lexer(SessionLexer),
    Filter(AnsiFilter),
    Formatter(AnsiHtmlFormatter),
    Style(AnsiStyle),
}

/// Instantiate the plugin registered as `name` in `group`.
pub fn resolve(group: &str, name: &str) -> Option<Plugin> {
    match group {
        LEXERS_GROUP => SessionLexer::by_name(name).map(Plugin::Lexer),
        FILTERS_GROUP if name == AnsiFilter::NAME => Some(Plugin::Filter(AnsiFilter)),
        FORMATTERS_GROUP if name == AnsiHtmlFormatter::NAME => {
            Some(Plugin::Formatter(AnsiHtmlFormatter::default()))
        }
        STYLES_GROUP if name == AnsiStyle::NAME => Some(Plugin::Style(AnsiStyle)),
        _ => None,
    }
}

/// Lex, filter and format a colored session transcript to HTML.
pub fn render_session(lexer_name: &str, transcript: &str) -> Result<String> {
    let Some(Plugin::Lexer(lexer)) = resolve(LEXERS_GROUP, lexer_name) else {
        return Err(ExtraError::UnknownPlugin {
            group: LEXERS_GROUP.to_string(),
            name: lexer_name.to_string(),
        }
        .into());
    };
    let tokens = AnsiFilter.filter(lexer.tokenize(transcript));
    Ok(AnsiHtmlFormatter::default().format(&tokens))
}
