//! HTML rendering of session tokens.

use super::{Token, TokenKind};

/// Renders tokens as an HTML block, ANSI styles becoming `-C-*` classes.
#[derive(Debug, Clone)]
pub struct AnsiHtmlFormatter {
    /// Class of the wrapping `div`, also the prefix of the style rules
    pub css_class: String,
}

impl Default for AnsiHtmlFormatter {
    fn default() -> Self {
        Self {
            css_class: "highlight".to_string(),
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
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

impl AnsiHtmlFormatter {
    pub const NAME: &'static str = "ansi-html";

    fn classes(kind: &TokenKind) -> Option<String> {
        match kind {
            TokenKind::Prompt => Some("gp".to_string()),
            TokenKind::Output => Some("go".to_string()),
            TokenKind::Input => None,
            TokenKind::Styled(state) => Some(state.classes().join(" ")),
        }
    }

    pub fn format(&self, tokens: &[Token]) -> String {
        let mut html = format!("<div class=\"{}\"><pre>", self.css_class);
        for token in tokens {
            let text = escape_html(&token.text);
            match Self::classes(&token.kind) {
                Some(classes) => {
                    html.push_str(&format!("<span class=\"{}\">{}</span>", classes, text));
                }
                None => html.push_str(&text),
            }
        }
        html.push_str("</pre></div>\n");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::ansi::SgrState;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<a href=\"x\">&'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_format() {
        let mut state = SgrState::default();
        state.apply("31;44;1");
        let tokens = vec![
            Token::new(TokenKind::Prompt, "$ "),
            Token::new(TokenKind::Input, "echo <x>\n"),
            Token::new(TokenKind::Styled(state), "red"),
            Token::new(TokenKind::Output, "\n"),
        ];
        let html = AnsiHtmlFormatter::default().format(&tokens);
        assert_eq!(
            html,
            "<div class=\"highlight\"><pre>\
             <span class=\"gp\">$ </span>echo &lt;x&gt;\n\
             <span class=\"-C-Red -C-BGBlue -C-Bold\">red</span>\
             <span class=\"go\">\n</span>\
             </pre></div>\n"
        );
    }
}
