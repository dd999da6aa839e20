//! Session lexers: split a terminal transcript into prompts, commands and
//! their output.

use regex::Regex;

use super::{Token, TokenKind};

/// A transcript lexer recognizing prompts with a line-start pattern.
#[derive(Debug, Clone)]
pub struct SessionLexer {
    name: &'static str,
    prompt: Regex,
}

impl SessionLexer {
    fn new(name: &'static str, prompt: &str) -> Self {
        Self {
            name,
            prompt: Regex::new(prompt).expect("valid prompt pattern"),
        }
    }

    /// POSIX shell sessions: `$ `, `# `, `% ` and `> ` continuations.
    pub fn shell_session() -> Self {
        Self::new("ansi-shell-session", r"^(?:\[[^\]]+@[^\]]+\]\s?)?[$#%>] ")
    }

    /// Alias of the shell session lexer.
    pub fn console() -> Self {
        Self {
            name: "ansi-console",
            ..Self::shell_session()
        }
    }

    pub fn pwsh_session() -> Self {
        Self::new("ansi-pwsh-session", r"^(?:PS [^>]*> |>> )")
    }

    /// Python interactive console.
    pub fn pycon() -> Self {
        Self::new("ansi-pycon", r"^(?:>>> |\.\.\. )")
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "ansi-shell-session" => Some(Self::shell_session()),
            "ansi-console" => Some(Self::console()),
            "ansi-pwsh-session" => Some(Self::pwsh_session()),
            "ansi-pycon" => Some(Self::pycon()),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Tokenize `text` line by line. Consecutive output lines form a single
    /// token.
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();
        for line in text.split_inclusive('\n') {
            if let Some(prompt) = self.prompt.find(line) {
                tokens.push(Token::new(TokenKind::Prompt, prompt.as_str()));
                let command = &line[prompt.end()..];
                if !command.is_empty() {
                    tokens.push(Token::new(TokenKind::Input, command));
                }
                continue;
            }
            match tokens.last_mut() {
                Some(last) if last.kind == TokenKind::Output => last.text.push_str(line),
                _ => tokens.push(Token::new(TokenKind::Output, line)),
            }
        }
        tokens
    }
}
