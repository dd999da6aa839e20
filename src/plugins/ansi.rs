//! SGR escape sequence parsing, and the filter turning colored output into
//! styled tokens.

use regex::Regex;
use std::sync::LazyLock;

use super::{Token, TokenKind};
use crate::color::strip_ansi;

static SGR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[([0-9;]*)m").expect("valid SGR pattern"));

/// Names of the 16 basic colors, in SGR order.
pub const COLOR_NAMES: [&str; 16] = [
    "Black",
    "Red",
    "Green",
    "Yellow",
    "Blue",
    "Magenta",
    "Cyan",
    "White",
    "BrightBlack",
    "BrightRed",
    "BrightGreen",
    "BrightYellow",
    "BrightBlue",
    "BrightMagenta",
    "BrightCyan",
    "BrightWhite",
];

/// xterm defaults for the 16 basic colors.
const BASIC_RGB: [(u8, u8, u8); 16] = [
    (0x00, 0x00, 0x00),
    (0xcd, 0x00, 0x00),
    (0x00, 0xcd, 0x00),
    (0xcd, 0xcd, 0x00),
    (0x00, 0x00, 0xee),
    (0xcd, 0x00, 0xcd),
    (0x00, 0xcd, 0xcd),
    (0xe5, 0xe5, 0xe5),
    (0x7f, 0x7f, 0x7f),
    (0xff, 0x00, 0x00),
    (0x00, 0xff, 0x00),
    (0xff, 0xff, 0x00),
    (0x5c, 0x5c, 0xff),
    (0xff, 0x00, 0xff),
    (0x00, 0xff, 0xff),
    (0xff, 0xff, 0xff),
];

const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

/// A color of the 256-color palette. Indexes below 16 are the basic colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnsiColor(pub u8);

impl AnsiColor {
    /// Name used in CSS classes: `Red`, `BrightCyan`, or `C208`.
    pub fn class_name(&self) -> String {
        match COLOR_NAMES.get(self.0 as usize) {
            Some(name) => name.to_string(),
            None => format!("C{}", self.0),
        }
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        match self.0 {
            n @ 0..=15 => BASIC_RGB[n as usize],
            n @ 16..=231 => {
                let n = n - 16;
                (
                    CUBE_LEVELS[(n / 36) as usize],
                    CUBE_LEVELS[((n / 6) % 6) as usize],
                    CUBE_LEVELS[(n % 6) as usize],
                )
            }
            n => {
                let gray = 8 + (n - 232) * 10;
                (gray, gray, gray)
            }
        }
    }

    pub fn hex(&self) -> String {
        let (r, g, b) = self.rgb();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

/// Text attributes in effect at some point of a colored stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SgrState {
    pub fg: Option<AnsiColor>,
    pub bg: Option<AnsiColor>,
    pub bold: bool,
    pub faint: bool,
    pub italic: bool,
    pub underline: bool,
    pub reverse: bool,
}

impl SgrState {
    pub fn is_plain(&self) -> bool {
        *self == SgrState::default()
    }

    /// Apply the `;`-separated parameters of one SGR sequence. An empty list
    /// resets everything. Unknown codes are ignored.
    pub fn apply(&mut self, params: &str) {
        let codes: Vec<u16> = params
            .split(';')
            .map(|code| if code.is_empty() { Some(0) } else { code.parse().ok() })
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default();

        let mut i = 0;
        while i < codes.len() {
            match codes[i] {
                0 => *self = SgrState::default(),
                1 => self.bold = true,
                2 => self.faint = true,
                3 => self.italic = true,
                4 => self.underline = true,
                7 => self.reverse = true,
                22 => {
                    self.bold = false;
                    self.faint = false;
                }
                23 => self.italic = false,
                24 => self.underline = false,
                27 => self.reverse = false,
                code @ 30..=37 => self.fg = Some(AnsiColor((code - 30) as u8)),
                code @ 40..=47 => self.bg = Some(AnsiColor((code - 40) as u8)),
                code @ 90..=97 => self.fg = Some(AnsiColor((code - 90 + 8) as u8)),
                code @ 100..=107 => self.bg = Some(AnsiColor((code - 100 + 8) as u8)),
                39 => self.fg = None,
                49 => self.bg = None,
                code @ (38 | 48) => {
                    let color = match codes.get(i + 1) {
                        Some(5) => {
                            let index = codes.get(i + 2).and_then(|n| u8::try_from(*n).ok());
                            i += 2;
                            index.map(AnsiColor)
                        }
                        // Truecolor has no class: skip its components.
                        Some(2) => {
                            i += 4;
                            None
                        }
                        _ => None,
                    };
                    if let Some(color) = color {
                        if code == 38 {
                            self.fg = Some(color);
                        } else {
                            self.bg = Some(color);
                        }
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }

    /// CSS classes of this state, like `-C-Red -C-BGBlue -C-Bold`.
    pub fn classes(&self) -> Vec<String> {
        let mut classes = Vec::new();
        if let Some(fg) = &self.fg {
            classes.push(format!("-C-{}", fg.class_name()));
        }
        if let Some(bg) = &self.bg {
            classes.push(format!("-C-BG{}", bg.class_name()));
        }
        for (on, name) in [
            (self.bold, "Bold"),
            (self.faint, "Faint"),
            (self.italic, "Italic"),
            (self.underline, "Underline"),
            (self.reverse, "Reverse"),
        ] {
            if on {
                classes.push(format!("-C-{}", name));
            }
        }
        classes
    }
}

/// Turns output tokens holding SGR sequences into styled tokens. Other
/// escape sequences are dropped. The state carries over consecutive output
/// and resets at each prompt.
#[derive(Debug, Clone, Default)]
pub struct AnsiFilter;

impl AnsiFilter {
    pub const NAME: &'static str = "ansi-filter";

    pub fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        let mut state = SgrState::default();
        let mut filtered: Vec<Token> = Vec::new();
        for token in tokens {
            match token.kind {
                TokenKind::Output => {
                    let text = &token.text;
                    let mut pos = 0;
                    for caps in SGR.captures_iter(text) {
                        let (Some(whole), Some(params)) = (caps.get(0), caps.get(1)) else {
                            continue;
                        };
                        push_text(&mut filtered, &state, &text[pos..whole.start()]);
                        state.apply(params.as_str());
                        pos = whole.end();
                    }
                    push_text(&mut filtered, &state, &text[pos..]);
                }
                TokenKind::Prompt => {
                    state = SgrState::default();
                    filtered.push(token);
                }
                _ => filtered.push(token),
            }
        }
        filtered
    }
}

fn push_text(tokens: &mut Vec<Token>, state: &SgrState, text: &str) {
    let text = strip_ansi(text);
    if text.is_empty() {
        return;
    }
    let kind = if state.is_plain() {
        TokenKind::Output
    } else {
        TokenKind::Styled(state.clone())
    };
    match tokens.last_mut() {
        Some(last) if last.kind == kind => last.text.push_str(&text),
        _ => tokens.push(Token { kind, text }),
    }
}
