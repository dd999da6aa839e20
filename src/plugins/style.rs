//! CSS rules for the classes produced by the HTML formatter.

use super::ansi::AnsiColor;

#[derive(Debug, Clone, Default)]
pub struct AnsiStyle;

impl AnsiStyle {
    pub const NAME: &'static str = "ansi-style";

    /// Style rules as `(class, declarations)` pairs.
    pub fn rules(&self) -> Vec<(String, String)> {
        let mut rules = vec![
            ("gp".to_string(), "color: #000080; font-weight: bold".to_string()),
            ("go".to_string(), "color: #888888".to_string()),
        ];
        for index in 0..=255u8 {
            let color = AnsiColor(index);
            rules.push((
                format!("-C-{}", color.class_name()),
                format!("color: {}", color.hex()),
            ));
            rules.push((
                format!("-C-BG{}", color.class_name()),
                format!("background-color: {}", color.hex()),
            ));
        }
        rules.extend(
            [
                ("-C-Bold", "font-weight: bold"),
                ("-C-Faint", "opacity: 0.5"),
                ("-C-Italic", "font-style: italic"),
                ("-C-Underline", "text-decoration: underline"),
                ("-C-Reverse", "filter: invert(100%)"),
            ]
            .map(|(class, css)| (class.to_string(), css.to_string())),
        );
        rules
    }

    /// Render the rules, each selector scoped under `.{prefix}`.
    pub fn css(&self, prefix: &str) -> String {
        self.rules()
            .into_iter()
            .map(|(class, css)| format!(".{} .{} {{ {} }}\n", prefix, class, css))
            .collect()
    }
}
