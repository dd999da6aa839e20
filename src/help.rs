//! Keyword highlighting of rendered help screens.
//!
//! Help is rendered by clap as plain text, then the keywords collected from
//! the command tree (options, subcommands, choices, metavars...) are styled
//! with regular expressions. Not bullet-proof, but help screens are read by
//! humans, not machines.

use clap::Command;
use regex::{Captures, Regex, RegexBuilder};
use std::collections::BTreeSet;

use crate::theme::{HelpTheme, TextStyle};

/// Keywords to highlight, collected from a command tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HelpKeywords {
    pub cli_names: BTreeSet<String>,
    pub headings: BTreeSet<String>,
    pub subcommands: BTreeSet<String>,
    pub command_aliases: BTreeSet<String>,
    pub long_options: BTreeSet<String>,
    pub short_options: BTreeSet<String>,
    pub choices: BTreeSet<String>,
    pub metavars: BTreeSet<String>,
}

impl HelpKeywords {
    /// Walk `cmd` and all its subcommands.
    pub fn collect(cmd: &Command) -> Self {
        let mut keywords = HelpKeywords::default();
        keywords.cli_names.insert(
            cmd.get_bin_name()
                .unwrap_or_else(|| cmd.get_name())
                .to_string(),
        );
        for heading in ["Usage", "Options", "Arguments", "Commands"] {
            keywords.headings.insert(heading.to_string());
        }
        keywords.collect_command(cmd);
        keywords
    }

    fn collect_command(&mut self, cmd: &Command) {
        self.metavars.insert("[OPTIONS]".to_string());
        if cmd.has_subcommands() {
            self.metavars.insert("<COMMAND>".to_string());
            self.metavars.insert("[COMMAND]".to_string());
        }

        let mut options = BTreeSet::new();
        for arg in cmd.get_arguments() {
            if let Some(heading) = arg.get_help_heading() {
                self.headings.insert(heading.to_string());
            }

            if let Some(long) = arg.get_long() {
                options.insert(format!("--{}", long));
            }
            for alias in arg.get_visible_aliases().unwrap_or_default() {
                options.insert(format!("--{}", alias));
            }
            if let Some(short) = arg.get_short() {
                options.insert(format!("-{}", short));
            }
            for alias in arg.get_visible_short_aliases().unwrap_or_default() {
                options.insert(format!("-{}", alias));
            }

            if !arg.get_action().takes_values() {
                continue;
            }
            for value in arg.get_possible_values() {
                if !value.is_hide_set() {
                    self.choices.insert(value.get_name().to_string());
                }
            }

            let names: Vec<String> = match arg.get_value_names() {
                Some(names) => names.iter().map(|n| n.to_string()).collect(),
                None => vec![arg.get_id().as_str().to_string()],
            };
            for name in names {
                self.metavars.insert(format!("<{}>", name));
                if arg.is_positional() {
                    self.metavars.insert(format!("[{}]", name));
                }
            }
        }

        // Short options are no longer than 2 characters, like "-D".
        for option in options {
            if option.chars().count() <= 2 {
                self.short_options.insert(option);
            } else {
                self.long_options.insert(option);
            }
        }

        for sub in cmd.get_subcommands() {
            if sub.is_hide_set() {
                continue;
            }
            self.subcommands.insert(sub.get_name().to_string());
            for alias in sub.get_visible_aliases() {
                self.command_aliases.insert(alias.to_string());
            }
            self.collect_command(sub);
        }
    }
}

/// Escape a keyword for matching in a help screen. Like `regex::escape`, but
/// allows blank characters after dashes to account for text wrapping.
pub fn escape_for_help_screen(text: &str) -> String {
    regex::escape(text).replace('-', "-\\s*")
}

/// Styles keywords of a help screen with a theme.
#[derive(Debug, Clone)]
pub struct HelpFormatter {
    pub theme: HelpTheme,
    pub keywords: HelpKeywords,
}

impl HelpFormatter {
    pub fn new(theme: HelpTheme, keywords: HelpKeywords) -> Self {
        Self { theme, keywords }
    }

    pub fn for_command(theme: HelpTheme, cmd: &Command) -> Self {
        Self::new(theme, HelpKeywords::collect(cmd))
    }

    fn style_group(&self, text: &str, group_id: &str) -> String {
        let style: &TextStyle = match self.theme.by_name(group_id) {
            Some(style) => style,
            None => match group_id {
                "default_start" | "default_end" => &self.theme.metavar,
                "default_value" => &self.theme.choice,
                _ => &self.theme.option,
            },
        };
        style.apply(text)
    }

    /// Rebuild the match by concatenating all groups, styling named ones only.
    fn colorize(&self, re: &Regex, caps: &Captures) -> String {
        let mut text = String::new();
        for (index, name) in re.capture_names().enumerate().skip(1) {
            let Some(group) = caps.get(index) else {
                continue;
            };
            match name {
                Some(group_id) => text.push_str(&self.style_group(group.as_str(), group_id)),
                None => text.push_str(group.as_str()),
            }
        }
        text
    }

    fn substitute(&self, help_text: &str, pattern: &str) -> String {
        match Regex::new(pattern) {
            Ok(re) => re
                .replace_all(help_text, |caps: &Captures| self.colorize(&re, caps))
                .into_owned(),
            Err(e) => {
                log::debug!("Skipping highlight pattern {:?}: {}", pattern, e);
                help_text.to_string()
            }
        }
    }

    /// Highlight extra keywords in a rendered help screen.
    pub fn highlight_extra_keywords(&self, help_text: &str) -> String {
        let kw = &self.keywords;

        let mut text = self.substitute(help_text, r"(?xi) (\s) (?P<warning>\(DEPRECATED\))");

        for heading in &kw.headings {
            text = self.substitute(
                &text,
                &format!(r"(?xm) ^ (?P<heading>{}) (:)", regex::escape(heading)),
            );
        }

        // Aliases, as listed by clap after a subcommand description.
        for alias in &kw.command_aliases {
            text = self.substitute(
                &text,
                &format!(
                    r"(?x) (\[aliases:\ [^\]\n]*?) (?P<command_aliases>{}) ([,\]])",
                    regex::escape(alias)
                ),
            );
        }

        for subcommand in &kw.subcommands {
            text = self.substitute(
                &text,
                &format!(
                    r"(?x) (\ \ ) (?P<subcommand>{}) (\s)",
                    regex::escape(subcommand)
                ),
            );
        }

        text = self.substitute(
            &text,
            r"(?xs)
            (\s)
            (?P<default_start>\[default:\s+)
            (?P<default_value>.+?)
            (?P<default_end>\])",
        );

        for cli_name in &kw.cli_names {
            text = self.substitute(
                &text,
                &format!(
                    r"(?x) (\s) (?P<invoked_command>{}) (\s)",
                    regex::escape(cli_name)
                ),
            );
        }

        let groups: [(Vec<&String>, &str); 4] = [
            (kw.long_options.iter().rev().collect(), "long_option"),
            (kw.short_options.iter().collect(), "short_option"),
            (kw.choices.iter().rev().collect(), "choice"),
            (kw.metavars.iter().rev().collect(), "metavar"),
        ];
        for (keywords, group_id) in groups {
            for keyword in keywords {
                text = self.substitute(
                    &text,
                    &format!(
                        r"([\s\[|(])(?P<{}>{})(\W)",
                        group_id,
                        escape_for_help_screen(keyword)
                    ),
                );
            }
        }

        text
    }
}

/// Highlight the parts of `text` matching any of `patterns`, overlapping
/// matches included. Each contiguous highlighted run is styled once.
pub fn highlight(text: &str, patterns: &[&str], style: &TextStyle, ignore_case: bool) -> String {
    let mut flagged = vec![false; text.len()];

    let unique: BTreeSet<&str> = patterns.iter().copied().collect();
    for pattern in unique {
        let re = match RegexBuilder::new(pattern)
            .case_insensitive(ignore_case)
            .build()
        {
            Ok(re) => re,
            Err(e) => {
                log::debug!("Skipping invalid pattern {:?}: {}", pattern, e);
                continue;
            }
        };
        // Restart the search right after each match start to catch overlaps.
        let mut start = 0;
        while start <= text.len() {
            let Some(found) = re.find_at(text, start) else {
                break;
            };
            for flag in &mut flagged[found.start()..found.end()] {
                *flag = true;
            }
            start = match text[found.start()..].chars().next() {
                Some(c) => found.start() + c.len_utf8(),
                None => break,
            };
        }
    }

    let mut styled = String::with_capacity(text.len());
    let mut segment_start = 0;
    for index in 1..=text.len() {
        let boundary = index == text.len()
            || (text.is_char_boundary(index) && flagged[index] != flagged[segment_start]);
        if !boundary {
            continue;
        }
        let segment = &text[segment_start..index];
        if flagged[segment_start] {
            styled.push_str(&style.apply(segment));
        } else {
            styled.push_str(segment);
        }
        segment_start = index;
    }
    styled
}
