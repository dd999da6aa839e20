//! Styles applied to help screens, log records and CLI traces.

use owo_colors::{OwoColorize, Style};

/// A single style, or the identity when no style is set.
#[derive(Debug, Clone, Default)]
pub struct TextStyle(Option<Style>);

impl TextStyle {
    pub fn identity() -> Self {
        TextStyle(None)
    }

    pub fn new(style: Style) -> Self {
        TextStyle(Some(style))
    }

    pub fn is_identity(&self) -> bool {
        self.0.is_none()
    }

    /// Render `text` wrapped in the style's escape codes.
    pub fn apply(&self, text: &str) -> String {
        match &self.0 {
            Some(style) => text.style(*style).to_string(),
            None => text.to_string(),
        }
    }
}

impl From<Style> for TextStyle {
    fn from(style: Style) -> Self {
        TextStyle::new(style)
    }
}

/// Help screen theme, extended with log levels and extra keyword categories.
#[derive(Debug, Clone, Default)]
pub struct HelpTheme {
    pub invoked_command: TextStyle,
    pub command_help: TextStyle,
    pub heading: TextStyle,
    pub constraint: TextStyle,
    pub section_help: TextStyle,
    pub col1: TextStyle,
    pub col2: TextStyle,
    pub epilog: TextStyle,

    // Log levels
    pub critical: TextStyle,
    pub error: TextStyle,
    pub warning: TextStyle,
    pub info: TextStyle,
    pub debug: TextStyle,

    // Extra keyword categories
    pub subheading: TextStyle,
    pub option: TextStyle,
    pub choice: TextStyle,
    pub metavar: TextStyle,
    pub search: TextStyle,
    pub success: TextStyle,
}

/// Partial set of styles to overlay on an existing theme.
#[derive(Debug, Clone, Default)]
pub struct ThemeOverrides {
    pub invoked_command: Option<TextStyle>,
    pub command_help: Option<TextStyle>,
    pub heading: Option<TextStyle>,
    pub constraint: Option<TextStyle>,
    pub section_help: Option<TextStyle>,
    pub col1: Option<TextStyle>,
    pub col2: Option<TextStyle>,
    pub epilog: Option<TextStyle>,
    pub critical: Option<TextStyle>,
    pub error: Option<TextStyle>,
    pub warning: Option<TextStyle>,
    pub info: Option<TextStyle>,
    pub debug: Option<TextStyle>,
    pub subheading: Option<TextStyle>,
    pub option: Option<TextStyle>,
    pub choice: Option<TextStyle>,
    pub metavar: Option<TextStyle>,
    pub search: Option<TextStyle>,
    pub success: Option<TextStyle>,
}

macro_rules! overlay {
    ($theme:ident, $overrides:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(style) = $overrides.$field {
                $theme.$field = style;
            }
        )+
    };
}

impl HelpTheme {
    /// Copy of the theme with the provided styles replaced.
    pub fn with(&self, overrides: ThemeOverrides) -> HelpTheme {
        let mut theme = self.clone();
        overlay!(
            theme,
            overrides,
            invoked_command,
            command_help,
            heading,
            constraint,
            section_help,
            col1,
            col2,
            epilog,
            critical,
            error,
            warning,
            info,
            debug,
            subheading,
            option,
            choice,
            metavar,
            search,
            success,
        );
        theme
    }

    /// Look a style up by its field name.
    pub fn by_name(&self, name: &str) -> Option<&TextStyle> {
        let style = match name {
            "invoked_command" => &self.invoked_command,
            "command_help" => &self.command_help,
            "heading" => &self.heading,
            "constraint" => &self.constraint,
            "section_help" => &self.section_help,
            "col1" => &self.col1,
            "col2" => &self.col2,
            "epilog" => &self.epilog,
            "critical" => &self.critical,
            "error" => &self.error,
            "warning" => &self.warning,
            "info" => &self.info,
            "debug" => &self.debug,
            "subheading" => &self.subheading,
            "option" => &self.option,
            "choice" => &self.choice,
            "metavar" => &self.metavar,
            "search" => &self.search,
            "success" => &self.success,
            _ => return None,
        };
        Some(style)
    }

    /// Style used to render a record of the given log level.
    pub fn for_level(&self, level: log::Level) -> &TextStyle {
        match level {
            log::Level::Error => &self.error,
            log::Level::Warn => &self.warning,
            log::Level::Info => &self.info,
            log::Level::Debug | log::Level::Trace => &self.debug,
        }
    }
}

/// Theme used whenever colors are enabled.
pub fn default_theme() -> HelpTheme {
    HelpTheme {
        invoked_command: Style::new().bright_white().into(),
        heading: Style::new().bright_blue().bold().into(),
        constraint: Style::new().magenta().into(),
        // col1 stays neutral: options are styled one by one, separators excluded.
        col1: TextStyle::identity(),
        critical: Style::new().red().into(),
        error: Style::new().red().into(),
        warning: Style::new().yellow().into(),
        // INFO is the default level, no style.
        info: TextStyle::identity(),
        debug: Style::new().blue().into(),
        subheading: Style::new().blue().into(),
        option: Style::new().cyan().into(),
        choice: Style::new().magenta().into(),
        metavar: Style::new().bright_black().into(),
        search: Style::new().green().bold().into(),
        success: Style::new().green().into(),
        ..HelpTheme::default()
    }
}

/// Theme where every style is the identity.
pub fn nocolor_theme() -> HelpTheme {
    HelpTheme::default()
}

/// Pre-rendered success marker.
pub fn ok() -> String {
    default_theme().success.apply("✓")
}

/// Pre-rendered failure marker.
pub fn ko() -> String {
    default_theme().error.apply("✘")
}
