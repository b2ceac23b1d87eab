//! Application settings document.

use crate::document::Document;
use crate::error::ModelResult;
use crate::kind::DocumentKind;
use serde::{Deserialize, Serialize};

const MONO_FONT: &str = "'JetBrains Mono', 'Fira Code', Consolas, monospace";

/// Editor soft wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WordWrap {
    /// Wrap at the viewport.
    #[default]
    On,
    /// Never wrap.
    Off,
    /// Wrap at the configured column.
    WordWrapColumn,
}

/// Gutter line numbering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineNumbers {
    /// Absolute numbers.
    #[default]
    On,
    /// Hidden.
    Off,
    /// Relative to the cursor.
    Relative,
}

/// Terminal cursor shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorStyle {
    /// Full cell.
    Block,
    /// Thin bar.
    #[default]
    Bar,
    /// Underline.
    Underline,
}

/// Explorer ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Alphabetical.
    Name,
    /// Folders first, then by extension.
    #[default]
    Type,
    /// Most recently modified first.
    Modified,
}

/// Application colour scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    /// Dark.
    #[default]
    Dark,
    /// Light.
    Light,
    /// Follow the operating system.
    System,
}

/// Editor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct EditorSettings {
    pub font_size: u32,
    pub font_family: String,
    pub tab_size: u32,
    pub word_wrap: WordWrap,
    pub line_numbers: LineNumbers,
    pub minimap: bool,
    pub bracket_pair_colorization: bool,
    pub auto_save: bool,
    pub auto_save_delay: u64,
    pub format_on_save: bool,
    pub theme: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            font_size: 13,
            font_family: MONO_FONT.to_string(),
            tab_size: 2,
            word_wrap: WordWrap::On,
            line_numbers: LineNumbers::On,
            minimap: true,
            bracket_pair_colorization: true,
            auto_save: false,
            auto_save_delay: 1000,
            format_on_save: false,
            theme: "themag-dark".to_string(),
        }
    }
}

/// Integrated terminal settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct TerminalSettings {
    pub font_size: u32,
    pub font_family: String,
    pub cursor_style: CursorStyle,
    pub cursor_blink: bool,
    pub scrollback: u32,
    pub shell: String,
    pub default_cwd: String,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            font_size: 13,
            font_family: MONO_FONT.to_string(),
            cursor_style: CursorStyle::Bar,
            cursor_blink: true,
            scrollback: 1000,
            shell: "bash".to_string(),
            default_cwd: "~".to_string(),
        }
    }
}

/// Debugger settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct DebugSettings {
    pub auto_expand_locals: bool,
    pub show_inline_values: bool,
    pub allow_breakpoints_everywhere: bool,
    pub open_debug_on_break: bool,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            auto_expand_locals: true,
            show_inline_values: true,
            allow_breakpoints_everywhere: false,
            open_debug_on_break: true,
        }
    }
}

/// Assistant settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct AiSettings {
    pub active_provider_id: Option<String>,
    pub stream_responses: bool,
    pub show_token_usage: bool,
    pub auto_context: bool,
    pub context_max_files: u32,
    pub system_prompt_prefix: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            active_provider_id: None,
            stream_responses: true,
            show_token_usage: true,
            auto_context: true,
            context_max_files: 5,
            system_prompt_prefix: String::new(),
        }
    }
}

/// File explorer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct ExplorerSettings {
    pub sort_order: SortOrder,
    pub show_hidden_files: bool,
    pub compact_folders: bool,
    pub auto_reveal: bool,
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        Self {
            sort_order: SortOrder::Type,
            show_hidden_files: false,
            compact_folders: true,
            auto_reveal: true,
        }
    }
}

/// General settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct GeneralSettings {
    pub theme: ThemePreference,
    pub accent_color: String,
    pub language: String,
    pub telemetry: bool,
    pub auto_update: bool,
    pub confirm_on_exit: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            theme: ThemePreference::Dark,
            accent_color: "#6366f1".to_string(),
            language: "en".to_string(),
            telemetry: false,
            auto_update: true,
            confirm_on_exit: true,
        }
    }
}

/// Every user-facing setting.
///
/// Missing sections and fields fall back to their defaults when decoded, so
/// older or partial payloads merge over [`AppSettings::default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct AppSettings {
    pub editor: EditorSettings,
    pub terminal: TerminalSettings,
    pub debug: DebugSettings,
    pub ai: AiSettings,
    pub explorer: ExplorerSettings,
    pub general: GeneralSettings,
}

impl AppSettings {
    /// Parses user-supplied settings JSON, merging it over the defaults.
    ///
    /// Accepts both a bare settings object and an envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a settings object.
    pub fn import_json(raw: &str) -> ModelResult<Self> {
        Self::decode_cache(raw)
    }

    /// Pretty-printed settings JSON for export.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn export_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Restores every default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Document for AppSettings {
    const KIND: DocumentKind = DocumentKind::Settings;

    fn default_value() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_import_merges_over_defaults() {
        let settings =
            AppSettings::import_json(r#"{"editor":{"fontSize":16},"general":{"theme":"light"}}"#)
                .unwrap();
        assert_eq!(settings.editor.font_size, 16);
        assert_eq!(settings.editor.tab_size, 2);
        assert_eq!(settings.general.theme, ThemePreference::Light);
        assert_eq!(settings.terminal, TerminalSettings::default());
    }

    #[test]
    fn import_rejects_garbage() {
        assert!(AppSettings::import_json("not json").is_err());
        assert!(AppSettings::import_json(r#"{"editor":{"fontSize":"big"}}"#).is_err());
    }

    #[test]
    fn export_uses_camel_case() {
        let out = AppSettings::default().export_json().unwrap();
        assert!(out.contains("\"autoSaveDelay\": 1000"));
        assert!(out.contains("\"wordWrap\": \"on\""));
        assert!(out.contains("\"activeProviderId\": null"));
        assert_eq!(AppSettings::import_json(&out).unwrap(), AppSettings::default());
    }

    #[test]
    fn defaults_count_as_empty() {
        let mut settings = AppSettings::default();
        assert!(settings.is_empty());
        settings.editor.minimap = false;
        assert!(!settings.is_empty());
        settings.reset();
        assert!(settings.is_empty());
    }
}
