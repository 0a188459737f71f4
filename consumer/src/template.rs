// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Status page rendering.
//!
//! Templates use three placeholders: `{{encrypted}}` (`true`/`false`), `{{mode}}`
//! (`Decrypted` when a key is loaded, `Plaintext` otherwise) and `{{message}}`.
//! Substituted values are HTML escaped.

use std::path::Path;

use crate::errors::ConfigError;
use crate::models::StatusView;

const DEFAULT_TEMPLATE: &str = include_str!("../assets/index.html");
const MESSAGE_PLACEHOLDER: &str = "{{message}}";

#[derive(Debug, Clone)]
pub struct PageTemplate {
    source: String,
}

impl Default for PageTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PageTemplate {
    pub fn parse(source: impl Into<String>) -> Result<Self, ConfigError> {
        let source = source.into();
        if !source.contains(MESSAGE_PLACEHOLDER) {
            return Err(ConfigError::Template(
                "<inline>".to_string(),
                format!("missing {MESSAGE_PLACEHOLDER} placeholder"),
            ));
        }
        Ok(Self { source })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let source = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Template(display.clone(), err.to_string()))?;
        Self::parse(source).map_err(|err| match err {
            ConfigError::Template(_, reason) => ConfigError::Template(display, reason),
            other => other,
        })
    }

    /// Uses the template at `path`, or the built-in page when none is configured.
    pub fn from_option(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn render(&self, view: &StatusView) -> String {
        let mode = if view.encrypted { "Decrypted" } else { "Plaintext" };
        self.source
            .replace("{{encrypted}}", if view.encrypted { "true" } else { "false" })
            .replace("{{mode}}", mode)
            .replace(MESSAGE_PLACEHOLDER, &escape_html(&view.message))
    }
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
