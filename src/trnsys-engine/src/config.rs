// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

/// Options controlling how a deck is rendered.  None of these change
/// what TRNSYS reads; they only affect comments and layout.
#[derive(Clone, Debug, PartialEq)]
pub struct WriterConfig {
    /// Write the `*` comment header naming the generator, deck and
    /// author.
    pub header: bool,
    /// Optional free-text line added to the header.
    pub description: Option<String>,
    /// Emit TRNSYS Studio markup (`*$UNIT_NAME`, `*$MODEL`) in component
    /// blocks.
    pub studio_markup: bool,
    /// Minimum spaces between a value and its `!` annotation.
    pub annotation_padding: usize,
    /// Annotations start at least at this column so short blocks line
    /// up with long ones.
    pub annotation_column: usize,
    /// Text used in the generator line of the header.
    pub generator: String,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            header: true,
            description: None,
            studio_markup: true,
            annotation_padding: 2,
            annotation_column: 12,
            generator: format!("trnsys-engine {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl WriterConfig {
    /// Bare output: no header, no studio markup.
    pub fn minimal() -> Self {
        Self {
            header: false,
            studio_markup: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WriterConfig::default();
        assert!(config.header);
        assert!(config.studio_markup);
        assert_eq!(2, config.annotation_padding);
        assert!(config.generator.starts_with("trnsys-engine "));
    }

    #[test]
    fn test_minimal_config() {
        let config = WriterConfig::minimal();
        assert!(!config.header);
        assert!(!config.studio_markup);
        assert_eq!(WriterConfig::default().annotation_column, config.annotation_column);
    }
}
