//! FFmpeg filter-graph construction.
//!
//! All screenshots come out of one FFmpeg run. The `-vf` chain built here
//! selects exactly the planned frames, burns the subtitles in, then scales
//! and optionally converts to grayscale:
//!
//! ```text
//! select=eq(n\,12)+eq(n\,48)+…,subtitles=<path>[:si=N][:force_style=…],scale=640:-1[,format=gray]
//! ```
//!
//! `select` runs first so only the chosen frames pay for subtitle rendering;
//! `n` is still the input frame number at that point.
//!
//! Values pass through two layers of FFmpeg escaping: option values
//! ([`escape_option_value`]) and then the filter graph itself
//! ([`escape_graph`]).

use std::fmt::{Display, Formatter, Result as FmtResult, Write};
use std::str::FromStr;

use crate::error::PictureBookError;
use crate::subtitle::SubtitleSource;

/// Expression length in bytes above which a warning is emitted.
///
/// 32 000 is just under the Windows command-line limit; FFmpeg itself
/// accepts longer expressions, so this is never an error.
pub const EXPRESSION_LENGTH_WARNING_THRESHOLD: usize = 32_000;

/// ASS style overrides for burned-in subtitles (`force_style`).
///
/// An ordered list of `KEY=VALUE` pairs, parsed from and displayed as
/// `"KEY=VALUE,KEY=VALUE"`. Values are passed through verbatim.
///
/// # Example
///
/// ```
/// use picture_book::StyleOverrides;
///
/// let mut style: StyleOverrides = "FontName=DejaVu Sans,FontSize=24".parse()?;
/// style.insert("FontSize", "28");
/// style.insert("Outline", "2");
/// assert_eq!(style.to_string(), "FontName=DejaVu Sans,FontSize=28,Outline=2");
/// # Ok::<(), picture_book::PictureBookError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleOverrides {
    pairs: Vec<(String, String)>,
}

impl StyleOverrides {
    /// Empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, existing)) => *existing = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Value for `key`, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no override is set.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromStr for StyleOverrides {
    type Err = PictureBookError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut overrides = Self::new();
        for pair in value.split(',') {
            if pair.trim().is_empty() {
                continue;
            }
            let (key, style_value) = pair.split_once('=').ok_or_else(|| {
                PictureBookError::InvalidConfiguration {
                    key: "subtitle_style",
                    reason: format!("expected KEY=VALUE, got '{}'", pair.trim()),
                }
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(PictureBookError::InvalidConfiguration {
                    key: "subtitle_style",
                    reason: format!("missing key in '{}'", pair.trim()),
                });
            }
            overrides.insert(key, style_value);
        }
        Ok(overrides)
    }
}

impl Display for StyleOverrides {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (position, (key, value)) in self.iter().enumerate() {
            if position > 0 {
                f.write_char(',')?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// A complete `-vf` filter chain.
///
/// Only ever built, never parsed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpression(String);

impl FilterExpression {
    /// The expression text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the expression is empty. Never true for built expressions.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the expression is longer than
    /// [`EXPRESSION_LENGTH_WARNING_THRESHOLD`].
    pub fn exceeds_length_warning(&self) -> bool {
        self.len() > EXPRESSION_LENGTH_WARNING_THRESHOLD
    }

    /// Consume into the expression text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for FilterExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FilterExpression {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds a [`FilterExpression`] for a set of frame indices.
///
/// # Example
///
/// ```
/// use picture_book::{FilterExpressionBuilder, SubtitleSource};
///
/// let subtitles = SubtitleSource::File("subs.srt".into());
/// let expression = FilterExpressionBuilder::new(&[0, 48, 335])
///     .subtitles(Some(&subtitles))
///     .scale("640:-1")
///     .grayscale(true)
///     .build();
/// assert_eq!(
///     expression.as_str(),
///     r"select=eq(n\,0)+eq(n\,48)+eq(n\,335),subtitles=subs.srt,scale=640:-1,format=gray",
/// );
/// ```
#[derive(Debug, Clone)]
pub struct FilterExpressionBuilder<'a> {
    frame_indices: &'a [u64],
    subtitles: Option<&'a SubtitleSource>,
    style_overrides: Option<&'a StyleOverrides>,
    scale: &'a str,
    grayscale: bool,
}

impl<'a> FilterExpressionBuilder<'a> {
    /// Start a chain selecting `frame_indices`, which should be strictly
    /// increasing.
    pub fn new(frame_indices: &'a [u64]) -> Self {
        Self {
            frame_indices,
            subtitles: None,
            style_overrides: None,
            scale: "",
            grayscale: false,
        }
    }

    /// Burn in subtitles from `source`; `None` leaves them out.
    #[must_use]
    pub fn subtitles(mut self, source: Option<&'a SubtitleSource>) -> Self {
        self.subtitles = source;
        self
    }

    /// Style overrides for the burned-in subtitles.
    #[must_use]
    pub fn style_overrides(mut self, overrides: &'a StyleOverrides) -> Self {
        self.style_overrides = Some(overrides);
        self
    }

    /// Arguments of FFmpeg's `scale` filter (e.g. `"640:-1"`). Empty
    /// disables scaling.
    #[must_use]
    pub fn scale(mut self, arguments: &'a str) -> Self {
        self.scale = arguments;
        self
    }

    /// Append a `format=gray` stage.
    #[must_use]
    pub fn grayscale(mut self, grayscale: bool) -> Self {
        self.grayscale = grayscale;
        self
    }

    /// Compile the chain.
    pub fn build(&self) -> FilterExpression {
        let mut stages = Vec::with_capacity(4);
        stages.push(select_stage(self.frame_indices));
        if let Some(source) = self.subtitles {
            stages.push(subtitles_stage(source, self.style_overrides));
        }
        if !self.scale.is_empty() {
            stages.push(format!("scale={}", escape_graph(self.scale)));
        }
        if self.grayscale {
            stages.push("format=gray".to_string());
        }

        let expression = FilterExpression(stages.join(","));
        log::debug!(
            "Built filter expression: {} stages, {} bytes, {} frames",
            stages.len(),
            expression.len(),
            self.frame_indices.len(),
        );
        if expression.exceeds_length_warning() {
            log::warn!(
                "Filter expression is {} bytes (over {EXPRESSION_LENGTH_WARNING_THRESHOLD}); \
                 some platforms may reject the command line",
                expression.len(),
            );
        }
        expression
    }
}

/// `select=eq(n\,a)+eq(n\,b)+…`, or `select=0` when nothing is selected.
fn select_stage(frame_indices: &[u64]) -> String {
    if frame_indices.is_empty() {
        return "select=0".to_string();
    }
    // "+eq(n\,NNNNNN)" is about 14 bytes per frame.
    let mut stage = String::with_capacity(7 + frame_indices.len() * 14);
    stage.push_str("select=");
    for (position, index) in frame_indices.iter().enumerate() {
        if position > 0 {
            stage.push('+');
        }
        let _ = write!(stage, r"eq(n\,{index})");
    }
    stage
}

fn subtitles_stage(source: &SubtitleSource, style_overrides: Option<&StyleOverrides>) -> String {
    let path = source.path().to_string_lossy();
    let mut stage = format!("subtitles={}", escape_graph(&escape_option_value(&path)));
    if let Some(track_index) = source.track_index() {
        let _ = write!(stage, ":si={track_index}");
    }
    if let Some(overrides) = style_overrides.filter(|overrides| !overrides.is_empty()) {
        let style = overrides.to_string();
        let _ = write!(
            stage,
            ":force_style={}",
            escape_graph(&escape_option_value(&style))
        );
    }
    stage
}

/// Escape a filter option value: `\`, `'` and `:` get a backslash.
///
/// ```
/// use picture_book::filter::escape_option_value;
///
/// assert_eq!(escape_option_value(r"C:\subs.srt"), r"C\:\\subs.srt");
/// ```
pub fn escape_option_value(value: &str) -> String {
    escape_with(value, &['\\', '\'', ':'])
}

/// Escape text for the filter-graph level: `\`, `'`, `[`, `]`, `,` and `;`
/// get a backslash.
///
/// ```
/// use picture_book::filter::escape_graph;
///
/// assert_eq!(escape_graph("a,b;c"), r"a\,b\;c");
/// ```
pub fn escape_graph(value: &str) -> String {
    escape_with(value, &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_with(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        if special.contains(&character) {
            escaped.push('\\');
        }
        escaped.push(character);
    }
    escaped
}
