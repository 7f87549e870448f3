#![forbid(unsafe_code)]

//! Modal configuration.
//!
//! [`ModalOptions`] is the full configuration a modal runs with. The manager
//! keeps one as its defaults; every `open` clones it and applies a
//! [`ModalOptionsPatch`] on top, so each open modal owns an independent
//! snapshot.
//!
//! With the `serde` feature both types use the camelCase keys hosts already
//! pass from script (`containerClasses`, `fadeDuration`, `escapeClose`, ...).

use std::time::Duration;

use super::error::ModalError;

/// Default fade duration in milliseconds.
pub const DEFAULT_FADE_DURATION_MS: u64 = 260;

/// Default content fade delay, as a fraction of the fade duration.
pub const DEFAULT_FADE_DELAY: f32 = 0.6;

/// Effective configuration of one modal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ModalOptions {
    /// Classes applied to the backdrop container.
    pub container_classes: Vec<String>,
    /// Class of the synthesized close affordance.
    pub close_class: String,
    /// Class applied to the content element.
    pub modal_class: String,
    /// Fade duration for both directions.
    #[cfg_attr(feature = "serde", serde(rename = "fadeDuration"))]
    pub fade_duration_ms: u64,
    /// Content fade-in delay as a multiple of the fade duration.
    pub fade_delay: f32,
    pub show_close: bool,
    pub escape_close: bool,
    pub click_close: bool,
    pub allow_drag: bool,
}

impl Default for ModalOptions {
    fn default() -> Self {
        Self {
            container_classes: vec!["mask".into(), "blocker".into(), "current".into()],
            close_class: "close-modal".into(),
            modal_class: "modal".into(),
            fade_duration_ms: DEFAULT_FADE_DURATION_MS,
            fade_delay: DEFAULT_FADE_DELAY,
            show_close: true,
            escape_close: true,
            click_close: true,
            allow_drag: false,
        }
    }
}

impl ModalOptions {
    pub fn container_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.container_classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn close_class(mut self, class: impl Into<String>) -> Self {
        self.close_class = class.into();
        self
    }

    pub fn modal_class(mut self, class: impl Into<String>) -> Self {
        self.modal_class = class.into();
        self
    }

    pub fn fade_duration_ms(mut self, ms: u64) -> Self {
        self.fade_duration_ms = ms;
        self
    }

    pub fn fade_delay(mut self, delay: f32) -> Self {
        self.fade_delay = delay;
        self
    }

    pub fn show_close(mut self, show: bool) -> Self {
        self.show_close = show;
        self
    }

    pub fn escape_close(mut self, close: bool) -> Self {
        self.escape_close = close;
        self
    }

    pub fn click_close(mut self, close: bool) -> Self {
        self.click_close = close;
        self
    }

    pub fn allow_drag(mut self, allow: bool) -> Self {
        self.allow_drag = allow;
        self
    }

    /// Fade duration.
    #[inline]
    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_duration_ms)
    }

    /// Delay before the content fade-in starts: `fade_delay × fade_duration`.
    /// Saturates at [`Duration::MAX`], so an oversized product never reveals
    /// the content early.
    pub fn content_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_secs()).unwrap_or(Duration::MAX)
    }

    fn delay_secs(&self) -> f64 {
        self.fade_duration().as_secs_f64() * f64::from(self.fade_delay)
    }

    /// Copy of these options with every field set in `patch` replaced.
    #[must_use]
    pub fn merged(&self, patch: &ModalOptionsPatch) -> Self {
        let mut merged = self.clone();
        merged.apply(patch);
        merged
    }

    /// Replace every field set in `patch`.
    pub fn apply(&mut self, patch: &ModalOptionsPatch) {
        if let Some(classes) = &patch.container_classes {
            self.container_classes.clone_from(classes);
        }
        if let Some(class) = &patch.close_class {
            self.close_class.clone_from(class);
        }
        if let Some(class) = &patch.modal_class {
            self.modal_class.clone_from(class);
        }
        if let Some(ms) = patch.fade_duration_ms {
            self.fade_duration_ms = ms;
        }
        if let Some(delay) = patch.fade_delay {
            self.fade_delay = delay;
        }
        if let Some(show) = patch.show_close {
            self.show_close = show;
        }
        if let Some(close) = patch.escape_close {
            self.escape_close = close;
        }
        if let Some(close) = patch.click_close {
            self.click_close = close;
        }
        if let Some(allow) = patch.allow_drag {
            self.allow_drag = allow;
        }
    }

    /// Check the values a modal cannot run with.
    pub fn validate(&self) -> Result<(), ModalError> {
        if !self.fade_delay.is_finite() || self.fade_delay < 0.0 {
            return Err(ModalError::InvalidOption {
                key: "fadeDelay",
                reason: format!("must be a finite, non-negative number (got {})", self.fade_delay),
            });
        }
        if Duration::try_from_secs_f64(self.delay_secs()).is_err() {
            return Err(ModalError::InvalidOption {
                key: "fadeDelay",
                reason: format!(
                    "{} × {} ms does not fit in a duration",
                    self.fade_delay, self.fade_duration_ms
                ),
            });
        }
        if self.modal_class.split_ascii_whitespace().count() > 1 {
            return Err(ModalError::InvalidOption {
                key: "modalClass",
                reason: format!("must be a single class name (got {:?})", self.modal_class),
            });
        }
        if self.close_class.split_ascii_whitespace().count() > 1 {
            return Err(ModalError::InvalidOption {
                key: "closeClass",
                reason: format!("must be a single class name (got {:?})", self.close_class),
            });
        }
        Ok(())
    }
}

/// Per-call overrides. Unset fields inherit the manager defaults.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ModalOptionsPatch {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub container_classes: Option<Vec<String>>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub close_class: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub modal_class: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "fadeDuration", skip_serializing_if = "Option::is_none")
    )]
    pub fade_duration_ms: Option<u64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub fade_delay: Option<f32>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub show_close: Option<bool>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub escape_close: Option<bool>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub click_close: Option<bool>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub allow_drag: Option<bool>,
}

impl ModalOptionsPatch {
    /// An empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.container_classes = Some(classes.into_iter().map(Into::into).collect());
        self
    }

    pub fn close_class(mut self, class: impl Into<String>) -> Self {
        self.close_class = Some(class.into());
        self
    }

    pub fn modal_class(mut self, class: impl Into<String>) -> Self {
        self.modal_class = Some(class.into());
        self
    }

    pub fn fade_duration_ms(mut self, ms: u64) -> Self {
        self.fade_duration_ms = Some(ms);
        self
    }

    pub fn fade_delay(mut self, delay: f32) -> Self {
        self.fade_delay = Some(delay);
        self
    }

    pub fn show_close(mut self, show: bool) -> Self {
        self.show_close = Some(show);
        self
    }

    pub fn escape_close(mut self, close: bool) -> Self {
        self.escape_close = Some(close);
        self
    }

    pub fn click_close(mut self, close: bool) -> Self {
        self.click_close = Some(close);
        self
    }

    pub fn allow_drag(mut self, allow: bool) -> Self {
        self.allow_drag = Some(allow);
        self
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
