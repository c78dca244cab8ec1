use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;

use crate::core::error::Error;

const MAX_TYPE_LEN: usize = 64;

/// Reference point of the widget's bounding box that `position_x`/`position_y` refer to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum Anchor {
    #[default]
    Center,
    Top,
    Bottom,
    #[serde(alias = "topleft")]
    TopLeft,
    #[serde(alias = "topright")]
    TopRight,
    #[serde(alias = "bottomleft")]
    BottomLeft,
    #[serde(alias = "bottomright")]
    BottomRight,
}

impl Anchor {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Anchor::Center => "center",
            Anchor::Top => "top",
            Anchor::Bottom => "bottom",
            Anchor::TopLeft => "top-left",
            Anchor::TopRight => "top-right",
            Anchor::BottomLeft => "bottom-left",
            Anchor::BottomRight => "bottom-right",
        }
    }
}

impl Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Anchor {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "center" => Ok(Anchor::Center),
            "top" => Ok(Anchor::Top),
            "bottom" => Ok(Anchor::Bottom),
            "top-left" | "topleft" => Ok(Anchor::TopLeft),
            "top-right" | "topright" => Ok(Anchor::TopRight),
            "bottom-left" | "bottomleft" => Ok(Anchor::BottomLeft),
            "bottom-right" | "bottomright" => Ok(Anchor::BottomRight),
            other => Err(Error::Validation(format!("Unknown anchor: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct Widget {
    pub(crate) id: i64,
    #[serde(rename = "type")]
    pub(crate) kind: String,
    pub(crate) content: Value,
    pub(crate) position_x: f64,
    pub(crate) position_y: f64,
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) anchor: Anchor,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) user_id: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct NewWidget {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    pub(crate) content: Value,
    pub(crate) position_x: f64,
    pub(crate) position_y: f64,
    pub(crate) width: f64,
    pub(crate) height: f64,
    #[serde(default)]
    pub(crate) anchor: Anchor,
}

impl NewWidget {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        validate_kind(&self.kind)?;
        validate_position(self.position_x)?;
        validate_position(self.position_y)?;
        validate_extent(self.width)?;
        validate_extent(self.height)
    }
}

/// Partial widget update; absent fields keep their stored value.
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct WidgetPatch {
    #[serde(rename = "type")]
    pub(crate) kind: Option<String>,
    pub(crate) content: Option<Value>,
    pub(crate) position_x: Option<f64>,
    pub(crate) position_y: Option<f64>,
    pub(crate) width: Option<f64>,
    pub(crate) height: Option<f64>,
    pub(crate) anchor: Option<Anchor>,
}

impl WidgetPatch {
    /// Checks only the supplied fields; every rule is per field.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if let Some(kind) = &self.kind {
            validate_kind(kind)?;
        }
        for position in [self.position_x, self.position_y].into_iter().flatten() {
            validate_position(position)?;
        }
        for extent in [self.width, self.height].into_iter().flatten() {
            validate_extent(extent)?;
        }

        Ok(())
    }

    pub(crate) fn apply(self, widget: &mut Widget) {
        if let Some(kind) = self.kind {
            widget.kind = kind;
        }
        if let Some(content) = self.content {
            widget.content = content;
        }
        if let Some(position_x) = self.position_x {
            widget.position_x = position_x;
        }
        if let Some(position_y) = self.position_y {
            widget.position_y = position_y;
        }
        if let Some(width) = self.width {
            widget.width = width;
        }
        if let Some(height) = self.height {
            widget.height = height;
        }
        if let Some(anchor) = self.anchor {
            widget.anchor = anchor;
        }
    }
}

fn validate_kind(kind: &str) -> Result<(), Error> {
    if kind.trim().is_empty() {
        return Err(Error::Validation("Widget type must not be empty".into()));
    }

    if kind.len() > MAX_TYPE_LEN {
        return Err(Error::Validation(format!(
            "Widget type must be at most {MAX_TYPE_LEN} characters"
        )));
    }

    Ok(())
}

fn validate_position(value: f64) -> Result<(), Error> {
    if !value.is_finite() {
        return Err(Error::Validation(
            "Widget position and size must be finite numbers".into(),
        ));
    }

    Ok(())
}

fn validate_extent(value: f64) -> Result<(), Error> {
    validate_position(value)?;

    if value < 0.0 {
        return Err(Error::Validation(
            "Widget width and height must not be negative".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn widget() -> Widget {
        let now = Utc::now();

        Widget {
            id: 7,
            kind: "text".into(),
            content: json!({"text": "hello"}),
            position_x: 10.0,
            position_y: 20.0,
            width: 100.0,
            height: 50.0,
            anchor: Anchor::Center,
            created_at: now,
            updated_at: now,
            user_id: 1,
        }
    }

    #[test]
    fn anchor_accepts_legacy_spellings() {
        let anchor: Anchor = serde_json::from_value(json!("topleft")).unwrap();
        assert_eq!(anchor, Anchor::TopLeft);

        let anchor: Anchor = serde_json::from_value(json!("bottom-right")).unwrap();
        assert_eq!(anchor, Anchor::BottomRight);

        assert_eq!("bottomleft".parse::<Anchor>().unwrap(), Anchor::BottomLeft);
        assert!("middle".parse::<Anchor>().is_err());
        assert!(serde_json::from_value::<Anchor>(json!("middle")).is_err());
    }

    #[test]
    fn anchor_serializes_kebab_case() {
        assert_eq!(serde_json::to_value(Anchor::TopRight).unwrap(), json!("top-right"));
        assert_eq!(Anchor::TopRight.to_string(), "top-right");
    }

    #[test]
    fn patch_only_touches_supplied_fields() {
        let mut patched = widget();
        let original = patched.clone();

        let patch: WidgetPatch =
            serde_json::from_value(json!({"position_x": 42.5, "anchor": "top"})).unwrap();
        patch.apply(&mut patched);

        assert_eq!(patched.position_x, 42.5);
        assert_eq!(patched.anchor, Anchor::Top);
        assert_eq!(patched.kind, original.kind);
        assert_eq!(patched.content, original.content);
        assert_eq!(patched.position_y, original.position_y);
        assert_eq!(patched.width, original.width);
        assert_eq!(patched.height, original.height);
    }

    #[test]
    fn new_widget_defaults_to_center() {
        let new: NewWidget = serde_json::from_value(json!({
            "type": "photo",
            "content": {"url": "https://example.com/a.png"},
            "position_x": 0.0,
            "position_y": 0.0,
            "width": 10.0,
            "height": 10.0
        }))
        .unwrap();

        assert_eq!(new.anchor, Anchor::Center);
        assert!(new.validate().is_ok());
    }

    fn new_widget() -> NewWidget {
        serde_json::from_value(json!({
            "type": "text",
            "content": {"text": "hello"},
            "position_x": -15.0,
            "position_y": 20.0,
            "width": 100.0,
            "height": 0.0
        }))
        .unwrap()
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(new_widget().validate().is_ok());

        let mut bad = new_widget();
        bad.width = -1.0;
        assert!(matches!(bad.validate(), Err(Error::Validation(_))));

        let mut bad = new_widget();
        bad.position_y = f64::NAN;
        assert!(bad.validate().is_err());

        let mut bad = new_widget();
        bad.kind = "  ".into();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn patch_validates_only_supplied_fields() {
        assert!(WidgetPatch::default().validate().is_ok());

        let patch = WidgetPatch {
            position_x: Some(-40.0),
            ..Default::default()
        };
        assert!(patch.validate().is_ok());

        let patch = WidgetPatch {
            height: Some(-0.5),
            ..Default::default()
        };
        assert!(matches!(patch.validate(), Err(Error::Validation(_))));

        let patch = WidgetPatch {
            position_x: Some(f64::INFINITY),
            ..Default::default()
        };
        assert!(patch.validate().is_err());

        let patch = WidgetPatch {
            kind: Some("x".repeat(MAX_TYPE_LEN + 1)),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }
}
