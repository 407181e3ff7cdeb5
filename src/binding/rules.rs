//! Rendering rules: how one field value lands on one bound element.
//!
//! A field name resolves once to a [`FieldRole`]; the role and the shape of
//! each target then select a [`RenderStrategy`]. Precedence, highest first:
//!
//! 1. literal fill element (`progress-bar-fill`): `width: <value>%`
//! 2. temperature percent inside a `progress-bar-temp` container: `--temp-intensity`
//! 3. cpu/ram percent inside a `progress-bar-cpu`/`progress-bar-ram` container: `--fill-percent`
//! 4. text content (with unit suffix) or form value (raw)
//!
//! Class derivation (`data-ws-class`) is independent of the above.

use phf::phf_map;

use super::document::{Document, ElementId, ElementKind};
use crate::types::FieldValue;

/// Marks an element as interested in a topic.
pub const TOPIC_ATTRIBUTE: &str = "data-ws-topic";
/// Marks an element as rendering a field.
pub const FIELD_ATTRIBUTE: &str = "data-ws-field";
/// Marks an element as deriving a class from a field.
pub const CLASS_ATTRIBUTE: &str = "data-ws-class";
/// Records the class last derived onto an element.
pub const DERIVED_ATTRIBUTE: &str = "data-ws-derived";

pub const FILL_CLASS: &str = "progress-bar-fill";
pub const PROGRESS_BAR_CLASS: &str = "progress-bar";
pub const TEMPERATURE_CONTAINER_CLASS: &str = "progress-bar-temp";
pub const CPU_CONTAINER_CLASS: &str = "progress-bar-cpu";
pub const RAM_CONTAINER_CLASS: &str = "progress-bar-ram";

/// Prefix of classes derived onto generic progress bars.
pub const TEMPERATURE_CLASS_PREFIX: &str = "progress-bar-temp-";

pub const TEMPERATURE_VARIABLE: &str = "--temp-intensity";
pub const FILL_VARIABLE: &str = "--fill-percent";

const TEMPERATURE_CONTAINERS: &[&str] = &[TEMPERATURE_CONTAINER_CLASS];
const LOAD_CONTAINERS: &[&str] = &[CPU_CONTAINER_CLASS, RAM_CONTAINER_CLASS];

/// Temperature labels published in `temp_class`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TemperatureClass {
    /// Below 40 °C
    Cold,
    /// 40 to 55 °C
    Normal,
    /// 55 to 70 °C
    Warm,
    /// 70 °C and above
    Hot,
}

static TEMPERATURE_LABELS: phf::Map<&'static str, TemperatureClass> = phf_map! {
    "cold" => TemperatureClass::Cold,
    "normal" => TemperatureClass::Normal,
    "warm" => TemperatureClass::Warm,
    "hot" => TemperatureClass::Hot,
};

impl TemperatureClass {
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        TEMPERATURE_LABELS.get(label).copied()
    }
}

/// What a field means for rendering.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Temperature in degrees Celsius
    Temperature,
    /// Temperature as a share of the critical temperature
    TemperaturePercent,
    /// CPU or RAM utilization percent
    LoadPercent,
    /// Anything else, rendered as-is
    Plain,
}

static FIELD_ROLES: phf::Map<&'static str, FieldRole> = phf_map! {
    "cpu_temp" => FieldRole::Temperature,
    "cpu_temp_percent" => FieldRole::TemperaturePercent,
    "cpu_usage" => FieldRole::LoadPercent,
    "ram_percent" => FieldRole::LoadPercent,
};

impl FieldRole {
    #[must_use]
    pub fn of(field: &str) -> Self {
        FIELD_ROLES.get(field).copied().unwrap_or(Self::Plain)
    }

    /// Unit appended when the value is rendered as text.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::LoadPercent => "%",
            Self::TemperaturePercent | Self::Plain => "",
        }
    }

    /// Container classes and the custom property set on them.
    const fn container(self) -> Option<(&'static [&'static str], &'static str)> {
        match self {
            Self::TemperaturePercent => Some((TEMPERATURE_CONTAINERS, TEMPERATURE_VARIABLE)),
            Self::LoadPercent => Some((LOAD_CONTAINERS, FILL_VARIABLE)),
            Self::Temperature | Self::Plain => None,
        }
    }
}

/// How a value is written onto one target.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    /// `width: <value>%` on the target
    FillWidth,
    /// `<variable>: <value>%` on the enclosing progress container
    ContainerVariable {
        container: ElementId,
        variable: &'static str,
    },
    /// Text content with a unit suffix
    Text { suffix: &'static str },
    /// Raw value into the form value slot
    FormValue,
}

impl RenderStrategy {
    #[must_use]
    pub fn select(role: FieldRole, document: &dyn Document, target: ElementId) -> Self {
        if document.has_class(target, FILL_CLASS) {
            return Self::FillWidth;
        }

        if let Some((classes, variable)) = role.container() {
            let container = classes
                .iter()
                .find_map(|class| document.closest_with_class(target, class));
            if let Some(container) = container {
                return Self::ContainerVariable {
                    container,
                    variable,
                };
            }
        }

        match document.kind(target) {
            ElementKind::Input => Self::FormValue,
            ElementKind::Text => Self::Text {
                suffix: role.suffix(),
            },
        }
    }

    pub fn apply(self, document: &mut dyn Document, target: ElementId, value: &FieldValue) {
        match self {
            Self::FillWidth => document.set_style_property(target, "width", &format!("{value}%")),
            Self::ContainerVariable {
                container,
                variable,
            } => document.set_style_property(container, variable, &format!("{value}%")),
            Self::Text { suffix } => document.set_text(target, &format!("{value}{suffix}")),
            Self::FormValue => document.set_value(target, &value.to_string()),
        }
    }
}

/// Classes previously derived from a temperature label.
#[must_use]
pub fn is_derived_temperature_class(class: &str) -> bool {
    class.starts_with(TEMPERATURE_CLASS_PREFIX) || TemperatureClass::from_label(class).is_some()
}

/// Replace the derived class on `target` with one built from `value`.
///
/// Falsy values and labels that are not a single class token are ignored, so
/// an empty label never strips the current class. The class added is recorded
/// in [`DERIVED_ATTRIBUTE`] so arbitrary labels are replaced too. A class the
/// element already carried is left alone on the next derivation.
pub fn derive_class(document: &mut dyn Document, target: ElementId, value: &FieldValue) {
    if value.is_falsy() {
        return;
    }
    let label = value.to_string();
    let label = label.trim();
    if label.is_empty() || label.contains(char::is_whitespace) {
        return;
    }

    let previous = document
        .attribute(target, DERIVED_ATTRIBUTE)
        .map(ToOwned::to_owned);
    for class in document.class_list(target) {
        if is_derived_temperature_class(&class) || previous.as_deref() == Some(class.as_str()) {
            document.remove_class(target, &class);
        }
    }

    let class = if document.has_class(target, PROGRESS_BAR_CLASS) {
        format!("{TEMPERATURE_CLASS_PREFIX}{label}")
    } else {
        label.to_owned()
    };
    if document.has_class(target, &class) {
        document.set_attribute(target, DERIVED_ATTRIBUTE, "");
    } else {
        document.add_class(target, &class);
        document.set_attribute(target, DERIVED_ATTRIBUTE, &class);
    }
}
