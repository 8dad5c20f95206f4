use heck::{ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// How names are spelled on the wire.
///
/// Outgoing, it renames envelope keys (parameter names). Incoming, it maps
/// response object keys back to Rust's snake_case field names, see
/// [`NamingConvention::read_keys`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    #[default]
    CamelCase,
    PascalCase,
    SnakeCase,
    Preserve,
}

impl NamingConvention {
    pub fn apply<'a>(&self, name: &'a str) -> Cow<'a, str> {
        use NamingConvention::*;
        let converted = match self {
            CamelCase => name.to_lower_camel_case(),
            PascalCase => name.to_upper_camel_case(),
            SnakeCase => name.to_snake_case(),
            Preserve => return Cow::Borrowed(name),
        };
        if converted == name {
            Cow::Borrowed(name)
        } else {
            Cow::Owned(converted)
        }
    }

    /// Wire key -> Rust field name. `Preserve` leaves keys untouched.
    pub fn field_name<'a>(&self, key: &'a str) -> Cow<'a, str> {
        match self {
            NamingConvention::Preserve => Cow::Borrowed(key),
            _ => {
                let converted = key.to_snake_case();
                if converted == key {
                    Cow::Borrowed(key)
                } else {
                    Cow::Owned(converted)
                }
            }
        }
    }

    /// Rewrites every object key in `value`, at any depth, with [`field_name`](Self::field_name).
    ///
    /// Map keys are rewritten too; use `Preserve` when a response carries
    /// keys that must survive verbatim.
    pub fn read_keys(&self, value: Value) -> Value {
        if *self == NamingConvention::Preserve {
            return value;
        }
        match value {
            Value::Object(object) => Value::Object(
                object
                    .into_iter()
                    .map(|(key, value)| (self.field_name(&key).into_owned(), self.read_keys(value)))
                    .collect::<Map<_, _>>(),
            ),
            Value::Array(items) => Value::Array(items.into_iter().map(|item| self.read_keys(item)).collect()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NamingConvention::*;
    use serde_json::json;

    #[test]
    fn camel_case_leaves_single_words_alone() {
        assert_eq!(CamelCase.apply("city"), "city");
        assert_eq!(CamelCase.apply("city_name"), "cityName");
    }

    #[test]
    fn other_conventions() {
        assert_eq!(PascalCase.apply("city_name"), "CityName");
        assert_eq!(SnakeCase.apply("cityName"), "city_name");
        assert_eq!(Preserve.apply("city_Name"), "city_Name");
    }

    #[test]
    fn reads_wire_keys_back_as_field_names() {
        let wire = json!({
            "cityName": "Paris",
            "HighTemp": 3,
            "hourly": [{ "windSpeed": 4 }, "plainString"],
            "low_temp": -1
        });
        assert_eq!(
            CamelCase.read_keys(wire.clone()),
            json!({
                "city_name": "Paris",
                "high_temp": 3,
                "hourly": [{ "wind_speed": 4 }, "plainString"],
                "low_temp": -1
            })
        );
        assert_eq!(Preserve.read_keys(wire.clone()), wire);
    }
}
