//! Dynamic per-type field schema: field kinds, validation rules and value
//! checks.

use std::str::FromStr;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::error::{ComplianceError, ComplianceResult};
use crate::models::DocumentField;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid")
});

static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 \-()]{5,19}$").expect("phone regex is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Date,
    Select,
    Multiselect,
    Checkbox,
    Email,
    Phone,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Multiselect => "multiselect",
            FieldType::Checkbox => "checkbox",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
        }
    }

    pub fn has_options(self) -> bool {
        matches!(self, FieldType::Select | FieldType::Multiselect)
    }
}

impl FromStr for FieldType {
    type Err = ComplianceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(FieldType::Text),
            "textarea" => Ok(FieldType::Textarea),
            "number" => Ok(FieldType::Number),
            "date" => Ok(FieldType::Date),
            "select" => Ok(FieldType::Select),
            "multiselect" => Ok(FieldType::Multiselect),
            "checkbox" => Ok(FieldType::Checkbox),
            "email" => Ok(FieldType::Email),
            "phone" => Ok(FieldType::Phone),
            other => Err(ComplianceError::InvalidInput(format!(
                "unknown field type '{other}'"
            ))),
        }
    }
}

/// Validation metadata stored alongside a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl FieldValidation {
    /// Rejects rule sets that could never be satisfied or cannot be compiled.
    pub fn check(&self) -> ComplianceResult<()> {
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(ComplianceError::InvalidInput(
                    "min_length must not exceed max_length".to_string(),
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(ComplianceError::InvalidInput(
                    "min must not exceed max".to_string(),
                ));
            }
        }
        self.compiled_pattern()?;
        Ok(())
    }

    pub fn compiled_pattern(&self) -> ComplianceResult<Option<Regex>> {
        self.pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|err| {
                ComplianceError::InvalidInput(format!("invalid validation pattern: {err}"))
            })
    }
}

/// A field definition as submitted by an administrator.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FieldDefinition {
    #[validate(length(max = 100, message = "field name must not exceed 100 characters"))]
    pub name: String,
    #[validate(length(max = 255, message = "field label must not exceed 255 characters"))]
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub validation: FieldValidation,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_readonly: bool,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    #[serde(default)]
    pub display_order: i32,
}

fn default_visible() -> bool {
    true
}

impl FieldDefinition {
    /// Normalizes names/labels and checks the definition is self-consistent.
    pub fn normalized(mut self) -> ComplianceResult<Self> {
        self.name = self.name.trim().to_string();
        self.label = self.label.trim().to_string();
        self.validate()?;
        if self.name.is_empty() {
            return Err(ComplianceError::InvalidInput(
                "field name must not be empty".to_string(),
            ));
        }
        if self.label.is_empty() {
            return Err(ComplianceError::InvalidInput(
                "field label must not be empty".to_string(),
            ));
        }
        check_options(self.field_type, &self.options)?;
        self.validation.check()?;
        Ok(self)
    }
}

pub(crate) fn check_options(field_type: FieldType, options: &[String]) -> ComplianceResult<()> {
    if field_type.has_options() && options.iter().all(|opt| opt.trim().is_empty()) {
        return Err(ComplianceError::InvalidInput(format!(
            "{} fields need at least one option",
            field_type.as_str()
        )));
    }
    Ok(())
}

/// Typed view over a stored `DocumentField` row.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: FieldType,
    pub options: Vec<String>,
    pub validation: FieldValidation,
    pub pattern: Option<Regex>,
    pub is_required: bool,
}

impl FieldSchema {
    pub fn from_field(field: &DocumentField) -> ComplianceResult<Self> {
        let field_type = field.field_type.parse()?;
        let options: Vec<String> = serde_json::from_value(field.options.clone())
            .map_err(|err| ComplianceError::InvalidInput(format!("corrupt field options: {err}")))?;
        let validation: FieldValidation = serde_json::from_value(field.validation.clone())
            .map_err(|err| {
                ComplianceError::InvalidInput(format!("corrupt field validation: {err}"))
            })?;
        let pattern = validation.compiled_pattern()?;

        Ok(Self {
            name: field.name.clone(),
            field_type,
            options,
            validation,
            pattern,
            is_required: field.is_required,
        })
    }

    /// Validates a submitted value against this field.
    pub fn validate(&self, value: &Value) -> ComplianceResult<()> {
        let invalid = |message: String| ComplianceError::InvalidFieldValue {
            field: self.name.clone(),
            message,
        };

        if value.is_null() {
            return if self.is_required {
                Err(ComplianceError::RequiredFieldMissing(self.name.clone()))
            } else {
                Ok(())
            };
        }

        match self.field_type {
            FieldType::Text | FieldType::Textarea | FieldType::Email | FieldType::Phone => {
                let text = value
                    .as_str()
                    .ok_or_else(|| invalid("expected a string".to_string()))?;
                if self.is_required && text.trim().is_empty() {
                    return Err(ComplianceError::RequiredFieldMissing(self.name.clone()));
                }
                self.check_text(text).map_err(invalid)?;
                if self.field_type == FieldType::Email && !EMAIL_REGEX.is_match(text) {
                    return Err(invalid("expected an email address".to_string()));
                }
                if self.field_type == FieldType::Phone && !PHONE_REGEX.is_match(text) {
                    return Err(invalid("expected a phone number".to_string()));
                }
            }
            FieldType::Number => {
                let number = match value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                }
                .ok_or_else(|| invalid("expected a number".to_string()))?;
                if let Some(min) = self.validation.min {
                    if number < min {
                        return Err(invalid(format!("must be at least {min}")));
                    }
                }
                if let Some(max) = self.validation.max {
                    if number > max {
                        return Err(invalid(format!("must be at most {max}")));
                    }
                }
            }
            FieldType::Date => {
                let text = value
                    .as_str()
                    .ok_or_else(|| invalid("expected a date string".to_string()))?;
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .map_err(|_| invalid("expected a date formatted as YYYY-MM-DD".to_string()))?;
            }
            FieldType::Select => {
                let choice = value
                    .as_str()
                    .ok_or_else(|| invalid("expected one option".to_string()))?;
                if !self.options.iter().any(|opt| opt == choice) {
                    return Err(invalid(format!("'{choice}' is not an allowed option")));
                }
            }
            FieldType::Multiselect => {
                let choices = value
                    .as_array()
                    .ok_or_else(|| invalid("expected a list of options".to_string()))?;
                if self.is_required && choices.is_empty() {
                    return Err(ComplianceError::RequiredFieldMissing(self.name.clone()));
                }
                for choice in choices {
                    let choice = choice
                        .as_str()
                        .ok_or_else(|| invalid("options must be strings".to_string()))?;
                    if !self.options.iter().any(|opt| opt == choice) {
                        return Err(invalid(format!("'{choice}' is not an allowed option")));
                    }
                }
            }
            FieldType::Checkbox => {
                if !value.is_boolean() {
                    return Err(invalid("expected true or false".to_string()));
                }
            }
        }

        Ok(())
    }

    fn check_text(&self, text: &str) -> Result<(), String> {
        let length = text.chars().count();
        if let Some(min) = self.validation.min_length {
            if length < min {
                return Err(format!("must be at least {min} characters"));
            }
        }
        if let Some(max) = self.validation.max_length {
            if length > max {
                return Err(format!("must be at most {max} characters"));
            }
        }
        if let Some(regex) = &self.pattern {
            if !regex.is_match(text) {
                return Err(format!("does not match pattern {}", regex.as_str()));
            }
        }
        Ok(())
    }
}
