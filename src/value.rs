//! Values crossing the script boundary.
//!
//! Scripts are dynamically typed while host handlers are not. Every value a
//! script hands to the host is first captured as a [`ScriptValue`] and then
//! converted to the handler's parameter type through [`FromScriptValue`],
//! which applies a fixed set of coercions (numeric widening, string
//! formatting, nil defaults) and reports anything else as a type mismatch.

use std::fmt;

use mlua::{FromLua, IntoLua, Lua, Value};

use crate::{FlowError, Result};

/// A dynamically typed value passed between a script and the host.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScriptValue {
    /// Absence of a value.
    #[default]
    Nil,
    /// Boolean.
    Bool(bool),
    /// Integer number.
    Integer(i64),
    /// Floating point number.
    Number(f64),
    /// UTF-8 string.
    String(String),
}

impl ScriptValue {
    /// Name of the value's type, as used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Nil => "nil",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Integer(_) => "integer",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
        }
    }

    /// Returns true for [`ScriptValue::Nil`].
    pub fn is_nil(&self) -> bool {
        matches!(self, ScriptValue::Nil)
    }

    /// Capture a Lua value.
    ///
    /// Tables, functions, userdata and threads have no host representation
    /// and are rejected.
    pub fn from_lua_value(value: &Value) -> Result<Self> {
        match value {
            Value::Nil => Ok(ScriptValue::Nil),
            Value::Boolean(b) => Ok(ScriptValue::Bool(*b)),
            Value::Integer(i) => Ok(ScriptValue::Integer(*i)),
            Value::Number(n) => Ok(ScriptValue::Number(*n)),
            Value::String(s) => s
                .to_str()
                .map(|s| ScriptValue::String(s.to_string()))
                .map_err(|_| FlowError::TypeMismatch {
                    from: "binary string",
                    to: "string",
                }),
            other => Err(FlowError::TypeMismatch {
                from: other.type_name(),
                to: "script value",
            }),
        }
    }

    /// Convert to a host type using the coercion rules of `T`.
    pub fn convert<T: FromScriptValue>(&self) -> Result<T> {
        T::from_script_value(self)
    }

    fn mismatch<T: FromScriptValue>(&self) -> FlowError {
        FlowError::TypeMismatch {
            from: self.type_name(),
            to: T::TYPE_NAME,
        }
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Nil => write!(f, "nil"),
            ScriptValue::Bool(b) => write!(f, "{b}"),
            ScriptValue::Integer(i) => write!(f, "{i}"),
            ScriptValue::Number(n) => write!(f, "{n}"),
            ScriptValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(v: bool) -> Self {
        ScriptValue::Bool(v)
    }
}

impl From<i32> for ScriptValue {
    fn from(v: i32) -> Self {
        ScriptValue::Integer(v.into())
    }
}

impl From<i64> for ScriptValue {
    fn from(v: i64) -> Self {
        ScriptValue::Integer(v)
    }
}

impl From<f64> for ScriptValue {
    fn from(v: f64) -> Self {
        ScriptValue::Number(v)
    }
}

impl From<&str> for ScriptValue {
    fn from(v: &str) -> Self {
        ScriptValue::String(v.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(v: String) -> Self {
        ScriptValue::String(v)
    }
}

impl FromLua for ScriptValue {
    fn from_lua(value: Value, _lua: &Lua) -> mlua::Result<Self> {
        ScriptValue::from_lua_value(&value).map_err(FlowError::into_lua)
    }
}

impl IntoLua for ScriptValue {
    fn into_lua(self, lua: &Lua) -> mlua::Result<Value> {
        Ok(match self {
            ScriptValue::Nil => Value::Nil,
            ScriptValue::Bool(b) => Value::Boolean(b),
            ScriptValue::Integer(i) => Value::Integer(i),
            ScriptValue::Number(n) => Value::Number(n),
            ScriptValue::String(s) => Value::String(lua.create_string(&s)?),
        })
    }
}

/// Conversion from a [`ScriptValue`] into a handler parameter type.
pub trait FromScriptValue: Sized + 'static {
    /// Type name reported in mismatch errors.
    const TYPE_NAME: &'static str;

    /// Convert a script value, coercing where the rules allow it.
    fn from_script_value(value: &ScriptValue) -> Result<Self>;

    /// Value used when the script passes nothing, or `None` when the type
    /// has no sensible default.
    fn from_nil() -> Option<Self>;
}

/// Resolve an optional parameter into `T`, falling back to its nil default.
pub fn bind_parameter<T: FromScriptValue>(parameter: Option<&ScriptValue>) -> Result<T> {
    match parameter {
        Some(value) => T::from_script_value(value),
        None => T::from_nil().ok_or(FlowError::TypeMismatch {
            from: "nil",
            to: T::TYPE_NAME,
        }),
    }
}

fn nil_default<T: FromScriptValue>(value: &ScriptValue) -> Result<T> {
    T::from_nil().ok_or_else(|| value.mismatch::<T>())
}

fn parse_number(s: &str) -> Option<f64> {
    let n: f64 = s.trim().parse().ok()?;
    n.is_finite().then_some(n)
}

fn number_to_i64(n: f64) -> Option<i64> {
    let rounded = n.round();
    if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded <= i64::MAX as f64 {
        Some(rounded as i64)
    } else {
        None
    }
}

impl FromScriptValue for ScriptValue {
    const TYPE_NAME: &'static str = "script value";

    fn from_script_value(value: &ScriptValue) -> Result<Self> {
        Ok(value.clone())
    }

    fn from_nil() -> Option<Self> {
        Some(ScriptValue::Nil)
    }
}

impl FromScriptValue for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn from_script_value(value: &ScriptValue) -> Result<Self> {
        match value {
            ScriptValue::Nil => nil_default(value),
            ScriptValue::Bool(b) => Ok(*b),
            ScriptValue::Integer(i) => Ok(*i != 0),
            ScriptValue::Number(n) => Ok(*n != 0.0),
            ScriptValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(value.mismatch::<Self>()),
            },
        }
    }

    fn from_nil() -> Option<Self> {
        Some(false)
    }
}

impl FromScriptValue for i64 {
    const TYPE_NAME: &'static str = "integer";

    fn from_script_value(value: &ScriptValue) -> Result<Self> {
        match value {
            ScriptValue::Nil => nil_default(value),
            ScriptValue::Bool(b) => Ok(i64::from(*b)),
            ScriptValue::Integer(i) => Ok(*i),
            ScriptValue::Number(n) => number_to_i64(*n).ok_or_else(|| value.mismatch::<Self>()),
            ScriptValue::String(s) => match s.trim().parse::<i64>() {
                Ok(i) => Ok(i),
                Err(_) => parse_number(s)
                    .and_then(number_to_i64)
                    .ok_or_else(|| value.mismatch::<Self>()),
            },
        }
    }

    fn from_nil() -> Option<Self> {
        Some(0)
    }
}

impl FromScriptValue for i32 {
    const TYPE_NAME: &'static str = "32-bit integer";

    fn from_script_value(value: &ScriptValue) -> Result<Self> {
        let wide = i64::from_script_value(value).map_err(|_| value.mismatch::<Self>())?;
        i32::try_from(wide).map_err(|_| value.mismatch::<Self>())
    }

    fn from_nil() -> Option<Self> {
        Some(0)
    }
}

impl FromScriptValue for f64 {
    const TYPE_NAME: &'static str = "number";

    fn from_script_value(value: &ScriptValue) -> Result<Self> {
        match value {
            ScriptValue::Nil => nil_default(value),
            ScriptValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            ScriptValue::Integer(i) => Ok(*i as f64),
            ScriptValue::Number(n) => Ok(*n),
            ScriptValue::String(s) => parse_number(s).ok_or_else(|| value.mismatch::<Self>()),
        }
    }

    fn from_nil() -> Option<Self> {
        Some(0.0)
    }
}

impl FromScriptValue for f32 {
    const TYPE_NAME: &'static str = "32-bit number";

    fn from_script_value(value: &ScriptValue) -> Result<Self> {
        f64::from_script_value(value)
            .map(|n| n as f32)
            .map_err(|_| value.mismatch::<Self>())
    }

    fn from_nil() -> Option<Self> {
        Some(0.0)
    }
}

impl FromScriptValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_script_value(value: &ScriptValue) -> Result<Self> {
        match value {
            ScriptValue::Nil => nil_default(value),
            other => Ok(other.to_string()),
        }
    }

    fn from_nil() -> Option<Self> {
        None
    }
}

impl<T: FromScriptValue> FromScriptValue for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn from_script_value(value: &ScriptValue) -> Result<Self> {
        match value {
            ScriptValue::Nil => Ok(None),
            other => T::from_script_value(other).map(Some),
        }
    }

    fn from_nil() -> Option<Self> {
        Some(None)
    }
}
