use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// CLIENTE MODEL
// ============================================================================

/// Validation findings per field (`Nombre`, `Celular`, `Email`)
pub type Errores = BTreeMap<String, Vec<String>>;

pub const ITEMS_PER_PAGE: u32 = 100;
pub const MAX_PAGE: u32 = 10_000;
pub const SEARCH_LIMIT: u32 = 50;

/// Stored cliente record. JSON field names follow the public API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cliente {
    pub id: Uuid,
    #[serde(rename = "Clave_Cliente")]
    pub clave_cliente: String,
    #[serde(rename = "Nombre")]
    pub nombre: String,
    #[serde(rename = "Celular")]
    pub celular: String,
    #[serde(rename = "Email")]
    pub email: String,
    /// `None` when every field passed validation
    #[serde(rename = "Errores", default)]
    pub errores: Option<Errores>,
}

/// POST body. `Clave_Cliente` may arrive as a string or a number.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NuevoCliente {
    #[serde(rename = "Clave_Cliente", default)]
    pub clave_cliente: Option<Value>,
    #[serde(rename = "Nombre", default)]
    pub nombre: String,
    #[serde(rename = "Celular", default)]
    pub celular: String,
    #[serde(rename = "Email", default)]
    pub email: String,
}

/// PUT body: the editable fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClienteCambios {
    #[serde(rename = "Nombre", default)]
    pub nombre: String,
    #[serde(rename = "Celular", default)]
    pub celular: String,
    #[serde(rename = "Email", default)]
    pub email: String,
}

/// Query string of `/api/clientes/search`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FiltroBusqueda {
    pub nombre: Option<String>,
    pub email: Option<String>,
    pub celular: Option<String>,
}

impl FiltroBusqueda {
    /// Blank criteria are dropped
    pub fn normalized(self) -> Self {
        fn keep(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        Self { nombre: keep(self.nombre), email: keep(self.email), celular: keep(self.celular) }
    }

    pub fn is_empty(&self) -> bool {
        self.nombre.is_none() && self.email.is_none() && self.celular.is_none()
    }
}

// ============================================================================
// CLAVE CLIENTE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaveError {
    #[error("Clave_Cliente es obligatorio")]
    Missing,
    #[error("tipo de Clave_Cliente no soportado")]
    UnsupportedType,
    #[error("Clave_Cliente debe contener solo números")]
    NotNumeric,
    #[error("Clave_Cliente debe estar entre 001 y 999")]
    OutOfRange,
}

/// Raw identifier as received, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaveCliente {
    Numeric(i64),
    Text(String),
}

impl ClaveCliente {
    /// Canonical three-digit form, `001` to `999`
    pub fn normalize(&self) -> Result<String, ClaveError> {
        let value = match self {
            ClaveCliente::Numeric(n) => *n,
            ClaveCliente::Text(s) => {
                if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(ClaveError::NotNumeric);
                }
                // Digits only, so a parse failure can only be overflow
                s.parse::<i64>().map_err(|_| ClaveError::OutOfRange)?
            }
        };

        if !(1..=999).contains(&value) {
            return Err(ClaveError::OutOfRange);
        }
        Ok(format!("{:03}", value))
    }

    /// Normalize a path segment such as `7` or `007`
    pub fn normalize_path(segment: &str) -> Result<String, ClaveError> {
        ClaveCliente::Text(segment.to_string()).normalize()
    }
}

impl TryFrom<&Value> for ClaveCliente {
    type Error = ClaveError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Err(ClaveError::Missing),
            Value::String(s) => Ok(ClaveCliente::Text(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(ClaveCliente::Numeric(i))
                } else if n.as_u64().is_some() {
                    Err(ClaveError::OutOfRange)
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => Ok(ClaveCliente::Numeric(f as i64)),
                        _ => Err(ClaveError::NotNumeric),
                    }
                }
            }
            _ => Err(ClaveError::UnsupportedType),
        }
    }
}

impl fmt::Display for ClaveCliente {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaveCliente::Numeric(n) => write!(f, "{}", n),
            ClaveCliente::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: Value) -> Result<String, ClaveError> {
        ClaveCliente::try_from(&value)?.normalize()
    }

    #[test]
    fn test_clave_normalization_table() {
        let cases = [
            (json!("7"), Ok("007")),
            (json!("007"), Ok("007")),
            (json!(7), Ok("007")),
            (json!(42.0), Ok("042")),
            (json!("999"), Ok("999")),
            (json!(999), Ok("999")),
            (json!("0"), Err(ClaveError::OutOfRange)),
            (json!(1000), Err(ClaveError::OutOfRange)),
            (json!(-5), Err(ClaveError::OutOfRange)),
            (json!("99999999999999999999999"), Err(ClaveError::OutOfRange)),
            (json!("12a"), Err(ClaveError::NotNumeric)),
            (json!(""), Err(ClaveError::NotNumeric)),
            (json!("-1"), Err(ClaveError::NotNumeric)),
            (json!(1.5), Err(ClaveError::NotNumeric)),
            (json!(true), Err(ClaveError::UnsupportedType)),
            (json!(["1"]), Err(ClaveError::UnsupportedType)),
            (Value::Null, Err(ClaveError::Missing)),
        ];
        for (input, expected) in cases {
            let expected = expected.map(str::to_string);
            assert_eq!(normalize(input.clone()), expected, "input {input}");
        }
    }

    #[test]
    fn test_path_segments_address_same_record() {
        assert_eq!(ClaveCliente::normalize_path("7").unwrap(), "007");
        assert_eq!(ClaveCliente::normalize_path("007").unwrap(), "007");
        assert!(ClaveCliente::normalize_path("abc").is_err());
    }

    #[test]
    fn test_cliente_json_field_names() {
        let cliente = Cliente {
            id: Uuid::nil(),
            clave_cliente: "001".into(),
            nombre: "Pedro".into(),
            celular: "9613214782".into(),
            email: "pedro@gmail.com".into(),
            errores: None,
        };
        let value = serde_json::to_value(&cliente).unwrap();
        assert_eq!(value["Clave_Cliente"], "001");
        assert_eq!(value["Nombre"], "Pedro");
        assert!(value["Errores"].is_null());
    }

    #[test]
    fn test_nuevo_cliente_accepts_numeric_clave() {
        let nuevo: NuevoCliente = serde_json::from_value(json!({ "Clave_Cliente": 12, "Nombre": "Ana" })).unwrap();
        assert_eq!(nuevo.clave_cliente, Some(json!(12)));
        assert_eq!(nuevo.email, "");
    }

    #[test]
    fn test_filtro_drops_blank_criteria() {
        let filtro = FiltroBusqueda { nombre: Some("  ".into()), email: None, celular: Some("961".into()) }.normalized();
        assert_eq!(filtro.nombre, None);
        assert_eq!(filtro.celular.as_deref(), Some("961"));
        assert!(FiltroBusqueda::default().normalized().is_empty());
    }
}
