//! Person record and the typed inputs of each operation
//!
//! Rust field names describe the data; serde renames carry the wire names of
//! the `persona` table (`cedula`, `nombres`, ...).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the `persona` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    #[serde(rename = "idpersona")]
    pub id: i64,
    #[serde(rename = "cedula")]
    pub national_id: String,
    #[serde(rename = "nombres")]
    pub given_names: String,
    #[serde(rename = "apellidos")]
    pub surnames: String,
    /// Serialized as `YYYY-MM-DD`
    #[serde(rename = "fecha_nacimiento")]
    pub date_of_birth: NaiveDate,
    #[serde(rename = "telefono")]
    pub phone: String,
    #[serde(rename = "direccion")]
    pub address: String,
}

/// Replacement values for every mutable column of the rows keyed by `national_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaUpdate {
    pub national_id: String,
    pub given_names: String,
    pub surnames: String,
    pub date_of_birth: NaiveDate,
    pub phone: String,
    pub address: String,
}

impl PersonaUpdate {
    /// Apply to a stored row, leaving `id` and `national_id` untouched
    pub fn apply_to(&self, persona: &mut Persona) {
        persona.given_names.clone_from(&self.given_names);
        persona.surnames.clone_from(&self.surnames);
        persona.date_of_birth = self.date_of_birth;
        persona.phone.clone_from(&self.phone);
        persona.address.clone_from(&self.address);
    }
}

/// Lookup / delete key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NationalIdKey {
    pub national_id: String,
}

/// Conjunctive search on `national_id` and `date_of_birth`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgeSearch {
    pub national_id: String,
    pub date_of_birth: NaiveDate,
}

/// `{message}` confirmation, with the affected row count where it is known
#[derive(Debug, Clone, Serialize)]
pub struct MessageBody {
    pub message: &'static str,
    #[serde(rename = "affectedRows", skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<u64>,
}

/// Search-with-derived-age result
#[derive(Debug, Clone, Serialize)]
pub struct AgeSearchBody {
    pub persona: Persona,
    #[serde(rename = "edad")]
    pub age: i32,
    #[serde(rename = "esMayorEdad")]
    pub is_adult: bool,
}
