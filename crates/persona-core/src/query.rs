//! Statement templates for the `persona` table
//!
//! Each operation maps its validated input to exactly one parameterized
//! statement. Parameter order follows the `?` placeholders.

use crate::capability::Capability;
use crate::model::{AgeSearch, NationalIdKey, Persona, PersonaUpdate};
use crate::store::{SqlValue, Statement};

/// Column list shared by the reads; decoders rely on this order
pub const COLUMNS: &str =
    "idpersona, cedula, nombres, apellidos, fecha_nacimiento, telefono, direccion";

pub const INSERT: &str = "INSERT INTO persona (idpersona, cedula, nombres, apellidos, fecha_nacimiento, telefono, direccion) VALUES (?, ?, ?, ?, ?, ?, ?)";

pub const UPDATE: &str = "UPDATE persona SET nombres = ?, apellidos = ?, fecha_nacimiento = ?, telefono = ?, direccion = ? WHERE cedula = ?";

pub const SELECT_BY_CEDULA: &str = "SELECT idpersona, cedula, nombres, apellidos, fecha_nacimiento, telefono, direccion FROM persona WHERE cedula = ?";

pub const DELETE_BY_CEDULA: &str = "DELETE FROM persona WHERE cedula = ?";

pub const SELECT_BY_CEDULA_AND_BIRTH: &str = "SELECT idpersona, cedula, nombres, apellidos, fecha_nacimiento, telefono, direccion FROM persona WHERE cedula = ? AND fecha_nacimiento = ?";

pub fn insert(persona: &Persona) -> Statement {
    Statement::new(
        Capability::Create,
        INSERT,
        vec![
            SqlValue::Int(persona.id),
            SqlValue::Text(persona.national_id.clone()),
            SqlValue::Text(persona.given_names.clone()),
            SqlValue::Text(persona.surnames.clone()),
            SqlValue::Date(persona.date_of_birth),
            SqlValue::Text(persona.phone.clone()),
            SqlValue::Text(persona.address.clone()),
        ],
    )
}

pub fn update(update: &PersonaUpdate) -> Statement {
    Statement::new(
        Capability::Update,
        UPDATE,
        vec![
            SqlValue::Text(update.given_names.clone()),
            SqlValue::Text(update.surnames.clone()),
            SqlValue::Date(update.date_of_birth),
            SqlValue::Text(update.phone.clone()),
            SqlValue::Text(update.address.clone()),
            SqlValue::Text(update.national_id.clone()),
        ],
    )
}

pub fn select_by_key(key: &NationalIdKey) -> Statement {
    Statement::new(
        Capability::LookupByKey,
        SELECT_BY_CEDULA,
        vec![SqlValue::Text(key.national_id.clone())],
    )
}

pub fn delete_by_key(key: &NationalIdKey) -> Statement {
    Statement::new(
        Capability::Delete,
        DELETE_BY_CEDULA,
        vec![SqlValue::Text(key.national_id.clone())],
    )
}

pub fn search(search: &AgeSearch) -> Statement {
    Statement::new(
        Capability::SearchWithAge,
        SELECT_BY_CEDULA_AND_BIRTH,
        vec![
            SqlValue::Text(search.national_id.clone()),
            SqlValue::Date(search.date_of_birth),
        ],
    )
}
