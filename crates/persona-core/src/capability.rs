//! Declared operation set and route targets

use crate::request::Method;

/// The five person-record operations the gateway exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Create,
    Update,
    LookupByKey,
    Delete,
    SearchWithAge,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Create,
        Capability::Update,
        Capability::LookupByKey,
        Capability::Delete,
        Capability::SearchWithAge,
    ];

    /// Route path. All operations are `POST` with a JSON body.
    pub fn path(&self) -> &'static str {
        match self {
            Capability::Create => "/insertar-datos",
            Capability::Update => "/modificar-datos",
            Capability::LookupByKey => "/seleccionar-datos",
            Capability::Delete => "/eliminar-datos",
            Capability::SearchWithAge => "/buscar-datos",
        }
    }

    pub fn method(&self) -> Method {
        Method::Post
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Create => "create",
            Capability::Update => "update",
            Capability::LookupByKey => "lookup_by_key",
            Capability::Delete => "delete",
            Capability::SearchWithAge => "search_with_age",
        }
    }

    pub fn missing_fields_message(&self) -> &'static str {
        match self {
            Capability::Create | Capability::Update | Capability::SearchWithAge => {
                "Faltan datos requeridos"
            }
            Capability::LookupByKey => "Falta el ID de la persona",
            Capability::Delete => "Falta la cedula de la persona",
        }
    }

    pub fn store_failure_message(&self) -> &'static str {
        match self {
            Capability::Create => "Error al insertar datos en la base de datos",
            Capability::Update => "Error al modificar datos en la base de datos",
            Capability::LookupByKey => "Error al seleccionar datos de la base de datos",
            Capability::Delete => "Error al eliminar datos de la base de datos",
            Capability::SearchWithAge => "Error al buscar datos en la base de datos",
        }
    }

    /// Confirmation message for the mutating operations
    pub fn success_message(&self) -> Option<&'static str> {
        match self {
            Capability::Create => Some("Datos insertados correctamente"),
            Capability::Update => Some("Datos modificados correctamente"),
            Capability::Delete => Some("Datos eliminados correctamente"),
            Capability::LookupByKey | Capability::SearchWithAge => None,
        }
    }

    /// Message for an empty result set, on the read operations
    pub fn not_found_message(&self) -> Option<&'static str> {
        match self {
            Capability::LookupByKey => Some("No se encontró ninguna persona con ese CI"),
            Capability::SearchWithAge => {
                Some("No se encontraron registros con esa cédula y fecha de nacimiento")
            }
            Capability::Create | Capability::Update | Capability::Delete => None,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a matched (method, path) pair dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `GET /` plain-text greeting
    Welcome,
    Persona(Capability),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_paths_are_distinct() {
        let paths: HashSet<_> = Capability::ALL.iter().map(|c| c.path()).collect();
        assert_eq!(paths.len(), Capability::ALL.len());
    }

    #[test]
    fn test_messages_cover_outcomes() {
        for cap in Capability::ALL {
            // Every operation either confirms a mutation or reports an empty result
            assert!(cap.success_message().is_some() ^ cap.not_found_message().is_some());
        }
    }
}
