//! Person-record handlers
//!
//! Every handler follows the same path: presence validation, one statement,
//! one store call, outcome mapped to a response. Failures are returned as
//! [`ApiError`] and converted in one place.

use crate::age::{derive_age, is_adult};
use crate::app::AppState;
use crate::capability::Capability;
use crate::error::ApiError;
use crate::fields::{FieldError, FieldResult, Fields};
use crate::model::{AgeSearch, AgeSearchBody, MessageBody, NationalIdKey, Persona, PersonaUpdate};
use crate::query;
use crate::request::Request;
use crate::response::{Response, StatusCode};
use crate::store::Statement;

const CREATE_FIELDS: [&str; 7] = [
    "idpersona",
    "cedula",
    "nombres",
    "apellidos",
    "fecha_nacimiento",
    "telefono",
    "direccion",
];

const UPDATE_FIELDS: [&str; 6] = [
    "cedula",
    "nombres",
    "apellidos",
    "fecha_nacimiento",
    "telefono",
    "direccion",
];

const KEY_FIELDS: [&str; 1] = ["cedula"];

const SEARCH_FIELDS: [&str; 2] = ["cedula", "fecha_nacimiento"];

/// Required body fields per operation
pub fn required_fields(capability: Capability) -> &'static [&'static str] {
    match capability {
        Capability::Create => &CREATE_FIELDS,
        Capability::Update => &UPDATE_FIELDS,
        Capability::LookupByKey | Capability::Delete => &KEY_FIELDS,
        Capability::SearchWithAge => &SEARCH_FIELDS,
    }
}

/// Dispatch a request body to the operation's handler
pub async fn handle(
    capability: Capability,
    state: &AppState,
    req: &Request,
) -> Result<Response, ApiError> {
    let body = req.json_object().map_err(ApiError::MalformedJson)?;
    let fields = Fields::new(&body);
    fields
        .require(required_fields(capability))
        .map_err(|e| validation(capability, e))?;

    match capability {
        Capability::Create => create(state, &fields).await,
        Capability::Update => update(state, &fields).await,
        Capability::LookupByKey => lookup(state, &fields).await,
        Capability::Delete => delete(state, &fields).await,
        Capability::SearchWithAge => search(state, &fields).await,
    }
}

fn validation(capability: Capability, err: FieldError) -> ApiError {
    ApiError::Validation(err.message(capability.missing_fields_message()))
}

pub fn read_persona(fields: &Fields<'_>) -> FieldResult<Persona> {
    Ok(Persona {
        id: fields.integer("idpersona")?,
        national_id: fields.text("cedula")?,
        given_names: fields.text("nombres")?,
        surnames: fields.text("apellidos")?,
        date_of_birth: fields.date("fecha_nacimiento")?,
        phone: fields.text("telefono")?,
        address: fields.text("direccion")?,
    })
}

pub fn read_update(fields: &Fields<'_>) -> FieldResult<PersonaUpdate> {
    Ok(PersonaUpdate {
        national_id: fields.text("cedula")?,
        given_names: fields.text("nombres")?,
        surnames: fields.text("apellidos")?,
        date_of_birth: fields.date("fecha_nacimiento")?,
        phone: fields.text("telefono")?,
        address: fields.text("direccion")?,
    })
}

pub fn read_key(fields: &Fields<'_>) -> FieldResult<NationalIdKey> {
    Ok(NationalIdKey {
        national_id: fields.text("cedula")?,
    })
}

pub fn read_search(fields: &Fields<'_>) -> FieldResult<AgeSearch> {
    Ok(AgeSearch {
        national_id: fields.text("cedula")?,
        date_of_birth: fields.date("fecha_nacimiento")?,
    })
}

async fn write(state: &AppState, statement: Statement) -> Result<u64, ApiError> {
    tracing::debug!(
        operation = %statement.capability,
        sql = statement.sql,
        params = statement.params.len(),
        "executing statement"
    );
    state
        .store
        .execute(&statement)
        .await
        .map_err(|e| ApiError::store(statement.capability, e))
}

async fn read(state: &AppState, statement: Statement) -> Result<Vec<Persona>, ApiError> {
    tracing::debug!(
        operation = %statement.capability,
        sql = statement.sql,
        params = statement.params.len(),
        "running query"
    );
    state
        .store
        .query(&statement)
        .await
        .map_err(|e| ApiError::store(statement.capability, e))
}

fn confirmation(capability: Capability, affected_rows: Option<u64>) -> Response {
    let body = MessageBody {
        message: capability.success_message().unwrap_or_default(),
        affected_rows,
    };
    Response::json(StatusCode::OK, &body)
}

fn not_found(capability: Capability) -> ApiError {
    ApiError::NotFound(capability.not_found_message().unwrap_or_default().to_string())
}

/// Insert one row. No duplicate check; the table's own keys decide.
async fn create(state: &AppState, fields: &Fields<'_>) -> Result<Response, ApiError> {
    let persona = read_persona(fields).map_err(|e| validation(Capability::Create, e))?;
    write(state, query::insert(&persona)).await?;
    Ok(confirmation(Capability::Create, None))
}

/// Rewrite every row with the given `cedula`. Zero matches is still a success;
/// the count is reported as `affectedRows`.
async fn update(state: &AppState, fields: &Fields<'_>) -> Result<Response, ApiError> {
    let changes = read_update(fields).map_err(|e| validation(Capability::Update, e))?;
    let affected = write(state, query::update(&changes)).await?;
    if affected > 1 {
        tracing::warn!(affected, "update matched more than one row for a single cedula");
    }
    Ok(confirmation(Capability::Update, Some(affected)))
}

/// First row with the given `cedula`; further matches are dropped.
async fn lookup(state: &AppState, fields: &Fields<'_>) -> Result<Response, ApiError> {
    let key = read_key(fields).map_err(|e| validation(Capability::LookupByKey, e))?;
    let rows = read(state, query::select_by_key(&key)).await?;
    match rows.into_iter().next() {
        Some(persona) => Ok(Response::json(StatusCode::OK, &persona)),
        None => Err(not_found(Capability::LookupByKey)),
    }
}

/// Remove every row with the given `cedula`, reporting how many went.
async fn delete(state: &AppState, fields: &Fields<'_>) -> Result<Response, ApiError> {
    let key = read_key(fields).map_err(|e| validation(Capability::Delete, e))?;
    let affected = write(state, query::delete_by_key(&key)).await?;
    Ok(confirmation(Capability::Delete, Some(affected)))
}

/// Exact match on `cedula` and `fecha_nacimiento`, plus the year-only age.
async fn search(state: &AppState, fields: &Fields<'_>) -> Result<Response, ApiError> {
    let criteria = read_search(fields).map_err(|e| validation(Capability::SearchWithAge, e))?;
    let rows = read(state, query::search(&criteria)).await?;
    let persona = rows
        .into_iter()
        .next()
        .ok_or_else(|| not_found(Capability::SearchWithAge))?;

    let age = derive_age(criteria.date_of_birth, state.clock.today());
    let body = AgeSearchBody {
        persona,
        age,
        is_adult: is_adult(age),
    };
    Ok(Response::json(StatusCode::OK, &body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::age::FixedClock;
    use crate::store::{MemoryStore, PersonaStore, StoreError, StoreResult};
    use crate::{Method, RequestBuilder};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct BrokenStore;

    #[async_trait]
    impl PersonaStore for BrokenStore {
        fn kind(&self) -> &'static str {
            "broken"
        }

        async fn execute(&self, _statement: &Statement) -> StoreResult<u64> {
            Err(StoreError::ConnectionFailed("Connection refused (os error 111)".into()))
        }

        async fn query(&self, _statement: &Statement) -> StoreResult<Vec<Persona>> {
            Err(StoreError::ConnectionFailed("Connection refused (os error 111)".into()))
        }

        async fn close(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn state_with(store: Arc<dyn PersonaStore>) -> AppState {
        AppState::new(store).with_clock(Arc::new(FixedClock(today())))
    }

    fn post(capability: Capability, body: Value) -> Request {
        RequestBuilder::new(Method::Post, capability.path())
            .json(&body)
            .build()
    }

    fn full_body() -> Value {
        json!({
            "idpersona": 1,
            "cedula": "0912345678",
            "nombres": "María José",
            "apellidos": "Pérez Ruiz",
            "fecha_nacimiento": "2000-01-01",
            "telefono": "0991112233",
            "direccion": "Guayaquil",
        })
    }

    async fn run(state: &AppState, capability: Capability, body: Value) -> Response {
        handle(capability, state, &post(capability, body))
            .await
            .unwrap_or_else(ApiError::into_response)
    }

    #[tokio::test]
    async fn test_each_missing_field_is_rejected() {
        let state = state_with(Arc::new(MemoryStore::new()));
        for capability in Capability::ALL {
            for field in required_fields(capability) {
                let mut body = full_body();
                body.as_object_mut().unwrap().remove(*field);
                let res = run(&state, capability, body).await;
                assert_eq!(res.status, StatusCode::BAD_REQUEST, "{} without {}", capability, field);
                assert_eq!(
                    res.body_json().unwrap()["error"],
                    capability.missing_fields_message()
                );

                let mut blank = full_body();
                blank[*field] = json!("");
                let res = run(&state, capability, blank).await;
                assert_eq!(res.status, StatusCode::BAD_REQUEST, "{} with empty {}", capability, field);
            }
        }
    }

    #[tokio::test]
    async fn test_update_does_not_need_id() {
        let store = Arc::new(MemoryStore::new());
        let state = state_with(store.clone());
        run(&state, Capability::Create, full_body()).await;

        let mut body = full_body();
        body.as_object_mut().unwrap().remove("idpersona");
        body["telefono"] = json!("042999999");
        let res = run(&state, Capability::Update, body).await;

        assert_eq!(res.status, StatusCode::OK);
        let json = res.body_json().unwrap();
        assert_eq!(json["message"], "Datos modificados correctamente");
        assert_eq!(json["affectedRows"], 1);
        assert_eq!(store.snapshot()[0].phone, "042999999");
    }

    #[tokio::test]
    async fn test_update_unknown_key_still_succeeds() {
        let state = state_with(Arc::new(MemoryStore::new()));
        let res = run(&state, Capability::Update, full_body()).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body_json().unwrap()["affectedRows"], 0);
    }

    #[tokio::test]
    async fn test_invalid_date_is_a_validation_error() {
        let store = Arc::new(MemoryStore::new());
        let state = state_with(store.clone());
        let mut body = full_body();
        body["fecha_nacimiento"] = json!("31/12/2000");
        let res = run(&state, Capability::Create, body).await;

        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            res.body_json().unwrap()["error"],
            "El campo fecha_nacimiento debe ser una fecha AAAA-MM-DD"
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_search_minor() {
        let mut row = full_body();
        row["fecha_nacimiento"] = json!("2010-03-15");
        let state = state_with(Arc::new(MemoryStore::new()));
        run(&state, Capability::Create, row).await;

        let res = run(
            &state,
            Capability::SearchWithAge,
            json!({ "cedula": "0912345678", "fecha_nacimiento": "2010-03-15" }),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        let json = res.body_json().unwrap();
        assert_eq!(json["edad"], 14);
        assert_eq!(json["esMayorEdad"], false);
        assert_eq!(json["persona"]["cedula"], "0912345678");
    }

    #[tokio::test]
    async fn test_search_requires_exact_birth_date() {
        let state = state_with(Arc::new(MemoryStore::new()));
        run(&state, Capability::Create, full_body()).await;

        let res = run(
            &state,
            Capability::SearchWithAge,
            json!({ "cedula": "0912345678", "fecha_nacimiento": "2000-01-02" }),
        )
        .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(
            res.body_json().unwrap()["error"],
            "No se encontraron registros con esa cédula y fecha de nacimiento"
        );
    }

    #[tokio::test]
    async fn test_store_failures_are_generic_500s() {
        let state = state_with(Arc::new(BrokenStore));
        for capability in Capability::ALL {
            let res = run(&state, capability, full_body()).await;
            assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
            let body = res.body_string().unwrap();
            assert!(body.contains(capability.store_failure_message()));
            assert!(!body.contains("Connection refused"));
        }
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let state = state_with(Arc::new(MemoryStore::new()));
        let req = RequestBuilder::new(Method::Post, "/insertar-datos")
            .header("content-type", "application/json")
            .body("{\"cedula\": ")
            .build();
        let err = handle(Capability::Create, &state, &req).await.unwrap_err();
        assert!(matches!(err, ApiError::MalformedJson(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
