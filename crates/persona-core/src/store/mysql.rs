//! MySQL backend
//!
//! One long-lived connection, opened at startup. `mysql_async::Conn` runs one
//! command at a time, so concurrent handlers queue on the mutex the same way
//! they would queue on the wire.

use super::{PersonaStore, SqlValue, Statement, StoreError, StoreResult};
use crate::model::Persona;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use mysql_async::prelude::Queryable as _;
use mysql_async::{Conn, OptsBuilder, Params, Row, Value};
use tokio::sync::Mutex;

/// Connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseOptions {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl DatabaseOptions {
    fn opts_builder(&self) -> OptsBuilder {
        let password = (!self.password.is_empty()).then(|| self.password.clone());
        OptsBuilder::default()
            .ip_or_hostname(self.host.clone())
            .tcp_port(self.port)
            .user(Some(self.user.clone()))
            .pass(password)
            .db_name(Some(self.database.clone()))
    }

    /// `user@host:port/database`, safe to log
    pub fn address(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

pub struct MysqlStore {
    conn: Mutex<Option<Conn>>,
    connection_id: u32,
}

impl MysqlStore {
    pub async fn connect(options: &DatabaseOptions) -> StoreResult<Self> {
        tracing::debug!(address = %options.address(), "opening database connection");

        let conn = Conn::new(options.opts_builder())
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        let connection_id = conn.id();

        tracing::info!(
            connection_id,
            address = %options.address(),
            "connected to MySQL"
        );
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            connection_id,
        })
    }
}

#[async_trait]
impl PersonaStore for MysqlStore {
    fn kind(&self) -> &'static str {
        "mysql"
    }

    async fn execute(&self, statement: &Statement) -> StoreResult<u64> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;

        conn.exec_drop(statement.sql, to_params(statement))
            .await
            .map_err(|e| StoreError::QueryFailed(format!("{:?}", e)))?;

        Ok(conn.affected_rows())
    }

    async fn query(&self, statement: &Statement) -> StoreResult<Vec<Persona>> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;

        let rows: Vec<Row> = conn
            .exec(statement.sql, to_params(statement))
            .await
            .map_err(|e| StoreError::QueryFailed(format!("{:?}", e)))?;

        rows.into_iter().map(decode_persona).collect()
    }

    async fn close(&self) -> StoreResult<()> {
        let conn = self.conn.lock().await.take();
        if let Some(conn) = conn {
            conn.disconnect()
                .await
                .map_err(|e| StoreError::Other(e.to_string()))?;
            tracing::info!(connection_id = self.connection_id, "MySQL connection closed");
        }
        Ok(())
    }
}

fn to_params(statement: &Statement) -> Params {
    Params::Positional(statement.params.iter().map(to_sql_value).collect())
}

fn to_sql_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Int(v) => Value::Int(*v),
        SqlValue::Text(v) => Value::Bytes(v.as_bytes().to_vec()),
        SqlValue::Date(d) => match u16::try_from(d.year()) {
            Ok(year) => Value::Date(year, d.month() as u8, d.day() as u8, 0, 0, 0, 0),
            Err(_) => Value::Bytes(d.to_string().into_bytes()),
        },
    }
}

// Column order follows query::COLUMNS
fn decode_persona(mut row: Row) -> StoreResult<Persona> {
    Ok(Persona {
        id: decode_int(take_value(&mut row, 0, "idpersona")?, "idpersona")?,
        national_id: decode_text(take_value(&mut row, 1, "cedula")?, "cedula")?,
        given_names: decode_text(take_value(&mut row, 2, "nombres")?, "nombres")?,
        surnames: decode_text(take_value(&mut row, 3, "apellidos")?, "apellidos")?,
        date_of_birth: decode_date(
            take_value(&mut row, 4, "fecha_nacimiento")?,
            "fecha_nacimiento",
        )?,
        phone: decode_text(take_value(&mut row, 5, "telefono")?, "telefono")?,
        address: decode_text(take_value(&mut row, 6, "direccion")?, "direccion")?,
    })
}

fn take_value(row: &mut Row, index: usize, column: &str) -> StoreResult<Value> {
    row.take::<Value, usize>(index).ok_or_else(|| {
        StoreError::ValueConversionFailed(format!("Can't get column {} at index {}", column, index))
    })
}

fn conversion_error(column: &str, value: &Value) -> StoreError {
    StoreError::ValueConversionFailed(format!(
        "Cannot convert value {:?} in column {}",
        value, column
    ))
}

fn decode_int(value: Value, column: &str) -> StoreResult<i64> {
    match &value {
        Value::Int(v) => Ok(*v),
        Value::UInt(v) => i64::try_from(*v).map_err(|_| conversion_error(column, &value)),
        Value::Bytes(b) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| conversion_error(column, &value)),
        _ => Err(conversion_error(column, &value)),
    }
}

/// NULL text columns decode as empty strings
fn decode_text(value: Value, column: &str) -> StoreResult<String> {
    match value {
        Value::NULL => Ok(String::new()),
        Value::Bytes(b) => String::from_utf8(b).map_err(|e| {
            StoreError::ValueConversionFailed(format!("column {} is not UTF-8: {}", column, e))
        }),
        Value::Int(v) => Ok(v.to_string()),
        Value::UInt(v) => Ok(v.to_string()),
        other => Err(conversion_error(column, &other)),
    }
}

fn decode_date(value: Value, column: &str) -> StoreResult<NaiveDate> {
    let date = match &value {
        Value::Date(year, month, day, ..) => {
            NaiveDate::from_ymd_opt(i32::from(*year), u32::from(*month), u32::from(*day))
        }
        Value::Bytes(b) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.get(..10))
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()),
        _ => None,
    };
    date.ok_or_else(|| conversion_error(column, &value))
}
