// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
use std::fs;
use std::path::Path;
use std::time::Duration;

use arrow::datatypes::DataType;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;

use crate::config::catalog::SqlDataset;
use crate::config::credentials::{Credential, Credentials};
use crate::datasource::{table_from_builders, ColumnBuilder};
use crate::error::{FlowError, FlowResult};
use crate::exec::table::Table;

const SNOWFLAKE_KIND: &str = "Snowflake";

/// Load a query-backed data set: resolve the credentials key, read the
/// whole query text, dispatch on the database kind, run the statement.
/// The connection is owned by this call and released on every exit path.
pub fn load_sql(ds: &SqlDataset, credentials_path: &Path) -> FlowResult<Table> {
    let credentials = Credentials::load(credentials_path)?;
    let credential = credentials.get(&ds.credentials_key)?;

    if !ds.sql_path.exists() {
        return Err(FlowError::SqlFileMissing {
            path: ds.sql_path.clone(),
        });
    }
    let sql = fs::read_to_string(&ds.sql_path).map_err(|e| FlowError::Io {
        context: format!("read sql file {}", ds.sql_path.display()),
        source: e,
    })?;

    match ds.database_kind.as_str() {
        SNOWFLAKE_KIND => snowflake_query(credential, sql.trim()),
        other => Err(FlowError::UnsupportedDatabase(other.to_string())),
    }
}

fn snowflake_query(credential: &Credential, sql: &str) -> FlowResult<Table> {
    let session = Session::login(credential)?;
    let result = session.query(sql);
    session.logout();
    rowset_to_table(result?)
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Deserialize, Default)]
struct LoginData {
    token: String,
}

#[derive(Deserialize, Default)]
struct QueryData {
    #[serde(default)]
    rowtype: Vec<RowType>,
    #[serde(default)]
    rowset: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct RowType {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    scale: Option<i64>,
}

/// One authenticated session against the Snowflake REST endpoint.
struct Session {
    client: reqwest::blocking::Client,
    base: String,
    token: String,
}

impl Session {
    fn login(credential: &Credential) -> FlowResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| FlowError::Data(format!("failed to build http client: {e}")))?;

        let base = base_url(&credential.server);
        let account = account_name(&credential.server);
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(warehouse) = &credential.warehouse {
            query.push(("warehouse", warehouse));
        }
        if let Some(database) = &credential.database {
            query.push(("databaseName", database));
        }
        if let Some(schema) = &credential.schema {
            query.push(("schemaName", schema));
        }
        if let Some(role) = &credential.role {
            query.push(("roleName", role));
        }
        let body = serde_json::json!({
            "data": {
                "LOGIN_NAME": credential.user,
                "PASSWORD": credential.password,
                "ACCOUNT_NAME": account,
            }
        });

        let response: ApiResponse<LoginData> = client
            .post(format!("{base}/session/v1/login-request"))
            .query(&query)
            .json(&body)
            .send()
            .map_err(|e| FlowError::Data(format!("snowflake login request failed: {e}")))?
            .json()
            .map_err(|e| FlowError::Data(format!("snowflake login response is not json: {e}")))?;
        let data = ensure_success(response, "login")?;

        Ok(Session {
            client,
            base,
            token: data.token,
        })
    }

    fn query(&self, sql: &str) -> FlowResult<QueryData> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let body = serde_json::json!({ "sqlText": sql });
        let response: ApiResponse<QueryData> = self
            .client
            .post(format!("{}/queries/v1/query-request", self.base))
            .query(&[("requestId", request_id.as_str())])
            .header(AUTHORIZATION, self.auth_header())
            .json(&body)
            .send()
            .map_err(|e| FlowError::Data(format!("snowflake query request failed: {e}")))?
            .json()
            .map_err(|e| FlowError::Data(format!("snowflake query response is not json: {e}")))?;
        ensure_success(response, "query")
    }

    /// Best-effort session release; runs on success and failure paths.
    fn logout(&self) {
        let _ = self
            .client
            .post(format!("{}/session/logout-request", self.base))
            .header(AUTHORIZATION, self.auth_header())
            .send();
    }

    fn auth_header(&self) -> String {
        format!("Snowflake Token=\"{}\"", self.token)
    }
}

fn ensure_success<T>(response: ApiResponse<T>, what: &str) -> FlowResult<T> {
    if !response.success {
        return Err(FlowError::Data(format!(
            "snowflake {what} failed: {}",
            response.message.as_deref().unwrap_or("no message")
        )));
    }
    response
        .data
        .ok_or_else(|| FlowError::Data(format!("snowflake {what} response has no data")))
}

fn base_url(server: &str) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        server.trim_end_matches('/').to_string()
    } else if server.contains('.') {
        format!("https://{server}")
    } else {
        format!("https://{server}.snowflakecomputing.com")
    }
}

fn account_name(server: &str) -> String {
    let host = server
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    host.split('.').next().unwrap_or(host).to_string()
}

fn rowset_to_table(data: QueryData) -> FlowResult<Table> {
    let names: Vec<String> = data.rowtype.iter().map(|c| c.name.clone()).collect();
    let mut builders: Vec<ColumnBuilder> = data
        .rowtype
        .iter()
        .map(|c| ColumnBuilder::for_type(&column_type_hint(c)))
        .collect::<FlowResult<_>>()?;

    let mut row_count = 0usize;
    for row in &data.rowset {
        if row.len() != builders.len() {
            return Err(FlowError::Data(format!(
                "snowflake row width mismatch: expected={} actual={}",
                builders.len(),
                row.len()
            )));
        }
        for ((builder, column), value) in builders.iter_mut().zip(&data.rowtype).zip(row) {
            append_cell(builder, column, value)?;
        }
        row_count += 1;
    }

    table_from_builders(names, builders, row_count)
}

fn column_type_hint(column: &RowType) -> DataType {
    match column.kind.as_str() {
        // `fixed` with a non-zero scale is a decimal.
        "fixed" => {
            if column.scale.unwrap_or(0) > 0 {
                DataType::Float64
            } else {
                DataType::Int64
            }
        }
        "real" => DataType::Float64,
        "boolean" => DataType::Boolean,
        _ => DataType::Utf8,
    }
}

enum Target {
    Int,
    Float,
    Bool,
    Text,
}

fn append_cell(
    builder: &mut ColumnBuilder,
    column: &RowType,
    value: &serde_json::Value,
) -> FlowResult<()> {
    if value.is_null() {
        builder.append_null();
        return Ok(());
    }
    // The legacy row set carries every value as text.
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let target = match builder {
        ColumnBuilder::Int64(_) => Target::Int,
        ColumnBuilder::Float64(_) => Target::Float,
        ColumnBuilder::Bool(_) => Target::Bool,
        _ => Target::Text,
    };
    match target {
        Target::Int => {
            let parsed = text.parse::<i64>().map_err(|_| {
                FlowError::Data(format!(
                    "snowflake column `{}`: `{text}` is not an integer",
                    column.name
                ))
            })?;
            builder.append_int64(parsed);
        }
        Target::Float => {
            let parsed = text.parse::<f64>().map_err(|_| {
                FlowError::Data(format!(
                    "snowflake column `{}`: `{text}` is not a number",
                    column.name
                ))
            })?;
            builder.append_float64(parsed);
        }
        Target::Bool => {
            let parsed = match text.to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    return Err(FlowError::Data(format!(
                        "snowflake column `{}`: `{text}` is not a boolean",
                        column.name
                    )))
                }
            };
            builder.append_bool(parsed);
        }
        Target::Text => builder.append_utf8(&text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    fn row_type(name: &str, kind: &str, scale: Option<i64>) -> RowType {
        RowType {
            name: name.to_string(),
            kind: kind.to_string(),
            scale,
        }
    }

    #[test]
    fn type_hints_follow_rowtype() {
        assert_eq!(
            column_type_hint(&row_type("n", "fixed", Some(0))),
            DataType::Int64
        );
        assert_eq!(
            column_type_hint(&row_type("n", "fixed", Some(2))),
            DataType::Float64
        );
        assert_eq!(
            column_type_hint(&row_type("n", "real", None)),
            DataType::Float64
        );
        assert_eq!(
            column_type_hint(&row_type("n", "boolean", None)),
            DataType::Boolean
        );
        assert_eq!(
            column_type_hint(&row_type("n", "timestamp_ntz", None)),
            DataType::Utf8
        );
    }

    #[test]
    fn rowset_converts_to_typed_table() {
        let data = QueryData {
            rowtype: vec![
                row_type("id", "fixed", Some(0)),
                row_type("price", "fixed", Some(2)),
                row_type("label", "text", None),
            ],
            rowset: vec![
                vec!["1".into(), "9.50".into(), "a".into()],
                vec!["2".into(), "3.25".into(), serde_json::Value::Null],
            ],
        };
        let table = rowset_to_table(data).expect("table");
        assert_eq!(table.len(), 2);
        assert_eq!(table.column_names(), vec!["id", "price", "label"]);
        assert_eq!(table.column("id").unwrap().data_type(), &DataType::Int64);
        assert_eq!(
            table.column("price").unwrap().data_type(),
            &DataType::Float64
        );
        assert_eq!(table.column("label").unwrap().null_count(), 1);
    }

    #[test]
    fn malformed_cell_names_the_column() {
        let data = QueryData {
            rowtype: vec![row_type("id", "fixed", Some(0))],
            rowset: vec![vec!["oops".into()]],
        };
        let err = rowset_to_table(data).expect_err("parse failure");
        assert!(err.to_string().contains("`id`"), "{err}");
    }

    #[test]
    fn server_forms_normalize() {
        assert_eq!(
            base_url("acme.snowflakecomputing.com"),
            "https://acme.snowflakecomputing.com"
        );
        assert_eq!(base_url("acme"), "https://acme.snowflakecomputing.com");
        assert_eq!(base_url("http://127.0.0.1:9009/"), "http://127.0.0.1:9009");
        assert_eq!(account_name("acme.snowflakecomputing.com"), "acme");
        assert_eq!(account_name("https://acme.eu-west-1.snowflakecomputing.com"), "acme");
    }

    #[test]
    fn empty_result_is_an_empty_table() {
        let data = QueryData {
            rowtype: vec![row_type("id", "fixed", Some(0))],
            rowset: vec![],
        };
        let table = rowset_to_table(data).expect("table");
        assert_eq!(table.len(), 0);
        assert_eq!(table.num_columns(), 1);
    }
}
