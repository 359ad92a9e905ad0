//! Spreadsheet values client.
//!
//! Only one operation is needed: overwrite an A1 range with a raw grid in a
//! single `values.update` call.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use url::Url;

use searchagent_shared::{Result, SearchAgentError, SheetsConfig};

use crate::auth::BearerToken;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: &'a [Vec<String>],
}

/// Subset of the `values.update` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    #[serde(default)]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_rows: Option<u32>,
    #[serde(default)]
    pub updated_cells: Option<u32>,
}

/// Client for the spreadsheet values API.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    client: Client,
    base: Url,
    token: BearerToken,
}

impl SheetsClient {
    pub fn from_config(config: &SheetsConfig, token: BearerToken) -> Result<Self> {
        Self::new(&config.endpoint, token)
    }

    pub fn new(endpoint: &str, token: BearerToken) -> Result<Self> {
        let base = Url::parse(endpoint).map_err(|e| {
            SearchAgentError::config(format!("invalid sheets endpoint '{endpoint}': {e}"))
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SearchAgentError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            token,
        })
    }

    /// Replace the values in `range` with `values`, written as raw input.
    #[instrument(skip_all, fields(spreadsheet_id = %spreadsheet_id, range = %range, rows = values.len()))]
    pub async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
    ) -> Result<UpdateValuesResponse> {
        let url = self.values_url(spreadsheet_id, range)?;
        let body = ValueRange {
            range,
            major_dimension: "ROWS",
            values,
        };

        let response = self
            .client
            .put(url)
            .bearer_auth(self.token.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchAgentError::Network(format!("sheets update: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchAgentError::Network(format!(
                "sheets update failed: HTTP {status}: {body}"
            )));
        }

        let parsed: UpdateValuesResponse = response.json().await.unwrap_or_default();
        info!(
            updated_range = parsed.updated_range.as_deref().unwrap_or(range),
            updated_cells = parsed.updated_cells.unwrap_or_default(),
            "sheet values updated"
        );
        Ok(parsed)
    }

    /// `{base}/spreadsheets/{id}/values/{range}?valueInputOption=RAW`
    fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SearchAgentError::config("sheets endpoint cannot be a base URL"))?
            .pop_if_empty()
            .extend(["spreadsheets", spreadsheet_id, "values", range]);
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn grid() -> Vec<Vec<String>> {
        vec![
            vec!["Acme".into(), "hq".into(), "http://a".into(), "In X".into()],
            vec!["Globex".into(), "hq".into(), "No result found".into(), "No summary available.".into()],
        ]
    }

    #[test]
    fn values_url_escapes_range() {
        let client =
            SheetsClient::new("https://sheets.googleapis.com/v4/", BearerToken::new("t")).unwrap();
        let url = client.values_url("abc123", "My Sheet!A1:D2").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/My%20Sheet!A1:D2?valueInputOption=RAW"
        );
    }

    #[tokio::test]
    async fn update_values_puts_raw_grid() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v4/spreadsheets/sheet-123/values/Sheet1!A1:D2"))
            .and(query_param("valueInputOption", "RAW"))
            .and(header("authorization", "Bearer ya29.sheets"))
            .and(body_json(serde_json::json!({
                "range": "Sheet1!A1:D2",
                "majorDimension": "ROWS",
                "values": grid(),
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "spreadsheetId": "sheet-123",
                "updatedRange": "Sheet1!A1:D2",
                "updatedRows": 2,
                "updatedColumns": 4,
                "updatedCells": 8
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            SheetsClient::new(&format!("{}/v4", server.uri()), BearerToken::new("ya29.sheets"))
                .unwrap();
        let response = client
            .update_values("sheet-123", "Sheet1!A1:D2", &grid())
            .await
            .expect("update");
        assert_eq!(response.updated_rows, Some(2));
        assert_eq!(response.updated_cells, Some(8));
    }

    #[tokio::test]
    async fn update_values_reports_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Requested entity was not found."))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            SheetsClient::new(&format!("{}/v4", server.uri()), BearerToken::new("t")).unwrap();
        let err = client
            .update_values("missing", "A1", &grid())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("not found"));
    }
}
