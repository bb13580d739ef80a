/*!
DynamoDB store adapter implementation.

Implements the store capability interface over the official AWS SDK. All
SDK types stay behind this boundary: rows, key schemas, and predicates are
converted at the call site, and SDK failures are mapped onto `StoreError`.
*/

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{AttributeValue, KeyType};
use aws_sdk_dynamodb::Client;
use tracing::{debug, error, info};

use super::{BackupHandle, ScanPage, ScanToken, StoreClient};
use crate::error::StoreError;
use crate::predicate::FilterPredicate;
use crate::value::{AttrValue, KeyElement, KeyRole, KeySchema, Row};

/// DynamoDB-backed store.
///
/// # Authentication
/// Uses the standard AWS credential provider chain: environment variables,
/// the shared credentials file, and instance/task roles.
#[derive(Debug, Clone)]
pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    /// Wrap an already-configured SDK client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a store from the ambient AWS environment.
    ///
    /// # Errors
    /// Returns an error if no credentials are available from the provider
    /// chain.
    pub async fn from_env() -> Result<Self, StoreError> {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        if sdk_config.credentials_provider().is_none() {
            return Err(StoreError::service(
                "AWS credentials not found. Set AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, and AWS_REGION",
            ));
        }

        let client = Client::new(&sdk_config);
        info!("Initialized DynamoDB store");
        Ok(Self::new(client))
    }
}

#[async_trait]
impl StoreClient for DynamoStore {
    async fn describe_key_schema(&self, table: &str) -> Result<KeySchema, StoreError> {
        debug!(table = %table, "Describing table key schema");

        let output = self
            .client
            .describe_table()
            .table_name(table)
            .send()
            .await
            .map_err(|e| map_sdk_error("describe_table", table, e))?;

        let description = output
            .table()
            .ok_or_else(|| StoreError::service(format!("empty table description for '{table}'")))?;

        let mut elements = Vec::new();
        for element in description.key_schema() {
            let role = match element.key_type() {
                KeyType::Hash => KeyRole::Hash,
                KeyType::Range => KeyRole::Range,
                other => {
                    return Err(StoreError::service(format!(
                        "unrecognized key type '{}' on table '{table}'",
                        other.as_str()
                    )))
                }
            };
            elements.push(KeyElement {
                name: element.attribute_name().to_string(),
                role,
            });
        }

        Ok(KeySchema::new(elements))
    }

    async fn create_backup(
        &self,
        table: &str,
        backup_name: &str,
    ) -> Result<BackupHandle, StoreError> {
        info!(table = %table, backup = %backup_name, "Requesting table backup");

        let output = self
            .client
            .create_backup()
            .table_name(table)
            .backup_name(backup_name)
            .send()
            .await
            .map_err(|e| {
                let mapped = map_sdk_error("create_backup", table, e);
                error!(table = %table, backup = %backup_name, error = %mapped, "Backup request rejected");
                mapped
            })?;

        let backup_id = output
            .backup_details()
            .map(|details| details.backup_arn().to_string());
        debug!(table = %table, backup = %backup_name, backup_id = ?backup_id, "Backup request accepted");

        Ok(BackupHandle { backup_id })
    }

    async fn scan_page(
        &self,
        table: &str,
        predicate: Option<&FilterPredicate>,
        token: Option<&ScanToken>,
    ) -> Result<ScanPage, StoreError> {
        debug!(table = %table, resumed = token.is_some(), "Fetching scan page");

        let mut request = self.client.scan().table_name(table);
        if let Some(predicate) = predicate {
            request = request
                .filter_expression(predicate.expression())
                .set_expression_attribute_values(Some(to_sdk_row(&predicate.bind_values())));
        }
        if let Some(token) = token {
            request = request.set_exclusive_start_key(Some(to_sdk_row(&token.0)));
        }

        let output = request
            .send()
            .await
            .map_err(|e| map_sdk_error("scan", table, e))?;

        let mut rows = Vec::with_capacity(output.items().len());
        for item in output.items() {
            rows.push(from_sdk_row(item)?);
        }
        let next = match output.last_evaluated_key() {
            Some(key) => Some(ScanToken(from_sdk_row(key)?)),
            None => None,
        };

        debug!(table = %table, rows = rows.len(), has_more = next.is_some(), "Scan page fetched");
        Ok(ScanPage { rows, next })
    }

    async fn delete_by_key(&self, table: &str, key: &Row) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(table)
            .set_key(Some(to_sdk_row(key)))
            .send()
            .await
            .map_err(|e| map_sdk_error("delete_item", table, e))?;
        Ok(())
    }

    async fn put_row(&self, table: &str, row: &Row) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(to_sdk_row(row)))
            .send()
            .await
            .map_err(|e| map_sdk_error("put_item", table, e))?;
        Ok(())
    }
}

fn to_sdk_value(value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::S(s) => AttributeValue::S(s.clone()),
        AttrValue::N(n) => AttributeValue::N(n.clone()),
        AttrValue::B(b) => AttributeValue::B(Blob::new(b.clone())),
        AttrValue::Bool(b) => AttributeValue::Bool(*b),
        AttrValue::Null(b) => AttributeValue::Null(*b),
        AttrValue::L(items) => AttributeValue::L(items.iter().map(to_sdk_value).collect()),
        AttrValue::M(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), to_sdk_value(v)))
                .collect(),
        ),
        AttrValue::Ss(items) => AttributeValue::Ss(items.clone()),
        AttrValue::Ns(items) => AttributeValue::Ns(items.clone()),
        AttrValue::Bs(items) => {
            AttributeValue::Bs(items.iter().map(|b| Blob::new(b.clone())).collect())
        }
    }
}

fn from_sdk_value(value: &AttributeValue) -> Result<AttrValue, StoreError> {
    let converted = match value {
        AttributeValue::S(s) => AttrValue::S(s.clone()),
        AttributeValue::N(n) => AttrValue::N(n.clone()),
        AttributeValue::B(b) => AttrValue::B(b.as_ref().to_vec()),
        AttributeValue::Bool(b) => AttrValue::Bool(*b),
        AttributeValue::Null(b) => AttrValue::Null(*b),
        AttributeValue::L(items) => AttrValue::L(
            items
                .iter()
                .map(from_sdk_value)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        AttributeValue::M(map) => {
            let mut converted = HashMap::with_capacity(map.len());
            for (k, v) in map {
                converted.insert(k.clone(), from_sdk_value(v)?);
            }
            AttrValue::M(converted)
        }
        AttributeValue::Ss(items) => AttrValue::Ss(items.clone()),
        AttributeValue::Ns(items) => AttrValue::Ns(items.clone()),
        AttributeValue::Bs(items) => {
            AttrValue::Bs(items.iter().map(|b| b.as_ref().to_vec()).collect())
        }
        other => {
            return Err(StoreError::service(format!(
                "unsupported attribute value type: {other:?}"
            )))
        }
    };
    Ok(converted)
}

fn to_sdk_row(row: &Row) -> HashMap<String, AttributeValue> {
    row.iter()
        .map(|(k, v)| (k.clone(), to_sdk_value(v)))
        .collect()
}

fn from_sdk_row(item: &HashMap<String, AttributeValue>) -> Result<Row, StoreError> {
    let mut row = Row::with_capacity(item.len());
    for (k, v) in item {
        row.insert(k.clone(), from_sdk_value(v)?);
    }
    Ok(row)
}

/// Map AWS SDK errors to StoreError with table context.
fn map_sdk_error<E: ProvideErrorMetadata + std::fmt::Debug>(
    op: &str,
    table: &str,
    error: SdkError<E>,
) -> StoreError {
    match &error {
        SdkError::DispatchFailure(dispatch_err) => StoreError::service(format!(
            "DynamoDB {op} request failed to dispatch: {dispatch_err:?}"
        )),
        SdkError::TimeoutError(_) => {
            StoreError::service(format!("DynamoDB {op} request timed out (table: {table})"))
        }
        SdkError::ResponseError(response_err) => {
            StoreError::service(format!("DynamoDB {op} response error: {response_err:?}"))
        }
        SdkError::ServiceError(service_err) => {
            if let Some(code) = service_err.err().code() {
                match code {
                    "ResourceNotFoundException" | "TableNotFoundException" => {
                        StoreError::TableNotFound(table.to_string())
                    }
                    _ => StoreError::service(format!(
                        "DynamoDB {op} service error ({code}): {}",
                        service_err.err().message().unwrap_or("Unknown error")
                    )),
                }
            } else {
                StoreError::service(format!("DynamoDB {op} service error: {service_err:?}"))
            }
        }
        _ => StoreError::service(format!("DynamoDB {op} error: {error}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversion_roundtrip() {
        let mut nested = HashMap::new();
        nested.insert("count".to_string(), AttrValue::N("2".to_string()));

        let values = vec![
            AttrValue::S("text".to_string()),
            AttrValue::N("12.5".to_string()),
            AttrValue::B(vec![1, 2, 3]),
            AttrValue::Bool(true),
            AttrValue::Null(true),
            AttrValue::L(vec![AttrValue::S("a".to_string())]),
            AttrValue::M(nested),
            AttrValue::Ss(vec!["a".to_string(), "b".to_string()]),
            AttrValue::Ns(vec!["1".to_string()]),
            AttrValue::Bs(vec![vec![0xff]]),
        ];

        for value in values {
            let converted = from_sdk_value(&to_sdk_value(&value)).unwrap();
            assert_eq!(converted, value);
        }
    }

    #[test]
    fn test_row_conversion_preserves_attributes() {
        let mut row = Row::new();
        row.insert("id".to_string(), AttrValue::S("order-1".to_string()));
        row.insert("total".to_string(), AttrValue::N("99".to_string()));

        let converted = from_sdk_row(&to_sdk_row(&row)).unwrap();
        assert_eq!(converted, row);
    }
}
